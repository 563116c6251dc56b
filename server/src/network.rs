//! Server network layer: accepts TCP clients, runs one receive loop, one
//! send task and one liveness watchdog per connection, and bridges packets
//! into the server dispatcher.

use crate::listener::{Listener, Liveness, RemoteListener, SEND_QUEUE_CAPACITY};
use crate::server_dispatcher::{DispatchError, ServerDispatcher};
use log::{debug, error, info, warn};
use shared::{Connection, Packet, HEARTBEAT_INTERVAL};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;

/// Accept loop for the game server. Each accepted connection gets its own
/// set of tasks; the dispatcher is shared.
pub struct ServerNetworkManager {
    listener: TcpListener,
    dispatcher: Arc<ServerDispatcher>,
}

impl ServerNetworkManager {
    pub async fn bind(addr: &str, dispatcher: Arc<ServerDispatcher>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!("Accepted connection from {addr}");
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, dispatcher).await {
                    warn!("Connection from {addr} terminated: {e}");
                }
            });
        }
    }
}

/// Drives one client connection from identity handshake to teardown.
async fn handle_connection(
    stream: TcpStream,
    dispatcher: Arc<ServerDispatcher>,
) -> Result<(), DispatchError> {
    let connection = Arc::new(Connection::new(stream));

    // The first frame must announce who the peer is.
    let identity = match connection.receive().await {
        Some(Packet::Identity { identity }) => identity,
        Some(other) => {
            warn!("Peer sent {other:?} before identifying, dropping it");
            return Ok(());
        }
        None => return Ok(()),
    };
    info!("Client {identity} connected");

    let (queue_tx, queue_rx) = mpsc::channel(SEND_QUEUE_CAPACITY);
    let remote = Arc::new(RemoteListener::new(&identity, queue_tx));
    dispatcher.register_new_listener(Listener::Remote(Arc::clone(&remote)))?;

    let sender = tokio::spawn(drain_send_queue(Arc::clone(&connection), queue_rx));
    let watchdog = tokio::spawn(run_watchdog(
        identity.clone(),
        Arc::clone(&remote),
        Arc::clone(&dispatcher),
    ));

    // Receive loop. Ends when the peer disconnects or the stream corrupts.
    while let Some(packet) = connection.receive().await {
        match packet {
            Packet::Action(mut action) => {
                if let Err(e) = dispatcher.execute(&mut action) {
                    warn!("Dropping action from {identity}: {e}");
                }
            }
            Packet::Heartbeat => {
                remote.heartbeat();
                if let Err(e) = connection.send(&Packet::Heartbeat).await {
                    debug!("Heartbeat echo to {identity} failed: {e}");
                }
            }
            Packet::Identity { .. } => {
                warn!("Client {identity} tried to re-identify, ignoring");
            }
        }
    }

    info!("Client {identity} disconnected");
    watchdog.abort();
    sender.abort();
    if let Err(e) = dispatcher.remove_listener(&identity) {
        error!("Failed to detach {identity}: {e}");
    }
    dispatcher.cleanup();
    Ok(())
}

/// Forwards queued packets onto the wire in order. Exits when the queue
/// closes or the peer stops accepting writes.
async fn drain_send_queue(connection: Arc<Connection>, mut queue_rx: mpsc::Receiver<Packet>) {
    while let Some(packet) = queue_rx.recv().await {
        if let Err(e) = connection.send(&packet).await {
            debug!("Send to {:?} failed: {e}", connection.peer_addr());
            break;
        }
    }
}

/// Periodically advances the liveness state machine for one client and
/// detaches it once it is declared dead.
async fn run_watchdog(
    identity: String,
    remote: Arc<RemoteListener>,
    dispatcher: Arc<ServerDispatcher>,
) {
    let mut ticker = interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;
        match remote.watchdog_tick() {
            Liveness::Alive => {}
            Liveness::Suspect => warn!("Client {identity} missed its heartbeat window"),
            Liveness::Dead => {
                warn!("Client {identity} is dead, detaching it");
                if let Err(e) = dispatcher.remove_listener(&identity) {
                    error!("Failed to detach dead client {identity}: {e}");
                }
                dispatcher.cleanup();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Action, ActionKind, Pawn};
    use std::time::Duration;
    use tokio::time::timeout;

    async fn recv_packet(connection: &Connection) -> Packet {
        timeout(Duration::from_secs(2), connection.receive())
            .await
            .ok()
            .flatten()
            .unwrap()
    }

    #[tokio::test]
    async fn identity_handshake_then_lobby_creation() {
        let dispatcher = Arc::new(ServerDispatcher::new());
        let manager = ServerNetworkManager::bind("127.0.0.1:0", Arc::clone(&dispatcher))
            .await
            .unwrap();
        let addr = manager.local_addr().unwrap();
        tokio::spawn(manager.run());

        let stream = TcpStream::connect(addr).await.unwrap();
        let connection = Connection::new(stream);
        connection
            .send(&Packet::Identity {
                identity: "id-a".to_string(),
            })
            .await
            .unwrap();

        // Registration lands us in matchmaking, which greets with the list.
        match recv_packet(&connection).await {
            Packet::Action(action) => {
                assert!(matches!(action.kind, ActionKind::LobbyList { .. }));
            }
            other => panic!("unexpected packet {other:?}"),
        }

        let create = Action::new(
            ActionKind::CreateLobby {
                nickname: "alice".to_string(),
                pawn: Pawn::Red,
                created_lobby: None,
            },
            "id-a",
        );
        connection.send(&Packet::Action(create)).await.unwrap();

        let mut confirmed = false;
        for _ in 0..4 {
            if let Packet::Action(action) = recv_packet(&connection).await {
                if matches!(
                    action.kind,
                    ActionKind::CreateLobby {
                        created_lobby: Some(_),
                        ..
                    }
                ) {
                    confirmed = true;
                    break;
                }
            }
        }
        assert!(confirmed);
        assert_eq!(dispatcher.open_lobbies().len(), 1);
    }

    #[tokio::test]
    async fn heartbeats_are_echoed() {
        let dispatcher = Arc::new(ServerDispatcher::new());
        let manager = ServerNetworkManager::bind("127.0.0.1:0", Arc::clone(&dispatcher))
            .await
            .unwrap();
        let addr = manager.local_addr().unwrap();
        tokio::spawn(manager.run());

        let stream = TcpStream::connect(addr).await.unwrap();
        let connection = Connection::new(stream);
        connection
            .send(&Packet::Identity {
                identity: "id-a".to_string(),
            })
            .await
            .unwrap();
        let _greeting = recv_packet(&connection).await;

        connection.send(&Packet::Heartbeat).await.unwrap();
        match recv_packet(&connection).await {
            Packet::Heartbeat => {}
            other => panic!("unexpected packet {other:?}"),
        }
    }
}
