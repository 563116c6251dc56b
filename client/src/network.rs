//! Client network layer: connects to the server, announces the client's
//! identity, reflects every incoming action onto the local replica and
//! keeps the heartbeat exchange alive.

use log::{debug, info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::{
    Action, ActionKind, ClientState, Connection, Packet, RenderCallback, HEARTBEAT_INTERVAL,
    HEARTBEAT_MAX_INTERVAL,
};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::net::TcpStream;
use tokio::time::interval;

/// Generates a fresh connection identity.
pub fn random_identity() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    MissingHostname,
    MissingPort,
    MissingIdentity,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingHostname => write!(f, "hostname is required"),
            BuildError::MissingPort => write!(f, "port is required"),
            BuildError::MissingIdentity => write!(f, "identity is required"),
        }
    }
}

impl std::error::Error for BuildError {}

/// Collects connection parameters before anything touches the network.
/// `build` fails fast on a missing parameter instead of producing a
/// half-configured manager.
#[derive(Default)]
pub struct ClientNetworkManagerBuilder {
    hostname: Option<String>,
    port: Option<u16>,
    identity: Option<String>,
    on_update: Option<RenderCallback>,
}

impl ClientNetworkManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname(mut self, hostname: &str) -> Self {
        self.hostname = Some(hostname.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn identity(mut self, identity: &str) -> Self {
        self.identity = Some(identity.to_string());
        self
    }

    pub fn on_update(mut self, callback: RenderCallback) -> Self {
        self.on_update = Some(callback);
        self
    }

    pub fn build(self) -> Result<ClientNetworkManager, BuildError> {
        let hostname = self.hostname.ok_or(BuildError::MissingHostname)?;
        let port = self.port.ok_or(BuildError::MissingPort)?;
        let identity = self.identity.ok_or(BuildError::MissingIdentity)?;

        Ok(ClientNetworkManager {
            address: format!("{hostname}:{port}"),
            identity: identity.clone(),
            state: Arc::new(Mutex::new(ClientState::new(&identity, self.on_update))),
        })
    }
}

/// Owns the client's replica and, once connected, the tasks that keep it
/// in sync with the server.
pub struct ClientNetworkManager {
    address: String,
    identity: String,
    state: Arc<Mutex<ClientState>>,
}

impl ClientNetworkManager {
    pub fn builder() -> ClientNetworkManagerBuilder {
        ClientNetworkManagerBuilder::new()
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Shared handle to the replica. Rendering reads through this; only
    /// `Action::reflect` writes to it.
    pub fn state(&self) -> Arc<Mutex<ClientState>> {
        Arc::clone(&self.state)
    }

    /// Connects, identifies, and spawns the receive and heartbeat loops.
    /// Returns the controller used to submit actions.
    pub async fn connect(&self) -> Result<ClientController, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(&self.address).await?;
        let connection = Arc::new(Connection::new(stream));
        info!("Connected to {} as {}", self.address, self.identity);

        connection
            .send(&Packet::Identity {
                identity: self.identity.clone(),
            })
            .await?;

        let server_pulse = Arc::new(Mutex::new(Instant::now()));

        tokio::spawn(receive_loop(
            Arc::clone(&connection),
            Arc::clone(&self.state),
            Arc::clone(&server_pulse),
        ));
        tokio::spawn(heartbeat_loop(
            Arc::clone(&connection),
            Arc::clone(&self.state),
            self.identity.clone(),
            server_pulse,
        ));

        Ok(ClientController {
            connection,
            identity: self.identity.clone(),
        })
    }
}

/// Submits player actions to the server. The identity is baked in; the
/// controller cannot speak for anyone else.
#[derive(Clone)]
pub struct ClientController {
    connection: Arc<Connection>,
    identity: String,
}

impl ClientController {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub async fn execute(&self, kind: ActionKind) -> Result<(), std::io::Error> {
        let action = Action::new(kind, &self.identity);
        debug!("-> {}", action.name());
        self.connection.send(&Packet::Action(action)).await
    }
}

/// Applies every incoming action to the replica until the server goes
/// away, then marks the local game as hung.
async fn receive_loop(
    connection: Arc<Connection>,
    state: Arc<Mutex<ClientState>>,
    server_pulse: Arc<Mutex<Instant>>,
) {
    while let Some(packet) = connection.receive().await {
        match packet {
            Packet::Action(action) => {
                let mut state = match state.lock() {
                    Ok(state) => state,
                    Err(_) => break,
                };
                action.reflect(&mut state);
            }
            Packet::Heartbeat => {
                if let Ok(mut pulse) = server_pulse.lock() {
                    *pulse = Instant::now();
                }
            }
            Packet::Identity { .. } => {
                warn!("Server sent an identity packet, ignoring it");
            }
        }
    }

    info!("Connection to server lost");
    hang_local_game(&state);
}

/// Emits a heartbeat every interval and watches the echoes coming back.
/// A server silent for too long hangs the local game.
async fn heartbeat_loop(
    connection: Arc<Connection>,
    state: Arc<Mutex<ClientState>>,
    identity: String,
    server_pulse: Arc<Mutex<Instant>>,
) {
    let mut ticker = interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;

        let silent_for = match server_pulse.lock() {
            Ok(pulse) => pulse.elapsed(),
            Err(_) => return,
        };
        if silent_for > HEARTBEAT_MAX_INTERVAL {
            warn!("No heartbeat from server for {silent_for:?}, hanging game");
            hang_local_game(&state);
            return;
        }

        if let Err(e) = connection.send(&Packet::Heartbeat).await {
            debug!("Heartbeat send failed for {identity}: {e}");
            return;
        }
    }
}

fn hang_local_game(state: &Arc<Mutex<ClientState>>) {
    if let Ok(mut state) = state.lock() {
        let identity = state.identity().to_string();
        let hang = Action::new(ActionKind::HangGame, &identity);
        hang.reflect(&mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Pawn, PlayerPhase};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[test]
    fn builder_rejects_missing_parameters() {
        let result = ClientNetworkManagerBuilder::new()
            .hostname("localhost")
            .port(8080)
            .build();
        assert!(matches!(result, Err(BuildError::MissingIdentity)));

        let result = ClientNetworkManagerBuilder::new().identity("id-a").build();
        assert!(matches!(result, Err(BuildError::MissingHostname)));
    }

    #[test]
    fn random_identities_do_not_collide_trivially() {
        let a = random_identity();
        let b = random_identity();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn connect_identifies_and_controller_submits_actions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let manager = ClientNetworkManager::builder()
            .hostname("127.0.0.1")
            .port(addr.port())
            .identity("id-a")
            .build()
            .unwrap();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let server_side = Connection::new(stream);
            let identity = server_side.receive().await.unwrap();
            let action = server_side.receive().await.unwrap();
            (identity, action)
        });

        let controller = manager.connect().await.unwrap();
        controller
            .execute(ActionKind::CreateLobby {
                nickname: "alice".to_string(),
                pawn: Pawn::Red,
                created_lobby: None,
            })
            .await
            .unwrap();

        let (identity, action) = timeout(Duration::from_secs(2), accept)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            identity,
            Packet::Identity {
                identity: "id-a".to_string()
            }
        );
        match action {
            Packet::Action(action) => {
                assert_eq!(action.identity(), "id-a");
                assert!(matches!(action.kind, ActionKind::CreateLobby { .. }));
            }
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[tokio::test]
    async fn incoming_actions_reflect_onto_the_replica() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let manager = ClientNetworkManager::builder()
            .hostname("127.0.0.1")
            .port(addr.port())
            .identity("id-a")
            .build()
            .unwrap();
        let state = manager.state();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let server_side = Connection::new(stream);
            let _identity = server_side.receive().await.unwrap();

            let error = Action::server(ActionKind::Error {
                message: "lobby is full".to_string(),
            });
            server_side.send(&Packet::Action(error)).await.unwrap();
            // Keep the connection open long enough for the client to read.
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let _controller = manager.connect().await.unwrap();

        let mut surfaced = None;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let mut state = state.lock().unwrap();
            if let Some(message) = state.take_error_message() {
                surfaced = Some(message);
                break;
            }
        }
        assert_eq!(surfaced.as_deref(), Some("lobby is full"));

        // The error is one-shot: it does not surface twice.
        assert!(state.lock().unwrap().take_error_message().is_none());
        assert_ne!(
            state.lock().unwrap().phase(),
            PlayerPhase::Disconnected
        );
        server.await.unwrap();
    }
}
