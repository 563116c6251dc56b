//! Minimal scriptable client for poking a running server by hand: sends
//! the identity handshake, asks for a lobby and prints everything the
//! server pushes back.

use clap::Parser;
use shared::{Action, ActionKind, Connection, Packet, Pawn, HEARTBEAT_INTERVAL};
use tokio::net::TcpStream;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address to connect to
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    address: String,
    /// Nickname to register with
    #[clap(short, long, default_value = "smoke-bot")]
    nickname: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let stream = TcpStream::connect(&args.address).await?;
    let connection = Connection::new(stream);
    let identity = format!("test-client-{}", std::process::id());

    connection
        .send(&Packet::Identity {
            identity: identity.clone(),
        })
        .await?;
    println!("Connected to {} as {}", args.address, identity);

    let create = Action::new(
        ActionKind::CreateLobby {
            nickname: args.nickname.clone(),
            pawn: Pawn::Red,
            created_lobby: None,
        },
        &identity,
    );
    connection.send(&Packet::Action(create)).await?;

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    loop {
        tokio::select! {
            packet = connection.receive() => {
                match packet {
                    Some(Packet::Action(action)) => {
                        println!(
                            "<- {} from {} (ok: {})",
                            action.name(),
                            action.identity(),
                            action.executed_correctly
                        );
                        if let Some(message) = &action.error_message {
                            println!("   error: {message}");
                        }
                    }
                    Some(Packet::Heartbeat) => {}
                    Some(Packet::Identity { identity }) => {
                        println!("<- unexpected identity packet for {identity}");
                    }
                    None => {
                        println!("Server closed the connection");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                connection.send(&Packet::Heartbeat).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted, closing");
                break;
            }
        }
    }

    Ok(())
}
