use clap::Parser;
use client::network::{random_identity, ClientNetworkManager};
use shared::{ActionKind, ClientState, Pawn, PlayerPhase};

/// Terminal frontend: connects, creates or joins a lobby and prints the
/// replica after every server update.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to connect to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to connect to
        #[clap(short, long, default_value = "8080")]
        port: u16,
        /// Nickname to play under
        #[clap(short, long)]
        nickname: String,
        /// Lobby to join; a fresh lobby is created when omitted
        #[clap(short, long)]
        lobby: Option<u64>,
    }

    env_logger::init();
    let args = Args::parse();

    let manager = ClientNetworkManager::builder()
        .hostname(&args.host)
        .port(args.port)
        .identity(&random_identity())
        .on_update(Box::new(print_state))
        .build()?;

    let controller = manager.connect().await?;

    let kind = match args.lobby {
        Some(lobby_id) => ActionKind::JoinLobby {
            nickname: args.nickname.clone(),
            lobby_id: shared::lobby::LobbyId(lobby_id),
            pawn: None,
        },
        None => ActionKind::CreateLobby {
            nickname: args.nickname.clone(),
            pawn: Pawn::Red,
            created_lobby: None,
        },
    };
    controller.execute(kind).await?;

    tokio::signal::ctrl_c().await?;
    println!("Shutting down");
    Ok(())
}

fn print_state(state: &ClientState) {
    if let Some(message) = state.pending_error() {
        println!("! {message}");
    }

    match state.phase() {
        PlayerPhase::SelectingLobby => {
            println!("Open lobbies:");
            for lobby in state.available_lobbies() {
                println!(
                    "  {} ({} players)",
                    lobby.id(),
                    lobby.player_count()
                );
            }
        }
        PlayerPhase::AdminWaitingForPlayers | PlayerPhase::WaitingForPlayers => {
            if let Some(lobby) = state.lobby_model() {
                println!("Lobby {}:", lobby.id());
                for player in lobby.players() {
                    println!("  {} ({:?})", player.nickname, player.pawn);
                }
            }
        }
        PlayerPhase::GameEnded => {
            println!("The game is over, the deck is spent");
        }
        phase => {
            if let Some(game) = state.game_model() {
                println!(
                    "Game {:?}, turn belongs to {}, phase {:?}",
                    game.id(),
                    game.current_player().nickname,
                    phase
                );
            }
        }
    }
}
