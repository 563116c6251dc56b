//! Wire types and models shared between the game server and its clients:
//! the action hierarchy, the packet envelope and framed TCP connection,
//! and the lobby/game/matchmaking/client-state models.

use std::time::Duration;

pub mod action;
pub mod chat;
pub mod client_state;
pub mod connection;
pub mod game;
pub mod lobby;
pub mod matchmaking;
pub mod packet;

pub use action::{Action, ActionError, ActionKind, SERVER_IDENTITY};
pub use chat::{ChatMessage, PlayerChat};
pub use client_state::{ClientState, PlayerPhase, RenderCallback};
pub use connection::Connection;
pub use game::{Card, FieldPosition, Game, GameId, GameState, PlacedCard, Player, MAX_HAND_SIZE};
pub use lobby::{Lobby, LobbyError, LobbyId, LobbyPlayer, Pawn, MAX_LOBBY_PLAYERS, MIN_LOBBY_PLAYERS};
pub use matchmaking::{Matchmaking, MatchmakingRequest};
pub use packet::Packet;

/// How often each side emits a heartbeat.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// A peer silent for longer than this is considered suspect.
pub const HEARTBEAT_MAX_INTERVAL: Duration = Duration::from_secs(10);
