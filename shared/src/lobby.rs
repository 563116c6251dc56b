use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_LOBBY_PLAYERS: usize = 4;
pub const MIN_LOBBY_PLAYERS: usize = 2;

/// Pawn color picked by a player when joining a lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pawn {
    Red,
    Blue,
    Green,
    Yellow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum LobbyState {
    WaitingForPlayers,
    Full,
    ReadyToStart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub nickname: String,
    pub identity: String,
    pub pawn: Option<Pawn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyError {
    LobbyFull,
    NicknameTaken,
    PawnTaken,
    NotEnoughPlayers,
    MissingPawn,
}

impl fmt::Display for LobbyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyError::LobbyFull => write!(f, "Lobby is full"),
            LobbyError::NicknameTaken => write!(f, "Nickname already taken"),
            LobbyError::PawnTaken => write!(f, "Pawn already taken"),
            LobbyError::NotEnoughPlayers => write!(f, "Not enough players to start the game"),
            LobbyError::MissingPawn => write!(f, "Not all players have set their pawns"),
        }
    }
}

impl std::error::Error for LobbyError {}

/// A pre-game gathering of players. The first player to join owns the lobby
/// and is the only one allowed to start the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lobby {
    id: LobbyId,
    players: Vec<LobbyPlayer>,
    state: LobbyState,
}

impl Lobby {
    pub fn new(id: LobbyId) -> Self {
        Self {
            id,
            players: Vec::new(),
            state: LobbyState::WaitingForPlayers,
        }
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn players(&self) -> &[LobbyPlayer] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn first_player(&self) -> Option<&LobbyPlayer> {
        self.players.first()
    }

    pub fn is_full(&self) -> bool {
        self.state == LobbyState::Full
    }

    pub fn ready_to_start(&self) -> bool {
        self.state == LobbyState::ReadyToStart
    }

    pub fn add_new_player(
        &mut self,
        nickname: &str,
        identity: &str,
        pawn: Option<Pawn>,
    ) -> Result<(), LobbyError> {
        if self.state == LobbyState::Full {
            return Err(LobbyError::LobbyFull);
        }

        if self.players.iter().any(|p| p.nickname == nickname) {
            return Err(LobbyError::NicknameTaken);
        }

        if let Some(pawn) = pawn {
            if self.players.iter().any(|p| p.pawn == Some(pawn)) {
                return Err(LobbyError::PawnTaken);
            }
        }

        self.players.push(LobbyPlayer {
            nickname: nickname.to_string(),
            identity: identity.to_string(),
            pawn,
        });

        if self.players.len() == MAX_LOBBY_PLAYERS {
            self.state = LobbyState::Full;
        }

        Ok(())
    }

    pub fn remove_player(&mut self, nickname: &str) {
        self.players.retain(|p| p.nickname != nickname);

        if self.players.len() < MAX_LOBBY_PLAYERS && self.state == LobbyState::Full {
            self.state = LobbyState::WaitingForPlayers;
        }
    }

    /// Marks the lobby as ready to start. The caller checks ownership; this
    /// only enforces the player-count and pawn requirements.
    pub fn start_game(&mut self) -> Result<(), LobbyError> {
        if self.players.len() < MIN_LOBBY_PLAYERS {
            return Err(LobbyError::NotEnoughPlayers);
        }

        if self.players.iter().any(|p| p.pawn.is_none()) {
            return Err(LobbyError::MissingPawn);
        }

        self.state = LobbyState::ReadyToStart;
        Ok(())
    }
}
