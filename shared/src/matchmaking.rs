use crate::lobby::{Lobby, LobbyId, Pawn};
use serde::{Deserialize, Serialize};

/// A matchmaking request recorded by an action's `execute` and consumed by
/// the matchmaking controller right after the dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchmakingRequest {
    CreateLobby { nickname: String, pawn: Pawn },
    JoinLobby {
        nickname: String,
        lobby_id: LobbyId,
        pawn: Option<Pawn>,
    },
    Reconnect { nickname: String },
}

/// Model guarded by the matchmaking controller: the lobby list visible to
/// clients that have not yet joined a lobby, plus the pending request of
/// the action currently being dispatched.
#[derive(Debug, Clone, Default)]
pub struct Matchmaking {
    lobbies: Vec<Lobby>,
    pending: Option<MatchmakingRequest>,
}

impl Matchmaking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lobbies(&self) -> &[Lobby] {
        &self.lobbies
    }

    /// Replaces the visible lobby snapshot. Called by the server dispatcher
    /// whenever the set of open lobbies changes.
    pub fn set_lobbies(&mut self, lobbies: Vec<Lobby>) {
        self.lobbies = lobbies;
    }

    pub fn record_request(&mut self, request: MatchmakingRequest) {
        self.pending = Some(request);
    }

    /// Takes the request recorded by the last executed action, clearing it
    /// so state never leaks into the next dispatch.
    pub fn take_pending(&mut self) -> Option<MatchmakingRequest> {
        self.pending.take()
    }
}
