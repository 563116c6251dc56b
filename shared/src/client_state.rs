use crate::game::Game;
use crate::lobby::Lobby;
use std::fmt;

/// UI phase of the local player, driven exclusively by `Action::reflect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerPhase {
    SelectingLobby,
    AdminWaitingForPlayers,
    WaitingForPlayers,
    PlacingCard,
    PickingCard,
    Sleeping,
    Disconnected,
    GameEnded,
}

/// Callback invoked whenever the client replica changes in a way the
/// presentation layer should render. Runs on the thread that called
/// `reflect`, so it must not block indefinitely.
pub type RenderCallback = Box<dyn Fn(&ClientState) + Send>;

/// Client-side convergent replica: mirror models plus UI-facing phase and
/// one-shot error state. Mutated only by `reflect` and local UI setters.
pub struct ClientState {
    identity: String,
    nickname: Option<String>,
    phase: PlayerPhase,
    game_model: Option<Game>,
    lobby_model: Option<Lobby>,
    available_lobbies: Vec<Lobby>,
    error_message: Option<String>,
    on_update: Option<RenderCallback>,
}

impl fmt::Debug for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientState")
            .field("identity", &self.identity)
            .field("nickname", &self.nickname)
            .field("phase", &self.phase)
            .field("has_game", &self.game_model.is_some())
            .field("has_lobby", &self.lobby_model.is_some())
            .field("available_lobbies", &self.available_lobbies.len())
            .field("error_message", &self.error_message)
            .finish()
    }
}

impl ClientState {
    pub fn new(identity: &str, on_update: Option<RenderCallback>) -> Self {
        Self {
            identity: identity.to_string(),
            nickname: None,
            phase: PlayerPhase::SelectingLobby,
            game_model: None,
            lobby_model: None,
            available_lobbies: Vec::new(),
            error_message: None,
            on_update,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Sets the local player's nickname and re-applies the marker onto the
    /// current game replica, if any.
    pub fn set_nickname(&mut self, nickname: &str) {
        self.nickname = Some(nickname.to_string());
        if let Some(game) = &mut self.game_model {
            game.set_self_nickname(Some(nickname.to_string()));
        }
    }

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: PlayerPhase) {
        self.phase = phase;
    }

    pub fn game_model(&self) -> Option<&Game> {
        self.game_model.as_ref()
    }

    pub fn game_model_mut(&mut self) -> Option<&mut Game> {
        self.game_model.as_mut()
    }

    /// Replaces the game replica wholesale. The incoming model never carries
    /// a self marker; the client's own nickname is reconciled onto it.
    pub fn set_game_model(&mut self, game: &Game) {
        let mut game = game.clone();
        game.set_self_nickname(self.nickname.clone());
        self.game_model = Some(game);
    }

    pub fn lobby_model(&self) -> Option<&Lobby> {
        self.lobby_model.as_ref()
    }

    pub fn set_lobby_model(&mut self, lobby: &Lobby) {
        self.lobby_model = Some(lobby.clone());
    }

    pub fn available_lobbies(&self) -> &[Lobby] {
        &self.available_lobbies
    }

    pub fn set_available_lobbies(&mut self, lobbies: Vec<Lobby>) {
        self.available_lobbies = lobbies;
    }

    pub fn set_error_message(&mut self, message: &str) {
        self.error_message = Some(message.to_string());
    }

    /// One-shot error delivery: returns the pending message and clears it,
    /// so the UI surfaces each error exactly once.
    pub fn take_error_message(&mut self) -> Option<String> {
        self.error_message.take()
    }

    /// Non-consuming probe, for callers that only need to know whether an
    /// error is pending.
    pub fn pending_error(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Invokes the render callback with the current state. The only side
    /// channel from the replica to the presentation layer.
    pub fn notify_update(&self) {
        if let Some(on_update) = &self.on_update {
            on_update(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Card, Game, GameId};
    use crate::lobby::{Lobby, LobbyId, Pawn};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_game() -> Game {
        let mut lobby = Lobby::new(LobbyId(1));
        lobby
            .add_new_player("alice", "id-a", Some(Pawn::Red))
            .unwrap();
        lobby
            .add_new_player("bob", "id-b", Some(Pawn::Blue))
            .unwrap();
        lobby.start_game().unwrap();
        Game::from_lobby(GameId(1), &lobby, (0..20).map(Card).collect())
    }

    #[test]
    fn error_message_is_delivered_exactly_once() {
        let mut state = ClientState::new("id-a", None);
        assert!(state.take_error_message().is_none());

        state.set_error_message("boom");
        assert_eq!(state.pending_error(), Some("boom"));
        assert_eq!(state.take_error_message().as_deref(), Some("boom"));
        assert!(state.take_error_message().is_none());
        assert!(state.pending_error().is_none());
    }

    #[test]
    fn replacing_the_model_preserves_self_nickname() {
        let mut state = ClientState::new("id-b", None);
        let game = sample_game();

        state.set_game_model(&game);
        assert!(state.game_model().unwrap().self_nickname().is_none());

        state.set_nickname("bob");
        assert_eq!(state.game_model().unwrap().self_nickname(), Some("bob"));

        // A fresh model replaces the replica wholesale; the marker survives.
        state.set_game_model(&game);
        assert_eq!(state.game_model().unwrap().self_nickname(), Some("bob"));
        assert!(game.self_nickname().is_none());
    }

    #[test]
    fn notify_invokes_render_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let state = ClientState::new(
            "id-a",
            Some(Box::new(move |_state| {
                seen.fetch_add(1, Ordering::SeqCst);
            })),
        );

        state.notify_update();
        state.notify_update();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // No callback registered: a plain no-op.
        ClientState::new("id-b", None).notify_update();
    }

    #[test]
    fn initial_phase_is_selecting_lobby() {
        let mut state = ClientState::new("id-a", None);
        assert_eq!(state.phase(), PlayerPhase::SelectingLobby);

        state.set_phase(PlayerPhase::PickingCard);
        assert_eq!(state.phase(), PlayerPhase::PickingCard);
    }
}
