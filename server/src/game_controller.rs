//! Controller for one running game: dispatches game actions and syncs the
//! full game state to listeners that register mid-match.

use crate::dispatcher::Dispatcher;
use crate::listener::Listener;
use log::info;
use shared::game::GameId;
use shared::{Action, ActionError, ActionKind, Game, GameState};

pub struct GameController {
    dispatcher: Dispatcher<Game>,
}

impl GameController {
    pub fn new(game: Game) -> Self {
        Self {
            dispatcher: Dispatcher::new(game),
        }
    }

    pub fn game_id(&self) -> GameId {
        self.dispatcher.with_model(|game| game.id())
    }

    pub fn game_snapshot(&self) -> Game {
        self.dispatcher.with_model(|game| game.clone())
    }

    pub fn is_ended(&self) -> bool {
        self.dispatcher
            .with_model(|game| game.state() == GameState::Ended)
    }

    pub fn has_player_identity(&self, identity: &str) -> bool {
        self.dispatcher
            .with_model(|game| game.player_by_identity(identity).is_some())
    }

    pub fn has_player_nickname(&self, nickname: &str) -> bool {
        self.dispatcher
            .with_model(|game| game.player(nickname).is_some())
    }

    /// Rebinds a reconnecting player's seat to their new connection
    /// identity. Returns false if no such player exists.
    pub fn resume_player(&self, nickname: &str, identity: &str) -> bool {
        self.dispatcher
            .with_model_mut(|game| game.mark_reconnected(nickname, identity).is_some())
    }

    pub fn all_connected(&self) -> bool {
        self.dispatcher.with_model(|game| game.all_connected())
    }

    pub fn execute(&self, action: &mut Action) -> Result<(), ActionError> {
        self.dispatcher.execute(action)
    }

    /// Registers a listener and sends it the current game state so a
    /// reconnecting client starts from an up-to-date replica.
    pub fn register_new_listener(&self, listener: Listener) -> Result<(), ActionError> {
        info!(
            "listener {} attached to game {}",
            listener.identity(),
            self.game_id()
        );
        self.dispatcher.register_new_listener(listener);
        let mut sync = Action::server(ActionKind::GameStateSync {
            game: self.game_snapshot(),
        });
        self.dispatcher.execute(&mut sync)
    }

    pub fn remove_listener(&self, identity: &str) -> bool {
        self.dispatcher.remove_listener(identity)
    }

    pub fn listeners_count(&self) -> usize {
        self.dispatcher.listeners_count()
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher<Game> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::lobby::LobbyId;
    use shared::{Card, Lobby, Packet, Pawn};
    use tokio::sync::mpsc;

    fn two_player_game() -> Game {
        let mut lobby = Lobby::new(LobbyId(1));
        lobby
            .add_new_player("alice", "id-a", Some(Pawn::Red))
            .unwrap();
        lobby
            .add_new_player("bob", "id-b", Some(Pawn::Blue))
            .unwrap();
        lobby.start_game().unwrap();
        Game::from_lobby(GameId(9), &lobby, (0..20).map(Card).collect())
    }

    #[test]
    fn late_registration_receives_a_full_state_sync() {
        let controller = GameController::new(two_player_game());
        let (tx, mut rx) = mpsc::channel(8);
        controller
            .register_new_listener(Listener::remote("id-b", tx))
            .unwrap();

        match rx.try_recv().unwrap() {
            Packet::Action(action) => match action.kind {
                ActionKind::GameStateSync { game } => {
                    assert_eq!(game.id(), GameId(9));
                    assert_eq!(game.players().len(), 2);
                }
                other => panic!("unexpected action {other:?}"),
            },
            other => panic!("unexpected packet {other:?}"),
        }
    }

    #[test]
    fn player_identity_lookup_matches_the_roster() {
        let controller = GameController::new(two_player_game());
        assert!(controller.has_player_identity("id-a"));
        assert!(!controller.has_player_identity("id-z"));
    }
}
