//! Top-level router: maps each client identity to the controller that
//! currently owns it (matchmaking, a lobby, or a game) and moves clients
//! between controllers as lobbies fill up and games start and end.

use crate::game_controller::GameController;
use crate::listener::Listener;
use crate::lobby_controller::LobbyController;
use crate::matchmaking_controller::{MatchmakingController, MatchmakingOutcome};
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::game::GameId;
use shared::lobby::LobbyId;
use shared::{Action, ActionError, ActionKind, Card, Game, Lobby, Pawn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Cards dealt into a fresh deck before shuffling.
const DECK_SIZE: u16 = 80;

#[derive(Debug)]
pub enum DispatchError {
    UnknownIdentity(String),
    Action(ActionError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnknownIdentity(identity) => {
                write!(f, "no controller is bound to identity {identity}")
            }
            DispatchError::Action(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<ActionError> for DispatchError {
    fn from(err: ActionError) -> Self {
        DispatchError::Action(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Matchmaking,
    Lobby(LobbyId),
    Game(GameId),
}

struct RoutingState {
    routes: HashMap<String, Route>,
    lobbies: HashMap<LobbyId, Arc<LobbyController>>,
    games: HashMap<GameId, Arc<GameController>>,
}

/// The server's single entry point for registrations, removals and action
/// dispatches. Holds only the routing table under its own lock; each
/// controller serializes its own dispatches, so distinct lobbies and games
/// never contend with each other.
pub struct ServerDispatcher {
    matchmaking: MatchmakingController,
    state: Mutex<RoutingState>,
}

impl ServerDispatcher {
    pub fn new() -> Self {
        Self {
            matchmaking: MatchmakingController::new(),
            state: Mutex::new(RoutingState {
                routes: HashMap::new(),
                lobbies: HashMap::new(),
                games: HashMap::new(),
            }),
        }
    }

    /// Admits a new client. Every client starts out in matchmaking; a
    /// listener without an identity cannot be routed and is dropped.
    pub fn register_new_listener(&self, listener: Listener) -> Result<(), DispatchError> {
        let identity = listener.identity().to_string();
        if identity.is_empty() {
            warn!("dropping listener with empty identity");
            return Ok(());
        }

        self.state
            .lock()
            .unwrap()
            .routes
            .insert(identity.clone(), Route::Matchmaking);
        self.matchmaking.register_new_listener(listener)?;
        info!("client {identity} registered");
        Ok(())
    }

    /// Detaches a client wherever it currently is. Idempotent.
    pub fn remove_listener(&self, identity: &str) -> Result<(), DispatchError> {
        let route = self.state.lock().unwrap().routes.remove(identity);
        let Some(route) = route else { return Ok(()) };

        match route {
            Route::Matchmaking => {
                self.matchmaking.remove_listener(identity);
            }
            Route::Lobby(lobby_id) => {
                if let Some(lobby) = self.lobby_controller(lobby_id) {
                    lobby.remove_listener(identity)?;
                    if lobby.lobby_snapshot().player_count() == 0 {
                        info!("lobby {lobby_id} emptied, dropping it");
                        self.state.lock().unwrap().lobbies.remove(&lobby_id);
                    }
                    self.refresh_lobby_list()?;
                }
            }
            Route::Game(game_id) => {
                if let Some(game) = self.game_controller(game_id) {
                    game.remove_listener(identity);
                    let mut hang = Action::new(ActionKind::HangGame, identity);
                    game.execute(&mut hang)?;
                    if game.is_ended() {
                        self.finish_game(game_id)?;
                    }
                }
            }
        }
        info!("client {identity} detached");
        Ok(())
    }

    /// Routes one action to the controller owning its identity and reacts
    /// to the outcome: matchmaking placements, lobby promotion to a game.
    pub fn execute(&self, action: &mut Action) -> Result<(), DispatchError> {
        let route = self
            .state
            .lock()
            .unwrap()
            .routes
            .get(action.identity())
            .copied()
            .ok_or_else(|| DispatchError::UnknownIdentity(action.identity().to_string()))?;

        match route {
            Route::Matchmaking => {
                let outcome = self.matchmaking.execute(action)?;
                self.apply_matchmaking_outcome(action, outcome)
            }
            Route::Lobby(lobby_id) => {
                let Some(lobby) = self.lobby_controller(lobby_id) else {
                    return Err(DispatchError::UnknownIdentity(action.identity().to_string()));
                };
                let ready = lobby.execute(action)?;
                if ready {
                    self.migrate_lobby_to_game(lobby_id)?;
                }
                Ok(())
            }
            Route::Game(game_id) => {
                let Some(game) = self.game_controller(game_id) else {
                    return Err(DispatchError::UnknownIdentity(action.identity().to_string()));
                };
                game.execute(action)?;
                if game.is_ended() {
                    self.finish_game(game_id)?;
                }
                Ok(())
            }
        }
    }

    /// Tears down a finished game and returns its surviving listeners to
    /// the matchmaking pool.
    fn finish_game(&self, game_id: GameId) -> Result<(), DispatchError> {
        let controller = {
            let mut state = self.state.lock().unwrap();
            state
                .routes
                .retain(|_, route| *route != Route::Game(game_id));
            state.games.remove(&game_id)
        };
        let Some(controller) = controller else { return Ok(()) };
        info!("game {game_id:?} ended, returning its players to matchmaking");

        for listener in controller.dispatcher().listeners_snapshot() {
            self.state
                .lock()
                .unwrap()
                .routes
                .insert(listener.identity().to_string(), Route::Matchmaking);
            self.matchmaking.register_new_listener(listener)?;
        }
        Ok(())
    }

    /// Drops finished games and their routes.
    pub fn cleanup(&self) {
        let mut state = self.state.lock().unwrap();
        let ended: Vec<GameId> = state
            .games
            .iter()
            .filter(|(_, game)| game.is_ended())
            .map(|(id, _)| *id)
            .collect();

        for game_id in ended {
            info!("game {game_id:?} ended, dropping its controller");
            state.games.remove(&game_id);
            state
                .routes
                .retain(|_, route| *route != Route::Game(game_id));
        }
    }

    pub fn open_lobbies(&self) -> Vec<Lobby> {
        let state = self.state.lock().unwrap();
        let mut lobbies: Vec<Lobby> = state
            .lobbies
            .values()
            .map(|controller| controller.lobby_snapshot())
            .collect();
        lobbies.sort_by_key(|lobby| lobby.id());
        lobbies
    }

    pub fn games_count(&self) -> usize {
        self.state.lock().unwrap().games.len()
    }

    fn lobby_controller(&self, lobby_id: LobbyId) -> Option<Arc<LobbyController>> {
        self.state.lock().unwrap().lobbies.get(&lobby_id).cloned()
    }

    fn game_controller(&self, game_id: GameId) -> Option<Arc<GameController>> {
        self.state.lock().unwrap().games.get(&game_id).cloned()
    }

    fn apply_matchmaking_outcome(
        &self,
        action: &mut Action,
        outcome: MatchmakingOutcome,
    ) -> Result<(), DispatchError> {
        match outcome {
            MatchmakingOutcome::Broadcast => Ok(()),
            MatchmakingOutcome::CreateLobby {
                listener,
                nickname,
                pawn,
            } => {
                let Some(listener) = listener else { return Ok(()) };
                self.create_lobby(listener, &nickname, pawn)
            }
            MatchmakingOutcome::JoinLobby {
                listener,
                nickname,
                lobby_id,
                pawn,
            } => {
                let Some(listener) = listener else { return Ok(()) };
                self.join_lobby(listener, &nickname, lobby_id, pawn)
            }
            MatchmakingOutcome::Reconnect { listener, nickname } => {
                let Some(listener) = listener else { return Ok(()) };
                self.reconnect(listener, &nickname, action)
            }
        }
    }

    fn create_lobby(
        &self,
        listener: Listener,
        nickname: &str,
        pawn: Pawn,
    ) -> Result<(), DispatchError> {
        let identity = listener.identity().to_string();
        let lobby_id = LobbyId(rand::thread_rng().gen());
        let mut lobby = Lobby::new(lobby_id);
        if let Err(err) = lobby.add_new_player(nickname, &identity, Some(pawn)) {
            return self.bounce_to_matchmaking(listener, &err.to_string());
        }

        let controller = Arc::new(LobbyController::new(lobby.clone()));
        {
            let mut state = self.state.lock().unwrap();
            state.lobbies.insert(lobby_id, Arc::clone(&controller));
            state.routes.insert(identity.clone(), Route::Lobby(lobby_id));
        }
        info!("{nickname} ({identity}) created lobby {lobby_id}");

        // The creator learns which lobby the server actually built before
        // the regular roster sync arrives.
        let created = Action::new(
            ActionKind::CreateLobby {
                nickname: nickname.to_string(),
                pawn,
                created_lobby: Some(lobby),
            },
            &identity,
        );
        if let Err(e) = listener.notify(&created) {
            warn!("could not confirm lobby creation to {identity}: {e}");
        }

        controller.register_new_listener(listener)?;
        self.refresh_lobby_list()?;
        Ok(())
    }

    fn join_lobby(
        &self,
        listener: Listener,
        nickname: &str,
        lobby_id: LobbyId,
        pawn: Option<Pawn>,
    ) -> Result<(), DispatchError> {
        let identity = listener.identity().to_string();
        let Some(controller) = self.lobby_controller(lobby_id) else {
            return self.bounce_to_matchmaking(listener, "Lobby no longer exists");
        };

        if let Err(err) = controller.add_player(nickname, &identity, pawn) {
            return self.bounce_to_matchmaking(listener, &err.to_string());
        }

        self.state
            .lock()
            .unwrap()
            .routes
            .insert(identity.clone(), Route::Lobby(lobby_id));
        info!("{nickname} ({identity}) joined lobby {lobby_id}");

        controller.register_new_listener(listener)?;
        self.refresh_lobby_list()?;
        Ok(())
    }

    fn reconnect(
        &self,
        listener: Listener,
        nickname: &str,
        action: &Action,
    ) -> Result<(), DispatchError> {
        let identity = listener.identity().to_string();
        let found = {
            let state = self.state.lock().unwrap();
            state
                .games
                .iter()
                .find(|(_, game)| game.has_player_nickname(nickname))
                .map(|(id, game)| (*id, Arc::clone(game)))
        };

        let Some((game_id, controller)) = found else {
            return self.bounce_to_matchmaking(listener, "No game to reconnect to");
        };

        controller.resume_player(nickname, &identity);
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(identity.clone(), Route::Game(game_id));
        controller.register_new_listener(listener)?;
        info!("{nickname} ({identity}) reconnected to game {game_id:?}");

        let mut resume = Action::new(
            ActionKind::ResumeGame {
                game: controller.game_snapshot(),
                all_clients_ready: controller.all_connected(),
            },
            action.identity(),
        );
        controller.execute(&mut resume)?;
        Ok(())
    }

    /// Promotes a ready lobby to a running game: deals a shuffled deck,
    /// carries every listener over in order and announces the start.
    fn migrate_lobby_to_game(&self, lobby_id: LobbyId) -> Result<(), DispatchError> {
        let controller = {
            let mut state = self.state.lock().unwrap();
            let Some(controller) = state.lobbies.remove(&lobby_id) else {
                return Ok(());
            };
            controller
        };

        let lobby = controller.lobby_snapshot();
        let game_id = GameId(rand::thread_rng().gen());
        let mut deck: Vec<Card> = (0..DECK_SIZE).map(Card).collect();
        deck.shuffle(&mut rand::thread_rng());
        let game = Game::from_lobby(game_id, &lobby, deck);

        let game_controller = Arc::new(GameController::new(game.clone()));
        controller.inherit_listeners_into(game_controller.dispatcher());

        {
            let mut state = self.state.lock().unwrap();
            state.games.insert(game_id, Arc::clone(&game_controller));
            for player in lobby.players() {
                state
                    .routes
                    .insert(player.identity.clone(), Route::Game(game_id));
            }
        }
        info!(
            "lobby {lobby_id} started game {game_id:?} with {} players",
            lobby.player_count()
        );

        let mut started = Action::server(ActionKind::GameStarted { game });
        game_controller.execute(&mut started)?;
        self.refresh_lobby_list()?;
        Ok(())
    }

    /// Notifies the requester of a placement failure and returns it to the
    /// matchmaking pool. Nobody else hears about it.
    fn bounce_to_matchmaking(
        &self,
        listener: Listener,
        message: &str,
    ) -> Result<(), DispatchError> {
        let identity = listener.identity().to_string();
        debug!("returning {identity} to matchmaking: {message}");

        let error = Action::server(ActionKind::Error {
            message: message.to_string(),
        });
        if let Err(e) = listener.notify(&error) {
            warn!("could not deliver placement error to {identity}: {e}");
        }

        self.state
            .lock()
            .unwrap()
            .routes
            .insert(identity, Route::Matchmaking);
        self.matchmaking.register_new_listener(listener)?;
        Ok(())
    }

    fn refresh_lobby_list(&self) -> Result<(), DispatchError> {
        self.matchmaking.broadcast_lobby_list(self.open_lobbies())?;
        Ok(())
    }
}

impl Default for ServerDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
