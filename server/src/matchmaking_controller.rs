//! Controller for clients that have not yet joined a lobby. Dispatches
//! matchmaking actions and hands the resulting placement decision back to
//! the server dispatcher as a value.

use crate::dispatcher::{Dispatcher, Model};
use crate::listener::Listener;
use log::debug;
use shared::lobby::LobbyId;
use shared::{Action, ActionError, ActionKind, Lobby, Matchmaking, MatchmakingRequest, Pawn};

/// What the server dispatcher should do after a matchmaking dispatch. The
/// requesting listener is taken out of the pool and handed back so it can
/// be re-seated (or re-registered on failure).
#[derive(Debug)]
pub enum MatchmakingOutcome {
    /// Nothing to place; the action only needed fan-out.
    Broadcast,
    CreateLobby {
        listener: Option<Listener>,
        nickname: String,
        pawn: Pawn,
    },
    JoinLobby {
        listener: Option<Listener>,
        nickname: String,
        lobby_id: LobbyId,
        pawn: Option<Pawn>,
    },
    Reconnect {
        listener: Option<Listener>,
        nickname: String,
    },
}

pub struct MatchmakingController {
    dispatcher: Dispatcher<Matchmaking>,
}

impl MatchmakingController {
    pub fn new() -> Self {
        Self {
            dispatcher: Dispatcher::new(Matchmaking::new()),
        }
    }

    /// Registers a listener and sends the current lobby list to the
    /// newcomer only; the rest of the pool already has it.
    pub fn register_new_listener(&self, listener: Listener) -> Result<(), ActionError> {
        let list = Action::server(ActionKind::LobbyList {
            lobbies: self.dispatcher.with_model(|m| m.lobbies().to_vec()),
        });
        if let Err(e) = listener.notify(&list) {
            debug!("could not deliver lobby list to {}: {e}", listener.identity());
        }
        self.dispatcher.register_new_listener(listener);
        Ok(())
    }

    pub fn remove_listener(&self, identity: &str) -> bool {
        self.dispatcher.remove_listener(identity)
    }

    pub fn listeners_count(&self) -> usize {
        self.dispatcher.listeners_count()
    }

    /// Dispatches one matchmaking action, then converts the request it
    /// recorded into a placement decision. The requester's listener is
    /// pulled from the pool as part of the decision.
    pub fn execute(&self, action: &mut Action) -> Result<MatchmakingOutcome, ActionError> {
        let mut inner = self.dispatcher.lock();
        inner.model.apply(action)?;
        inner.notify_all(action);

        let outcome = match inner.model.take_pending() {
            None => MatchmakingOutcome::Broadcast,
            Some(MatchmakingRequest::CreateLobby { nickname, pawn }) => {
                MatchmakingOutcome::CreateLobby {
                    listener: inner.take(action.identity()),
                    nickname,
                    pawn,
                }
            }
            Some(MatchmakingRequest::JoinLobby {
                nickname,
                lobby_id,
                pawn,
            }) => MatchmakingOutcome::JoinLobby {
                listener: inner.take(action.identity()),
                nickname,
                lobby_id,
                pawn,
            },
            Some(MatchmakingRequest::Reconnect { nickname }) => MatchmakingOutcome::Reconnect {
                listener: inner.take(action.identity()),
                nickname,
            },
        };
        Ok(outcome)
    }

    /// Replaces the visible lobby snapshot and broadcasts it to everyone
    /// still waiting to be placed.
    pub fn broadcast_lobby_list(&self, lobbies: Vec<Lobby>) -> Result<(), ActionError> {
        self.dispatcher
            .with_model_mut(|m| m.set_lobbies(lobbies.clone()));
        let mut list = Action::server(ActionKind::LobbyList { lobbies });
        self.dispatcher.execute(&mut list)
    }
}

impl Default for MatchmakingController {
    fn default() -> Self {
        Self::new()
    }
}
