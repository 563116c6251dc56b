//! Controller for one open lobby: dispatches lobby actions and keeps every
//! listener holding an up-to-date lobby snapshot.

use crate::dispatcher::Dispatcher;
use crate::listener::Listener;
use log::info;
use shared::lobby::LobbyId;
use shared::{Action, ActionError, ActionKind, Lobby, LobbyError, Pawn};

pub struct LobbyController {
    dispatcher: Dispatcher<Lobby>,
}

impl LobbyController {
    pub fn new(lobby: Lobby) -> Self {
        Self {
            dispatcher: Dispatcher::new(lobby),
        }
    }

    pub fn lobby_id(&self) -> LobbyId {
        self.dispatcher.with_model(|lobby| lobby.id())
    }

    pub fn lobby_snapshot(&self) -> Lobby {
        self.dispatcher.with_model(|lobby| lobby.clone())
    }

    /// Dispatches one action against the lobby. Returns whether the lobby
    /// reached the ready-to-start state so the caller can promote it to a
    /// running game.
    pub fn execute(&self, action: &mut Action) -> Result<bool, ActionError> {
        self.dispatcher.execute(action)?;
        Ok(self.dispatcher.with_model(|lobby| lobby.ready_to_start()))
    }

    /// Seats a player in the lobby. Does not notify; callers register the
    /// player's listener afterwards, which broadcasts the fresh roster.
    pub fn add_player(
        &self,
        nickname: &str,
        identity: &str,
        pawn: Option<Pawn>,
    ) -> Result<(), LobbyError> {
        self.dispatcher
            .with_model_mut(|lobby| lobby.add_new_player(nickname, identity, pawn))
    }

    /// Registers a listener and rebroadcasts the lobby state so the
    /// newcomer catches up and everyone else sees the updated roster.
    pub fn register_new_listener(&self, listener: Listener) -> Result<(), ActionError> {
        info!(
            "listener {} joined lobby {}",
            listener.identity(),
            self.lobby_id()
        );
        self.dispatcher.register_new_listener(listener);
        self.sync_lobby_state()
    }

    /// Removes a listener and drops its player from the roster. The
    /// remaining listeners get a fresh snapshot only if something was
    /// actually removed.
    pub fn remove_listener(&self, identity: &str) -> Result<(), ActionError> {
        let removed = self.dispatcher.remove_listener(identity);
        let dropped = self.dispatcher.with_model_mut(|lobby| {
            let nickname = lobby
                .players()
                .iter()
                .find(|p| p.identity == identity)
                .map(|p| p.nickname.clone());
            if let Some(nickname) = &nickname {
                lobby.remove_player(nickname);
            }
            nickname.is_some()
        });

        if removed || dropped {
            info!("listener {identity} left lobby {}", self.lobby_id());
            self.sync_lobby_state()?;
        }
        Ok(())
    }

    pub fn inherit_listeners_into(&self, target: &Dispatcher<shared::Game>) {
        target.inherit_listeners(&self.dispatcher);
    }

    pub fn listeners_count(&self) -> usize {
        self.dispatcher.listeners_count()
    }

    fn sync_lobby_state(&self) -> Result<(), ActionError> {
        let mut sync = Action::server(ActionKind::LobbyStateSync {
            lobby: self.lobby_snapshot(),
        });
        self.dispatcher.execute(&mut sync)
    }
}
