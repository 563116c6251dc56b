//! Generic single-writer dispatcher: owns one model and one ordered
//! listener list, serializes every mutation and fans executed actions out
//! to all listeners in registration order.

use crate::listener::Listener;
use log::{debug, error};
use shared::{Action, ActionError, Game, Lobby, Matchmaking};
use std::sync::{Mutex, MutexGuard};

/// A model an action can be applied to authoritatively.
pub trait Model: Send + 'static {
    fn apply(&mut self, action: &mut Action) -> Result<(), ActionError>;
}

impl Model for Lobby {
    fn apply(&mut self, action: &mut Action) -> Result<(), ActionError> {
        action.execute_on_lobby(self)
    }
}

impl Model for Game {
    fn apply(&mut self, action: &mut Action) -> Result<(), ActionError> {
        action.execute_on_game(self)
    }
}

impl Model for Matchmaking {
    fn apply(&mut self, action: &mut Action) -> Result<(), ActionError> {
        action.execute_on_matchmaking(self)
    }
}

pub(crate) struct DispatcherInner<M> {
    pub(crate) model: M,
    pub(crate) listeners: Vec<Listener>,
}

impl<M> DispatcherInner<M> {
    /// Notifies every listener in registration order. One failing listener
    /// never prevents delivery to the others.
    pub(crate) fn notify_all(&self, action: &Action) {
        for listener in &self.listeners {
            if let Err(e) = listener.notify(action) {
                error!("failed to notify listener {}: {e}", listener.identity());
            }
        }
    }

    pub(crate) fn remove(&mut self, identity: &str) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.identity() != identity);
        self.listeners.len() != before
    }

    /// Removes and returns the listener with the given identity.
    pub(crate) fn take(&mut self, identity: &str) -> Option<Listener> {
        let at = self.listeners.iter().position(|l| l.identity() == identity)?;
        Some(self.listeners.remove(at))
    }
}

/// Single-writer owner of one model plus its listener fan-out list. All
/// mutations of the model and of the listener set go through one lock,
/// giving a total order per dispatcher; distinct dispatchers are fully
/// independent.
pub struct Dispatcher<M> {
    inner: Mutex<DispatcherInner<M>>,
}

impl<M: Model> Dispatcher<M> {
    pub fn new(model: M) -> Self {
        Self {
            inner: Mutex::new(DispatcherInner {
                model,
                listeners: Vec::new(),
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, DispatcherInner<M>> {
        self.inner.lock().unwrap()
    }

    /// Applies the action to the owned model, then fans it out to every
    /// registered listener. Business-rule rejections travel on the action;
    /// only contract violations surface as errors.
    pub fn execute(&self, action: &mut Action) -> Result<(), ActionError> {
        let mut inner = self.lock();
        debug!("executing {} from {}", action.name(), action.identity());

        inner.model.apply(action)?;
        inner.notify_all(action);
        Ok(())
    }

    pub fn register_new_listener(&self, listener: Listener) {
        let mut inner = self.lock();
        debug!("registering listener {}", listener.identity());
        inner.listeners.push(listener);
    }

    /// Removes a listener by identity. Idempotent: removing an absent
    /// listener is a no-op.
    pub fn remove_listener(&self, identity: &str) -> bool {
        let mut inner = self.lock();
        debug!("removing listener {identity}");
        inner.remove(identity)
    }

    /// Copies another dispatcher's current listeners into this one,
    /// preserving order. Later changes to the source do not propagate.
    pub fn inherit_listeners<N: Model>(&self, other: &Dispatcher<N>) {
        let inherited = other.listeners_snapshot();
        let mut inner = self.lock();
        inner.listeners.extend(inherited);
    }

    pub fn listeners_snapshot(&self) -> Vec<Listener> {
        self.lock().listeners.clone()
    }

    pub fn listeners_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn with_model<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        let inner = self.lock();
        f(&inner.model)
    }

    /// Mutates the model outside the action path. Used for roster edits
    /// that are broadcast separately via a sync action.
    pub fn with_model_mut<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        let mut inner = self.lock();
        f(&mut inner.model)
    }
}
