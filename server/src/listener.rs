//! Listener variants the dispatcher fans out to: a local in-process
//! listener applying actions to its own replica, and a remote listener
//! forwarding them over a connection with heartbeat-based liveness.

use shared::{Action, ClientState, Packet, HEARTBEAT_MAX_INTERVAL};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;

/// Bounded per-listener send queue. Keeps fan-out non-blocking without
/// letting a stalled client buffer unboundedly.
pub const SEND_QUEUE_CAPACITY: usize = 64;

/// Failure to hand an action to one listener. Isolated per listener: the
/// dispatcher logs it and keeps notifying the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    QueueFull(String),
    PeerGone(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::QueueFull(identity) => {
                write!(f, "send queue for listener {identity} is full")
            }
            NotifyError::PeerGone(identity) => {
                write!(f, "peer behind listener {identity} is gone")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// In-process subscriber owning its own client-state replica; every
/// notification is reflected onto it synchronously.
pub struct LocalListener {
    identity: String,
    state: Mutex<ClientState>,
}

impl LocalListener {
    pub fn new(state: ClientState) -> Self {
        Self {
            identity: state.identity().to_string(),
            state: Mutex::new(state),
        }
    }

    pub fn notify(&self, action: &Action) {
        let mut state = self.state.lock().unwrap();
        action.reflect(&mut state);
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ClientState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }
}

/// Outcome of one liveness check on a remote listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Suspect,
    Dead,
}

struct LivenessState {
    last_heartbeat: Instant,
    suspect: bool,
}

/// Remote subscriber: forwards actions through a bounded queue drained by
/// a dedicated sender task, and tracks peer liveness from heartbeats.
pub struct RemoteListener {
    identity: String,
    queue: mpsc::Sender<Packet>,
    liveness: Mutex<LivenessState>,
}

impl RemoteListener {
    pub fn new(identity: &str, queue: mpsc::Sender<Packet>) -> Self {
        Self {
            identity: identity.to_string(),
            queue,
            liveness: Mutex::new(LivenessState {
                last_heartbeat: Instant::now(),
                suspect: false,
            }),
        }
    }

    /// Enqueues the action for transmission. Never blocks; the queue
    /// preserves execute order.
    pub fn notify(&self, action: &Action) -> Result<(), NotifyError> {
        match self.queue.try_send(Packet::Action(action.clone())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(NotifyError::QueueFull(self.identity.clone()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(NotifyError::PeerGone(self.identity.clone()))
            }
        }
    }

    /// Records a heartbeat from the peer, clearing any suspicion.
    pub fn heartbeat(&self) {
        let mut liveness = self.liveness.lock().unwrap();
        liveness.last_heartbeat = Instant::now();
        liveness.suspect = false;
    }

    /// Non-blocking liveness probe.
    pub fn check_pulse(&self) -> bool {
        let liveness = self.liveness.lock().unwrap();
        liveness.last_heartbeat.elapsed() < HEARTBEAT_MAX_INTERVAL
    }

    /// Advances the liveness state machine one step: a silent peer becomes
    /// suspect, a peer that stays silent while suspect is declared dead.
    pub fn watchdog_tick(&self) -> Liveness {
        let mut liveness = self.liveness.lock().unwrap();
        if liveness.last_heartbeat.elapsed() < HEARTBEAT_MAX_INTERVAL {
            liveness.suspect = false;
            Liveness::Alive
        } else if !liveness.suspect {
            liveness.suspect = true;
            Liveness::Suspect
        } else {
            Liveness::Dead
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate_heartbeat(&self, by: std::time::Duration) {
        let mut liveness = self.liveness.lock().unwrap();
        liveness.last_heartbeat = Instant::now() - by;
    }
}

/// A subscriber to a dispatcher's action stream. Clonable so listener sets
/// can be inherited across controllers and so the network layer can keep a
/// handle for liveness bookkeeping.
#[derive(Clone)]
pub enum Listener {
    Local(Arc<LocalListener>),
    Remote(Arc<RemoteListener>),
}

impl Listener {
    pub fn local(state: ClientState) -> Self {
        Listener::Local(Arc::new(LocalListener::new(state)))
    }

    pub fn remote(identity: &str, queue: mpsc::Sender<Packet>) -> Self {
        Listener::Remote(Arc::new(RemoteListener::new(identity, queue)))
    }

    pub fn identity(&self) -> &str {
        match self {
            Listener::Local(local) => &local.identity,
            Listener::Remote(remote) => &remote.identity,
        }
    }

    pub fn notify(&self, action: &Action) -> Result<(), NotifyError> {
        match self {
            Listener::Local(local) => {
                local.notify(action);
                Ok(())
            }
            Listener::Remote(remote) => remote.notify(action),
        }
    }

    /// Local listeners are always reachable.
    pub fn check_pulse(&self) -> bool {
        match self {
            Listener::Local(_) => true,
            Listener::Remote(remote) => remote.check_pulse(),
        }
    }

    pub fn heartbeat(&self) {
        if let Listener::Remote(remote) = self {
            remote.heartbeat();
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Local(local) => write!(f, "Local({})", local.identity),
            Listener::Remote(remote) => write!(f, "Remote({})", remote.identity),
        }
    }
}
