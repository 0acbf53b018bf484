//! Notification fired when a refresh cycle fails and the session is over.

use tokio::sync::broadcast;

/// Receives terminal refresh failures. Called at most once per failed
/// cycle; each later cycle that fails calls it again, so implementations
/// should make the logged-out transition idempotent.
pub trait SessionTerminationSignal: Send + Sync {
    fn notify_expired(&self);
}

impl<F> SessionTerminationSignal for F
where
    F: Fn() + Send + Sync,
{
    fn notify_expired(&self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Expired,
}

/// Fan-out hub for session events; any number of collaborators can
/// subscribe. Events sent with no subscriber are dropped.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl SessionTerminationSignal for SessionEvents {
    fn notify_expired(&self) {
        let _ = self.tx.send(SessionEvent::Expired);
    }
}
