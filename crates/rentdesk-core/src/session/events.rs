use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per subscriber before old ones are dropped
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The user logged out
    LoggedOut,
    /// A request was rejected and there was no refresh token to recover with
    MissingRefreshToken,
    /// The refresh call itself failed
    RefreshFailed,
    /// A request replayed with a fresh token was still rejected
    ReplayRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    /// Hosts should send the user back to the login screen
    Terminated(TerminationReason),
}

/// Fan-out of session lifecycle events to whoever hosts the client.
#[derive(Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        if self.sender.send(event.clone()).is_err() {
            debug!(?event, "Session event had no subscribers");
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
