use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::debug;

use crate::api::RefreshError;

pub(crate) type RefreshOutcome = Result<String, RefreshError>;

type Waiter = oneshot::Sender<RefreshOutcome>;

enum GateState {
    Idle,
    /// One refresh is outstanding; callers that hit a 401 meanwhile wait here in arrival order
    Refreshing(Vec<Waiter>),
}

/// Single-flight gate around token refresh.
///
/// The state is only touched under a short synchronous lock, never across
/// an await, so deciding between "start a refresh" and "wait for the
/// running one" is atomic.
pub(crate) struct RefreshGate {
    state: Mutex<GateState>,
}

pub(crate) enum Admission<'a> {
    /// The caller must perform the refresh and settle the ticket
    Leader(RefreshTicket<'a>),
    /// A refresh is already running; the receiver yields its outcome
    Queued(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshGate {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Idle),
        }
    }

    fn state(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn admit(&self) -> Admission<'_> {
        let mut state = self.state();
        match &mut *state {
            GateState::Idle => {
                *state = GateState::Refreshing(Vec::new());
                Admission::Leader(RefreshTicket {
                    gate: self,
                    settled: false,
                })
            }
            GateState::Refreshing(waiters) => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                debug!(queued = waiters.len(), "Waiting for in-flight token refresh");
                Admission::Queued(rx)
            }
        }
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        matches!(*self.state(), GateState::Refreshing(_))
    }

    pub(crate) fn queued(&self) -> usize {
        match &*self.state() {
            GateState::Idle => 0,
            GateState::Refreshing(waiters) => waiters.len(),
        }
    }

    /// Return to idle, then hand the outcome to every waiter, oldest first.
    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let waiters = match std::mem::replace(&mut *self.state(), GateState::Idle) {
            GateState::Refreshing(waiters) => waiters,
            GateState::Idle => Vec::new(),
        };
        let count = waiters.len();
        for waiter in waiters {
            // A waiter whose caller went away just drops the outcome
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

/// Proof of leadership over one refresh. Dropping it unsettled releases the
/// waiters with [`RefreshError::Cancelled`].
pub(crate) struct RefreshTicket<'a> {
    gate: &'a RefreshGate,
    settled: bool,
}

impl RefreshTicket<'_> {
    /// Returns how many queued callers were released
    pub(crate) fn settle(mut self, outcome: &RefreshOutcome) -> usize {
        self.settled = true;
        self.gate.release(outcome)
    }
}

impl Drop for RefreshTicket<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let released = self.gate.release(&Err(RefreshError::Cancelled));
            debug!(released, "Token refresh abandoned");
        }
    }
}
