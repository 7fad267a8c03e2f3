//! Session identity, username attribution, and the host-observed
//! `close-session` counter (spec.md §3's "Session counters").
//!
//! Grounded on `original_source/apps/netconf/netconf_rpc.c`'s `cc_closed`
//! global counter and `clicon_username_get`/`clicon_username_set` pair.

use std::sync::atomic::{AtomicU64, Ordering};

/// A NETCONF session identifier, as referenced by `<kill-session>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Per-session state machine (spec.md §4.6): `Open` after any operation
/// except `close-session`, `Closing` after it. `Closing` is terminal — the
/// host read loop stops after the reply for the `close-session` request is
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closing,
}

/// One NETCONF session's identity as seen by the dispatcher.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub username: Option<String>,
    pub state: SessionState,
}

impl Session {
    pub fn new(id: SessionId, username: Option<String>) -> Session {
        Session {
            id,
            username,
            state: SessionState::Open,
        }
    }

    /// Apply the state transition a dispatched operation name causes.
    pub fn observe_operation(&mut self, operation_name: &str) {
        if operation_name == "close-session" {
            self.state = SessionState::Closing;
        }
    }

    pub fn is_closing(&self) -> bool {
        self.state == SessionState::Closing
    }
}

/// Monotonically-increasing count of received `<close-session>` requests,
/// shared across sessions handled by one host process (spec.md §3).
#[derive(Debug, Default)]
pub struct CloseSessionCounter(AtomicU64);

impl CloseSessionCounter {
    pub fn new() -> CloseSessionCounter {
        CloseSessionCounter(AtomicU64::new(0))
    }

    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_session_transitions_to_closing() {
        let mut session = Session::new(SessionId(1), Some("alice".to_string()));
        assert_eq!(session.state, SessionState::Open);
        session.observe_operation("get-config");
        assert_eq!(session.state, SessionState::Open);
        session.observe_operation("close-session");
        assert!(session.is_closing());
    }

    #[test]
    fn counter_is_monotonic() {
        let counter = CloseSessionCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
    }
}
