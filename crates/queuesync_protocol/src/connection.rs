//! Realtime connection states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state of a route's realtime subscription.
///
/// ```text
/// Disconnected ──► Connecting ──► Connected
///      ▲               │              │
///      │               ▼              ▼
///      └────────────  Error  ◄────────┘
/// ```
///
/// Every state may move to `Disconnected`. A dropped connection must pass
/// through `Error` or `Disconnected` before `Connecting` is entered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not subscribed.
    #[default]
    Disconnected,
    /// Connecting and seeding the initial snapshot.
    Connecting,
    /// Live: events are flowing.
    Connected,
    /// Connection or stream failure.
    Error,
}

impl ConnectionState {
    /// Returns true if moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        if *self == next {
            return true;
        }
        matches!(
            (*self, next),
            (Disconnected, Connecting)
                | (Error, Connecting)
                | (Connecting, Connected)
                | (Connecting, Error)
                | (Connected, Error)
                | (_, Disconnected)
        )
    }

    /// Returns true while a subscription is live or being established.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Returns the wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn legal_transitions() {
        assert!(Disconnected.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Connected));
        assert!(Connecting.can_transition_to(Error));
        assert!(Connected.can_transition_to(Error));
        assert!(Error.can_transition_to(Connecting));

        for state in [Disconnected, Connecting, Connected, Error] {
            assert!(state.can_transition_to(Disconnected));
            assert!(state.can_transition_to(state));
        }
    }

    #[test]
    fn reconnect_must_not_skip_error_or_disconnected() {
        assert!(!Connected.can_transition_to(Connecting));
        assert!(!Disconnected.can_transition_to(Connected));
        assert!(!Error.can_transition_to(Connected));
        assert!(!Disconnected.can_transition_to(Error));
    }

    #[test]
    fn active_states() {
        assert!(Connecting.is_active());
        assert!(Connected.is_active());
        assert!(!Disconnected.is_active());
        assert!(!Error.is_active());
    }
}
