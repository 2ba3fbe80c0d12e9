//! Error types for the queue engine.

use queuesync_protocol::{ConnectionState, ProtocolError};
use thiserror::Error;

/// Result type for queue engine operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur while synchronizing a queue.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The transport could not establish a connection.
    #[error("connection failed: {0}")]
    Connect(String),

    /// A snapshot pull failed.
    #[error("snapshot fetch failed: {0}")]
    Fetch(String),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The booking backend refused or failed a reservation.
    #[error("reservation failed: {0}")]
    Reservation(String),

    /// Timeout.
    #[error("operation timed out")]
    Timeout,

    /// Not connected.
    #[error("not connected to the realtime service")]
    NotConnected,

    /// The event stream ended while subscribed.
    #[error("event stream closed")]
    StreamClosed,

    /// Invalid state transition.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state.
        from: ConnectionState,
        /// Attempted target state.
        to: ConnectionState,
    },

    /// Malformed wire data.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl QueueError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a caller-level retry policy may try again.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::Transport { retryable, .. } => *retryable,
            QueueError::Connect(_)
            | QueueError::Fetch(_)
            | QueueError::Timeout
            | QueueError::NotConnected
            | QueueError::StreamClosed => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(QueueError::transport_retryable("socket reset").is_retryable());
        assert!(!QueueError::transport_fatal("bad certificate").is_retryable());
        assert!(QueueError::Timeout.is_retryable());
        assert!(QueueError::Fetch("502".into()).is_retryable());
        assert!(!QueueError::Reservation("sold out".into()).is_retryable());
        assert!(!QueueError::Config("zero timeout".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = QueueError::InvalidStateTransition {
            from: ConnectionState::Connected,
            to: ConnectionState::Connecting,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition from connected to connecting"
        );
        assert_eq!(QueueError::StreamClosed.to_string(), "event stream closed");
    }
}
