//! Error types for the queue protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding or validating protocol data.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Malformed JSON or a payload that does not match the schema.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A record decoded but violates a data-model rule.
    #[error("invalid vehicle {vehicle_id}: {reason}")]
    InvalidVehicle {
        /// Offending vehicle.
        vehicle_id: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ProtocolError {
    /// Creates an invalid-vehicle error.
    pub fn invalid_vehicle(vehicle_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVehicle {
            vehicle_id: vehicle_id.into(),
            reason: reason.into(),
        }
    }
}
