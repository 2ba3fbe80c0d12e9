//! # QueueSync Protocol
//!
//! Queue data model and wire codec for QueueSync.
//!
//! This crate provides:
//! - `QueueVehicle` records and `VehicleStatus`
//! - `QueueEvent` incremental and full-sync events
//! - `ConnectionState` and its legal transitions
//! - `Reservation` records returned by the booking backend
//! - JSON encoding/decoding of events and snapshots
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod event;
mod ids;
mod reservation;
mod snapshot;
mod vehicle;

pub use connection::ConnectionState;
pub use error::{ProtocolError, ProtocolResult};
pub use event::QueueEvent;
pub use ids::{RouteId, VehicleId};
pub use reservation::Reservation;
pub use snapshot::{decode_snapshot, encode_snapshot, validate_snapshot, SnapshotIssue};
pub use vehicle::{QueueVehicle, VehicleStatus};
