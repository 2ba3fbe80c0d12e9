//! # QueueSync Engine
//!
//! Realtime queue synchronization for QueueSync clients.
//!
//! This crate provides:
//! - The queue reducer (pure event application)
//! - Realtime transport abstraction with an in-memory mock
//! - Booking backend abstraction with an in-memory mock
//! - Per-route queue orchestrator with optimistic seat selection
//! - A registry handing out one orchestrator per route
//! - Alert diffing and a notification hook
//!
//! ## Architecture
//!
//! The orchestrator reconciles three sources into one `QueueState`:
//! 1. An initial snapshot pulled from the backend
//! 2. A stream of incremental events pushed by the transport
//! 3. Local optimistic selections awaiting backend confirmation
//!
//! Snapshots and incremental events share one reducer entry point: a
//! snapshot is applied as a `QueueSynced` event.
//!
//! ## Key Invariants
//!
//! - Vehicles are always sorted by position
//! - Positions of queued vehicles stay dense after joins and departures
//! - Events of one route are applied one at a time, in receipt order
//! - At most one selection per route is pending
//! - A settled selection outcome never changes

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod alerts;
mod config;
mod error;
mod orchestrator;
pub mod reducer;
mod registry;
mod reservation;
mod state;
mod transport;

pub use alerts::{detect_alerts, AlertSink, Navigator, NotificationHook, QueueAlert};
pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use orchestrator::QueueOrchestrator;
pub use reducer::apply_event;
pub use registry::QueueRegistry;
pub use reservation::{MockReservationBackend, ReservationBackend};
pub use state::{PendingSelection, QueueState, SelectionOutcome, StateTransition};
pub use transport::{MockTransport, QueueTransport};
