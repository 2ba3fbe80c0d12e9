//! # QueueSync Testkit
//!
//! Test utilities for QueueSync.
//!
//! This crate provides:
//! - Vehicle and queue fixtures, including the reference scenarios
//! - Property-based test generators using proptest
//! - Helpers for writing event logs in the wire format
//!
//! ## Usage
//!
//! ```rust,ignore
//! use queuesync_testkit::prelude::*;
//!
//! #[test]
//! fn front_vehicle_leaves() {
//!     let queue = scenario_queue();
//!     // ... apply events
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
