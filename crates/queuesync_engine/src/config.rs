//! Configuration for the queue engine.

use crate::error::{QueueError, QueueResult};
use queuesync_protocol::RouteId;
use std::time::Duration;

/// Configuration for one route's queue orchestrator.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Route whose queue is synchronized.
    pub route_id: RouteId,
    /// Upper bound on the backend reservation call.
    pub reservation_timeout: Duration,
    /// How long a confirmed selection stays visible before it is cleared.
    pub confirmation_grace: Duration,
    /// Capacity of the before/after transition feed.
    pub transition_capacity: usize,
    /// Suggested buffer size for a transport's per-route event channel.
    pub event_buffer: usize,
}

impl QueueConfig {
    /// Creates a configuration for `route_id` with default timings.
    pub fn new(route_id: impl Into<RouteId>) -> Self {
        Self {
            route_id: route_id.into(),
            reservation_timeout: Duration::from_secs(10),
            confirmation_grace: Duration::from_secs(2),
            transition_capacity: 64,
            event_buffer: 256,
        }
    }

    /// Sets the reservation timeout.
    pub fn with_reservation_timeout(mut self, timeout: Duration) -> Self {
        self.reservation_timeout = timeout;
        self
    }

    /// Sets the confirmation grace window.
    pub fn with_confirmation_grace(mut self, grace: Duration) -> Self {
        self.confirmation_grace = grace;
        self
    }

    /// Sets the transition feed capacity.
    pub fn with_transition_capacity(mut self, capacity: usize) -> Self {
        self.transition_capacity = capacity;
        self
    }

    /// Sets the event buffer hint.
    pub fn with_event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> QueueResult<()> {
        if self.route_id.as_str().is_empty() {
            return Err(QueueError::Config("route id must not be empty".into()));
        }
        if self.reservation_timeout.is_zero() {
            return Err(QueueError::Config(
                "reservation timeout must be positive".into(),
            ));
        }
        if self.transition_capacity == 0 || self.event_buffer == 0 {
            return Err(QueueError::Config(
                "channel capacities must be positive".into(),
            ));
        }
        Ok(())
    }
}
