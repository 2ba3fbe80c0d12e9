//! Booking backend abstraction.

use crate::error::{QueueError, QueueResult};
use chrono::Utc;
use parking_lot::Mutex;
use queuesync_protocol::{Reservation, VehicleId};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

/// The backend that turns an optimistic selection into a real reservation.
pub trait ReservationBackend: Send + Sync + 'static {
    /// Reserves `seats` seats on `vehicle_id`.
    fn reserve_seats(
        &self,
        vehicle_id: &VehicleId,
        seats: u32,
    ) -> impl Future<Output = QueueResult<Reservation>> + Send;
}

/// An in-memory booking backend for testing.
///
/// Accepts every request unless a failure is injected, optionally after a
/// delay so tests can race queue events against the confirmation.
#[derive(Default)]
pub struct MockReservationBackend {
    delay: Mutex<Duration>,
    failure: Mutex<Option<String>>,
    requests: Mutex<Vec<(VehicleId, u32)>>,
}

impl MockReservationBackend {
    /// Creates a backend that confirms immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every answer by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Refuses every following request with `reason`.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    /// Accepts requests again.
    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<(VehicleId, u32)> {
        self.requests.lock().clone()
    }
}

impl ReservationBackend for MockReservationBackend {
    async fn reserve_seats(&self, vehicle_id: &VehicleId, seats: u32) -> QueueResult<Reservation> {
        self.requests.lock().push((vehicle_id.clone(), seats));
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().clone();
        match failure {
            Some(reason) => Err(QueueError::Reservation(reason)),
            None => Ok(Reservation::new(
                Uuid::new_v4().to_string(),
                vehicle_id.clone(),
                seats,
                Utc::now(),
            )),
        }
    }
}
