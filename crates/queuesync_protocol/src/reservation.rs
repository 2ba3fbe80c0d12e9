//! Seat reservations confirmed by the booking backend.

use crate::ids::VehicleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A confirmed seat reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Backend-assigned reservation identifier.
    pub reservation_id: String,
    /// Vehicle the seats are held on.
    pub vehicle_id: VehicleId,
    /// Number of seats held.
    pub seats: u32,
    /// When the backend accepted the reservation.
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a reservation record.
    pub fn new(
        reservation_id: impl Into<String>,
        vehicle_id: impl Into<VehicleId>,
        seats: u32,
        reserved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reservation_id: reservation_id.into(),
            vehicle_id: vehicle_id.into(),
            seats,
            reserved_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_backend_reservation() {
        let json = r#"{"reservationId":"res-42","vehicleId":"v2","seats":5,"reservedAt":"2024-03-01T07:15:00Z"}"#;
        let reservation: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(reservation.reservation_id, "res-42");
        assert_eq!(reservation.vehicle_id, VehicleId::new("v2"));
        assert_eq!(reservation.seats, 5);
    }
}
