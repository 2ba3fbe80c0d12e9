//! Queue events.

use crate::error::ProtocolResult;
use crate::ids::VehicleId;
use crate::vehicle::{QueueVehicle, VehicleStatus};
use serde::{Deserialize, Serialize};

/// A change to a route's departure queue.
///
/// Incremental deltas and full snapshots share this one type so that the
/// reducer has a single entry point regardless of where the data came from.
///
/// # Wire format
///
/// JSON objects tagged by `"type"`:
///
/// ```json
/// {"type": "vehicleLeft", "vehicleId": "v1"}
/// {"type": "seatCountChanged", "vehicleId": "v2", "availableSeats": 9}
/// ```
///
/// Unrecognized `"type"` values decode to [`QueueEvent::Unknown`] so newer
/// backends can add event kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum QueueEvent {
    /// A vehicle entered the queue (or its record was re-sent).
    VehicleJoined {
        /// The full vehicle record.
        vehicle: QueueVehicle,
    },
    /// A vehicle left the queue.
    VehicleLeft {
        /// Vehicle that left.
        vehicle_id: VehicleId,
    },
    /// A vehicle moved to a new position.
    PositionChanged {
        /// Vehicle that moved.
        vehicle_id: VehicleId,
        /// New 1-based position.
        new_position: u32,
    },
    /// A vehicle's free seat count changed.
    SeatCountChanged {
        /// Vehicle whose seats changed.
        vehicle_id: VehicleId,
        /// New free seat count. Signed so out-of-range values survive decoding
        /// and can be clamped by the reducer.
        available_seats: i64,
    },
    /// A vehicle's boarding status changed.
    StatusChanged {
        /// Vehicle whose status changed.
        vehicle_id: VehicleId,
        /// New status.
        status: VehicleStatus,
    },
    /// Authoritative full snapshot of the queue.
    QueueSynced {
        /// Every vehicle in the queue.
        vehicles: Vec<QueueVehicle>,
    },
    /// The backend reported an error on the stream.
    Error {
        /// Human-readable message.
        message: String,
    },
    /// An event kind this client does not understand.
    #[serde(other)]
    Unknown,
}

impl QueueEvent {
    /// Creates a join event.
    pub fn joined(vehicle: QueueVehicle) -> Self {
        Self::VehicleJoined { vehicle }
    }

    /// Creates a leave event.
    pub fn left(vehicle_id: impl Into<VehicleId>) -> Self {
        Self::VehicleLeft {
            vehicle_id: vehicle_id.into(),
        }
    }

    /// Creates a position change event.
    pub fn position_changed(vehicle_id: impl Into<VehicleId>, new_position: u32) -> Self {
        Self::PositionChanged {
            vehicle_id: vehicle_id.into(),
            new_position,
        }
    }

    /// Creates a seat count change event.
    pub fn seat_count_changed(vehicle_id: impl Into<VehicleId>, available_seats: i64) -> Self {
        Self::SeatCountChanged {
            vehicle_id: vehicle_id.into(),
            available_seats,
        }
    }

    /// Creates a status change event.
    pub fn status_changed(vehicle_id: impl Into<VehicleId>, status: VehicleStatus) -> Self {
        Self::StatusChanged {
            vehicle_id: vehicle_id.into(),
            status,
        }
    }

    /// Creates a full sync event.
    pub fn synced(vehicles: Vec<QueueVehicle>) -> Self {
        Self::QueueSynced { vehicles }
    }

    /// Creates an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns the wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueEvent::VehicleJoined { .. } => "vehicleJoined",
            QueueEvent::VehicleLeft { .. } => "vehicleLeft",
            QueueEvent::PositionChanged { .. } => "positionChanged",
            QueueEvent::SeatCountChanged { .. } => "seatCountChanged",
            QueueEvent::StatusChanged { .. } => "statusChanged",
            QueueEvent::QueueSynced { .. } => "queueSynced",
            QueueEvent::Error { .. } => "error",
            QueueEvent::Unknown => "unknown",
        }
    }

    /// Returns the single vehicle this event touches, if any.
    pub fn vehicle_id(&self) -> Option<&VehicleId> {
        match self {
            QueueEvent::VehicleJoined { vehicle } => Some(&vehicle.vehicle_id),
            QueueEvent::VehicleLeft { vehicle_id }
            | QueueEvent::PositionChanged { vehicle_id, .. }
            | QueueEvent::SeatCountChanged { vehicle_id, .. }
            | QueueEvent::StatusChanged { vehicle_id, .. } => Some(vehicle_id),
            QueueEvent::QueueSynced { .. } | QueueEvent::Error { .. } | QueueEvent::Unknown => {
                None
            }
        }
    }

    /// Returns true if this event replaces the whole queue.
    pub fn is_full_sync(&self) -> bool {
        matches!(self, QueueEvent::QueueSynced { .. })
    }

    /// Decodes an event from JSON.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encodes the event as JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn decode_seat_count_changed() {
        let event =
            QueueEvent::from_json(r#"{"type":"seatCountChanged","vehicleId":"v2","availableSeats":-3}"#)
                .unwrap();
        assert_eq!(event, QueueEvent::seat_count_changed("v2", -3));
        assert_eq!(event.vehicle_id().map(VehicleId::as_str), Some("v2"));
    }

    #[test]
    fn decode_status_changed() {
        let event =
            QueueEvent::from_json(r#"{"type":"statusChanged","vehicleId":"v1","status":"departed"}"#)
                .unwrap();
        assert_eq!(
            event,
            QueueEvent::status_changed("v1", VehicleStatus::Departed)
        );
    }

    #[test]
    fn unknown_kind_is_tolerated() {
        let event =
            QueueEvent::from_json(r#"{"type":"driverRated","vehicleId":"v1","stars":5}"#).unwrap();
        assert_eq!(event, QueueEvent::Unknown);
        assert_eq!(event.kind(), "unknown");
        assert!(event.vehicle_id().is_none());
    }

    #[test]
    fn missing_tag_is_an_error() {
        assert!(QueueEvent::from_json(r#"{"vehicleId":"v1"}"#).is_err());
    }

    #[test]
    fn join_event_json_shape() {
        let joined_at = Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap();
        let event = QueueEvent::joined(QueueVehicle::new("v9", "r1", 3, 14, joined_at));
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "vehicleJoined");
        assert_eq!(json["vehicle"]["vehicleId"], "v9");
        assert_eq!(json["vehicle"]["position"], 3);
        assert_eq!(QueueEvent::from_json(&json.to_string()).unwrap(), event);
    }

    #[test]
    fn full_sync_detection() {
        assert!(QueueEvent::synced(Vec::new()).is_full_sync());
        assert!(!QueueEvent::left("v1").is_full_sync());
        assert_eq!(QueueEvent::error("boom").kind(), "error");
    }
}
