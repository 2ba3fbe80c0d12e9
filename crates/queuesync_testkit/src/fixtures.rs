//! Queue fixtures.
//!
//! Every fixture vehicle belongs to [`TEST_ROUTE`] and joined at a fixed
//! instant, so fixtures compare equal across runs.

use chrono::{DateTime, Duration, TimeZone, Utc};
use queuesync_protocol::{QueueEvent, QueueVehicle, RouteId, VehicleId};

/// Route used by all fixtures.
pub const TEST_ROUTE: &str = "route-1";

/// Seats of a fixture vehicle unless stated otherwise.
pub const DEFAULT_SEATS: u32 = 14;

/// Returns the fixture route.
pub fn test_route() -> RouteId {
    RouteId::new(TEST_ROUTE)
}

/// Returns the fixed instant the fixture queue opened, plus `minutes`.
pub fn at_minute(minutes: i64) -> DateTime<Utc> {
    let opened = Utc
        .with_ymd_and_hms(2024, 3, 1, 6, 0, 0)
        .single()
        .expect("valid fixture timestamp");
    opened + Duration::minutes(minutes)
}

/// Creates a waiting vehicle with `available` of [`DEFAULT_SEATS`] free.
///
/// The join time follows the position so ties are deterministic.
pub fn vehicle(id: &str, position: u32, available: u32) -> QueueVehicle {
    QueueVehicle::new(
        id,
        TEST_ROUTE,
        position,
        DEFAULT_SEATS,
        at_minute(i64::from(position)),
    )
    .with_available_seats(available)
}

/// Creates `len` waiting vehicles `v1..=vN` at dense positions.
pub fn queue_of(len: u32) -> Vec<QueueVehicle> {
    (1..=len)
        .map(|n| vehicle(&format!("v{n}"), n, DEFAULT_SEATS))
        .collect()
}

/// The reference queue: `v1` at 1 with 6 seats, `v2` at 2 with 14 seats.
pub fn scenario_queue() -> Vec<QueueVehicle> {
    vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14)]
}

/// Returns the ids of `vehicles` in list order.
pub fn ids(vehicles: &[QueueVehicle]) -> Vec<VehicleId> {
    vehicles.iter().map(|v| v.vehicle_id.clone()).collect()
}

/// Returns `(id, position)` pairs in list order.
pub fn positions(vehicles: &[QueueVehicle]) -> Vec<(String, u32)> {
    vehicles
        .iter()
        .map(|v| (v.vehicle_id.to_string(), v.position))
        .collect()
}

/// Renders events as a newline-delimited JSON log.
pub fn event_log(events: &[QueueEvent]) -> String {
    events
        .iter()
        .map(|event| serde_json::to_string(event).expect("events serialize"))
        .collect::<Vec<_>>()
        .join("\n")
}
