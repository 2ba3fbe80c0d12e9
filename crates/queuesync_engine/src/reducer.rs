//! Queue update handler.
//!
//! Pure functions mapping `(vehicles, event)` to a new vehicle list. The
//! reducer is total: every event kind, including unknown ones, produces a
//! list, and nothing here can fail.
//!
//! # Invariants
//!
//! - The output is sorted by `position` ascending, ties broken by `joined_at`
//! - After a leave or a departure the remaining positions are exactly `1..=N`
//!
//! Events are treated as the latest authoritative delta for the field they
//! touch. No causal ordering is reconstructed, so a delayed event can
//! overwrite a newer value until the next full sync.

use queuesync_protocol::{QueueEvent, QueueVehicle, VehicleId, VehicleStatus};
use tracing::{debug, warn};

/// Applies one event to a vehicle list.
pub fn apply_event(mut vehicles: Vec<QueueVehicle>, event: &QueueEvent) -> Vec<QueueVehicle> {
    match event {
        QueueEvent::VehicleJoined { vehicle } if vehicle.status == VehicleStatus::Departed => {
            debug!(vehicle_id = %vehicle.vehicle_id, "departed vehicle joined, treated as removal");
            remove_and_renumber(vehicles, &vehicle.vehicle_id)
        }
        QueueEvent::VehicleJoined { vehicle } => {
            match find(&vehicles, &vehicle.vehicle_id) {
                Some(index) => vehicles[index] = vehicle.clone(),
                None => vehicles.push(vehicle.clone()),
            }
            sort_vehicles(vehicles)
        }
        QueueEvent::VehicleLeft { vehicle_id } => remove_and_renumber(vehicles, vehicle_id),
        QueueEvent::PositionChanged {
            vehicle_id,
            new_position,
        } => {
            let Some(index) = find(&vehicles, vehicle_id) else {
                debug!(%vehicle_id, "position change for unknown vehicle ignored");
                return vehicles;
            };
            vehicles[index].position = *new_position;
            sort_vehicles(vehicles)
        }
        QueueEvent::SeatCountChanged {
            vehicle_id,
            available_seats,
        } => {
            if let Some(index) = find(&vehicles, vehicle_id) {
                let vehicle = &mut vehicles[index];
                vehicle.available_seats = clamp_seats(*available_seats, vehicle.total_seats);
                if i64::from(vehicle.available_seats) != *available_seats {
                    warn!(
                        %vehicle_id,
                        reported = *available_seats,
                        total = vehicle.total_seats,
                        "seat count out of range, clamped"
                    );
                }
            }
            vehicles
        }
        QueueEvent::StatusChanged { vehicle_id, status } => {
            if *status == VehicleStatus::Departed {
                return remove_and_renumber(vehicles, vehicle_id);
            }
            if let Some(index) = find(&vehicles, vehicle_id) {
                vehicles[index].status = *status;
            }
            vehicles
        }
        QueueEvent::QueueSynced { vehicles: snapshot } => sort_vehicles(snapshot.clone()),
        QueueEvent::Error { .. } | QueueEvent::Unknown => vehicles,
    }
}

/// Sorts vehicles by position, breaking ties by join time.
///
/// Ties violate the positional invariant and are logged as a data-quality
/// problem.
pub fn sort_vehicles(mut vehicles: Vec<QueueVehicle>) -> Vec<QueueVehicle> {
    vehicles.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.joined_at.cmp(&b.joined_at))
    });
    if let Some(pair) = vehicles
        .windows(2)
        .find(|pair| pair[0].position == pair[1].position)
    {
        warn!(
            position = pair[0].position,
            first = %pair[0].vehicle_id,
            second = %pair[1].vehicle_id,
            "duplicate queue position, ordered by join time"
        );
    }
    vehicles
}

/// Rewrites positions as `1..=N` in the current order.
pub fn renumber(vehicles: &mut [QueueVehicle]) {
    for (index, vehicle) in vehicles.iter_mut().enumerate() {
        vehicle.position = index as u32 + 1;
    }
}

/// Clamps a reported seat count into `0..=total_seats`.
pub fn clamp_seats(reported: i64, total_seats: u32) -> u32 {
    reported.clamp(0, i64::from(total_seats)) as u32
}

/// Returns true if positions are exactly `1..=N` in list order.
pub fn has_dense_positions(vehicles: &[QueueVehicle]) -> bool {
    vehicles
        .iter()
        .enumerate()
        .all(|(index, vehicle)| vehicle.position == index as u32 + 1)
}

/// Returns true if positions never decrease along the list.
pub fn is_sorted_by_position(vehicles: &[QueueVehicle]) -> bool {
    vehicles
        .windows(2)
        .all(|pair| pair[0].position <= pair[1].position)
}

fn find(vehicles: &[QueueVehicle], vehicle_id: &VehicleId) -> Option<usize> {
    vehicles.iter().position(|v| &v.vehicle_id == vehicle_id)
}

fn remove_and_renumber(mut vehicles: Vec<QueueVehicle>, vehicle_id: &VehicleId) -> Vec<QueueVehicle> {
    let before = vehicles.len();
    vehicles.retain(|v| &v.vehicle_id != vehicle_id);
    if vehicles.len() == before {
        return vehicles;
    }
    renumber(&mut vehicles);
    vehicles
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn vehicle(id: &str, position: u32, seats: u32) -> QueueVehicle {
        QueueVehicle::new(id, "r1", position, 14, at(position as i64)).with_available_seats(seats)
    }

    fn ids(vehicles: &[QueueVehicle]) -> Vec<&str> {
        vehicles.iter().map(|v| v.vehicle_id.as_str()).collect()
    }

    #[test]
    fn leaving_vehicle_renumbers_the_rest() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14)];
        let queue = apply_event(queue, &QueueEvent::left("v1"));

        let mut expected = vehicle("v2", 2, 14);
        expected.position = 1;
        assert_eq!(queue, vec![expected]);
    }

    #[test]
    fn departure_shifts_followers_by_one() {
        let queue = vec![vehicle("v1", 1, 0), vehicle("v2", 2, 3), vehicle("v3", 3, 14)];
        let queue = apply_event(
            queue,
            &QueueEvent::status_changed("v1", VehicleStatus::Departed),
        );

        assert_eq!(ids(&queue), ["v2", "v3"]);
        assert_eq!(queue[0].position, 1);
        assert_eq!(queue[1].position, 2);
    }

    #[test]
    fn non_departure_status_updates_in_place() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14)];
        let queue = apply_event(
            queue,
            &QueueEvent::status_changed("v1", VehicleStatus::Boarding),
        );

        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].status, VehicleStatus::Boarding);
        assert_eq!(queue[0].position, 1);
    }

    #[test]
    fn duplicate_join_replaces() {
        let queue = vec![vehicle("v1", 1, 6)];
        let event = QueueEvent::joined(vehicle("v1", 1, 2));

        let once = apply_event(queue.clone(), &event);
        let twice = apply_event(once.clone(), &event);

        assert_eq!(once.len(), 1);
        assert_eq!(once[0].available_seats, 2);
        assert_eq!(once, twice);
    }

    #[test]
    fn departed_join_removes_instead_of_inserting() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14), vehicle("v3", 3, 14)];

        let gone = vehicle("v2", 2, 14).with_status(VehicleStatus::Departed);
        let queue = apply_event(queue, &QueueEvent::joined(gone));
        assert_eq!(ids(&queue), ["v1", "v3"]);
        assert!(has_dense_positions(&queue));

        let late = vehicle("late", 3, 14).with_status(VehicleStatus::Departed);
        let after = apply_event(queue.clone(), &QueueEvent::joined(late));
        assert_eq!(after, queue);
    }

    #[test]
    fn join_inserts_in_position_order() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v3", 3, 14)];
        let queue = apply_event(queue, &QueueEvent::joined(vehicle("v2", 2, 14)));
        assert_eq!(ids(&queue), ["v1", "v2", "v3"]);
    }

    #[test]
    fn position_change_resorts_without_renumbering() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14), vehicle("v3", 3, 14)];
        let queue = apply_event(queue, &QueueEvent::position_changed("v3", 1));

        // v1 keeps its server-assigned position until the server says otherwise
        assert_eq!(ids(&queue), ["v1", "v3", "v2"]);
        assert_eq!(queue[0].position, 1);
        assert_eq!(queue[1].position, 1);
    }

    #[test]
    fn position_ties_break_by_join_time() {
        let early = QueueVehicle::new("early", "r1", 2, 14, at(1));
        let late = QueueVehicle::new("late", "r1", 2, 14, at(9));
        let queue = sort_vehicles(vec![late, early]);
        assert_eq!(ids(&queue), ["early", "late"]);
    }

    #[test]
    fn seat_counts_are_clamped() {
        let queue = vec![vehicle("v1", 1, 6)];

        let queue = apply_event(queue, &QueueEvent::seat_count_changed("v1", -4));
        assert_eq!(queue[0].available_seats, 0);

        let queue = apply_event(queue, &QueueEvent::seat_count_changed("v1", 99));
        assert_eq!(queue[0].available_seats, 14);

        let queue = apply_event(queue, &QueueEvent::seat_count_changed("v1", 9));
        assert_eq!(queue[0].available_seats, 9);
    }

    #[test]
    fn unknown_vehicle_events_are_no_ops() {
        let queue = vec![vehicle("v1", 1, 6), vehicle("v2", 2, 14)];
        for event in [
            QueueEvent::left("ghost"),
            QueueEvent::position_changed("ghost", 1),
            QueueEvent::seat_count_changed("ghost", 3),
            QueueEvent::status_changed("ghost", VehicleStatus::Departed),
            QueueEvent::error("stream hiccup"),
            QueueEvent::Unknown,
        ] {
            assert_eq!(apply_event(queue.clone(), &event), queue, "{}", event.kind());
        }
    }

    #[test]
    fn sync_replaces_and_sorts() {
        let queue = vec![vehicle("old", 1, 6)];
        let snapshot = vec![vehicle("b", 2, 14), vehicle("a", 1, 3)];
        let queue = apply_event(queue, &QueueEvent::synced(snapshot.clone()));

        assert_eq!(queue, sort_vehicles(snapshot));
        assert_eq!(ids(&queue), ["a", "b"]);
    }

    #[test]
    fn invariant_helpers() {
        let dense = vec![vehicle("a", 1, 1), vehicle("b", 2, 1)];
        assert!(has_dense_positions(&dense));
        assert!(is_sorted_by_position(&dense));

        let gappy = vec![vehicle("a", 1, 1), vehicle("b", 3, 1)];
        assert!(!has_dense_positions(&gappy));
        assert!(is_sorted_by_position(&gappy));
    }
}
