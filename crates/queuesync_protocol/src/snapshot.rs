//! Snapshot encoding and validation.

use crate::error::ProtocolResult;
use crate::ids::{RouteId, VehicleId};
use crate::vehicle::{QueueVehicle, VehicleStatus};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Decodes a snapshot (a JSON array of vehicles).
pub fn decode_snapshot(json: &str) -> ProtocolResult<Vec<QueueVehicle>> {
    Ok(serde_json::from_str(json)?)
}

/// Encodes a snapshot as a pretty-printed JSON array.
pub fn encode_snapshot(vehicles: &[QueueVehicle]) -> ProtocolResult<String> {
    Ok(serde_json::to_string_pretty(vehicles)?)
}

/// A data-quality problem found in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotIssue {
    /// A record failed [`QueueVehicle::validate`].
    InvalidRecord {
        /// Offending vehicle.
        vehicle_id: VehicleId,
        /// Validation message.
        reason: String,
    },
    /// A vehicle belongs to another route.
    ForeignRoute {
        /// Offending vehicle.
        vehicle_id: VehicleId,
        /// The route it claims.
        route_id: RouteId,
    },
    /// The same vehicle appears more than once.
    DuplicateVehicle(VehicleId),
    /// Two queued vehicles share a position.
    DuplicatePosition(u32),
    /// A position in `1..=N` is not taken by any queued vehicle.
    MissingPosition(u32),
}

impl fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotIssue::InvalidRecord { vehicle_id, reason } => {
                write!(f, "vehicle {vehicle_id}: {reason}")
            }
            SnapshotIssue::ForeignRoute {
                vehicle_id,
                route_id,
            } => write!(f, "vehicle {vehicle_id} belongs to route {route_id}"),
            SnapshotIssue::DuplicateVehicle(id) => write!(f, "vehicle {id} listed more than once"),
            SnapshotIssue::DuplicatePosition(pos) => write!(f, "position {pos} is taken twice"),
            SnapshotIssue::MissingPosition(pos) => write!(f, "position {pos} is empty"),
        }
    }
}

/// Checks a snapshot for `route_id` against the queue invariants.
///
/// Departed vehicles are ignored for position density. Returns an empty list
/// when the snapshot is clean.
pub fn validate_snapshot(route_id: &RouteId, vehicles: &[QueueVehicle]) -> Vec<SnapshotIssue> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut positions: BTreeMap<u32, usize> = BTreeMap::new();

    for vehicle in vehicles {
        if let Err(e) = vehicle.validate() {
            issues.push(SnapshotIssue::InvalidRecord {
                vehicle_id: vehicle.vehicle_id.clone(),
                reason: e.to_string(),
            });
        }
        if &vehicle.route_id != route_id {
            issues.push(SnapshotIssue::ForeignRoute {
                vehicle_id: vehicle.vehicle_id.clone(),
                route_id: vehicle.route_id.clone(),
            });
        }
        if !seen.insert(&vehicle.vehicle_id) {
            issues.push(SnapshotIssue::DuplicateVehicle(vehicle.vehicle_id.clone()));
        }
        if vehicle.status != VehicleStatus::Departed {
            *positions.entry(vehicle.position).or_default() += 1;
        }
    }

    let queued = positions.values().sum::<usize>() as u32;
    for (&position, &count) in &positions {
        if count > 1 {
            issues.push(SnapshotIssue::DuplicatePosition(position));
        }
    }
    for position in 1..=queued {
        if !positions.contains_key(&position) {
            issues.push(SnapshotIssue::MissingPosition(position));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn vehicle(id: &str, position: u32) -> QueueVehicle {
        let joined_at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        QueueVehicle::new(id, "r1", position, 14, joined_at)
    }

    #[test]
    fn clean_snapshot_has_no_issues() {
        let route = RouteId::new("r1");
        let vehicles = vec![vehicle("a", 2), vehicle("b", 1), vehicle("c", 3)];
        assert!(validate_snapshot(&route, &vehicles).is_empty());
    }

    #[test]
    fn reports_gaps_and_duplicates() {
        let route = RouteId::new("r1");
        let vehicles = vec![vehicle("a", 1), vehicle("b", 1), vehicle("c", 4)];
        let issues = validate_snapshot(&route, &vehicles);

        assert!(issues.contains(&SnapshotIssue::DuplicatePosition(1)));
        assert!(issues.contains(&SnapshotIssue::MissingPosition(2)));
        assert!(issues.contains(&SnapshotIssue::MissingPosition(3)));
    }

    #[test]
    fn departed_vehicles_do_not_count() {
        let route = RouteId::new("r1");
        let vehicles = vec![
            vehicle("a", 1),
            vehicle("gone", 1).with_status(VehicleStatus::Departed),
        ];
        assert!(validate_snapshot(&route, &vehicles).is_empty());
    }

    #[test]
    fn reports_foreign_and_duplicate_vehicles() {
        let route = RouteId::new("r1");
        let mut stray = vehicle("x", 2);
        stray.route_id = RouteId::new("r2");
        let vehicles = vec![vehicle("a", 1), stray, vehicle("a", 3)];
        let issues = validate_snapshot(&route, &vehicles);

        assert!(issues
            .iter()
            .any(|i| matches!(i, SnapshotIssue::ForeignRoute { .. })));
        assert!(issues.contains(&SnapshotIssue::DuplicateVehicle(VehicleId::new("a"))));
    }

    #[test]
    fn snapshot_json_round_trip() {
        let vehicles = vec![vehicle("a", 1), vehicle("b", 2)];
        let json = encode_snapshot(&vehicles).unwrap();
        assert_eq!(decode_snapshot(&json).unwrap(), vehicles);
    }
}
