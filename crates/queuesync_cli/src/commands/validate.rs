//! Validate command implementation.

use queuesync_protocol::{decode_snapshot, validate_snapshot, QueueVehicle, RouteId, SnapshotIssue};
use std::fs;
use std::path::Path;
use tracing::info;

/// Runs the validate command.
///
/// Fails when the snapshot breaks any queue invariant.
pub fn run(snapshot: &Path, route: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    info!("Validating snapshot {:?}", snapshot);

    let vehicles = decode_snapshot(&fs::read_to_string(snapshot)?)?;
    let Some(route_id) = expected_route(&vehicles, route) else {
        println!("✓ Snapshot is empty");
        return Ok(());
    };

    let issues = validate_snapshot(&route_id, &vehicles);
    print_result(&route_id, &vehicles, &issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(format!("snapshot has {} issue(s)", issues.len()).into())
    }
}

/// Picks the route to validate against.
fn expected_route(vehicles: &[QueueVehicle], route: Option<&str>) -> Option<RouteId> {
    match route {
        Some(route) => Some(RouteId::new(route)),
        None => vehicles.first().map(|v| v.route_id.clone()),
    }
}

fn print_result(route_id: &RouteId, vehicles: &[QueueVehicle], issues: &[SnapshotIssue]) {
    println!("Route {route_id}: {} vehicles", vehicles.len());
    if issues.is_empty() {
        println!("✓ No issues found");
        return;
    }
    println!("✗ {} issue(s):", issues.len());
    for issue in issues {
        println!("  - {issue}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuesync_testkit::prelude::*;

    #[test]
    fn route_defaults_to_first_vehicle() {
        let queue = scenario_queue();
        assert_eq!(expected_route(&queue, None), Some(test_route()));
        assert_eq!(
            expected_route(&queue, Some("other")),
            Some(RouteId::new("other"))
        );
        assert_eq!(expected_route(&[], None), None);
    }
}
