//! Property tests for the queue reducer.

use proptest::prelude::*;
use queuesync_engine::reducer::{
    apply_event, has_dense_positions, is_sorted_by_position, sort_vehicles,
};
use queuesync_protocol::QueueEvent;
use queuesync_testkit::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn membership_changes_keep_positions_dense(
        initial in dense_queue_strategy(8),
        ops in membership_sequence_strategy(0, 40),
    ) {
        let mut queue = initial;
        for op in &ops {
            let event = op.to_event(&queue);
            queue = apply_event(queue, &event);
            prop_assert!(has_dense_positions(&queue), "after {:?}: {:?}", op, positions(&queue));
        }
    }

    #[test]
    fn any_event_sequence_stays_sorted(
        initial in unordered_queue_strategy(8),
        events in event_sequence_strategy(0, 40),
    ) {
        let mut queue = sort_vehicles(initial);
        for event in &events {
            queue = apply_event(queue, event);
            prop_assert!(is_sorted_by_position(&queue), "after {}", event.kind());
        }
    }

    #[test]
    fn joins_are_idempotent(
        initial in dense_queue_strategy(8),
        joining in (vehicle_id_strategy(), 1u32..=12)
            .prop_flat_map(|(id, position)| vehicle_strategy(id, position)),
    ) {
        let event = QueueEvent::joined(joining);
        let once = apply_event(initial, &event);
        let twice = apply_event(once.clone(), &event);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sync_yields_the_sorted_snapshot(
        initial in dense_queue_strategy(8),
        snapshot in unordered_queue_strategy(8),
    ) {
        let queue = apply_event(initial, &QueueEvent::synced(snapshot.clone()));
        prop_assert_eq!(queue, sort_vehicles(snapshot));
    }

    #[test]
    fn seat_counts_stay_within_capacity(
        initial in dense_queue_strategy(8),
        events in event_sequence_strategy(0, 30),
    ) {
        let mut queue = initial;
        for event in &events {
            queue = apply_event(queue, event);
        }
        for vehicle in &queue {
            prop_assert!(vehicle.available_seats <= vehicle.total_seats);
        }
    }
}

#[test]
fn scenario_a_front_vehicle_leaves() {
    let queue = apply_event(scenario_queue(), &QueueEvent::left("v1"));

    assert_eq!(positions(&queue), vec![("v2".to_string(), 1)]);
    assert_eq!(queue[0].available_seats, 14);
}

#[test]
fn scenario_d_departure_shifts_by_exactly_one() {
    let before = queue_of(5);
    let after = apply_event(
        before.clone(),
        &QueueEvent::status_changed("v1", queuesync_protocol::VehicleStatus::Departed),
    );

    for vehicle in &after {
        let old = before
            .iter()
            .find(|v| v.vehicle_id == vehicle.vehicle_id)
            .unwrap();
        assert_eq!(vehicle.position, old.position - 1);
    }
}
