//! Property-based test generators using proptest.
//!
//! Provides strategies for generating queues and event sequences that
//! respect the invariants the backend guarantees.

use crate::fixtures::{at_minute, TEST_ROUTE};
use proptest::prelude::*;
use queuesync_protocol::{QueueEvent, QueueVehicle, VehicleId, VehicleStatus};

/// Number of distinct vehicle ids the generators draw from.
pub const ID_POOL: usize = 12;

/// Strategy for generating vehicle ids from a small pool, so that
/// generated events hit existing vehicles often.
pub fn vehicle_id_strategy() -> impl Strategy<Value = VehicleId> {
    (0..ID_POOL).prop_map(|n| VehicleId::new(format!("v{n}")))
}

/// Strategy for generating non-departed vehicle statuses.
pub fn queued_status_strategy() -> impl Strategy<Value = VehicleStatus> {
    prop_oneof![
        4 => Just(VehicleStatus::Waiting),
        2 => Just(VehicleStatus::Boarding),
        1 => Just(VehicleStatus::Departing),
    ]
}

/// Strategy for generating one vehicle at `position`.
pub fn vehicle_strategy(id: VehicleId, position: u32) -> impl Strategy<Value = QueueVehicle> {
    (1u32..=22, 0u32..=22, queued_status_strategy(), 0i64..600).prop_map(
        move |(total, free, status, minute)| {
            QueueVehicle::new(id.clone(), TEST_ROUTE, position, total, at_minute(minute))
                .with_available_seats(free.min(total))
                .with_status(status)
        },
    )
}

/// Strategy for generating a queue with unique ids and positions `1..=N`.
pub fn dense_queue_strategy(max_len: usize) -> impl Strategy<Value = Vec<QueueVehicle>> {
    let max_len = max_len.min(ID_POOL);
    Just((0..ID_POOL).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(move |pool| {
            (0..=max_len).prop_flat_map(move |len| {
                pool[..len]
                    .iter()
                    .enumerate()
                    .map(|(index, n)| {
                        vehicle_strategy(VehicleId::new(format!("v{n}")), index as u32 + 1)
                    })
                    .collect::<Vec<_>>()
            })
        })
}

/// Strategy for generating vehicle lists with arbitrary, possibly
/// colliding, positions.
pub fn unordered_queue_strategy(max_len: usize) -> impl Strategy<Value = Vec<QueueVehicle>> {
    prop::collection::vec((vehicle_id_strategy(), 1u32..=8), 0..=max_len).prop_flat_map(
        |slots| {
            slots
                .into_iter()
                .map(|(id, position)| vehicle_strategy(id, position))
                .collect::<Vec<_>>()
        },
    )
}

/// A queue membership change, resolved against the current queue by
/// [`MembershipOp::to_event`].
#[derive(Debug, Clone)]
pub enum MembershipOp {
    /// A vehicle joins at the tail, or re-sends its record if queued.
    Join(VehicleId),
    /// A vehicle leaves.
    Leave(VehicleId),
    /// A vehicle departs.
    Depart(VehicleId),
}

impl MembershipOp {
    /// Builds the event the backend would send for this change.
    pub fn to_event(&self, current: &[QueueVehicle]) -> QueueEvent {
        match self {
            MembershipOp::Join(id) => {
                let vehicle = match current.iter().find(|v| &v.vehicle_id == id) {
                    Some(existing) => existing.clone(),
                    None => QueueVehicle::new(
                        id.clone(),
                        TEST_ROUTE,
                        current.len() as u32 + 1,
                        14,
                        at_minute(current.len() as i64),
                    ),
                };
                QueueEvent::joined(vehicle)
            }
            MembershipOp::Leave(id) => QueueEvent::left(id.clone()),
            MembershipOp::Depart(id) => QueueEvent::status_changed(id.clone(), VehicleStatus::Departed),
        }
    }
}

/// Strategy for generating membership changes.
pub fn membership_op_strategy() -> impl Strategy<Value = MembershipOp> {
    prop_oneof![
        3 => vehicle_id_strategy().prop_map(MembershipOp::Join),
        1 => vehicle_id_strategy().prop_map(MembershipOp::Leave),
        1 => vehicle_id_strategy().prop_map(MembershipOp::Depart),
    ]
}

/// Strategy for generating a sequence of membership changes.
pub fn membership_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<MembershipOp>> {
    prop::collection::vec(membership_op_strategy(), min_ops..max_ops)
}

/// Strategy for generating arbitrary events, including ones that break
/// density or refer to unknown vehicles.
pub fn queue_event_strategy() -> impl Strategy<Value = QueueEvent> {
    prop_oneof![
        2 => (vehicle_id_strategy(), 1u32..=12)
            .prop_flat_map(|(id, position)| vehicle_strategy(id, position))
            .prop_map(QueueEvent::joined),
        2 => vehicle_id_strategy().prop_map(QueueEvent::left),
        2 => (vehicle_id_strategy(), 1u32..=12)
            .prop_map(|(id, position)| QueueEvent::position_changed(id, position)),
        2 => (vehicle_id_strategy(), -5i64..30)
            .prop_map(|(id, seats)| QueueEvent::seat_count_changed(id, seats)),
        1 => (vehicle_id_strategy(), queued_status_strategy())
            .prop_map(|(id, status)| QueueEvent::status_changed(id, status)),
        1 => vehicle_id_strategy()
            .prop_map(|id| QueueEvent::status_changed(id, VehicleStatus::Departed)),
        1 => dense_queue_strategy(6).prop_map(QueueEvent::synced),
        1 => Just(QueueEvent::error("stream hiccup")),
        1 => Just(QueueEvent::Unknown),
    ]
}

/// Strategy for generating a sequence of arbitrary events.
pub fn event_sequence_strategy(
    min_events: usize,
    max_events: usize,
) -> impl Strategy<Value = Vec<QueueEvent>> {
    prop::collection::vec(queue_event_strategy(), min_events..max_events)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to a proptest configuration.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn dense_queues_are_dense(queue in dense_queue_strategy(8)) {
            for (index, vehicle) in queue.iter().enumerate() {
                prop_assert_eq!(vehicle.position, index as u32 + 1);
                prop_assert!(vehicle.available_seats <= vehicle.total_seats);
            }
            let mut ids: Vec<_> = queue.iter().map(|v| v.vehicle_id.clone()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), queue.len());
        }

        #[test]
        fn generated_events_serialize(event in queue_event_strategy()) {
            prop_assert!(serde_json::to_string(&event).is_ok());
        }
    }

    #[test]
    fn join_of_queued_vehicle_resends_record() {
        let queue = crate::fixtures::queue_of(2);
        let event = MembershipOp::Join(VehicleId::new("v1")).to_event(&queue);
        assert_eq!(event, QueueEvent::joined(queue[0].clone()));

        let event = MembershipOp::Join(VehicleId::new("v9")).to_event(&queue);
        match event {
            QueueEvent::VehicleJoined { vehicle } => assert_eq!(vehicle.position, 3),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
