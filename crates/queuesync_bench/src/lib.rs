//! Benchmark workloads.

use queuesync_protocol::{QueueEvent, VehicleStatus};
use queuesync_testkit::vehicle;

/// Builds a busy-terminal event mix against a queue of `queue_len`
/// vehicles `v1..=vN`: seat sales, front departures and tail joins.
pub fn terminal_workload(queue_len: u32, rounds: u32) -> Vec<QueueEvent> {
    let mut events = Vec::new();
    let mut next_id = queue_len + 1;
    let mut front = 1;

    for round in 0..rounds {
        let target = front + round % queue_len.max(1);
        events.push(QueueEvent::seat_count_changed(
            format!("v{target}").as_str(),
            i64::from(round % 15),
        ));
        if round % 4 == 3 {
            events.push(QueueEvent::status_changed(
                format!("v{front}").as_str(),
                VehicleStatus::Departed,
            ));
            events.push(QueueEvent::joined(vehicle(&format!("v{next_id}"), queue_len, 14)));
            front += 1;
            next_id += 1;
        }
    }

    events
}
