//! Replay command implementation.

use queuesync_engine::reducer::{apply_event, sort_vehicles};
use queuesync_protocol::{decode_snapshot, QueueEvent, QueueVehicle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// An event log line that could not be decoded.
#[derive(Debug, Serialize)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    /// Decoder message.
    pub error: String,
}

/// Replay result.
#[derive(Debug, Serialize)]
pub struct ReplayResult {
    /// Number of events applied.
    pub applied: usize,
    /// Applied events per kind.
    pub kinds: BTreeMap<&'static str, usize>,
    /// Lines that were skipped.
    pub skipped: Vec<SkippedLine>,
    /// Messages of `error` events found in the log.
    pub stream_errors: Vec<String>,
    /// The queue after the last event.
    pub vehicles: Vec<QueueVehicle>,
}

/// Runs the replay command.
pub fn run(snapshot: &Path, events: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("Replaying {:?} onto {:?}", events, snapshot);

    let vehicles = decode_snapshot(&fs::read_to_string(snapshot)?)?;
    let log = fs::read_to_string(events)?;
    let result = replay(vehicles, &log);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Applies every decodable line of `log` to `vehicles`.
pub fn replay(vehicles: Vec<QueueVehicle>, log: &str) -> ReplayResult {
    let mut result = ReplayResult {
        applied: 0,
        kinds: BTreeMap::new(),
        skipped: Vec::new(),
        stream_errors: Vec::new(),
        vehicles: sort_vehicles(vehicles),
    };

    for (index, line) in log.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let event = match QueueEvent::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed event");
                result.skipped.push(SkippedLine {
                    line: line_no,
                    error: e.to_string(),
                });
                continue;
            }
        };

        debug!(line = line_no, kind = event.kind(), "applying event");
        if let QueueEvent::Error { message } = &event {
            result.stream_errors.push(message.clone());
        }
        result.vehicles = apply_event(std::mem::take(&mut result.vehicles), &event);
        result.applied += 1;
        *result.kinds.entry(event.kind()).or_insert(0) += 1;
    }

    result
}

fn print_text_output(result: &ReplayResult) {
    println!("Replay Summary");
    println!("==============");
    println!("Events applied: {}", result.applied);
    for (kind, count) in &result.kinds {
        println!("  {kind}: {count}");
    }
    if !result.skipped.is_empty() {
        println!("Lines skipped:  {}", result.skipped.len());
        for skipped in &result.skipped {
            println!("  line {}: {}", skipped.line, skipped.error);
        }
    }
    for message in &result.stream_errors {
        println!("Stream error:   {message}");
    }

    println!();
    println!("Final queue ({} vehicles)", result.vehicles.len());
    println!("---------------------------");
    println!("{:>4}  {:<16} {:<10} {:>7}", "POS", "VEHICLE", "STATUS", "SEATS");
    for vehicle in &result.vehicles {
        println!(
            "{:>4}  {:<16} {:<10} {:>3}/{:<3}",
            vehicle.position,
            vehicle.vehicle_id,
            vehicle.status,
            vehicle.available_seats,
            vehicle.total_seats
        );
    }
}
