//! Vehicle queue records.

use crate::error::{ProtocolError, ProtocolResult};
use crate::ids::{RouteId, VehicleId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boarding status of a queued vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// Parked in the queue, not yet loading.
    Waiting,
    /// Loading passengers.
    Boarding,
    /// Doors closed, pulling out.
    Departing,
    /// Left the terminal. Departed vehicles are not part of the queue.
    Departed,
}

impl VehicleStatus {
    /// Returns true if passengers can still take a seat.
    pub fn can_board(&self) -> bool {
        matches!(self, VehicleStatus::Waiting | VehicleStatus::Boarding)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Waiting => "waiting",
            VehicleStatus::Boarding => "boarding",
            VehicleStatus::Departing => "departing",
            VehicleStatus::Departed => "departed",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One vehicle's membership in a route's departure queue.
///
/// Records are plain values: every change produces a new record through the
/// engine's reducer rather than mutating a shared instance.
///
/// # Invariants
///
/// - `position` is 1-based, 1 is next to depart
/// - `available_seats <= total_seats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueVehicle {
    /// Vehicle identifier.
    pub vehicle_id: VehicleId,
    /// Route whose queue the vehicle is in.
    pub route_id: RouteId,
    /// 1-based queue position.
    pub position: u32,
    /// Boarding status.
    pub status: VehicleStatus,
    /// Seat capacity.
    pub total_seats: u32,
    /// Seats still free.
    pub available_seats: u32,
    /// When the vehicle joined the queue.
    pub joined_at: DateTime<Utc>,
    /// Estimated departure, if the backend computed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_departure_time: Option<DateTime<Utc>>,
    /// Registration plate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<String>,
    /// Driver display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    /// Make and model, e.g. "Toyota Hiace".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_model: Option<String>,
}

impl QueueVehicle {
    /// Creates a waiting vehicle with every seat free.
    pub fn new(
        vehicle_id: impl Into<VehicleId>,
        route_id: impl Into<RouteId>,
        position: u32,
        total_seats: u32,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            route_id: route_id.into(),
            position,
            status: VehicleStatus::Waiting,
            total_seats,
            available_seats: total_seats,
            joined_at,
            estimated_departure_time: None,
            registration: None,
            driver_name: None,
            make_model: None,
        }
    }

    /// Sets the available seats.
    pub fn with_available_seats(mut self, seats: u32) -> Self {
        self.available_seats = seats;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: VehicleStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the estimated departure time.
    pub fn with_estimated_departure(mut self, at: DateTime<Utc>) -> Self {
        self.estimated_departure_time = Some(at);
        self
    }

    /// Sets descriptive metadata.
    pub fn with_details(
        mut self,
        registration: impl Into<String>,
        driver_name: impl Into<String>,
        make_model: impl Into<String>,
    ) -> Self {
        self.registration = Some(registration.into());
        self.driver_name = Some(driver_name.into());
        self.make_model = Some(make_model.into());
        self
    }

    /// Returns true if the vehicle's status still admits passengers.
    pub fn can_board(&self) -> bool {
        self.status.can_board()
    }

    /// Returns true if no seats are free.
    pub fn is_full(&self) -> bool {
        self.available_seats == 0
    }

    /// Returns the number of taken seats.
    pub fn occupied_seats(&self) -> u32 {
        self.total_seats.saturating_sub(self.available_seats)
    }

    /// Returns true if `seats` can be booked on this vehicle right now.
    pub fn has_seats_for(&self, seats: u32) -> bool {
        seats > 0 && self.can_board() && self.available_seats >= seats
    }

    /// Checks the per-record invariants.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.position == 0 {
            return Err(ProtocolError::invalid_vehicle(
                self.vehicle_id.as_str(),
                "position must be at least 1",
            ));
        }
        if self.available_seats > self.total_seats {
            return Err(ProtocolError::invalid_vehicle(
                self.vehicle_id.as_str(),
                format!(
                    "available seats {} exceed total seats {}",
                    self.available_seats, self.total_seats
                ),
            ));
        }
        Ok(())
    }
}
