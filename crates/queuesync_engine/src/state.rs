//! Per-route queue state.

use crate::error::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use queuesync_protocol::{ConnectionState, QueueVehicle, RouteId, VehicleId};
use std::sync::Arc;

/// Outcome of an optimistic seat selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Waiting for the booking backend.
    Pending,
    /// The backend accepted the reservation.
    Confirmed {
        /// Backend reservation identifier.
        reservation_id: String,
    },
    /// The reservation was refused, timed out, or invalidated by a queue event.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

impl SelectionOutcome {
    /// Returns true while the backend has not answered.
    pub fn is_pending(&self) -> bool {
        matches!(self, SelectionOutcome::Pending)
    }

    /// Returns true once the outcome can no longer change.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// A local, speculative seat reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSelection {
    /// Monotonic identifier used to discard stale backend answers.
    pub selection_id: u64,
    /// Vehicle the seats were requested on.
    pub vehicle_id: VehicleId,
    /// Number of seats requested.
    pub seats_requested: u32,
    /// When the selection was made.
    pub timestamp: DateTime<Utc>,
    /// Current outcome.
    pub outcome: SelectionOutcome,
}

/// Snapshot of one route's queue as published to observers.
///
/// Observers receive clones; only the orchestrator that owns the route
/// mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueState {
    /// Route this state belongs to.
    pub route_id: RouteId,
    /// Vehicles sorted by position ascending.
    pub vehicles: Vec<QueueVehicle>,
    /// Realtime connection state.
    pub connection_state: ConnectionState,
    /// Vehicle the user picked, cleared when the selection fails.
    pub selected_vehicle_id: Option<VehicleId>,
    /// The in-flight or recently settled optimistic selection.
    pub pending_selection: Option<PendingSelection>,
    /// When the vehicle list last changed.
    pub last_updated: Option<DateTime<Utc>>,
    /// Last error message, if any.
    pub error: Option<String>,
    /// True while the initial subscribe is running.
    pub is_loading: bool,
    /// True while a manual refresh is running.
    pub is_syncing: bool,
}

impl QueueState {
    /// Creates an empty, disconnected state.
    pub fn new(route_id: RouteId) -> Self {
        Self {
            route_id,
            vehicles: Vec::new(),
            connection_state: ConnectionState::Disconnected,
            selected_vehicle_id: None,
            pending_selection: None,
            last_updated: None,
            error: None,
            is_loading: false,
            is_syncing: false,
        }
    }

    /// Looks up a vehicle by ID.
    pub fn vehicle(&self, vehicle_id: &VehicleId) -> Option<&QueueVehicle> {
        self.vehicles.iter().find(|v| &v.vehicle_id == vehicle_id)
    }

    /// Returns the vehicle at the front of the queue.
    pub fn next_vehicle(&self) -> Option<&QueueVehicle> {
        self.vehicles.first()
    }

    /// Returns vehicles that still take passengers, in queue order.
    pub fn boardable_vehicles(&self) -> impl Iterator<Item = &QueueVehicle> {
        self.vehicles.iter().filter(|v| v.can_board())
    }

    /// Returns the free seats across boardable vehicles.
    pub fn total_available_seats(&self) -> u32 {
        self.boardable_vehicles().map(|v| v.available_seats).sum()
    }

    /// Returns the number of queued vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns true if no vehicle is queued.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Returns true while a selection awaits the backend.
    pub fn has_pending_selection(&self) -> bool {
        self.pending_selection
            .as_ref()
            .is_some_and(|s| s.outcome.is_pending())
    }

    /// Moves the connection state, refusing illegal transitions.
    pub(crate) fn transition_to(&mut self, next: ConnectionState) -> QueueResult<()> {
        if !self.connection_state.can_transition_to(next) {
            return Err(QueueError::InvalidStateTransition {
                from: self.connection_state,
                to: next,
            });
        }
        self.connection_state = next;
        Ok(())
    }

    /// Returns why the pending selection can no longer succeed, if it can't.
    ///
    /// Only a `Pending` selection can conflict; settled outcomes are final.
    pub fn selection_conflict(&self) -> Option<String> {
        let selection = self
            .pending_selection
            .as_ref()
            .filter(|s| s.outcome.is_pending())?;
        let id = &selection.vehicle_id;

        match self.vehicle(id) {
            None => Some(format!("vehicle {id} left the queue")),
            Some(vehicle) if !vehicle.can_board() => {
                Some(format!("vehicle {id} is {}", vehicle.status))
            }
            Some(vehicle) if vehicle.available_seats < selection.seats_requested => Some(format!(
                "only {} seats left on vehicle {id}, {} requested",
                vehicle.available_seats, selection.seats_requested
            )),
            Some(_) => None,
        }
    }

    /// Marks the pending selection failed and clears the selected vehicle.
    pub(crate) fn fail_selection(&mut self, reason: String) {
        if let Some(selection) = self.pending_selection.as_mut() {
            selection.outcome = SelectionOutcome::Failed { reason };
        }
        self.selected_vehicle_id = None;
    }

    /// Resets both selection fields.
    pub(crate) fn clear_selection(&mut self) {
        self.selected_vehicle_id = None;
        self.pending_selection = None;
    }
}

/// A published state change, for consumers that diff consecutive states.
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// State before the change.
    pub before: Arc<QueueState>,
    /// State after the change.
    pub after: Arc<QueueState>,
}
