//! Queue alerts derived from state transitions.
//!
//! The engine performs no notification I/O. It diffs consecutive states for
//! one watched vehicle and hands the resulting alerts to an injected
//! [`AlertSink`]. Taps on an alert are routed through an injected
//! [`Navigator`].

use crate::state::{QueueState, SelectionOutcome, StateTransition};
use parking_lot::Mutex;
use queuesync_protocol::{RouteId, VehicleId, VehicleStatus};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Something the user may want to be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueAlert {
    /// The watched vehicle moved.
    PositionChanged {
        /// Watched vehicle.
        vehicle_id: VehicleId,
        /// Previous position.
        from: u32,
        /// New position.
        to: u32,
    },
    /// The watched vehicle is next to depart.
    ReachedFront {
        /// Watched vehicle.
        vehicle_id: VehicleId,
    },
    /// The watched vehicle's status changed.
    StatusChanged {
        /// Watched vehicle.
        vehicle_id: VehicleId,
        /// Previous status.
        from: VehicleStatus,
        /// New status.
        to: VehicleStatus,
    },
    /// The watched vehicle is no longer queued.
    LeftQueue {
        /// Watched vehicle.
        vehicle_id: VehicleId,
    },
    /// The backend confirmed the user's seats.
    SelectionConfirmed {
        /// Selected vehicle.
        vehicle_id: VehicleId,
        /// Backend reservation identifier.
        reservation_id: String,
    },
    /// The user's selection failed.
    SelectionFailed {
        /// Selected vehicle.
        vehicle_id: VehicleId,
        /// Why it failed.
        reason: String,
    },
}

impl QueueAlert {
    /// Returns the vehicle the alert is about.
    pub fn vehicle_id(&self) -> &VehicleId {
        match self {
            QueueAlert::PositionChanged { vehicle_id, .. }
            | QueueAlert::ReachedFront { vehicle_id }
            | QueueAlert::StatusChanged { vehicle_id, .. }
            | QueueAlert::LeftQueue { vehicle_id }
            | QueueAlert::SelectionConfirmed { vehicle_id, .. }
            | QueueAlert::SelectionFailed { vehicle_id, .. } => vehicle_id,
        }
    }
}

/// Diffs two states for the `watched` vehicle.
pub fn detect_alerts(before: &QueueState, after: &QueueState, watched: &VehicleId) -> Vec<QueueAlert> {
    let mut alerts = Vec::new();

    match (before.vehicle(watched), after.vehicle(watched)) {
        (Some(old), Some(new)) => {
            if old.position != new.position {
                alerts.push(QueueAlert::PositionChanged {
                    vehicle_id: watched.clone(),
                    from: old.position,
                    to: new.position,
                });
                if new.position == 1 {
                    alerts.push(QueueAlert::ReachedFront {
                        vehicle_id: watched.clone(),
                    });
                }
            }
            if old.status != new.status {
                alerts.push(QueueAlert::StatusChanged {
                    vehicle_id: watched.clone(),
                    from: old.status,
                    to: new.status,
                });
            }
        }
        (Some(_), None) => alerts.push(QueueAlert::LeftQueue {
            vehicle_id: watched.clone(),
        }),
        _ => {}
    }

    if let (Some(old), Some(new)) = (&before.pending_selection, &after.pending_selection) {
        let settled_now = old.selection_id == new.selection_id
            && old.outcome.is_pending()
            && new.vehicle_id == *watched;
        if settled_now {
            match &new.outcome {
                SelectionOutcome::Confirmed { reservation_id } => {
                    alerts.push(QueueAlert::SelectionConfirmed {
                        vehicle_id: watched.clone(),
                        reservation_id: reservation_id.clone(),
                    })
                }
                SelectionOutcome::Failed { reason } => alerts.push(QueueAlert::SelectionFailed {
                    vehicle_id: watched.clone(),
                    reason: reason.clone(),
                }),
                SelectionOutcome::Pending => {}
            }
        }
    }

    alerts
}

/// Receives alerts, e.g. to show a local notification.
pub trait AlertSink: Send + Sync + 'static {
    /// Delivers one alert for `route_id`.
    fn notify(&self, route_id: &RouteId, alert: &QueueAlert);
}

/// Opens app screens in response to alert taps.
pub trait Navigator: Send + Sync + 'static {
    /// Shows the queue of `route_id`, focused on `vehicle_id`.
    fn open_queue(&self, route_id: &RouteId, vehicle_id: &VehicleId);
}

/// Turns state transitions into alerts for one watched vehicle.
///
/// Without an explicit watch the hook follows the vehicle of the current or
/// most recent selection.
pub struct NotificationHook<S: AlertSink, N: Navigator> {
    sink: Arc<S>,
    navigator: Arc<N>,
    watched: Mutex<Option<VehicleId>>,
}

impl<S: AlertSink, N: Navigator> NotificationHook<S, N> {
    /// Creates a hook delivering to `sink` and navigating through `navigator`.
    pub fn new(sink: Arc<S>, navigator: Arc<N>) -> Self {
        Self {
            sink,
            navigator,
            watched: Mutex::new(None),
        }
    }

    /// Watches `vehicle_id` regardless of selection.
    pub fn watch_vehicle(&self, vehicle_id: impl Into<VehicleId>) {
        *self.watched.lock() = Some(vehicle_id.into());
    }

    /// Goes back to following the selection.
    pub fn unwatch(&self) {
        *self.watched.lock() = None;
    }

    fn watched_for(&self, transition: &StateTransition) -> Option<VehicleId> {
        if let Some(explicit) = self.watched.lock().clone() {
            return Some(explicit);
        }
        [&transition.after, &transition.before]
            .into_iter()
            .find_map(|state| {
                state
                    .pending_selection
                    .as_ref()
                    .map(|s| s.vehicle_id.clone())
                    .or_else(|| state.selected_vehicle_id.clone())
            })
    }

    /// Diffs one transition and forwards the alerts to the sink.
    pub fn handle(&self, transition: &StateTransition) -> Vec<QueueAlert> {
        let Some(watched) = self.watched_for(transition) else {
            return Vec::new();
        };
        let alerts = detect_alerts(&transition.before, &transition.after, &watched);
        for alert in &alerts {
            self.sink.notify(&transition.after.route_id, alert);
        }
        alerts
    }

    /// Routes a tap on `alert` to the navigator.
    pub fn on_tap(&self, route_id: &RouteId, alert: &QueueAlert) {
        self.navigator.open_queue(route_id, alert.vehicle_id());
    }

    /// Consumes a transition feed until it closes.
    pub fn spawn(self: Arc<Self>, mut transitions: broadcast::Receiver<StateTransition>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match transitions.recv().await {
                    Ok(transition) => {
                        self.handle(&transition);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notification hook lagged behind queue updates");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("transition feed closed");
                        break;
                    }
                }
            }
        })
    }
}
