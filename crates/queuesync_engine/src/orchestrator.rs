//! Per-route queue orchestrator.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use crate::reducer;
use crate::reservation::ReservationBackend;
use crate::state::{PendingSelection, QueueState, SelectionOutcome, StateTransition};
use crate::transport::QueueTransport;
use chrono::Utc;
use parking_lot::Mutex;
use queuesync_protocol::{ConnectionState, QueueEvent, RouteId, VehicleId, VehicleStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// State shared between the orchestrator and its background tasks.
struct Shared {
    config: QueueConfig,
    state: Mutex<QueueState>,
    published: watch::Sender<QueueState>,
    transitions: broadcast::Sender<StateTransition>,
}

impl Shared {
    /// Mutates the state under the lock and publishes it if it changed.
    ///
    /// Publishing happens before the lock is released so observers see
    /// states in mutation order. `f` must not call back into `update`.
    fn update<T>(&self, f: impl FnOnce(&mut QueueState) -> T) -> T {
        let mut state = self.state.lock();
        let before = state.clone();
        let result = f(&mut state);
        if *state != before {
            self.published.send_replace(state.clone());
            let _ = self.transitions.send(StateTransition {
                before: Arc::new(before),
                after: Arc::new(state.clone()),
            });
        }
        result
    }

    fn apply_event(&self, event: &QueueEvent) {
        self.update(|state| apply_to_state(state, event));
    }
}

/// Runs one event through the reducer and re-validates the selection.
fn apply_to_state(state: &mut QueueState, event: &QueueEvent) {
    match event {
        QueueEvent::Error { message } => {
            warn!(route = %state.route_id, %message, "backend reported a stream error");
            state.error = Some(message.clone());
            return;
        }
        QueueEvent::Unknown => {
            debug!(route = %state.route_id, "ignoring unknown event kind");
            return;
        }
        QueueEvent::VehicleJoined { vehicle } if vehicle.route_id != state.route_id => {
            warn!(
                route = %state.route_id,
                vehicle = %vehicle.vehicle_id,
                foreign_route = %vehicle.route_id,
                "dropping join for another route"
            );
            return;
        }
        _ => {}
    }

    let vehicles = std::mem::take(&mut state.vehicles);
    state.vehicles = match event {
        QueueEvent::QueueSynced { vehicles: snapshot } => {
            let own: Vec<_> = snapshot
                .iter()
                .filter(|v| v.route_id == state.route_id)
                .cloned()
                .collect();
            if own.len() != snapshot.len() {
                warn!(
                    route = %state.route_id,
                    dropped = snapshot.len() - own.len(),
                    "snapshot contained vehicles of other routes"
                );
            }
            let queued: Vec<_> = own
                .iter()
                .filter(|v| v.status != VehicleStatus::Departed)
                .cloned()
                .collect();
            if queued.len() != own.len() {
                debug!(
                    route = %state.route_id,
                    dropped = own.len() - queued.len(),
                    "snapshot listed departed vehicles"
                );
            }
            reducer::apply_event(vehicles, &QueueEvent::synced(queued))
        }
        _ => reducer::apply_event(vehicles, event),
    };
    state.last_updated = Some(Utc::now());

    if let Some(reason) = state.selection_conflict() {
        warn!(route = %state.route_id, %reason, "pending selection invalidated");
        state.fail_selection(reason);
    }
}

/// Checks a selection request against the current state.
fn validate_selection(state: &QueueState, vehicle_id: &VehicleId, seats: u32) -> Result<(), String> {
    if state.has_pending_selection() {
        return Err("another selection is still pending".into());
    }
    if seats == 0 {
        return Err("at least one seat must be requested".into());
    }
    let vehicle = state
        .vehicle(vehicle_id)
        .ok_or_else(|| format!("vehicle {vehicle_id} is not in the queue"))?;
    if !vehicle.can_board() {
        return Err(format!("vehicle {vehicle_id} is {}", vehicle.status));
    }
    if vehicle.available_seats < seats {
        return Err(format!(
            "vehicle {vehicle_id} has {} seats, {seats} requested",
            vehicle.available_seats
        ));
    }
    Ok(())
}

/// Background tasks owned by an orchestrator.
#[derive(Default)]
struct Tasks {
    events: Option<JoinHandle<()>>,
    connection: Option<JoinHandle<()>>,
    grace: Option<JoinHandle<()>>,
}

impl Tasks {
    /// Aborts the subscription tasks. Returns true if any was running.
    fn abort_subscription(&mut self) -> bool {
        let mut aborted = false;
        for handle in [self.events.take(), self.connection.take()].into_iter().flatten() {
            handle.abort();
            aborted = true;
        }
        aborted
    }

    fn abort_grace(&mut self) {
        if let Some(handle) = self.grace.take() {
            handle.abort();
        }
    }
}

/// Keeps one route's [`QueueState`] in sync with the realtime backend.
///
/// The orchestrator is the only writer of its state. Incoming events are
/// consumed by a single background task, so reducer applications never
/// overlap. Observers read through [`watch`](Self::watch) or
/// [`transitions`](Self::transitions).
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = QueueOrchestrator::new(config, transport, backend)?;
/// orchestrator.subscribe().await?;
/// if orchestrator.select_vehicle("v2", 2).await {
///     // optimistic selection is visible to observers right away
/// }
/// orchestrator.unsubscribe().await?;
/// ```
pub struct QueueOrchestrator<T: QueueTransport, R: ReservationBackend> {
    shared: Arc<Shared>,
    transport: Arc<T>,
    backend: Arc<R>,
    tasks: Mutex<Tasks>,
    lifecycle: tokio::sync::Mutex<()>,
    next_selection_id: AtomicU64,
}

impl<T: QueueTransport, R: ReservationBackend> QueueOrchestrator<T, R> {
    /// Creates an orchestrator for `config.route_id`.
    pub fn new(config: QueueConfig, transport: Arc<T>, backend: Arc<R>) -> QueueResult<Self> {
        config.validate()?;
        let state = QueueState::new(config.route_id.clone());
        let (published, _) = watch::channel(state.clone());
        let (transitions, _) = broadcast::channel(config.transition_capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                published,
                transitions,
            }),
            transport,
            backend,
            tasks: Mutex::new(Tasks::default()),
            lifecycle: tokio::sync::Mutex::new(()),
            next_selection_id: AtomicU64::new(0),
        })
    }

    /// Returns the route this orchestrator owns.
    pub fn route_id(&self) -> &RouteId {
        &self.shared.config.route_id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> QueueState {
        self.shared.state.lock().clone()
    }

    /// Observes the state. The receiver always holds the latest value.
    pub fn watch(&self) -> watch::Receiver<QueueState> {
        self.shared.published.subscribe()
    }

    /// Observes every `(before, after)` pair, e.g. for notifications.
    pub fn transitions(&self) -> broadcast::Receiver<StateTransition> {
        self.shared.transitions.subscribe()
    }

    /// Connects, seeds the queue from a snapshot and starts listening.
    ///
    /// Does nothing when already connected or connecting. On failure the
    /// state moves to `Error` with the message in `state.error`; no retry is
    /// attempted. The route's half-open stream is released, but the
    /// transport itself stays connected: it may serve other routes, so
    /// disconnecting it is left to its owner (see
    /// [`QueueRegistry::unsubscribe_all`](crate::QueueRegistry::unsubscribe_all)).
    #[tracing::instrument(skip(self), fields(route = %self.shared.config.route_id))]
    pub async fn subscribe(&self) -> QueueResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.shared.state.lock().connection_state.is_active() {
            debug!("already subscribed");
            return Ok(());
        }

        self.tasks.lock().abort_subscription();
        self.shared.update(|state| {
            state.transition_to(ConnectionState::Connecting)?;
            state.is_loading = true;
            state.error = None;
            Ok::<_, QueueError>(())
        })?;
        info!("subscribing to queue");

        match self.establish().await {
            Ok((events, connection)) => {
                let vehicles = self.shared.update(|state| {
                    state.is_loading = false;
                    state.transition_to(ConnectionState::Connected)?;
                    Ok::<_, QueueError>(state.len())
                })?;
                self.spawn_listeners(events, connection);
                info!(vehicles, "queue subscription live");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "subscribe failed");
                self.shared.update(|state| {
                    state.is_loading = false;
                    state.error = Some(e.to_string());
                    if let Err(refused) = state.transition_to(ConnectionState::Error) {
                        warn!(error = %refused, "could not enter error state");
                    }
                });
                if let Err(cleanup) = self.transport.unsubscribe_from_queue(self.route_id()).await {
                    debug!(error = %cleanup, "releasing half-open stream failed");
                }
                Err(e)
            }
        }
    }

    /// Connects, opens the event stream and applies the initial snapshot.
    ///
    /// The stream is opened before the snapshot is pulled so events raised in
    /// between are buffered rather than lost.
    async fn establish(
        &self,
    ) -> QueueResult<(mpsc::Receiver<QueueEvent>, watch::Receiver<ConnectionState>)> {
        let route = self.route_id();
        self.transport.connect().await?;
        let events = self.transport.subscribe_to_queue(route).await?;
        let snapshot = self.transport.get_snapshot(route).await?;
        debug!(vehicles = snapshot.len(), "seeding from snapshot");
        self.shared.apply_event(&QueueEvent::synced(snapshot));
        Ok((events, self.transport.connection_states()))
    }

    fn spawn_listeners(
        &self,
        events: mpsc::Receiver<QueueEvent>,
        connection: watch::Receiver<ConnectionState>,
    ) {
        let route = self.route_id().clone();
        let events = tokio::spawn(
            run_event_loop(Arc::clone(&self.shared), events)
                .instrument(info_span!("queue_events", %route)),
        );
        let connection = tokio::spawn(
            watch_connection(Arc::clone(&self.shared), connection)
                .instrument(info_span!("queue_connection", %route)),
        );

        let mut tasks = self.tasks.lock();
        tasks.abort_subscription();
        tasks.events = Some(events);
        tasks.connection = Some(connection);
    }

    /// Pulls a fresh snapshot and replaces the queue with it.
    ///
    /// Works in any connection state and leaves it untouched. On failure the
    /// previous vehicle list is kept and the message lands in `state.error`.
    #[tracing::instrument(skip(self), fields(route = %self.shared.config.route_id))]
    pub async fn refresh(&self) -> QueueResult<()> {
        self.shared.update(|state| state.is_syncing = true);

        match self.transport.get_snapshot(self.route_id()).await {
            Ok(snapshot) => {
                let event = QueueEvent::synced(snapshot);
                self.shared.update(|state| {
                    apply_to_state(state, &event);
                    state.is_syncing = false;
                    state.error = None;
                });
                debug!("queue refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh failed, keeping previous queue");
                self.shared.update(|state| {
                    state.is_syncing = false;
                    state.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Optimistically reserves `seats` seats on `vehicle_id`.
    ///
    /// Returns false, without touching the state, if the vehicle is unknown,
    /// cannot board, lacks the seats, or another selection is still pending.
    /// Otherwise the pending selection is published immediately and the call
    /// waits for the backend (bounded by `reservation_timeout`) before
    /// settling it as confirmed or failed. Returns true in that case,
    /// whatever the backend answers.
    ///
    /// Outcomes only move away from `Pending`: a queue event that fails the
    /// selection first wins over a later backend confirmation, and a
    /// confirmed selection is never failed afterwards.
    #[tracing::instrument(skip(self, vehicle_id), fields(route = %self.shared.config.route_id))]
    pub async fn select_vehicle(&self, vehicle_id: impl Into<VehicleId>, seats: u32) -> bool {
        let vehicle_id = vehicle_id.into();
        let selection_id = self.next_selection_id.fetch_add(1, Ordering::SeqCst) + 1;

        let accepted = self.shared.update(|state| {
            if let Err(reason) = validate_selection(state, &vehicle_id, seats) {
                debug!(%vehicle_id, seats, %reason, "selection rejected");
                return false;
            }
            state.selected_vehicle_id = Some(vehicle_id.clone());
            state.pending_selection = Some(PendingSelection {
                selection_id,
                vehicle_id: vehicle_id.clone(),
                seats_requested: seats,
                timestamp: Utc::now(),
                outcome: SelectionOutcome::Pending,
            });
            true
        });
        if !accepted {
            return false;
        }
        self.tasks.lock().abort_grace();
        info!(%vehicle_id, seats, selection_id, "reserving seats");

        let timeout = self.shared.config.reservation_timeout;
        let result = match tokio::time::timeout(
            timeout,
            self.backend.reserve_seats(&vehicle_id, seats),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(QueueError::Timeout),
        };

        let confirmed = self.shared.update(|state| {
            let Some(selection) = state
                .pending_selection
                .as_mut()
                .filter(|s| s.selection_id == selection_id)
            else {
                debug!(selection_id, "selection was cleared, ignoring backend answer");
                return false;
            };
            if selection.outcome.is_terminal() {
                debug!(selection_id, outcome = ?selection.outcome, "selection already settled");
                return false;
            }
            match result {
                Ok(reservation) => {
                    info!(selection_id, reservation = %reservation.reservation_id, "selection confirmed");
                    selection.outcome = SelectionOutcome::Confirmed {
                        reservation_id: reservation.reservation_id,
                    };
                    true
                }
                Err(e) => {
                    warn!(selection_id, error = %e, "selection failed");
                    state.fail_selection(e.to_string());
                    false
                }
            }
        });

        if confirmed {
            self.schedule_grace_clear(selection_id);
        }
        true
    }

    /// Clears the confirmed selection once the grace window has passed.
    fn schedule_grace_clear(&self, selection_id: u64) {
        let shared = Arc::clone(&self.shared);
        let grace = shared.config.confirmation_grace;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            shared.update(|state| {
                let current = state
                    .pending_selection
                    .as_ref()
                    .is_some_and(|s| s.selection_id == selection_id);
                if current {
                    state.clear_selection();
                }
            });
        });

        let mut tasks = self.tasks.lock();
        tasks.abort_grace();
        tasks.grace = Some(handle);
    }

    /// Drops the selection, whatever its outcome. Always safe to call.
    ///
    /// A backend answer still in flight for the cleared selection is ignored.
    pub fn clear_selection(&self) {
        self.tasks.lock().abort_grace();
        self.shared.update(|state| state.clear_selection());
    }

    /// Stops listening and moves to `Disconnected`. Idempotent.
    #[tracing::instrument(skip(self), fields(route = %self.shared.config.route_id))]
    pub async fn unsubscribe(&self) -> QueueResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        let had_tasks = self.tasks.lock().abort_subscription();
        let disconnected =
            self.shared.state.lock().connection_state == ConnectionState::Disconnected;
        if !had_tasks && disconnected {
            return Ok(());
        }

        let result = self.transport.unsubscribe_from_queue(self.route_id()).await;
        self.shared.update(|state| {
            state.connection_state = ConnectionState::Disconnected;
            state.is_loading = false;
            state.is_syncing = false;
        });
        info!("unsubscribed from queue");
        result
    }
}

impl<T: QueueTransport, R: ReservationBackend> Drop for QueueOrchestrator<T, R> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut();
        tasks.abort_subscription();
        tasks.abort_grace();
    }
}

/// Applies events in receipt order until the stream ends.
///
/// Stops as soon as the state leaves `Connected`, dropping the receiver so
/// nothing is applied on top of a queue the transport no longer vouches for.
/// A later `subscribe` re-seeds from a fresh snapshot.
async fn run_event_loop(shared: Arc<Shared>, mut events: mpsc::Receiver<QueueEvent>) {
    let mut published = shared.published.subscribe();
    if published.borrow_and_update().connection_state != ConnectionState::Connected {
        debug!("connection lost before listening, closing event stream");
        return;
    }
    loop {
        tokio::select! {
            received = events.recv() => {
                let Some(event) = received else { break };
                debug!(kind = event.kind(), vehicle = ?event.vehicle_id(), "applying queue event");
                shared.apply_event(&event);
            }
            changed = published.changed() => {
                let connected = changed.is_ok()
                    && published.borrow_and_update().connection_state == ConnectionState::Connected;
                if !connected {
                    debug!("connection lost, closing event stream");
                    return;
                }
            }
        }
    }

    warn!("event stream ended while subscribed");
    shared.update(|state| {
        if state.connection_state == ConnectionState::Connected {
            state.connection_state = ConnectionState::Error;
            state.error = Some(QueueError::StreamClosed.to_string());
        }
    });
}

/// Surfaces transport-level drops as `Error`.
async fn watch_connection(shared: Arc<Shared>, mut states: watch::Receiver<ConnectionState>) {
    while states.changed().await.is_ok() {
        let reported = *states.borrow_and_update();
        if !matches!(reported, ConnectionState::Error | ConnectionState::Disconnected) {
            continue;
        }
        shared.update(|state| {
            if state.connection_state == ConnectionState::Connected {
                warn!(%reported, "realtime connection dropped");
                state.connection_state = ConnectionState::Error;
                state.error = Some(format!("realtime connection {reported}"));
            }
        });
    }
}
