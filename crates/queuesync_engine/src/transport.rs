//! Realtime transport abstraction.

use crate::config::QueueConfig;
use crate::error::{QueueError, QueueResult};
use parking_lot::Mutex;
use queuesync_protocol::{ConnectionState, QueueEvent, QueueVehicle, RouteId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch};

/// A realtime transport pushes queue events and serves snapshots.
///
/// This trait abstracts the push channel and the pull endpoint, allowing for
/// different implementations (WebSocket, server-sent events, mock for
/// testing, etc.). One transport may serve many routes.
///
/// No delivery ordering is assumed between events of one route.
pub trait QueueTransport: Send + Sync + 'static {
    /// Opens the underlying connection.
    fn connect(&self) -> impl Future<Output = QueueResult<()>> + Send;

    /// Closes the underlying connection for every route.
    ///
    /// Orchestrators never call this; the owner of a shared transport does.
    fn disconnect(&self) -> impl Future<Output = QueueResult<()>> + Send;

    /// Starts pushing events for a route.
    ///
    /// Delivery stops when [`unsubscribe_from_queue`](Self::unsubscribe_from_queue)
    /// is called or the receiver is dropped.
    fn subscribe_to_queue(
        &self,
        route_id: &RouteId,
    ) -> impl Future<Output = QueueResult<mpsc::Receiver<QueueEvent>>> + Send;

    /// Stops pushing events for a route and releases its resources.
    fn unsubscribe_from_queue(
        &self,
        route_id: &RouteId,
    ) -> impl Future<Output = QueueResult<()>> + Send;

    /// Pulls a full snapshot of a route's queue.
    fn get_snapshot(
        &self,
        route_id: &RouteId,
    ) -> impl Future<Output = QueueResult<Vec<QueueVehicle>>> + Send;

    /// Observes the transport's own connection state.
    fn connection_states(&self) -> watch::Receiver<ConnectionState>;
}

/// An in-memory transport for testing.
pub struct MockTransport {
    state: watch::Sender<ConnectionState>,
    buffer: usize,
    snapshots: Mutex<HashMap<RouteId, Vec<QueueVehicle>>>,
    streams: Mutex<HashMap<RouteId, mpsc::Sender<QueueEvent>>>,
    connect_failure: Mutex<Option<String>>,
    snapshot_failure: Mutex<Option<String>>,
    connect_calls: AtomicUsize,
    snapshot_calls: AtomicUsize,
}

impl MockTransport {
    /// Creates a disconnected mock transport.
    pub fn new() -> Self {
        Self::with_buffer(256)
    }

    /// Creates a mock transport whose event channels hold `buffer` events.
    pub fn with_buffer(buffer: usize) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            buffer: buffer.max(1),
            snapshots: Mutex::new(HashMap::new()),
            streams: Mutex::new(HashMap::new()),
            connect_failure: Mutex::new(None),
            snapshot_failure: Mutex::new(None),
            connect_calls: AtomicUsize::new(0),
            snapshot_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a mock transport sized by `config.event_buffer`.
    pub fn for_config(config: &QueueConfig) -> Self {
        Self::with_buffer(config.event_buffer)
    }

    /// Sets the snapshot served for a route.
    pub fn set_snapshot(&self, route_id: &RouteId, vehicles: Vec<QueueVehicle>) {
        self.snapshots.lock().insert(route_id.clone(), vehicles);
    }

    /// Makes every following `connect` fail with `message`.
    pub fn fail_connect(&self, message: impl Into<String>) {
        *self.connect_failure.lock() = Some(message.into());
    }

    /// Makes every following `get_snapshot` fail with `message`.
    pub fn fail_snapshot(&self, message: impl Into<String>) {
        *self.snapshot_failure.lock() = Some(message.into());
    }

    /// Removes injected failures.
    pub fn clear_failures(&self) {
        *self.connect_failure.lock() = None;
        *self.snapshot_failure.lock() = None;
    }

    /// Pushes an event to a route's subscriber.
    ///
    /// Returns false if nobody is subscribed or the channel is full.
    pub fn push_event(&self, route_id: &RouteId, event: QueueEvent) -> bool {
        let streams = self.streams.lock();
        match streams.get(route_id) {
            Some(sender) => sender.try_send(event).is_ok(),
            None => false,
        }
    }

    /// Ends a route's event stream as if the server closed it.
    pub fn close_stream(&self, route_id: &RouteId) {
        self.streams.lock().remove(route_id);
    }

    /// Publishes a connection state, as a network layer would on a drop.
    pub fn set_connection_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Returns true while a route has an open event stream.
    pub fn is_subscribed(&self, route_id: &RouteId) -> bool {
        self.streams
            .lock()
            .get(route_id)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Returns how many times `connect` was called.
    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    /// Returns how many times `get_snapshot` was called.
    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueTransport for MockTransport {
    async fn connect(&self) -> QueueResult<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.connect_failure.lock().clone();
        if let Some(message) = failure {
            self.state.send_replace(ConnectionState::Error);
            return Err(QueueError::Connect(message));
        }
        self.state.send_replace(ConnectionState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> QueueResult<()> {
        self.streams.lock().clear();
        self.state.send_replace(ConnectionState::Disconnected);
        Ok(())
    }

    async fn subscribe_to_queue(
        &self,
        route_id: &RouteId,
    ) -> QueueResult<mpsc::Receiver<QueueEvent>> {
        if *self.state.borrow() != ConnectionState::Connected {
            return Err(QueueError::NotConnected);
        }
        let (tx, rx) = mpsc::channel(self.buffer);
        self.streams.lock().insert(route_id.clone(), tx);
        Ok(rx)
    }

    async fn unsubscribe_from_queue(&self, route_id: &RouteId) -> QueueResult<()> {
        self.streams.lock().remove(route_id);
        Ok(())
    }

    async fn get_snapshot(&self, route_id: &RouteId) -> QueueResult<Vec<QueueVehicle>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.snapshot_failure.lock().clone();
        if let Some(message) = failure {
            return Err(QueueError::Fetch(message));
        }
        Ok(self
            .snapshots
            .lock()
            .get(route_id)
            .cloned()
            .unwrap_or_default())
    }

    fn connection_states(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_connection() {
        let transport = MockTransport::new();
        let states = transport.connection_states();
        assert_eq!(*states.borrow(), ConnectionState::Disconnected);

        transport.connect().await.unwrap();
        assert_eq!(*states.borrow(), ConnectionState::Connected);
        assert_eq!(transport.connect_calls(), 1);

        transport.disconnect().await.unwrap();
        assert_eq!(*states.borrow(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn mock_transport_not_connected_error() {
        let transport = MockTransport::new();
        let result = transport.subscribe_to_queue(&RouteId::new("r1")).await;
        assert!(matches!(result, Err(QueueError::NotConnected)));
    }

    #[tokio::test]
    async fn mock_transport_delivers_until_unsubscribed() {
        let transport = MockTransport::new();
        let route = RouteId::new("r1");
        transport.connect().await.unwrap();

        let mut events = transport.subscribe_to_queue(&route).await.unwrap();
        assert!(transport.is_subscribed(&route));
        assert!(transport.push_event(&route, QueueEvent::left("v1")));
        assert_eq!(events.recv().await, Some(QueueEvent::left("v1")));

        transport.unsubscribe_from_queue(&route).await.unwrap();
        assert!(!transport.is_subscribed(&route));
        assert!(!transport.push_event(&route, QueueEvent::left("v2")));
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn mock_transport_injected_failures() {
        let transport = MockTransport::new();
        transport.fail_connect("dns");
        transport.fail_snapshot("502");

        assert!(matches!(transport.connect().await, Err(QueueError::Connect(_))));
        let snapshot = transport.get_snapshot(&RouteId::new("r1")).await;
        assert!(matches!(snapshot, Err(QueueError::Fetch(_))));

        transport.clear_failures();
        assert!(transport.connect().await.is_ok());
        assert!(transport.get_snapshot(&RouteId::new("r1")).await.unwrap().is_empty());
        assert_eq!(transport.snapshot_calls(), 2);
    }
}
