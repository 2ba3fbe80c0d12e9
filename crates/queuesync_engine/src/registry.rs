//! One orchestrator per route.

use crate::config::QueueConfig;
use crate::error::QueueResult;
use crate::orchestrator::QueueOrchestrator;
use crate::reservation::ReservationBackend;
use crate::transport::QueueTransport;
use parking_lot::Mutex;
use queuesync_protocol::RouteId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hands out the single orchestrator of each route.
///
/// All orchestrators share one transport and one booking backend. Per-route
/// configs are derived from a template whose `route_id` is replaced.
pub struct QueueRegistry<T: QueueTransport, R: ReservationBackend> {
    transport: Arc<T>,
    backend: Arc<R>,
    template: QueueConfig,
    orchestrators: Mutex<HashMap<RouteId, Arc<QueueOrchestrator<T, R>>>>,
}

impl<T: QueueTransport, R: ReservationBackend> QueueRegistry<T, R> {
    /// Creates an empty registry.
    pub fn new(transport: Arc<T>, backend: Arc<R>, template: QueueConfig) -> Self {
        Self {
            transport,
            backend,
            template,
            orchestrators: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the route's orchestrator, creating it on first use.
    pub fn get_or_create(&self, route_id: &RouteId) -> QueueResult<Arc<QueueOrchestrator<T, R>>> {
        let mut orchestrators = self.orchestrators.lock();
        if let Some(existing) = orchestrators.get(route_id) {
            return Ok(Arc::clone(existing));
        }

        let config = QueueConfig {
            route_id: route_id.clone(),
            ..self.template.clone()
        };
        let orchestrator = Arc::new(QueueOrchestrator::new(
            config,
            Arc::clone(&self.transport),
            Arc::clone(&self.backend),
        )?);
        orchestrators.insert(route_id.clone(), Arc::clone(&orchestrator));
        debug!(route = %route_id, "created queue orchestrator");
        Ok(orchestrator)
    }

    /// Returns the route's orchestrator if one exists.
    pub fn get(&self, route_id: &RouteId) -> Option<Arc<QueueOrchestrator<T, R>>> {
        self.orchestrators.lock().get(route_id).cloned()
    }

    /// Returns the routes that currently have an orchestrator.
    pub fn routes(&self) -> Vec<RouteId> {
        let mut routes: Vec<_> = self.orchestrators.lock().keys().cloned().collect();
        routes.sort();
        routes
    }

    /// Unsubscribes and forgets a route's orchestrator.
    pub async fn remove(&self, route_id: &RouteId) -> QueueResult<()> {
        let removed = self.orchestrators.lock().remove(route_id);
        match removed {
            Some(orchestrator) => orchestrator.unsubscribe().await,
            None => Ok(()),
        }
    }

    /// Unsubscribes every route, empties the registry and disconnects the
    /// shared transport.
    pub async fn unsubscribe_all(&self) {
        let drained: Vec<_> = self.orchestrators.lock().drain().collect();
        for (route_id, orchestrator) in drained {
            if let Err(e) = orchestrator.unsubscribe().await {
                warn!(route = %route_id, error = %e, "unsubscribe failed");
            }
        }
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "transport disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::MockReservationBackend;
    use crate::transport::MockTransport;
    use queuesync_protocol::ConnectionState;

    fn registry() -> QueueRegistry<MockTransport, MockReservationBackend> {
        QueueRegistry::new(
            Arc::new(MockTransport::new()),
            Arc::new(MockReservationBackend::new()),
            QueueConfig::new("template"),
        )
    }

    #[test]
    fn one_orchestrator_per_route() {
        let registry = registry();
        let route = RouteId::new("r1");

        let first = registry.get_or_create(&route).unwrap();
        let second = registry.get_or_create(&route).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.route_id(), &route);

        registry.get_or_create(&RouteId::new("r0")).unwrap();
        assert_eq!(registry.routes(), vec![RouteId::new("r0"), route]);
    }

    #[tokio::test]
    async fn unsubscribe_all_disconnects_transport() {
        let transport = Arc::new(MockTransport::new());
        let registry = QueueRegistry::new(
            Arc::clone(&transport),
            Arc::new(MockReservationBackend::new()),
            QueueConfig::new("template"),
        );
        let route = RouteId::new("r1");
        registry.get_or_create(&route).unwrap().subscribe().await.unwrap();
        assert_eq!(*transport.connection_states().borrow(), ConnectionState::Connected);

        registry.unsubscribe_all().await;
        assert_eq!(*transport.connection_states().borrow(), ConnectionState::Disconnected);
        assert!(!transport.is_subscribed(&route));
    }

    #[tokio::test]
    async fn remove_forgets_route() {
        let registry = registry();
        let route = RouteId::new("r1");
        registry.get_or_create(&route).unwrap();

        registry.remove(&route).await.unwrap();
        assert!(registry.get(&route).is_none());
        registry.remove(&route).await.unwrap();
    }
}
