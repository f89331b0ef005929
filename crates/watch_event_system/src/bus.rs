//! # Event Bus
//!
//! The [`EventBus`] is the publish/subscribe registry every plugin talks to.
//! It owns one ordered subscriber list per [`EventId`].
//!
//! ## Guarantees
//!
//! - Subscribers run sequentially, in the order they were registered
//! - A subscriber's status never stops the remaining subscribers from running
//! - Dispatching an event nobody listens to is a successful no-op
//! - A rejected registration leaves every existing list untouched
//!
//! Subscribers must not register handlers for, or dispatch, the event they are
//! currently handling.

use crate::events::{AsyncFnEventHandler, EventError, EventHandler, EventId, FnEventHandler};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

/// The fixed-vocabulary event bus.
pub struct EventBus {
    /// Subscriber lists, indexed by [`EventId::index`]
    handlers: RwLock<Vec<Vec<Arc<dyn EventHandler>>>>,
    /// Upper bound on subscribers per event
    max_subscribers: usize,
    stats: RwLock<EventBusStats>,
}

impl EventBus {
    /// Subscriber limit used by [`EventBus::new`].
    pub const DEFAULT_MAX_SUBSCRIBERS: usize = 24;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_SUBSCRIBERS)
    }

    /// Creates a bus whose events each accept at most `max_subscribers` handlers.
    pub fn with_capacity(max_subscribers: usize) -> Self {
        Self {
            handlers: RwLock::new(vec![Vec::new(); EventId::COUNT]),
            max_subscribers,
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    /// Appends `handler` to the subscriber list of `event`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::CapacityExceeded`] when the list is already full.
    pub async fn register(
        &self,
        event: EventId,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        self.register_index(event.index(), handler).await
    }

    /// Registers by raw event index, as received from external classifiers.
    ///
    /// Out-of-range indices are rejected with [`EventError::CapacityExceeded`],
    /// the same as a full list.
    pub async fn register_index(
        &self,
        index: usize,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        let Some(event) = EventId::from_index(index) else {
            warn!("⚠️ Rejected handler {} for out-of-range event index {}", handler.handler_name(), index);
            return Err(EventError::CapacityExceeded {
                index,
                limit: EventId::COUNT,
            });
        };

        let mut handlers = self.handlers.write().await;
        let list = &mut handlers[event.index()];
        if list.len() >= self.max_subscribers {
            warn!(
                "⚠️ Rejected handler {} for {}: {} subscribers already registered",
                handler.handler_name(),
                event,
                list.len()
            );
            return Err(EventError::CapacityExceeded {
                index,
                limit: self.max_subscribers,
            });
        }

        info!("📝 Registered handler {} for {}", handler.handler_name(), event);
        list.push(handler);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;
        Ok(())
    }

    /// Registers a plain closure.
    pub async fn on<F>(&self, event: EventId, name: &str, handler: F) -> Result<(), EventError>
    where
        F: Fn(&str) -> i32 + Send + Sync + 'static,
    {
        self.register(event, Arc::new(FnEventHandler::new(name, handler)))
            .await
    }

    /// Registers a closure returning a future.
    pub async fn on_async<F, Fut>(
        &self,
        event: EventId,
        name: &str,
        handler: F,
    ) -> Result<(), EventError>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = i32> + Send + 'static,
    {
        self.register(event, Arc::new(AsyncFnEventHandler::new(name, handler)))
            .await
    }

    /// Invokes every subscriber of `event` with `payload`, in registration order.
    ///
    /// Returns the number of subscribers invoked.
    pub async fn dispatch(&self, event: EventId, payload: &str) -> usize {
        // Snapshot the list so handlers run without the registry lock held.
        let subscribers: Vec<Arc<dyn EventHandler>> = {
            let handlers = self.handlers.read().await;
            handlers[event.index()].clone()
        };

        if subscribers.is_empty() {
            trace!("No subscribers for {}", event);
            return 0;
        }

        debug!("📤 Dispatching {} to {} handlers", event, subscribers.len());

        let mut nonzero = 0u64;
        for handler in &subscribers {
            let status = handler.handle(payload).await;
            if status != 0 {
                nonzero += 1;
                debug!("Handler {} returned status {} for {}", handler.handler_name(), status, event);
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_dispatched += 1;
        stats.nonzero_statuses += nonzero;

        subscribers.len()
    }

    /// Number of subscribers currently attached to `event`.
    pub async fn subscriber_count(&self, event: EventId) -> usize {
        self.handlers.read().await[event.index()].len()
    }

    pub async fn get_stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Usage counters for the status log.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Total number of registered handlers across all events
    pub total_handlers: usize,
    /// Dispatches that reached at least one subscriber
    pub events_dispatched: u64,
    /// Handler invocations that returned a non-zero status
    pub nonzero_statuses: u64,
}
