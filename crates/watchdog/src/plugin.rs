//! In-process plugins.
//!
//! A plugin subscribes to events during [`Plugin::install`] and keeps any
//! [`WatchdogApi`] handles it needs inside its handlers. Plugins are installed
//! in order; an earlier plugin's handlers run before a later plugin's for the
//! same event.

use crate::api::WatchdogApi;
use crate::error::WatchdogError;
use async_trait::async_trait;
use std::sync::Arc;
use watch_event_system::EventBus;

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "0.1.0"
    }

    /// Registers the plugin's event handlers.
    async fn install(&self, bus: Arc<EventBus>, api: WatchdogApi) -> Result<(), WatchdogError>;
}
