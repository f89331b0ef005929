//! Error types for the watchdog orchestration layer.

use rcon_driver::RconError;
use watch_event_system::EventError;

/// Errors surfaced by the watchdog context and its API.
///
/// Only [`WatchdogError::Init`] is meant to stop the process; everything else
/// is reported and the watchdog carries on with its last known state.
#[derive(Debug, thiserror::Error)]
pub enum WatchdogError {
    #[error("Initialization failed: {0}")]
    Init(String),
    #[error("RCON error: {0}")]
    Rcon(#[from] RconError),
    #[error("Event error: {0}")]
    Event(#[from] EventError),
    #[error("Restart failed: {0}")]
    Restart(String),
    #[error("Plugin error: {0}")]
    Plugin(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
