//! Error types for the RCON driver.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RconError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connecting to {0} timed out")]
    ConnectTimeout(String),
    #[error("Authentication rejected by {0}")]
    AuthFailed(String),
    #[error("No response within {0:?}")]
    Timeout(Duration),
    #[error("Connection closed by server")]
    ConnectionClosed,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Command failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<RconError>,
    },
}

impl RconError {
    /// Whether reconnecting could possibly help.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RconError::AuthFailed(_))
    }
}
