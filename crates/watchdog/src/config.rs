//! Watchdog configuration types and defaults.
//!
//! The binary builds a [`WatchdogConfig`] from its TOML file; everything in
//! here is already validated and converted to the types the context needs.

use rcon_driver::RconConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::WatchdogContext`].
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Connection settings for the game server's RCON port
    pub rcon: RconConfig,

    /// Reconnect attempts per RCON command before giving up
    pub rcon_retries: u32,

    /// Name reported to plugins; not read from the game server
    pub server_name: String,

    /// Admin SteamID64 list, one per line
    pub admin_list_path: PathBuf,

    /// Banned name fragments, one per line. `None` disables the check.
    pub bad_words_path: Option<PathBuf>,

    /// Shell command that restarts the game server
    pub restart_command: Option<String>,

    /// Seconds between scheduled `listplayers` polls
    pub roster_poll_secs: u64,

    /// Wait after a join is logged before polling, since the RCON roster lags the log
    pub join_settle_delay: Duration,

    /// Alarm tick and `periodic` event interval
    pub tick_interval: Duration,

    /// Interval of the status log line
    pub status_interval: Duration,

    /// Subscriber limit per event
    pub max_subscribers: usize,

    pub max_admins: usize,
    pub max_bad_words: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            rcon: RconConfig::default(),
            rcon_retries: 2,
            server_name: "Unknown Server".to_string(),
            admin_list_path: PathBuf::from("Admins.txt"),
            bad_words_path: None,
            restart_command: None,
            roster_poll_secs: 10,
            join_settle_delay: Duration::from_millis(250),
            tick_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(60),
            max_subscribers: 24,
            max_admins: 256,
            max_bad_words: 1024,
        }
    }
}
