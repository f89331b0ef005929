//! # Watchdog
//!
//! Runtime context for rconwatch. A [`WatchdogContext`] owns the event bus,
//! the alarm scheduler, the RCON connection and the roster, and feeds them
//! from the game server's log. Plugins get a [`WatchdogApi`] handle to
//! query the roster and send commands back to the server.
//!
//! The roster is refreshed every `roster_poll_secs`, and out of cycle
//! whenever the log shows a player joining or leaving. Each refresh that
//! changes the roster dispatches one `client_del_synth` per departure and
//! one `client_add_synth` per arrival.

pub mod api;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod lists;
pub mod plugin;
pub mod restart;

pub use api::WatchdogApi;
pub use classifier::classify;
pub use config::WatchdogConfig;
pub use context::WatchdogContext;
pub use error::WatchdogError;
pub use lists::{IdentityList, WordList};
pub use plugin::Plugin;
pub use restart::{ServerRestarter, ShellRestarter};

pub use roster::InfoDepth;
pub use watch_event_system::{EventBus, EventId};
