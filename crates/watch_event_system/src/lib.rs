//! # Watch Event System
//!
//! The event and timing backbone of the rconwatch game server watchdog.
//!
//! ## Core Features
//!
//! - **Fixed Vocabulary**: Events are identified by [`EventId`], a closed set of
//!   sixteen kinds observed in (or synthesized from) the game server's log
//! - **Ordered Dispatch**: Subscribers run strictly in registration order and every
//!   subscriber runs, whatever status the previous one returned
//! - **Bounded Registries**: Each event keeps a capacity-bounded subscriber list
//! - **Explicit Alarms**: One-shot alarms that only repeat when their handler asks
//!   to be rescheduled
//!
//! ## Quick Start Example
//!
//! ```rust
//! use watch_event_system::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::new();
//!
//!     bus.on(EventId::ClientAddSynth, "greeter", |payload| {
//!         println!("player joined: {payload}");
//!         0
//!     }).await?;
//!
//!     bus.dispatch(EventId::ClientAddSynth, "~SYNTHADD~ 76561198000000001 1.2.3.4 Alice").await;
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod bus;
pub mod clock;
pub mod events;

pub use alarm::{AlarmAction, AlarmHandler, AlarmId, AlarmScheduler, AlarmState, FnAlarmHandler};
pub use bus::{EventBus, EventBusStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{AsyncFnEventHandler, EventError, EventHandler, EventId, FnEventHandler};

/// Current Unix time in whole seconds.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
