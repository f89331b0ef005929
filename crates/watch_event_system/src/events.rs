//! Event vocabulary, handler traits and error types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;

// ============================================================================
// Event Vocabulary
// ============================================================================

/// Identifier of every event the watchdog knows about.
///
/// The discriminants are dense and stable: they double as indices into the
/// bus's subscriber table, so the order here must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventId {
    /// Watchdog finished starting up and all plugins are installed
    Init = 0,
    /// A full game server restart was requested
    Restart = 1,
    /// Log reported a client joining
    ClientAdd = 2,
    /// Log reported a client channel closing
    ClientDel = 3,
    /// Log reported a seamless travel to a new map
    MapChange = 4,
    GameStart = 5,
    GameEnd = 6,
    RoundStart = 7,
    RoundEnd = 8,
    ObjectiveCaptured = 9,
    /// Emitted by the main loop once per tick
    Periodic = 10,
    /// A GUID appeared in the roster since the previous poll
    ClientAddSynth = 11,
    /// A GUID disappeared from the roster since the previous poll
    ClientDelSynth = 12,
    /// Game engine reported shutdown
    Shutdown = 13,
    Chat = 14,
    /// The watchdog process received a termination signal
    Signal = 15,
}

impl EventId {
    /// Number of events in the vocabulary.
    pub const COUNT: usize = 16;

    /// Every event, in index order.
    pub const ALL: [EventId; Self::COUNT] = [
        EventId::Init,
        EventId::Restart,
        EventId::ClientAdd,
        EventId::ClientDel,
        EventId::MapChange,
        EventId::GameStart,
        EventId::GameEnd,
        EventId::RoundStart,
        EventId::RoundEnd,
        EventId::ObjectiveCaptured,
        EventId::Periodic,
        EventId::ClientAddSynth,
        EventId::ClientDelSynth,
        EventId::Shutdown,
        EventId::Chat,
        EventId::Signal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up an event by its dense index, `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            EventId::Init => "init",
            EventId::Restart => "restart",
            EventId::ClientAdd => "client_add",
            EventId::ClientDel => "client_del",
            EventId::MapChange => "map_change",
            EventId::GameStart => "game_start",
            EventId::GameEnd => "game_end",
            EventId::RoundStart => "round_start",
            EventId::RoundEnd => "round_end",
            EventId::ObjectiveCaptured => "objective_captured",
            EventId::Periodic => "periodic",
            EventId::ClientAddSynth => "client_add_synth",
            EventId::ClientDelSynth => "client_del_synth",
            EventId::Shutdown => "shutdown",
            EventId::Chat => "chat",
            EventId::Signal => "signal",
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// A subscriber attached to one event.
///
/// Handlers receive the raw payload line and answer with an integer status.
/// The bus logs non-zero statuses but never changes dispatch flow because of
/// them.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: &str) -> i32;
    fn handler_name(&self) -> &str;
}

/// Adapter turning a plain closure into an [`EventHandler`].
pub struct FnEventHandler<F>
where
    F: Fn(&str) -> i32 + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnEventHandler<F>
where
    F: Fn(&str) -> i32 + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&str) -> i32 + Send + Sync,
{
    async fn handle(&self, payload: &str) -> i32 {
        (self.handler)(payload)
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Adapter for closures that need to await (typically RCON calls through the
/// watchdog API). The payload is handed over as an owned string so the
/// returned future can outlive the dispatch borrow.
pub struct AsyncFnEventHandler<F> {
    name: String,
    handler: F,
}

impl<F, Fut> AsyncFnEventHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = i32> + Send + 'static,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for AsyncFnEventHandler<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = i32> + Send + 'static,
{
    async fn handle(&self, payload: &str) -> i32 {
        (self.handler)(payload.to_string()).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Capacity exceeded: cannot register on event index {index} (limit {limit})")]
    CapacityExceeded { index: usize, limit: usize },
    #[error("Unknown alarm: {0}")]
    UnknownAlarm(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense_and_stable() {
        for (i, id) in EventId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(EventId::from_index(i), Some(*id));
        }
        assert_eq!(EventId::ClientAdd.index(), 2);
        assert_eq!(EventId::ClientDelSynth.index(), 12);
        assert_eq!(EventId::Signal.index(), 15);
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(EventId::from_index(EventId::COUNT), None);
        assert_eq!(EventId::from_index(usize::MAX), None);
    }

    #[tokio::test]
    async fn test_fn_handler_passes_payload() {
        let handler = FnEventHandler::new("len", |payload: &str| payload.len() as i32);
        assert_eq!(handler.handle("abcd").await, 4);
        assert_eq!(handler.handler_name(), "len");
    }

    #[tokio::test]
    async fn test_async_fn_handler() {
        let handler = AsyncFnEventHandler::new("async", |payload: String| async move {
            if payload.starts_with("~SYNTHADD~") { 1 } else { 0 }
        });
        assert_eq!(handler.handle("~SYNTHADD~ x").await, 1);
        assert_eq!(handler.handle("other").await, 0);
    }
}
