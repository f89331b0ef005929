use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, trace};
use watch_event_system::{current_timestamp, EventBus, EventId};
use watchdog::{Plugin, WatchdogApi, WatchdogError};

/// Per-event dispatch counters shared by every handler the plugin registers.
#[derive(Debug, Default)]
struct EventCounts {
    counts: [AtomicU64; EventId::COUNT],
}

impl EventCounts {
    fn bump(&self, event: EventId) -> u64 {
        self.counts[event.index()].fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get(&self, event: EventId) -> u64 {
        self.counts[event.index()].load(Ordering::Relaxed)
    }
}

/// Snapshot of what the logger has seen so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub uptime_seconds: u64,
    pub events_logged: u64,
    pub per_event: Vec<(String, u64)>,
}

/// A simple logger plugin that records every event the watchdog dispatches
pub struct LoggerPlugin {
    name: String,
    counts: Arc<EventCounts>,
    start_time: u64,
    summary_every: u64,
}

impl LoggerPlugin {
    pub fn new() -> Self {
        Self::with_summary_every(300)
    }

    /// Logs an activity summary every `ticks` periodic events. Zero disables it.
    pub fn with_summary_every(ticks: u64) -> Self {
        Self {
            name: "logger".to_string(),
            counts: Arc::new(EventCounts::default()),
            start_time: current_timestamp(),
            summary_every: ticks,
        }
    }

    pub fn count(&self, event: EventId) -> u64 {
        self.counts.get(event)
    }

    pub fn summary(&self) -> ActivitySummary {
        summarize(&self.counts, self.start_time)
    }
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(counts: &EventCounts, start_time: u64) -> ActivitySummary {
    let per_event: Vec<(String, u64)> = EventId::ALL
        .iter()
        .map(|&e| (e.name().to_string(), counts.get(e)))
        .filter(|(_, n)| *n > 0)
        .collect();
    ActivitySummary {
        uptime_seconds: current_timestamp().saturating_sub(start_time),
        events_logged: per_event.iter().map(|(_, n)| n).sum(),
        per_event,
    }
}

fn describe(event: EventId, payload: &str) {
    match event {
        EventId::ClientAddSynth => info!("📝 LoggerPlugin: 🟢 CONNECTION - {}", payload),
        EventId::ClientDelSynth => info!("📝 LoggerPlugin: 🔴 DISCONNECTION - {}", payload),
        EventId::Chat => info!("📝 LoggerPlugin: 💬 CHAT - {}", payload),
        EventId::MapChange => info!("📝 LoggerPlugin: 🗺️ MAP CHANGE - {}", payload),
        EventId::RoundStart | EventId::RoundEnd | EventId::GameStart | EventId::GameEnd => {
            info!("📝 LoggerPlugin: 🎮 {}", event.name().to_uppercase())
        }
        EventId::ObjectiveCaptured => info!("📝 LoggerPlugin: 🚩 OBJECTIVE CAPTURED"),
        EventId::Restart => info!("📝 LoggerPlugin: 🔄 SERVER RESTART"),
        EventId::Shutdown => info!("📝 LoggerPlugin: 💤 GAME ENGINE SHUT DOWN"),
        EventId::Signal => info!("📝 LoggerPlugin: 🛑 SIGNAL - {}", payload),
        EventId::Init => info!("📝 LoggerPlugin: ✅ Now monitoring all server events!"),
        EventId::ClientAdd | EventId::ClientDel => trace!("📝 LoggerPlugin: {} - {}", event, payload),
        EventId::Periodic => {}
    }
}

#[async_trait]
impl Plugin for LoggerPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn install(&self, bus: Arc<EventBus>, api: WatchdogApi) -> Result<(), WatchdogError> {
        info!("📝 LoggerPlugin: Registering event logging...");

        for event in EventId::ALL {
            if event == EventId::Periodic {
                continue;
            }
            let counts = self.counts.clone();
            bus.on(event, &self.name, move |payload| {
                counts.bump(event);
                describe(event, payload);
                0
            })
            .await?;
        }

        let counts = self.counts.clone();
        let start_time = self.start_time;
        let summary_every = self.summary_every;
        bus.on_async(EventId::Periodic, &self.name, move |_| {
            let counts = counts.clone();
            let api = api.clone();
            async move {
                let ticks = counts.bump(EventId::Periodic);
                if summary_every > 0 && ticks % summary_every == 0 {
                    let summary = summarize(&counts, start_time);
                    info!(
                        "📝 LoggerPlugin: 📊 {} players on {}, {} events over {}s: {:?}",
                        api.players_count().await,
                        api.map_name().await,
                        summary.events_logged,
                        summary.uptime_seconds,
                        summary.per_event
                    );
                }
                0
            }
        })
        .await?;

        info!("📝 LoggerPlugin: ✅ Event logging system activated!");
        Ok(())
    }
}
