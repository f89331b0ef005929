//! The watchdog context: owns the bus, the alarm scheduler and the API, and
//! drives them from the game server log.

use crate::api::WatchdogApi;
use crate::classifier::classify;
use crate::config::WatchdogConfig;
use crate::error::WatchdogError;
use crate::lists::{IdentityList, WordList};
use crate::plugin::Plugin;
use crate::restart::{ServerRestarter, ShellRestarter};
use async_trait::async_trait;
use rcon_driver::{RconClient, RconDriver};
use roster::parse_map_name;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use watch_event_system::{
    AlarmAction, AlarmHandler, AlarmId, AlarmScheduler, Clock, EventBus, EventId, SystemClock,
};

/// Polls the roster and asks to run again one period later, whatever the outcome.
struct RosterPollAlarm {
    api: WatchdogApi,
    period: u64,
}

#[async_trait]
impl AlarmHandler for RosterPollAlarm {
    async fn on_alarm(&self, _alarm: AlarmId) -> AlarmAction {
        // Failures are already logged and leave the roster as it was.
        let _ = self.api.refresh_roster().await;
        AlarmAction::Reschedule(self.period)
    }

    fn handler_name(&self) -> &str {
        "roster_poll"
    }
}

/// Everything the watchdog needs at run time, in one place.
pub struct WatchdogContext {
    config: WatchdogConfig,
    bus: Arc<EventBus>,
    scheduler: AlarmScheduler,
    roster_alarm: AlarmId,
    api: WatchdogApi,
    plugins: Vec<Box<dyn Plugin>>,
}

impl WatchdogContext {
    /// Connects to the game server and builds a context around the live driver.
    ///
    /// Failure to reach or authenticate with the server is fatal.
    pub async fn connect(config: WatchdogConfig) -> Result<Self, WatchdogError> {
        let driver = RconDriver::connect(config.rcon.clone())
            .await
            .map_err(|e| WatchdogError::Init(format!("RCON init to {} failed: {}", config.rcon.address, e)))?;
        let restarter = Arc::new(ShellRestarter::new(config.restart_command.clone()));
        Self::new(config, Box::new(driver), restarter, Arc::new(SystemClock)).await
    }

    /// Builds a context around an already connected RCON client.
    pub async fn new(
        config: WatchdogConfig,
        rcon: Box<dyn RconClient>,
        restarter: Arc<dyn ServerRestarter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WatchdogError> {
        let admins = IdentityList::load(&config.admin_list_path, config.max_admins).await;
        let bad_words = match &config.bad_words_path {
            Some(path) => WordList::load(path, config.max_bad_words).await,
            None => WordList::default(),
        };

        let bus = Arc::new(EventBus::with_capacity(config.max_subscribers));
        let api = WatchdogApi::new(&config, bus.clone(), rcon, admins, bad_words, restarter, clock.clone());

        let scheduler = AlarmScheduler::with_clock(clock);
        let roster_alarm = scheduler
            .create(Arc::new(RosterPollAlarm {
                api: api.clone(),
                period: config.roster_poll_secs,
            }))
            .await;
        scheduler.reset(roster_alarm, config.roster_poll_secs).await?;

        info!(
            "🐕 Watchdog ready for {} (roster poll every {}s)",
            config.server_name, config.roster_poll_secs
        );

        Ok(Self {
            config,
            bus,
            scheduler,
            roster_alarm,
            api,
            plugins: Vec::new(),
        })
    }

    pub fn api(&self) -> WatchdogApi {
        self.api.clone()
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    pub fn scheduler(&self) -> &AlarmScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Installs a plugin and keeps it alive for the life of the context.
    pub async fn install_plugin(&mut self, plugin: Box<dyn Plugin>) -> Result<(), WatchdogError> {
        plugin
            .install(self.bus.clone(), self.api.clone())
            .await
            .map_err(|e| WatchdogError::Plugin(format!("{} failed to install: {}", plugin.name(), e)))?;
        info!("🔌 Installed plugin {} v{}", plugin.name(), plugin.version());
        self.plugins.push(plugin);
        Ok(())
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Dispatches [`EventId::Init`]; call once every plugin is installed.
    pub async fn start(&self) {
        self.bus.dispatch(EventId::Init, "").await;
    }

    /// Polls the roster now and pushes the next scheduled poll one full period out.
    pub async fn refresh_roster_now(&self) {
        let _ = self.api.refresh_roster().await;
        if let Err(e) = self.scheduler.reset(self.roster_alarm, self.config.roster_poll_secs).await {
            error!("❌ Failed to rearm roster poll: {}", e);
        }
    }

    /// Classifies a log line and handles it. Returns the event it produced.
    pub async fn handle_line(&self, line: &str) -> Option<EventId> {
        let event = classify(line)?;
        self.handle_event(event, line).await;
        Some(event)
    }

    /// Applies the watchdog's own reaction to an event, then dispatches it to subscribers.
    pub async fn handle_event(&self, event: EventId, payload: &str) -> usize {
        match event {
            EventId::ClientAdd => {
                if !self.config.join_settle_delay.is_zero() {
                    tokio::time::sleep(self.config.join_settle_delay).await;
                }
                self.refresh_roster_now().await;
            }
            EventId::ClientDel => self.refresh_roster_now().await,
            EventId::MapChange => match parse_map_name(payload) {
                Some(name) => self.api.set_map_name(&name).await,
                None => warn!("⚠️ Map change without a map name: {}", payload),
            },
            _ => {}
        }
        self.bus.dispatch(event, payload).await
    }

    /// Fires due alarms, then dispatches [`EventId::Periodic`].
    pub async fn tick(&self) -> usize {
        let fired = self.scheduler.tick(self.scheduler.clock().now()).await;
        self.bus.dispatch(EventId::Periodic, "").await;
        fired
    }

    async fn log_status(&self) {
        let stats = self.bus.get_stats().await;
        info!(
            "📊 {} on {}: {} players, last roster {}s ago, {} events dispatched",
            self.api.server_name().await,
            self.api.map_name().await,
            self.api.players_count().await,
            self.api.time_get().saturating_sub(self.api.last_roster_time().await),
            stats.events_dispatched
        );
    }

    /// Main loop. Reads log lines from `lines`, ticks alarms every
    /// `tick_interval`, and returns once `shutdown` resolves.
    ///
    /// End of input does not stop the loop; alarms keep polling the server.
    pub async fn run<R, S>(&self, lines: R, shutdown: S) -> Result<(), WatchdogError>
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = String>,
    {
        let mut lines = lines.lines();
        let mut input_open = true;

        let mut ticker = tokio::time::interval(self.config.tick_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut status = tokio::time::interval(self.config.status_interval.max(Duration::from_millis(1)));
        status.set_missed_tick_behavior(MissedTickBehavior::Delay);
        status.tick().await;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    info!("🛑 Received {}, stopping watchdog", signal);
                    self.bus.dispatch(EventId::Signal, &signal).await;
                    break;
                }
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) => {
                        if let Some(event) = self.handle_line(&line).await {
                            debug!("Log line produced {}", event);
                        }
                    }
                    Ok(None) => {
                        warn!("⚠️ Log input closed; continuing on alarms only");
                        input_open = false;
                    }
                    Err(e) => {
                        error!("❌ Failed to read log input: {}", e);
                        input_open = false;
                    }
                },
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = status.tick() => self.log_status().await,
            }
        }
        Ok(())
    }

    /// Closes the RCON connection.
    pub async fn shutdown(&self) {
        self.api.destroy().await;
        info!("👋 Watchdog stopped");
    }
}
