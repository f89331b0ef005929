//! The service surface plugins use to query and act on the game server.

use crate::config::WatchdogConfig;
use crate::error::WatchdogError;
use crate::lists::{IdentityList, WordList};
use crate::restart::ServerRestarter;
use rcon_driver::{RconClient, RconResponse};
use roster::{InfoDepth, Roster, RosterChanges, RosterEngine};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use watch_event_system::{Clock, EventBus, EventId};

/// State shared by the context and every API handle.
pub(crate) struct Shared {
    pub(crate) bus: Arc<EventBus>,
    pub(crate) rcon: Mutex<Box<dyn RconClient>>,
    pub(crate) roster: RwLock<RosterEngine>,
    pub(crate) admins: IdentityList,
    pub(crate) bad_words: WordList,
    pub(crate) restarter: Arc<dyn ServerRestarter>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) rcon_retries: u32,
}

/// A cheap, cloneable handle onto the running watchdog.
///
/// RCON commands are serialized through a single connection; handles may be
/// captured by event handlers and used from inside a dispatch.
#[derive(Clone)]
pub struct WatchdogApi {
    shared: Arc<Shared>,
}

impl WatchdogApi {
    pub(crate) fn new(
        config: &WatchdogConfig,
        bus: Arc<EventBus>,
        rcon: Box<dyn RconClient>,
        admins: IdentityList,
        bad_words: WordList,
        restarter: Arc<dyn ServerRestarter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let roster = RosterEngine::new(config.server_name.clone(), clock.now());
        Self {
            shared: Arc::new(Shared {
                bus,
                rcon: Mutex::new(rcon),
                roster: RwLock::new(roster),
                admins,
                bad_words,
                restarter,
                clock,
                rcon_retries: config.rcon_retries,
            }),
        }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        self.shared.bus.clone()
    }

    // Roster queries

    pub async fn players_count(&self) -> usize {
        self.shared.roster.read().await.count()
    }

    /// Current roster rendered at `depth`, records joined by `delimiter`.
    pub async fn players_roster(&self, depth: InfoDepth, delimiter: &str) -> String {
        self.shared.roster.read().await.render(depth, delimiter)
    }

    pub async fn roster_snapshot(&self) -> Roster {
        self.shared.roster.read().await.current().clone()
    }

    pub async fn previous_roster_snapshot(&self) -> Roster {
        self.shared.roster.read().await.previous().clone()
    }

    pub async fn server_name(&self) -> String {
        self.shared.roster.read().await.server_name().to_string()
    }

    pub async fn map_name(&self) -> String {
        self.shared.roster.read().await.map_name().to_string()
    }

    pub(crate) async fn set_map_name(&self, name: &str) {
        info!("🗺️ Map changed to {}", name);
        self.shared.roster.write().await.set_map_name(name);
    }

    /// Epoch seconds of the last successful `listplayers`, or of the last restart.
    pub async fn last_roster_time(&self) -> u64 {
        self.shared.roster.read().await.last_success()
    }

    /// Polls `listplayers` and, on success, installs the reply as the current
    /// roster and dispatches one synthetic event per departure, then per arrival.
    ///
    /// On failure the snapshots, the count and the last success time are untouched.
    pub async fn refresh_roster(&self) -> Result<RosterChanges, WatchdogError> {
        let reply = self.rcon("listplayers").await;
        let reply = match reply {
            Ok(reply) => reply,
            Err(e) => {
                info!(
                    "Listplayers retrieve failure, keeping last roster of {} players: {}",
                    self.players_count().await,
                    e
                );
                return Err(e);
            }
        };

        let changes = {
            let now = self.shared.clock.now();
            let mut roster = self.shared.roster.write().await;
            roster.apply(&reply.text, now)
        };

        for player in &changes.departed {
            let payload = format!("~SYNTHDEL~ {} {} {}", player.guid, player.ip, player.name);
            debug!("Synthetic departure: {}", payload);
            self.shared.bus.dispatch(EventId::ClientDelSynth, &payload).await;
        }
        for player in &changes.arrived {
            let payload = format!("~SYNTHADD~ {} {} {}", player.guid, player.ip, player.name);
            debug!("Synthetic arrival: {}", payload);
            self.shared.bus.dispatch(EventId::ClientAddSynth, &payload).await;
        }
        Ok(changes)
    }

    // Server actions

    /// Sends a raw RCON command using the configured retry budget.
    pub async fn rcon(&self, command: &str) -> Result<RconResponse, WatchdogError> {
        let mut client = self.shared.rcon.lock().await;
        Ok(client.command(self.shared.rcon_retries, command).await?)
    }

    /// Broadcasts a chat message. Empty messages are not sent.
    pub async fn say(&self, message: &str) -> Result<(), WatchdogError> {
        if message.is_empty() {
            return Ok(());
        }
        self.rcon(&format!("say {}", message)).await.map(|_| ())
    }

    /// Kicks, or permanently bans, the player with `guid`.
    pub async fn kick_or_ban(&self, guid: &str, ban: bool, reason: &str) -> Result<(), WatchdogError> {
        let command = if ban {
            format!("ban {} -1 {}", guid, reason)
        } else {
            format!("kick {} {}", guid, reason)
        };
        info!("{} {}: {}", if ban { "🔨 Banning" } else { "👢 Kicking" }, guid, reason);
        self.rcon(command.trim_end()).await.map(|_| ())
    }

    pub async fn kick(&self, guid: &str, reason: &str) -> Result<(), WatchdogError> {
        self.kick_or_ban(guid, false, reason).await
    }

    pub async fn ban(&self, guid: &str, reason: &str) -> Result<(), WatchdogError> {
        self.kick_or_ban(guid, true, reason).await
    }

    pub async fn game_mode_property_set(&self, name: &str, value: &str) -> Result<(), WatchdogError> {
        self.rcon(&format!("gamemodeproperty {} {}", name, value)).await.map(|_| ())
    }

    /// Reads a game mode property. The server quotes the value in its reply;
    /// `None` means the reply carried no quoted value.
    pub async fn game_mode_property_get(&self, name: &str) -> Result<Option<String>, WatchdogError> {
        let reply = self.rcon(&format!("gamemodeproperty {}", name)).await?;
        Ok(reply.text.split('"').nth(1).map(str::to_string))
    }

    /// Runs the restart hook, then restarts the roster liveness clock and
    /// dispatches [`EventId::Restart`].
    pub async fn server_restart(&self) -> Result<(), WatchdogError> {
        self.shared.restarter.restart().await?;
        let now = self.shared.clock.now();
        self.shared.roster.write().await.touch(now);
        self.shared.bus.dispatch(EventId::Restart, "").await;
        Ok(())
    }

    // Utilities

    /// Epoch seconds according to the watchdog clock.
    pub fn time_get(&self) -> u64 {
        self.shared.clock.now()
    }

    /// Local wall-clock time, e.g. `Sat Oct 17 14:03:09 2026`.
    pub fn time_get_human(&self) -> String {
        chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
    }

    pub fn is_admin(&self, guid: &str) -> bool {
        self.shared.admins.contains_str(guid)
    }

    /// True when the name contains a banned word.
    pub fn bad_name_check(&self, name: &str) -> bool {
        let hit = self.shared.bad_words.matches(name);
        if hit {
            warn!("🚫 Name {:?} matches the banned word list", name);
        }
        hit
    }

    pub(crate) async fn destroy(&self) {
        self.shared.rcon.lock().await.destroy().await;
    }
}
