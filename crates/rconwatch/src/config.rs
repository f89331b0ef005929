//! Configuration management for rconwatch.
//!
//! This module handles loading, validation, and conversion of the watchdog
//! configuration from TOML files and command-line arguments.

use anyhow::{anyhow, bail, Context};
use rcon_driver::RconConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use watchdog::WatchdogConfig;

/// Upper bound on reconnect attempts per command; each one can block for a full timeout.
const MAX_RCON_RETRIES: u32 = 10;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rcon: RconSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub roster: RosterSettings,
    #[serde(default)]
    pub events: EventSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where and how to reach the game server's remote console.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RconSettings {
    pub host: String,
    pub port: u16,
    pub password: String,
    /// Reconnect attempts per command
    pub retries: u32,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for RconSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 27015,
            password: String::new(),
            retries: 2,
            connect_timeout_ms: 5000,
            command_timeout_ms: 3000,
        }
    }
}

/// Identity of the managed server and the files that describe it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub name: String,
    /// Admin SteamID64 list, same layout as the game's Admins.txt
    pub admin_list: String,
    /// Optional banned name fragment list
    pub bad_words: Option<String>,
    /// Optional shell command that restarts the game server
    pub restart_command: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "Unknown Server".to_string(),
            admin_list: "Admins.txt".to_string(),
            bad_words: None,
            restart_command: None,
        }
    }
}

/// Roster polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterSettings {
    pub poll_secs: u64,
    /// Delay between a logged join and the refresh it triggers
    pub settle_delay_ms: u64,
    pub max_admins: usize,
    pub max_bad_words: usize,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            poll_secs: 10,
            settle_delay_ms: 250,
            max_admins: 256,
            max_bad_words: 1024,
        }
    }
}

/// Event bus and main loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    pub max_subscribers: usize,
    pub tick_interval_ms: u64,
    pub status_interval_secs: u64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            max_subscribers: 24,
            tick_interval_ms: 1000,
            status_interval_secs: 60,
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config: AppConfig =
                toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing default config to {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Replaces host and port from a `host:port` override.
    pub fn set_rcon_address(&mut self, address: &str) -> anyhow::Result<()> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("RCON address must be host:port, got {address}"))?;
        self.rcon.port = port
            .parse()
            .with_context(|| format!("invalid RCON port in {address}"))?;
        self.rcon.host = host.to_string();
        Ok(())
    }

    /// Validates the configuration for consistency and correctness.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rcon.host.trim().is_empty() {
            bail!("RCON host cannot be empty");
        }
        if self.rcon.port == 0 {
            bail!("RCON port cannot be 0");
        }
        if self.rcon.connect_timeout_ms == 0 || self.rcon.command_timeout_ms == 0 {
            bail!("RCON timeouts must be greater than 0");
        }
        if self.rcon.retries > MAX_RCON_RETRIES {
            bail!("RCON retries cannot exceed {MAX_RCON_RETRIES}, got {}", self.rcon.retries);
        }
        if self.server.admin_list.trim().is_empty() {
            bail!("Admin list path cannot be empty");
        }
        if self.roster.poll_secs == 0 {
            bail!("Roster poll interval must be at least 1 second");
        }
        if self.events.max_subscribers == 0 {
            bail!("max_subscribers must be greater than 0");
        }
        if self.events.tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            );
        }
        Ok(())
    }

    /// Converts the file configuration into the watchdog's runtime configuration.
    pub fn to_watchdog_config(&self) -> WatchdogConfig {
        let optional_path = |p: &Option<String>| {
            p.as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
        };

        WatchdogConfig {
            rcon: RconConfig {
                connect_timeout: Duration::from_millis(self.rcon.connect_timeout_ms),
                command_timeout: Duration::from_millis(self.rcon.command_timeout_ms),
                ..RconConfig::new(&self.rcon.host, self.rcon.port, &self.rcon.password)
            },
            rcon_retries: self.rcon.retries,
            server_name: self.server.name.clone(),
            admin_list_path: PathBuf::from(&self.server.admin_list),
            bad_words_path: optional_path(&self.server.bad_words),
            restart_command: self.server.restart_command.clone(),
            roster_poll_secs: self.roster.poll_secs,
            join_settle_delay: Duration::from_millis(self.roster.settle_delay_ms),
            tick_interval: Duration::from_millis(self.events.tick_interval_ms),
            status_interval: Duration::from_secs(self.events.status_interval_secs.max(1)),
            max_subscribers: self.events.max_subscribers,
            max_admins: self.roster.max_admins,
            max_bad_words: self.roster.max_bad_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.rcon.host, "127.0.0.1");
        assert_eq!(config.rcon.port, 27015);
        assert_eq!(config.rcon.retries, 2);
        assert_eq!(config.server.name, "Unknown Server");
        assert_eq!(config.server.admin_list, "Admins.txt");
        assert_eq!(config.roster.poll_secs, 10);
        assert_eq!(config.events.max_subscribers, 24);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rconwatch.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.rcon.port, 27015);
        assert!(path.exists());

        // The written defaults load back unchanged.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.name, config.server.name);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[rcon]
host = "10.0.0.5"
port = 27020
password = "secret"

[server]
name = "Hardcore Checkpoint"
bad_words = "BadWords.txt"

[roster]
poll_secs = 30

[logging]
level = "debug"
json_format = true
"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.rcon.host, "10.0.0.5");
        assert_eq!(config.rcon.password, "secret");
        assert_eq!(config.rcon.retries, 2);
        assert_eq!(config.server.name, "Hardcore Checkpoint");
        assert_eq!(config.server.admin_list, "Admins.txt");
        assert_eq!(config.roster.poll_secs, 30);
        assert_eq!(config.roster.settle_delay_ms, 250);
        assert!(config.logging.json_format);

        let watchdog = config.to_watchdog_config();
        assert_eq!(watchdog.rcon.address, "10.0.0.5:27020");
        assert_eq!(watchdog.bad_words_path, Some(PathBuf::from("BadWords.txt")));
        assert_eq!(watchdog.roster_poll_secs, 30);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        tokio::fs::write(file.path(), "[rcon\nport = ").await.unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.rcon.port = 0;
        assert!(config.validate().is_err());

        config.rcon.port = 27015;
        config.roster.poll_secs = 0;
        assert!(config.validate().is_err());

        config.roster.poll_secs = 10;
        config.rcon.retries = u32::MAX;
        assert!(config.validate().is_err());

        config.rcon.retries = MAX_RCON_RETRIES;
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rcon_address_override() {
        let mut config = AppConfig::default();
        config.set_rcon_address("192.168.1.20:27102").unwrap();
        assert_eq!(config.rcon.host, "192.168.1.20");
        assert_eq!(config.rcon.port, 27102);

        assert!(config.set_rcon_address("no-port").is_err());
        assert!(config.set_rcon_address("host:notaport").is_err());
        assert_eq!(config.rcon.port, 27102);
    }

    #[test]
    fn test_blank_bad_words_path_disables_check() {
        let mut config = AppConfig::default();
        config.server.bad_words = Some("  ".to_string());
        assert!(config.to_watchdog_config().bad_words_path.is_none());
    }
}
