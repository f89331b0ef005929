//! Command-line interface handling for rconwatch.
//!
//! Every option here overrides the matching setting of the configuration file.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the RCON address, `host:port`
    pub rcon_address: Option<String>,
    /// Optional override for the RCON password
    pub rcon_password: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn command() -> Command {
        Command::new("rconwatch")
            .version(env!("CARGO_PKG_VERSION"))
            .about("RCON watchdog for a dedicated game server; reads the server log on stdin")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("rconwatch.toml"),
            )
            .arg(
                Arg::new("rcon")
                    .short('r')
                    .long("rcon")
                    .value_name("HOST:PORT")
                    .help("RCON address (e.g., 127.0.0.1:27015)"),
            )
            .arg(
                Arg::new("password")
                    .short('p')
                    .long("password")
                    .value_name("PASSWORD")
                    .help("RCON password"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("rconwatch.toml")),
            rcon_address: matches.get_one::<String>("rcon").cloned(),
            rcon_password: matches.get_one::<String>("password").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::from_matches(CliArgs::command().get_matches_from(["rconwatch"]));
        assert_eq!(args.config_path, PathBuf::from("rconwatch.toml"));
        assert!(args.rcon_address.is_none());
        assert!(args.rcon_password.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_overrides() {
        let matches = CliArgs::command().get_matches_from([
            "rconwatch",
            "-c",
            "/etc/rconwatch.toml",
            "--rcon",
            "10.0.0.5:27020",
            "-p",
            "hunter2",
            "-l",
            "debug",
            "--json-logs",
        ]);
        let args = CliArgs::from_matches(matches);
        assert_eq!(args.config_path, PathBuf::from("/etc/rconwatch.toml"));
        assert_eq!(args.rcon_address.as_deref(), Some("10.0.0.5:27020"));
        assert_eq!(args.rcon_password.as_deref(), Some("hunter2"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
    }
}
