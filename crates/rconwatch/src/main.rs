//! Main application entry point for rconwatch.
//!
//! Loads configuration, connects to the game server's RCON port, installs
//! the bundled plugins and then follows the server log on stdin until a
//! termination signal arrives.

mod cli;
mod config;
mod signals;

use anyhow::Context;
use cli::CliArgs;
use config::{AppConfig, LoggingSettings};
use plugin_logger::LoggerPlugin;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use watchdog::WatchdogContext;

// ============================================================================
// Logging Setup
// ============================================================================

/// Initialize logging system. `RUST_LOG` takes precedence over the configured level.
fn setup_logging(config: &LoggingSettings) -> anyhow::Result<()> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdin/stdout belong to the log pipe.
    if config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

// ============================================================================
// Application
// ============================================================================

pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Loads the configuration, applies CLI overrides and sets up logging.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(address) = &args.rcon_address {
            config.set_rcon_address(address)?;
        }
        if let Some(password) = args.rcon_password {
            config.rcon.password = password;
        }
        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }

        config.validate().context("Configuration validation failed")?;
        setup_logging(&config.logging)?;

        info!("🐕 rconwatch v{}", env!("CARGO_PKG_VERSION"));
        info!(
            "📂 Config: {} | Server: {} | RCON: {}:{}",
            args.config_path.display(),
            config.server.name,
            config.rcon.host,
            config.rcon.port
        );

        Ok(Self { config })
    }

    /// Connects, runs the main loop until a shutdown signal, then cleans up.
    pub async fn run(self) -> anyhow::Result<()> {
        let watchdog_config = self.config.to_watchdog_config();
        let mut context = WatchdogContext::connect(watchdog_config)
            .await
            .context("Failed to start watchdog")?;

        context.install_plugin(Box::new(LoggerPlugin::new())).await?;
        context.start().await;

        info!("✅ rconwatch is now running, reading server log from stdin");
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let shutdown = async {
            match signals::wait_for_shutdown().await {
                Ok(name) => name,
                Err(e) => {
                    error!("❌ Signal handling unavailable: {}", e);
                    std::future::pending::<String>().await
                }
            }
        };

        let stdin = BufReader::new(tokio::io::stdin());
        let result = context.run(stdin, shutdown).await;

        let stats = context.bus().get_stats().await;
        info!("📊 Final Statistics:");
        info!("  - Events dispatched: {}", stats.events_dispatched);
        info!("  - Handlers registered: {}", stats.total_handlers);
        info!("  - Non-zero handler statuses: {}", stats.nonzero_statuses);

        context.shutdown().await;
        Ok(result?)
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = CliArgs::parse();

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:#}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("❌ Failed to start application: {:#}", e);
            std::process::exit(1);
        }
    }
}
