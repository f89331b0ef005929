//! Game server restart hooks.

use crate::error::WatchdogError;
use async_trait::async_trait;
use tracing::{info, warn};

/// Something that can restart the game server process.
#[async_trait]
pub trait ServerRestarter: Send + Sync {
    async fn restart(&self) -> Result<(), WatchdogError>;
}

/// Runs a shell command to restart the server. With no command configured,
/// a restart request is logged and otherwise ignored.
#[derive(Debug, Clone, Default)]
pub struct ShellRestarter {
    command: Option<String>,
}

impl ShellRestarter {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ServerRestarter for ShellRestarter {
    async fn restart(&self) -> Result<(), WatchdogError> {
        let Some(command) = &self.command else {
            warn!("⚠️ Server restart requested but no restart command is configured");
            return Ok(());
        };

        info!("🔄 Restarting game server: {}", command);
        #[cfg(windows)]
        let status = tokio::process::Command::new("cmd").arg("/C").arg(command).status().await?;
        #[cfg(not(windows))]
        let status = tokio::process::Command::new("sh").arg("-c").arg(command).status().await?;

        if status.success() {
            Ok(())
        } else {
            Err(WatchdogError::Restart(format!("`{}` exited with {}", command, status)))
        }
    }
}
