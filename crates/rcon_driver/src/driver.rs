//! Persistent RCON connection with bounded reconnect-and-retry.

use crate::error::RconError;
use crate::packet::{Packet, SERVERDATA_AUTH_RESPONSE};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, trace, warn};

/// Connection parameters and timing for an [`RconDriver`].
#[derive(Debug, Clone)]
pub struct RconConfig {
    /// `host:port` of the game server's RCON listener
    pub address: String,
    pub password: String,
    /// Bound on TCP connect plus authentication
    pub connect_timeout: Duration,
    /// Bound on waiting for the first packet of a command's reply
    pub command_timeout: Duration,
    /// How long the socket must stay quiet before a reply counts as complete
    pub fragment_wait: Duration,
    /// Bound on a whole exchange, however many fragments keep arriving
    pub reply_timeout: Duration,
    /// Pause before each reconnect attempt
    pub retry_delay: Duration,
}

impl RconConfig {
    pub fn new(host: &str, port: u16, password: &str) -> Self {
        Self {
            address: format!("{host}:{port}"),
            password: password.to_string(),
            ..Default::default()
        }
    }
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:27015".to_string(),
            password: String::new(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(3),
            fragment_wait: Duration::from_millis(150),
            reply_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Raw reply to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconResponse {
    pub text: String,
    pub bytes_read: usize,
}

/// Anything that can run RCON commands. The watchdog only talks to this
/// trait so tests can substitute a scripted server.
#[async_trait]
pub trait RconClient: Send {
    /// Runs `command`, reconnecting up to `max_retries` times on transport failure.
    async fn command(&mut self, max_retries: u32, command: &str) -> Result<RconResponse, RconError>;

    /// Closes the connection. Further commands reconnect.
    async fn destroy(&mut self);
}

pub struct RconDriver {
    config: RconConfig,
    stream: Option<TcpStream>,
    /// Bytes received but not yet framed
    pending: Vec<u8>,
    next_id: i32,
}

impl RconDriver {
    /// Connects to `host:port` and authenticates with `password`.
    pub async fn init(host: &str, port: u16, password: &str) -> Result<Self, RconError> {
        Self::connect(RconConfig::new(host, port, password)).await
    }

    /// Connects and authenticates using a full configuration.
    pub async fn connect(config: RconConfig) -> Result<Self, RconError> {
        let mut driver = Self {
            config,
            stream: None,
            pending: Vec::new(),
            next_id: 1,
        };
        driver.reconnect().await?;
        Ok(driver)
    }

    pub fn config(&self) -> &RconConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        // -1 is the server's "auth failed" marker; never hand it out.
        self.next_id = if self.next_id == i32::MAX { 1 } else { self.next_id + 1 };
        id
    }

    fn drop_connection(&mut self) {
        self.stream = None;
        self.pending.clear();
    }

    async fn reconnect(&mut self) -> Result<(), RconError> {
        self.drop_connection();

        let address = self.config.address.clone();
        debug!("🔌 Connecting to RCON at {}", address);
        let stream = timeout(self.config.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| RconError::ConnectTimeout(address.clone()))??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);

        if let Err(e) = self.authenticate().await {
            self.drop_connection();
            return Err(e);
        }

        info!("🔐 RCON session established with {}", address);
        Ok(())
    }

    async fn authenticate(&mut self) -> Result<(), RconError> {
        let id = self.allocate_id();
        let password = self.config.password.clone();
        self.send(&Packet::auth(id, &password)).await?;

        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            let Some(packet) = self.next_packet(deadline).await? else {
                return Err(RconError::Timeout(self.config.connect_timeout));
            };
            if packet.kind != SERVERDATA_AUTH_RESPONSE {
                // Servers precede the verdict with an empty RESPONSE_VALUE.
                trace!("Skipping pre-auth packet id={} kind={}", packet.id, packet.kind);
                continue;
            }
            if packet.id == id {
                return Ok(());
            }
            return Err(RconError::AuthFailed(self.config.address.clone()));
        }
    }

    async fn send(&mut self, packet: &Packet) -> Result<(), RconError> {
        let stream = self.stream.as_mut().ok_or(RconError::ConnectionClosed)?;
        stream.write_all(&packet.encode()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads the next complete packet, or `None` once `deadline` passes.
    ///
    /// Only cancel-safe reads are raced against the deadline, so a timeout
    /// never leaves half a frame consumed.
    async fn next_packet(&mut self, deadline: Instant) -> Result<Option<Packet>, RconError> {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(packet) = Packet::try_parse(&mut self.pending)? {
                return Ok(Some(packet));
            }

            let stream = self.stream.as_mut().ok_or(RconError::ConnectionClosed)?;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let read = timeout(remaining, stream.read(&mut chunk)).await;
            match read {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => return Err(RconError::ConnectionClosed),
                Ok(Ok(n)) => self.pending.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    /// One send/receive cycle on the current connection.
    async fn exchange(&mut self, command: &str) -> Result<RconResponse, RconError> {
        let id = self.allocate_id();
        self.send(&Packet::exec(id, command)).await?;

        let reply_deadline = Instant::now() + self.config.reply_timeout;
        let first_deadline = (Instant::now() + self.config.command_timeout).min(reply_deadline);
        let mut text = loop {
            match self.next_packet(first_deadline).await? {
                None => return Err(RconError::Timeout(self.config.command_timeout)),
                Some(packet) if packet.id == id => break packet.body,
                Some(stale) => {
                    trace!("Discarding stale RCON packet id={} (waiting for {})", stale.id, id);
                }
            }
        };

        // Long replies arrive split across packets sharing our id.
        loop {
            if Instant::now() >= reply_deadline {
                warn!(
                    "⚠️ RCON reply to '{}' still streaming after {:?}, keeping {} bytes",
                    command,
                    self.config.reply_timeout,
                    text.len()
                );
                break;
            }
            let quiet_deadline = (Instant::now() + self.config.fragment_wait).min(reply_deadline);
            match self.next_packet(quiet_deadline).await? {
                None => break,
                Some(packet) if packet.id == id => text.push_str(&packet.body),
                Some(_) => {}
            }
        }

        let bytes_read = text.len();
        Ok(RconResponse { text, bytes_read })
    }
}

#[async_trait]
impl RconClient for RconDriver {
    async fn command(&mut self, max_retries: u32, command: &str) -> Result<RconResponse, RconError> {
        let mut last_error = None;
        let mut attempts: u32 = 0;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.retry_delay).await;
            }
            attempts = attempts.saturating_add(1);

            if self.stream.is_none() {
                if let Err(e) = self.reconnect().await {
                    warn!("⚠️ RCON reconnect attempt {} failed: {}", attempts, e);
                    let fatal = !e.is_transient();
                    last_error = Some(e);
                    if fatal {
                        break;
                    }
                    continue;
                }
            }

            match self.exchange(command).await {
                Ok(response) => {
                    trace!("RCON '{}' -> {} bytes", command, response.bytes_read);
                    return Ok(response);
                }
                Err(e) => {
                    warn!("⚠️ RCON command '{}' failed on attempt {}: {}", command, attempts, e);
                    // Whatever the server sends next belongs to the broken exchange.
                    self.drop_connection();
                    last_error = Some(e);
                }
            }
        }

        Err(RconError::RetriesExhausted {
            attempts,
            last: Box::new(last_error.unwrap_or(RconError::ConnectionClosed)),
        })
    }

    async fn destroy(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            info!("🔌 RCON connection to {} closed", self.config.address);
        }
        self.pending.clear();
    }
}
