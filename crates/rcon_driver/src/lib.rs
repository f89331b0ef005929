//! # RCON Driver
//!
//! A persistent TCP client for the game server's remote console. The driver
//! authenticates once at [`RconDriver::init`], then runs one command at a time
//! through [`RconClient::command`]. A broken connection is silently replaced on
//! the next command, bounded by the caller's retry budget.
//!
//! Every failure is reported as an [`RconError`] value; nothing here panics
//! on network conditions.

pub mod driver;
pub mod error;
pub mod packet;

pub use driver::{RconClient, RconConfig, RconDriver, RconResponse};
pub use error::RconError;
pub use packet::Packet;
