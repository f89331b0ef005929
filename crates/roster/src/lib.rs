//! # Roster
//!
//! Structured view of the players connected to the game server.
//!
//! Replies to the `listplayers` RCON command are parsed into [`PlayerRecord`]s
//! keyed by [`SteamId`]. Two consecutive snapshots are compared as GUID sets,
//! never as rendered text, to derive who joined and who left.

pub mod engine;
pub mod player;
pub mod snapshot;

pub use engine::{parse_map_name, RosterChanges, RosterEngine};
pub use player::{InfoDepth, InvalidSteamId, PlayerRecord, SteamId};
pub use snapshot::{diff, missing, parse_line, Roster};
