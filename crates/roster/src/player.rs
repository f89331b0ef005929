//! Player identity and per-player records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix the game's `listplayers` table puts in front of Steam identities.
const NET_ID_PREFIX: &str = "SteamNWI:";

/// A 17-digit SteamID64, the only identity key used for roster diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SteamId(u64);

impl SteamId {
    /// Number of decimal digits in a SteamID64.
    pub const LEN: usize = 17;

    /// Parses a bare or `SteamNWI:`-prefixed SteamID64.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.strip_prefix(NET_ID_PREFIX).unwrap_or(text);
        if digits.len() != Self::LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(SteamId)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SteamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:017}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a 17-digit SteamID64: {0:?}")]
pub struct InvalidSteamId(pub String);

impl FromStr for SteamId {
    type Err = InvalidSteamId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SteamId::parse(s).ok_or_else(|| InvalidSteamId(s.to_string()))
    }
}

/// One connected player as reported by the roster query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub guid: SteamId,
    pub name: String,
    pub ip: String,
    /// Server-side slot/controller id, when the reply carries one
    pub slot: Option<u32>,
    pub score: Option<i32>,
}

/// How much of each record [`crate::Roster::render`] emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoDepth {
    Guid,
    Name,
    GuidName,
    /// GUID, IP, score and name
    Full,
}

impl InfoDepth {
    /// Maps the numeric verbosity levels used by plugins (1-4).
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => InfoDepth::Guid,
            2 => InfoDepth::Name,
            3 => InfoDepth::GuidName,
            _ => InfoDepth::Full,
        }
    }
}

impl PlayerRecord {
    pub fn render(&self, depth: InfoDepth) -> String {
        match depth {
            InfoDepth::Guid => self.guid.to_string(),
            InfoDepth::Name => self.name.clone(),
            InfoDepth::GuidName => format!("{} {}", self.guid, self.name),
            InfoDepth::Full => format!(
                "{} {} {} {}",
                self.guid,
                self.ip,
                self.score.unwrap_or(0),
                self.name
            ),
        }
    }
}
