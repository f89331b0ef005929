//! Roster snapshots: parsing a `listplayers` reply and diffing two replies.
//!
//! Two reply grammars are understood, one record per line:
//!
//! ```text
//! 1 76561198000000001 Alice 1.2.3.4 10
//! 256 | Alice | SteamNWI:76561198000000001 | 1.2.3.4 | 10 |
//! ```
//!
//! Header lines, separator rules, bot rows (`INVALID` net id) and anything
//! else without a SteamID64 and an IP are skipped.

use crate::player::{InfoDepth, PlayerRecord, SteamId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use tracing::trace;

/// The set of connected players from one successful query, in reply order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    players: Vec<PlayerRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(players: Vec<PlayerRecord>) -> Self {
        Self { players }
    }

    /// Builds a roster from a reply, skipping lines that carry no player.
    pub fn parse(reply: &str) -> Self {
        let players = reply
            .lines()
            .filter_map(|line| {
                let record = parse_line(line);
                if record.is_none() && !line.trim().is_empty() {
                    trace!("Skipping roster line {:?}", line);
                }
                record
            })
            .collect();
        Self { players }
    }

    pub fn players(&self) -> &[PlayerRecord] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, guid: SteamId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.guid == guid)
    }

    pub fn contains(&self, guid: SteamId) -> bool {
        self.get(guid).is_some()
    }

    pub fn guids(&self) -> HashSet<SteamId> {
        self.players.iter().map(|p| p.guid).collect()
    }

    /// Joins every record, rendered at `depth`, with `delimiter`.
    ///
    /// This is a display format only; never compare rosters through it.
    pub fn render(&self, depth: InfoDepth, delimiter: &str) -> String {
        self.players
            .iter()
            .map(|p| p.render(depth))
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

/// Calls `on_missing(name, ip, guid)` once for every GUID in `old` that is not
/// in `new`, in `old`'s order. Returns how many were reported.
///
/// Only the GUID is compared: a player who changed name or IP is still the
/// same player. Swap the arguments to find arrivals instead of departures.
pub fn diff<F>(old: &Roster, new: &Roster, mut on_missing: F) -> usize
where
    F: FnMut(&str, &str, SteamId),
{
    let present = new.guids();
    let mut reported = HashSet::new();
    for player in &old.players {
        if !present.contains(&player.guid) && reported.insert(player.guid) {
            on_missing(&player.name, &player.ip, player.guid);
        }
    }
    reported.len()
}

/// Records of `old` whose GUID is absent from `new`.
pub fn missing<'a>(old: &'a Roster, new: &Roster) -> Vec<&'a PlayerRecord> {
    let present = new.guids();
    let mut reported = HashSet::new();
    old.players
        .iter()
        .filter(|p| !present.contains(&p.guid) && reported.insert(p.guid))
        .collect()
}

/// Parses a single reply line into a record.
pub fn parse_line(line: &str) -> Option<PlayerRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if line.contains('|') {
        parse_table_row(line)
    } else {
        parse_spaced_row(line)
    }
}

fn looks_like_ip(token: &str) -> bool {
    token.parse::<IpAddr>().is_ok() || token.parse::<SocketAddr>().is_ok()
}

/// `ID | Name | NetID | IP | Score |`
fn parse_table_row(line: &str) -> Option<PlayerRecord> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    // The NetID column is the identity followed by an address; a name made of
    // digits can look like a GUID but is never followed by one.
    let guid_at = (0..fields.len()).find(|&i| {
        SteamId::parse(fields[i]).is_some() && fields.get(i + 1).is_some_and(|f| looks_like_ip(f))
    })?;
    let guid = SteamId::parse(fields[guid_at])?;
    let ip = fields[guid_at + 1];
    let name = if guid_at >= 1 { fields[guid_at - 1] } else { "" };
    let slot = if guid_at >= 2 {
        fields[guid_at - 2].parse().ok()
    } else {
        None
    };
    let score = fields.get(guid_at + 2).and_then(|f| f.parse().ok());

    Some(PlayerRecord {
        guid,
        name: name.to_string(),
        ip: ip.to_string(),
        slot,
        score,
    })
}

/// `slot guid name... ip [score]`, where the name may contain spaces.
fn parse_spaced_row(line: &str) -> Option<PlayerRecord> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let guid_at = tokens.iter().position(|t| SteamId::parse(t).is_some())?;
    let guid = SteamId::parse(tokens[guid_at])?;

    let ip_at = (guid_at + 1..tokens.len()).rev().find(|&i| looks_like_ip(tokens[i]))?;
    let name = tokens[guid_at + 1..ip_at].join(" ");
    let slot = if guid_at >= 1 {
        tokens[guid_at - 1].parse().ok()
    } else {
        None
    };
    let score = tokens.get(ip_at + 1).and_then(|t| t.parse().ok());

    Some(PlayerRecord {
        guid,
        name,
        ip: tokens[ip_at].to_string(),
        slot,
        score,
    })
}
