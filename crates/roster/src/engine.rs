//! Roster state held between polls.

use crate::player::{InfoDepth, PlayerRecord};
use crate::snapshot::{missing, Roster};
use tracing::debug;

/// Marker preceding the destination URL in a map change log line.
const MAP_CHANGE_MARKER: &str = "SeamlessTravel to:";

/// Players who left and joined between two successful polls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterChanges {
    pub departed: Vec<PlayerRecord>,
    pub arrived: Vec<PlayerRecord>,
}

impl RosterChanges {
    pub fn is_empty(&self) -> bool {
        self.departed.is_empty() && self.arrived.is_empty()
    }
}

/// Previous/current snapshot pair plus the map and server names.
///
/// Snapshots are only ever replaced by [`RosterEngine::apply`], which callers
/// invoke for successful queries alone; a failed query simply never reaches
/// the engine, so the last known roster stays visible.
#[derive(Debug, Clone)]
pub struct RosterEngine {
    previous: Roster,
    current: Roster,
    last_success: u64,
    map_name: String,
    server_name: String,
}

impl RosterEngine {
    pub fn new(server_name: impl Into<String>, now: u64) -> Self {
        Self {
            previous: Roster::new(),
            current: Roster::new(),
            last_success: now,
            map_name: "Unknown".to_string(),
            server_name: server_name.into(),
        }
    }

    /// Installs a successful reply as the current snapshot and reports what changed.
    pub fn apply(&mut self, reply: &str, now: u64) -> RosterChanges {
        let parsed = Roster::parse(reply);
        self.previous = std::mem::replace(&mut self.current, parsed);
        self.last_success = now;

        let changes = RosterChanges {
            departed: missing(&self.previous, &self.current).into_iter().cloned().collect(),
            arrived: missing(&self.current, &self.previous).into_iter().cloned().collect(),
        };
        debug!(
            "Roster now {} players (+{} -{})",
            self.current.len(),
            changes.arrived.len(),
            changes.departed.len()
        );
        changes
    }

    pub fn count(&self) -> usize {
        self.current.len()
    }

    pub fn current(&self) -> &Roster {
        &self.current
    }

    pub fn previous(&self) -> &Roster {
        &self.previous
    }

    pub fn render(&self, depth: InfoDepth, delimiter: &str) -> String {
        self.current.render(depth, delimiter)
    }

    /// Epoch seconds of the last successful query.
    pub fn last_success(&self) -> u64 {
        self.last_success
    }

    /// Restarts the liveness clock without new data, e.g. right after a server restart.
    pub fn touch(&mut self, now: u64) {
        self.last_success = now;
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn set_map_name(&mut self, name: impl Into<String>) {
        self.map_name = name.into();
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn set_server_name(&mut self, name: impl Into<String>) {
        self.server_name = name.into();
    }
}

/// Extracts the map from a `SeamlessTravel to: /Game/Maps/Town/Town?Scenario=...` line.
pub fn parse_map_name(line: &str) -> Option<String> {
    let (_, rest) = line.split_once(MAP_CHANGE_MARKER)?;
    let url = rest.split_whitespace().next()?;
    let path = url.split('?').next()?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}
