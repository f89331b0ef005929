//! Admin and banned-word lists loaded from plain text files.

use roster::SteamId;
use std::path::Path;
use tracing::{debug, info, warn};

/// Set of SteamID64s read from a file, one per line.
///
/// Only the first whitespace-delimited token of a line is read, so trailing
/// notes such as `76561198000000001 // owner` are fine. Lines whose first
/// token is not a 17 digit GUID are ignored.
#[derive(Debug, Clone, Default)]
pub struct IdentityList {
    ids: Vec<SteamId>,
}

impl IdentityList {
    pub fn from_text(text: &str, capacity: usize) -> Self {
        let mut ids = Vec::new();
        for line in text.lines() {
            let Some(token) = line.split_whitespace().next() else {
                continue;
            };
            let Some(id) = SteamId::parse(token) else {
                debug!("Ignoring admin list line {:?}", line);
                continue;
            };
            if ids.len() >= capacity {
                warn!("⚠️ Admin list truncated at {} entries", capacity);
                break;
            }
            ids.push(id);
        }
        Self { ids }
    }

    /// Reads the list; a missing or unreadable file yields an empty list.
    pub async fn load(path: &Path, capacity: usize) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let list = Self::from_text(&text, capacity);
                info!("👮 Loaded {} admins from {}", list.len(), path.display());
                list
            }
            Err(e) => {
                warn!("⚠️ Could not read admin list {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn contains(&self, id: SteamId) -> bool {
        self.ids.contains(&id)
    }

    /// Like [`IdentityList::contains`], for a GUID still in text form.
    pub fn contains_str(&self, guid: &str) -> bool {
        SteamId::parse(guid.trim()).is_some_and(|id| self.contains(id))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Case-insensitive substring blocklist, one word per line.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    pub fn from_text(text: &str, capacity: usize) -> Self {
        let words = text
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .take(capacity)
            .map(str::to_lowercase)
            .collect();
        Self { words }
    }

    pub async fn load(path: &Path, capacity: usize) -> Self {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => {
                let list = Self::from_text(&text, capacity);
                info!("🚫 Loaded {} banned words from {}", list.len(), path.display());
                list
            }
            Err(e) => {
                warn!("⚠️ Could not read word list {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// True when any listed word occurs anywhere in `text`, ignoring case.
    pub fn matches(&self, text: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let text = text.to_lowercase();
        self.words.iter().any(|w| text.contains(w.as_str()))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
