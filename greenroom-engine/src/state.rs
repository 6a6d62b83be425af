//! Game state, scene history, and the versioned save blob.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Save blob format version. A blob carrying any other version is rejected
/// outright; there is no migration chain.
pub const SAVE_VERSION: u32 = 1;

/// One visit record in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneHistoryEntry {
    pub scene_id: String,
    /// Milliseconds since the epoch; metadata only, never consulted by logic.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_label: Option<String>,
    /// Starts at 1 and increments on every re-visit; never reset.
    pub visited_count: u32,
}

/// The complete serializable session state. Exactly one lives per engine;
/// it is mutated only through effect application and scene transitions, and
/// wholesale-replaced (with rollback on failure) by load operations.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub version: u32,
    pub content_version: String,
    pub timestamp: i64,
    pub current_scene_id: String,
    pub history: Vec<SceneHistoryEntry>,
    pub stats: BTreeMap<String, f64>,
    pub flags: BTreeSet<String>,
    pub inventory: BTreeMap<String, i64>,
    /// Faction alignment tracks, each clamped to [0, 10].
    pub factions: BTreeMap<String, i64>,
    pub random_seed: Option<u64>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new("")
    }
}

impl GameState {
    /// Fresh state bound to a content version, before any scene is loaded.
    #[must_use]
    pub fn new(content_version: &str) -> Self {
        Self {
            version: SAVE_VERSION,
            content_version: content_version.to_string(),
            timestamp: 0,
            current_scene_id: String::new(),
            history: Vec::new(),
            stats: BTreeMap::new(),
            flags: BTreeSet::new(),
            inventory: BTreeMap::new(),
            factions: BTreeMap::new(),
            random_seed: None,
        }
    }

    /// How many times a scene has been visited this session.
    #[must_use]
    pub fn visited_count(&self, scene_id: &str) -> u32 {
        self.history
            .iter()
            .find(|entry| entry.scene_id == scene_id)
            .map_or(0, |entry| entry.visited_count)
    }

    /// Record a visit: increments the scene's existing history entry or
    /// appends a new one starting at 1. The choice label, when present, is
    /// the label of the choice that led here.
    pub fn record_visit(&mut self, scene_id: &str, timestamp: i64, choice_label: Option<String>) {
        if let Some(entry) = self
            .history
            .iter_mut()
            .find(|entry| entry.scene_id == scene_id)
        {
            entry.visited_count += 1;
            entry.timestamp = timestamp;
            if choice_label.is_some() {
                entry.choice_label = choice_label;
            }
        } else {
            self.history.push(SceneHistoryEntry {
                scene_id: scene_id.to_string(),
                timestamp,
                choice_label,
                visited_count: 1,
            });
        }
    }

    /// Snapshot of everything that counts as narrative progress. Two equal
    /// signatures mean no flag, item, or stat has changed between them.
    #[must_use]
    pub fn progress_signature(&self) -> ProgressSignature {
        ProgressSignature::new(self.flags.clone(), self.inventory.clone(), &self.stats)
    }

    /// Serialize to the versioned save blob.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] of kind `InvalidData` if serialization
    /// fails.
    pub fn save_to_string(&self) -> Result<String, PersistError> {
        let blob = SaveData::from(self);
        serde_json::to_string(&blob)
            .map_err(|err| PersistError::new(PersistErrorKind::InvalidData, &err.to_string()))
    }

    /// Parse a save blob back into a state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` for malformed JSON and `VersionMismatch` when
    /// the blob's format version is not [`SAVE_VERSION`]. Content-version
    /// equality against loaded content is the engine's job, not this one.
    pub fn from_save_str(blob: &str) -> Result<Self, PersistError> {
        let parsed: SaveData = serde_json::from_str(blob)
            .map_err(|err| PersistError::new(PersistErrorKind::InvalidData, &err.to_string()))?;
        if parsed.version != SAVE_VERSION {
            return Err(PersistError::new(
                PersistErrorKind::VersionMismatch,
                &format!(
                    "save format version {} is not supported (expected {SAVE_VERSION})",
                    parsed.version
                ),
            ));
        }
        Ok(parsed.into_state())
    }
}

/// Comparable flags/inventory/stats snapshot used for softlock progress
/// tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSignature {
    flags: BTreeSet<String>,
    inventory: BTreeMap<String, i64>,
    stats: BTreeMap<String, OrderedStat>,
}

/// Stat value wrapper so signatures can be compared with `Eq`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedStat(f64);

impl Eq for OrderedStat {}

impl ProgressSignature {
    fn new(
        flags: BTreeSet<String>,
        inventory: BTreeMap<String, i64>,
        stats: &BTreeMap<String, f64>,
    ) -> Self {
        Self {
            flags,
            inventory,
            stats: stats
                .iter()
                .map(|(name, value)| (name.clone(), OrderedStat(*value)))
                .collect(),
        }
    }
}

/// On-disk save shape: flags as a list, inventory as `[id, count]` pairs.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveData {
    version: u32,
    content_version: String,
    timestamp: i64,
    current_scene_id: String,
    history: Vec<SceneHistoryEntry>,
    stats: BTreeMap<String, f64>,
    flags: Vec<String>,
    inventory: Vec<(String, i64)>,
    factions: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    random_seed: Option<u64>,
}

impl From<&GameState> for SaveData {
    fn from(state: &GameState) -> Self {
        Self {
            version: state.version,
            content_version: state.content_version.clone(),
            timestamp: state.timestamp,
            current_scene_id: state.current_scene_id.clone(),
            history: state.history.clone(),
            stats: state.stats.clone(),
            flags: state.flags.iter().cloned().collect(),
            inventory: state
                .inventory
                .iter()
                .map(|(id, count)| (id.clone(), *count))
                .collect(),
            factions: state.factions.clone(),
            random_seed: state.random_seed,
        }
    }
}

impl SaveData {
    fn into_state(self) -> GameState {
        GameState {
            version: self.version,
            content_version: self.content_version,
            timestamp: self.timestamp,
            current_scene_id: self.current_scene_id,
            history: self.history,
            stats: self.stats,
            flags: self.flags.into_iter().collect(),
            inventory: self.inventory.into_iter().collect(),
            factions: self.factions,
            random_seed: self.random_seed,
        }
    }
}

/// Closed taxonomy of user-facing persistence failures, so presentation
/// collaborators can render differentiated messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistErrorKind {
    QuotaExceeded,
    PrivacyMode,
    InvalidData,
    VersionMismatch,
    StorageUnavailable,
    Unknown,
}

impl PersistErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuotaExceeded => "quota-exceeded",
            Self::PrivacyMode => "privacy-mode",
            Self::InvalidData => "invalid-data",
            Self::VersionMismatch => "version-mismatch",
            Self::StorageUnavailable => "storage-unavailable",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a raw storage error name reported by a platform layer.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.to_ascii_lowercase();
        if lowered.contains("quota") {
            Self::QuotaExceeded
        } else if lowered.contains("security") || lowered.contains("private") {
            Self::PrivacyMode
        } else if lowered.contains("unavailable") || lowered.contains("not supported") {
            Self::StorageUnavailable
        } else if lowered.contains("parse") || lowered.contains("invalid") {
            Self::InvalidData
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for PersistErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistence failure with its taxonomy kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PersistError {
    pub kind: PersistErrorKind,
    pub message: String,
}

impl PersistError {
    #[must_use]
    pub fn new(kind: PersistErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}
