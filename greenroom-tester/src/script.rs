//! Scripted-playthrough file format.
//!
//! A script is a JSON document: optional metadata and starting state, a list
//! of steps, and softlock thresholds. Steps either drive the engine (start,
//! choose, snapshot save/load) or assert on its state (checkpoint, or the
//! inline `expect` any driving step may carry).

use greenroom_engine::CmpOp;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaythroughScript {
    #[serde(default)]
    pub meta: ScriptMeta,
    #[serde(default)]
    pub starting_state: StartingState,
    pub steps: Vec<Step>,
    #[serde(default, alias = "softlockDetection")]
    pub softlock: SoftlockConfig,
    /// When set, the run must finish on an ending scene matching the
    /// criteria.
    #[serde(default, alias = "endingCriteria")]
    pub ending: Option<EndingCriteria>,
}

impl PlaythroughScript {
    /// Parse a script document.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error for malformed scripts.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.meta.name.as_deref().unwrap_or("unnamed script")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Stats, flags, items, and faction levels applied before the first step.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartingState {
    pub stats: BTreeMap<String, f64>,
    pub flags: Vec<String>,
    pub inventory: BTreeMap<String, i64>,
    pub factions: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Initialize the engine and land on the starting scene.
    Start {
        #[serde(default)]
        expect: Option<Assertions>,
    },
    /// Select a choice on the current scene, by index or by label. When
    /// both are given the index decides and the label is cross-checked.
    Choose {
        #[serde(default)]
        index: Option<usize>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        expect: Option<Assertions>,
    },
    /// Pure assertion step, optionally also saving a named snapshot.
    Checkpoint {
        expect: Assertions,
        #[serde(default, rename = "saveSnapshotName")]
        save_snapshot_name: Option<String>,
    },
    /// Serialize the current state into a named in-memory slot.
    SaveSnapshot { slot: String },
    /// Restore a previously saved slot.
    LoadSnapshot {
        slot: String,
        #[serde(default)]
        expect: Option<Assertions>,
    },
}

/// Everything a step can assert about the live state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assertions {
    pub scene: Option<String>,
    /// Flags that must be set.
    pub flags: Vec<String>,
    /// Flags that must not be set.
    pub absent_flags: Vec<String>,
    /// Exact expected item counts; 0 means absent.
    pub items: BTreeMap<String, i64>,
    pub stats: Vec<StatAssertion>,
    /// Expected visited counts per scene id.
    pub visited: BTreeMap<String, u32>,
    /// Expected number of selectable choices on the current scene.
    pub selectable_choices: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatAssertion {
    pub stat: String,
    #[serde(default = "default_stat_op")]
    pub op: CmpOp,
    pub value: f64,
}

const fn default_stat_op() -> CmpOp {
    CmpOp::Eq
}

/// Thresholds for the softlock probe.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftlockConfig {
    /// Visits to one scene before the run counts as stuck.
    pub max_revisits: u32,
    /// Consecutive steps with an unchanged progress signature.
    pub max_steps_without_progress: u32,
    /// Hub scenes allowed to exceed the revisit threshold.
    pub exempt_scenes: Vec<String>,
}

impl Default for SoftlockConfig {
    fn default() -> Self {
        Self {
            max_revisits: 10,
            max_steps_without_progress: 15,
            exempt_scenes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndingCriteria {
    pub required: bool,
    /// When set, the ending scene's typed marker must match.
    pub kind: Option<String>,
    /// When set, the run must finish on exactly this scene id.
    pub scene: Option<String>,
    /// Flags that must be set at the end of the run.
    pub flags: Vec<String>,
    /// Minimum item counts at the end of the run.
    pub items: BTreeMap<String, i64>,
    /// Minimum stat thresholds at the end of the run.
    pub stats: BTreeMap<String, f64>,
}

impl Default for EndingCriteria {
    fn default() -> Self {
        Self {
            required: true,
            kind: None,
            scene: None,
            flags: Vec::new(),
            items: BTreeMap::new(),
            stats: BTreeMap::new(),
        }
    }
}
