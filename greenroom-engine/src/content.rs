//! Canonical content model shared by the loader, evaluator, and engine.
//!
//! Authored JSON is loose about spellings and shapes; everything in this
//! module is the single runtime schema the normalizer reconciles it into.
//! Evaluation code never sees authoring aliases.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Comparison operator used by stat conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Gte,
    Lte,
    Eq,
    Gt,
    Lt,
}

impl CmpOp {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
        }
    }

    /// Apply the operator to two stat values.
    #[must_use]
    pub fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Gte => lhs >= rhs,
            Self::Lte => lhs <= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
            Self::Gt => lhs > rhs,
            Self::Lt => lhs < rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CmpOp {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" | ">=" => Ok(Self::Gte),
            "lte" | "<=" => Ok(Self::Lte),
            "eq" | "==" | "=" => Ok(Self::Eq),
            "gt" | ">" => Ok(Self::Gt),
            "lt" | "<" => Ok(Self::Lt),
            _ => Err(()),
        }
    }
}

/// A single authored predicate over the game state.
///
/// The `attempt` marker is orthogonal to the predicate itself: a choice whose
/// conditions carry it stays selectable and branches on the check at
/// selection time instead of being gated by it.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub attempt: bool,
}

impl Condition {
    #[must_use]
    pub const fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            attempt: false,
        }
    }

    #[must_use]
    pub const fn attemptable(kind: ConditionKind) -> Self {
        Self {
            kind,
            attempt: true,
        }
    }
}

impl From<ConditionKind> for Condition {
    fn from(kind: ConditionKind) -> Self {
        Self::new(kind)
    }
}

/// Canonical condition variants.
///
/// `Other` preserves an unrecognized authoring construct; the evaluator
/// fails it closed so unknown content never unlocks anything.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    Stat {
        stat: String,
        op: CmpOp,
        value: f64,
    },
    Flag {
        flag: String,
    },
    Item {
        item: String,
        count: i64,
    },
    Faction {
        faction: String,
        level: i64,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    /// Must wrap exactly one nested condition; anything else fails closed.
    Not {
        conditions: Vec<Condition>,
    },
    Other {
        kind: String,
    },
}

/// Canonical effect variants.
///
/// `Goto` is descriptive only: the applier reports the intended transition
/// but the engine owns the actual scene change. `Other` is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetStat { stat: String, value: f64 },
    ModifyStat { stat: String, delta: f64 },
    SetFlag { flag: String },
    ClearFlag { flag: String },
    AddItem { item: String, count: i64 },
    RemoveItem { item: String, count: i64 },
    Goto { scene: String },
    ModifyFaction { faction: String, delta: i64 },
    Other { kind: String },
}

/// Destination of a choice: either a direct target, or an attempt pair
/// resolved at selection time. The two shapes are mutually exclusive by
/// construction; the loader rejects content that populates both.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceTarget {
    Simple { to: String },
    Attempt { on_success: Branch, on_failure: Branch },
}

/// One arm of an attemptable choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub to: String,
    pub effects: Vec<Effect>,
}

impl Branch {
    #[must_use]
    pub const fn to(to: String) -> Self {
        Self {
            to,
            effects: Vec::new(),
        }
    }
}

/// An edge from a scene to its target(s).
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub target: ChoiceTarget,
    pub conditions: Vec<Condition>,
    /// Applied only on the simple-choice path, never for attempt branches.
    pub effects: Vec<Effect>,
    /// Shown when the choice is gated and its conditions are not met.
    pub disabled_hint: Option<String>,
}

impl Choice {
    /// Whether this choice branches on its check instead of being gated by
    /// it: either its conditions carry the attempt marker or its target is
    /// an attempt pair.
    #[must_use]
    pub fn is_attempt(&self) -> bool {
        self.conditions.iter().any(|c| c.attempt)
            || matches!(self.target, ChoiceTarget::Attempt { .. })
    }
}

/// Scene body text: a plain string or a structured location + paragraphs form.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneText {
    Plain(String),
    Located {
        location: String,
        paragraphs: Vec<String>,
    },
}

impl SceneText {
    /// Collapse to a single displayable string.
    #[must_use]
    pub fn flattened(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Located { paragraphs, .. } => paragraphs.join("\n\n"),
        }
    }
}

impl Default for SceneText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

/// Ending marker carried by terminal scenes. Authored either as a bare
/// `true` or as typed metadata with an ending id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EndingInfo {
    pub kind: Option<String>,
}

/// A fully normalized scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneData {
    pub id: String,
    pub title: String,
    pub text: SceneText,
    /// Applied on scene entry, before choices are offered.
    pub effects: Vec<Effect>,
    pub choices: Vec<Choice>,
    /// Pre-validated existence hints for authoring tooling; not runtime gates.
    pub required_flags: Vec<String>,
    pub required_items: Vec<String>,
    pub ending: Option<EndingInfo>,
}

impl SceneData {
    #[must_use]
    pub const fn is_ending(&self) -> bool {
        self.ending.is_some()
    }
}

/// Lightweight per-scene metadata in the manifest's scene index, used for
/// existence checks when validating links.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneStub {
    pub title: Option<String>,
    pub act: Option<u32>,
}

/// Per-ending requirement descriptor consumed by external ending-validation
/// tooling; the core carries it through without enforcing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingRequirement {
    pub faction: String,
    pub threshold: i64,
    #[serde(default)]
    pub state_tag: Option<String>,
}

/// An ending declared by the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingDecl {
    pub id: String,
    pub scene: String,
    #[serde(default)]
    pub requirement: Option<EndingRequirement>,
}

/// An act declaration, optionally naming its hub scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActDecl {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub hub: Option<String>,
}

/// The content manifest: entry point, scene index, and structural
/// declarations for acts, hubs, and endings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub content_version: String,
    pub starting_scene: String,
    pub scene_index: BTreeMap<String, SceneStub>,
    #[serde(default)]
    pub acts: Vec<ActDecl>,
    #[serde(default)]
    pub hubs: Vec<String>,
    #[serde(default)]
    pub endings: Vec<EndingDecl>,
}

impl Manifest {
    /// Whether a scene id is declared in the scene index.
    #[must_use]
    pub fn declares(&self, scene_id: &str) -> bool {
        self.scene_index.contains_key(scene_id)
    }
}
