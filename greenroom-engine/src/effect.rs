//! Effect application: the only mutation path into the game state.
//!
//! Each application mutates exactly the passed state and returns a
//! [`ChangeRecord`] describing the affected path, the old and new values,
//! and presentation hints for subscribers. `goto` effects only declare an
//! intended transition; committing it is the engine's job.

use log::warn;
use serde::Serialize;
use serde_json::{Value, json};
use smallvec::SmallVec;

use crate::content::Effect;
use crate::state::GameState;

/// Faction alignment bounds; modify-faction clamps into this range.
pub const FACTION_MIN: i64 = 0;
pub const FACTION_MAX: i64 = 10;

/// Which slice of the presentation needs to react to a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderScope {
    Stats,
    Flags,
    Inventory,
    Factions,
    Scene,
    None,
}

/// How loudly the presentation should surface a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Normal,
    High,
}

/// Description of one state mutation, delivered synchronously to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeRecord {
    /// Dotted path of the affected value, e.g. `stats.courage`.
    pub path: String,
    pub old: Value,
    pub new: Value,
    pub scope: RenderScope,
    pub urgency: Urgency,
}

impl ChangeRecord {
    /// Whether this record declares an intended scene transition.
    #[must_use]
    pub fn goto_target(&self) -> Option<&str> {
        if self.path == "scene.goto" {
            self.new.as_str()
        } else {
            None
        }
    }
}

/// Change records produced by one batch of effects; most batches are small.
pub type ChangeSet = SmallVec<[ChangeRecord; 4]>;

/// Apply a single effect to the state.
#[must_use = "the change record carries the notification payload"]
pub fn apply(effect: &Effect, state: &mut GameState) -> ChangeRecord {
    match effect {
        Effect::SetStat { stat, value } => {
            let old = state.stats.insert(stat.clone(), *value);
            stat_record(stat, old, *value)
        }
        Effect::ModifyStat { stat, delta } => {
            let old = state.stats.get(stat).copied();
            let new = old.unwrap_or(0.0) + delta;
            state.stats.insert(stat.clone(), new);
            stat_record(stat, old, new)
        }
        Effect::SetFlag { flag } => {
            let was_set = !state.flags.insert(flag.clone());
            flag_record(flag, was_set, true)
        }
        Effect::ClearFlag { flag } => {
            let was_set = state.flags.remove(flag);
            flag_record(flag, was_set, false)
        }
        Effect::AddItem { item, count } => adjust_item(state, item, *count),
        Effect::RemoveItem { item, count } => adjust_item(state, item, -count),
        Effect::Goto { scene } => ChangeRecord {
            path: "scene.goto".to_string(),
            old: json!(state.current_scene_id),
            new: json!(scene),
            scope: RenderScope::Scene,
            urgency: Urgency::High,
        },
        Effect::ModifyFaction { faction, delta } => {
            let old = state.factions.get(faction).copied();
            let new = (old.unwrap_or(0) + delta).clamp(FACTION_MIN, FACTION_MAX);
            state.factions.insert(faction.clone(), new);
            ChangeRecord {
                path: format!("factions.{faction}"),
                old: old.map_or(Value::Null, |v| json!(v)),
                new: json!(new),
                scope: RenderScope::Factions,
                urgency: Urgency::Normal,
            }
        }
        Effect::Other { kind } => {
            warn!("unrecognized effect type '{kind}'; applying as no-op");
            ChangeRecord {
                path: format!("noop.{kind}"),
                old: Value::Null,
                new: Value::Null,
                scope: RenderScope::None,
                urgency: Urgency::Low,
            }
        }
    }
}

/// Apply a batch of effects in authored order.
#[must_use = "the change set carries the notification payloads"]
pub fn apply_all(effects: &[Effect], state: &mut GameState) -> ChangeSet {
    effects.iter().map(|effect| apply(effect, state)).collect()
}

fn adjust_item(state: &mut GameState, item: &str, delta: i64) -> ChangeRecord {
    let old = state.inventory.get(item).copied();
    // Counts never go negative; a count that reaches 0 drops the key.
    let new = (old.unwrap_or(0) + delta).max(0);
    if new == 0 {
        state.inventory.remove(item);
    } else {
        state.inventory.insert(item.to_string(), new);
    }
    ChangeRecord {
        path: format!("inventory.{item}"),
        old: old.map_or(Value::Null, |v| json!(v)),
        new: json!(new),
        scope: RenderScope::Inventory,
        urgency: Urgency::Normal,
    }
}

fn stat_record(stat: &str, old: Option<f64>, new: f64) -> ChangeRecord {
    ChangeRecord {
        path: format!("stats.{stat}"),
        old: old.map_or(Value::Null, |v| json!(v)),
        new: json!(new),
        scope: RenderScope::Stats,
        urgency: Urgency::Normal,
    }
}

fn flag_record(flag: &str, old: bool, new: bool) -> ChangeRecord {
    ChangeRecord {
        path: format!("flags.{flag}"),
        old: json!(old),
        new: json!(new),
        scope: RenderScope::Flags,
        urgency: Urgency::Low,
    }
}
