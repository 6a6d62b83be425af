//! Content normalization and loading.
//!
//! Authored JSON arrives in several historical spellings: condition and
//! effect types have aliases, a single condition object may stand in for a
//! one-element list, and a generic stat-threshold construct is used for
//! faction checks. This module reconciles all of it into the canonical
//! schema in [`crate::content`] in one pass, before any evaluation, and
//! fails fast with a structured error on structural authoring mistakes.

use log::debug;
use serde_json::{Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use thiserror::Error;

use crate::content::{
    Branch, Choice, ChoiceTarget, CmpOp, Condition, ConditionKind, Effect, EndingInfo, Manifest,
    SceneData, SceneText,
};
use crate::graph::scene_edges;
use crate::ContentSource;

/// Faction ids recognized by the re-tag heuristic: a generic stat-threshold
/// condition naming one of these is really a faction check and must be
/// re-tagged before evaluation ever sees it.
pub const FACTION_IDS: &[&str] = &["stagehands", "front_of_house", "understudies", "critics"];

/// Structured loading failure. Content errors are fail-fast by design:
/// authoring mistakes must surface before a player can reach them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("scene '{scene_id}' is not declared in the manifest scene index")]
    Missing { scene_id: String },
    #[error("scene '{scene_id}': {message}")]
    Malformed { scene_id: String, message: String },
    #[error("scene '{scene_id}': choice '{label}': {message}")]
    InvalidChoice {
        scene_id: String,
        label: String,
        message: String,
    },
    #[error("scene '{scene_id}': link to undeclared scene '{target}'")]
    BrokenLink { scene_id: String, target: String },
    #[error("manifest: {message}")]
    Manifest { message: String },
    #[error("scene '{scene_id}': content source failure: {message}")]
    Source { scene_id: String, message: String },
}

impl ContentError {
    /// Wrap a content-source failure, attributing it to a scene id (or
    /// `"manifest"` for the manifest document).
    #[must_use]
    pub fn source(scene_id: &str, err: &dyn std::error::Error) -> Self {
        Self::Source {
            scene_id: scene_id.to_string(),
            message: err.to_string(),
        }
    }

    fn malformed(scene_id: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            scene_id: scene_id.to_string(),
            message: message.into(),
        }
    }
}

/// Parse and validate a raw manifest document.
///
/// # Errors
///
/// Returns [`ContentError::Manifest`] on schema violations or when the
/// starting scene is absent from the scene index.
pub fn normalize_manifest(raw: &Value) -> Result<Manifest, ContentError> {
    let manifest: Manifest =
        serde_json::from_value(raw.clone()).map_err(|err| ContentError::Manifest {
            message: err.to_string(),
        })?;
    if !manifest.declares(&manifest.starting_scene) {
        return Err(ContentError::Manifest {
            message: format!(
                "starting scene '{}' is not in the scene index",
                manifest.starting_scene
            ),
        });
    }
    Ok(manifest)
}

/// Normalize one raw scene document into canonical [`SceneData`].
///
/// # Errors
///
/// Fails fast on malformed structure; unknown condition/effect *types* are
/// preserved as fail-safe `Other` variants instead.
pub fn normalize_scene(scene_id: &str, raw: &Value) -> Result<SceneData, ContentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ContentError::malformed(scene_id, "scene document is not a JSON object"))?;

    let id = opt_str(obj, "id").unwrap_or_else(|| scene_id.to_string());
    let title = opt_str(obj, "title").unwrap_or_default();
    let text = normalize_text(scene_id, obj.get("text"))?;
    let effects = normalize_effects(scene_id, obj.get("effects"))?;
    let choices = match obj.get("choices") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| normalize_choice(scene_id, entry))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ContentError::malformed(scene_id, "'choices' is not an array"));
        }
    };

    Ok(SceneData {
        id,
        title,
        text,
        effects,
        choices,
        required_flags: string_list(scene_id, obj, "requiredFlags")?,
        required_items: string_list(scene_id, obj, "requiredItems")?,
        ending: normalize_ending(scene_id, obj.get("ending"))?,
    })
}

/// Verify that every choice and goto edge of a scene points at a declared
/// scene id.
///
/// # Errors
///
/// Returns [`ContentError::BrokenLink`] naming the offending scene.
pub fn validate_links(manifest: &Manifest, scene: &SceneData) -> Result<(), ContentError> {
    for target in scene_edges(scene) {
        if !manifest.declares(&target) {
            return Err(ContentError::BrokenLink {
                scene_id: scene.id.clone(),
                target,
            });
        }
    }
    Ok(())
}

/// Normalize a raw conditions value: absent means none, a single object is
/// wrapped into a one-element list, an array is taken as-is.
pub fn normalize_conditions(
    scene_id: &str,
    raw: Option<&Value>,
) -> Result<Vec<Condition>, ContentError> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| normalize_condition(scene_id, entry))
            .collect(),
        Some(single @ Value::Object(_)) => Ok(vec![normalize_condition(scene_id, single)?]),
        Some(_) => Err(ContentError::malformed(
            scene_id,
            "'conditions' is neither an object nor an array",
        )),
    }
}

fn normalize_condition(scene_id: &str, raw: &Value) -> Result<Condition, ContentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ContentError::malformed(scene_id, "condition is not a JSON object"))?;
    let raw_type = opt_str(obj, "type")
        .ok_or_else(|| ContentError::malformed(scene_id, "condition has no 'type'"))?;
    let attempt = obj
        .get("attempt")
        .or_else(|| obj.get("attemptable"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let kind = match canonical_token(&raw_type).as_str() {
        "stat" | "stat_check" | "stat_threshold" | "check" => {
            let stat = required_str(scene_id, obj, &["stat", "id"], "stat condition")?;
            let op = opt_str(obj, "op")
                .or_else(|| opt_str(obj, "operator"))
                .map_or(Ok(CmpOp::Gte), |token| {
                    token.parse::<CmpOp>().map_err(|()| {
                        ContentError::malformed(
                            scene_id,
                            format!("unknown stat operator '{token}'"),
                        )
                    })
                })?;
            let value = number(scene_id, obj, &["value", "threshold"], "stat condition")?;
            retag_faction(&stat, op, value)
        }
        "flag" | "has_flag" | "flag_set" => ConditionKind::Flag {
            flag: required_str(scene_id, obj, &["flag", "name"], "flag condition")?,
        },
        "item" | "has_item" | "item_check" | "inventory" | "item_owned" => ConditionKind::Item {
            item: required_str(scene_id, obj, &["item", "id"], "item condition")?,
            count: integer_or(obj, &["count", "min", "min_count", "minCount"], 1),
        },
        "faction" | "faction_level" | "reputation" => ConditionKind::Faction {
            faction: required_str(scene_id, obj, &["faction", "id"], "faction condition")?,
            level: integer_or(obj, &["level", "min", "threshold"], 0),
        },
        "and" | "all" | "all_of" => ConditionKind::All {
            conditions: normalize_conditions(scene_id, obj.get("conditions"))?,
        },
        "or" | "any" | "any_of" => ConditionKind::Any {
            conditions: normalize_conditions(scene_id, obj.get("conditions"))?,
        },
        "not" => ConditionKind::Not {
            conditions: normalize_conditions(scene_id, obj.get("conditions"))?,
        },
        _ => ConditionKind::Other { kind: raw_type },
    };

    Ok(Condition { kind, attempt })
}

/// The disambiguation heuristic: a stat-threshold condition whose id names a
/// known faction is really a faction check. Runs before evaluation since the
/// runtime treats the two differently.
fn retag_faction(stat: &str, op: CmpOp, value: f64) -> ConditionKind {
    if FACTION_IDS.contains(&stat) {
        debug!("re-tagging stat condition '{stat}' as a faction check");
        ConditionKind::Faction {
            faction: stat.to_string(),
            level: value as i64,
        }
    } else {
        ConditionKind::Stat {
            stat: stat.to_string(),
            op,
            value,
        }
    }
}

fn normalize_effects(scene_id: &str, raw: Option<&Value>) -> Result<Vec<Effect>, ContentError> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| normalize_effect(scene_id, entry))
            .collect(),
        Some(single @ Value::Object(_)) => Ok(vec![normalize_effect(scene_id, single)?]),
        Some(_) => Err(ContentError::malformed(
            scene_id,
            "'effects' is neither an object nor an array",
        )),
    }
}

fn normalize_effect(scene_id: &str, raw: &Value) -> Result<Effect, ContentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ContentError::malformed(scene_id, "effect is not a JSON object"))?;
    let raw_type = opt_str(obj, "type")
        .ok_or_else(|| ContentError::malformed(scene_id, "effect has no 'type'"))?;

    let effect = match canonical_token(&raw_type).as_str() {
        "set_stat" => Effect::SetStat {
            stat: required_str(scene_id, obj, &["stat", "id"], "set-stat effect")?,
            value: number(scene_id, obj, &["value"], "set-stat effect")?,
        },
        "modify_stat" | "adjust_stat" => Effect::ModifyStat {
            stat: required_str(scene_id, obj, &["stat", "id"], "modify-stat effect")?,
            delta: number(scene_id, obj, &["delta", "amount", "value"], "modify-stat effect")?,
        },
        "set_flag" => Effect::SetFlag {
            flag: required_str(scene_id, obj, &["flag", "name"], "set-flag effect")?,
        },
        "clear_flag" | "unset_flag" => Effect::ClearFlag {
            flag: required_str(scene_id, obj, &["flag", "name"], "clear-flag effect")?,
        },
        "add_item" | "give_item" => Effect::AddItem {
            item: required_str(scene_id, obj, &["item", "id"], "add-item effect")?,
            count: integer_or(obj, &["count", "amount"], 1),
        },
        "remove_item" | "take_item" => Effect::RemoveItem {
            item: required_str(scene_id, obj, &["item", "id"], "remove-item effect")?,
            count: integer_or(obj, &["count", "amount"], 1),
        },
        "goto" | "go_to" | "jump" => Effect::Goto {
            scene: required_str(scene_id, obj, &["scene", "to", "target"], "goto effect")?,
        },
        "modify_faction" | "adjust_faction" => Effect::ModifyFaction {
            faction: required_str(scene_id, obj, &["faction", "id"], "modify-faction effect")?,
            delta: integer_or(obj, &["delta", "amount", "value"], 0),
        },
        _ => Effect::Other { kind: raw_type },
    };
    Ok(effect)
}

fn normalize_choice(scene_id: &str, raw: &Value) -> Result<Choice, ContentError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| ContentError::malformed(scene_id, "choice is not a JSON object"))?;
    let label = opt_str(obj, "label")
        .ok_or_else(|| ContentError::malformed(scene_id, "choice has no 'label'"))?;

    let invalid = |message: &str| ContentError::InvalidChoice {
        scene_id: scene_id.to_string(),
        label: label.clone(),
        message: message.to_string(),
    };

    let to = opt_str(obj, "to");
    let on_success = obj.get("onSuccess").or_else(|| obj.get("on_success"));
    let on_failure = obj.get("onFailure").or_else(|| obj.get("on_failure"));

    // Exclusivity invariant: a direct target XOR an attempt pair.
    let target = match (to, on_success, on_failure) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            return Err(invalid("has both a direct 'to' and an attempt pair"));
        }
        (Some(to), None, None) => ChoiceTarget::Simple { to },
        (None, Some(success), Some(failure)) => ChoiceTarget::Attempt {
            on_success: normalize_branch(scene_id, success)?,
            on_failure: normalize_branch(scene_id, failure)?,
        },
        (None, Some(_), None) | (None, None, Some(_)) => {
            return Err(invalid("attempt pair is missing one of its branches"));
        }
        (None, None, None) => return Err(invalid("has neither 'to' nor an attempt pair")),
    };

    Ok(Choice {
        label,
        target,
        conditions: normalize_conditions(
            scene_id,
            obj.get("conditions").or_else(|| obj.get("condition")),
        )?,
        effects: normalize_effects(scene_id, obj.get("effects"))?,
        disabled_hint: opt_str(obj, "disabledHint").or_else(|| opt_str(obj, "disabled_hint")),
    })
}

fn normalize_branch(scene_id: &str, raw: &Value) -> Result<Branch, ContentError> {
    match raw {
        Value::String(to) => Ok(Branch::to(to.clone())),
        Value::Object(obj) => Ok(Branch {
            to: opt_str(obj, "to")
                .ok_or_else(|| ContentError::malformed(scene_id, "branch has no 'to'"))?,
            effects: normalize_effects(scene_id, obj.get("effects"))?,
        }),
        _ => Err(ContentError::malformed(
            scene_id,
            "branch is neither a scene id nor an object",
        )),
    }
}

fn normalize_text(scene_id: &str, raw: Option<&Value>) -> Result<SceneText, ContentError> {
    match raw {
        None | Some(Value::Null) => Ok(SceneText::default()),
        Some(Value::String(text)) => Ok(SceneText::Plain(text.clone())),
        Some(Value::Object(obj)) => {
            let paragraphs = match obj.get("paragraphs") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(entries)) => entries
                    .iter()
                    .map(|entry| {
                        entry.as_str().map(ToString::to_string).ok_or_else(|| {
                            ContentError::malformed(scene_id, "text paragraph is not a string")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(ContentError::malformed(
                        scene_id,
                        "'paragraphs' is not an array",
                    ));
                }
            };
            Ok(SceneText::Located {
                location: opt_str(obj, "location").unwrap_or_default(),
                paragraphs,
            })
        }
        Some(_) => Err(ContentError::malformed(
            scene_id,
            "'text' is neither a string nor an object",
        )),
    }
}

fn normalize_ending(
    scene_id: &str,
    raw: Option<&Value>,
) -> Result<Option<EndingInfo>, ContentError> {
    match raw {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(EndingInfo::default())),
        Some(Value::Object(obj)) => Ok(Some(EndingInfo {
            kind: opt_str(obj, "type")
                .or_else(|| opt_str(obj, "kind"))
                .or_else(|| opt_str(obj, "id")),
        })),
        Some(_) => Err(ContentError::malformed(
            scene_id,
            "'ending' is neither a boolean nor an object",
        )),
    }
}

/// Lowercase a type token and fold `-`, space, and camelCase humps into `_`
/// so every authored spelling lands on one canonical form.
fn canonical_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch == '-' || ch == ' ' {
            out.push('_');
            prev_lower = false;
        } else if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(ToString::to_string)
}

fn required_str(
    scene_id: &str,
    obj: &Map<String, Value>,
    keys: &[&str],
    context: &str,
) -> Result<String, ContentError> {
    keys.iter().find_map(|key| opt_str(obj, key)).ok_or_else(|| {
        ContentError::malformed(scene_id, format!("{context} is missing '{}'", keys[0]))
    })
}

fn number(
    scene_id: &str,
    obj: &Map<String, Value>,
    keys: &[&str],
    context: &str,
) -> Result<f64, ContentError> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_f64))
        .ok_or_else(|| {
            ContentError::malformed(
                scene_id,
                format!("{context} is missing numeric '{}'", keys[0]),
            )
        })
}

fn integer_or(obj: &Map<String, Value>, keys: &[&str], default: i64) -> i64 {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_i64))
        .unwrap_or(default)
}

fn string_list(
    scene_id: &str,
    obj: &Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, ContentError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry.as_str().map(ToString::to_string).ok_or_else(|| {
                    ContentError::malformed(scene_id, format!("'{key}' entry is not a string"))
                })
            })
            .collect(),
        Some(_) => Err(ContentError::malformed(
            scene_id,
            format!("'{key}' is not an array"),
        )),
    }
}

/// Cache of parsed, link-validated scenes keyed by scene id.
#[derive(Default)]
pub struct SceneCache {
    parsed: HashMap<String, SceneData>,
}

impl SceneCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look at an already-loaded scene without touching the source.
    #[must_use]
    pub fn peek(&self, scene_id: &str) -> Option<&SceneData> {
        self.parsed.get(scene_id)
    }

    /// Fetch a scene, normalizing and link-validating it on first load.
    ///
    /// # Errors
    ///
    /// Fails fast on undeclared ids, source failures, malformed documents,
    /// and broken links.
    pub fn get_or_load<C: ContentSource>(
        &mut self,
        source: &C,
        manifest: &Manifest,
        scene_id: &str,
    ) -> Result<&SceneData, ContentError> {
        if !manifest.declares(scene_id) {
            return Err(ContentError::Missing {
                scene_id: scene_id.to_string(),
            });
        }
        match self.parsed.entry(scene_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let raw = source
                    .load_scene(scene_id)
                    .map_err(|err| ContentError::source(scene_id, &err))?;
                let scene = normalize_scene(scene_id, &raw)?;
                validate_links(manifest, &scene)?;
                Ok(entry.insert(scene))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest_with(ids: &[&str]) -> Manifest {
        let index: serde_json::Map<String, Value> =
            ids.iter().map(|id| ((*id).to_string(), json!({}))).collect();
        normalize_manifest(&json!({
            "contentVersion": "1.0.0",
            "startingScene": ids[0],
            "sceneIndex": index,
        }))
        .unwrap()
    }

    #[test]
    fn canonical_token_folds_spellings() {
        assert_eq!(canonical_token("set-flag"), "set_flag");
        assert_eq!(canonical_token("setFlag"), "set_flag");
        assert_eq!(canonical_token("Set Flag"), "set_flag");
        assert_eq!(canonical_token("MODIFY-STAT"), "modify_stat");
    }

    #[test]
    fn condition_aliases_map_to_canonical_kinds() {
        let item = normalize_condition("sc", &json!({"type": "hasItem", "item": "booth_key"}))
            .unwrap();
        assert_eq!(
            item.kind,
            ConditionKind::Item {
                item: "booth_key".to_string(),
                count: 1
            }
        );

        let flag = normalize_condition("sc", &json!({"type": "flag-set", "flag": "cue_called"}))
            .unwrap();
        assert_eq!(
            flag.kind,
            ConditionKind::Flag {
                flag: "cue_called".to_string()
            }
        );
    }

    #[test]
    fn single_condition_object_is_wrapped_into_a_list() {
        let conditions = normalize_conditions(
            "sc",
            Some(&json!({"type": "flag", "flag": "path_direct"})),
        )
        .unwrap();
        assert_eq!(conditions.len(), 1);
    }

    #[test]
    fn stat_threshold_naming_a_faction_is_retagged() {
        let condition = normalize_condition(
            "sc",
            &json!({"type": "stat-threshold", "stat": "critics", "op": "gte", "value": 6}),
        )
        .unwrap();
        assert_eq!(
            condition.kind,
            ConditionKind::Faction {
                faction: "critics".to_string(),
                level: 6
            }
        );

        let plain = normalize_condition(
            "sc",
            &json!({"type": "stat-threshold", "stat": "courage", "value": 6}),
        )
        .unwrap();
        assert!(matches!(plain.kind, ConditionKind::Stat { .. }));
    }

    #[test]
    fn attempt_marker_survives_normalization() {
        let condition = normalize_condition(
            "sc",
            &json!({"type": "stat", "stat": "courage", "op": "gte", "value": 5, "attemptable": true}),
        )
        .unwrap();
        assert!(condition.attempt);
    }

    #[test]
    fn unknown_condition_type_is_preserved_as_other() {
        let condition =
            normalize_condition("sc", &json!({"type": "moon-phase", "phase": "full"})).unwrap();
        assert_eq!(
            condition.kind,
            ConditionKind::Other {
                kind: "moon-phase".to_string()
            }
        );
    }

    #[test]
    fn effect_spellings_normalize_to_one_convention() {
        let effect = normalize_effect(
            "sc",
            &json!({"type": "adjustStat", "stat": "courage", "amount": 2}),
        )
        .unwrap();
        assert_eq!(
            effect,
            Effect::ModifyStat {
                stat: "courage".to_string(),
                delta: 2.0
            }
        );

        let unknown = normalize_effect("sc", &json!({"type": "play-cue", "cue": 7})).unwrap();
        assert_eq!(
            unknown,
            Effect::Other {
                kind: "play-cue".to_string()
            }
        );
    }

    #[test]
    fn choice_with_both_shapes_is_rejected() {
        let raw = json!({
            "label": "Sneak in",
            "to": "sc_1_0_002",
            "onSuccess": {"to": "sc_1_0_003"},
            "onFailure": {"to": "sc_1_0_004"}
        });
        let err = normalize_choice("sc_1_0_001", &raw).unwrap_err();
        assert!(matches!(err, ContentError::InvalidChoice { .. }));
    }

    #[test]
    fn choice_without_any_target_is_rejected() {
        let err = normalize_choice("sc_1_0_001", &json!({"label": "Wait"})).unwrap_err();
        assert!(matches!(err, ContentError::InvalidChoice { .. }));
    }

    #[test]
    fn attempt_pair_with_branch_effects_normalizes() {
        let raw = json!({
            "label": "Step into the spotlight",
            "conditions": {"type": "stat", "stat": "courage", "op": "gte", "value": 5, "attempt": true},
            "onSuccess": {"to": "sc_2_0_001", "effects": [{"type": "set-flag", "flag": "ovation"}]},
            "onFailure": "sc_2_0_002"
        });
        let choice = normalize_choice("sc_1_0_001", &raw).unwrap();
        assert!(choice.is_attempt());
        match &choice.target {
            ChoiceTarget::Attempt {
                on_success,
                on_failure,
            } => {
                assert_eq!(on_success.to, "sc_2_0_001");
                assert_eq!(on_success.effects.len(), 1);
                assert_eq!(on_failure.to, "sc_2_0_002");
                assert!(on_failure.effects.is_empty());
            }
            ChoiceTarget::Simple { .. } => panic!("expected attempt pair"),
        }
    }

    #[test]
    fn scene_text_variants_parse() {
        let plain = normalize_scene("sc", &json!({"text": "A bare stage."})).unwrap();
        assert_eq!(plain.text, SceneText::Plain("A bare stage.".to_string()));

        let located = normalize_scene(
            "sc",
            &json!({"text": {"location": "The wings", "paragraphs": ["Dust.", "Rope."]}}),
        )
        .unwrap();
        assert_eq!(located.text.flattened(), "Dust.\n\nRope.");
    }

    #[test]
    fn ending_marker_boolean_and_typed() {
        let plain = normalize_scene("sc", &json!({"ending": true})).unwrap();
        assert!(plain.is_ending());
        let typed = normalize_scene("sc", &json!({"ending": {"type": "standing_ovation"}}))
            .unwrap();
        assert_eq!(
            typed.ending.unwrap().kind.as_deref(),
            Some("standing_ovation")
        );
        let not_ending = normalize_scene("sc", &json!({"ending": false})).unwrap();
        assert!(!not_ending.is_ending());
    }

    #[test]
    fn manifest_requires_declared_starting_scene() {
        let err = normalize_manifest(&json!({
            "contentVersion": "1.0.0",
            "startingScene": "sc_missing",
            "sceneIndex": {"sc_1_0_001": {}}
        }))
        .unwrap_err();
        assert!(matches!(err, ContentError::Manifest { .. }));
    }

    #[test]
    fn broken_links_fail_fast_with_scene_id() {
        let manifest = manifest_with(&["sc_1_0_001"]);
        let scene = normalize_scene(
            "sc_1_0_001",
            &json!({
                "choices": [{"label": "Leave", "to": "sc_9_9_999"}]
            }),
        )
        .unwrap();
        let err = validate_links(&manifest, &scene).unwrap_err();
        assert_eq!(
            err,
            ContentError::BrokenLink {
                scene_id: "sc_1_0_001".to_string(),
                target: "sc_9_9_999".to_string()
            }
        );
    }

    #[test]
    fn goto_targets_are_link_checked_too() {
        let manifest = manifest_with(&["sc_1_0_001"]);
        let scene = normalize_scene(
            "sc_1_0_001",
            &json!({
                "effects": [{"type": "goto", "scene": "sc_0_0_000"}]
            }),
        )
        .unwrap();
        assert!(validate_links(&manifest, &scene).is_err());
    }
}
