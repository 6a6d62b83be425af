//! End-to-end playthrough coverage over an in-memory content set.

use greenroom_engine::{
    ChoiceStatus, Engine, EngineError, StaticContent,
};
use serde_json::{json, Value};

fn manifest() -> Value {
    json!({
        "contentVersion": "1.2.0",
        "startingScene": "sc_1_0_001",
        "sceneIndex": {
            "sc_1_0_001": { "title": "Stage Door", "act": 1 },
            "sc_1_0_002": { "title": "The Wings", "act": 1 },
            "sc_1_0_003": { "title": "Lighting Booth", "act": 1 },
            "sc_1_0_004": { "title": "Prop Loft", "act": 1 },
            "sc_2_0_001": { "title": "Ovation", "act": 2 },
            "sc_2_0_002": { "title": "Frozen", "act": 2 }
        },
        "hubs": ["sc_1_0_001"],
        "endings": [
            { "id": "standing_ovation", "scene": "sc_2_0_001" }
        ]
    })
}

fn content() -> StaticContent {
    StaticContent::new(manifest())
        .with_scene(
            "sc_1_0_001",
            json!({
                "title": "Stage Door",
                "text": "Rosin, dust, and the hum of the house beyond the curtain.",
                "choices": [
                    {
                        "label": "Go to the wings",
                        "to": "sc_1_0_002",
                        "effects": [{"type": "set-flag", "flag": "path_direct"}]
                    },
                    {
                        "label": "Unlock the lighting booth",
                        "to": "sc_1_0_003",
                        "conditions": {"type": "has-item", "item": "booth_key"},
                        "disabledHint": "The booth is locked."
                    },
                    {
                        "label": "Search the prop table",
                        "to": "sc_1_0_001",
                        "effects": [{"type": "add-item", "item": "booth_key"}]
                    },
                    {
                        "label": "Step into the spotlight",
                        "conditions": {
                            "type": "stat", "stat": "courage",
                            "op": "gte", "value": 5, "attempt": true
                        },
                        "onSuccess": {
                            "to": "sc_2_0_001",
                            "effects": [{"type": "modify-stat", "stat": "courage", "delta": 1}]
                        },
                        "onFailure": {
                            "to": "sc_2_0_002",
                            "effects": [{"type": "set-flag", "flag": "froze_on_stage"}]
                        }
                    }
                ]
            }),
        )
        .with_scene(
            "sc_1_0_002",
            json!({
                "title": "The Wings",
                "effects": [{"type": "modify-faction", "faction": "stagehands", "delta": 1}],
                "choices": [
                    {"label": "Back to the stage door", "to": "sc_1_0_001"},
                    {
                        "label": "Climb to the prop loft",
                        "to": "sc_1_0_004",
                        "conditions": {"type": "flag", "flag": "path_direct"}
                    }
                ]
            }),
        )
        .with_scene("sc_1_0_003", json!({"title": "Lighting Booth", "choices": []}))
        .with_scene("sc_1_0_004", json!({"title": "Prop Loft", "choices": []}))
        .with_scene("sc_2_0_001", json!({"title": "Ovation", "ending": {"type": "standing_ovation"}}))
        .with_scene("sc_2_0_002", json!({"title": "Frozen", "choices": []}))
}

fn engine() -> Engine<StaticContent> {
    let mut engine = Engine::new(content());
    engine.initialize().expect("content is well formed");
    engine
}

#[test]
fn direct_path_records_flag_and_history() {
    let mut engine = engine();
    let choices = engine.available_choices().unwrap();
    let index = choices
        .iter()
        .find(|c| c.label == "Go to the wings")
        .unwrap()
        .index;
    engine.make_choice(index).unwrap();

    let state = engine.state();
    assert_eq!(state.current_scene_id, "sc_1_0_002");
    assert!(state.flags.contains("path_direct"));
    assert_eq!(state.visited_count("sc_1_0_001"), 1);
    assert_eq!(state.visited_count("sc_1_0_002"), 1);
    // Entry effects of the destination ran too.
    assert_eq!(state.factions["stagehands"], 1);
}

#[test]
fn item_gate_opens_in_place() {
    let mut engine = engine();
    let before = engine.available_choices().unwrap();
    assert!(matches!(before[1].status, ChoiceStatus::Disabled { .. }));

    engine.make_choice(2).unwrap();
    let after = engine.available_choices().unwrap();
    assert_eq!(after[1].status, ChoiceStatus::Enabled);

    engine.make_choice(1).unwrap();
    assert_eq!(engine.state().current_scene_id, "sc_1_0_003");
}

#[test]
fn attempt_applies_only_the_taken_branch() {
    let mut engine = engine();
    engine.with_state_mut(|state| {
        state.stats.insert("courage".to_string(), 7.0);
    });
    engine.make_choice(3).unwrap();
    assert_eq!(engine.state().current_scene_id, "sc_2_0_001");
    assert_eq!(engine.state().stats["courage"], 8.0);
    assert!(!engine.state().flags.contains("froze_on_stage"));
    assert!(engine.current_scene().unwrap().is_ending());
}

#[test]
fn two_engines_with_same_inputs_agree() {
    let run = |courage: f64| {
        let mut engine = engine();
        engine.with_state_mut(|state| {
            state.stats.insert("courage".to_string(), courage);
        });
        engine.make_choice(0).unwrap();
        engine.make_choice(0).unwrap();
        engine.make_choice(3).unwrap();
        let state = engine.state().clone();
        (state.current_scene_id, state.flags, state.stats, state.factions)
    };
    assert_eq!(run(6.0), run(6.0));
    assert_eq!(run(2.0), run(2.0));
    assert_ne!(run(6.0).0, run(2.0).0);
}

#[test]
fn save_blob_restores_a_mid_run_session() {
    let mut engine = engine();
    engine.make_choice(0).unwrap();
    engine.make_choice(0).unwrap();
    let blob = engine.save_to_string().unwrap();
    let expected = engine.state().clone();

    let mut restored = engine_with_fresh_content();
    restored.load_from_string(&blob).unwrap();
    let state = restored.state();
    assert_eq!(state.current_scene_id, expected.current_scene_id);
    assert_eq!(state.flags, expected.flags);
    assert_eq!(state.factions, expected.factions);
    assert_eq!(
        state.visited_count("sc_1_0_001"),
        expected.visited_count("sc_1_0_001")
    );
    // Loading re-fetches the scene without replaying its entry effects.
    assert_eq!(state.factions["stagehands"], expected.factions["stagehands"]);
}

fn engine_with_fresh_content() -> Engine<StaticContent> {
    let mut engine = Engine::new(content());
    engine.initialize().expect("content is well formed");
    engine
}

#[test]
fn tampered_save_version_is_rejected() {
    let mut engine = engine();
    let blob = engine.save_to_string().unwrap();
    let mut value: Value = serde_json::from_str(&blob).unwrap();
    value["version"] = json!(99);
    let err = engine.load_from_string(&value.to_string()).unwrap_err();
    assert!(matches!(err, EngineError::Persist(_)));
}
