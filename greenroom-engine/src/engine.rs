//! The scene-transition orchestrator.
//!
//! The engine ties the loader, evaluator, and applier together: it owns the
//! single live [`GameState`], resolves choices, commits transitions, and
//! notifies subscribers synchronously after every mutation. It moves from
//! `Uninitialized` to `SceneLoaded` once and stays there; every later
//! operation either keeps it in `SceneLoaded` or fails without leaving it
//! half-applied.

use chrono::Utc;
use log::debug;
use serde_json::json;
use thiserror::Error;

use crate::condition::evaluate_all;
use crate::content::{ChoiceTarget, Manifest, SceneData};
use crate::effect::{apply_all, ChangeRecord, ChangeSet, RenderScope, Urgency};
use crate::normalize::{normalize_manifest, ContentError, SceneCache};
use crate::state::{GameState, PersistError};
use crate::ContentSource;

/// Bound on goto-redirect chains during a single transition so malformed
/// content cannot spin the orchestrator.
pub const MAX_GOTO_REDIRECTS: usize = 8;

/// Engine lifecycle: `Uninitialized` until the first scene load succeeds,
/// `SceneLoaded` forever after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Uninitialized,
    SceneLoaded,
}

/// Classification of one choice at presentation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceStatus {
    /// Conditions absent or satisfied; selecting it is allowed.
    Enabled,
    /// Attemptable: always selectable, destination decided at selection
    /// time. The presentation should display the underlying check, not
    /// hide the option.
    Risky,
    /// Gated and unmet. Selecting a disabled choice is an error, not a
    /// silent no-op.
    Disabled { hint: Option<String> },
}

impl ChoiceStatus {
    #[must_use]
    pub const fn selectable(&self) -> bool {
        !matches!(self, Self::Disabled { .. })
    }
}

/// One entry of the available-choices view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableChoice {
    pub index: usize,
    pub label: String,
    pub status: ChoiceStatus,
}

/// Orchestrator failures. Content and persistence errors pass through with
/// their own structure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not initialized")]
    NotInitialized,
    #[error("a state load is already in progress")]
    LoadInProgress,
    #[error("choice index {index} is out of range (scene has {len} choices)")]
    ChoiceOutOfRange { index: usize, len: usize },
    #[error("choice '{label}' is disabled")]
    ChoiceDisabled { label: String },
    #[error("save content version '{save}' does not match loaded content '{content}'")]
    ContentVersionMismatch { save: String, content: String },
    #[error("goto redirect chain exceeded {max} hops at scene '{scene_id}'")]
    RedirectLoop { scene_id: String, max: usize },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Handle returned by [`Engine::subscribe`], used to unsubscribe.
pub type SubscriberId = u64;

type Subscriber = Box<dyn FnMut(&ChangeRecord)>;

/// The narrative state machine. Each engine owns exactly one [`GameState`]
/// and one scene cache; there is no cross-instance shared state.
pub struct Engine<C: ContentSource> {
    source: C,
    manifest: Option<Manifest>,
    cache: SceneCache,
    state: GameState,
    phase: EnginePhase,
    load_in_progress: bool,
    pending_choice_label: Option<String>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_subscriber: SubscriberId,
}

impl<C: ContentSource> Engine<C> {
    /// Create an engine over a content source. No content is touched until
    /// [`Engine::initialize`].
    #[must_use]
    pub fn new(source: C) -> Self {
        Self {
            source,
            manifest: None,
            cache: SceneCache::new(),
            state: GameState::default(),
            phase: EnginePhase::Uninitialized,
            load_in_progress: false,
            pending_choice_label: None,
            subscribers: Vec::new(),
            next_subscriber: 0,
        }
    }

    /// Load the manifest, resolve the starting scene, and perform the
    /// initial scene load (applying its entry effects).
    ///
    /// # Errors
    ///
    /// Fails fast on manifest or starting-scene content errors; the engine
    /// stays `Uninitialized` in that case.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        let raw = self
            .source
            .load_manifest()
            .map_err(|err| ContentError::source("manifest", &err))?;
        let manifest = normalize_manifest(&raw)?;
        debug!(
            "initializing engine: content {} starting at '{}'",
            manifest.content_version, manifest.starting_scene
        );
        self.state = GameState::new(&manifest.content_version);
        self.state.timestamp = now_ms();
        let start = manifest.starting_scene.clone();
        self.manifest = Some(manifest);
        self.enter_scene(&start)?;
        self.phase = EnginePhase::SceneLoaded;
        Ok(())
    }

    #[must_use]
    pub const fn phase(&self) -> EnginePhase {
        self.phase
    }

    /// Read-only snapshot of the live state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub const fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// The currently loaded scene, if any.
    #[must_use]
    pub fn current_scene(&self) -> Option<&SceneData> {
        if self.phase == EnginePhase::Uninitialized {
            return None;
        }
        self.cache.peek(&self.state.current_scene_id)
    }

    /// Mutable access for programmatic setup (scripted tests, starting
    /// states). Bypasses change notification on purpose.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut self.state)
    }

    /// Load a scene by id: updates the current scene, records the visit,
    /// applies entry effects, and emits one change notification per effect.
    ///
    /// # Errors
    ///
    /// Fails on content errors or when called before initialization.
    pub fn load_scene(&mut self, scene_id: &str) -> Result<(), EngineError> {
        self.require_initialized()?;
        self.enter_scene(scene_id)
    }

    /// Direct jump bypassing condition checks. Engine-internal in spirit:
    /// used for programmatic transitions and scripted test setup.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Engine::load_scene`].
    pub fn transition_to(&mut self, scene_id: &str) -> Result<(), EngineError> {
        self.load_scene(scene_id)
    }

    /// Classify every choice of the current scene, in authored order.
    ///
    /// # Errors
    ///
    /// Fails when no scene is loaded.
    pub fn available_choices(&self) -> Result<Vec<AvailableChoice>, EngineError> {
        let scene = self.current_scene().ok_or(EngineError::NotInitialized)?;
        Ok(scene
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| AvailableChoice {
                index,
                label: choice.label.clone(),
                status: if choice.is_attempt() {
                    ChoiceStatus::Risky
                } else if evaluate_all(&choice.conditions, &self.state) {
                    ChoiceStatus::Enabled
                } else {
                    ChoiceStatus::Disabled {
                        hint: choice.disabled_hint.clone(),
                    }
                },
            })
            .collect())
    }

    /// Resolve and take a choice by index.
    ///
    /// Attemptable choices re-evaluate their condition at selection time and
    /// branch to the success or failure arm, applying only that branch's
    /// effects. Simple choices apply their own effects. Both record the
    /// choice label in history and then commit the transition.
    ///
    /// # Errors
    ///
    /// Fails on out-of-range indices, disabled choices, and content errors
    /// during the resulting transition.
    pub fn make_choice(&mut self, index: usize) -> Result<(), EngineError> {
        self.require_initialized()?;
        let scene = self
            .current_scene()
            .ok_or(EngineError::NotInitialized)?
            .clone();
        let choice = scene
            .choices
            .get(index)
            .ok_or(EngineError::ChoiceOutOfRange {
                index,
                len: scene.choices.len(),
            })?;

        if !choice.is_attempt() && !evaluate_all(&choice.conditions, &self.state) {
            return Err(EngineError::ChoiceDisabled {
                label: choice.label.clone(),
            });
        }

        let (effects, declared_target) = match &choice.target {
            ChoiceTarget::Simple { to } => (choice.effects.as_slice(), to),
            ChoiceTarget::Attempt {
                on_success,
                on_failure,
            } => {
                // Selection-time check decides the branch; only that
                // branch's effects run.
                let success = evaluate_all(&choice.conditions, &self.state);
                debug!(
                    "attempt '{}' resolved to {}",
                    choice.label,
                    if success { "success" } else { "failure" }
                );
                let branch = if success { on_success } else { on_failure };
                (branch.effects.as_slice(), &branch.to)
            }
        };

        let changes = apply_all(effects, &mut self.state);
        let redirect = last_goto(&changes);
        self.notify_all(&changes);
        self.pending_choice_label = Some(choice.label.clone());
        let target = redirect.as_deref().unwrap_or(declared_target).to_string();
        self.enter_scene(&target)
    }

    /// Serialize the live state to the versioned save blob, stamping the
    /// save time.
    ///
    /// # Errors
    ///
    /// Fails when uninitialized or when serialization fails.
    pub fn save_to_string(&self) -> Result<String, EngineError> {
        self.require_initialized()?;
        let mut snapshot = self.state.clone();
        snapshot.timestamp = now_ms();
        Ok(snapshot.save_to_string()?)
    }

    /// Parse a save blob and load it. See [`Engine::load_state`].
    ///
    /// # Errors
    ///
    /// Adds blob parse/version failures to the [`Engine::load_state`] set.
    pub fn load_from_string(&mut self, blob: &str) -> Result<(), EngineError> {
        let state = GameState::from_save_str(blob)?;
        self.load_state(state)
    }

    /// Wholesale-replace the live state from a save.
    ///
    /// The saved content version must equal the loaded content's version;
    /// mismatch is a hard error with no migration. On any failure while
    /// re-resolving the saved current scene the engine rolls back to the
    /// pre-load snapshot before re-raising, so it is never left
    /// half-loaded. A load-in-progress guard rejects reentrant loads.
    ///
    /// # Errors
    ///
    /// `LoadInProgress`, `ContentVersionMismatch`, or a content error from
    /// the scene re-resolution (after rollback).
    pub fn load_state(&mut self, new_state: GameState) -> Result<(), EngineError> {
        if self.load_in_progress {
            return Err(EngineError::LoadInProgress);
        }
        let manifest = self.manifest.as_ref().ok_or(EngineError::NotInitialized)?;
        if new_state.content_version != manifest.content_version {
            return Err(EngineError::ContentVersionMismatch {
                save: new_state.content_version,
                content: manifest.content_version.clone(),
            });
        }

        self.load_in_progress = true;
        let snapshot = (self.state.clone(), self.phase);
        let previous_scene = self.state.current_scene_id.clone();
        self.state = new_state;

        // Re-resolve the saved scene without re-applying its entry effects
        // or re-recording history; the save already reflects both.
        match self.refresh_current_scene() {
            Ok(()) => {
                self.phase = EnginePhase::SceneLoaded;
                self.load_in_progress = false;
                let record =
                    scene_change_record(&previous_scene, &self.state.current_scene_id.clone());
                self.notify(&record);
                Ok(())
            }
            Err(err) => {
                let (state, phase) = snapshot;
                self.state = state;
                self.phase = phase;
                self.load_in_progress = false;
                Err(err)
            }
        }
    }

    /// Register an observer. Observers are invoked synchronously, in
    /// subscription order, before the mutating call returns; they must not
    /// do long-running work inline.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ChangeRecord) + 'static) -> SubscriberId {
        let id = self.next_subscriber;
        self.next_subscriber += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Remove an observer; returns whether it was present.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn require_initialized(&self) -> Result<(), EngineError> {
        if self.phase == EnginePhase::Uninitialized {
            return Err(EngineError::NotInitialized);
        }
        Ok(())
    }

    /// Commit a transition: set the scene, record the visit, apply entry
    /// effects, and follow any goto redirect they declare.
    fn enter_scene(&mut self, scene_id: &str) -> Result<(), EngineError> {
        let mut target = scene_id.to_string();
        for _ in 0..=MAX_GOTO_REDIRECTS {
            let scene = self.fetch_scene(&target)?.clone();
            let previous =
                std::mem::replace(&mut self.state.current_scene_id, scene.id.clone());
            let label = self.pending_choice_label.take();
            self.state.record_visit(&scene.id, now_ms(), label);
            let record = scene_change_record(&previous, &scene.id);
            self.notify(&record);

            let changes = apply_all(&scene.effects, &mut self.state);
            let redirect = last_goto(&changes);
            self.notify_all(&changes);
            match redirect {
                Some(next) => {
                    debug!("entry effects of '{}' redirect to '{next}'", scene.id);
                    target = next;
                }
                None => return Ok(()),
            }
        }
        Err(EngineError::RedirectLoop {
            scene_id: target,
            max: MAX_GOTO_REDIRECTS,
        })
    }

    fn fetch_scene(&mut self, scene_id: &str) -> Result<&SceneData, EngineError> {
        let manifest = self.manifest.as_ref().ok_or(EngineError::NotInitialized)?;
        Ok(self.cache.get_or_load(&self.source, manifest, scene_id)?)
    }

    fn refresh_current_scene(&mut self) -> Result<(), EngineError> {
        let scene_id = self.state.current_scene_id.clone();
        self.fetch_scene(&scene_id).map(|_| ())
    }

    fn notify(&mut self, record: &ChangeRecord) {
        for (_, subscriber) in &mut self.subscribers {
            subscriber(record);
        }
    }

    fn notify_all(&mut self, records: &ChangeSet) {
        for record in records {
            self.notify(record);
        }
    }
}

fn scene_change_record(previous: &str, current: &str) -> ChangeRecord {
    ChangeRecord {
        path: "scene.current".to_string(),
        old: json!(previous),
        new: json!(current),
        scope: RenderScope::Scene,
        urgency: Urgency::Normal,
    }
}

fn last_goto(changes: &ChangeSet) -> Option<String> {
    changes
        .iter()
        .rev()
        .find_map(|record| record.goto_target().map(ToString::to_string))
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticContent;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn manifest(ids: &[&str]) -> Value {
        let index: serde_json::Map<String, Value> =
            ids.iter().map(|id| ((*id).to_string(), json!({}))).collect();
        json!({
            "contentVersion": "1.2.0",
            "startingScene": ids[0],
            "sceneIndex": index,
        })
    }

    fn backstage_content() -> StaticContent {
        StaticContent::new(manifest(&[
            "sc_1_0_001",
            "sc_1_0_002",
            "sc_1_0_003",
            "sc_2_0_001",
            "sc_2_0_002",
        ]))
        .with_scene(
            "sc_1_0_001",
            json!({
                "title": "Stage Door",
                "text": "The corridor smells of rosin and dust.",
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
                            "type": "stat", "stat": "courage", "op": "gte",
                            "value": 5, "attempt": true
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
        .with_scene("sc_1_0_002", json!({"title": "The Wings", "choices": []}))
        .with_scene("sc_1_0_003", json!({"title": "Lighting Booth", "choices": []}))
        .with_scene("sc_2_0_001", json!({"title": "Ovation", "ending": true}))
        .with_scene("sc_2_0_002", json!({"title": "Frozen", "choices": []}))
    }

    fn initialized_engine() -> Engine<StaticContent> {
        let mut engine = Engine::new(backstage_content());
        engine.initialize().unwrap();
        engine
    }

    #[test]
    fn initialize_loads_starting_scene_and_records_visit() {
        let engine = initialized_engine();
        assert_eq!(engine.phase(), EnginePhase::SceneLoaded);
        assert_eq!(engine.state().current_scene_id, "sc_1_0_001");
        assert_eq!(engine.state().visited_count("sc_1_0_001"), 1);
        assert_eq!(engine.current_scene().unwrap().title, "Stage Door");
    }

    #[test]
    fn operations_before_initialize_fail() {
        let mut engine = Engine::new(backstage_content());
        assert!(matches!(
            engine.make_choice(0),
            Err(EngineError::NotInitialized)
        ));
        assert!(matches!(
            engine.available_choices(),
            Err(EngineError::NotInitialized)
        ));
        assert!(engine.current_scene().is_none());
    }

    #[test]
    fn simple_choice_applies_effects_and_transitions() {
        let mut engine = initialized_engine();
        engine.make_choice(0).unwrap();
        let state = engine.state();
        assert_eq!(state.current_scene_id, "sc_1_0_002");
        assert!(state.flags.contains("path_direct"));
        assert_eq!(state.visited_count("sc_1_0_001"), 1);
        assert_eq!(state.visited_count("sc_1_0_002"), 1);
        let entry = state
            .history
            .iter()
            .find(|e| e.scene_id == "sc_1_0_002")
            .unwrap();
        assert_eq!(entry.choice_label.as_deref(), Some("Go to the wings"));
    }

    #[test]
    fn gated_choice_enables_without_scene_reload() {
        let mut engine = initialized_engine();
        let before = engine.available_choices().unwrap();
        assert_eq!(
            before[1].status,
            ChoiceStatus::Disabled {
                hint: Some("The booth is locked.".to_string())
            }
        );

        // Self-loop choice grants the key; no fresh scene content needed.
        engine.make_choice(2).unwrap();
        let after = engine.available_choices().unwrap();
        assert_eq!(after[1].status, ChoiceStatus::Enabled);
        assert_eq!(engine.state().visited_count("sc_1_0_001"), 2);
    }

    #[test]
    fn selecting_a_disabled_choice_is_an_error() {
        let mut engine = initialized_engine();
        let err = engine.make_choice(1).unwrap_err();
        assert!(matches!(err, EngineError::ChoiceDisabled { .. }));
        // The failed selection must not have moved anything.
        assert_eq!(engine.state().current_scene_id, "sc_1_0_001");
    }

    #[test]
    fn out_of_range_choice_is_an_error() {
        let mut engine = initialized_engine();
        assert!(matches!(
            engine.make_choice(9),
            Err(EngineError::ChoiceOutOfRange { index: 9, len: 4 })
        ));
    }

    #[test]
    fn attempt_choice_branches_on_selection_time_check() {
        let mut engine = initialized_engine();
        engine.with_state_mut(|state| {
            state.stats.insert("courage".to_string(), 5.0);
        });
        engine.make_choice(3).unwrap();
        assert_eq!(engine.state().current_scene_id, "sc_2_0_001");
        assert_eq!(engine.state().stats["courage"], 6.0);
        assert!(!engine.state().flags.contains("froze_on_stage"));

        let mut engine = initialized_engine();
        engine.with_state_mut(|state| {
            state.stats.insert("courage".to_string(), 3.0);
        });
        engine.make_choice(3).unwrap();
        assert_eq!(engine.state().current_scene_id, "sc_2_0_002");
        assert!(engine.state().flags.contains("froze_on_stage"));
        // Only the taken branch's effects ran.
        assert_eq!(engine.state().stats["courage"], 3.0);
    }

    #[test]
    fn attempt_choice_is_always_risky_and_selectable() {
        let mut engine = initialized_engine();
        let choices = engine.available_choices().unwrap();
        assert_eq!(choices[3].status, ChoiceStatus::Risky);
        assert!(choices[3].status.selectable());
        // Selectable even though courage is unset (0 < 5): routes to failure.
        engine.make_choice(3).unwrap();
        assert_eq!(engine.state().current_scene_id, "sc_2_0_002");
    }

    #[test]
    fn entry_goto_redirects_transition() {
        let source = StaticContent::new(manifest(&["sc_a", "sc_b", "sc_c"]))
            .with_scene(
                "sc_a",
                json!({"choices": [{"label": "Onward", "to": "sc_b"}]}),
            )
            .with_scene(
                "sc_b",
                json!({
                    "effects": [
                        {"type": "set-flag", "flag": "passed_through"},
                        {"type": "goto", "scene": "sc_c"}
                    ]
                }),
            )
            .with_scene("sc_c", json!({"title": "Final"}));
        let mut engine = Engine::new(source);
        engine.initialize().unwrap();
        engine.make_choice(0).unwrap();
        assert_eq!(engine.state().current_scene_id, "sc_c");
        assert!(engine.state().flags.contains("passed_through"));
        // The pass-through still counts as a visit.
        assert_eq!(engine.state().visited_count("sc_b"), 1);
    }

    #[test]
    fn unbounded_goto_chain_errors_instead_of_spinning() {
        let source = StaticContent::new(manifest(&["sc_a", "sc_b"]))
            .with_scene(
                "sc_a",
                json!({"effects": [{"type": "goto", "scene": "sc_b"}]}),
            )
            .with_scene(
                "sc_b",
                json!({"effects": [{"type": "goto", "scene": "sc_a"}]}),
            );
        let mut engine = Engine::new(source);
        let err = engine.initialize().unwrap_err();
        assert!(matches!(err, EngineError::RedirectLoop { .. }));
    }

    #[test]
    fn save_load_round_trips_state() {
        let mut engine = initialized_engine();
        engine.make_choice(0).unwrap();
        let blob = engine.save_to_string().unwrap();
        let saved = engine.state().clone();

        let mut fresh = initialized_engine();
        fresh.load_from_string(&blob).unwrap();
        let loaded = fresh.state();
        assert_eq!(loaded.current_scene_id, saved.current_scene_id);
        assert_eq!(loaded.flags, saved.flags);
        assert_eq!(loaded.inventory, saved.inventory);
        assert_eq!(loaded.stats, saved.stats);
        assert_eq!(loaded.history.len(), saved.history.len());
        assert_eq!(
            loaded.visited_count("sc_1_0_001"),
            saved.visited_count("sc_1_0_001")
        );
    }

    #[test]
    fn load_rejects_content_version_mismatch() {
        let mut engine = initialized_engine();
        let mut foreign = engine.state().clone();
        foreign.content_version = "9.9.9".to_string();
        let err = engine.load_state(foreign).unwrap_err();
        assert!(matches!(err, EngineError::ContentVersionMismatch { .. }));
    }

    #[test]
    fn failed_load_rolls_back_to_previous_state() {
        let mut engine = initialized_engine();
        engine.make_choice(0).unwrap();
        let before = engine.state().clone();

        let mut broken = before.clone();
        // Declared nowhere: scene re-resolution must fail.
        broken.current_scene_id = "sc_9_9_999".to_string();
        let err = engine.load_state(broken).unwrap_err();
        assert!(matches!(err, EngineError::Content(_)));
        assert_eq!(engine.state(), &before);
        assert_eq!(engine.phase(), EnginePhase::SceneLoaded);
    }

    #[test]
    fn reentrant_load_is_rejected() {
        let mut engine = initialized_engine();
        engine.load_in_progress = true;
        let err = engine.load_state(engine.state.clone()).unwrap_err();
        assert!(matches!(err, EngineError::LoadInProgress));
        engine.load_in_progress = false;
        engine.load_state(engine.state.clone()).unwrap();
    }

    #[test]
    fn subscribers_are_notified_in_subscription_order() {
        let mut engine = initialized_engine();
        let seen: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        engine.subscribe(move |record| {
            first.borrow_mut().push(format!("first:{}", record.path));
        });
        let second = Rc::clone(&seen);
        engine.subscribe(move |record| {
            second.borrow_mut().push(format!("second:{}", record.path));
        });

        engine.make_choice(0).unwrap();
        let log = seen.borrow();
        let flag_positions: Vec<usize> = log
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.ends_with("flags.path_direct"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flag_positions.len(), 2);
        assert!(log[flag_positions[0]].starts_with("first:"));
        assert!(log[flag_positions[1]].starts_with("second:"));
        // The transition itself is also announced.
        assert!(log.iter().any(|entry| entry.contains("scene.current")));
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let mut engine = initialized_engine();
        let count = Rc::new(RefCell::new(0_usize));
        let counter = Rc::clone(&count);
        let id = engine.subscribe(move |_| {
            *counter.borrow_mut() += 1;
        });
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.make_choice(0).unwrap();
        assert_eq!(*count.borrow(), 0);
    }
}
