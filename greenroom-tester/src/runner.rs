//! Scripted playthrough execution and softlock probing.

use colored::Colorize;
use greenroom_engine::{ChoiceStatus, ContentSource, Engine};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use crate::script::{Assertions, PlaythroughScript, SoftlockConfig, Step};

/// Why a run counts as stuck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoftlockKind {
    /// A non-ending scene with zero selectable choices.
    NoChoices { scene_id: String },
    /// One scene revisited past the configured threshold.
    RevisitThreshold { scene_id: String, visits: u32 },
    /// The progress signature has not changed for too many steps.
    ProgressThreshold { steps: u32 },
}

impl fmt::Display for SoftlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChoices { scene_id } => {
                write!(f, "scene '{scene_id}' offers no selectable choices")
            }
            Self::RevisitThreshold { scene_id, visits } => {
                write!(f, "scene '{scene_id}' revisited {visits} times")
            }
            Self::ProgressThreshold { steps } => {
                write!(f, "no progress for {steps} consecutive steps")
            }
        }
    }
}

/// Stateful softlock detector: fed the engine after every transition, it
/// watches revisit counts, progress stagnation, and dead-end scenes.
pub struct SoftlockWatch {
    config: SoftlockConfig,
    last_signature: Option<greenroom_engine::ProgressSignature>,
    stagnant_steps: u32,
}

impl SoftlockWatch {
    #[must_use]
    pub fn new(config: SoftlockConfig) -> Self {
        Self {
            config,
            last_signature: None,
            stagnant_steps: 0,
        }
    }

    pub fn observe<C: ContentSource>(&mut self, engine: &Engine<C>) -> Option<SoftlockKind> {
        let scene = engine.current_scene()?;
        let state = engine.state();

        if !scene.is_ending() {
            let selectable = engine
                .available_choices()
                .map(|choices| choices.iter().filter(|c| c.status.selectable()).count())
                .unwrap_or(0);
            if selectable == 0 {
                return Some(SoftlockKind::NoChoices {
                    scene_id: scene.id.clone(),
                });
            }
        }

        let visits = state.visited_count(&scene.id);
        if visits > self.config.max_revisits
            && !self.config.exempt_scenes.iter().any(|s| s == &scene.id)
        {
            return Some(SoftlockKind::RevisitThreshold {
                scene_id: scene.id.clone(),
                visits,
            });
        }

        let signature = state.progress_signature();
        if self.last_signature.as_ref() == Some(&signature) {
            self.stagnant_steps += 1;
        } else {
            self.stagnant_steps = 0;
        }
        self.last_signature = Some(signature);
        // Same convention as the revisit probe: trips once past the max.
        if self.stagnant_steps > self.config.max_steps_without_progress {
            return Some(SoftlockKind::ProgressThreshold {
                steps: self.stagnant_steps,
            });
        }
        None
    }
}

/// One assertion or execution failure, tied to its step index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: usize,
    pub check: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Passed,
    Failed,
    Softlocked,
}

/// Outcome of one scripted run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub name: String,
    pub status: RunStatus,
    pub steps_executed: usize,
    pub failures: Vec<StepFailure>,
    pub softlock: Option<SoftlockKind>,
    pub final_scene: String,
    pub ended: bool,
    pub duration_ms: u64,
}

impl RunReport {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.status, RunStatus::Passed)
    }
}

/// Drives an engine through a [`PlaythroughScript`] step by step.
pub struct ScriptRunner<C: ContentSource> {
    engine: Engine<C>,
    snapshots: HashMap<String, String>,
    verbose: bool,
}

impl<C: ContentSource> ScriptRunner<C> {
    #[must_use]
    pub fn new(source: C, verbose: bool) -> Self {
        Self {
            engine: Engine::new(source),
            snapshots: HashMap::new(),
            verbose,
        }
    }

    /// Execute the script to completion, a hard failure, or a softlock.
    #[must_use]
    pub fn run(mut self, script: &PlaythroughScript) -> RunReport {
        let start_time = Instant::now();
        let mut failures = Vec::new();
        let mut softlock = None;
        let mut watch = SoftlockWatch::new(script.softlock.clone());
        let mut steps_executed = 0;

        for (index, step) in script.steps.iter().enumerate() {
            steps_executed = index + 1;
            if self.verbose {
                println!("  {} step {index}: {step:?}", "▶".blue());
            }
            let transitioned = match self.execute(index, step, script, &mut failures) {
                Ok(transitioned) => transitioned,
                Err(failure) => {
                    failures.push(failure);
                    break;
                }
            };
            if let Some(expect) = step_expectations(step) {
                self.check(index, expect, &mut failures);
            }
            if transitioned {
                if let Some(kind) = watch.observe(&self.engine) {
                    debug!("softlock after step {index}: {kind}");
                    softlock = Some(kind);
                    break;
                }
            }
        }

        if softlock.is_none() {
            self.check_ending(script, steps_executed, &mut failures);
        }

        let final_scene = self.engine.state().current_scene_id.clone();
        let ended = self.engine.current_scene().is_some_and(|s| s.is_ending());
        let status = if softlock.is_some() {
            RunStatus::Softlocked
        } else if failures.is_empty() {
            RunStatus::Passed
        } else {
            RunStatus::Failed
        };
        RunReport {
            name: script.name().to_string(),
            status,
            steps_executed,
            failures,
            softlock,
            final_scene,
            ended,
            duration_ms: u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Returns whether the step moved the engine (and the watch should look).
    fn execute(
        &mut self,
        index: usize,
        step: &Step,
        script: &PlaythroughScript,
        failures: &mut Vec<StepFailure>,
    ) -> Result<bool, StepFailure> {
        match step {
            Step::Start { .. } => {
                self.engine
                    .initialize()
                    .map_err(|err| execution_failure(index, "start", &err))?;
                let starting = &script.starting_state;
                self.engine.with_state_mut(|state| {
                    state.stats.extend(starting.stats.clone());
                    state.flags.extend(starting.flags.iter().cloned());
                    state.inventory.extend(starting.inventory.clone());
                    state.factions.extend(starting.factions.clone());
                });
                Ok(true)
            }
            Step::Choose {
                index: choice_index,
                label,
                ..
            } => {
                let choices = self
                    .engine
                    .available_choices()
                    .map_err(|err| execution_failure(index, "choose", &err))?;
                let choice = match (choice_index, label) {
                    (Some(i), _) => {
                        let Some(choice) = choices.get(*i) else {
                            return Err(StepFailure {
                                step: index,
                                check: "choose".to_string(),
                                expected: format!("a choice at index {i}"),
                                actual: format!("scene has {} choices", choices.len()),
                            });
                        };
                        if let Some(expected) = label {
                            if choice.label != *expected {
                                return Err(StepFailure {
                                    step: index,
                                    check: "choose".to_string(),
                                    expected: format!("'{expected}' at index {i}"),
                                    actual: choice.label.clone(),
                                });
                            }
                        }
                        choice
                    }
                    (None, Some(label)) => {
                        let Some(choice) = choices.iter().find(|c| c.label == *label) else {
                            return Err(StepFailure {
                                step: index,
                                check: "choose".to_string(),
                                expected: format!("a choice labeled '{label}'"),
                                actual: format!(
                                    "available: [{}]",
                                    choices
                                        .iter()
                                        .map(|c| c.label.as_str())
                                        .collect::<Vec<_>>()
                                        .join(", ")
                                ),
                            });
                        };
                        choice
                    }
                    (None, None) => {
                        return Err(StepFailure {
                            step: index,
                            check: "choose".to_string(),
                            expected: "an 'index' or a 'label'".to_string(),
                            actual: "neither present".to_string(),
                        });
                    }
                };
                if let ChoiceStatus::Disabled { hint } = &choice.status {
                    return Err(StepFailure {
                        step: index,
                        check: "choose".to_string(),
                        expected: format!("'{}' to be selectable", choice.label),
                        actual: format!(
                            "disabled{}",
                            hint.as_deref()
                                .map(|h| format!(" ({h})"))
                                .unwrap_or_default()
                        ),
                    });
                }
                self.engine
                    .make_choice(choice.index)
                    .map_err(|err| execution_failure(index, "choose", &err))?;
                Ok(true)
            }
            Step::Checkpoint {
                save_snapshot_name, ..
            } => {
                if let Some(slot) = save_snapshot_name {
                    let blob = self
                        .engine
                        .save_to_string()
                        .map_err(|err| execution_failure(index, "checkpoint", &err))?;
                    self.snapshots.insert(slot.clone(), blob);
                }
                Ok(false)
            }
            Step::SaveSnapshot { slot } => {
                let blob = self
                    .engine
                    .save_to_string()
                    .map_err(|err| execution_failure(index, "save-snapshot", &err))?;
                self.snapshots.insert(slot.clone(), blob);
                Ok(false)
            }
            Step::LoadSnapshot { slot, .. } => {
                let Some(blob) = self.snapshots.get(slot).cloned() else {
                    failures.push(StepFailure {
                        step: index,
                        check: "load-snapshot".to_string(),
                        expected: format!("a saved slot '{slot}'"),
                        actual: "slot was never saved".to_string(),
                    });
                    return Ok(false);
                };
                self.engine
                    .load_from_string(&blob)
                    .map_err(|err| execution_failure(index, "load-snapshot", &err))?;
                Ok(true)
            }
        }
    }

    fn check(&self, index: usize, expect: &Assertions, failures: &mut Vec<StepFailure>) {
        let state = self.engine.state();
        let mut fail = |check: &str, expected: String, actual: String| {
            failures.push(StepFailure {
                step: index,
                check: check.to_string(),
                expected,
                actual,
            });
        };

        if let Some(scene) = &expect.scene {
            if state.current_scene_id != *scene {
                fail("scene", scene.clone(), state.current_scene_id.clone());
            }
        }
        for flag in &expect.flags {
            if !state.flags.contains(flag) {
                fail("flag", format!("'{flag}' set"), "not set".to_string());
            }
        }
        for flag in &expect.absent_flags {
            if state.flags.contains(flag) {
                fail("flag", format!("'{flag}' not set"), "set".to_string());
            }
        }
        for (item, expected_count) in &expect.items {
            let actual = state.inventory.get(item).copied().unwrap_or(0);
            if actual != *expected_count {
                fail(
                    "item",
                    format!("{expected_count} of '{item}'"),
                    actual.to_string(),
                );
            }
        }
        for assertion in &expect.stats {
            let actual = state.stats.get(&assertion.stat).copied().unwrap_or(0.0);
            if !assertion.op.compare(actual, assertion.value) {
                fail(
                    "stat",
                    format!("{} {} {}", assertion.stat, assertion.op, assertion.value),
                    actual.to_string(),
                );
            }
        }
        for (scene_id, expected_visits) in &expect.visited {
            let actual = state.visited_count(scene_id);
            if actual != *expected_visits {
                fail(
                    "visited",
                    format!("{expected_visits} visits to '{scene_id}'"),
                    actual.to_string(),
                );
            }
        }
        if let Some(expected) = expect.selectable_choices {
            let actual = self
                .engine
                .available_choices()
                .map(|choices| choices.iter().filter(|c| c.status.selectable()).count())
                .unwrap_or(0);
            if actual != expected {
                fail(
                    "selectable-choices",
                    expected.to_string(),
                    actual.to_string(),
                );
            }
        }
    }

    fn check_ending(
        &self,
        script: &PlaythroughScript,
        last_step: usize,
        failures: &mut Vec<StepFailure>,
    ) {
        let Some(criteria) = &script.ending else {
            return;
        };
        let ending = self.engine.current_scene().and_then(|s| s.ending.clone());
        if criteria.required && ending.is_none() {
            failures.push(StepFailure {
                step: last_step,
                check: "ending".to_string(),
                expected: "run finishes on an ending scene".to_string(),
                actual: format!("ended on '{}'", self.engine.state().current_scene_id),
            });
            return;
        }
        if let (Some(expected_kind), Some(info)) = (&criteria.kind, &ending) {
            let actual = info.kind.as_deref().unwrap_or("untyped");
            if actual != expected_kind {
                failures.push(StepFailure {
                    step: last_step,
                    check: "ending".to_string(),
                    expected: format!("ending kind '{expected_kind}'"),
                    actual: actual.to_string(),
                });
            }
        }
        let state = self.engine.state();
        let mut fail = |expected: String, actual: String| {
            failures.push(StepFailure {
                step: last_step,
                check: "ending".to_string(),
                expected,
                actual,
            });
        };
        if let Some(scene) = &criteria.scene {
            if state.current_scene_id != *scene {
                fail(
                    format!("run finishes on '{scene}'"),
                    state.current_scene_id.clone(),
                );
            }
        }
        for flag in &criteria.flags {
            if !state.flags.contains(flag) {
                fail(format!("flag '{flag}' set at the end"), "not set".to_string());
            }
        }
        for (item, min) in &criteria.items {
            let actual = state.inventory.get(item).copied().unwrap_or(0);
            if actual < *min {
                fail(
                    format!("at least {min} of '{item}'"),
                    actual.to_string(),
                );
            }
        }
        for (stat, min) in &criteria.stats {
            let actual = state.stats.get(stat).copied().unwrap_or(0.0);
            if actual < *min {
                fail(format!("{stat} >= {min}"), actual.to_string());
            }
        }
    }
}

fn step_expectations(step: &Step) -> Option<&Assertions> {
    match step {
        Step::Start { expect }
        | Step::Choose { expect, .. }
        | Step::LoadSnapshot { expect, .. } => expect.as_ref(),
        Step::Checkpoint { expect, .. } => Some(expect),
        Step::SaveSnapshot { .. } => None,
    }
}

fn execution_failure(step: usize, check: &str, err: &dyn std::error::Error) -> StepFailure {
    StepFailure {
        step,
        check: check.to_string(),
        expected: "step executes cleanly".to_string(),
        actual: err.to_string(),
    }
}
