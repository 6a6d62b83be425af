//! Seeded random-walk exploration for softlock hunting.
//!
//! Each walk is fully determined by its seed: the same seed over the same
//! content always takes the same path, so a reported softlock can be
//! replayed exactly.

use greenroom_engine::{ContentSource, Engine, EngineError};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use crate::runner::{SoftlockKind, SoftlockWatch};
use crate::script::SoftlockConfig;

#[derive(Debug, Clone)]
pub struct ExploreConfig {
    /// Hard step bound per walk.
    pub max_steps: usize,
    pub softlock: SoftlockConfig,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            max_steps: 200,
            softlock: SoftlockConfig::default(),
        }
    }
}

/// Outcome of one seeded walk.
#[derive(Debug, Clone, Serialize)]
pub struct ExploreOutcome {
    pub seed: u64,
    pub steps: usize,
    pub final_scene: String,
    pub ended: bool,
    pub softlock: Option<SoftlockKind>,
    /// Choice labels taken, for replaying a failing walk as a script.
    pub path: Vec<String>,
}

impl ExploreOutcome {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.softlock.is_none()
    }
}

/// Walk the content from the start, picking uniformly among selectable
/// choices, until an ending, a softlock, or the step bound.
///
/// # Errors
///
/// Propagates content errors; those are authoring defects, not walk
/// outcomes.
pub fn explore<C: ContentSource>(
    source: C,
    seed: u64,
    config: &ExploreConfig,
) -> Result<ExploreOutcome, EngineError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut engine = Engine::new(source);
    engine.initialize()?;
    engine.with_state_mut(|state| state.random_seed = Some(seed));

    let mut watch = SoftlockWatch::new(config.softlock.clone());
    let mut path = Vec::new();
    let mut softlock = watch.observe(&engine);
    let mut steps = 0;

    while softlock.is_none() && steps < config.max_steps {
        let scene_ended = engine.current_scene().is_some_and(|s| s.is_ending());
        if scene_ended {
            break;
        }
        let choices = engine.available_choices()?;
        let selectable: Vec<_> = choices
            .iter()
            .filter(|c| c.status.selectable())
            .collect();
        if selectable.is_empty() {
            // The watch reports this as a softlock below on ending-less
            // scenes; break either way.
            softlock = watch.observe(&engine);
            break;
        }
        let pick = selectable[rng.gen_range(0..selectable.len())];
        debug!("seed {seed} step {steps}: taking '{}'", pick.label);
        path.push(pick.label.clone());
        engine.make_choice(pick.index)?;
        steps += 1;
        softlock = watch.observe(&engine);
    }

    Ok(ExploreOutcome {
        seed,
        steps,
        final_scene: engine.state().current_scene_id.clone(),
        ended: engine.current_scene().is_some_and(|s| s.is_ending()),
        softlock,
        path,
    })
}
