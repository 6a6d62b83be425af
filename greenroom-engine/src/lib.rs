//! Greenroom Narrative Engine
//!
//! Platform-agnostic core logic for the Greenroom backstage narrative game.
//! This crate provides the deterministic state machine over authored
//! content: given the same state and the same input, it always produces the
//! same output. Presentation, storage plumbing, and build concerns live
//! elsewhere.

pub mod condition;
pub mod content;
pub mod effect;
pub mod engine;
pub mod graph;
pub mod normalize;
pub mod state;

// Re-export commonly used types
pub use condition::{evaluate, evaluate_all};
pub use content::{
    Branch, Choice, ChoiceTarget, CmpOp, Condition, ConditionKind, Effect, EndingDecl, EndingInfo,
    EndingRequirement, Manifest, SceneData, SceneStub, SceneText,
};
pub use effect::{apply, apply_all, ChangeRecord, ChangeSet, RenderScope, Urgency};
pub use engine::{
    AvailableChoice, ChoiceStatus, Engine, EngineError, EnginePhase, SubscriberId,
};
pub use graph::{
    analyze_reachability, detect_cycles, scene_edges, CycleReport, ReachabilityReport,
    UnreachableReason, UnreachableScene,
};
pub use normalize::{
    normalize_manifest, normalize_scene, validate_links, ContentError, SceneCache, FACTION_IDS,
};
pub use state::{
    GameState, PersistError, PersistErrorKind, ProgressSignature, SceneHistoryEntry, SAVE_VERSION,
};

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Trait for abstracting content loading operations.
/// Platform-specific implementations should provide this.
pub trait ContentSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw manifest document.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be resolved.
    fn load_manifest(&self) -> Result<Value, Self::Error>;

    /// Load one raw scene document by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene bytes cannot be resolved.
    fn load_scene(&self, scene_id: &str) -> Result<Value, Self::Error>;
}

/// Error raised by [`StaticContent`] for ids it does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no such content entry: {0}")]
pub struct MissingEntry(pub String);

/// In-memory content source used by tests and the headless runner.
#[derive(Debug, Clone, Default)]
pub struct StaticContent {
    manifest: Value,
    scenes: HashMap<String, Value>,
}

impl StaticContent {
    #[must_use]
    pub fn new(manifest: Value) -> Self {
        Self {
            manifest,
            scenes: HashMap::new(),
        }
    }

    /// Builder-style scene registration.
    #[must_use]
    pub fn with_scene(mut self, scene_id: &str, raw: Value) -> Self {
        self.scenes.insert(scene_id.to_string(), raw);
        self
    }

    pub fn insert_scene(&mut self, scene_id: &str, raw: Value) {
        self.scenes.insert(scene_id.to_string(), raw);
    }
}

impl ContentSource for StaticContent {
    type Error = MissingEntry;

    fn load_manifest(&self) -> Result<Value, Self::Error> {
        if self.manifest.is_null() {
            return Err(MissingEntry("manifest".to_string()));
        }
        Ok(self.manifest.clone())
    }

    fn load_scene(&self, scene_id: &str) -> Result<Value, Self::Error> {
        self.scenes
            .get(scene_id)
            .cloned()
            .ok_or_else(|| MissingEntry(scene_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn static_content_serves_registered_entries() {
        let source = StaticContent::new(json!({"startingScene": "sc_1_0_001"}))
            .with_scene("sc_1_0_001", json!({"title": "Stage Door"}));
        assert!(source.load_manifest().is_ok());
        assert_eq!(
            source.load_scene("sc_1_0_001").unwrap()["title"],
            "Stage Door"
        );
        assert_eq!(
            source.load_scene("sc_9_9_999").unwrap_err(),
            MissingEntry("sc_9_9_999".to_string())
        );
    }

    #[test]
    fn default_static_content_has_no_manifest() {
        let source = StaticContent::default();
        assert!(source.load_manifest().is_err());
    }
}
