//! Whole-content structural validation: load every declared scene, collect
//! authoring errors, and run reachability and cycle analysis over whatever
//! parsed.

use greenroom_engine::{
    analyze_reachability, detect_cycles, graph::DEFAULT_MAX_DEPTH, normalize_manifest,
    normalize_scene, validate_links, ContentError, ContentSource, CycleReport, Manifest,
    ReachabilityReport, SceneData,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// One scene that failed to load or validate.
#[derive(Debug, Clone, Serialize)]
pub struct SceneProblem {
    pub scene_id: String,
    pub message: String,
}

/// Full structural picture of a content set.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub content_version: String,
    pub starting_scene: String,
    pub declared_scenes: usize,
    pub loaded_scenes: usize,
    pub problems: Vec<SceneProblem>,
    pub reachability: ReachabilityReport,
    pub cycles: CycleReport,
}

impl ValidationReport {
    /// Structurally sound: every scene loads and every scene is reachable.
    /// Cycles are informational only.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty() && self.reachability.unreachable.is_empty()
    }
}

/// Validate a whole content set.
///
/// Unlike the runtime loader this does not stop at the first bad scene: it
/// collects every problem so an author sees the full picture in one run.
///
/// # Errors
///
/// Fails only when the manifest itself cannot be loaded or parsed.
pub fn validate_content<C: ContentSource>(source: &C) -> Result<ValidationReport, ContentError> {
    let raw = source
        .load_manifest()
        .map_err(|err| ContentError::source("manifest", &err))?;
    let manifest = normalize_manifest(&raw)?;

    let (scenes, problems) = load_all_scenes(source, &manifest);
    let reachability =
        analyze_reachability(&manifest.starting_scene, &scenes, DEFAULT_MAX_DEPTH);
    let cycles = detect_cycles(&scenes);

    Ok(ValidationReport {
        content_version: manifest.content_version.clone(),
        starting_scene: manifest.starting_scene.clone(),
        declared_scenes: manifest.scene_index.len(),
        loaded_scenes: scenes.len(),
        problems,
        reachability,
        cycles,
    })
}

fn load_all_scenes<C: ContentSource>(
    source: &C,
    manifest: &Manifest,
) -> (BTreeMap<String, SceneData>, Vec<SceneProblem>) {
    let mut scenes = BTreeMap::new();
    let mut problems = Vec::new();
    for scene_id in manifest.scene_index.keys() {
        let loaded = source
            .load_scene(scene_id)
            .map_err(|err| ContentError::source(scene_id, &err))
            .and_then(|raw| normalize_scene(scene_id, &raw))
            .and_then(|scene| {
                validate_links(manifest, &scene)?;
                Ok(scene)
            });
        match loaded {
            Ok(scene) => {
                scenes.insert(scene_id.clone(), scene);
            }
            Err(err) => problems.push(SceneProblem {
                scene_id: scene_id.clone(),
                message: err.to_string(),
            }),
        }
    }
    (scenes, problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenroom_engine::{StaticContent, UnreachableReason};
    use serde_json::json;

    fn content() -> StaticContent {
        StaticContent::new(json!({
            "contentVersion": "1.0.0",
            "startingScene": "sc_a",
            "sceneIndex": {
                "sc_a": {},
                "sc_b": {},
                "sc_orphan": {},
                "sc_broken": {}
            }
        }))
        .with_scene(
            "sc_a",
            json!({"choices": [
                {"label": "On", "to": "sc_b"},
                {"label": "Again", "to": "sc_a"}
            ]}),
        )
        .with_scene("sc_b", json!({"choices": [{"label": "Back", "to": "sc_a"}]}))
        .with_scene("sc_orphan", json!({"choices": []}))
        .with_scene("sc_broken", json!({"choices": [{"label": "Nowhere"}]}))
    }

    #[test]
    fn collects_problems_and_graph_findings_in_one_pass() {
        let report = validate_content(&content()).unwrap();
        assert!(!report.is_clean());
        assert_eq!(report.declared_scenes, 4);
        assert_eq!(report.loaded_scenes, 3);

        assert_eq!(report.problems.len(), 1);
        assert_eq!(report.problems[0].scene_id, "sc_broken");

        let unreachable: Vec<_> = report
            .reachability
            .unreachable
            .iter()
            .map(|u| (u.scene_id.as_str(), u.reason))
            .collect();
        assert!(unreachable.contains(&("sc_orphan", UnreachableReason::NoIncomingLinks)));

        // sc_a <-> sc_b loop plus the sc_a self-loop.
        assert_eq!(report.cycles.members["sc_a"], 1);
        assert_eq!(report.cycles.members["sc_b"], 2);
    }

    #[test]
    fn clean_content_is_clean() {
        let source = StaticContent::new(json!({
            "contentVersion": "1.0.0",
            "startingScene": "sc_a",
            "sceneIndex": {"sc_a": {}, "sc_b": {}}
        }))
        .with_scene("sc_a", json!({"choices": [{"label": "On", "to": "sc_b"}]}))
        .with_scene("sc_b", json!({"ending": true}));
        let report = validate_content(&source).unwrap();
        assert!(report.is_clean());
        assert!(report.cycles.is_empty());
    }

    #[test]
    fn missing_manifest_is_an_error() {
        assert!(validate_content(&StaticContent::default()).is_err());
    }
}
