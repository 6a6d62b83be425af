//! Static reachability and cycle analysis over the content graph.
//!
//! Both passes ignore condition satisfiability on purpose: they answer "is
//! this node connected to the start", not "can a player actually get here
//! given stat or flag state". They run offline over the full declared scene
//! set, before runtime.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::content::{Choice, ChoiceTarget, Effect, SceneData};

/// Depth bound for the breadth-first walk; tolerates malformed cycles
/// without nontermination.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Why a scene is outside the reachable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnreachableReason {
    /// No edge points at the scene at all.
    NoIncomingLinks,
    /// The scene has incoming edges but is still disconnected from the
    /// start, implying a cut-off subgraph or a gated region the traversal
    /// does not model.
    BehindUnsatisfiedCondition,
}

impl UnreachableReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoIncomingLinks => "no-incoming-links",
            Self::BehindUnsatisfiedCondition => "behind-unsatisfied-condition",
        }
    }
}

/// One unreachable scene with its diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachableScene {
    pub scene_id: String,
    pub reason: UnreachableReason,
}

/// Output of the reachability pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct ReachabilityReport {
    pub reachable: BTreeSet<String>,
    pub unreachable: Vec<UnreachableScene>,
    /// True when the depth bound cut the walk short.
    pub truncated: bool,
}

/// Output of the cycle pass: scene id to the length of a cycle it sits in.
/// Cycles are informational; intentional narrative loops are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct CycleReport {
    pub members: BTreeMap<String, usize>,
}

impl CycleReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Every outgoing edge of a scene: choice targets (both attempt branches)
/// plus goto-effect targets from entry, choice, and branch effect lists.
/// Deduplicated, authored order preserved.
#[must_use]
pub fn scene_edges(scene: &SceneData) -> Vec<String> {
    let mut edges = Vec::new();
    push_gotos(&scene.effects, &mut edges);
    for choice in &scene.choices {
        push_choice_edges(choice, &mut edges);
    }
    edges
}

fn push_edge(target: &str, edges: &mut Vec<String>) {
    if !edges.iter().any(|existing| existing == target) {
        edges.push(target.to_string());
    }
}

fn push_gotos(effects: &[Effect], edges: &mut Vec<String>) {
    for effect in effects {
        if let Effect::Goto { scene } = effect {
            push_edge(scene, edges);
        }
    }
}

fn push_choice_edges(choice: &Choice, edges: &mut Vec<String>) {
    push_gotos(&choice.effects, edges);
    match &choice.target {
        ChoiceTarget::Simple { to } => push_edge(to, edges),
        ChoiceTarget::Attempt {
            on_success,
            on_failure,
        } => {
            push_gotos(&on_success.effects, edges);
            push_edge(&on_success.to, edges);
            push_gotos(&on_failure.effects, edges);
            push_edge(&on_failure.to, edges);
        }
    }
}

/// Breadth-first reachability from the starting scene, bounded by
/// `max_depth`. Scenes missing from `scenes` are skipped; the loader has
/// already fail-fasted on genuinely broken links by the time this runs.
#[must_use]
pub fn analyze_reachability(
    start: &str,
    scenes: &BTreeMap<String, SceneData>,
    max_depth: usize,
) -> ReachabilityReport {
    let mut reachable = BTreeSet::new();
    let mut truncated = false;
    let mut queue = VecDeque::new();

    if scenes.contains_key(start) {
        reachable.insert(start.to_string());
        queue.push_back((start.to_string(), 0_usize));
    }

    while let Some((scene_id, depth)) = queue.pop_front() {
        if depth >= max_depth {
            truncated = true;
            continue;
        }
        let Some(scene) = scenes.get(&scene_id) else {
            continue;
        };
        for target in scene_edges(scene) {
            if scenes.contains_key(&target) && reachable.insert(target.clone()) {
                queue.push_back((target, depth + 1));
            }
        }
    }

    let incoming = incoming_counts(scenes);
    let unreachable = scenes
        .keys()
        .filter(|scene_id| !reachable.contains(*scene_id))
        .map(|scene_id| UnreachableScene {
            scene_id: scene_id.clone(),
            reason: if incoming.get(scene_id).copied().unwrap_or(0) == 0 {
                UnreachableReason::NoIncomingLinks
            } else {
                UnreachableReason::BehindUnsatisfiedCondition
            },
        })
        .collect();

    ReachabilityReport {
        reachable,
        unreachable,
        truncated,
    }
}

fn incoming_counts(scenes: &BTreeMap<String, SceneData>) -> HashMap<String, usize> {
    let mut incoming: HashMap<String, usize> = HashMap::new();
    for scene in scenes.values() {
        for target in scene_edges(scene) {
            // Self-loops do not make a scene reachable from elsewhere.
            if target != scene.id {
                *incoming.entry(target).or_insert(0) += 1;
            }
        }
    }
    incoming
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depth-first three-color cycle detection. For every scene inside a cycle
/// the report records the shortest cycle length observed through it.
#[must_use]
pub fn detect_cycles(scenes: &BTreeMap<String, SceneData>) -> CycleReport {
    let mut colors: HashMap<&str, Color> =
        scenes.keys().map(|id| (id.as_str(), Color::White)).collect();
    let mut members: BTreeMap<String, usize> = BTreeMap::new();

    for root in scenes.keys() {
        if colors.get(root.as_str()) == Some(&Color::White) {
            dfs_from(root, scenes, &mut colors, &mut members);
        }
    }

    CycleReport { members }
}

fn dfs_from<'a>(
    root: &str,
    scenes: &'a BTreeMap<String, SceneData>,
    colors: &mut HashMap<&'a str, Color>,
    members: &mut BTreeMap<String, usize>,
) {
    // Iterative DFS: (scene id, its edges, next edge index).
    let mut stack: Vec<(String, Vec<String>, usize)> = Vec::new();
    let mut path_index: HashMap<String, usize> = HashMap::new();

    let root_edges = scenes.get(root).map(scene_edges).unwrap_or_default();
    set_color(colors, scenes, root, Color::Gray);
    path_index.insert(root.to_string(), 0);
    stack.push((root.to_string(), root_edges, 0));

    while let Some((scene_id, edges, next)) = stack.last_mut() {
        if *next >= edges.len() {
            let finished = scene_id.clone();
            stack.pop();
            set_color(colors, scenes, &finished, Color::Black);
            path_index.remove(&finished);
            continue;
        }
        let target = edges[*next].clone();
        *next += 1;

        match colors.get(target.as_str()).copied() {
            Some(Color::White) => {
                let target_edges = scenes.get(&target).map(scene_edges).unwrap_or_default();
                set_color(colors, scenes, &target, Color::Gray);
                path_index.insert(target.clone(), stack.len());
                stack.push((target, target_edges, 0));
            }
            Some(Color::Gray) => {
                // Back edge: everything from the target up the stack is on
                // the cycle.
                if let Some(&from) = path_index.get(&target) {
                    let cycle_len = stack.len() - from;
                    for (member, _, _) in &stack[from..] {
                        members
                            .entry(member.clone())
                            .and_modify(|len| *len = (*len).min(cycle_len))
                            .or_insert(cycle_len);
                    }
                }
            }
            // Black or undeclared: nothing new to learn.
            _ => {}
        }
    }
}

fn set_color<'a>(
    colors: &mut HashMap<&'a str, Color>,
    scenes: &'a BTreeMap<String, SceneData>,
    scene_id: &str,
    color: Color,
) {
    if let Some((key, _)) = scenes.get_key_value(scene_id) {
        colors.insert(key.as_str(), color);
    }
}
