//! Pure condition evaluation over the game state.
//!
//! Evaluation is deterministic and side-effect free: the same condition
//! against an unmutated state always yields the same boolean. Anything the
//! evaluator does not recognize fails closed so unknown or future authoring
//! constructs never falsely unlock content.

use log::warn;

use crate::content::{Condition, ConditionKind};
use crate::state::GameState;

/// Default minimum count for item checks when the author omits one.
pub const DEFAULT_ITEM_COUNT: i64 = 1;

/// Evaluate a single condition against the state.
#[must_use]
pub fn evaluate(condition: &Condition, state: &GameState) -> bool {
    evaluate_kind(&condition.kind, state)
}

/// Evaluate a conjunction of conditions. An empty list is vacuously true,
/// which is what lets unconditioned choices stay always-enabled.
#[must_use]
pub fn evaluate_all(conditions: &[Condition], state: &GameState) -> bool {
    conditions.iter().all(|condition| evaluate(condition, state))
}

fn evaluate_kind(kind: &ConditionKind, state: &GameState) -> bool {
    match kind {
        ConditionKind::Stat { stat, op, value } => {
            // Missing stats read as 0 so thresholds work before first assignment.
            let current = state.stats.get(stat).copied().unwrap_or(0.0);
            op.compare(current, *value)
        }
        ConditionKind::Flag { flag } => state.flags.contains(flag),
        ConditionKind::Item { item, count } => {
            let required = if *count > 0 { *count } else { DEFAULT_ITEM_COUNT };
            state.inventory.get(item).copied().unwrap_or(0) >= required
        }
        ConditionKind::Faction { faction, level } => {
            state.factions.get(faction).copied().unwrap_or(0) >= *level
        }
        ConditionKind::All { conditions } => evaluate_all(conditions, state),
        ConditionKind::Any { conditions } => {
            conditions.iter().any(|condition| evaluate(condition, state))
        }
        ConditionKind::Not { conditions } => {
            if let [inner] = conditions.as_slice() {
                !evaluate(inner, state)
            } else {
                warn!(
                    "'not' condition wraps {} operands instead of exactly one; failing closed",
                    conditions.len()
                );
                false
            }
        }
        ConditionKind::Other { kind } => {
            warn!("unrecognized condition type '{kind}'; failing closed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CmpOp;

    fn state_with_courage(courage: f64) -> GameState {
        let mut state = GameState::default();
        state.stats.insert("courage".to_string(), courage);
        state
    }

    fn stat_gte(stat: &str, value: f64) -> Condition {
        Condition::new(ConditionKind::Stat {
            stat: stat.to_string(),
            op: CmpOp::Gte,
            value,
        })
    }

    #[test]
    fn missing_stat_defaults_to_zero() {
        let state = GameState::default();
        assert!(evaluate(&stat_gte("courage", 0.0), &state));
        assert!(!evaluate(&stat_gte("courage", 1.0), &state));
    }

    #[test]
    fn stat_operators_compare_against_value() {
        let state = state_with_courage(5.0);
        assert!(evaluate(&stat_gte("courage", 5.0), &state));
        assert!(!evaluate(&stat_gte("courage", 6.0), &state));
        let lt = Condition::new(ConditionKind::Stat {
            stat: "courage".to_string(),
            op: CmpOp::Lt,
            value: 6.0,
        });
        assert!(evaluate(&lt, &state));
    }

    #[test]
    fn item_check_defaults_required_count_to_one() {
        let mut state = GameState::default();
        let check = Condition::new(ConditionKind::Item {
            item: "booth_key".to_string(),
            count: 0,
        });
        assert!(!evaluate(&check, &state));
        state.inventory.insert("booth_key".to_string(), 1);
        assert!(evaluate(&check, &state));
    }

    #[test]
    fn faction_check_requires_minimum_level() {
        let mut state = GameState::default();
        state.factions.insert("stagehands".to_string(), 3);
        let check = Condition::new(ConditionKind::Faction {
            faction: "stagehands".to_string(),
            level: 3,
        });
        assert!(evaluate(&check, &state));
        let higher = Condition::new(ConditionKind::Faction {
            faction: "stagehands".to_string(),
            level: 4,
        });
        assert!(!evaluate(&higher, &state));
    }

    #[test]
    fn empty_all_is_true_and_empty_any_is_false() {
        let state = GameState::default();
        let all = Condition::new(ConditionKind::All {
            conditions: Vec::new(),
        });
        let any = Condition::new(ConditionKind::Any {
            conditions: Vec::new(),
        });
        assert!(evaluate(&all, &state));
        assert!(!evaluate(&any, &state));
    }

    #[test]
    fn not_negates_exactly_one_operand() {
        let state = state_with_courage(5.0);
        let inner = stat_gte("courage", 5.0);
        let negated = Condition::new(ConditionKind::Not {
            conditions: vec![inner.clone()],
        });
        assert_eq!(evaluate(&negated, &state), !evaluate(&inner, &state));
    }

    #[test]
    fn malformed_not_fails_closed() {
        let state = GameState::default();
        let empty = Condition::new(ConditionKind::Not {
            conditions: Vec::new(),
        });
        let double = Condition::new(ConditionKind::Not {
            conditions: vec![stat_gte("courage", 0.0), stat_gte("courage", 0.0)],
        });
        assert!(!evaluate(&empty, &state));
        assert!(!evaluate(&double, &state));
    }

    #[test]
    fn unknown_condition_type_fails_closed() {
        let state = GameState::default();
        let other = Condition::new(ConditionKind::Other {
            kind: "moon_phase".to_string(),
        });
        assert!(!evaluate(&other, &state));
    }

    #[test]
    fn evaluation_is_deterministic_for_unmutated_state() {
        let state = state_with_courage(4.0);
        let nested = Condition::new(ConditionKind::Any {
            conditions: vec![
                stat_gte("courage", 5.0),
                Condition::new(ConditionKind::Flag {
                    flag: "path_direct".to_string(),
                }),
            ],
        });
        let first = evaluate(&nested, &state);
        let second = evaluate(&nested, &state);
        assert_eq!(first, second);
    }
}
