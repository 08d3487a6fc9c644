//! Derived-state recomputation: step lock propagation and goal aggregates.
//!
//! Both passes are full-snapshot rederivations, rerun after every mutation
//! that can change dependency structure or any step's status. Derived
//! fields are caches of these functions, never independently mutable
//! truth.

use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use super::prerequisites;
use crate::model::{DependencyEdge, Goal, Step, StepStatus};

/// Recompute every step's locked/available status from its prerequisites.
///
/// Rules:
/// - `in_progress` and `completed` are user-set and never altered, even if
///   a prerequisite regresses.
/// - A step with no prerequisites is never left `locked`.
/// - A step with prerequisites is `available` iff every direct
///   prerequisite is `completed`, else `locked`.
///
/// A prerequisite only unlocks its dependents through `completed`, which
/// is itself sticky, so the result is independent of visit order.
pub fn propagate_step_statuses(
    steps: &mut BTreeMap<Uuid, Step>,
    edges: &BTreeMap<Uuid, DependencyEdge>,
) {
    let prereqs = prerequisites(edges);
    let completed: HashSet<Uuid> = steps
        .values()
        .filter(|s| s.status == StepStatus::Completed)
        .map(|s| s.id)
        .collect();

    for step in steps.values_mut() {
        if step.status.is_manual() {
            continue;
        }

        let derived = match prereqs.get(&step.id) {
            None => StepStatus::Available,
            Some(sources) => {
                if sources.iter().all(|src| completed.contains(src)) {
                    StepStatus::Available
                } else {
                    StepStatus::Locked
                }
            }
        };
        step.status = derived;
    }
}

/// Recompute each goal's `step_count` / `completed_step_count` from the
/// current step collection.
pub fn recompute_goal_aggregates(goals: &mut BTreeMap<Uuid, Goal>, steps: &BTreeMap<Uuid, Step>) {
    for goal in goals.values_mut() {
        goal.step_count = 0;
        goal.completed_step_count = 0;
    }
    for step in steps.values() {
        if let Some(goal) = goals.get_mut(&step.goal_id) {
            goal.step_count += 1;
            if step.status == StepStatus::Completed {
                goal.completed_step_count += 1;
            }
        }
    }
}
