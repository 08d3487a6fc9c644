//! Connection validity: would adding a dependency edge keep the graph a
//! valid per-goal DAG?
//!
//! [`check_connection`] is consulted before any edge is admitted, so the
//! acyclicity of each goal's edge set is an invariant of the snapshot, not
//! a one-time check.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use super::dependents;
use crate::model::{DependencyEdge, Snapshot};

/// Reasons a prospective dependency edge is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("a step cannot depend on itself")]
    SelfDependency,

    #[error("unknown step: {0}")]
    UnknownEndpoint(Uuid),

    #[error("steps belong to different goals ({source_goal} vs {target_goal})")]
    CrossGoal {
        source_goal: Uuid,
        target_goal: Uuid,
    },

    #[error("an identical dependency already exists")]
    DuplicateEdge,

    #[error("dependency would create a cycle")]
    WouldCycle,
}

/// Check whether an edge `source -> target` (source is the prerequisite)
/// may be added to the snapshot.
pub fn check_connection(
    snapshot: &Snapshot,
    source: Uuid,
    target: Uuid,
) -> Result<(), ConnectionError> {
    if source == target {
        return Err(ConnectionError::SelfDependency);
    }

    let source_step = snapshot
        .steps
        .get(&source)
        .ok_or(ConnectionError::UnknownEndpoint(source))?;
    let target_step = snapshot
        .steps
        .get(&target)
        .ok_or(ConnectionError::UnknownEndpoint(target))?;

    // Dependencies are scoped per goal: a step may never depend on a step
    // from another goal.
    if source_step.goal_id != target_step.goal_id {
        return Err(ConnectionError::CrossGoal {
            source_goal: source_step.goal_id,
            target_goal: target_step.goal_id,
        });
    }

    if snapshot
        .edges
        .values()
        .any(|e| e.source == source && e.target == target)
    {
        return Err(ConnectionError::DuplicateEdge);
    }

    if reaches(&snapshot.edges, target, source) {
        return Err(ConnectionError::WouldCycle);
    }

    Ok(())
}

/// Whether `to` is reachable from `from` following edges forward.
///
/// Used for the cycle check: the new edge `source -> target` closes a cycle
/// exactly when `source` is already reachable from `target`.
fn reaches(edges: &BTreeMap<Uuid, DependencyEdge>, from: Uuid, to: Uuid) -> bool {
    let forward = dependents(edges);
    let mut visited = HashSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = forward.get(&current) {
            stack.extend(next.iter().copied());
        }
    }

    false
}
