//! Dependency graph queries: adjacency indexing, connection validity, and
//! status propagation.
//!
//! The snapshot stores flat collections; everything here rebuilds the
//! adjacency it needs from the edge list rather than maintaining an
//! incremental index.

pub mod propagate;
pub mod validity;

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::model::{DependencyEdge, Step};

/// Build the map from each step to its direct prerequisites (sources of
/// incoming dependency edges). Steps with no incoming edges are absent.
pub fn prerequisites(edges: &BTreeMap<Uuid, DependencyEdge>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut prereqs: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges.values() {
        prereqs.entry(edge.target).or_default().push(edge.source);
    }
    prereqs
}

/// Build the forward adjacency map: each step to its direct dependents.
pub fn dependents(edges: &BTreeMap<Uuid, DependencyEdge>) -> HashMap<Uuid, Vec<Uuid>> {
    let mut deps: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges.values() {
        deps.entry(edge.source).or_default().push(edge.target);
    }
    deps
}

/// Ids of the steps owned by `goal_id`, in snapshot order.
pub fn steps_of_goal(steps: &BTreeMap<Uuid, Step>, goal_id: Uuid) -> Vec<Uuid> {
    steps
        .values()
        .filter(|s| s.goal_id == goal_id)
        .map(|s| s.id)
        .collect()
}

/// Edges whose endpoints are both in the given step set.
pub fn edges_within<'a>(
    edges: &'a BTreeMap<Uuid, DependencyEdge>,
    step_ids: &[Uuid],
) -> Vec<&'a DependencyEdge> {
    edges
        .values()
        .filter(|e| step_ids.contains(&e.source) && step_ids.contains(&e.target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, StepStatus};
    use chrono::Utc;

    fn step(goal_id: Uuid) -> Step {
        let now = Utc::now();
        Step {
            id: Uuid::new_v4(),
            goal_id,
            title: "step".to_owned(),
            status: StepStatus::Available,
            position: Point::new(0.0, 0.0),
            created_at: now,
            updated_at: now,
        }
    }

    fn edge(source: Uuid, target: Uuid) -> DependencyEdge {
        DependencyEdge {
            id: Uuid::new_v4(),
            source,
            target,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn prerequisites_groups_by_target() {
        let goal = Uuid::new_v4();
        let (a, b, c) = (step(goal), step(goal), step(goal));
        let mut edges = BTreeMap::new();
        for e in [edge(a.id, c.id), edge(b.id, c.id)] {
            edges.insert(e.id, e);
        }

        let prereqs = prerequisites(&edges);
        let mut of_c = prereqs[&c.id].clone();
        of_c.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(of_c, expected);
        assert!(!prereqs.contains_key(&a.id));
    }

    #[test]
    fn edges_within_excludes_foreign_endpoints() {
        let goal = Uuid::new_v4();
        let (a, b) = (step(goal), step(goal));
        let outsider = step(Uuid::new_v4());
        let mut edges = BTreeMap::new();
        let inside = edge(a.id, b.id);
        let inside_id = inside.id;
        for e in [inside, edge(a.id, outsider.id)] {
            edges.insert(e.id, e);
        }

        let within = edges_within(&edges, &[a.id, b.id]);
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].id, inside_id);
    }
}
