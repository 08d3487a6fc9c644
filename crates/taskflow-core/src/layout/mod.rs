//! Layered layout for one goal's steps.
//!
//! Steps are assigned layers by longest-path distance from steps with no
//! prerequisites, so every dependency edge points to a strictly later
//! layer and a prerequisite never renders below its dependent. The layer
//! assignment walks a Kahn topological order; the edge set is kept acyclic
//! by the connection check, so the walk always covers every step.
//!
//! The finished block is centered horizontally under the goal and offset
//! below it by a fixed clearance. Only positions change; the layout never
//! touches graph structure.

use std::collections::{BTreeMap, HashMap, VecDeque};

use uuid::Uuid;

use crate::graph;
use crate::model::{DependencyEdge, Goal, Point, Step};

/// Fixed node dimensions and gaps the canvas renders with.
pub const STEP_WIDTH: f64 = 180.0;
pub const STEP_HEIGHT: f64 = 40.0;
/// Horizontal gap between steps in the same layer.
pub const STEP_GAP: f64 = 30.0;
/// Vertical gap between layers.
pub const LAYER_GAP: f64 = 50.0;
/// Vertical clearance between the goal node and the first layer.
pub const GOAL_CLEARANCE: f64 = 80.0;
/// Horizontal offset from a goal's position to its visual center.
pub const GOAL_CENTER_OFFSET: f64 = 125.0;

/// Compute new positions for the steps of `goal`.
///
/// `steps` must be the goal's own steps; edges touching any other step are
/// ignored. Returns an empty map when the goal has no steps. The result is
/// deterministic for a fixed input: within a layer, steps keep creation
/// order (ties broken by id).
pub fn layout_goal_steps(
    goal: &Goal,
    steps: &[&Step],
    edges: &BTreeMap<Uuid, DependencyEdge>,
) -> BTreeMap<Uuid, Point> {
    if steps.is_empty() {
        return BTreeMap::new();
    }

    let step_ids: Vec<Uuid> = steps.iter().map(|s| s.id).collect();
    let relevant = graph::edges_within(edges, &step_ids);

    let layers = assign_layers(&step_ids, &relevant);

    // Group steps per layer in a stable order.
    let layer_count = layers.values().copied().max().unwrap_or(0) + 1;
    let mut rows: Vec<Vec<&Step>> = vec![Vec::new(); layer_count];
    let mut ordered: Vec<&Step> = steps.to_vec();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    for step in ordered {
        let layer = layers.get(&step.id).copied().unwrap_or(0);
        rows[layer].push(step);
    }

    // Lay rows out from a left margin of zero, then translate the whole
    // block so its center sits under the goal's center.
    let widest = rows
        .iter()
        .map(|row| row_width(row.len()))
        .fold(0.0, f64::max);

    let goal_center_x = goal.position.x + GOAL_CENTER_OFFSET;
    let offset_x = goal_center_x - widest / 2.0;
    let offset_y = goal.position.y + GOAL_CLEARANCE;

    let mut positions = BTreeMap::new();
    for (layer, row) in rows.iter().enumerate() {
        let row_offset_x = offset_x + (widest - row_width(row.len())) / 2.0;
        let y = offset_y + layer as f64 * (STEP_HEIGHT + LAYER_GAP);
        for (slot, step) in row.iter().enumerate() {
            let x = row_offset_x + slot as f64 * (STEP_WIDTH + STEP_GAP);
            positions.insert(step.id, Point::new(x, y));
        }
    }

    positions
}

/// Assign each step its longest-path distance from a step with no
/// prerequisites, walking a Kahn topological order.
fn assign_layers(step_ids: &[Uuid], edges: &[&DependencyEdge]) -> HashMap<Uuid, usize> {
    let mut in_degree: HashMap<Uuid, usize> = step_ids.iter().map(|&id| (id, 0)).collect();
    let mut adj: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for edge in edges {
        adj.entry(edge.source).or_default().push(edge.target);
        *in_degree.entry(edge.target).or_default() += 1;
    }

    let mut layers: HashMap<Uuid, usize> = HashMap::new();
    let mut queue: VecDeque<Uuid> = step_ids
        .iter()
        .copied()
        .filter(|id| in_degree[id] == 0)
        .collect();
    for &id in &queue {
        layers.insert(id, 0);
    }

    while let Some(id) = queue.pop_front() {
        let layer = layers[&id];
        if let Some(targets) = adj.get(&id) {
            for &target in targets {
                let entry = layers.entry(target).or_insert(0);
                *entry = (*entry).max(layer + 1);
                if let Some(deg) = in_degree.get_mut(&target) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }
    }

    layers
}

/// Total width of a layer with `n` steps.
fn row_width(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    n as f64 * STEP_WIDTH + (n - 1) as f64 * STEP_GAP
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StepStatus;
    use chrono::{Duration, Utc};

    fn make_goal(x: f64, y: f64) -> Goal {
        let now = Utc::now();
        Goal {
            id: Uuid::new_v4(),
            title: "goal".to_owned(),
            position: Point::new(x, y),
            collapsed: false,
            color: None,
            step_count: 0,
            completed_step_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_steps(goal: &Goal, n: usize) -> Vec<Step> {
        let base = Utc::now();
        (0..n)
            .map(|i| Step {
                id: Uuid::new_v4(),
                goal_id: goal.id,
                title: format!("step {i}"),
                status: StepStatus::Available,
                position: Point::new(0.0, 0.0),
                created_at: base + Duration::milliseconds(i as i64),
                updated_at: base,
            })
            .collect()
    }

    fn chain_edges(steps: &[Step], pairs: &[(usize, usize)]) -> BTreeMap<Uuid, DependencyEdge> {
        pairs
            .iter()
            .map(|&(s, t)| {
                let id = Uuid::new_v4();
                (
                    id,
                    DependencyEdge {
                        id,
                        source: steps[s].id,
                        target: steps[t].id,
                        created_at: Utc::now(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn empty_input_yields_no_positions() {
        let goal = make_goal(0.0, 0.0);
        assert!(layout_goal_steps(&goal, &[], &BTreeMap::new()).is_empty());
    }

    #[test]
    fn chain_ranks_top_down_with_isolated_step_in_first_layer() {
        // A -> B -> C plus isolated D.
        let goal = make_goal(100.0, 200.0);
        let steps = make_steps(&goal, 4);
        let edges = chain_edges(&steps, &[(0, 1), (1, 2)]);
        let refs: Vec<&Step> = steps.iter().collect();

        let positions = layout_goal_steps(&goal, &refs, &edges);

        let (a, b, c, d) = (
            positions[&steps[0].id],
            positions[&steps[1].id],
            positions[&steps[2].id],
            positions[&steps[3].id],
        );
        assert!(a.y < b.y, "prerequisite A must sit above B");
        assert!(b.y < c.y, "prerequisite B must sit above C");
        assert_eq!(a.y, d.y, "D has no prerequisites, same layer as A");
        assert!(
            (a.x - d.x).abs() >= STEP_WIDTH + STEP_GAP,
            "same-layer steps must not overlap"
        );
    }

    #[test]
    fn first_layer_sits_below_goal_clearance() {
        let goal = make_goal(40.0, -30.0);
        let steps = make_steps(&goal, 2);
        let edges = chain_edges(&steps, &[(0, 1)]);
        let refs: Vec<&Step> = steps.iter().collect();

        let positions = layout_goal_steps(&goal, &refs, &edges);
        assert_eq!(positions[&steps[0].id].y, goal.position.y + GOAL_CLEARANCE);
        assert_eq!(
            positions[&steps[1].id].y,
            goal.position.y + GOAL_CLEARANCE + STEP_HEIGHT + LAYER_GAP
        );
    }

    #[test]
    fn single_step_centers_under_goal() {
        let goal = make_goal(0.0, 0.0);
        let steps = make_steps(&goal, 1);
        let refs: Vec<&Step> = steps.iter().collect();

        let positions = layout_goal_steps(&goal, &refs, &BTreeMap::new());
        let p = positions[&steps[0].id];
        assert_eq!(p.x + STEP_WIDTH / 2.0, goal.position.x + GOAL_CENTER_OFFSET);
    }

    #[test]
    fn diamond_places_join_below_both_branches() {
        // A -> B, A -> C, B -> D, C -> D.
        let goal = make_goal(0.0, 0.0);
        let steps = make_steps(&goal, 4);
        let edges = chain_edges(&steps, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        let refs: Vec<&Step> = steps.iter().collect();

        let positions = layout_goal_steps(&goal, &refs, &edges);
        assert_eq!(positions[&steps[1].id].y, positions[&steps[2].id].y);
        assert!(positions[&steps[3].id].y > positions[&steps[1].id].y);
        assert!(
            (positions[&steps[1].id].x - positions[&steps[2].id].x).abs()
                >= STEP_WIDTH + STEP_GAP
        );
    }

    #[test]
    fn longest_path_wins_when_layers_conflict() {
        // A -> C and A -> B -> C: C must land below B, not beside it.
        let goal = make_goal(0.0, 0.0);
        let steps = make_steps(&goal, 3);
        let edges = chain_edges(&steps, &[(0, 2), (0, 1), (1, 2)]);
        let refs: Vec<&Step> = steps.iter().collect();

        let positions = layout_goal_steps(&goal, &refs, &edges);
        assert!(positions[&steps[1].id].y > positions[&steps[0].id].y);
        assert!(positions[&steps[2].id].y > positions[&steps[1].id].y);
    }

    #[test]
    fn layout_is_deterministic() {
        let goal = make_goal(5.0, 5.0);
        let steps = make_steps(&goal, 5);
        let edges = chain_edges(&steps, &[(0, 2), (1, 2), (2, 3), (2, 4)]);
        let refs: Vec<&Step> = steps.iter().collect();

        let first = layout_goal_steps(&goal, &refs, &edges);
        let second = layout_goal_steps(&goal, &refs, &edges);
        assert_eq!(first, second);
    }

    #[test]
    fn ignores_edges_touching_other_goals() {
        let goal = make_goal(0.0, 0.0);
        let steps = make_steps(&goal, 2);
        let other_goal = make_goal(500.0, 0.0);
        let outsider = make_steps(&other_goal, 1);

        let mut edges = chain_edges(&steps, &[]);
        let id = Uuid::new_v4();
        edges.insert(
            id,
            DependencyEdge {
                id,
                source: outsider[0].id,
                target: steps[0].id,
                created_at: Utc::now(),
            },
        );

        let refs: Vec<&Step> = steps.iter().collect();
        let positions = layout_goal_steps(&goal, &refs, &edges);
        // The foreign edge contributes no layering: both steps share layer 0.
        assert_eq!(positions[&steps[0].id].y, positions[&steps[1].id].y);
    }
}
