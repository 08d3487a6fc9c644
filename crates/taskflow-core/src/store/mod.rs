//! The graph store: canonical owner of goals, steps, and dependency edges.
//!
//! Every mutation clones the current snapshot, applies its structural
//! change, reruns the derivation passes (status propagation and goal
//! aggregates), then swaps the shared `Arc` and notifies observers. A
//! reader holding an `Arc<Snapshot>` never observes a partially applied
//! mutation.
//!
//! All operations are synchronous and run to completion; nothing here
//! blocks or awaits. A multi-threaded host must serialize mutation calls
//! behind a single writer to keep the atomicity contract.
//!
//! Failures are silent no-ops with a defined outcome: a missing id, an
//! empty title, or a rejected connection leaves the snapshot untouched and
//! is reported through the return value, never a panic.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::graph::propagate::{propagate_step_statuses, recompute_goal_aggregates};
use crate::graph::validity::{ConnectionError, check_connection};
use crate::layout::layout_goal_steps;
use crate::model::{DependencyEdge, Goal, Point, Snapshot, Step, StepStatus, Viewport};

/// Default title for a freshly created goal.
pub const DEFAULT_GOAL_TITLE: &str = "New Goal";
/// Default title for a freshly created step.
pub const DEFAULT_STEP_TITLE: &str = "New Step";
/// Vertical offset from a goal to its first step, and between stacked
/// siblings, when a step is created without a layout pass.
const NEW_STEP_OFFSET: f64 = 60.0;

/// Callback invoked with the new snapshot after every accepted mutation.
///
/// Observers are fire-and-forget side channels (a debounced saver, a
/// renderer refresh); a mutation never waits on them.
pub type SnapshotObserver = Box<dyn Fn(&Arc<Snapshot>) + Send + Sync>;

/// Owns the canonical snapshot and exposes all mutation operations.
pub struct GraphStore {
    snapshot: Arc<Snapshot>,
    observers: Vec<SnapshotObserver>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            observers: Vec::new(),
        }
    }

    /// Create a store seeded from a previously persisted snapshot.
    ///
    /// Derived state is recomputed from scratch, so drift in the persisted
    /// data (stale counts, stale lock states) is healed on load.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        store.hydrate(snapshot);
        store
    }

    /// The current snapshot. Cheap to clone and safe to hold across
    /// subsequent mutations.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Register an observer notified after every accepted mutation.
    pub fn subscribe(&mut self, observer: SnapshotObserver) {
        self.observers.push(observer);
    }

    /// Replace the entire state, sanitizing it first and rerunning the
    /// full derivation pass.
    ///
    /// Persisted data may be stale or hand-edited, so structural
    /// integrity is re-established before the snapshot is trusted: steps
    /// whose goal is missing are dropped, and every edge is re-admitted
    /// through the same connection check that gates
    /// [`Self::add_dependency`]. Dangling, duplicate, cross-goal, and
    /// cycle-closing edges are discarded, keeping the per-goal DAG
    /// invariant intact across loads.
    pub fn hydrate(&mut self, snapshot: Snapshot) {
        self.commit(sanitize(snapshot));
    }

    // -- goals --------------------------------------------------------------

    /// Create a goal with default title at `position`. Always succeeds.
    pub fn add_goal(&mut self, position: Point) -> Uuid {
        let now = Utc::now();
        let goal = Goal {
            id: Uuid::new_v4(),
            title: DEFAULT_GOAL_TITLE.to_owned(),
            position,
            collapsed: false,
            color: None,
            step_count: 0,
            completed_step_count: 0,
            created_at: now,
            updated_at: now,
        };
        let id = goal.id;

        let mut next = (*self.snapshot).clone();
        next.goals.insert(id, goal);
        self.commit(next);
        debug!(goal_id = %id, "goal added");
        id
    }

    /// Replace a goal's title. No-op (returning false) when the goal is
    /// missing or the title is empty or unchanged after trimming.
    pub fn update_goal_title(&mut self, id: Uuid, title: &str) -> bool {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self.snapshot.goals.get(&id) {
            None => return false,
            Some(goal) if goal.title == trimmed => return false,
            Some(_) => {}
        }

        let mut next = (*self.snapshot).clone();
        if let Some(goal) = next.goals.get_mut(&id) {
            goal.title = trimmed.to_owned();
            goal.updated_at = Utc::now();
        }
        self.commit(next);
        true
    }

    /// Delete a goal together with every step it owns and every edge
    /// touching one of those steps.
    pub fn delete_goal(&mut self, id: Uuid) -> bool {
        if !self.snapshot.goals.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        next.goals.remove(&id);
        let removed: HashSet<Uuid> = next
            .steps
            .values()
            .filter(|s| s.goal_id == id)
            .map(|s| s.id)
            .collect();
        next.steps.retain(|_, s| s.goal_id != id);
        next.edges
            .retain(|_, e| !removed.contains(&e.source) && !removed.contains(&e.target));
        self.commit(next);
        debug!(goal_id = %id, steps = removed.len(), "goal deleted");
        true
    }

    /// Flip a goal's collapsed flag. Display-only: hiding the steps of a
    /// collapsed goal (and edges touching them) is the consumer's job.
    pub fn toggle_goal_collapsed(&mut self, id: Uuid) -> bool {
        if !self.snapshot.goals.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        if let Some(goal) = next.goals.get_mut(&id) {
            goal.collapsed = !goal.collapsed;
            goal.updated_at = Utc::now();
        }
        self.commit(next);
        true
    }

    /// Set or clear a goal's accent color.
    pub fn set_goal_color(&mut self, id: Uuid, color: Option<String>) -> bool {
        if !self.snapshot.goals.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        if let Some(goal) = next.goals.get_mut(&id) {
            goal.color = color;
            goal.updated_at = Utc::now();
        }
        self.commit(next);
        true
    }

    /// Move a goal on the canvas. Positions only; the graph is untouched.
    pub fn move_goal(&mut self, id: Uuid, position: Point) -> bool {
        if !self.snapshot.goals.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        if let Some(goal) = next.goals.get_mut(&id) {
            goal.position = position;
        }
        self.commit(next);
        true
    }

    // -- steps --------------------------------------------------------------

    /// Create a step under `goal_id`, stacked below existing siblings so
    /// new steps do not overlap. Returns `None` when the goal is missing.
    pub fn add_step(&mut self, goal_id: Uuid) -> Option<Uuid> {
        let goal = self.snapshot.goals.get(&goal_id)?;

        let siblings = self
            .snapshot
            .steps
            .values()
            .filter(|s| s.goal_id == goal_id)
            .count();
        let position = Point::new(
            goal.position.x,
            goal.position.y + NEW_STEP_OFFSET * (siblings as f64 + 1.0),
        );

        let now = Utc::now();
        let step = Step {
            id: Uuid::new_v4(),
            goal_id,
            title: DEFAULT_STEP_TITLE.to_owned(),
            status: StepStatus::Available,
            position,
            created_at: now,
            updated_at: now,
        };
        let id = step.id;

        let mut next = (*self.snapshot).clone();
        next.steps.insert(id, step);
        self.commit(next);
        debug!(step_id = %id, goal_id = %goal_id, "step added");
        Some(id)
    }

    /// Replace a step's title, with the same trim/unchanged rule as goal
    /// titles.
    pub fn update_step_title(&mut self, id: Uuid, title: &str) -> bool {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self.snapshot.steps.get(&id) {
            None => return false,
            Some(step) if step.title == trimmed => return false,
            Some(_) => {}
        }

        let mut next = (*self.snapshot).clone();
        if let Some(step) = next.steps.get_mut(&id) {
            step.title = trimmed.to_owned();
            step.updated_at = Utc::now();
        }
        self.commit(next);
        true
    }

    /// Set a step's status directly. The assignment always wins over the
    /// propagation pass for this step; other steps are re-derived.
    pub fn update_step_status(&mut self, id: Uuid, status: StepStatus) -> bool {
        if !self.snapshot.steps.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        if let Some(step) = next.steps.get_mut(&id) {
            step.status = status;
            step.updated_at = Utc::now();
        }
        self.commit_preserving(next, id);
        true
    }

    /// Advance a step along the manual cycle
    /// available -> in_progress -> completed -> available. Locked steps
    /// (and missing ids) refuse; returns the new status otherwise.
    pub fn advance_step_status(&mut self, id: Uuid) -> Option<StepStatus> {
        let current = self.snapshot.steps.get(&id)?.status;
        let advanced = match current {
            StepStatus::Locked => return None,
            StepStatus::Available => StepStatus::InProgress,
            StepStatus::InProgress => StepStatus::Completed,
            StepStatus::Completed => StepStatus::Available,
        };
        self.update_step_status(id, advanced);
        Some(advanced)
    }

    /// Delete a step and every edge touching it.
    pub fn delete_step(&mut self, id: Uuid) -> bool {
        if !self.snapshot.steps.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        next.steps.remove(&id);
        next.edges.retain(|_, e| e.source != id && e.target != id);
        self.commit(next);
        debug!(step_id = %id, "step deleted");
        true
    }

    /// Move a step on the canvas. Positions only.
    pub fn move_step(&mut self, id: Uuid, position: Point) -> bool {
        if !self.snapshot.steps.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        if let Some(step) = next.steps.get_mut(&id) {
            step.position = position;
        }
        self.commit(next);
        true
    }

    // -- edges --------------------------------------------------------------

    /// Add a dependency edge after the full connection check: `target`
    /// cannot start until `source` is completed.
    pub fn add_dependency(&mut self, source: Uuid, target: Uuid) -> Result<Uuid, ConnectionError> {
        check_connection(&self.snapshot, source, target)?;

        let edge = DependencyEdge {
            id: Uuid::new_v4(),
            source,
            target,
            created_at: Utc::now(),
        };
        let id = edge.id;

        let mut next = (*self.snapshot).clone();
        next.edges.insert(id, edge);
        self.commit(next);
        debug!(edge_id = %id, source = %source, target = %target, "dependency added");
        Ok(id)
    }

    /// Delete a dependency edge.
    pub fn delete_edge(&mut self, id: Uuid) -> bool {
        if !self.snapshot.edges.contains_key(&id) {
            return false;
        }

        let mut next = (*self.snapshot).clone();
        next.edges.remove(&id);
        self.commit(next);
        true
    }

    /// Read-only preview of [`Self::add_dependency`]: true iff the same
    /// call would succeed against the current snapshot. Callers use it to
    /// gate interactive edge creation before committing.
    pub fn is_valid_connection(&self, source: Uuid, target: Uuid) -> bool {
        check_connection(&self.snapshot, source, target).is_ok()
    }

    // -- layout & viewport --------------------------------------------------

    /// Run the layout engine for one goal's steps, applying position
    /// updates only. No-op when the goal is missing or has no steps.
    pub fn request_layout(&mut self, goal_id: Uuid) -> bool {
        let Some(goal) = self.snapshot.goals.get(&goal_id) else {
            return false;
        };
        let steps: Vec<&Step> = self
            .snapshot
            .steps
            .values()
            .filter(|s| s.goal_id == goal_id)
            .collect();
        if steps.is_empty() {
            return false;
        }

        let positions = layout_goal_steps(goal, &steps, &self.snapshot.edges);

        let mut next = (*self.snapshot).clone();
        for (id, position) in positions {
            if let Some(step) = next.steps.get_mut(&id) {
                step.position = position;
            }
        }
        self.commit(next);
        debug!(goal_id = %goal_id, "layout applied");
        true
    }

    /// Store the consumer's pan/zoom state so it persists with the graph.
    /// Published without a derivation pass: the viewport cannot change
    /// graph state.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        let mut next = (*self.snapshot).clone();
        next.viewport = Some(viewport);
        self.publish(next);
    }

    // -- internal -----------------------------------------------------------

    /// Rerun derivation on `next`, publish it, and notify observers.
    fn commit(&mut self, mut next: Snapshot) {
        propagate_step_statuses(&mut next.steps, &next.edges);
        recompute_goal_aggregates(&mut next.goals, &next.steps);
        self.publish(next);
    }

    /// Like [`Self::commit`], but the directly assigned status of `pinned`
    /// wins over whatever propagation would infer for it.
    fn commit_preserving(&mut self, mut next: Snapshot, pinned: Uuid) {
        let kept = next.steps.get(&pinned).map(|s| s.status);
        propagate_step_statuses(&mut next.steps, &next.edges);
        if let (Some(status), Some(step)) = (kept, next.steps.get_mut(&pinned)) {
            step.status = status;
        }
        recompute_goal_aggregates(&mut next.goals, &next.steps);
        self.publish(next);
    }

    fn publish(&mut self, next: Snapshot) {
        self.snapshot = Arc::new(next);
        for observer in &self.observers {
            observer(&self.snapshot);
        }
    }
}

/// Re-establish structural integrity on a loaded snapshot.
///
/// Orphaned steps go first, then each edge is re-admitted through
/// [`check_connection`] against the snapshot built so far, in stable id
/// order. Whatever that check would have rejected at mutation time is
/// dropped now.
fn sanitize(snapshot: Snapshot) -> Snapshot {
    let Snapshot {
        goals,
        mut steps,
        edges,
        viewport,
    } = snapshot;

    let orphans: Vec<Uuid> = steps
        .values()
        .filter(|s| !goals.contains_key(&s.goal_id))
        .map(|s| s.id)
        .collect();
    for id in &orphans {
        warn!(step_id = %id, "dropping step with missing goal from loaded snapshot");
    }
    steps.retain(|_, s| goals.contains_key(&s.goal_id));

    let mut clean = Snapshot {
        goals,
        steps,
        edges: std::collections::BTreeMap::new(),
        viewport,
    };
    for (id, edge) in edges {
        match check_connection(&clean, edge.source, edge.target) {
            Ok(()) => {
                clean.edges.insert(id, edge);
            }
            Err(err) => {
                warn!(edge_id = %id, %err, "dropping invalid edge from loaded snapshot");
            }
        }
    }

    clean
}
