use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Progress status of a step.
///
/// `Locked` and `Available` are derived by propagation from the step's
/// prerequisites; `InProgress` and `Completed` are set by the user and are
/// never altered by propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Locked,
    Available,
    InProgress,
    Completed,
}

impl StepStatus {
    /// Whether this status was set by the user rather than derived.
    ///
    /// Manual statuses are sticky: propagation never downgrades a step the
    /// user has started or finished, even if a prerequisite regresses.
    pub fn is_manual(self) -> bool {
        matches!(self, Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Locked => "locked",
            Self::Available => "available",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

impl FromStr for StepStatus {
    type Err = StepStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(Self::Locked),
            "available" => Ok(Self::Available),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(StepStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`StepStatus`] string.
#[derive(Debug, Clone)]
pub struct StepStatusParseError(pub String);

impl fmt::Display for StepStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid step status: {:?}", self.0)
    }
}

impl std::error::Error for StepStatusParseError {}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pan/zoom state of the canvas. Opaque to the engine; carried through
/// snapshots so the consumer can restore its view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A top-level planning goal: a container for steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub position: Point,
    pub collapsed: bool,
    /// Optional accent color, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Derived: number of steps owned by this goal. Recomputed after every
    /// mutation; never set directly by callers.
    pub step_count: usize,
    /// Derived: number of owned steps with status `completed`.
    pub completed_step_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A unit of work belonging to exactly one goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    /// Owning goal. Immutable after creation; always references an existing
    /// goal (goal deletion cascades to its steps).
    pub goal_id: Uuid,
    pub title: String,
    pub status: StepStatus,
    pub position: Point,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A directed dependency between two steps of the same goal: `target`
/// cannot start until `source` is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub id: Uuid,
    /// The prerequisite step.
    pub source: Uuid,
    /// The dependent step.
    pub target: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full canvas state: flat id-keyed collections plus an optional
/// viewport.
///
/// Adjacency is implied by the edge list and rebuilt on demand; entities
/// never hold references to each other. `BTreeMap` keeps iteration order
/// deterministic, which makes propagation and layout deterministic for a
/// fixed input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub goals: BTreeMap<Uuid, Goal>,
    pub steps: BTreeMap<Uuid, Step>,
    pub edges: BTreeMap<Uuid, DependencyEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl Snapshot {
    /// Whether the snapshot contains no entities at all.
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty() && self.steps.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            StepStatus::Locked,
            StepStatus::Available,
            StepStatus::InProgress,
            StepStatus::Completed,
        ] {
            let parsed: StepStatus = status.to_string().parse().expect("should parse");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let err = "blocked".parse::<StepStatus>().unwrap_err();
        assert_eq!(err.0, "blocked");
    }

    #[test]
    fn status_serde_uses_snake_case() {
        let json = serde_json::to_string(&StepStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn manual_statuses() {
        assert!(StepStatus::InProgress.is_manual());
        assert!(StepStatus::Completed.is_manual());
        assert!(!StepStatus::Locked.is_manual());
        assert!(!StepStatus::Available.is_manual());
    }
}
