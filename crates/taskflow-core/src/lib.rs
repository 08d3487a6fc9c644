//! Goal/step dependency graph engine for a visual planning canvas.
//!
//! The engine owns flat collections of goals, steps, and dependency edges
//! and keeps two invariants at all times: every step belongs to an
//! existing goal, and each goal's dependency edges form a DAG. Step lock
//! states and goal progress counts are derived caches, recomputed after
//! every mutation.
//!
//! Rendering, gesture handling, and storage are external collaborators:
//! the engine only produces immutable [`model::Snapshot`] values and
//! notifies observers when a new one is published.

pub mod graph;
pub mod layout;
pub mod model;
pub mod store;

pub use graph::validity::ConnectionError;
pub use model::{DependencyEdge, Goal, Point, Snapshot, Step, StepStatus, Viewport};
pub use store::GraphStore;
