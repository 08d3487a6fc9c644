//! Snapshot persistence for the taskflow engine.
//!
//! Storage is a single JSON file written best-effort: loads tolerate
//! absent or corrupt data (treated as "no prior state"), and saves are
//! debounced, coalesced, and never surfaced to the engine as failures.
//! The engine stays storage-agnostic; the host wires [`DebouncedSaver`]
//! to the store as a snapshot observer.

pub mod config;
pub mod debounce;
pub mod file;

pub use config::PersistConfig;
pub use debounce::DebouncedSaver;
pub use file::{load_snapshot, save_snapshot};
