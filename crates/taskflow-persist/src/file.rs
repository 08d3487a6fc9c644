//! JSON snapshot file codec.
//!
//! Loading is tolerant: an absent, unreadable, or corrupt file yields
//! `None` so startup always proceeds from an empty canvas. Saving goes
//! through a sibling temp file and an atomic rename so a crash mid-write
//! never leaves a torn snapshot behind.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use taskflow_core::Snapshot;

/// Load a snapshot from `path`.
///
/// Returns `None` when the file does not exist or cannot be decoded;
/// decode failures are logged and treated as "no prior state".
pub fn load_snapshot(path: &Path) -> Option<Snapshot> {
    if !path.exists() {
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot unreadable, starting empty");
            return None;
        }
    };

    match serde_json::from_str::<Snapshot>(&raw) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            warn!(path = %path.display(), %err, "snapshot corrupt, starting empty");
            None
        }
    }
}

/// Serialize `snapshot` to `path` atomically (temp file + rename).
pub fn save_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("failed to encode snapshot")?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .with_context(|| format!("failed to write snapshot temp file {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into place at {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_snapshot(&dir.path().join("absent.json")).is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json ][").expect("write");
        assert!(load_snapshot(&path).is_none());
    }

    #[test]
    fn schema_mismatch_loads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wrong.json");
        fs::write(&path, r#"{"goals": "not a map"}"#).expect("write");
        assert!(load_snapshot(&path).is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("canvas.json");

        let snapshot = Snapshot::default();
        save_snapshot(&path, &snapshot).expect("save");
        let loaded = load_snapshot(&path).expect("load");
        assert_eq!(loaded, snapshot);
    }
}
