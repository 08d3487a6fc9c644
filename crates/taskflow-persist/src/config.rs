use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Persistence configuration.
///
/// Reads from `TASKFLOW_SNAPSHOT_PATH` and `TASKFLOW_SAVE_DEBOUNCE_MS`,
/// falling back to a file in the working directory and a 300 ms debounce
/// when unset.
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// Path of the JSON snapshot file.
    pub path: PathBuf,
    /// Quiet interval before a scheduled snapshot is written.
    pub debounce: Duration,
}

impl PersistConfig {
    /// Default snapshot file name used when no environment variable is set.
    pub const DEFAULT_PATH: &str = "taskflow-canvas.json";

    /// Default debounce interval.
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

    /// Build a config from the environment.
    ///
    /// Priority: env vars, then the compile-time defaults. An unparseable
    /// debounce value falls back to the default rather than failing.
    pub fn from_env() -> Self {
        let path = env::var("TASKFLOW_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(Self::DEFAULT_PATH));
        let debounce = env::var("TASKFLOW_SAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|ms| ms.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_DEBOUNCE);
        Self { path, debounce }
    }

    /// Build a config from an explicit path (useful for tests and hosts
    /// that manage their own storage location).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: Self::DEFAULT_DEBOUNCE,
        }
    }

    /// Override the debounce interval.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
