//! Pluggable analysis modules and their registry

pub mod analysis;
pub mod codingstandard;
pub mod coverage;
pub mod registry;

use crate::args::Args;
use crate::config::{ModuleSettings, ProjectPaths};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

pub use analysis::{Analysis, AnalysisFactory};
pub use codingstandard::{Codingstandard, CodingstandardFactory};
pub use coverage::{Coverage, CoverageFactory};
pub use registry::ModuleRegistry;
pub use test::{Test, TestFactory};

/// Process and module return codes
pub mod exit_code {
    /// The run completed; history is recorded for modules
    pub const SUCCESS: i32 = 0;
    pub const ERROR: i32 = 1;
    /// Default status for a halt that names no status of its own
    pub const HALT: i32 = 2;
    /// Informational output such as listings; not a recorded run
    pub const BENIGN: i32 = 8;
    pub const USAGE: i32 = 64;
    pub const TIMEOUT: i32 = 124;
}

/// Full metric map reported by a module
pub type Metrics = BTreeMap<String, serde_json::Value>;

/// What every module receives at construction time
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub paths: ProjectPaths,
    /// Suppress progress chatter such as "Running coverage module task..."
    pub quiet: bool,
}

impl ModuleContext {
    pub fn new(paths: ProjectPaths) -> Self {
        Self {
            paths,
            quiet: false,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Write progress text unless running quietly
    pub fn progress(&self, out: &mut dyn Write, text: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        write!(out, "{text}")
    }
}

/// An analysis unit bound to a command keyword.
///
/// `execute` reports whether the run itself worked (its return code), while
/// `status` reports the verdict of the analysis.
pub trait Module {
    /// Implementation name shown by the `modules` command
    fn name(&self) -> &str;

    /// Called once right after construction
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn execute(&self, args: &Args, out: &mut dyn Write) -> Result<i32>;

    /// One-line description
    fn help(&self) -> String;

    fn extended_help(&self) -> String;

    /// Pass/fail verdict of the most recent run
    fn status(&self) -> bool;

    fn summary(&self, short: bool) -> String;

    fn metrics(&self) -> Metrics;

    /// The single number tracked in history
    fn primary_metric(&self) -> serde_json::Value;
}

/// Builds a module implementation by class name
pub trait ModuleFactory: Send + Sync {
    fn class(&self) -> &'static str;

    fn create(&self, context: &ModuleContext, settings: &ModuleSettings)
        -> Result<Box<dyn Module>>;

    /// Settings block written by `init`
    fn default_config(&self) -> String;
}

/// Timestamp format shared by history records and `lastrun` files
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn now_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Write the `lastrun` marker into a module's artifact directory
pub(crate) fn save_timestamp(dir: &Path) -> Result<String> {
    let stamp = now_timestamp();
    std::fs::write(dir.join("lastrun"), &stamp)?;
    Ok(stamp)
}

pub(crate) fn read_timestamp(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join("lastrun"))
        .ok()
        .map(|s| s.trim().to_string())
}

/// Create a module's artifact directory under the state dir
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        debug!("Creating {}", dir.display());
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

pub(crate) fn write_artifact<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a JSON artifact left by a previous run; absent or unreadable
/// artifacts mean there is no data yet
pub(crate) fn read_artifact<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring malformed artifact {}: {}", path.display(), e);
            None
        }
    }
}

/// One-row table of metric names over their values
pub(crate) fn metrics_table(metrics: &Metrics) -> String {
    let mut table = crate::output::table(metrics.keys().cloned());
    table.add_row(
        metrics
            .values()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<String>>(),
    );
    table.to_string()
}

pub(crate) fn timeout_setting(settings: &ModuleSettings) -> Option<Duration> {
    settings.get_u64("timeout").map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_timestamp_roundtrip_through_lastrun() {
        let dir = TempDir::new().unwrap();
        let stamp = save_timestamp(dir.path()).unwrap();
        assert_eq!(read_timestamp(dir.path()), Some(stamp));
    }

    #[test]
    fn test_read_artifact_tolerates_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("totals.json");
        assert_eq!(read_artifact::<Metrics>(&path), None);

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(read_artifact::<Metrics>(&path), None);
    }

    #[test]
    fn test_metrics_table_lists_names_and_values() {
        let mut metrics = Metrics::new();
        metrics.insert("errors".into(), serde_json::json!(2));
        metrics.insert("level".into(), serde_json::json!("1.5%"));
        let rendered = metrics_table(&metrics);
        assert!(rendered.contains("errors"));
        assert!(rendered.contains("1.5%"));
        assert!(!rendered.contains('"'));
    }

    #[test]
    fn test_timeout_setting() {
        let settings = ModuleSettings::new().with("timeout", "30");
        assert_eq!(timeout_setting(&settings), Some(Duration::from_secs(30)));
        assert_eq!(timeout_setting(&ModuleSettings::new()), None);
    }
}
