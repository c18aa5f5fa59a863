//! Append-only ledger of module runs

use crate::error::Result;
use crate::module::{now_timestamp, Module};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// One recorded module run. `metric` and `metrics` hold JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub module: String,
    pub date: String,
    pub status: bool,
    pub summary: String,
    pub metric: String,
    pub metrics: String,
}

impl HistoryRecord {
    /// Snapshot of a module's current results
    pub fn from_module(keyword: &str, module: &dyn Module) -> Result<Self> {
        Ok(Self {
            module: keyword.to_string(),
            date: now_timestamp(),
            status: module.status(),
            summary: module.summary(true),
            metric: serde_json::to_string(&module.primary_metric())?,
            metrics: serde_json::to_string(&module.metrics())?,
        })
    }
}

/// JSON array file of [`HistoryRecord`]s; appends rewrite the whole file
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a run of `module` under `keyword`
    pub fn append(&self, keyword: &str, module: &dyn Module) -> Result<HistoryRecord> {
        let record = HistoryRecord::from_module(keyword, module)?;
        self.push(record.clone())?;
        Ok(record)
    }

    pub fn push(&self, record: HistoryRecord) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut records = self.load()?;
        records.push(record);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(&records)?)?;
        std::fs::rename(&tmp, &self.path)?;

        info!("Saved history ({} records) to {}", records.len(), self.path.display());
        Ok(())
    }

    /// All records, or those of one module, in stored order
    pub fn read(&self, module: Option<&str>) -> Result<Vec<HistoryRecord>> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let records = self.load()?;
        Ok(match module {
            Some(filter) => records.into_iter().filter(|r| r.module == filter).collect(),
            None => records,
        })
    }

    fn load(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            debug!("No history at {}", self.path.display());
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn record(module: &str, date: &str) -> HistoryRecord {
        HistoryRecord {
            module: module.to_string(),
            date: date.to_string(),
            status: true,
            summary: format!("{module}: PASS"),
            metric: "1".to_string(),
            metrics: "{}".to_string(),
        }
    }

    #[test]
    fn test_missing_ledger_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        assert!(store.read(None).unwrap().is_empty());
    }

    #[test]
    fn test_append_keeps_order_and_filters() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join(".qualis/history.json"));
        store.push(record("cs", "2024-01-01 10:00:00")).unwrap();
        store.push(record("test", "2024-01-01 10:00:00")).unwrap();
        store.push(record("cs", "2024-01-01 10:00:00")).unwrap();

        let all = store.read(None).unwrap();
        let modules: Vec<&str> = all.iter().map(|r| r.module.as_str()).collect();
        assert_eq!(modules, vec!["cs", "test", "cs"]);

        let cs = store.read(Some("cs")).unwrap();
        assert_eq!(cs.len(), 2);
        assert!(store.read(Some("coverage")).unwrap().is_empty());
        assert!(!dir.path().join(".qualis/history.json.tmp").exists());
    }

    #[test]
    fn test_metric_fields_are_json_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path);
        let mut r = record("coverage", "2024-01-01 10:00:00");
        r.metric = "81.5".into();
        r.metrics = r#"{"coverage":81.5}"#.into();
        store.push(r).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["metric"], "81.5");
        assert_eq!(raw[0]["metrics"], r#"{"coverage":81.5}"#);
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(HistoryStore::new(dir.path().join("history.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store.push(record(&format!("m{i}"), "2024-01-01 10:00:00")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.read(None).unwrap().len(), 8);
    }
}
