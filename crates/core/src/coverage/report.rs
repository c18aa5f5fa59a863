//! ASCII coverage report built from a Clover dataset plus the files on disk

use super::clover::{CloverDataset, StatementMetrics};
use super::root::find_common_root;
use super::sloc::{CodeLineCounter, LineCounter};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

const RULE_WIDTH: usize = 64;
const BAR_WIDTH: usize = 10;
const MIN_NAME_WIDTH: usize = 10;
const MIN_LARGEST_COUNT: u64 = 2;

impl StatementMetrics {
    /// Covered percentage rounded to two decimals, 0 when there are no
    /// statements
    pub fn percentage(&self) -> f64 {
        percentage(self.covered_statements, self.statements)
    }
}

fn percentage(covered: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(covered as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregates per-file statement counts and renders the coverage report.
///
/// Single use: each `generate_*` call gathers into the same in-memory set.
pub struct CoverageReport {
    dataset: CloverDataset,
    ignore: Option<Regex>,
    extensions: Vec<String>,
    counter: Box<dyn LineCounter>,
    files: BTreeMap<String, StatementMetrics>,
    text: String,
}

impl std::fmt::Debug for CoverageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageReport")
            .field("ignore", &self.ignore)
            .field("extensions", &self.extensions)
            .field("files", &self.files.len())
            .finish()
    }
}

impl CoverageReport {
    pub fn new(dataset: CloverDataset) -> Self {
        Self {
            dataset,
            ignore: None,
            extensions: vec!["rs".to_string()],
            counter: Box::new(CodeLineCounter::new()),
            files: BTreeMap::new(),
            text: String::new(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(CloverDataset::load(path)?))
    }

    /// Paths matching any of these regular expressions are left out
    pub fn with_ignore_paths<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        let patterns: Vec<&str> = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.trim().is_empty())
            .collect();
        self.ignore = if patterns.is_empty() {
            None
        } else {
            Some(Regex::new(&patterns.join("|"))?)
        };
        Ok(self)
    }

    /// Extensions of source files discovered on disk
    pub fn with_extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    pub fn with_line_counter(mut self, counter: Box<dyn LineCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn dataset(&self) -> &CloverDataset {
        &self.dataset
    }

    /// Gathered entries keyed by absolute path
    pub fn files(&self) -> &BTreeMap<String, StatementMetrics> {
        &self.files
    }

    /// Accumulated report text
    pub fn text(&self) -> &str {
        &self.text
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.as_ref().is_some_and(|re| re.is_match(path))
    }

    /// Flatten every file node of the dataset into the path-keyed set.
    /// Returns `false` when the dataset has no project node.
    pub fn gather_file_metrics(&mut self) -> bool {
        if self.dataset.project.is_none() {
            return false;
        }

        let gathered: Vec<(String, StatementMetrics)> = self
            .dataset
            .files()
            .filter(|file| !self.is_ignored(&file.name))
            .map(|file| (file.name.clone(), file.metrics))
            .collect();
        self.files.extend(gathered);

        true
    }

    /// Generate the full report, inferring the root from the dataset's paths
    /// when none is given
    pub fn generate_report(&mut self, root: Option<&str>) -> String {
        self.gather_file_metrics();
        let root = match root {
            Some(root) => root.to_string(),
            None => {
                let names: Vec<&String> = self.files.keys().collect();
                find_common_root(&names)
            }
        };

        for file in self.discover_source_files(&root) {
            if file.contains("tests/") || self.is_ignored(&file) {
                continue;
            }
            if self.files.contains_key(&file) {
                continue;
            }

            let statements = match self.counter.count_file(Path::new(&file)) {
                Ok(count) => count,
                Err(e) => {
                    warn!("Failed to count lines in {}: {}", file, e);
                    0
                }
            };
            self.files.insert(
                file,
                StatementMetrics {
                    statements,
                    covered_statements: 0,
                },
            );
        }

        let rule = "-".repeat(RULE_WIDTH);
        self.add_title();
        self.append(&format!(
            "Coverage report generated {}",
            format_timestamp(self.dataset.timestamp())
        ));
        self.append(&format!("Root: {root}"));
        self.append(&rule);
        self.add_file_metrics(&root);
        self.append(&rule);
        self.append(&format!("Total Coverage: {}%", self.total_coverage()));
        self.append(&rule);

        self.text.clone()
    }

    /// Source files under `root`, never scanning from the filesystem root
    fn discover_source_files(&self, root: &str) -> Vec<String> {
        if root.is_empty() || root == "/" || root == "\\" {
            debug!("Skipping source discovery for root '{}'", root);
            return Vec::new();
        }

        let mut files: Vec<String> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| self.extensions.iter().any(|x| x == ext))
            })
            .map(|e| e.path().to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    fn add_title(&mut self) {
        let rule = "-".repeat(RULE_WIDTH);
        let title = self.dataset.title().unwrap_or("Coverage").to_string();
        self.append(&rule);
        self.append(&title);
        self.append(&rule);
    }

    fn add_file_metrics(&mut self, root: &str) {
        let rows: Vec<(String, StatementMetrics)> = self
            .files
            .iter()
            .map(|(name, metrics)| (relativize(name, root).to_string(), *metrics))
            .collect();

        let name_width = rows
            .iter()
            .map(|(name, _)| name.len())
            .fold(MIN_NAME_WIDTH, usize::max);
        let largest = rows
            .iter()
            .map(|(_, m)| m.statements)
            .fold(MIN_LARGEST_COUNT, u64::max);
        let count_width = largest.to_string().len();

        for (name, metrics) in rows {
            let percent = if metrics.statements == 0 {
                0
            } else {
                (metrics.covered_statements as f64 / metrics.statements as f64 * 100.0).round()
                    as u64
            };

            self.append(&format!(
                "{name:<name_width$} | {covered:>count_width$} / {total:>count_width$} | {percent:>3}%  {bar}",
                covered = metrics.covered_statements,
                total = metrics.statements,
                bar = bar(percent),
            ));
        }
    }

    /// Annotated listing of one source file with per-line execution counts.
    ///
    /// Returns `None` when the dataset is empty or has no entry for `file`;
    /// in the latter case a notice is left in [`CoverageReport::text`].
    pub fn generate_file_analysis(
        &mut self,
        file: &str,
        root: Option<&str>,
    ) -> Result<Option<String>> {
        self.gather_file_metrics();
        if self.files.is_empty() {
            return Ok(None);
        }

        let root = match root {
            Some(root) => root.to_string(),
            None => {
                let names: Vec<&String> = self.files.keys().collect();
                find_common_root(&names)
            }
        };

        let target = if self.files.contains_key(file) {
            file.to_string()
        } else {
            format!("{root}{file}")
        };

        if !self.files.contains_key(&target) {
            self.append(&format!(
                "No coverage information available\n for file {target}"
            ));
            return Ok(None);
        }

        let counts: HashMap<u64, u64> = self
            .dataset
            .find_file(&target)
            .map(|node| node.lines.iter().map(|l| (l.num, l.count)).collect())
            .unwrap_or_default();

        let source = std::fs::read_to_string(&target).map_err(|e| {
            Error::ReportSource(format!("Cannot read source file '{target}': {e}"))
        })?;

        for (index, line) in source.lines().enumerate() {
            let number = index as u64 + 1;
            let gutter = match counts.get(&number) {
                Some(count) => format!("{count:>8}"),
                None => " ".repeat(8),
            };
            self.append(&format!("{number:>5} {gutter} : {}", line.trim_end()));
        }

        Ok(Some(self.text.clone()))
    }

    /// Total over the gathered entries, rounded to two decimals
    pub fn total_coverage(&self) -> f64 {
        let (covered, total) = self
            .files
            .values()
            .fold((0, 0), |(covered, total), m| {
                (covered + m.covered_statements, total + m.statements)
            });
        percentage(covered, total)
    }

    /// Total from the dataset's own project metrics; ignore patterns and
    /// discovered files do not apply
    pub fn total_coverage_from_dataset(&self) -> f64 {
        self.dataset
            .project
            .as_ref()
            .and_then(|p| p.metrics)
            .map(|m| m.percentage())
            .unwrap_or(0.0)
    }

    fn append(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }
}

fn relativize<'a>(name: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return name;
    }
    name.strip_prefix(root).unwrap_or(name)
}

/// Ten-cell bar, one `*` per full 10%
fn bar(percent: u64) -> String {
    let filled = (percent / 10).min(BAR_WIDTH as u64) as usize;
    format!("[{:<BAR_WIDTH$}]", "*".repeat(filled))
}

fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| {
            dt.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}
