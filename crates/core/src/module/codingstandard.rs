//! Codingstandard module: lint diagnostics weighed against the code size

use super::{
    ensure_dir, exit_code, metrics_table, read_artifact, save_timestamp, timeout_setting,
    write_artifact, Metrics, Module, ModuleContext, ModuleFactory,
};
use crate::args::Args;
use crate::config::ModuleSettings;
use crate::coverage::{CodeLineCounter, LineCounter};
use crate::error::{Error, Result};
use crate::process::{split_args, ToolCommand};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use walkdir::WalkDir;

const OUTPUT_DIR: &str = "codingstandard";
const RESULTS_FILE: &str = "results.json";
const TOTALS_FILE: &str = "totals.json";
const PASSING_ERROR_LEVEL: f64 = 3.0;

/// One diagnostic reported by the linter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: u64,
    pub column: u64,
    pub severity: String,
    pub message: String,
    pub code: Option<String>,
}

/// Aggregate numbers saved after each run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub date: String,
    pub sloc: u64,
    pub errors: u64,
    pub warnings: u64,
    pub error_level: f64,
}

/// Weighted share of flagged lines: a warning counts half an error.
/// Rounded to two decimals, 0 for an empty code base.
pub fn calculate_error_level(errors: u64, warnings: u64, sloc: u64) -> f64 {
    if sloc == 0 {
        return 0.0;
    }
    let points = errors as f64 + warnings as f64 / 2.0;
    (points / sloc as f64 * 100.0 * 100.0).round() / 100.0
}

/// Pull `compiler-message` records out of cargo's JSON message stream.
/// Diagnostics without a primary span (summaries like "aborting due to
/// previous error") are dropped.
pub fn parse_diagnostics(stream: &str) -> Vec<Diagnostic> {
    stream
        .lines()
        .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .filter(|record| record["reason"] == "compiler-message")
        .filter_map(|record| {
            let message = &record["message"];
            let severity = message["level"].as_str()?;
            if severity != "error" && severity != "warning" {
                return None;
            }
            let span = message["spans"]
                .as_array()?
                .iter()
                .find(|span| span["is_primary"].as_bool().unwrap_or(false))?;
            Some(Diagnostic {
                file: span["file_name"].as_str()?.to_string(),
                line: span["line_start"].as_u64().unwrap_or(0),
                column: span["column_start"].as_u64().unwrap_or(0),
                severity: severity.to_string(),
                message: message["message"].as_str().unwrap_or_default().to_string(),
                code: message["code"]["code"].as_str().map(String::from),
            })
        })
        .collect()
}

pub struct Codingstandard {
    context: ModuleContext,
    bin: String,
    args: Vec<String>,
    paths: Vec<PathBuf>,
    ignore: Option<Regex>,
    timeout: Option<Duration>,
    output_dir: PathBuf,
}

impl Codingstandard {
    pub fn new(context: &ModuleContext, settings: &ModuleSettings) -> Result<Self> {
        let ignore = match settings.get_list("ignore") {
            patterns if patterns.is_empty() => None,
            patterns => Some(Regex::new(&patterns.join("|"))?),
        };
        let paths = match settings.get_non_blank("path") {
            Some(path) => parse_paths(context.paths.project_root(), path),
            None => vec![context.paths.project_root().to_path_buf()],
        };

        Ok(Self {
            context: context.clone(),
            bin: settings.get_non_blank("bin").unwrap_or("cargo").to_string(),
            args: split_args(
                settings
                    .get_non_blank("args")
                    .unwrap_or("clippy --message-format=json"),
            ),
            paths,
            ignore,
            timeout: timeout_setting(settings),
            output_dir: context.paths.module_dir(OUTPUT_DIR),
        })
    }

    pub fn totals(&self) -> Option<Totals> {
        read_artifact(&self.output_dir.join(TOTALS_FILE))
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        read_artifact(&self.output_dir.join(RESULTS_FILE)).unwrap_or_default()
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore
            .as_ref()
            .is_some_and(|re| re.is_match(&path.to_string_lossy()))
    }

    /// Logical lines of code of the `.rs` files under the given paths
    pub fn count_sloc(&self, paths: &[PathBuf]) -> u64 {
        let counter = CodeLineCounter::new();
        let mut total = 0;
        let mut filtered = 0;
        for path in paths {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                let file = entry.path();
                if !entry.file_type().is_file()
                    || file.extension().and_then(|e| e.to_str()) != Some("rs")
                {
                    continue;
                }
                if self.is_ignored(file) {
                    filtered += 1;
                    continue;
                }
                match counter.count_file(file) {
                    Ok(lines) => total += lines,
                    Err(e) => warn!("Failed to count lines in {}: {}", file.display(), e),
                }
            }
        }
        debug!("Counted {} lines of code, filtered {} files", total, filtered);
        total
    }

    fn run_linter(&self, paths: &[PathBuf], out: &mut dyn Write) -> Result<Totals> {
        let output = ToolCommand::new(&self.bin, self.args.clone())
            .with_working_dir(self.context.paths.project_root())
            .with_timeout(self.timeout)
            .run()?;

        let diagnostics: Vec<Diagnostic> = parse_diagnostics(&output.stdout)
            .into_iter()
            .filter(|d| !self.is_ignored(Path::new(&d.file)))
            .collect();
        if diagnostics.is_empty() && !output.success() {
            write!(out, "{}", output.stderr)?;
        }
        write_artifact(&self.output_dir.join(RESULTS_FILE), &diagnostics)?;

        let count = |severity: &str| {
            diagnostics
                .iter()
                .filter(|d| d.severity == severity)
                .count() as u64
        };
        let (errors, warnings) = (count("error"), count("warning"));
        let sloc = self.count_sloc(paths);

        let totals = Totals {
            date: save_timestamp(&self.output_dir)?,
            sloc,
            errors,
            warnings,
            error_level: calculate_error_level(errors, warnings, sloc),
        };
        write_artifact(&self.output_dir.join(TOTALS_FILE), &totals)?;
        Ok(totals)
    }

    /// Per-file error and warning counts of the last run
    fn show_list(&self, out: &mut dyn Write) -> Result<i32> {
        let mut counts: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for diagnostic in self.diagnostics() {
            let entry = counts.entry(diagnostic.file).or_default();
            match diagnostic.severity.as_str() {
                "error" => entry.0 += 1,
                _ => entry.1 += 1,
            }
        }

        let mut table = crate::output::table(["file", "errors", "warnings"]);
        for (file, (errors, warnings)) in counts {
            table.add_row(vec![file, errors.to_string(), warnings.to_string()]);
        }
        writeln!(out, "{table}")?;
        Ok(exit_code::BENIGN)
    }
}

/// Comma separated list of paths relative to `root`; missing ones are dropped
fn parse_paths(root: &Path, list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| root.join(p).canonicalize().ok())
        .collect()
}

impl Module for Codingstandard {
    fn name(&self) -> &str {
        "Codingstandard"
    }

    fn initialize(&mut self) -> Result<()> {
        ensure_dir(&self.output_dir)
    }

    fn execute(&self, args: &Args, out: &mut dyn Write) -> Result<i32> {
        self.context
            .progress(out, "\nRunning Codingstandard module task...\n")?;

        if args.flag("list") {
            return self.show_list(out);
        }

        let paths = match args.arg(0) {
            Some(arg) => {
                let paths = parse_paths(self.context.paths.project_root(), arg);
                if paths.is_empty() {
                    return Err(Error::halt(format!("Path `{arg}' not found."), exit_code::HALT));
                }
                paths
            }
            None => self.paths.clone(),
        };

        self.context.progress(out, "Linting code...")?;
        let totals = self.run_linter(&paths, out)?;
        self.context.progress(out, "done.\n")?;

        self.context
            .progress(out, "\nCompleted Codingstandard module task.\n")?;
        debug!(
            "{} errors, {} warnings over {} lines",
            totals.errors, totals.warnings, totals.sloc
        );
        writeln!(out, "{}", self.summary(false))?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Run coding standard validation report (clippy)".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: cs [OPTIONS] [path]\n\
             By default this will lint the default project path(s).\n\
             You can specify a path to count lines for a certain file, directory or\n\
             comma separated list of directories\n\n\
             Valid Options:\n  --list : Show list of files with diagnostics\n",
            self.help()
        )
    }

    fn status(&self) -> bool {
        self.totals()
            .is_some_and(|t| t.error_level < PASSING_ERROR_LEVEL)
    }

    fn summary(&self, short: bool) -> String {
        let metrics = self.metrics();
        if short {
            return match self.totals() {
                Some(totals) => format!("Codingstandard error level: {}%", totals.error_level),
                None => "Codingstandard: No data.".to_string(),
            };
        }
        if metrics.is_empty() {
            "Codingstandard results:\nNo results.".to_string()
        } else {
            format!("Codingstandard results:\n{}", metrics_table(&metrics))
        }
    }

    fn metrics(&self) -> Metrics {
        let Some(totals) = self.totals() else {
            return Metrics::new();
        };
        let mut metrics = Metrics::new();
        metrics.insert("sloc".into(), totals.sloc.into());
        metrics.insert("errors".into(), totals.errors.into());
        metrics.insert("warnings".into(), totals.warnings.into());
        metrics.insert("error_level".into(), serde_json::json!(totals.error_level));
        metrics
    }

    fn primary_metric(&self) -> serde_json::Value {
        match self.totals() {
            Some(totals) => serde_json::json!(100.0 - totals.error_level),
            None => serde_json::json!(0.0),
        }
    }
}

pub struct CodingstandardFactory;

impl ModuleFactory for CodingstandardFactory {
    fn class(&self) -> &'static str {
        "Codingstandard"
    }

    fn create(
        &self,
        context: &ModuleContext,
        settings: &ModuleSettings,
    ) -> Result<Box<dyn Module>> {
        Ok(Box::new(Codingstandard::new(context, settings)?))
    }

    fn default_config(&self) -> String {
        [
            "# Lint the code base and weigh diagnostics against its size",
            "[modules.codingstandard]",
            "command = \"cs\"",
            "class = \"Codingstandard\"",
            "bin = \"cargo\"",
            "args = \"clippy --message-format=json\"",
            "path = \".\"",
            "ignore = \"target\"",
            "",
        ]
        .join("\n")
    }
}
