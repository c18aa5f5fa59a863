//! Analysis module: static analysis findings at a chosen lint strictness,
//! checked against an error budget

use super::codingstandard::{parse_diagnostics, Diagnostic};
use super::{
    ensure_dir, exit_code, metrics_table, read_artifact, read_timestamp, save_timestamp,
    timeout_setting, write_artifact, Metrics, Module, ModuleContext, ModuleFactory,
};
use crate::args::Args;
use crate::config::ModuleSettings;
use crate::error::{Error, Result};
use crate::output::table;
use crate::process::{split_args, ToolCommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

const OUTPUT_DIR: &str = "analysis";
const RESULTS_FILE: &str = "results.json";
const PASSING_SCORE: f64 = 25.0;

/// Lint groups switched on at each level, with the text shown by `--explain`.
/// Every level includes the groups of the levels below it.
const LEVELS: &[(&str, &[&str])] = &[
    (
        "default clippy groups: correctness, suspicious, style, complexity\n   and perf",
        &[],
    ),
    ("pedantic lints: stricter idioms, casts and docs", &["clippy::pedantic"]),
    (
        "nursery lints: newer checks that may still have false positives",
        &["clippy::pedantic", "clippy::nursery"],
    ),
    (
        "cargo lints: manifest metadata and duplicate dependencies",
        &["clippy::pedantic", "clippy::nursery", "clippy::cargo"],
    ),
    (
        "panics: unwrap, expect and explicit panic calls",
        &[
            "clippy::pedantic",
            "clippy::nursery",
            "clippy::cargo",
            "clippy::unwrap_used",
            "clippy::expect_used",
            "clippy::panic",
        ],
    ),
];

/// One finding at a line of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub line: u64,
    pub message: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFindings {
    pub errors: u64,
    pub messages: Vec<Finding>,
}

/// Saved results of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub date: String,
    pub level: u64,
    pub errors: u64,
    pub files: BTreeMap<String, FileFindings>,
}

impl AnalysisResults {
    /// Group diagnostics by file; every warning or error is one finding
    pub fn from_diagnostics(diagnostics: Vec<Diagnostic>, level: u64, date: String) -> Self {
        let mut files: BTreeMap<String, FileFindings> = BTreeMap::new();
        for diagnostic in diagnostics {
            let entry = files.entry(diagnostic.file).or_default();
            entry.errors += 1;
            entry.messages.push(Finding {
                line: diagnostic.line,
                message: diagnostic.message,
                code: diagnostic.code,
            });
        }
        let errors = files.values().map(|f| f.errors).sum();
        Self {
            date,
            level,
            errors,
            files,
        }
    }

    /// 100 for a clean run, otherwise `100 / errors` rounded to two decimals
    pub fn error_score(&self) -> f64 {
        if self.errors == 0 {
            return 100.0;
        }
        (100.0 / self.errors as f64 * 100.0).round() / 100.0
    }
}

pub struct Analysis {
    context: ModuleContext,
    bin: String,
    args: Vec<String>,
    paths: Vec<String>,
    level: u64,
    max_errors: Option<u64>,
    timeout: Option<Duration>,
    output_dir: PathBuf,
}

impl Analysis {
    pub fn new(context: &ModuleContext, settings: &ModuleSettings) -> Self {
        let paths = match settings.get_list("paths") {
            paths if paths.is_empty() => vec!["src".to_string()],
            paths => paths,
        };
        Self {
            context: context.clone(),
            bin: settings.get_non_blank("bin").unwrap_or("cargo").to_string(),
            args: split_args(
                settings
                    .get_non_blank("args")
                    .unwrap_or("clippy --message-format=json"),
            ),
            paths,
            level: settings.get_u64("level").unwrap_or(0),
            max_errors: settings.get_u64("max_errors"),
            timeout: timeout_setting(settings),
            output_dir: context.paths.module_dir(OUTPUT_DIR),
        }
    }

    pub fn results(&self) -> Option<AnalysisResults> {
        read_artifact(&self.output_dir.join(RESULTS_FILE))
    }

    fn require_results(&self) -> Result<AnalysisResults> {
        self.results().ok_or_else(|| {
            Error::ReportSource(format!(
                "File '{}' not found. Run the analysis module first.",
                self.output_dir.join(RESULTS_FILE).display()
            ))
        })
    }

    /// Whether a reported file lies under one of the analyzed paths
    fn in_scope(&self, file: &str) -> bool {
        let file = file.trim_start_matches("./");
        self.paths.iter().any(|path| {
            let path = path.trim_start_matches("./").trim_end_matches('/');
            path.is_empty()
                || path == "."
                || file == path
                || file.starts_with(&format!("{path}/"))
        })
    }

    /// Tool arguments with the lint groups of `level` appended
    pub fn command_args(&self, level: u64) -> Vec<String> {
        let mut args = self.args.clone();
        let lints = level_lints(level);
        if lints.is_empty() {
            return args;
        }
        if !args.iter().any(|a| a == "--") {
            args.push("--".to_string());
        }
        for lint in lints {
            args.push("-W".to_string());
            args.push(lint.to_string());
        }
        args
    }

    fn command(&self, args: Vec<String>) -> ToolCommand {
        ToolCommand::new(&self.bin, args)
            .with_working_dir(self.context.paths.project_root())
            .with_timeout(self.timeout)
    }

    fn analyze(&self, level: u64) -> Result<AnalysisResults> {
        let output = self.command(self.command_args(level)).run()?;
        let diagnostics: Vec<Diagnostic> = parse_diagnostics(&output.stdout)
            .into_iter()
            .filter(|d| self.in_scope(&d.file))
            .collect();
        if diagnostics.is_empty() && !output.success() {
            warn!("Analysis tool exited with {:?} and reported nothing", output.code);
        }

        let date = save_timestamp(&self.output_dir)?;
        let results = AnalysisResults::from_diagnostics(diagnostics, level, date);
        write_artifact(&self.output_dir.join(RESULTS_FILE), &results)?;
        debug!("Analysis found {} errors at level {}", results.errors, level);
        Ok(results)
    }

    /// Human readable tool output, nothing is saved
    fn run_raw(&self, level: u64, out: &mut dyn Write) -> Result<i32> {
        let args = self
            .command_args(level)
            .into_iter()
            .filter(|a| !a.starts_with("--message-format"))
            .collect();
        let output = self.command(args).run()?;
        write!(out, "{}{}", output.stdout, output.stderr)?;
        Ok(exit_code::BENIGN)
    }

    fn show_results(&self, out: &mut dyn Write) -> Result<i32> {
        let results = self.require_results()?;

        let mut rows = table(["", "File:Line", "Message"]);
        let mut index = 1;
        for (file, findings) in &results.files {
            for finding in &findings.messages {
                rows.add_row(vec![
                    index.to_string(),
                    format!("{file}:{}", finding.line),
                    finding.message.clone(),
                ]);
                index += 1;
            }
        }

        writeln!(out, "Last run: {}", self.last_run())?;
        writeln!(out, "Level: {}", results.level)?;
        writeln!(out, "{rows}")?;
        writeln!(out, "Total errors: {}", results.errors)?;
        writeln!(
            out,
            "\nUse `qualis analysis --file=<filename>` to show results per file."
        )?;
        Ok(exit_code::BENIGN)
    }

    fn show_file(&self, file: &str, out: &mut dyn Write) -> Result<i32> {
        let results = self.require_results()?;
        let needle = file.trim();
        let found: Vec<(&String, &FileFindings)> = results
            .files
            .iter()
            .filter(|(name, _)| name.contains(needle))
            .collect();

        if found.is_empty() {
            writeln!(out, "No results for file '{file}'")?;
            return Ok(exit_code::ERROR);
        }

        let mut rows = table(["", "File:Line", "Message"]);
        let mut index = 1;
        for (name, findings) in &found {
            for finding in &findings.messages {
                rows.add_row(vec![
                    index.to_string(),
                    format!("{name}:{}", finding.line),
                    finding.message.clone(),
                ]);
                index += 1;
            }
        }

        writeln!(out, "Level: {}   Last run: {}", results.level, self.last_run())?;
        writeln!(out, "{rows}")?;
        match found.as_slice() {
            [(_, only)] => writeln!(out, "File errors: {}\n", only.errors)?,
            _ => {
                let total: u64 = found.iter().map(|(_, f)| f.errors).sum();
                writeln!(out, "Errors: {total}\n")?
            }
        }
        Ok(exit_code::BENIGN)
    }

    fn show_explain(&self, out: &mut dyn Write) -> Result<i32> {
        writeln!(out, "Levels of the static analysis, each including the ones above.")?;
        writeln!(out, "{}", crate::output::rule('-', 63))?;
        for (level, (text, _)) in LEVELS.iter().enumerate() {
            writeln!(out, "{level}. {text}")?;
        }
        Ok(exit_code::BENIGN)
    }

    fn last_run(&self) -> String {
        read_timestamp(&self.output_dir).unwrap_or_default()
    }
}

/// Lint groups for `level`, capped at the strictest level
fn level_lints(level: u64) -> &'static [&'static str] {
    let max = LEVELS.len() - 1;
    let index = usize::try_from(level).map_or(max, |l| l.min(max));
    if index as u64 != level {
        warn!("Analysis level {} capped at {}", level, max);
    }
    LEVELS[index].1
}

/// Value of `--name=value`, or of `--name value`
fn option_value<'a>(args: &'a Args, name: &str) -> Option<&'a str> {
    args.option(name)
        .or_else(|| args.flag(name).then(|| args.arg(0)).flatten())
}

impl Module for Analysis {
    fn name(&self) -> &str {
        "Analysis"
    }

    fn initialize(&mut self) -> Result<()> {
        ensure_dir(&self.output_dir)
    }

    fn execute(&self, args: &Args, out: &mut dyn Write) -> Result<i32> {
        self.context
            .progress(out, "\nRunning Analysis module task...\n")?;

        if args.flag("explain") {
            return self.show_explain(out);
        }
        if args.flag("results") || args.flag("list") {
            return self.show_results(out);
        }
        if let Some(file) = option_value(args, "file") {
            return self.show_file(file, out);
        }

        let level = match option_value(args, "level") {
            Some(level) => level.parse().map_err(|_| {
                Error::halt(format!("Invalid analysis level '{level}'"), exit_code::HALT)
            })?,
            None => self.level,
        };

        if args.flag("raw") {
            return self.run_raw(level, out);
        }

        self.analyze(level)?;
        self.show_results(out)?;

        self.context
            .progress(out, "\nCompleted Analysis module task.\n")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Perform static analysis for project (clippy lint levels)".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: analysis [OPTIONS]\n\
             This will run the static analysis tool on the project files.\n\n\
             Valid Options:\n  \
             --level=<n> : Run at the given strictness level\n  \
             --results : Show results from last run\n  \
             --file=<name> : Show results for a specific file\n  \
             --raw : Show the tool's own output without saving results\n  \
             --explain : Show explanation of levels\n",
            self.help()
        )
    }

    fn status(&self) -> bool {
        let Some(results) = self.results() else {
            return false;
        };
        match self.max_errors {
            Some(max) => results.errors <= max,
            None => results.error_score() >= PASSING_SCORE,
        }
    }

    fn summary(&self, short: bool) -> String {
        match (self.results(), short) {
            (Some(results), true) => {
                format!("Analysis errors (L{}): {}", results.level, results.errors)
            }
            (None, true) => "Analysis: No data.".to_string(),
            (Some(_), false) => format!("Analysis results:\n{}", metrics_table(&self.metrics())),
            (None, false) => "Analysis results:\nNo data yet.".to_string(),
        }
    }

    fn metrics(&self) -> Metrics {
        let Some(results) = self.results() else {
            return Metrics::new();
        };
        let mut metrics = Metrics::new();
        metrics.insert("level".into(), results.level.into());
        metrics.insert("errors".into(), results.errors.into());
        metrics.insert("error_score".into(), serde_json::json!(results.error_score()));
        metrics
    }

    fn primary_metric(&self) -> serde_json::Value {
        match self.results() {
            Some(results) => serde_json::json!(results.error_score()),
            None => serde_json::json!(0.0),
        }
    }
}

pub struct AnalysisFactory;

impl ModuleFactory for AnalysisFactory {
    fn class(&self) -> &'static str {
        "Analysis"
    }

    fn create(
        &self,
        context: &ModuleContext,
        settings: &ModuleSettings,
    ) -> Result<Box<dyn Module>> {
        Ok(Box::new(Analysis::new(context, settings)))
    }

    fn default_config(&self) -> String {
        [
            "# Static analysis at a lint strictness level, within an error budget",
            "[modules.analysis]",
            "command = \"analysis\"",
            "class = \"Analysis\"",
            "bin = \"cargo\"",
            "args = \"clippy --message-format=json\"",
            "paths = \"src,tests\"",
            "level = 0",
            "max_errors = 10",
            "",
        ]
        .join("\n")
    }
}
