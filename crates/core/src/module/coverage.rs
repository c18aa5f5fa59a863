//! Coverage module: renders the Clover dataset left by the test run

use super::{
    ensure_dir, exit_code, read_timestamp, save_timestamp, Metrics, Module, ModuleContext,
    ModuleFactory,
};
use crate::args::Args;
use crate::config::ModuleSettings;
use crate::coverage::CoverageReport;
use crate::error::{Error, Result};
use std::io::Write;
use std::path::{PathBuf, MAIN_SEPARATOR};
use tracing::debug;

const OUTPUT_DIR: &str = "coverage";
const TOTAL_FILE: &str = "totalcoverage.txt";
const TOTAL_PREFIX: &str = "Total Coverage: ";
const DEFAULT_DATASET: &str = "test-results/coverage.xml";
const PASSING_COVERAGE: f64 = 80.0;

pub struct Coverage {
    context: ModuleContext,
    root: String,
    ignore_paths: Vec<String>,
    extensions: Vec<String>,
    dataset: PathBuf,
    output_dir: PathBuf,
}

impl Coverage {
    pub fn new(context: &ModuleContext, settings: &ModuleSettings) -> Self {
        let paths = &context.paths;
        let dataset = settings
            .get_non_blank("file")
            .map(|f| paths.project_root().join(f))
            .unwrap_or_else(|| paths.state_dir().join(DEFAULT_DATASET));
        let extensions = match settings.get_list("extensions") {
            list if list.is_empty() => vec!["rs".to_string()],
            list => list,
        };

        Self {
            context: context.clone(),
            root: settings.get_non_blank("root").unwrap_or(".").to_string(),
            ignore_paths: settings.get_list("ignore_paths"),
            extensions,
            dataset,
            output_dir: paths.module_dir(OUTPUT_DIR),
        }
    }

    /// Canonical root with a trailing separator
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Text saved by the last run, `No data.` before the first one
    pub fn total_coverage_text(&self) -> String {
        std::fs::read_to_string(self.output_dir.join(TOTAL_FILE))
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "No data.".to_string())
    }

    fn coverage_value(&self) -> f64 {
        self.total_coverage_text()
            .strip_prefix(TOTAL_PREFIX)
            .and_then(|rest| rest.trim_end_matches('%').trim().parse().ok())
            .unwrap_or(0.0)
    }

    fn load_report(&self) -> Result<CoverageReport> {
        if !self.dataset.exists() {
            return Err(Error::ReportSource(format!(
                "Cannot find file '{}'. Ensure test module is executed first.",
                self.dataset.display()
            )));
        }
        debug!("Parsing clover coverage report {}", self.dataset.display());
        Ok(CoverageReport::from_file(&self.dataset)?
            .with_ignore_paths(&self.ignore_paths)?
            .with_extensions(&self.extensions))
    }

    fn show_list(&self, out: &mut dyn Write) -> Result<i32> {
        let mut report = self.load_report()?;
        report.gather_file_metrics();

        let mut table = crate::output::table(["File", "Covered", "Statements", "Coverage"]);
        for (name, metrics) in report.files() {
            table.add_row(vec![
                name.strip_prefix(self.root.as_str()).unwrap_or(name).to_string(),
                metrics.covered_statements.to_string(),
                metrics.statements.to_string(),
                format!("{}%", metrics.percentage()),
            ]);
        }
        writeln!(out, "{table}")?;
        Ok(exit_code::BENIGN)
    }
}

impl Module for Coverage {
    fn name(&self) -> &str {
        "Coverage"
    }

    fn initialize(&mut self) -> Result<()> {
        ensure_dir(&self.output_dir)?;

        let root = self.context.paths.project_root().join(&self.root);
        let canonical = root.canonicalize().map_err(|e| {
            Error::ModuleError(format!("Coverage root '{}': {e}", root.display()))
        })?;
        let mut root = canonical.to_string_lossy().into_owned();
        if !root.ends_with(MAIN_SEPARATOR) {
            root.push(MAIN_SEPARATOR);
        }
        self.root = root;
        Ok(())
    }

    fn execute(&self, args: &Args, out: &mut dyn Write) -> Result<i32> {
        if args.flag("list") {
            return self.show_list(out);
        }

        save_timestamp(&self.output_dir)?;
        let mut report = self.load_report()?;

        let text = match args.arg(0) {
            Some(file) => {
                report.generate_file_analysis(file, Some(&self.root))?;
                report.text().to_string()
            }
            None => report.generate_report(Some(&self.root)),
        };

        self.context
            .progress(out, "\nRunning coverage module task...\n")?;
        write!(out, "{text}")?;

        let total = report.total_coverage();
        std::fs::write(
            self.output_dir.join(TOTAL_FILE),
            format!("{TOTAL_PREFIX}{total}%"),
        )?;

        self.context
            .progress(out, "\nCompleted coverage module task.\n")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Show code coverage for unit tests.".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: coverage [OPTIONS] [filename]\n\
             By default this will show a coverage report for project files.\n\
             If a filename is specified, a source file coverage report is displayed\n\
             for the given filename.\n\n\
             Valid Options:\n  --list : Show list of files in coverage\n",
            self.help()
        )
    }

    fn status(&self) -> bool {
        self.coverage_value() > PASSING_COVERAGE
    }

    fn summary(&self, short: bool) -> String {
        let label = if short { "Coverage: " } else { "Coverage results:\n" };
        let mut text = format!("{label}{}", self.total_coverage_text());
        if !short {
            if let Some(stamp) = read_timestamp(&self.output_dir) {
                text.push_str(&format!("\nLast run: {stamp}"));
            }
        }
        text
    }

    fn metrics(&self) -> Metrics {
        let mut metrics = Metrics::new();
        metrics.insert("coverage".to_string(), self.primary_metric());
        metrics
    }

    fn primary_metric(&self) -> serde_json::Value {
        serde_json::json!(self.coverage_value())
    }
}

pub struct CoverageFactory;

impl ModuleFactory for CoverageFactory {
    fn class(&self) -> &'static str {
        "Coverage"
    }

    fn create(
        &self,
        context: &ModuleContext,
        settings: &ModuleSettings,
    ) -> Result<Box<dyn Module>> {
        Ok(Box::new(Coverage::new(context, settings)))
    }

    fn default_config(&self) -> String {
        [
            "# Code coverage of unit tests, read from a Clover XML dataset",
            "[modules.coverage]",
            "command = \"coverage\"",
            "class = \"Coverage\"",
            "root = \".\"",
            "ignore_paths = \"target\"",
            "",
        ]
        .join("\n")
    }
}
