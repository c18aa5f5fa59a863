//! Shared fixtures for the end-to-end suite under `tests/`.
//!
//! [`ScriptedFactory`] builds modules whose return code and verdict come from
//! their config block, so whole runs can be driven without external tools.

use qualis_core::module::exit_code;
use qualis_core::{Args, Metrics, Module, ModuleContext, ModuleFactory, ModuleSettings, Result};
use std::io::Write;
use std::path::PathBuf;

/// Module configured with `code`, `pass` and `label` settings.
///
/// Each execution bumps a counter kept in the module's artifact directory.
pub struct Scripted {
    label: String,
    code: i32,
    pass: bool,
    dir: PathBuf,
}

impl Scripted {
    fn runs(&self) -> u64 {
        std::fs::read_to_string(self.dir.join("runs"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}

impl Module for Scripted {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn initialize(&mut self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn execute(&self, _args: &Args, out: &mut dyn Write) -> Result<i32> {
        writeln!(out, "Running {}", self.label)?;
        std::fs::write(self.dir.join("runs"), (self.runs() + 1).to_string())?;
        Ok(self.code)
    }

    fn help(&self) -> String {
        format!("Scripted module {}", self.label)
    }

    fn extended_help(&self) -> String {
        self.help()
    }

    fn status(&self) -> bool {
        self.pass
    }

    fn summary(&self, short: bool) -> String {
        let verdict = if self.pass { "PASS" } else { "FAIL" };
        if short {
            format!("{}: {}", self.label, verdict)
        } else {
            format!("{} results:\nruns={}", self.label, self.runs())
        }
    }

    fn metrics(&self) -> Metrics {
        let mut metrics = Metrics::new();
        metrics.insert("runs".into(), serde_json::json!(self.runs()));
        metrics
    }

    fn primary_metric(&self) -> serde_json::Value {
        serde_json::json!(self.runs())
    }
}

pub struct ScriptedFactory;

impl ModuleFactory for ScriptedFactory {
    fn class(&self) -> &'static str {
        "Scripted"
    }

    fn create(
        &self,
        context: &ModuleContext,
        settings: &ModuleSettings,
    ) -> Result<Box<dyn Module>> {
        let label = settings.get("label").unwrap_or("scripted").to_string();
        Ok(Box::new(Scripted {
            code: settings
                .get("code")
                .and_then(|c| c.parse().ok())
                .unwrap_or(exit_code::SUCCESS),
            pass: settings.get("pass").is_none_or(|p| p == "true"),
            dir: context.paths.module_dir(&label),
            label,
        }))
    }

    fn default_config(&self) -> String {
        [
            "[modules.scripted]",
            "class = \"Scripted\"",
            "label = \"scripted\"",
            "",
        ]
        .join("\n")
    }
}
