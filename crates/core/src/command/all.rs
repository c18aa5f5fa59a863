use super::{Command, CommandContext};
use crate::args::Args;
use crate::config::DEFAULT_BUILD_ORDER;
use crate::error::Result;
use crate::history::HistoryStore;
use crate::module::{exit_code, ModuleRegistry};
use crate::output::{rule, Console};
use std::io::Write;
use tracing::{debug, info, warn};

/// Runs the configured modules one after another, recording a history entry
/// for every module that completes its run
pub struct BuildOrchestrator<'a> {
    modules: &'a ModuleRegistry,
    history: &'a HistoryStore,
    console: Console,
}

/// What happened to one build order entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing registered under the keyword
    Skipped,
    /// The module ran and returned this code
    Completed(i32),
    /// The module's run raised an error
    Failed(String),
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(modules: &'a ModuleRegistry, history: &'a HistoryStore, console: Console) -> Self {
        Self {
            modules,
            history,
            console,
        }
    }

    /// Execute every keyword of `order`, returning one outcome per entry
    pub fn run(&self, order: &str, out: &mut dyn Write) -> Result<Vec<(String, StepOutcome)>> {
        let mut outcomes = Vec::new();

        for keyword in order.split(',').map(str::trim) {
            let Some(module) = self.modules.get(keyword) else {
                debug!("Skipping '{}': no module registered", keyword);
                outcomes.push((keyword.to_string(), StepOutcome::Skipped));
                continue;
            };

            let args = Args::new().with_action(keyword);
            let outcome = match module.execute(&args, out) {
                Ok(code) => {
                    if code == exit_code::SUCCESS {
                        match self.history.append(keyword, module) {
                            Ok(_) => info!("Recorded history for '{}'", keyword),
                            Err(e) => {
                                warn!("Could not record history for '{}': {}", keyword, e);
                                let message = format!("History for '{keyword}' not recorded: {e}");
                                writeln!(out, "{}", self.console.error(&message))?;
                            }
                        }
                    }
                    StepOutcome::Completed(code)
                }
                Err(e) => {
                    warn!("Module '{}' failed: {}", keyword, e);
                    let message = format!("Module '{keyword}' failed: {e}");
                    writeln!(out, "{}", self.console.error(&message))?;
                    StepOutcome::Failed(e.to_string())
                }
            };
            outcomes.push((keyword.to_string(), outcome));

            writeln!(out)?;
            writeln!(out, "{}", self.console.dim(&rule('%', 80)))?;
            writeln!(out)?;
        }

        Ok(outcomes)
    }
}

pub struct All;

impl Command for All {
    fn name(&self) -> &'static str {
        "all"
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: &Args, out: &mut dyn Write) -> Result<i32> {
        let order = ctx
            .config
            .map(|c| c.build_order())
            .unwrap_or(DEFAULT_BUILD_ORDER);
        BuildOrchestrator::new(ctx.modules, ctx.history, ctx.console).run(order, out)?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Execute all modules".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: all\n\
             Runs all the modules in the order specified in .qualis/config.toml\n\n\
             Default: build_order=cs,test,coverage\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{FakeModule, Fixture};

    #[test]
    fn test_runs_in_order_and_records_successes() {
        let mut fixture = Fixture::new().with_config(r#"build_order = "test, cs""#);
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));
        fixture.modules.insert("test", Box::new(FakeModule::new("test", 0, false)));

        let (code, out) = fixture.run("all", Args::new());
        assert_eq!(code.unwrap(), 0);
        let test_at = out.find("ran test").unwrap();
        let cs_at = out.find("ran cs").unwrap();
        assert!(test_at < cs_at);
        assert_eq!(out.matches(&rule('%', 80)).count(), 2);

        let history = fixture.history.read(None).unwrap();
        let recorded: Vec<(&str, bool)> = history
            .iter()
            .map(|r| (r.module.as_str(), r.status))
            .collect();
        assert_eq!(recorded, vec![("test", false), ("cs", true)]);
    }

    #[test]
    fn test_unregistered_keywords_are_skipped_silently() {
        let mut fixture = Fixture::new().with_config(r#"build_order = "lint,cs,bogus""#);
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));

        let (code, out) = fixture.run("all", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out.matches(&rule('%', 80)).count(), 1);
        assert_eq!(fixture.history.read(None).unwrap().len(), 1);
    }

    #[test]
    fn test_nonzero_code_gets_no_history() {
        let mut fixture = Fixture::new().with_config(r#"build_order = "cs""#);
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 8, true)));

        fixture.run("all", Args::new()).0.unwrap();
        assert!(fixture.history.read(None).unwrap().is_empty());
    }

    #[test]
    fn test_module_error_is_reported_and_the_loop_continues() {
        let mut fixture = Fixture::new().with_config(r#"build_order = "cs,test""#);
        fixture.modules.insert("cs", Box::new(FakeModule::failing("cs", "linter exploded")));
        fixture.modules.insert("test", Box::new(FakeModule::new("test", 0, true)));

        let (code, out) = fixture.run("all", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("linter exploded"));
        assert!(out.contains("ran test"));

        let history = fixture.history.read(None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].module, "test");
    }

    #[test]
    fn test_unwritable_history_does_not_stop_the_build() {
        let mut fixture = Fixture::new().with_config(r#"build_order = "cs,test""#);
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));
        fixture.modules.insert("test", Box::new(FakeModule::new("test", 0, true)));
        std::fs::create_dir_all(fixture.history.path().parent().unwrap()).unwrap();
        std::fs::write(fixture.history.path(), "{not json").unwrap();

        let (code, out) = fixture.run("all", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("ran cs"));
        assert!(out.contains("ran test"));
        assert!(out.contains("History for 'cs' not recorded"));
        assert!(out.contains("History for 'test' not recorded"));
        assert_eq!(out.matches(&rule('%', 80)).count(), 2);
    }

    #[test]
    fn test_outcomes_per_entry() {
        let mut fixture = Fixture::new();
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));
        let orchestrator =
            BuildOrchestrator::new(&fixture.modules, &fixture.history, Console::plain());

        let outcomes = orchestrator.run("cs,test,coverage", &mut Vec::new()).unwrap();
        assert_eq!(
            outcomes,
            vec![
                ("cs".to_string(), StepOutcome::Completed(0)),
                ("test".to_string(), StepOutcome::Skipped),
                ("coverage".to_string(), StepOutcome::Skipped),
            ]
        );
    }
}
