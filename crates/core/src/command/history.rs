use super::{Command, CommandContext};
use crate::args::Args;
use crate::error::Result;
use crate::module::exit_code;
use crate::output::table;
use std::io::Write;

pub struct History;

impl Command for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: &Args, out: &mut dyn Write) -> Result<i32> {
        let filter = args.arg(0);
        if let Some(module) = filter {
            writeln!(out, "Module filter: {module}")?;
        }

        let records = ctx.history.read(filter)?;
        if records.is_empty() {
            writeln!(out, "No history to display.")?;
            return Ok(exit_code::SUCCESS);
        }

        let mut rows = table(["Date", "Module", "Status", "Summary", "Metric"]);
        for record in records {
            rows.add_row(vec![
                record.date,
                record.module,
                if record.status { "PASS" } else { "FAIL" }.to_string(),
                record.summary,
                record.metric,
            ]);
        }
        writeln!(out, "{rows}")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Show history data for modules".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: history [module]\n\
             This will display a history of the results for modules that\n\
             have been run previously, including the pass/fail status and\n\
             basic metric. This basic metric differs per module.\n\
             With an argument provided, it will filter the results\n\
             to only show that module.\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{FakeModule, Fixture};

    #[test]
    fn test_empty_history() {
        let fixture = Fixture::new();
        let (code, out) = fixture.run("history", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, "No history to display.\n");
    }

    #[test]
    fn test_filtered_history_table() {
        let fixture = Fixture::new();
        fixture
            .history
            .append("cs", &FakeModule::new("cs", 0, true))
            .unwrap();
        fixture
            .history
            .append("test", &FakeModule::new("test", 0, false))
            .unwrap();

        let (_, out) = fixture.run("history", Args::new().with_arg("cs"));
        assert!(out.starts_with("Module filter: cs\n"));
        assert!(out.contains("PASS"));
        assert!(out.contains("cs: PASS"));
        assert!(out.contains("42"));
        assert!(!out.contains("test: FAIL"));

        let (_, out) = fixture.run("history", Args::new().with_arg("coverage"));
        assert_eq!(out, "Module filter: coverage\nNo history to display.\n");
    }
}
