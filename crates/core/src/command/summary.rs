use super::{Command, CommandContext};
use crate::args::Args;
use crate::error::{Error, Result};
use crate::module::{exit_code, Module};
use crate::output::{rule, Console};
use std::io::Write;

pub struct Summary;

impl Command for Summary {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: &Args, out: &mut dyn Write) -> Result<i32> {
        let console = if args.flag("no-color") {
            Console::plain()
        } else {
            ctx.console
        };
        let short = args.flag("short");

        let modules: Vec<&dyn Module> = match args.arg(0).filter(|m| *m != "all") {
            Some(name) => vec![ctx.modules.get(name).ok_or_else(|| {
                Error::UnknownTarget(format!("No module by name '{name}' found."))
            })?],
            None => ctx.modules.iter().map(|(_, module)| module).collect(),
        };

        if short {
            writeln!(out, "{}", rule('-', 32))?;
        }

        for module in modules {
            let status_line = console.status(&module.summary(true), module.status());
            if short {
                writeln!(out, "{status_line}")?;
            } else {
                let details = module.summary(false);
                writeln!(out, "\n{}", console.heading(details.trim()))?;
                writeln!(out, "{status_line}")?;
            }
        }

        writeln!(out)?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Get summary of a module or all modules".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: summary [--short] [module]\n\
             Show the summary of the most recent results of each module.\n\
             If a module name is provided as an argument, it\n\
             will display only the summary for that module.\n\n\
             This is the default module that is run when no\n\
             module name is given when running qualis.\n\n\
             Valid Options:\n  --short : Show only short information\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{FakeModule, Fixture};

    fn fixture() -> Fixture {
        let mut fixture = Fixture::new();
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));
        fixture.modules.insert("test", Box::new(FakeModule::new("test", 0, false)));
        fixture
    }

    #[test]
    fn test_short_summary_of_all_modules() {
        let fixture = fixture();
        let (code, out) = fixture.run("summary", Args::new().with_flag("short"));
        assert_eq!(code.unwrap(), 0);
        assert_eq!(out, format!("{}\ncs: PASS\ntest: FAIL\n\n", "-".repeat(32)));
    }

    #[test]
    fn test_full_summary_of_one_module() {
        let fixture = fixture();
        let (_, out) = fixture.run("summary", Args::new().with_arg("test"));
        assert_eq!(out, "\ntest results:\nFAIL\ntest: FAIL\n\n");
    }

    #[test]
    fn test_unknown_module() {
        let fixture = fixture();
        let (result, _) = fixture.run("summary", Args::new().with_arg("nope"));
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 64);
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn test_no_modules_prints_blank_line() {
        let fixture = Fixture::new();
        let (_, out) = fixture.run("summary", Args::new());
        assert_eq!(out, "\n");
    }
}
