use super::{Command, CommandContext};
use crate::args::Args;
use crate::error::Result;
use crate::module::exit_code;
use crate::output::table;
use std::io::Write;

pub struct Modules;

impl Command for Modules {
    fn name(&self) -> &'static str {
        "modules"
    }

    fn execute(&self, ctx: &CommandContext<'_>, _args: &Args, out: &mut dyn Write) -> Result<i32> {
        let mut rows = table(["Module", "Command", "Description"]);
        for (keyword, module) in ctx.modules.iter() {
            rows.add_row(vec![
                module.name().to_string(),
                keyword.to_string(),
                module.help(),
            ]);
        }
        writeln!(out, "{rows}")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Show registered modules".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\nUsage: modules\nShows a list of installed and enabled modules.\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{FakeModule, Fixture};

    #[test]
    fn test_lists_registered_modules() {
        let mut fixture = Fixture::new();
        fixture.modules.insert("cs", Box::new(FakeModule::new("Lint", 0, true)));

        let (code, out) = fixture.run("modules", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("Description"));
        assert!(out.contains("Lint"));
        assert!(out.contains("Lint help"));
    }
}
