use super::{Command, CommandContext};
use crate::args::Args;
use crate::error::{Error, Result};
use crate::module::exit_code;
use std::io::Write;

pub struct Help;

impl Help {
    /// Usage, subcommands, registered modules and global options
    pub fn general_help(&self, ctx: &CommandContext<'_>) -> String {
        let console = ctx.console;
        let usage = "Usage: qualis <subcommand|module> [OPTIONS] [ARGS]\n\n";
        let mut text = console.status(usage, true);

        text.push_str("Subcommands:\n");
        for command in ctx.commands.iter() {
            text.push_str(&console.warning(&format!("  {} : {}", command.name(), command.help())));
            text.push('\n');
        }

        if !ctx.modules.is_empty() {
            text.push_str("\nModules:\n");
            for (keyword, module) in ctx.modules.iter() {
                text.push_str(&console.warning(&format!("  {keyword} : {}", module.help())));
                text.push('\n');
            }
        }

        text.push_str(
            "\nUse `qualis help [module|subcommand]` to get specific help\n\
             for a module or subcommand.\n",
        );
        text.push_str(&self.global_options(ctx));
        text
    }

    pub fn global_options(&self, ctx: &CommandContext<'_>) -> String {
        let options = [
            "  -h [--help] : Show help",
            "  -v [--verbose] : Show verbose messages",
            "  -q [--quiet] : Print less messages",
            "  --no-color : Don't use color output",
            "  --version : Show version and exit",
        ];
        let mut text = String::from("\nGlobal Options:\n");
        for option in options {
            text.push_str(&ctx.console.warning(option));
            text.push('\n');
        }
        text
    }

    /// Extended help of a module, or of a command when no module matches
    pub fn contextual_help(&self, ctx: &CommandContext<'_>, name: &str) -> Result<String> {
        let (kind, body) = if let Some(module) = ctx.modules.get(name) {
            ("module", module.extended_help())
        } else if let Some(command) = ctx.commands.get(name) {
            ("command", command.extended_help())
        } else {
            return Err(Error::UnknownTarget(format!(
                "No module or command by name '{name}' found."
            )));
        };

        let heading = ctx.console.heading(&format!("Help for {kind} '{name}'"));
        Ok(format!("\n{heading}\n\n{body}{}", self.global_options(ctx)))
    }
}

impl Command for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: &Args, out: &mut dyn Write) -> Result<i32> {
        let text = match args.arg(0) {
            Some(context) if context != "." => self.contextual_help(ctx, context)?,
            _ => self.general_help(ctx),
        };
        write!(out, "{text}")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Show qualis help information".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: help [command|module]\n\
             Without any arguments, display basic help.\n\
             This will display all the available modules\n\
             and commands.\n\n\
             Including a module or command name will provide\n\
             contextual help for that module or command.\n\
             Example: qualis help coverage\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{FakeModule, Fixture};

    #[test]
    fn test_general_help_lists_commands_and_modules() {
        let mut fixture = Fixture::new();
        fixture.modules.insert("cs", Box::new(FakeModule::new("cs", 0, true)));

        let (code, out) = fixture.run("help", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert!(out.starts_with("Usage: qualis <subcommand|module> [OPTIONS] [ARGS]"));
        assert!(out.contains("  all : Execute all modules"));
        assert!(out.contains("Modules:\n  cs : cs help"));
        assert!(out.contains("  --version : Show version and exit"));
    }

    #[test]
    fn test_modules_section_omitted_without_modules() {
        let fixture = Fixture::new();
        let (_, out) = fixture.run("help", Args::new());
        assert!(!out.contains("Modules:"));
    }

    #[test]
    fn test_module_help_wins_over_command_help() {
        let mut fixture = Fixture::new();
        fixture.modules.insert("history", Box::new(FakeModule::new("history", 0, true)));

        let (_, out) = fixture.run("help", Args::new().with_arg("history"));
        assert!(out.contains("Help for module 'history'"));
        assert!(out.contains("history extended help"));
    }

    #[test]
    fn test_command_help() {
        let fixture = Fixture::new();
        let (code, out) = fixture.run("help", Args::new().with_arg("summary"));
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("Help for command 'summary'"));
        assert!(out.contains("Usage: summary [--short] [module]"));
    }

    #[test]
    fn test_unknown_context_is_a_usage_error() {
        let fixture = Fixture::new();
        let (result, out) = fixture.run("help", Args::new().with_arg("nope"));
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 64);
        assert_eq!(err.to_string(), "No module or command by name 'nope' found.");
        assert!(out.is_empty());
    }
}
