use super::{Command, CommandContext};
use crate::args::Args;
use crate::config::DEFAULT_BUILD_ORDER;
use crate::error::Result;
use crate::module::exit_code;
use std::io::Write;
use tracing::{debug, info};

pub struct Init;

impl Init {
    /// Render `.qualis/config.toml` for a fresh project
    pub fn render_config(ctx: &CommandContext<'_>, project_name: &str) -> String {
        let root = ctx.paths.project_root().to_string_lossy().into_owned();
        let mut contents = format!(
            "# qualis configuration file v{}\n\
             project_name = {}\n\
             project_root = {}\n\
             build_order = {}\n",
            ctx.version,
            toml::Value::String(project_name.to_string()),
            toml::Value::String(root),
            toml::Value::String(DEFAULT_BUILD_ORDER.to_string()),
        );

        for factory in ctx.modules.factories() {
            contents.push('\n');
            contents.push_str(&factory.default_config());
        }
        contents
    }

    fn confirm_overwrite(&self, ctx: &CommandContext<'_>, out: &mut dyn Write) -> Result<bool> {
        writeln!(
            out,
            "\n{}",
            ctx.console
                .warning("Qualis has already been initialized for this project.")
        )?;
        let answer = ctx
            .prompt
            .ask("Do you want to re-init [All data will be lost] (y/n)? ", out)?;
        match answer {
            Some(answer) => Ok(answer.trim().eq_ignore_ascii_case("y")),
            None => {
                writeln!(out, "Use --force to overwrite.")?;
                Ok(false)
            }
        }
    }

    fn project_name(&self, ctx: &CommandContext<'_>, out: &mut dyn Write) -> Result<String> {
        let answer = ctx.prompt.ask("\nEnter project name: ", out)?;
        let fallback = || {
            ctx.paths
                .project_root()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        Ok(answer
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(fallback))
    }
}

impl Command for Init {
    fn name(&self) -> &'static str {
        "init"
    }

    fn execute(&self, ctx: &CommandContext<'_>, args: &Args, out: &mut dyn Write) -> Result<i32> {
        write!(out, "Initializing project...")?;

        let state_dir = ctx.paths.state_dir();
        if state_dir.is_dir() {
            debug!("Directory '{}' found.", state_dir.display());
            if !args.flag("force") && !self.confirm_overwrite(ctx, out)? {
                return Ok(exit_code::SUCCESS);
            }
            info!("Removing {}", state_dir.display());
            std::fs::remove_dir_all(state_dir)?;
        }
        std::fs::create_dir_all(state_dir)?;

        let name = self.project_name(ctx, out)?;
        writeln!(out)?;
        for factory in ctx.modules.factories() {
            writeln!(out, "  Initializing {}", factory.class())?;
        }

        let file = ctx.paths.config_file();
        std::fs::write(&file, Self::render_config(ctx, &name))?;
        info!("Wrote {}", file.display());

        writeln!(out, "done.")?;
        Ok(exit_code::SUCCESS)
    }

    fn help(&self) -> String {
        "Initialize a project in the current folder".to_string()
    }

    fn extended_help(&self) -> String {
        format!(
            "{}\n\n\
             Usage: init [--force]\n\
             This will initialize a qualis project in the current directory.\n\
             If one already exists, it will prompt to overwrite it.\n\
             Initializing a qualis project will prompt the user for some\n\
             basic information about the project.\n\
             The files will be written to a .qualis directory.\n\n\
             Valid Options:\n  --force : Overwrite an existing project without asking\n",
            self.help()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::{Fixture, ScriptedPrompt};
    use crate::config::Config;

    #[test]
    fn test_init_writes_loadable_config() {
        let fixture = Fixture::new();
        let prompt = ScriptedPrompt::new(&["My \"App\""]);
        let (code, out) = fixture.run_with_prompt("init", Args::new(), &prompt);
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("Initializing Coverage"));
        assert!(out.ends_with("done.\n"));

        let config = Config::load_from_file(&fixture.paths.config_file()).unwrap();
        assert_eq!(config.project_name(), Some("My \"App\""));
        assert_eq!(config.build_order(), "cs,test,coverage");
        let modules = config.modules.as_ref().unwrap().as_table().unwrap();
        assert!(modules.contains_key("coverage"));
        assert!(modules.contains_key("test"));
        let cs = modules["codingstandard"].as_table().unwrap();
        assert_eq!(cs.get("command").and_then(|v| v.as_str()), Some("cs"));
        let analysis = modules["analysis"].as_table().unwrap();
        assert_eq!(analysis.get("max_errors").and_then(|v| v.as_integer()), Some(10));
    }

    #[test]
    fn test_name_falls_back_to_directory() {
        let fixture = Fixture::new();
        fixture.run("init", Args::new()).0.unwrap();
        let config = Config::load_from_file(&fixture.paths.config_file()).unwrap();
        let dir_name = fixture.dir.path().file_name().unwrap().to_string_lossy();
        assert_eq!(config.project_name(), Some(dir_name.as_ref()));
    }

    #[test]
    fn test_existing_project_is_kept_without_consent() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.paths.state_dir()).unwrap();
        std::fs::write(fixture.paths.history_file(), "[]").unwrap();

        let (code, out) = fixture.run("init", Args::new());
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("already been initialized"));
        assert!(fixture.paths.history_file().exists());
        assert!(!fixture.paths.config_file().exists());

        let prompt = ScriptedPrompt::new(&["n"]);
        fixture.run_with_prompt("init", Args::new(), &prompt).0.unwrap();
        assert!(fixture.paths.history_file().exists());
    }

    #[test]
    fn test_reinit_with_consent_or_force() {
        let fixture = Fixture::new();
        std::fs::create_dir_all(fixture.paths.state_dir()).unwrap();
        std::fs::write(fixture.paths.history_file(), "[]").unwrap();

        let prompt = ScriptedPrompt::new(&["y", "demo"]);
        fixture.run_with_prompt("init", Args::new(), &prompt).0.unwrap();
        assert!(!fixture.paths.history_file().exists());
        assert!(fixture.paths.config_file().exists());

        std::fs::write(fixture.paths.history_file(), "[]").unwrap();
        fixture
            .run("init", Args::new().with_flag("force"))
            .0
            .unwrap();
        assert!(!fixture.paths.history_file().exists());
        assert!(fixture.paths.config_file().exists());
    }
}
