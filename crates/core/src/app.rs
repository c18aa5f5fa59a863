//! The driver: configuration, registries and dispatch of one invocation

use crate::args::Args;
use crate::command::{CommandContext, CommandRegistry, NoPrompt, Prompt};
use crate::config::{Config, ProjectPaths};
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::module::{exit_code, ModuleContext, ModuleFactory, ModuleRegistry};
use crate::output::Console;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flags that apply to every action
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub no_color: bool,
    pub help: bool,
    pub version: bool,
}

impl GlobalOptions {
    /// Also honor global flags given after the action
    pub fn merge_args(mut self, args: &Args) -> Self {
        self.verbose |= args.flag("verbose") || args.flag("v");
        self.quiet |= args.flag("quiet") || args.flag("q");
        self.no_color |= args.flag("no-color");
        self.help |= args.flag("help") || args.flag("h");
        self.version |= args.flag("version");
        self
    }
}

pub struct Qualis {
    paths: ProjectPaths,
    options: GlobalOptions,
    console: Console,
    config: Option<Config>,
    modules: ModuleRegistry,
    commands: CommandRegistry,
    history: HistoryStore,
    prompt: Box<dyn Prompt>,
}

impl std::fmt::Debug for Qualis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qualis")
            .field("paths", &self.paths)
            .field("options", &self.options)
            .field("modules", &self.modules)
            .finish()
    }
}

impl Qualis {
    pub fn new(paths: ProjectPaths, options: GlobalOptions) -> Self {
        let context = ModuleContext::new(paths.clone()).with_quiet(options.quiet);
        Self {
            history: HistoryStore::new(paths.history_file()),
            modules: ModuleRegistry::new(context),
            commands: CommandRegistry::new(),
            console: Console::plain(),
            config: None,
            prompt: Box::new(NoPrompt),
            options,
            paths,
        }
    }

    /// Make an extra module class available to the configuration
    pub fn with_factory(mut self, factory: Arc<dyn ModuleFactory>) -> Self {
        self.modules = self.modules.with_factory(factory);
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Load the project config, if any, and register its modules
    pub fn load(&mut self, out: &mut dyn Write) -> Result<()> {
        let file = self.paths.config_file();
        if !file.exists() {
            debug!("No config at {}", file.display());
            return Ok(());
        }

        match Config::load_from_file(&file) {
            Ok(config) => {
                if let Some(modules) = config.modules.as_ref() {
                    if let Some(count) = self.modules.register_all(modules) {
                        info!("Registered {} modules", count);
                    }
                }
                self.config = Some(config);
            }
            Err(e) => {
                warn!("Ignoring unreadable config: {}", e);
                self.display_error(out, &e.to_string())?;
            }
        }
        Ok(())
    }

    /// Run one invocation: load, then dispatch `args` to a command or module
    pub fn run(&mut self, args: &Args, out: &mut dyn Write) -> Result<i32> {
        self.load(out)?;

        if self.options.help {
            write!(out, "{}", self.title())?;
            if let Some(name) = self.config.as_ref().and_then(Config::project_name) {
                writeln!(out, "Project: {name}")?;
            }
            let mut help_args = Args::new().with_action("help");
            if let Some(context) = args.explicit_action() {
                help_args = help_args.with_arg(context);
            }
            return self.run_command("help", &help_args, out);
        }

        if self.options.version {
            write!(out, "{}", self.title())?;
            return Ok(exit_code::SUCCESS);
        }

        let action = args.action();
        if self.config.is_none() && action != "init" {
            self.display_error(
                out,
                "No project config file found. Use 'qualis init' to initialize.",
            )?;
        } else {
            self.progress(out, &self.title())?;
            if let Some(config) = self.config.as_ref() {
                let name = config.project_name().unwrap_or_default();
                self.progress(out, &format!("Project: {name}\n"))?;
            }
        }

        if self.commands.contains(action) {
            return self.run_command(action, args, out);
        }

        if let Some(module) = self.modules.get(action) {
            let code = module.execute(args, out)?;
            if code == exit_code::SUCCESS {
                self.history.append(action, module)?;
            }
            return Ok(code);
        }

        Err(Error::halt(
            format!("Unrecognized command '{action}'"),
            exit_code::ERROR,
        ))
    }

    fn run_command(&self, name: &str, args: &Args, out: &mut dyn Write) -> Result<i32> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| Error::UnknownTarget(format!("No command by name '{name}' found.")))?;
        let ctx = CommandContext {
            config: self.config.as_ref(),
            paths: &self.paths,
            modules: &self.modules,
            commands: &self.commands,
            history: &self.history,
            console: self.console,
            prompt: self.prompt.as_ref(),
            version: VERSION,
        };
        command.execute(&ctx, args, out)
    }

    pub fn title(&self) -> String {
        self.console.status(&format!("Qualis {VERSION}\n"), true)
    }

    fn progress(&self, out: &mut dyn Write, text: &str) -> Result<()> {
        if !self.options.quiet {
            write!(out, "{text}")?;
        }
        Ok(())
    }

    fn display_error(&self, out: &mut dyn Write, message: &str) -> Result<()> {
        writeln!(out, "\n{}\n", self.console.error(message))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::FakeModule;
    use crate::config::ModuleSettings;
    use crate::module::{Module, ModuleContext};
    use tempfile::TempDir;

    struct FakeFactory;

    impl ModuleFactory for FakeFactory {
        fn class(&self) -> &'static str {
            "Fake"
        }
        fn create(&self, _: &ModuleContext, settings: &ModuleSettings) -> Result<Box<dyn Module>> {
            let code = settings.get_u64("code").unwrap_or(0) as i32;
            Ok(Box::new(FakeModule::new("fake", code, true)))
        }
        fn default_config(&self) -> String {
            String::new()
        }
    }

    fn project(config: Option<&str>) -> (TempDir, Qualis) {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        if let Some(config) = config {
            std::fs::create_dir_all(paths.state_dir()).unwrap();
            std::fs::write(paths.config_file(), config).unwrap();
        }
        let app = Qualis::new(paths, GlobalOptions::default())
            .with_factory(Arc::new(FakeFactory));
        (dir, app)
    }

    fn run(app: &mut Qualis, tokens: &[&str]) -> (Result<i32>, String) {
        let mut out = Vec::new();
        let result = app.run(&Args::parse(tokens.iter().copied()), &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    const CONFIG: &str = r#"
project_name = "demo"

[modules.lint]
class = "Fake"
command = "cs"

[modules.info]
class = "Fake"
code = 8
"#;

    #[test]
    fn test_module_run_records_history() {
        let (_dir, mut app) = project(Some(CONFIG));
        let (code, out) = run(&mut app, &["cs"]);
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("Project: demo"));
        assert!(out.contains("ran fake"));

        let records = app.history().read(Some("cs")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].summary, "fake: PASS");
        assert_eq!(records[0].metric, "42");
    }

    #[test]
    fn test_benign_module_run_is_not_recorded() {
        let (_dir, mut app) = project(Some(CONFIG));
        let (code, _) = run(&mut app, &["info"]);
        assert_eq!(code.unwrap(), exit_code::BENIGN);
        assert!(app.history().read(None).unwrap().is_empty());
    }

    #[test]
    fn test_unrecognized_action_halts_with_status_one() {
        let (_dir, mut app) = project(Some(CONFIG));
        let (result, _) = run(&mut app, &["frobnicate"]);
        let err = result.unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Unrecognized command 'frobnicate'");
    }

    #[test]
    fn test_missing_config_is_reported_and_run_continues() {
        let (_dir, mut app) = project(None);
        let (code, out) = run(&mut app, &["modules"]);
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("No project config file found. Use 'qualis init' to initialize."));
        assert!(out.contains("Description"));
    }

    #[test]
    fn test_default_action_is_summary() {
        let (_dir, mut app) = project(Some(CONFIG));
        let (code, out) = run(&mut app, &[]);
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("fake results:"));
    }

    #[test]
    fn test_version_flag() {
        let dir = TempDir::new().unwrap();
        let options = GlobalOptions {
            version: true,
            ..Default::default()
        };
        let mut app = Qualis::new(ProjectPaths::new(dir.path()), options);
        let mut out = Vec::new();
        assert_eq!(app.run(&Args::new(), &mut out).unwrap(), 0);
        assert_eq!(String::from_utf8(out).unwrap(), format!("Qualis {VERSION}\n"));
    }

    #[test]
    fn test_help_flag_with_context() {
        let dir = TempDir::new().unwrap();
        let options = GlobalOptions {
            help: true,
            ..Default::default()
        };
        let mut app = Qualis::new(ProjectPaths::new(dir.path()), options);
        let mut out = Vec::new();
        app.run(&Args::parse(["history"]), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Help for command 'history'"));
    }

    #[test]
    fn test_quiet_suppresses_title() {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::new(dir.path());
        std::fs::create_dir_all(paths.state_dir()).unwrap();
        std::fs::write(paths.config_file(), CONFIG).unwrap();
        let options = GlobalOptions::default().merge_args(&Args::parse(["history", "-q"]));
        assert!(options.quiet);

        let mut app = Qualis::new(paths, options);
        let mut out = Vec::new();
        app.run(&Args::parse(["history"]), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No history to display.\n");
    }

    #[test]
    fn test_malformed_config_is_reported() {
        let (_dir, mut app) = project(Some("project_name = [unterminated"));
        let (code, out) = run(&mut app, &["help"]);
        assert_eq!(code.unwrap(), 0);
        assert!(out.contains("config.toml"));
        assert!(app.config().is_none());
    }
}
