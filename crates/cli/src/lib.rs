pub mod cli;

pub use cli::Cli;

use anyhow::{Context, Result};
use qualis_core::command::StdinPrompt;
use qualis_core::{exit_code, Console, ProjectPaths, Qualis};
use tracing::debug;

/// Run one invocation in the current directory, returning the exit code
pub fn run(cli: &Cli) -> Result<i32> {
    let options = cli.options();
    let args = cli.action_args();

    let paths = ProjectPaths::from_current_dir().context("Failed to get current directory")?;
    debug!("Project root: {}", paths.project_root().display());

    let mut app = Qualis::new(paths, options)
        .with_console(Console::detect(options.no_color))
        .with_prompt(Box::new(StdinPrompt));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = app.run(&args, &mut out)?;
    Ok(code)
}

/// Exit status for an error that escaped [`run`]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<qualis_core::Error>()
        .map(qualis_core::Error::exit_code)
        .unwrap_or(exit_code::ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_core_errors() {
        let err = anyhow::Error::new(qualis_core::Error::halt("Unrecognized command 'x'", 1));
        assert_eq!(exit_code_for(&err), 1);

        let err = anyhow::Error::new(qualis_core::Error::UnknownTarget("nope".into()));
        assert_eq!(exit_code_for(&err), 64);

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_context_keeps_the_core_error_reachable() {
        let result: std::result::Result<(), qualis_core::Error> = Err(qualis_core::Error::Timeout {
            command: "cargo test".into(),
            seconds: 5,
        });
        let err = result.context("Running test module").unwrap_err();
        assert_eq!(exit_code_for(&err), 124);
    }
}
