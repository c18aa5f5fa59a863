use clap::Parser;
use qualis_core::{Args, GlobalOptions};

/// Run analysis modules against a project and track their results
#[derive(Parser, Debug)]
#[command(name = "qualis", about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=debug    Enable debug logging")]
pub struct Cli {
    /// Show verbose messages
    #[arg(short, long)]
    pub verbose: bool,

    /// Print less messages
    #[arg(short, long)]
    pub quiet: bool,

    /// Don't use color output
    #[arg(long)]
    pub no_color: bool,

    /// Show version and exit
    #[arg(long)]
    pub version: bool,

    /// Show help
    #[arg(short, long)]
    pub help: bool,

    /// Subcommand or module, followed by its options and arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ACTION")]
    pub rest: Vec<String>,
}

impl Cli {
    /// Action and arguments handed to the driver
    pub fn action_args(&self) -> Args {
        Args::parse(self.rest.iter().cloned())
    }

    /// Global flags, including those given after the action
    pub fn options(&self) -> GlobalOptions {
        GlobalOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            no_color: self.no_color,
            help: self.help,
            version: self.version,
        }
        .merge_args(&self.action_args())
    }
}
