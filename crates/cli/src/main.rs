use clap::Parser;
use colored::Colorize;
use qualis::{exit_code_for, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    let options = cli.options();

    // RUST_LOG wins over the verbosity flag
    let default_level = if options.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match qualis::run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("\n{}\n", format!("{err:#}").red().bold());
            std::process::exit(exit_code_for(&err));
        }
    }
}
