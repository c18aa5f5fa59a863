//! Built-in subcommands: all, help, history, init, modules, summary

pub mod all;
pub mod help;
pub mod history;
pub mod init;
pub mod modules;
pub mod summary;

use crate::args::Args;
use crate::config::{Config, ProjectPaths};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::module::ModuleRegistry;
use crate::output::Console;
use std::io::{BufRead, IsTerminal, Write};

pub use all::{All, BuildOrchestrator};
pub use help::Help;
pub use history::History;
pub use init::Init;
pub use modules::Modules;
pub use summary::Summary;

/// Everything a command may look at while it runs
pub struct CommandContext<'a> {
    pub config: Option<&'a Config>,
    pub paths: &'a ProjectPaths,
    pub modules: &'a ModuleRegistry,
    pub commands: &'a CommandRegistry,
    pub history: &'a HistoryStore,
    pub console: Console,
    pub prompt: &'a dyn Prompt,
    pub version: &'a str,
}

/// A built-in, non-pluggable subcommand
pub trait Command {
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &CommandContext<'_>, args: &Args, out: &mut dyn Write) -> Result<i32>;

    /// One-line description
    fn help(&self) -> String;

    fn extended_help(&self) -> String;
}

/// Source of interactive answers. `None` means nobody is there to ask.
pub trait Prompt {
    fn ask(&self, question: &str, out: &mut dyn Write) -> Result<Option<String>>;
}

/// Reads answers from stdin, only when stdin is a terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&self, question: &str, out: &mut dyn Write) -> Result<Option<String>> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return Ok(None);
        }
        write!(out, "{question}")?;
        out.flush()?;
        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        Ok(Some(line.trim().to_string()))
    }
}

/// Never answers; used when running non-interactively
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn ask(&self, _question: &str, _out: &mut dyn Write) -> Result<Option<String>> {
        Ok(None)
    }
}

/// The fixed set of built-in commands, sorted by name
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: vec![
                Box::new(All),
                Box::new(Help),
                Box::new(History),
                Box::new(Init),
                Box::new(Modules),
                Box::new(Summary),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.iter().map(|c| c.as_ref())
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
