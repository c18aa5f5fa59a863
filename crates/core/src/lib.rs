//! qualis - a project build-quality orchestrator
//!
//! This crate provides:
//! - Pluggable analysis modules (coverage, tests, coding standard) behind a registry
//! - Built-in commands that run modules in a configured build order
//! - An append-only history of module runs
//! - Clover coverage aggregation with common-root inference
pub mod app;
pub mod args;
pub mod command;
pub mod config;
pub mod coverage;
pub mod error;
pub mod history;
pub mod module;
pub mod output;
pub mod process;

pub use app::{GlobalOptions, Qualis, VERSION};
pub use args::Args;
pub use config::{Config, ModuleSettings, ProjectPaths};
pub use error::{Error, Result};
pub use history::{HistoryRecord, HistoryStore};
pub use module::{exit_code, Metrics, Module, ModuleContext, ModuleFactory, ModuleRegistry};
pub use output::Console;
