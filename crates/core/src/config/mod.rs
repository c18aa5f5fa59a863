//! Configuration management for qualis

mod settings;
pub mod module_settings;
pub mod paths;

// Re-export main types
pub use module_settings::ModuleSettings;
pub use paths::{ProjectPaths, STATE_DIR_NAME};
pub use settings::{Config, DEFAULT_BUILD_ORDER};
