use std::io;

use crate::module::exit_code;

/// Errors that can occur during qualis operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Failed to parse configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid ignore pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// A coverage dataset or analysis results file is missing or malformed
    #[error("{0}")]
    ReportSource(String),

    #[error("Module error: {0}")]
    ModuleError(String),

    /// No module or command is registered under the requested name
    #[error("{0}")]
    UnknownTarget(String),

    #[error("Command '{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    /// Execution stops with a message and a status chosen by the failure site
    #[error("{message}")]
    Halt { message: String, status: i32 },
}

impl Error {
    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Halt { status, .. } => *status,
            Error::ReportSource(_) | Error::UnknownTarget(_) => exit_code::USAGE,
            Error::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::ERROR,
        }
    }

    pub fn halt(message: impl Into<String>, status: i32) -> Self {
        Error::Halt {
            message: message.into(),
            status,
        }
    }
}

/// Result type alias for qualis operations
pub type Result<T> = std::result::Result<T, Error>;
