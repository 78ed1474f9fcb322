// Configuration loading errors

use crate::error::ErrorCode;
use std::fmt;

/// Config error code constants
///
/// Error code range: 3001-3002
pub struct ConfigErrorCodes;

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const IO: i32 = 3001;

    /// Config file is not valid JSON for [`crate::config::AppConfig`]
    pub const PARSE: i32 = 3002;
}

/// Errors surfaced by `AppConfig::try_load_from_file`
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io { path: String, reason: String },
    Parse { path: String, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Io { path, reason } => {
                format!("Failed to read config file {}: {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                format!("Failed to parse config file {}: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ConfigError {}
