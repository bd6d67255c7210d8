//! Error types for callwatch

use crate::permissions::Capability;
use thiserror::Error;

/// Main error type for callwatch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Permission denied: {capability}")]
    PermissionDenied { capability: Capability },

    #[error("Contact directory could not be loaded: {reason}")]
    DirectoryLoad { reason: String },

    #[error("Call detection registration failed: {reason}")]
    DetectionRegistration { reason: String },

    #[error("Unknown call event kind: {kind}")]
    UnknownEventKind { kind: String },

    #[error("Background service error: {reason}")]
    Background { reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },
}

/// Result type alias for callwatch operations
pub type Result<T> = std::result::Result<T, Error>;
