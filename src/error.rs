//! Error types for walking messages

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by a part visitor.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while buffering or walking a message
#[derive(Error, Debug)]
pub enum WalkError {
    /// The raw message could not be parsed at all
    #[error("Failed to parse message structure: {0}")]
    Message(#[from] mailparse::MailParseError),

    /// A declared Content-Type header does not follow `type/subtype`
    #[error("Invalid Content-Type {value:?} in part {part}")]
    ContentType { part: String, value: String },

    /// The message source could not be read
    #[error("Failed to read message: {0}")]
    Read(#[from] std::io::Error),

    /// The transfer encoding of a body could not be reversed
    #[error("Failed to decode body of part {part}: {source}")]
    Decode {
        part: String,
        source: mailparse::MailParseError,
    },

    /// Reading a body or writing its spill file failed
    #[error("I/O error buffering part {part}: {source}")]
    Io {
        part: String,
        source: std::io::Error,
    },

    /// Entities nest deeper than the configured guard
    #[error("Part {part} is nested {depth} levels deep, limit is {max}")]
    TooDeep {
        part: String,
        depth: usize,
        max: usize,
    },

    /// The visitor failed on a part
    #[error("visit({file_name:?}): {source}")]
    Visitor { file_name: String, source: BoxError },

    /// `walk` was handed a part that carries no parsed entity
    #[error("Part {0} has no entity to walk")]
    MissingEntity(String),
}

impl WalkError {
    /// Returns the part identity the error is tagged with, if any.
    #[must_use]
    pub fn part(&self) -> Option<&str> {
        match self {
            Self::ContentType { part, .. }
            | Self::Decode { part, .. }
            | Self::Io { part, .. }
            | Self::TooDeep { part, .. }
            | Self::MissingEntity(part) => Some(part),
            Self::Message(_) | Self::Read(_) | Self::Visitor { .. } => None,
        }
    }
}

/// Errors that can occur while loading a [`crate::WalkConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is out of range
    #[error("Invalid config value for {key}: {details}")]
    Invalid { key: String, details: String },
}

/// Result type for walk operations
pub type Result<T> = std::result::Result<T, WalkError>;
