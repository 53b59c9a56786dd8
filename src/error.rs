//! Error types for the ingestion crate.
//!
//! Line parsing is total and has no error type of its own. Errors here
//! cover the line codec, configuration loading, and the connection and
//! output plumbing around the pipeline.

use thiserror::Error;

/// Convenience type alias for Results using [`IngestError`].
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Errors raised while framing lines off the wire.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded the maximum allowed length.
    #[error("line too long: {0} bytes")]
    LineTooLong(usize),

    /// Illegal control character in an outgoing line.
    #[error("illegal control character: {0:?}")]
    IllegalControlChar(char),
}

/// Errors encountered while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::Config`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value the ingestor cannot run with.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// The offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Top-level ingestion errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// I/O error while connecting.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The line codec failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// TLS was requested but could not be set up.
    #[error("tls error: {0}")]
    Tls(String),

    /// The record output was dropped by its receiver.
    #[error("record output closed")]
    OutputClosed,
}
