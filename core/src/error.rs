//! Error types for the VM API client.
//!
//! # Design
//! Only failures detected before a request leaves the process are returned
//! as `Err`. Everything the remote side (or the network) does wrong is folded
//! into a synthesized `Envelope` instead, so callers handle server failures
//! and malformed responses through one code path.

use thiserror::Error;

/// Errors returned by `VmClient` and `VmConfig`.
#[derive(Debug, Error)]
pub enum VmError {
    /// An identifier failed client-side validation; no request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be loaded or is missing required keys.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
