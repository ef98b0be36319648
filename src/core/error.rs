// src/core/error.rs

use std::time::Duration;
use thiserror::Error;

/// A transport failure for a single target.
///
/// These never abort a bulk job: the orchestrator records them on the
/// target's `ScanResult` and moves on to the next target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolutionFailed { host: String, reason: String },

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("too many redirects (limit is {limit})")]
    TooManyRedirects { limit: usize },

    /// Anything the transport reported that fits none of the classes above
    /// (connection reset, malformed response, proxy failure).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Input rejected before any network activity takes place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("no targets supplied")]
    NoTargets,

    #[error("too many targets: {count} supplied, at most {max} allowed")]
    TooManyTargets { count: usize, max: usize },

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("concurrency must be between {min} and {max}, got {value}")]
    ConcurrencyOutOfRange { value: usize, min: usize, max: usize },

    #[error("timeout must be between {min} and {max} seconds, got {value}")]
    TimeoutOutOfRange { value: u64, min: u64, max: u64 },

    #[error("delay must be between 0 and {max} seconds, got {value}")]
    DelayOutOfRange { value: f64, max: f64 },

    #[error("invalid proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },

    #[error("duplicate header policy '{0}'")]
    DuplicatePolicy(String),

    #[error("could not configure HTTP client: {0}")]
    HttpClient(String),
}
