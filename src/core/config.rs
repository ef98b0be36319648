// src/core/config.rs

use clap::ValueEnum;
use std::ops::RangeInclusive;
use std::time::Duration;
use strum::Display;
use url::Url;

use crate::core::error::ValidationError;

pub const MAX_TARGETS: usize = 50;
pub const CONCURRENCY_RANGE: RangeInclusive<usize> = 1..=10;
pub const TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 1..=60;
pub const MAX_DELAY_SECS: f64 = 5.0;
pub const MAX_REDIRECTS: usize = 5;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_DELAY_SECS: f64 = 0.5;
pub const DEFAULT_USER_AGENT: &str = concat!("VanguardHeaders/", env!("CARGO_PKG_VERSION"));

/// Adds `https://` to a bare host and checks the result is an absolute
/// http(s) URL with a host.
pub fn normalize_url(raw: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUrl { url: raw.to_string(), reason: reason.to_string() };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty URL"));
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if trimmed.contains("://") {
        return Err(invalid("only http and https are supported"));
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(invalid("missing host")),
    }
}

/// Per-request options shared by every target of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub follow_redirects: bool,
    pub timeout: Duration,
    pub verbose: bool,
}

impl ScanOptions {
    pub fn new(timeout_secs: u64, follow_redirects: bool, verbose: bool) -> Result<Self, ValidationError> {
        if !TIMEOUT_RANGE_SECS.contains(&timeout_secs) {
            return Err(ValidationError::TimeoutOutOfRange {
                value: timeout_secs,
                min: *TIMEOUT_RANGE_SECS.start(),
                max: *TIMEOUT_RANGE_SECS.end(),
            });
        }
        Ok(Self { follow_redirects, timeout: Duration::from_secs(timeout_secs), verbose })
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self { follow_redirects: true, timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS), verbose: false }
    }
}

/// A single URL plus its options. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    url: String,
    options: ScanOptions,
}

impl ScanTarget {
    pub fn new(raw_url: &str, options: ScanOptions) -> Result<Self, ValidationError> {
        let url = normalize_url(raw_url)?;
        Ok(Self { url: url.to_string(), options })
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }
}

/// How the inter-request delay is applied across a bulk job's workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum PacingPolicy {
    /// Each worker waits the delay since its own previous dispatch.
    #[default]
    PerWorker,
    /// Every dispatch in the job is spaced by the delay.
    Global,
}

/// Validated settings of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BulkOptions {
    pub concurrency: usize,
    pub delay: Duration,
    pub pacing: PacingPolicy,
    pub scan: ScanOptions,
}

impl BulkOptions {
    pub fn new(concurrency: usize, delay_secs: f64, scan: ScanOptions) -> Result<Self, ValidationError> {
        if !CONCURRENCY_RANGE.contains(&concurrency) {
            return Err(ValidationError::ConcurrencyOutOfRange {
                value: concurrency,
                min: *CONCURRENCY_RANGE.start(),
                max: *CONCURRENCY_RANGE.end(),
            });
        }
        if !delay_secs.is_finite() || !(0.0..=MAX_DELAY_SECS).contains(&delay_secs) {
            return Err(ValidationError::DelayOutOfRange { value: delay_secs, max: MAX_DELAY_SECS });
        }
        Ok(Self {
            concurrency,
            delay: Duration::from_secs_f64(delay_secs),
            pacing: PacingPolicy::default(),
            scan,
        })
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            pacing: PacingPolicy::default(),
            scan: ScanOptions::default(),
        }
    }
}

/// Client-wide settings of the HTTP fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub user_agent: String,
    pub proxy: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self { user_agent: DEFAULT_USER_AGENT.to_string(), proxy: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_defaults_to_https() {
        let url = normalize_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn explicit_scheme_is_kept() {
        assert_eq!(normalize_url("http://example.com/login").unwrap().as_str(), "http://example.com/login");
        assert_eq!(normalize_url("  HTTPS://Example.com ").unwrap().as_str(), "https://example.com/");
    }

    #[test]
    fn malformed_urls_are_rejected() {
        assert!(matches!(normalize_url(""), Err(ValidationError::InvalidUrl { .. })));
        assert!(matches!(normalize_url("ftp://example.com"), Err(ValidationError::InvalidUrl { .. })));
        assert!(matches!(normalize_url("https://"), Err(ValidationError::InvalidUrl { .. })));
        assert!(matches!(normalize_url("exa mple.com"), Err(ValidationError::InvalidUrl { .. })));
    }

    #[test]
    fn timeout_range_is_enforced() {
        assert!(ScanOptions::new(1, true, false).is_ok());
        assert!(ScanOptions::new(60, true, false).is_ok());
        assert_eq!(
            ScanOptions::new(0, true, false),
            Err(ValidationError::TimeoutOutOfRange { value: 0, min: 1, max: 60 })
        );
        assert!(ScanOptions::new(61, true, false).is_err());
    }

    #[test]
    fn bulk_ranges_are_enforced() {
        let scan = ScanOptions::default();
        assert!(BulkOptions::new(1, 0.0, scan).is_ok());
        assert!(BulkOptions::new(10, 5.0, scan).is_ok());
        assert!(matches!(
            BulkOptions::new(0, 0.5, scan),
            Err(ValidationError::ConcurrencyOutOfRange { value: 0, .. })
        ));
        assert!(matches!(BulkOptions::new(11, 0.5, scan), Err(ValidationError::ConcurrencyOutOfRange { .. })));
        assert!(matches!(BulkOptions::new(3, 5.5, scan), Err(ValidationError::DelayOutOfRange { .. })));
        assert!(matches!(BulkOptions::new(3, -0.1, scan), Err(ValidationError::DelayOutOfRange { .. })));
        assert!(matches!(BulkOptions::new(3, f64::NAN, scan), Err(ValidationError::DelayOutOfRange { .. })));
    }

    #[test]
    fn pacing_defaults_to_per_worker() {
        let options = BulkOptions::new(2, 1.0, ScanOptions::default()).unwrap();
        assert_eq!(options.pacing, PacingPolicy::PerWorker);
        assert_eq!(options.with_pacing(PacingPolicy::Global).pacing, PacingPolicy::Global);
    }
}
