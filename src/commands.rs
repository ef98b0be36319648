// src/commands.rs

//! Command line definitions.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::core::config::{
    FetcherConfig, PacingPolicy, ScanOptions, DEFAULT_CONCURRENCY, DEFAULT_DELAY_SECS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
use crate::core::error::ValidationError;
use crate::report::ExportFormat;

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a single URL and grade its security headers
    Scan {
        /// Target URL; `https://` is assumed when no scheme is given
        url: String,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Scan up to 50 URLs concurrently
    Bulk {
        /// File with one URL per line; blank lines and `#` comments are ignored
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// URL to scan; may be repeated
        #[arg(short = 'u', long = "url")]
        urls: Vec<String>,

        /// Number of requests in flight at once (1-10)
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Seconds to wait between dispatches (0-5)
        #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
        delay: f64,

        /// Whether the delay applies per worker or across the whole job
        #[arg(long, value_enum, default_value_t = PacingPolicy::PerWorker)]
        pacing: PacingPolicy,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the reference for every tracked security header, or just one
    Reference {
        /// Header to describe, e.g. content-security-policy (any case)
        header: Option<String>,

        /// Print the reference as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct RequestArgs {
    /// Request timeout in seconds (1-60)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Grade the first response instead of following redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Custom User-Agent string
    #[arg(long)]
    pub user_agent: Option<String>,

    /// HTTP proxy, e.g. http://127.0.0.1:8080
    #[arg(long)]
    pub proxy: Option<String>,
}

impl RequestArgs {
    pub fn scan_options(&self, verbose: bool) -> Result<ScanOptions, ValidationError> {
        ScanOptions::new(self.timeout, !self.no_follow_redirects, verbose)
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            user_agent: self.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            proxy: self.proxy.clone(),
        }
    }
}

#[derive(Args)]
pub struct OutputArgs {
    /// Show header values, impact and recommendations
    #[arg(short, long)]
    pub verbose: bool,

    /// Save results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Export format; guessed from the file extension when omitted
    #[arg(long, value_enum, requires = "output")]
    pub format: Option<ExportFormat>,
}
