// src/core/mod.rs

// Root of the `core` module: everything that scans and scores, with no
// knowledge of the terminal or of export formats.

/// Validated scan and bulk options, and URL normalization.
pub mod config;

pub mod error;

/// Data structures shared across the application, such as `ScanResult`,
/// `Severity` and `Grade`.
pub mod models;

/// Fetching, header evaluation and the bulk orchestrator.
pub mod scanner;

/// The security header policies and their reference text.
pub mod knowledge_base;

pub mod summary;
