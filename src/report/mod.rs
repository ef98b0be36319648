// src/report/mod.rs

// Everything that turns scan results into something a person reads: the
// styled console output and the export files.
pub mod console;
pub mod csv;
pub mod json;
pub mod text;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use color_eyre::eyre::{Result, WrapErr};
use std::path::Path;
use strum::Display;
use tracing::info;

use crate::core::models::ScanResult;

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    /// One summary row per target.
    Csv,
    /// One row per missing header.
    Findings,
    Json,
    Text,
}

impl ExportFormat {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(ExportFormat::Csv),
            "json" => Some(ExportFormat::Json),
            "txt" | "text" => Some(ExportFormat::Text),
            _ => None,
        }
    }

    /// An explicit format wins, then the extension, then CSV.
    pub fn resolve(explicit: Option<Self>, path: &Path) -> Self {
        explicit.or_else(|| Self::from_path(path)).unwrap_or(ExportFormat::Csv)
    }

    /// Renders `results` in this format.
    ///
    /// # Arguments
    /// * `results` - Scan results in input order; failed targets included.
    /// * `generated_at` - Timestamp stamped into the JSON and text headers.
    ///
    /// # Returns
    /// The full file contents, or an error if JSON serialization fails.
    pub fn render(self, results: &[ScanResult], generated_at: DateTime<Utc>) -> Result<String> {
        let rendered = match self {
            ExportFormat::Csv => csv::render_summary(results),
            ExportFormat::Findings => csv::render_findings(results),
            ExportFormat::Json => json::render(results, generated_at).wrap_err("failed to serialize results")?,
            ExportFormat::Text => text::render(results, generated_at),
        };
        Ok(rendered)
    }
}

/// Renders `results` and writes them to `path`.
///
/// # Arguments
/// * `path` - Destination file; an existing file is overwritten.
/// * `format` - The export format.
/// * `results` - The results to export.
///
/// # Returns
/// `Ok(())` once the file is written, or the render or I/O error with the
/// path attached.
pub fn write_export(path: &Path, format: ExportFormat, results: &[ScanResult]) -> Result<()> {
    let content = format.render(results, Utc::now())?;
    std::fs::write(path, content).wrap_err_with(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), %format, records = results.len(), "Export written.");
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::knowledge_base::PolicyRegistry;
    use crate::core::models::RawResponse;
    use crate::core::scanner::assess;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    pub const ALL_HEADERS: &[&str] = &[
        "Strict-Transport-Security",
        "Content-Security-Policy",
        "X-Frame-Options",
        "X-Content-Type-Options",
        "Referrer-Policy",
        "Permissions-Policy",
        "Cache-Control",
        "Cross-Origin-Resource-Policy",
        "Cross-Origin-Opener-Policy",
        "Cross-Origin-Embedder-Policy",
        "X-XSS-Protection",
    ];

    /// A 200 response scored against the builtin registry, carrying `present`.
    pub fn scored_with(url: &str, present: &[&str]) -> ScanResult {
        let mut headers = HeaderMap::new();
        for name in present {
            headers.insert(HeaderName::from_bytes(name.as_bytes()).unwrap(), HeaderValue::from_static("set"));
        }
        let response = RawResponse { final_url: url.to_string(), status: 200, headers };
        ScanResult::scored(url, &response, assess(PolicyRegistry::builtin(), &response))
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::from_path(Path::new("report.txt")), Some(ExportFormat::Text));
        assert_eq!(ExportFormat::from_path(Path::new("results")), None);
    }

    #[test]
    fn explicit_format_overrides_extension_and_csv_is_fallback() {
        assert_eq!(ExportFormat::resolve(Some(ExportFormat::Text), Path::new("a.json")), ExportFormat::Text);
        assert_eq!(ExportFormat::resolve(None, Path::new("a.json")), ExportFormat::Json);
        assert_eq!(ExportFormat::resolve(None, Path::new("results")), ExportFormat::Csv);
    }

    #[test]
    fn write_export_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.csv");
        let results = vec![scored_with("https://a.test/", ALL_HEADERS)];

        write_export(&path, ExportFormat::resolve(None, &path), &results).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("URL,Score,Grade,Status,MissingCount,PresentCount\n"));
        assert!(written.contains("https://a.test/,100,A+,200,0,11"));
    }
}
