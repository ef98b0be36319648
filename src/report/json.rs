// src/report/json.rs

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::models::ScanResult;
use crate::core::summary::BulkSummary;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    scan_date: DateTime<Utc>,
    total_scanned: usize,
    summary: BulkSummary,
    results: &'a [ScanResult],
}

/// Serializes `results` inside an envelope with the scan date, count and
/// bulk summary. Result fields are camelCase.
///
/// # Arguments
/// * `results` - The results to export.
/// * `scan_date` - The `scanDate` value.
///
/// # Returns
/// Pretty-printed JSON.
pub fn render(results: &[ScanResult], scan_date: DateTime<Utc>) -> serde_json::Result<String> {
    let export = JsonExport {
        scan_date,
        total_scanned: results.len(),
        summary: BulkSummary::from_results(results),
        results,
    };
    serde_json::to_string_pretty(&export)
}
