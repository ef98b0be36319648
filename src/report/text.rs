// src/report/text.rs

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::core::models::ScanResult;
use crate::core::summary::BulkSummary;

/// Plain-text report with a per-header severity and point breakdown.
pub fn render(results: &[ScanResult], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, results, generated_at);
    out
}

fn write_report(out: &mut String, results: &[ScanResult], generated_at: DateTime<Utc>) -> std::fmt::Result {
    writeln!(out, "Vanguard Headers Scan Report")?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "Total URLs Scanned: {}", results.len())?;
    writeln!(out)?;

    for (index, result) in results.iter().enumerate() {
        writeln!(out, "{}. {}", index + 1, result.url())?;

        if let Some(error) = result.error() {
            writeln!(out, "   ERROR: {error}")?;
            writeln!(out)?;
            continue;
        }
        let Some(assessment) = result.assessment() else { continue };
        let evaluation = &assessment.evaluation;

        writeln!(out, "   Security Score: {}/100 (Grade: {})", evaluation.security_score, evaluation.grade)?;
        if let Some(code) = result.status_code() {
            writeln!(out, "   Status Code: {code}")?;
        }
        if let Some(final_url) = result.final_url().filter(|u| *u != result.url()) {
            writeln!(out, "   Final URL: {final_url}")?;
        }

        if !evaluation.present_headers.is_empty() {
            writeln!(out, "   Present Headers ({}):", evaluation.present_headers.len())?;
            for header in &evaluation.present_headers {
                writeln!(out, "     + {} ({})", header.name(), header.policy.severity())?;
            }
        }
        if !evaluation.missing_headers.is_empty() {
            writeln!(out, "   Missing Headers ({}):", evaluation.missing_headers.len())?;
            for header in &evaluation.missing_headers {
                writeln!(out, "     - {} ({}) [-{} pts]", header.name(), header.policy.severity(), header.points_lost)?;
            }
        }
        if !assessment.policy_checks.is_empty() {
            writeln!(out, "   Policy Checks:")?;
            for check in &assessment.policy_checks {
                writeln!(out, "     [{}] {}: {}", check.status, check.name, check.details)?;
            }
        }
        writeln!(out)?;
    }

    let summary = BulkSummary::from_results(results);
    writeln!(out, "Summary")?;
    writeln!(out, "   Successful: {}", summary.successful)?;
    writeln!(out, "   Failed: {}", summary.failed)?;
    if let (Some(avg), Some(high), Some(low)) = (summary.average_score, summary.highest_score, summary.lowest_score) {
        writeln!(out, "   Average Score: {avg:.1}/100")?;
        writeln!(out, "   Highest Score: {high}/100")?;
        writeln!(out, "   Lowest Score: {low}/100")?;
    }
    for (grade, count) in &summary.grades {
        writeln!(out, "   {grade}: {count}")?;
    }
    Ok(())
}
