// src/report/csv.rs

use chrono::SecondsFormat;
use std::borrow::Cow;

use crate::core::models::ScanResult;

const SUMMARY_HEADER: &[&str] = &["URL", "Score", "Grade", "Status", "MissingCount", "PresentCount"];
const FINDINGS_HEADER: &[&str] = &[
    "url",
    "missing_header",
    "severity",
    "points",
    "impact",
    "security_score",
    "status_code",
    "timestamp",
    "error",
];

/// One row per target. Failed targets have an empty score, `N/A` grade and
/// `ERROR` status.
pub fn render_summary(results: &[ScanResult]) -> String {
    let mut out = String::new();
    push_row(&mut out, SUMMARY_HEADER);

    for result in results {
        let score = result.security_score().map(|s| s.to_string()).unwrap_or_default();
        let grade = result.grade().map_or_else(|| "N/A".to_string(), |g| g.to_string());
        let status = match result.status_code() {
            Some(code) if !result.is_error() => code.to_string(),
            _ => "ERROR".to_string(),
        };
        let missing = result.missing_headers().len().to_string();
        let present = result.present_headers().len().to_string();
        push_row(&mut out, &[result.url(), &score, &grade, &status, &missing, &present]);
    }
    out
}

/// One row per missing header. A fully compliant target gets a single `None`
/// row; a failed target gets a single row carrying its error.
///
/// # Returns
/// CSV text with a header row; every row ends in `\n`.
pub fn render_findings(results: &[ScanResult]) -> String {
    let mut out = String::new();
    push_row(&mut out, FINDINGS_HEADER);

    for result in results {
        let timestamp = result.timestamp().to_rfc3339_opts(SecondsFormat::Secs, true);
        let score = result.security_score().map(|s| s.to_string()).unwrap_or_default();
        let status = result.status_code().map(|s| s.to_string()).unwrap_or_default();

        if let Some(error) = result.error() {
            let error = error.to_string();
            push_row(&mut out, &[result.url(), "", "", "", "", "", "", &timestamp, &error]);
            continue;
        }

        if result.missing_headers().is_empty() {
            push_row(
                &mut out,
                &[result.url(), "None", "N/A", "0", "All headers present", &score, &status, &timestamp, ""],
            );
            continue;
        }

        for header in result.missing_headers() {
            let severity = header.policy.severity().to_string();
            let points = header.points_lost.to_string();
            push_row(
                &mut out,
                &[
                    result.url(),
                    header.name(),
                    &severity,
                    &points,
                    header.policy.impact,
                    &score,
                    &status,
                    &timestamp,
                    "",
                ],
            );
        }
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push('\n');
}

/// Quotes a field when it contains a delimiter, quote or line break, doubling
/// any embedded quotes.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::FetchError;
    use crate::report::tests::{scored_with, ALL_HEADERS};
    use std::time::Duration;

    #[test]
    fn summary_rows_for_success_and_failure() {
        let results = vec![
            scored_with("https://good.test/", ALL_HEADERS),
            ScanResult::failed("https://down.test/", FetchError::Timeout { after: Duration::from_secs(10) }),
        ];

        let csv = render_summary(&results);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "URL,Score,Grade,Status,MissingCount,PresentCount");
        assert_eq!(lines[1], "https://good.test/,100,A+,200,0,11");
        assert_eq!(lines[2], "https://down.test/,,N/A,ERROR,0,0");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn findings_have_one_row_per_missing_header() {
        let results = vec![scored_with("https://partial.test/", &["Strict-Transport-Security", "Content-Security-Policy"])];

        let csv = render_findings(&results);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], FINDINGS_HEADER.join(","));
        assert_eq!(lines.len(), 1 + 9);
        assert!(lines[1].starts_with("https://partial.test/,X-Frame-Options,HIGH,15,"));
        assert!(lines[1].contains(",5,200,"));
    }

    #[test]
    fn findings_for_compliant_and_failed_targets() {
        let results = vec![
            scored_with("https://good.test/", ALL_HEADERS),
            ScanResult::failed("https://nx.test/", FetchError::ConnectionRefused("nx.test:443".into())),
        ];

        let csv = render_findings(&results);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("https://good.test/,None,N/A,0,All headers present,100,200,"));
        assert!(lines[2].starts_with("https://nx.test/,,,,,,,"));
        assert!(lines[2].ends_with(",connection refused: nx.test:443"));
    }
}
