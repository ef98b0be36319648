// src/core/scanner/headers_scanner.rs

use tracing::{debug, warn};
use reqwest::header::HeaderMap;

use crate::core::knowledge_base::PolicyRegistry;
use crate::core::models::{Evaluation, Grade, HeaderObservation};

/// Reads a header's raw value from a `HeaderMap`.
///
/// # Arguments
/// * `headers` - The response headers. Names in a `HeaderMap` are stored
///   lowercase, so lookups are case-insensitive.
/// * `name` - The header name, in any case.
///
/// # Returns
/// `Some(value)` if the header is present, `None` otherwise. Repeated headers
/// are joined with `", "`. Values that are not valid UTF-8 are reported as a
/// placeholder so the header still counts as present.
pub fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let key = name.to_ascii_lowercase();
    let mut values = headers.get_all(key.as_str()).iter().peekable();
    values.peek()?;

    let joined = values
        .map(|value| match value.to_str() {
            Ok(s) => s.to_string(),
            Err(_) => {
                warn!(header_name = name, "Header found but contained invalid UTF-8.");
                "[Invalid UTF-8]".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    Some(joined)
}

/// Classifies a response's headers against the registry and scores them.
///
/// Every policy lands in exactly one of the two lists, in registry order.
/// Headers the registry does not track are ignored. The score is 100 minus
/// the points lost to missing headers, floored at 0.
///
/// # Arguments
/// * `registry` - The policies to evaluate against.
/// * `status` - The response status code (logged only; it does not affect the score).
/// * `headers` - The response headers.
pub fn evaluate(registry: &PolicyRegistry, status: u16, headers: &HeaderMap) -> Evaluation {
    debug!(status, policies = registry.all_policies().len(), "Evaluating response headers.");

    let mut present_headers = Vec::new();
    let mut missing_headers = Vec::new();

    for policy in registry.all_policies() {
        match header_value(headers, policy.name) {
            Some(value) => {
                debug!(header_name = policy.name, value = %value, "Header found.");
                present_headers.push(HeaderObservation::present(*policy, value));
            }
            None => {
                debug!(header_name = policy.name, points = policy.points(), "Header missing.");
                missing_headers.push(HeaderObservation::missing(*policy));
            }
        }
    }

    let points_lost: u32 = missing_headers.iter().map(|h| h.points_lost).sum();
    let security_score = 100u32.saturating_sub(points_lost) as u8;
    let grade = Grade::from_score(security_score);

    debug!(security_score, grade = %grade, missing = missing_headers.len(), "Evaluation finished.");
    Evaluation { present_headers, missing_headers, security_score, grade }
}
