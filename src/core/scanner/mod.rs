// src/core/scanner/mod.rs

// Public interface of the scanner: the fetcher, the header evaluator, the
// informational policy checks and the bulk orchestrator.
pub mod bulk;
pub mod fetcher;
pub mod headers_scanner;
pub mod policy_checks;

#[cfg(test)]
pub(crate) mod mock_fetcher;

use tracing::{info, warn};

use crate::core::config::ScanTarget;
use crate::core::knowledge_base::PolicyRegistry;
use crate::core::models::{Assessment, RawResponse, ScanResult};
use self::fetcher::Fetcher;
use self::headers_scanner::evaluate;
use self::policy_checks::run_policy_checks;

/// Evaluates a fetched response: score and grade, policy checks, and one
/// recommendation per missing header.
pub fn assess(registry: &PolicyRegistry, response: &RawResponse) -> Assessment {
    let evaluation = evaluate(registry, response.status, &response.headers);
    let policy_checks = run_policy_checks(&response.final_url, &response.headers);
    let recommendations = evaluation
        .missing_headers
        .iter()
        .map(|h| format!("Implement {}: {}", h.name(), h.policy.description))
        .collect();

    Assessment { evaluation, policy_checks, recommendations }
}

/// Scans a single target: fetch, then evaluate.
///
/// A fetch failure does not propagate; it becomes a `ScanResult` with its
/// error set and no score.
pub async fn scan_target<F>(fetcher: &F, registry: &PolicyRegistry, target: &ScanTarget) -> ScanResult
where
    F: Fetcher + ?Sized,
{
    info!(url = target.url(), "Starting headers scan.");
    match fetcher.fetch(target).await {
        Ok(response) => {
            let assessment = assess(registry, &response);
            info!(
                url = target.url(),
                score = assessment.evaluation.security_score,
                grade = %assessment.evaluation.grade,
                "Headers scan finished."
            );
            ScanResult::scored(target.url(), &response, assessment)
        }
        Err(e) => {
            warn!(url = target.url(), error = %e, "Headers scan failed.");
            ScanResult::failed(target.url(), e)
        }
    }
}
