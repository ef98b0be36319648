// src/core/summary.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::models::{Grade, ScanResult};

/// Aggregate statistics over a set of scan results.
///
/// Failed targets count toward `total` and `failed` only; every score
/// statistic is computed over successful scans.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Mean of the successful scores, `None` when nothing succeeded.
    pub average_score: Option<f64>,
    pub highest_score: Option<u8>,
    pub lowest_score: Option<u8>,
    pub grades: BTreeMap<Grade, usize>,
}

impl BulkSummary {
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a ScanResult>,
    {
        let mut total = 0;
        let mut scores: Vec<u8> = Vec::new();
        let mut grades = BTreeMap::new();

        for result in results {
            total += 1;
            if let (Some(score), Some(grade)) = (result.security_score(), result.grade()) {
                scores.push(score);
                *grades.entry(grade).or_insert(0) += 1;
            }
        }

        let average_score = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64)
        };

        Self {
            total,
            successful: scores.len(),
            failed: total - scores.len(),
            average_score,
            highest_score: scores.iter().copied().max(),
            lowest_score: scores.iter().copied().min(),
            grades,
        }
    }
}
