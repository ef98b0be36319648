// src/core/models.rs

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Serialize, Serializer};
use strum::{Display, EnumIter, EnumString};

use crate::core::error::FetchError;
use crate::core::knowledge_base::HeaderPolicy;

// --- Classification ---

// Severity of a tracked header. The penalty for a missing header is fixed by
// its severity and cannot be configured per header.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Points lost when a header of this severity is missing.
    pub const fn points(self) -> u32 {
        match self {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 10,
            Severity::Low => 5,
        }
    }
}

// Letter grade derived from the security score. Variants are ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display, EnumIter)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Maps a score to its grade. Thresholds are inclusive lower bounds.
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Grade::APlus,
            80..=89 => Grade::A,
            70..=79 => Grade::B,
            60..=69 => Grade::C,
            50..=59 => Grade::D,
            _ => Grade::F,
        }
    }
}

// --- Header Evaluation ---

/// One tracked header as seen (or not seen) in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderObservation {
    #[serde(flatten)]
    pub policy: HeaderPolicy,
    pub present: bool,
    /// Raw header value; `None` when the header is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub points_lost: u32,
}

impl HeaderObservation {
    pub fn present(policy: HeaderPolicy, value: String) -> Self {
        Self { policy, present: true, value: Some(value), points_lost: 0 }
    }

    pub fn missing(policy: HeaderPolicy) -> Self {
        Self { points_lost: policy.points(), policy, present: false, value: None }
    }

    pub fn name(&self) -> &'static str {
        self.policy.name
    }
}

// Output of the header evaluator. Both lists follow registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub present_headers: Vec<HeaderObservation>,
    pub missing_headers: Vec<HeaderObservation>,
    pub security_score: u8,
    pub grade: Grade,
}

// --- Policy Checks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

// An informational check over the response. Checks never change the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub details: String,
}

// Everything computed for a target whose fetch succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub policy_checks: Vec<PolicyCheck>,
    pub recommendations: Vec<String>,
}

// --- Fetch Output ---

/// The terminal response of a fetch, before any evaluation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub final_url: String,
    pub status: u16,
    pub headers: HeaderMap,
}

// --- Scan Result ---

/// The outcome of scanning one target.
///
/// Built once through [`ScanResult::scored`] or [`ScanResult::failed`], so a
/// result carries either an assessment or an error, never both and never
/// neither. A failed scan has no score at all rather than a score of zero.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_url: Option<String>,
    timestamp: DateTime<Utc>,
    status_code: Option<u16>,
    #[serde(flatten)]
    assessment: Option<Assessment>,
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    error: Option<FetchError>,
}

impl ScanResult {
    pub fn scored(url: impl Into<String>, response: &RawResponse, assessment: Assessment) -> Self {
        Self {
            url: url.into(),
            final_url: Some(response.final_url.clone()),
            timestamp: Utc::now(),
            status_code: Some(response.status),
            assessment: Some(assessment),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: FetchError) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            timestamp: Utc::now(),
            status_code: None,
            assessment: None,
            error: Some(error),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn final_url(&self) -> Option<&str> {
        self.final_url.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn assessment(&self) -> Option<&Assessment> {
        self.assessment.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn security_score(&self) -> Option<u8> {
        self.assessment.as_ref().map(|a| a.evaluation.security_score)
    }

    pub fn grade(&self) -> Option<Grade> {
        self.assessment.as_ref().map(|a| a.evaluation.grade)
    }

    pub fn present_headers(&self) -> &[HeaderObservation] {
        self.assessment.as_ref().map_or(&[], |a| &a.evaluation.present_headers)
    }

    pub fn missing_headers(&self) -> &[HeaderObservation] {
        self.assessment.as_ref().map_or(&[], |a| &a.evaluation.missing_headers)
    }
}

fn serialize_error<S: Serializer>(error: &Option<FetchError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.collect_str(e),
        None => serializer.serialize_none(),
    }
}
