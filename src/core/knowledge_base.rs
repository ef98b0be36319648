//! The policy registry: a static, read-only table of every security header
//! the scanner knows about, with its severity and the reference text shown
//! to users.
//!
//! The table is built once and shared by every scan without locking. Custom
//! registries can be assembled with [`PolicyRegistry::new`] when a caller
//! wants to score against a narrower set of headers.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::error::ValidationError;
use crate::core::models::Severity;

/// A tracked security header.
///
/// `points` is always derived from `severity`; the only way to build a policy
/// is [`HeaderPolicy::new`], which keeps the two in step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeaderPolicy {
    /// Canonical header name, e.g. `Strict-Transport-Security`.
    pub name: &'static str,
    severity: Severity,
    points: u32,
    /// What the header does.
    pub description: &'static str,
    /// Why a site should send it.
    pub purpose: &'static str,
    /// A reasonable value.
    pub example: &'static str,
    /// What goes wrong without it.
    pub impact: &'static str,
}

impl HeaderPolicy {
    pub const fn new(
        name: &'static str,
        severity: Severity,
        description: &'static str,
        purpose: &'static str,
        example: &'static str,
        impact: &'static str,
    ) -> Self {
        Self { name, severity, points: severity.points(), description, purpose, example, impact }
    }

    pub const fn severity(&self) -> Severity {
        self.severity
    }

    pub const fn points(&self) -> u32 {
        self.points
    }
}

/// The built-in policy table, in evaluation order.
static POLICIES: &[HeaderPolicy] = &[
    // --- Transport & Content Loading ---
    HeaderPolicy::new(
        "Strict-Transport-Security",
        Severity::Critical,
        "Forces HTTPS connections and prevents protocol downgrade attacks.",
        "Protects against man-in-the-middle attacks by ensuring HTTPS.",
        "max-age=31536000; includeSubDomains; preload",
        "High risk of MITM attacks and protocol downgrade.",
    ),
    HeaderPolicy::new(
        "Content-Security-Policy",
        Severity::Critical,
        "Prevents XSS attacks by controlling which resources the browser may load.",
        "Defines approved sources of content to prevent XSS.",
        "default-src 'self'; script-src 'self'",
        "High risk of XSS and code injection attacks.",
    ),
    // --- Framing & Sniffing ---
    HeaderPolicy::new(
        "X-Frame-Options",
        Severity::High,
        "Prevents clickjacking attacks by controlling iframe embedding.",
        "Protects against clickjacking attacks.",
        "DENY or SAMEORIGIN",
        "Vulnerable to clickjacking and UI redressing attacks.",
    ),
    HeaderPolicy::new(
        "X-Content-Type-Options",
        Severity::High,
        "Prevents MIME type sniffing attacks.",
        "Stops browsers from MIME type sniffing.",
        "nosniff",
        "Risk of MIME confusion attacks and content sniffing.",
    ),
    // --- Privacy & Feature Control ---
    HeaderPolicy::new(
        "Referrer-Policy",
        Severity::Medium,
        "Controls how much referrer information is sent with requests.",
        "Protects user privacy by limiting referrer data.",
        "strict-origin-when-cross-origin",
        "Information disclosure through referrer headers.",
    ),
    HeaderPolicy::new(
        "Permissions-Policy",
        Severity::Medium,
        "Controls access to browser features and APIs.",
        "Restricts access to sensitive browser features.",
        "geolocation=(), microphone=(), camera=()",
        "Unauthorized access to browser features and APIs.",
    ),
    HeaderPolicy::new(
        "Cache-Control",
        Severity::Medium,
        "Controls caching behavior for sensitive content.",
        "Prevents sensitive data from being cached by browsers or intermediaries.",
        "no-cache, no-store, must-revalidate",
        "Sensitive data exposure through browser or proxy caches.",
    ),
    // --- Cross-Origin Isolation ---
    HeaderPolicy::new(
        "Cross-Origin-Resource-Policy",
        Severity::Medium,
        "Prevents other sites from loading this resource unless allowed.",
        "Mitigates data leaks via embedded resources.",
        "same-origin",
        "Resources can be embedded and read by any origin.",
    ),
    HeaderPolicy::new(
        "Cross-Origin-Opener-Policy",
        Severity::Medium,
        "Isolates the browsing context from cross-origin windows.",
        "Blocks cross-window attacks such as tabnabbing and XS-Leaks.",
        "same-origin",
        "Cross-origin documents can keep a reference to this window.",
    ),
    HeaderPolicy::new(
        "Cross-Origin-Embedder-Policy",
        Severity::Medium,
        "Requires cross-origin resources to opt in before being embedded.",
        "Enables cross-origin isolation together with COOP.",
        "require-corp",
        "The page cannot be cross-origin isolated.",
    ),
    // --- Legacy ---
    HeaderPolicy::new(
        "X-XSS-Protection",
        Severity::Low,
        "Enables XSS filtering in legacy browsers.",
        "Provides basic XSS protection for older browsers.",
        "1; mode=block",
        "Limited XSS protection in legacy browsers.",
    ),
];

static BUILTIN: Lazy<PolicyRegistry> = Lazy::new(|| PolicyRegistry { policies: POLICIES.to_vec() });

/// An ordered set of header policies with unique, case-insensitive names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRegistry {
    policies: Vec<HeaderPolicy>,
}

impl PolicyRegistry {
    /// The built-in registry, initialized on first use.
    pub fn builtin() -> &'static PolicyRegistry {
        &BUILTIN
    }

    /// Builds a registry from an explicit policy list, keeping its order.
    pub fn new(policies: Vec<HeaderPolicy>) -> Result<Self, ValidationError> {
        for (i, policy) in policies.iter().enumerate() {
            if policies[..i].iter().any(|p| p.name.eq_ignore_ascii_case(policy.name)) {
                return Err(ValidationError::DuplicatePolicy(policy.name.to_string()));
            }
        }
        Ok(Self { policies })
    }

    pub fn all_policies(&self) -> &[HeaderPolicy] {
        &self.policies
    }

    /// Finds the policy for a header name.
    ///
    /// # Arguments
    /// * `header_name` - Header name in any letter case.
    ///
    /// # Returns
    /// The matching policy, or `None` when the header is not tracked.
    pub fn lookup(&self, header_name: &str) -> Option<&HeaderPolicy> {
        self.policies.iter().find(|p| p.name.eq_ignore_ascii_case(header_name))
    }

    /// Reference view of the registry keyed by header name.
    pub fn reference(&self) -> BTreeMap<&'static str, &HeaderPolicy> {
        self.policies.iter().map(|p| (p.name, p)).collect()
    }
}
