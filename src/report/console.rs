// src/report/console.rs

//! Styled terminal output for scan results, bulk summaries and the header
//! reference. Every renderer returns a `String` so the caller decides where
//! it goes; styling is skipped entirely when color is off.

use crossterm::style::{style, Color, Stylize};
use std::fmt::Display;

use crate::core::knowledge_base::{HeaderPolicy, PolicyRegistry};
use crate::core::models::{CheckStatus, Grade, ScanResult, Severity};
use crate::core::scanner::bulk::{BulkEntry, Progress};
use crate::core::summary::BulkSummary;

const SEPARATOR_WIDTH: usize = 70;

#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint<D: Display>(&self, text: D, color: Color) -> String {
        if self.color { style(text).with(color).to_string() } else { text.to_string() }
    }

    fn bold<D: Display>(&self, text: D, color: Color) -> String {
        if self.color { style(text).with(color).bold().to_string() } else { text.to_string() }
    }

    fn severity_color(severity: Severity) -> Color {
        match severity {
            Severity::Critical => Color::Red,
            Severity::High => Color::Yellow,
            Severity::Medium => Color::Cyan,
            Severity::Low => Color::Green,
        }
    }

    fn grade_color(grade: Grade) -> Color {
        match grade {
            Grade::APlus | Grade::A => Color::Green,
            Grade::B => Color::Cyan,
            Grade::C | Grade::D => Color::Yellow,
            Grade::F => Color::Red,
        }
    }

    pub fn section(&self, title: &str) -> String {
        let rule = "=".repeat(SEPARATOR_WIDTH);
        format!("\n{}\n{}\n{}", self.paint(&rule, Color::Blue), self.bold(title, Color::White), self.paint(&rule, Color::Blue))
    }

    /// Full result block for one target. `verbose` adds header values,
    /// impact text and recommendations.
    pub fn result(&self, result: &ScanResult, verbose: bool) -> String {
        let mut lines = vec![
            String::new(),
            self.bold(format!("[+] TARGET: {}", result.url()), Color::Blue),
            self.paint("-".repeat(SEPARATOR_WIDTH), Color::DarkGrey),
        ];

        if let Some(error) = result.error() {
            lines.push(self.paint(format!("[-] ERROR: {error}"), Color::Red));
            return lines.join("\n");
        }
        let Some(assessment) = result.assessment() else { return lines.join("\n") };
        let evaluation = &assessment.evaluation;

        if let Some(code) = result.status_code() {
            let color = if code == 200 { Color::Green } else { Color::Yellow };
            lines.push(format!("[*] Status Code: {}", self.paint(code, color)));
        }
        if let Some(final_url) = result.final_url().filter(|u| *u != result.url()) {
            lines.push(format!("[*] Final URL: {final_url}"));
        }
        lines.push(format!(
            "[*] Security Score: {}",
            self.paint(
                format!("{}/100 (Grade: {})", evaluation.security_score, evaluation.grade),
                Self::grade_color(evaluation.grade)
            )
        ));

        lines.push(String::new());
        lines.push(self.bold("[+] SECURITY POLICIES", Color::Cyan));
        for check in &assessment.policy_checks {
            let (symbol, color) = match check.status {
                CheckStatus::Pass => ("[+]", Color::Green),
                CheckStatus::Fail => ("[-]", Color::Red),
                CheckStatus::Warn => ("[!]", Color::Yellow),
                CheckStatus::Info => ("[*]", Color::Blue),
            };
            lines.push(self.paint(format!("{symbol} {}: {}", check.name, check.details), color));
        }

        if !evaluation.present_headers.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("[+] PRESENT SECURITY HEADERS", Color::Green));
            for header in &evaluation.present_headers {
                let severity = header.policy.severity();
                lines.push(self.paint(
                    format!("[+] {:<35} ({severity})", header.name()),
                    Self::severity_color(severity),
                ));
                if verbose {
                    if let Some(value) = &header.value {
                        lines.push(self.paint(format!("    Value: {}", truncate(value, 60)), Color::DarkGrey));
                    }
                }
            }
        }

        if !evaluation.missing_headers.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("[-] MISSING SECURITY HEADERS", Color::Red));
            for header in &evaluation.missing_headers {
                let severity = header.policy.severity();
                lines.push(self.paint(
                    format!("[-] {:<35} ({severity}) [-{} pts]", header.name(), header.points_lost),
                    Self::severity_color(severity),
                ));
                if verbose {
                    lines.push(self.paint(format!("    Impact: {}", header.policy.impact), Color::DarkGrey));
                    lines.push(self.paint(format!("    Example: {}", header.policy.example), Color::DarkGrey));
                }
            }
        }

        if verbose && !assessment.recommendations.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("[!] RECOMMENDATIONS", Color::Yellow));
            for rec in &assessment.recommendations {
                lines.push(self.paint(format!("[!] {rec}"), Color::Yellow));
            }
        }

        lines.join("\n")
    }

    pub fn summary(&self, summary: &BulkSummary) -> String {
        let mut lines = vec![
            self.section("SCAN SUMMARY"),
            format!("[*] Total URLs Scanned: {}", summary.total),
            self.paint(format!("[+] Successful Scans: {}", summary.successful), Color::Green),
        ];
        if summary.failed > 0 {
            lines.push(self.paint(format!("[-] Failed Scans: {}", summary.failed), Color::Red));
        }
        if let (Some(avg), Some(high), Some(low)) = (summary.average_score, summary.highest_score, summary.lowest_score)
        {
            lines.push(self.paint(format!("[*] Average Score: {avg:.1}/100"), Color::Blue));
            lines.push(self.paint(format!("[*] Highest Score: {high}/100"), Color::Cyan));
            lines.push(self.paint(format!("[*] Lowest Score: {low}/100"), Color::Yellow));
        }
        if !summary.grades.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("[+] GRADE DISTRIBUTION", Color::White));
            for (grade, count) in &summary.grades {
                let noun = if *count == 1 { "site" } else { "sites" };
                lines.push(self.paint(format!("[*] {grade}: {count} {noun}"), Self::grade_color(*grade)));
            }
        }
        lines.join("\n")
    }

    /// Lists targets that never got a result because the job was cancelled.
    pub fn skipped(&self, skipped: &[&BulkEntry]) -> String {
        let mut lines = vec![self.paint(format!("[!] Scan cancelled, {} target(s) skipped:", skipped.len()), Color::Yellow)];
        lines.extend(skipped.iter().map(|e| self.paint(format!("    - {}", e.url), Color::DarkGrey)));
        lines.join("\n")
    }

    /// Single-line progress counter, meant to be redrawn in place.
    pub fn progress(&self, progress: Progress) -> String {
        let percent = if progress.total == 0 { 100.0 } else { progress.completed as f64 * 100.0 / progress.total as f64 };
        self.paint(format!("\r[*] Progress: {}/{} ({percent:.1}%)", progress.completed, progress.total), Color::Cyan)
    }

    /// Reference block for every policy in `registry`, in registry order.
    pub fn reference(&self, registry: &PolicyRegistry) -> String {
        let mut lines = vec![self.section("SECURITY HEADERS REFERENCE")];
        for policy in registry.all_policies() {
            lines.push(String::new());
            lines.push(self.policy(policy));
        }
        lines.join("\n")
    }

    /// Reference block for a single header policy.
    ///
    /// # Arguments
    /// * `policy` - The policy to describe.
    ///
    /// # Returns
    /// Name, severity with its point weight, purpose, impact and an example value.
    pub fn policy(&self, policy: &HeaderPolicy) -> String {
        let severity = policy.severity();
        [
            self.bold(format!("[+] {}", policy.name), Color::White),
            format!(
                "[*] Severity: {} {}",
                self.paint(severity, Self::severity_color(severity)),
                self.paint(format!("({} points)", policy.points()), Color::DarkGrey)
            ),
            format!("[*] Purpose: {}", policy.purpose),
            format!("[*] Impact: {}", policy.impact),
            format!("[*] Example: {}", self.paint(policy.example, Color::Cyan)),
        ]
        .join("\n")
    }

    pub fn notice(&self, message: impl Display) -> String {
        self.paint(format!("[+] {message}"), Color::Green)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}
