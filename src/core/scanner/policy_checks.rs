// src/core/scanner/policy_checks.rs

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::core::models::{CheckStatus, PolicyCheck};
use crate::core::scanner::headers_scanner::header_value;

// Cookie attributes are matched as whole `;`-separated tokens.
static RE_SECURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^|;)\s*secure\s*(;|$)").unwrap());
static RE_HTTPONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^|;)\s*httponly\s*(;|$)").unwrap());
static RE_SAMESITE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(^|;)\s*samesite\s*=").unwrap());

static COOKIE_ATTRIBUTES: &[(&str, &Lazy<Regex>)] =
    &[("Secure", &RE_SECURE), ("HttpOnly", &RE_HTTPONLY), ("SameSite", &RE_SAMESITE)];

/// Runs the informational checks over a response. None of them affect the score.
pub fn run_policy_checks(final_url: &str, headers: &HeaderMap) -> Vec<PolicyCheck> {
    let checks = vec![
        check_https(final_url),
        check_server_disclosure(headers),
        check_cookie_security(headers),
    ];
    debug!(checks = checks.len(), "Policy checks finished.");
    checks
}

fn check_https(final_url: &str) -> PolicyCheck {
    let (status, details) = if final_url.to_ascii_lowercase().starts_with("https://") {
        (CheckStatus::Pass, "Site uses HTTPS".to_string())
    } else {
        (CheckStatus::Fail, "Site not using HTTPS".to_string())
    };
    PolicyCheck { name: "HTTPS_Enforcement", status, details }
}

fn check_server_disclosure(headers: &HeaderMap) -> PolicyCheck {
    let disclosed: Vec<String> = ["Server", "X-Powered-By"]
        .into_iter()
        .filter_map(|name| header_value(headers, name).map(|value| format!("{name}: {value}")))
        .collect();

    if disclosed.is_empty() {
        PolicyCheck {
            name: "Server_Info_Disclosure",
            status: CheckStatus::Pass,
            details: "Server header not disclosed".to_string(),
        }
    } else {
        PolicyCheck {
            name: "Server_Info_Disclosure",
            status: CheckStatus::Warn,
            details: format!("Server information disclosed: {}", disclosed.join("; ")),
        }
    }
}

fn check_cookie_security(headers: &HeaderMap) -> PolicyCheck {
    let cookies: Vec<&str> = headers.get_all("set-cookie").iter().filter_map(|v| v.to_str().ok()).collect();
    if cookies.is_empty() {
        return PolicyCheck { name: "Cookie_Security", status: CheckStatus::Info, details: "No cookies set".to_string() };
    }

    let mut missing: Vec<&str> = Vec::new();
    let mut weak_cookies = 0;
    for cookie in &cookies {
        let absent: Vec<&str> = COOKIE_ATTRIBUTES
            .iter()
            .filter(|(_, re)| !re.is_match(cookie))
            .map(|(name, _)| *name)
            .collect();
        if !absent.is_empty() {
            weak_cookies += 1;
        }
        for name in absent {
            if !missing.contains(&name) {
                missing.push(name);
            }
        }
    }

    if missing.is_empty() {
        PolicyCheck {
            name: "Cookie_Security",
            status: CheckStatus::Pass,
            details: "All cookies set Secure, HttpOnly and SameSite".to_string(),
        }
    } else {
        // Report attributes in a fixed order regardless of which cookie lacked them.
        missing.sort_by_key(|name| COOKIE_ATTRIBUTES.iter().position(|(n, _)| n == name));
        PolicyCheck {
            name: "Cookie_Security",
            status: CheckStatus::Fail,
            details: format!(
                "{weak_cookies} of {} cookies missing attributes: {}",
                cookies.len(),
                missing.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(HeaderName::from_bytes(name.as_bytes()).unwrap(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn find<'a>(checks: &'a [PolicyCheck], name: &str) -> &'a PolicyCheck {
        checks.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn https_enforcement_follows_final_url() {
        let checks = run_policy_checks("https://example.com/", &HeaderMap::new());
        assert_eq!(find(&checks, "HTTPS_Enforcement").status, CheckStatus::Pass);

        let checks = run_policy_checks("http://example.com/", &HeaderMap::new());
        assert_eq!(find(&checks, "HTTPS_Enforcement").status, CheckStatus::Fail);
    }

    #[test]
    fn server_and_powered_by_are_reported() {
        let checks = run_policy_checks(
            "https://example.com/",
            &headers(&[("Server", "nginx/1.25"), ("X-Powered-By", "PHP/8.2")]),
        );
        let check = find(&checks, "Server_Info_Disclosure");
        assert_eq!(check.status, CheckStatus::Warn);
        assert!(check.details.contains("Server: nginx/1.25"));
        assert!(check.details.contains("X-Powered-By: PHP/8.2"));
    }

    #[test]
    fn cookie_without_flags_fails() {
        let checks = run_policy_checks(
            "https://example.com/",
            &headers(&[
                ("Set-Cookie", "session=abc; Secure; HttpOnly; SameSite=Strict"),
                ("Set-Cookie", "tracking=xyz; Path=/"),
            ]),
        );
        let check = find(&checks, "Cookie_Security");
        assert_eq!(check.status, CheckStatus::Fail);
        assert_eq!(check.details, "1 of 2 cookies missing attributes: Secure, HttpOnly, SameSite");
    }

    #[test]
    fn secure_substring_in_cookie_value_does_not_count() {
        let checks = run_policy_checks(
            "https://example.com/",
            &headers(&[("Set-Cookie", "mode=insecure; HttpOnly; SameSite=Lax")]),
        );
        let check = find(&checks, "Cookie_Security");
        assert_eq!(check.status, CheckStatus::Fail);
        assert!(check.details.ends_with("Secure"));
    }

    #[test]
    fn hardened_cookies_pass_and_no_cookies_is_info() {
        let checks = run_policy_checks(
            "https://example.com/",
            &headers(&[("Set-Cookie", "id=1; secure; httponly; samesite=lax")]),
        );
        assert_eq!(find(&checks, "Cookie_Security").status, CheckStatus::Pass);

        let checks = run_policy_checks("https://example.com/", &HeaderMap::new());
        assert_eq!(find(&checks, "Cookie_Security").status, CheckStatus::Info);
    }
}
