//! Forge API error types.
//!
//! Errors are categorized as transient or permanent. The distinction drives
//! the retry wrapper: transient failures (5xx, rate limits, network hiccups)
//! are retried with backoff, permanent ones surface immediately and end up in
//! the scenario's outer catch boundary.

use std::fmt;
use thiserror::Error;

/// The kind of forge API error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeErrorKind {
    /// Transient error - safe to retry with backoff.
    ///
    /// Examples: HTTP 5xx, HTTP 429, 403 with rate-limit wording, network
    /// timeouts.
    Transient,

    /// Permanent error - retrying the same request cannot help.
    ///
    /// Examples: 404 on a named resource, authentication failures,
    /// validation errors (422).
    Permanent,
}

impl ForgeErrorKind {
    pub fn is_retriable(&self) -> bool {
        matches!(self, ForgeErrorKind::Transient)
    }
}

/// A forge API error with categorization for retry decisions.
///
/// Both adapters produce this type; the source is boxed because octocrab and
/// reqwest errors flow through the same path.
#[derive(Debug, Error)]
pub struct ForgeError {
    pub kind: ForgeErrorKind,
    pub status_code: Option<u16>,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ForgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "forge API error (HTTP {}): {}", code, self.message),
            None => write!(f, "forge API error: {}", self.message),
        }
    }
}

impl ForgeError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ForgeErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ForgeErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes an octocrab error.
    ///
    /// octocrab's `Error` doesn't expose a stable status-code accessor across
    /// all variants, so categorization falls back to parsing the rendered
    /// message. The fallback (`None` -> permanent unless it smells like a
    /// network failure) is conservative.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let message = err.to_string();
        let status_code = extract_status_code(&message);
        let kind = categorize(status_code, &message);
        Self {
            kind,
            status_code,
            message,
            source: Some(Box::new(err)),
        }
    }

    /// Categorizes a reqwest error (GitLab adapter transport failures).
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let message = err.to_string();
        let kind = if err.is_timeout() || err.is_connect() {
            ForgeErrorKind::Transient
        } else {
            categorize(status_code, &message)
        };
        Self {
            kind,
            status_code,
            message,
            source: Some(Box::new(err)),
        }
    }

    /// Builds an error from an HTTP response the GitLab adapter has already
    /// read the status of.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: categorize(Some(status), &message),
            status_code: Some(status),
            message,
            source: None,
        }
    }
}

fn categorize(status_code: Option<u16>, message: &str) -> ForgeErrorKind {
    match status_code {
        Some(429) => ForgeErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => ForgeErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => ForgeErrorKind::Transient,
        Some(_) => ForgeErrorKind::Permanent,
        None => {
            if is_network_error(message) {
                ForgeErrorKind::Transient
            } else {
                ForgeErrorKind::Permanent
            }
        }
    }
}

/// Extracts an HTTP status code from a rendered error message, if present.
///
/// String parsing is fragile, but octocrab formats errors with a `status:`
/// field and the patterns below are stable HTTP conventions; a missed match
/// just means conservative (permanent) categorization.
fn extract_status_code(message: &str) -> Option<u16> {
    if let Some(idx) = message.find("status: ") {
        let rest = &message[idx + 8..];
        if let Some(end) = rest.find(|c: char| !c.is_ascii_digit()) {
            if let Ok(code) = rest[..end].parse() {
                return Some(code);
            }
        } else if let Ok(code) = rest.trim().parse() {
            return Some(code);
        }
    }

    let lower = message.to_lowercase();
    if message.contains("404") && lower.contains("not found") {
        return Some(404);
    }
    for code in [422u16, 403, 401, 429, 500, 502, 503] {
        if message.contains(&code.to_string()) {
            return Some(code);
        }
    }

    None
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("api rate")
        || lower.contains("secondary rate")
        || lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("dns")
        || lower.contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_detection() {
        assert!(is_rate_limit_error("API rate limit exceeded"));
        assert!(is_rate_limit_error("secondary rate limit"));
        assert!(!is_rate_limit_error("Permission denied"));
    }

    #[test]
    fn network_error_detection() {
        assert!(is_network_error("connection timeout"));
        assert!(is_network_error("DNS resolution failed"));
        assert!(!is_network_error("Not found"));
    }

    #[test]
    fn status_extraction_from_octocrab_format() {
        assert_eq!(
            extract_status_code("GitHub error, status: 404, message: Not Found"),
            Some(404)
        );
        assert_eq!(extract_status_code("plain failure"), None);
    }

    #[test]
    fn five_hundreds_are_transient() {
        let err = ForgeError::from_status(503, "service unavailable");
        assert!(err.kind.is_retriable());
    }

    #[test]
    fn four_hundreds_are_permanent() {
        let err = ForgeError::from_status(404, "branch not found");
        assert!(!err.kind.is_retriable());
        assert_eq!(err.status_code, Some(404));
    }

    #[test]
    fn rate_limited_403_is_transient() {
        let err = ForgeError::from_status(403, "API rate limit exceeded for installation");
        assert!(err.kind.is_retriable());
    }
}
