//! Mapping of platform errors onto profile outcomes.
//!
//! The platforms report an unclaimed agent or a bad key only in free-text
//! error messages. All of that string matching lives here, so the session
//! manager can branch on [`ProfileOutcome`] alone.

use std::sync::LazyLock;

use claw_master_core::ProfileOutcome;
use regex::Regex;

use crate::{ApiError, ApiErrorKind};

const NOT_CLAIMED: &str = "not yet claimed";
const AUTH_MARKERS: [&str; 2] = ["invalid", "unauthorized"];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'<>)\]]+"#).expect("URL pattern compiles"));

/// Classify a failed profile request.
#[must_use]
pub fn classify<P>(error: ApiError) -> ProfileOutcome<P> {
    if error.kind != ApiErrorKind::Http {
        return ProfileOutcome::Transient(error.message);
    }

    let message = error.message.to_lowercase();
    let hint = error.hint.as_deref().map(str::to_lowercase).unwrap_or_default();

    if message.contains(NOT_CLAIMED) || hint.contains(NOT_CLAIMED) {
        let claim_url = error
            .hint
            .as_deref()
            .and_then(extract_claim_url)
            .or_else(|| extract_claim_url(&error.message));
        return ProfileOutcome::Unclaimed { claim_url };
    }

    if matches!(error.status, Some(401 | 403))
        || AUTH_MARKERS.iter().any(|marker| message.contains(marker))
    {
        return ProfileOutcome::Unauthorized(error.message);
    }

    ProfileOutcome::Transient(error.message)
}

/// Turn a profile request result into an outcome.
#[must_use]
pub fn into_outcome<P>(result: Result<P, ApiError>) -> ProfileOutcome<P> {
    match result {
        Ok(profile) => ProfileOutcome::Profile(profile),
        Err(error) => classify(error),
    }
}

/// First http(s) URL in `text`, without trailing punctuation.
#[must_use]
pub fn extract_claim_url(text: &str) -> Option<String> {
    URL_PATTERN
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', '!']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, message: &str, hint: Option<&str>) -> ApiError {
        ApiError {
            kind: ApiErrorKind::Http,
            status: Some(status),
            message: message.to_string(),
            hint: hint.map(str::to_string),
        }
    }

    #[test]
    fn test_unclaimed_with_url_in_hint() {
        let err = http(
            403,
            "Agent not yet claimed",
            Some("Send your human to https://www.moltbook.com/claim/moltbook_claim_x1. Then retry."),
        );
        assert_eq!(
            classify::<()>(err),
            ProfileOutcome::Unclaimed {
                claim_url: Some("https://www.moltbook.com/claim/moltbook_claim_x1".to_string())
            }
        );
    }

    #[test]
    fn test_unclaimed_detected_in_hint_only() {
        let err = http(400, "Forbidden", Some("This agent is NOT YET CLAIMED"));
        assert_eq!(
            classify::<()>(err),
            ProfileOutcome::Unclaimed { claim_url: None }
        );
    }

    #[test]
    fn test_unclaimed_takes_precedence_over_status() {
        let err = http(401, "Agent not yet claimed (invalid state)", None);
        assert!(matches!(classify::<()>(err), ProfileOutcome::Unclaimed { .. }));
    }

    #[test]
    fn test_unauthorized() {
        assert!(matches!(
            classify::<()>(http(400, "Invalid API key", None)),
            ProfileOutcome::Unauthorized(_)
        ));
        assert!(matches!(
            classify::<()>(http(500, "UNAUTHORIZED request", None)),
            ProfileOutcome::Unauthorized(_)
        ));
        assert!(matches!(
            classify::<()>(http(401, "HTTP 401 Unauthorized", None)),
            ProfileOutcome::Unauthorized(_)
        ));
        assert!(matches!(
            classify::<()>(http(403, "Forbidden", None)),
            ProfileOutcome::Unauthorized(_)
        ));
    }

    #[test]
    fn test_other_failures_are_transient() {
        assert_eq!(
            classify::<()>(http(503, "Service Unavailable", None)),
            ProfileOutcome::Transient("Service Unavailable".to_string())
        );

        let network = ApiError {
            kind: ApiErrorKind::Network,
            status: None,
            message: "request failed: invalid certificate".to_string(),
            hint: None,
        };
        assert!(matches!(classify::<()>(network), ProfileOutcome::Transient(_)));
    }

    #[test]
    fn test_into_outcome_passes_profiles_through() {
        assert_eq!(into_outcome::<u8>(Ok(7)), ProfileOutcome::Profile(7));
    }

    #[test]
    fn test_extract_claim_url() {
        assert_eq!(
            extract_claim_url("claim at (https://clawnews.io/claim/abc)."),
            Some("https://clawnews.io/claim/abc".to_string())
        );
        assert_eq!(extract_claim_url("no link here"), None);
    }
}
