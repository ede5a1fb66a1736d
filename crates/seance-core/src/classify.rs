//! Response classification: one ordered rule list turning heterogeneous
//! failure signals into the closed [`ApiError`] taxonomy.
//!
//! The target site reports failures three different ways: transport
//! errors, HTTP status codes, and error codes smuggled into the query
//! string of a redirect target. All three funnel through [`classify`] so
//! callers only ever see one kind of result.

use url::Url;

use crate::error::ApiError;
use crate::outcome::{ClassifiedResult, RequestOutcome};
use crate::request::Method;

/// Query parameter the site uses to report failures on redirects.
pub const ERROR_QUERY_PARAM: &str = "error";

/// `error` value meaning a one-time code was required but absent.
pub const ERROR_VALUE_MISSING_OTP: &str = "missing_otp";

/// `error` value meaning the submitted credentials were rejected.
pub const ERROR_VALUE_WRONG_CREDENTIALS: &str = "wrong_credentials";

/// Marker the anti-automation layer embeds in its challenge page.
const CHALLENGE_BODY_MARKER: &str = "DDoS-Guard";

/// Accepted HTTP status range. Redirect statuses are accepted because
/// the transport follows them and reports the final URL.
const ACCEPTED_STATUS: std::ops::RangeInclusive<u16> = 200..=399;

/// Map a raw outcome into the single typed result callers receive.
///
/// Rules are evaluated strictly in order:
/// 1. transport failure → [`ApiError::Transport`]; response with no
///    body → [`ApiError::ActionFailed`] for mutating calls,
///    [`ApiError::Transport`] for reads
/// 2. status outside 200..=399 → a status-derived kind, even when a
///    body is present
/// 3. recognized error query parameter on the final URL → the specific
///    auth kind it encodes
/// 4. otherwise success; the body passes through verbatim
pub fn classify(outcome: RequestOutcome, method: Method) -> Result<ClassifiedResult, ApiError> {
    if let Some(message) = outcome.transport_error {
        return Err(ApiError::Transport(message));
    }
    let Some(status) = outcome.status else {
        return Err(ApiError::Transport("no response received".to_string()));
    };
    let Some(body) = outcome.body else {
        // A read with no body is a transport anomaly; a mutating call
        // with no body is the site refusing the action.
        return Err(if method.is_mutating() {
            ApiError::ActionFailed
        } else {
            ApiError::Transport("response body missing".to_string())
        });
    };

    if !ACCEPTED_STATUS.contains(&status) {
        return Err(classify_status(status, &body));
    }

    if let Some(url) = outcome.final_url.as_deref() {
        if let Some(kind) = embedded_error(url) {
            return Err(kind);
        }
    }

    Ok(ClassifiedResult {
        status,
        body,
        final_url: outcome.final_url,
    })
}

/// Specialize out-of-range statuses that carry a clear meaning; the
/// rest collapse into `WrongStatusCode`.
fn classify_status(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::LoginRequired,
        403 if body.contains(CHALLENGE_BODY_MARKER) => ApiError::CaptchaRequired,
        _ => ApiError::WrongStatusCode { status },
    }
}

/// Check the final URL for an embedded error code.
fn embedded_error(final_url: &str) -> Option<ApiError> {
    let url = Url::parse(final_url).ok()?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == ERROR_QUERY_PARAM)
        .map(|(_, v)| v.into_owned())?;
    match value.as_str() {
        ERROR_VALUE_MISSING_OTP => Some(ApiError::MissingTwoFactor),
        ERROR_VALUE_WRONG_CREDENTIALS => Some(ApiError::WrongAuthInfo),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failure_wins_over_everything() {
        let outcome = RequestOutcome {
            transport_error: Some("connection reset".into()),
            status: Some(200),
            body: Some("ignored".into()),
            ..Default::default()
        };
        let err = classify(outcome, Method::Get).unwrap_err();
        assert!(matches!(err, ApiError::Transport(msg) if msg.contains("reset")));
    }

    #[test]
    fn missing_body_on_a_mutating_call_is_action_failed() {
        let outcome = RequestOutcome {
            status: Some(200),
            body: None,
            ..Default::default()
        };
        assert!(matches!(
            classify(outcome, Method::Post).unwrap_err(),
            ApiError::ActionFailed
        ));
    }

    #[test]
    fn missing_body_on_a_read_is_a_transport_error() {
        let outcome = RequestOutcome {
            status: Some(200),
            body: None,
            ..Default::default()
        };
        assert!(matches!(
            classify(outcome, Method::Get).unwrap_err(),
            ApiError::Transport(_)
        ));
    }

    #[test]
    fn status_404_with_body_is_wrong_status_not_success() {
        let outcome = RequestOutcome::with_status(404, "<html>not found</html>");
        assert!(matches!(
            classify(outcome, Method::Get).unwrap_err(),
            ApiError::WrongStatusCode { status: 404 }
        ));
    }

    #[test]
    fn status_401_is_login_required() {
        let outcome = RequestOutcome::with_status(401, "{}");
        assert!(matches!(
            classify(outcome, Method::Get).unwrap_err(),
            ApiError::LoginRequired
        ));
    }

    #[test]
    fn status_403_with_challenge_marker_is_captcha() {
        let outcome = RequestOutcome::with_status(403, "<title>DDoS-Guard</title>");
        assert!(matches!(
            classify(outcome, Method::Get).unwrap_err(),
            ApiError::CaptchaRequired
        ));
    }

    #[test]
    fn status_403_without_marker_is_wrong_status() {
        let outcome = RequestOutcome::with_status(403, "forbidden");
        assert!(matches!(
            classify(outcome, Method::Get).unwrap_err(),
            ApiError::WrongStatusCode { status: 403 }
        ));
    }

    #[test]
    fn redirect_error_param_maps_to_missing_two_factor() {
        let outcome = RequestOutcome::ok("login page")
            .with_final_url("https://example.com/login?error=missing_otp");
        assert!(matches!(
            classify(outcome, Method::Post).unwrap_err(),
            ApiError::MissingTwoFactor
        ));
    }

    #[test]
    fn redirect_error_param_maps_to_wrong_auth_info() {
        let outcome = RequestOutcome::ok("login page")
            .with_final_url("https://example.com/login?error=wrong_credentials");
        assert!(matches!(
            classify(outcome, Method::Post).unwrap_err(),
            ApiError::WrongAuthInfo
        ));
    }

    #[test]
    fn unrecognized_error_param_is_success() {
        let outcome = RequestOutcome::ok("body")
            .with_final_url("https://example.com/page?error=whatever");
        assert!(classify(outcome, Method::Get).is_ok());
    }

    #[test]
    fn status_rule_beats_embedded_error_param() {
        // Rule 2 runs before rule 3: an out-of-range status wins even if
        // the final URL carries a recognized error code.
        let outcome = RequestOutcome::with_status(500, "oops")
            .with_final_url("https://example.com/login?error=wrong_credentials");
        assert!(matches!(
            classify(outcome, Method::Post).unwrap_err(),
            ApiError::WrongStatusCode { status: 500 }
        ));
    }

    #[test]
    fn success_passes_body_through_unchanged() {
        let outcome = RequestOutcome::with_status(302, "{\"id\": 7}")
            .with_final_url("https://example.com/topic/7");
        let result = classify(outcome, Method::Get).unwrap();
        assert_eq!(result.status, 302);
        assert_eq!(result.body, "{\"id\": 7}");
        assert_eq!(result.final_url.as_deref(), Some("https://example.com/topic/7"));
    }
}
