//! Anti-automation pacing for mutating requests.
//!
//! The target site fronts its write endpoints with an automated-traffic
//! heuristic: a mutating call is only accepted when the client carries
//! the guard cookie a prior successful read handed out, and calls that
//! arrive too quickly after one another get flagged. The guard enforces
//! both preconditions locally — the cookie check fails fast without a
//! network call, and an artificial delay precedes every dispatch. This
//! is pacing, not backoff: there is no retry behind it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cookie::{CookieKind, CookieStore};
use crate::error::ApiError;
use crate::request::BuiltRequest;

/// Default wait before a mutating dispatch.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(100);

/// Floor for the configurable pacing delay.
pub const MIN_PACING_DELAY: Duration = Duration::from_millis(50);

/// Gatekeeper for mutating requests. Cloning shares the configured
/// delay and the underlying cookie store.
#[derive(Debug, Clone)]
pub struct PacingGuard {
    cookies: CookieStore,
    /// Value for the `origin` header stamped on paced requests.
    origin: String,
    delay: Arc<Mutex<Duration>>,
}

impl PacingGuard {
    pub fn new(cookies: CookieStore, origin: impl Into<String>) -> Self {
        Self {
            cookies,
            origin: origin.into(),
            delay: Arc::new(Mutex::new(DEFAULT_PACING_DELAY)),
        }
    }

    /// Set the pacing delay, clamped to [`MIN_PACING_DELAY`].
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay.max(MIN_PACING_DELAY);
    }

    pub fn delay(&self) -> Duration {
        *self.delay.lock().unwrap()
    }

    /// Admit a request for dispatch.
    ///
    /// Reads pass through untouched. Mutating requests fail with
    /// [`ApiError::MissingGuardCookie`] when the guard cookie is absent;
    /// otherwise the pacing delay elapses, the `origin` header is set,
    /// and the request may be dispatched.
    pub async fn admit(&self, request: &mut BuiltRequest) -> Result<(), ApiError> {
        if !request.method.is_mutating() {
            return Ok(());
        }

        if self.cookies.get_kind(&CookieKind::Guard).is_none() {
            return Err(ApiError::MissingGuardCookie);
        }

        let delay = self.delay();
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            delay_ms = %delay.as_millis(),
            "Pacing mutating request"
        );
        tokio::time::sleep(delay).await;

        request.push_header("origin", self.origin.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::request::Method;

    fn guard_with_cookie() -> PacingGuard {
        let cookies = CookieStore::new("example.com");
        cookies.set_kind(&CookieKind::Guard, "tok", true, false);
        PacingGuard::new(cookies, "https://example.com")
    }

    #[tokio::test]
    async fn mutating_request_without_guard_cookie_is_refused() {
        let guard = PacingGuard::new(CookieStore::new("example.com"), "https://example.com");
        let mut req = BuiltRequest::new(Method::Post, "https://example.com/comment");

        let err = guard.admit(&mut req).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingGuardCookie));
        assert_eq!(req.header("origin"), None);
    }

    #[tokio::test]
    async fn get_passes_without_guard_cookie_or_delay() {
        let guard = PacingGuard::new(CookieStore::new("example.com"), "https://example.com");
        guard.set_delay(Duration::from_millis(200));
        let mut req = BuiltRequest::new(Method::Get, "https://example.com/page");

        let start = Instant::now();
        guard.admit(&mut req).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(150));
        assert_eq!(req.header("origin"), None);
    }

    #[tokio::test]
    async fn mutating_request_waits_at_least_the_configured_delay() {
        let guard = guard_with_cookie();
        guard.set_delay(Duration::from_millis(200));
        let mut req = BuiltRequest::new(Method::Post, "https://example.com/comment");

        let start = Instant::now();
        guard.admit(&mut req).await.unwrap();
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(200),
            "dispatch admitted after {elapsed:?}, expected at least 200ms"
        );
        assert_eq!(req.header("origin"), Some("https://example.com"));
    }

    #[tokio::test]
    async fn delay_is_clamped_to_the_floor() {
        let guard = guard_with_cookie();
        guard.set_delay(Duration::ZERO);
        assert_eq!(guard.delay(), MIN_PACING_DELAY);

        guard.set_delay(Duration::from_millis(300));
        assert_eq!(guard.delay(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn put_and_delete_are_paced_too() {
        let guard = PacingGuard::new(CookieStore::new("example.com"), "https://example.com");
        for method in [Method::Put, Method::Delete] {
            let mut req = BuiltRequest::new(method, "https://example.com/x");
            assert!(matches!(
                guard.admit(&mut req).await.unwrap_err(),
                ApiError::MissingGuardCookie
            ));
        }
    }
}
