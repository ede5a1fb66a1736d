use std::future::Future;

use crate::outcome::RequestOutcome;
use crate::request::BuiltRequest;

/// Lower bound for the transport concurrency cap.
pub const MIN_CONCURRENCY: usize = 1;

/// Upper bound for the transport concurrency cap.
pub const MAX_CONCURRENCY: usize = 25;

/// Static user-agent used until resolution completes, and by
/// [`StaticResolver`] when no rendering engine is available.
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Dispatches a fully-built request over the network.
///
/// Infallible at the trait level: transport failures travel as data in
/// the [`RequestOutcome`] so the classifier can apply its rule order to
/// every signal uniformly.
pub trait Transport: Send + Sync + Clone {
    fn dispatch(&self, request: &BuiltRequest) -> impl Future<Output = RequestOutcome> + Send;

    /// Cap concurrent in-flight dispatches. Callers clamp the value to
    /// `MIN_CONCURRENCY..=MAX_CONCURRENCY` before passing it down.
    fn set_max_concurrency(&self, limit: usize) {
        let _ = limit;
    }

    /// Drop pooled connection state. Session reset calls this so the
    /// next request negotiates fresh connections.
    fn reset(&self) {}
}

/// One-time asynchronous resolution of a realistic user-agent string.
///
/// Implementations may ask an embedded rendering engine what it would
/// send, or fall back to a static value. Resolution runs once per
/// session, at construction.
pub trait UserAgentResolver: Send + Sync {
    fn resolve(&self) -> impl Future<Output = String> + Send;
}

/// Resolver that returns [`FALLBACK_USER_AGENT`] immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticResolver;

impl UserAgentResolver for StaticResolver {
    async fn resolve(&self) -> String {
        FALLBACK_USER_AGENT.to_string()
    }
}
