//! The session orchestrator.
//!
//! Owns the cookie store, readiness gate, pacing guard, and transport,
//! and is the only entry point callers use to talk to the site. Every
//! request flows: build → gate (buffer until ready) → pacing guard (for
//! mutating methods) → transport → classifier.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use seance_core::classify::classify;
use seance_core::cookie::{CookieKind, CookieStore};
use seance_core::error::ApiError;
use seance_core::outcome::ClassifiedResult;
use seance_core::pacing::PacingGuard;
use seance_core::request::{BuiltRequest, Method, RequestOptions};
use seance_core::traits::{
    StaticResolver, Transport, UserAgentResolver, FALLBACK_USER_AGENT, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};

use crate::encode::encode_body;
use crate::gate::{Admission, ReadinessGate};
use crate::transport::ReqwestTransport;

const ACCEPT_HEADER: &str = "application/json, text/html;q=0.9, */*;q=0.8";

/// Session-scoped mutable state behind the orchestrator's single lock:
/// the current user-agent (and whether it was set explicitly) and the
/// bearer token.
struct Shared {
    user_agent: String,
    user_agent_explicit: bool,
    token: Option<String>,
}

/// Browser-emulating session for one site.
///
/// Constructed via [`Session::start`], which spawns the one-time
/// user-agent resolution; requests submitted before resolution
/// completes are buffered and flushed FIFO. The orchestrator never
/// retries, never logs errors, and a failed request leaves cookies and
/// token exactly as they were.
pub struct Session<T: Transport> {
    transport: T,
    cookies: CookieStore,
    gate: ReadinessGate,
    pacing: PacingGuard,
    shared: Mutex<Shared>,
}

impl Session<ReqwestTransport> {
    /// Create a session over the real reqwest transport with the static
    /// user-agent resolver.
    pub fn connect(domain: &str) -> Result<Arc<Self>, ApiError> {
        let cookies = CookieStore::new(domain);
        let transport = ReqwestTransport::new(cookies.clone())?;
        Ok(Self::start(transport, StaticResolver, cookies))
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Create the session and spawn its one-time initialization.
    ///
    /// The resolver runs on a background task; until it completes the
    /// session is `Initializing` and buffers every request.
    pub fn start<R>(transport: T, resolver: R, cookies: CookieStore) -> Arc<Self>
    where
        R: UserAgentResolver + Send + 'static,
    {
        let origin = format!("https://{}", cookies.domain());
        let session = Arc::new(Self {
            pacing: PacingGuard::new(cookies.clone(), origin),
            transport,
            cookies,
            gate: ReadinessGate::new(),
            shared: Mutex::new(Shared {
                user_agent: FALLBACK_USER_AGENT.to_string(),
                user_agent_explicit: false,
                token: None,
            }),
        });

        tokio::spawn({
            let session = Arc::clone(&session);
            async move {
                let resolved = resolver.resolve().await;
                session.finish_initialization(resolved).await;
            }
        });

        session
    }

    // -----------------------------------------------------------------------
    // Request entry points
    // -----------------------------------------------------------------------

    pub async fn get(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<ClassifiedResult, ApiError> {
        let request = self.build_request(Method::Get, url, None, &options)?;
        self.submit(request).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        options: RequestOptions,
    ) -> Result<ClassifiedResult, ApiError> {
        let request = self.build_request(Method::Post, url, body, &options)?;
        self.submit(request).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        options: RequestOptions,
    ) -> Result<ClassifiedResult, ApiError> {
        let request = self.build_request(Method::Put, url, body, &options)?;
        self.submit(request).await
    }

    pub async fn delete(
        &self,
        url: &str,
        body: Option<&serde_json::Value>,
        options: RequestOptions,
    ) -> Result<ClassifiedResult, ApiError> {
        let request = self.build_request(Method::Delete, url, body, &options)?;
        self.submit(request).await
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the user-agent explicitly. Suppresses the resolver's result
    /// if resolution has not completed yet.
    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        let mut shared = self.shared.lock().unwrap();
        shared.user_agent = user_agent.into();
        shared.user_agent_explicit = true;
    }

    pub fn user_agent(&self) -> String {
        self.shared.lock().unwrap().user_agent.clone()
    }

    /// Set the anti-automation pacing delay; values below the floor
    /// are clamped up.
    pub fn set_ddos_guard_delay(&self, delay: Duration) {
        self.pacing.set_delay(delay);
    }

    pub fn ddos_guard_delay(&self) -> Duration {
        self.pacing.delay()
    }

    /// Cap transport concurrency, clamped to 1..=25.
    pub fn set_max_concurrency(&self, limit: usize) {
        self.transport
            .set_max_concurrency(limit.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY));
    }

    /// Clear all cookies and drop pooled connections. The bearer token
    /// and readiness are untouched.
    pub fn reset_session(&self) {
        self.cookies.clear();
        self.transport.reset();
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    // -----------------------------------------------------------------------
    // Cookie operations
    // -----------------------------------------------------------------------

    pub fn set_cookie(
        &self,
        kind: &CookieKind,
        value: impl Into<String>,
        session_only: bool,
        secure: bool,
    ) {
        self.cookies.set_kind(kind, value, session_only, secure);
    }

    pub fn get_cookie(&self, kind: &CookieKind) -> Option<String> {
        self.cookies.get_kind(kind).map(|record| record.value)
    }

    pub fn delete_cookie(&self, kind: &CookieKind) -> bool {
        self.cookies.delete_kind(kind)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    pub(crate) fn set_token(&self, token: impl Into<String>) {
        self.shared.lock().unwrap().token = Some(token.into());
    }

    pub(crate) fn clear_token(&self) {
        self.shared.lock().unwrap().token = None;
    }

    pub(crate) fn token(&self) -> Option<String> {
        self.shared.lock().unwrap().token.clone()
    }

    pub(crate) fn cookie_store(&self) -> &CookieStore {
        &self.cookies
    }

    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<BuiltRequest, ApiError> {
        let mut request = BuiltRequest::new(method, url);
        request.push_header("accept", ACCEPT_HEADER);

        {
            let shared = self.shared.lock().unwrap();
            request.push_header("user-agent", shared.user_agent.clone());
            if let Some(token) = &shared.token {
                request.push_header("authorization", format!("Bearer {token}"));
            }
        }

        if let Some(referer) = &options.referer {
            request.push_header("referer", referer.clone());
        }
        if let Some(requested_with) = &options.requested_with {
            request.push_header("x-requested-with", requested_with.clone());
        }

        if let Some(body) = body {
            let (bytes, content_type) = encode_body(body, options.encoding)?;
            request.push_header("content-type", content_type);
            request.body = Some(bytes);
        }

        Ok(request)
    }

    /// Route a built request through the gate.
    async fn submit(&self, request: BuiltRequest) -> Result<ClassifiedResult, ApiError> {
        match self.gate.submit(request) {
            Admission::Admitted(request) => self.execute(request).await,
            // The sender only drops if the drain loop dies with the
            // request unflushed; surface the defensive kind.
            Admission::Queued(rx) => rx.await.map_err(|_| ApiError::NotReady)?,
        }
    }

    /// Pacing guard, transport, cookie harvest, classification.
    async fn execute(&self, mut request: BuiltRequest) -> Result<ClassifiedResult, ApiError> {
        self.pacing.admit(&mut request).await?;
        let outcome = self.transport.dispatch(&request).await;
        if !outcome.set_cookies.is_empty() {
            self.cookies.harvest(&outcome.set_cookies);
        }
        classify(outcome, request.method)
    }

    /// Resolver completion: adopt the resolved user-agent unless one
    /// was set explicitly, flush the pending queue FIFO, flip to ready.
    async fn finish_initialization(&self, resolved: String) {
        {
            let mut shared = self.shared.lock().unwrap();
            if !shared.user_agent_explicit {
                shared.user_agent = resolved;
            }
        }

        tracing::debug!("User-agent resolved; draining pending queue");
        while let Some(batch) = self.gate.take_batch() {
            for pending in batch {
                let result = self.execute(pending.request).await;
                // Receiver gone means the caller stopped waiting; the
                // request already ran, nothing to do.
                let _ = pending.completion.send(result);
            }
        }
        tracing::debug!("Session ready");
    }
}
