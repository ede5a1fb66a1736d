//! Mock transport and resolver for exercising the session layer
//! without a network.
//!
//! [`MockTransport`] replays scripted outcomes and keeps the dispatched
//! requests around so tests can assert on ordering, headers, and call
//! counts. [`ManualResolver`] puts the one-time user-agent resolution
//! under test control, which is how the readiness-gate scenarios hold a
//! session in its initializing state.

use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::outcome::RequestOutcome;
use crate::request::BuiltRequest;
use crate::traits::{Transport, UserAgentResolver};

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Mock transport that records every dispatched request and replays a
/// configurable queue of outcomes.
#[derive(Clone)]
pub struct MockTransport {
    /// Queue of outcomes. Each dispatch pops the first element; when
    /// empty, a plain 200 with body `"ok"` is returned.
    outcomes: Arc<Mutex<Vec<RequestOutcome>>>,
    requests: Arc<Mutex<Vec<BuiltRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_outcomes(vec![])
    }

    pub fn with_outcome(outcome: RequestOutcome) -> Self {
        Self::with_outcomes(vec![outcome])
    }

    pub fn with_outcomes(outcomes: Vec<RequestOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of transport calls made so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of every request dispatched, in order.
    pub fn requests(&self) -> Vec<BuiltRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    async fn dispatch(&self, request: &BuiltRequest) -> RequestOutcome {
        self.requests.lock().unwrap().push(request.clone());
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            RequestOutcome::ok("ok")
        } else {
            outcomes.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// ManualResolver
// ---------------------------------------------------------------------------

/// Resolver whose completion is controlled by the test.
///
/// `resolve` blocks until [`release`](Self::release) is called, letting
/// tests hold the session in its initializing state for as long as the
/// scenario needs.
#[derive(Clone)]
pub struct ManualResolver {
    user_agent: String,
    released: Arc<Notify>,
    armed: Arc<Mutex<bool>>,
}

impl ManualResolver {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            released: Arc::new(Notify::new()),
            armed: Arc::new(Mutex::new(false)),
        }
    }

    /// Let the pending `resolve` call complete.
    pub fn release(&self) {
        *self.armed.lock().unwrap() = true;
        self.released.notify_waiters();
    }
}

impl UserAgentResolver for ManualResolver {
    async fn resolve(&self) -> String {
        loop {
            let notified = self.released.notified();
            if *self.armed.lock().unwrap() {
                break;
            }
            notified.await;
        }
        self.user_agent.clone()
    }
}
