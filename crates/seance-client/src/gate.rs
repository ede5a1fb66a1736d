//! Readiness gate and pending-request queue.
//!
//! A session starts `Initializing` and becomes `Ready` exactly once,
//! when user-agent resolution completes. Requests submitted before that
//! are buffered here and flushed strictly FIFO by the orchestrator's
//! drain loop. The gate state and queue sit behind one mutex — the
//! single serialization boundary that keeps a request from being
//! double-dispatched or dropped if it arrives exactly as the
//! transition fires.

use std::collections::VecDeque;
use std::sync::Mutex;

use seance_core::error::ApiError;
use seance_core::outcome::ClassifiedResult;
use seance_core::request::BuiltRequest;
use tokio::sync::oneshot;

/// Channel over which a buffered request's result is delivered.
pub type Completion = oneshot::Sender<Result<ClassifiedResult, ApiError>>;

/// A request buffered while the session is still initializing.
///
/// Exists only in the `Initializing` state; consumed exactly once when
/// the drain loop flushes it.
pub struct PendingRequest {
    pub request: BuiltRequest,
    pub completion: Completion,
}

/// Outcome of submitting a request to the gate.
pub enum Admission {
    /// The session is ready; dispatch the request directly.
    Admitted(BuiltRequest),
    /// The request was buffered; await its result on this channel.
    Queued(oneshot::Receiver<Result<ClassifiedResult, ApiError>>),
}

#[derive(Default)]
struct GateInner {
    ready: bool,
    queue: VecDeque<PendingRequest>,
}

/// Two-state gate: `Initializing` until the drain empties the queue,
/// then `Ready` for the rest of the session's lifetime.
#[derive(Default)]
pub struct ReadinessGate {
    inner: Mutex<GateInner>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().ready
    }

    /// Admit a request immediately when ready, or buffer it.
    pub fn submit(&self, request: BuiltRequest) -> Admission {
        let mut inner = self.inner.lock().unwrap();
        if inner.ready {
            return Admission::Admitted(request);
        }
        let (completion, rx) = oneshot::channel();
        inner.queue.push_back(PendingRequest {
            request,
            completion,
        });
        Admission::Queued(rx)
    }

    /// Take the next batch of buffered requests for the drain loop.
    ///
    /// Returns `None` once the queue is empty, flipping the gate to
    /// `Ready` in the same critical section — so a request racing the
    /// transition either lands in a batch the drain will still flush,
    /// or is admitted directly after the flip. Callers loop until
    /// `None` to preserve FIFO across late arrivals.
    pub fn take_batch(&self) -> Option<Vec<PendingRequest>> {
        let mut inner = self.inner.lock().unwrap();
        if inner.queue.is_empty() {
            inner.ready = true;
            return None;
        }
        Some(inner.queue.drain(..).collect())
    }
}

#[cfg(test)]
mod tests {
    use seance_core::request::Method;

    use super::*;

    fn request(path: &str) -> BuiltRequest {
        BuiltRequest::new(Method::Get, format!("https://example.com{path}"))
    }

    #[test]
    fn requests_are_buffered_until_ready() {
        let gate = ReadinessGate::new();
        assert!(!gate.is_ready());

        assert!(matches!(gate.submit(request("/a")), Admission::Queued(_)));
        assert!(matches!(gate.submit(request("/b")), Admission::Queued(_)));

        let batch = gate.take_batch().unwrap();
        let urls: Vec<&str> = batch.iter().map(|p| p.request.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn gate_flips_to_ready_only_when_queue_is_empty() {
        let gate = ReadinessGate::new();
        gate.submit(request("/a"));

        let _batch = gate.take_batch().unwrap();
        // A request arriving mid-drain still queues.
        assert!(matches!(gate.submit(request("/late")), Admission::Queued(_)));
        assert!(!gate.is_ready());

        let late = gate.take_batch().unwrap();
        assert_eq!(late.len(), 1);
        assert!(gate.take_batch().is_none());
        assert!(gate.is_ready());
    }

    #[test]
    fn ready_gate_admits_directly() {
        let gate = ReadinessGate::new();
        assert!(gate.take_batch().is_none());
        assert!(gate.is_ready());
        assert!(matches!(gate.submit(request("/x")), Admission::Admitted(_)));
    }
}
