//! Network transport built on reqwest.
//!
//! One transport per session. Dispatch is capped by a semaphore so at
//! most `max_concurrency` requests are in flight; the cap and the
//! underlying client can both be swapped at runtime (cap changes apply
//! to new dispatches, in-flight ones finish under the old one).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use seance_core::cookie::CookieStore;
use seance_core::error::ApiError;
use seance_core::outcome::RequestOutcome;
use seance_core::request::{BuiltRequest, Method};
use seance_core::traits::Transport;
use tokio::sync::Semaphore;
use url::Url;

const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONCURRENCY: usize = 8;

/// [`Transport`] implementation over a shared reqwest [`Client`].
///
/// Cookies are attached at dispatch time from one atomic store
/// snapshot, and `Set-Cookie` response headers are surfaced raw in the
/// outcome for the orchestrator to harvest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Arc<Mutex<Client>>,
    limiter: Arc<Mutex<Arc<Semaphore>>>,
    cookies: CookieStore,
}

impl ReqwestTransport {
    pub fn new(cookies: CookieStore) -> Result<Self, ApiError> {
        Ok(Self {
            client: Arc::new(Mutex::new(build_client()?)),
            limiter: Arc::new(Mutex::new(Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)))),
            cookies,
        })
    }

    fn current_limiter(&self) -> Arc<Semaphore> {
        self.limiter.lock().unwrap().clone()
    }

    fn current_client(&self) -> Client {
        self.client.lock().unwrap().clone()
    }
}

impl Transport for ReqwestTransport {
    async fn dispatch(&self, request: &BuiltRequest) -> RequestOutcome {
        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => return RequestOutcome::transport_failure(format!("invalid URL: {e}")),
        };

        let limiter = self.current_limiter();
        let _permit = match limiter.acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return RequestOutcome::transport_failure("transport shut down"),
        };

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.current_client().request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(host) = url.host_str() {
            let header = self
                .cookies
                .header_for(host, url.path(), url.scheme() == "https");
            if let Some(cookie_header) = header {
                builder = builder.header("cookie", cookie_header);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return RequestOutcome::transport_failure(e.to_string()),
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();

        let body = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return RequestOutcome::transport_failure(format!("failed to read body: {e}"));
            }
        };

        RequestOutcome {
            status: Some(status),
            body: Some(body),
            final_url: Some(final_url),
            transport_error: None,
            set_cookies,
        }
    }

    fn set_max_concurrency(&self, limit: usize) {
        tracing::debug!(%limit, "Resizing transport concurrency cap");
        *self.limiter.lock().unwrap() = Arc::new(Semaphore::new(limit));
    }

    fn reset(&self) {
        // Swap in a fresh client so pooled connections are dropped. If
        // the rebuild fails the old client stays in place.
        if let Ok(client) = build_client() {
            *self.client.lock().unwrap() = client;
        }
    }
}

fn build_client() -> Result<Client, ApiError> {
    Client::builder()
        .timeout(TRANSPORT_TIMEOUT)
        .build()
        .map_err(|e| ApiError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new(CookieStore::new("example.com")).unwrap()
    }

    #[tokio::test]
    async fn invalid_url_is_a_transport_failure_without_a_call() {
        let outcome = transport()
            .dispatch(&BuiltRequest::new(Method::Get, "not a url"))
            .await;
        assert!(outcome.transport_error.unwrap().contains("invalid URL"));
        assert_eq!(outcome.status, None);
    }

    #[tokio::test]
    async fn concurrency_cap_can_be_swapped_at_runtime() {
        let transport = transport();
        transport.set_max_concurrency(1);
        assert_eq!(transport.current_limiter().available_permits(), 1);
        transport.set_max_concurrency(25);
        assert_eq!(transport.current_limiter().available_permits(), 25);
    }

    #[tokio::test]
    async fn reset_swaps_the_client() {
        // Only checks the swap does not disturb the transport; pooled
        // connection state is not observable from here.
        let transport = transport();
        transport.reset();
        let outcome = transport
            .dispatch(&BuiltRequest::new(Method::Get, "not a url"))
            .await;
        assert!(outcome.transport_error.is_some());
    }
}
