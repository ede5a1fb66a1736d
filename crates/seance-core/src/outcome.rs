//! Raw and classified request results.

/// Raw result of one dispatched request, before classification.
///
/// Produced exactly once per dispatch and never mutated afterwards. A
/// transport failure and an HTTP response are mutually exclusive, but
/// the type does not enforce that; the classifier's rule order does.
#[derive(Debug, Clone, Default)]
pub struct RequestOutcome {
    pub status: Option<u16>,
    pub body: Option<String>,
    /// URL the response actually came from, after redirects. The site
    /// encodes some failures as query parameters on a redirect target.
    pub final_url: Option<String>,
    pub transport_error: Option<String>,
    /// Raw `Set-Cookie` header values from the response, in order.
    pub set_cookies: Vec<String>,
}

impl RequestOutcome {
    /// A successful response with the given status and body.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// A plain 200 response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    /// A transport-level failure; no HTTP response was received.
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self {
            transport_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_final_url(mut self, url: impl Into<String>) -> Self {
        self.final_url = Some(url.into());
        self
    }

    pub fn with_set_cookie(mut self, header: impl Into<String>) -> Self {
        self.set_cookies.push(header.into());
        self
    }
}

/// The single typed outcome delivered to callers on success.
///
/// The body is raw text; decoding it into a domain object is the
/// caller's job, not the session layer's.
#[derive(Debug, Clone)]
pub struct ClassifiedResult {
    pub status: u16,
    pub body: String,
    pub final_url: Option<String>,
}
