//! Request shapes handed from the orchestrator to the transport.

/// HTTP method, restricted to the verbs the session layer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Mutating methods go through the anti-automation pacing guard;
    /// reads do not.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// Body encoding for mutating requests.
///
/// JSON is the default; the form encodings exist for legacy endpoints
/// that only accept browser form submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    #[default]
    Json,
    FormUrlencoded,
    FormMultipart,
}

/// Per-call options. All optional; omission uses method-appropriate
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub encoding: BodyEncoding,
    pub referer: Option<String>,
    /// Value for the `x-requested-with` header some endpoints use to
    /// distinguish XHR from navigation.
    pub requested_with: Option<String>,
}

/// A fully-built request: everything the transport needs to dispatch,
/// with no knowledge of session state.
#[derive(Debug, Clone)]
pub struct BuiltRequest {
    pub method: Method,
    pub url: String,
    /// Header name/value pairs, names lowercase.
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl BuiltRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn push_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
    }

    /// First value of a header, by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_get_is_non_mutating() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Post.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Delete.is_mutating());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut req = BuiltRequest::new(Method::Get, "https://example.com/");
        req.push_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }
}
