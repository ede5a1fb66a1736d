//! In-memory cookie store scoped to the target site.
//!
//! The store owns every session cookie and is the single place they are
//! mutated. Reads used to build outgoing requests take one atomic snapshot
//! under the lock, so a request under construction never observes a
//! half-applied mutation. Nothing is persisted to disk; the session is
//! rebuilt on every process start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Name of the anti-automation guard cookie the site sets after a
/// successful read-only request.
pub const GUARD_COOKIE_NAME: &str = "__ddg1_";

/// Name of the cookie carrying the authenticated session identifier.
pub const AUTH_COOKIE_NAME: &str = "session_token";

/// Logical identity of a well-known session cookie.
///
/// Callers address cookies by role rather than by raw name, so the
/// concrete names the site uses stay in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CookieKind {
    /// Authenticated-session cookie, set by a successful login.
    Auth,
    /// Anti-automation guard cookie, required before any mutating call.
    Guard,
    /// Any other cookie, addressed by its raw name.
    Custom(String),
}

impl CookieKind {
    /// The concrete cookie name this kind maps to.
    pub fn cookie_name(&self) -> &str {
        match self {
            CookieKind::Auth => AUTH_COOKIE_NAME,
            CookieKind::Guard => GUARD_COOKIE_NAME,
            CookieKind::Custom(name) => name,
        }
    }
}

/// A single cookie, uniquely identified by `(domain, name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub domain: String,
    pub path: String,
    pub name: String,
    pub value: String,
    /// Only sent over https.
    pub secure: bool,
    /// Discarded at end of session rather than persisted. The store is
    /// memory-resident either way; the flag is kept for fidelity with
    /// what the site hands out.
    pub session_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CookieKey {
    domain: String,
    name: String,
}

/// Thread-safe cookie store for one site domain.
///
/// Cloning is cheap and all clones share the same underlying map.
#[derive(Debug, Clone)]
pub struct CookieStore {
    /// Default domain for cookies set without an explicit one.
    domain: String,
    inner: Arc<Mutex<HashMap<CookieKey, CookieRecord>>>,
}

impl CookieStore {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The site domain this store is scoped to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Insert or replace a cookie. Identity is `(domain, name)`.
    pub fn set(&self, record: CookieRecord) {
        let key = CookieKey {
            domain: record.domain.clone(),
            name: record.name.clone(),
        };
        self.inner.lock().unwrap().insert(key, record);
    }

    /// Set a well-known cookie on the store's default domain.
    pub fn set_kind(&self, kind: &CookieKind, value: impl Into<String>, session_only: bool, secure: bool) {
        self.set(CookieRecord {
            domain: self.domain.clone(),
            path: "/".to_string(),
            name: kind.cookie_name().to_string(),
            value: value.into(),
            secure,
            session_only,
        });
    }

    pub fn get(&self, domain: &str, name: &str) -> Option<CookieRecord> {
        let key = CookieKey {
            domain: domain.to_string(),
            name: name.to_string(),
        };
        self.inner.lock().unwrap().get(&key).cloned()
    }

    /// Look up a well-known cookie on the store's default domain.
    pub fn get_kind(&self, kind: &CookieKind) -> Option<CookieRecord> {
        self.get(&self.domain, kind.cookie_name())
    }

    pub fn delete(&self, domain: &str, name: &str) -> bool {
        let key = CookieKey {
            domain: domain.to_string(),
            name: name.to_string(),
        };
        self.inner.lock().unwrap().remove(&key).is_some()
    }

    pub fn delete_kind(&self, kind: &CookieKind) -> bool {
        self.delete(&self.domain, kind.cookie_name())
    }

    /// Remove every cookie. Used by session reset.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Build a `cookie` request header value from one atomic snapshot.
    ///
    /// Includes cookies whose domain matches the request host (exact or
    /// parent-domain match) and whose path is a prefix of the request
    /// path. Secure cookies are withheld from plain-http requests.
    /// Returns `None` when nothing is applicable.
    pub fn header_for(&self, host: &str, path: &str, https: bool) -> Option<String> {
        let map = self.inner.lock().unwrap();
        let mut pairs: Vec<(&String, &String)> = map
            .values()
            .filter(|c| domain_matches(host, &c.domain))
            .filter(|c| path.starts_with(c.path.as_str()))
            .filter(|c| https || !c.secure)
            .map(|c| (&c.name, &c.value))
            .collect();
        if pairs.is_empty() {
            return None;
        }
        // Stable ordering so tests and the wire format are deterministic.
        pairs.sort();
        Some(
            pairs
                .into_iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Store cookies from `Set-Cookie` response headers.
    ///
    /// Attributes the site omits fall back to the store's default domain
    /// and the root path, which is how a browser would scope them for a
    /// top-level response.
    pub fn harvest(&self, set_cookie_headers: &[String]) {
        for header in set_cookie_headers {
            if let Some(record) = parse_set_cookie(header, &self.domain) {
                self.set(record);
            }
        }
    }
}

/// Host matches the cookie domain exactly or as a parent domain
/// (`forum.example.com` matches a cookie scoped to `example.com`).
fn domain_matches(host: &str, cookie_domain: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.');
    host == cookie_domain || host.ends_with(&format!(".{cookie_domain}"))
}

/// Minimal `Set-Cookie` parser: name/value plus the attributes the
/// session layer cares about (Domain, Path, Secure). Expiry attributes
/// mark the record session-scoped or not; values are not interpreted
/// beyond that.
fn parse_set_cookie(header: &str, default_domain: &str) -> Option<CookieRecord> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut record = CookieRecord {
        domain: default_domain.to_string(),
        path: "/".to_string(),
        name: name.to_string(),
        value: value.trim().to_string(),
        secure: false,
        session_only: true,
    };

    for attr in parts {
        let attr = attr.trim();
        match attr.split_once('=') {
            Some((k, v)) if k.eq_ignore_ascii_case("domain") => {
                record.domain = v.trim().trim_start_matches('.').to_string();
            }
            Some((k, v)) if k.eq_ignore_ascii_case("path") => {
                record.path = v.trim().to_string();
            }
            Some((k, _)) if k.eq_ignore_ascii_case("expires") || k.eq_ignore_ascii_case("max-age") => {
                record.session_only = false;
            }
            None if attr.eq_ignore_ascii_case("secure") => {
                record.secure = true;
            }
            _ => {}
        }
    }

    Some(record)
}
