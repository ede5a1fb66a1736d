//! Login and logout on top of the orchestrator.
//!
//! The site's login endpoint is a legacy form handler: credentials go
//! urlencoded, failures come back as error codes on a redirect URL, and
//! success hands out the session cookie plus a bearer token in a JSON
//! body. Only a successful login mutates session state.

use seance_core::cookie::CookieKind;
use seance_core::error::ApiError;
use seance_core::request::{BodyEncoding, RequestOptions};
use seance_core::traits::Transport;
use serde::Serialize;

use crate::session::Session;

/// Login form contents.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    /// One-time code, when the account has two-factor auth enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            otp: None,
        }
    }

    pub fn with_otp(mut self, otp: impl Into<String>) -> Self {
        self.otp = Some(otp.into());
        self
    }
}

impl<T: Transport + 'static> Session<T> {
    /// Authenticate against the site's login endpoint.
    ///
    /// On success the bearer token from the response is stored and the
    /// auth cookie the site sets alongside it is harvested like any
    /// other. A failed login changes nothing.
    pub async fn login(&self, url: &str, credentials: &Credentials) -> Result<(), ApiError> {
        let body =
            serde_json::to_value(credentials).map_err(|e| ApiError::Encoding(e.to_string()))?;
        let options = RequestOptions {
            encoding: BodyEncoding::FormUrlencoded,
            ..RequestOptions::default()
        };

        let result = self.post(url, Some(&body), options).await?;

        let payload: serde_json::Value =
            serde_json::from_str(&result.body).map_err(|e| ApiError::Decoding(e.to_string()))?;
        let token = payload
            .get("token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| ApiError::Decoding("login response has no token field".to_string()))?;

        self.set_token(token);
        Ok(())
    }

    /// End the authenticated session.
    ///
    /// The token and auth cookie are cleared locally whether or not the
    /// site accepted the logout call.
    pub async fn logout(&self, url: &str) -> Result<(), ApiError> {
        let result = self.post(url, None, RequestOptions::default()).await;
        self.clear_token();
        self.cookie_store().delete_kind(&CookieKind::Auth);
        result.map(|_| ())
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some() || self.cookie_store().get_kind(&CookieKind::Auth).is_some()
    }
}
