use thiserror::Error;

/// Closed error taxonomy for the session layer.
///
/// Every failure signal the target site can produce — transport errors,
/// HTTP status codes, error codes embedded in redirect URLs — is mapped
/// into exactly one of these kinds by the response classifier. Callers
/// never see raw transport errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, TLS, connect, read).
    #[error("transport error: {0}")]
    Transport(String),

    /// HTTP status outside the accepted 200..=399 range.
    #[error("unexpected HTTP status {status}")]
    WrongStatusCode { status: u16 },

    /// A mutating request was attempted without the site's guard cookie.
    ///
    /// The request is refused locally; no transport call is made.
    #[error("guard cookie not present; mutating request refused")]
    MissingGuardCookie,

    /// A request escaped the readiness gate before initialization finished.
    ///
    /// Structurally unreachable while the pending queue is in place; kept
    /// as a defensive terminal case.
    #[error("session not ready")]
    NotReady,

    /// Response body could not be decoded into the expected shape.
    ///
    /// Produced by callers (extractors) interpreting the raw body, and by
    /// the login flow when the token field is absent.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Request body could not be serialized into the chosen encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The site requires an authenticated session for this operation.
    #[error("login required")]
    LoginRequired,

    /// The site's anti-automation layer is demanding a challenge solve.
    #[error("captcha challenge required")]
    CaptchaRequired,

    /// The site accepted the request but reported the action failed.
    #[error("action failed")]
    ActionFailed,

    /// Login was rejected because a one-time code is required.
    #[error("two-factor code required")]
    MissingTwoFactor,

    /// Login was rejected because the credentials are wrong.
    #[error("wrong login or password")]
    WrongAuthInfo,
}

impl ApiError {
    /// Returns true if this error means the user must (re)authenticate
    /// or complete a challenge before the operation can succeed.
    pub fn needs_user_action(&self) -> bool {
        matches!(
            self,
            ApiError::LoginRequired
                | ApiError::CaptchaRequired
                | ApiError::MissingTwoFactor
                | ApiError::WrongAuthInfo
        )
    }

    /// Returns true if the request was refused locally, before any
    /// transport call was made.
    pub fn refused_locally(&self) -> bool {
        matches!(self, ApiError::MissingGuardCookie | ApiError::NotReady)
    }
}
