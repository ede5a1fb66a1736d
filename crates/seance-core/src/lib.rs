pub mod classify;
pub mod cookie;
pub mod error;
pub mod outcome;
pub mod pacing;
pub mod request;
pub mod testutil;
pub mod traits;

pub use classify::classify;
pub use cookie::{CookieKind, CookieRecord, CookieStore};
pub use error::ApiError;
pub use outcome::{ClassifiedResult, RequestOutcome};
pub use pacing::{PacingGuard, DEFAULT_PACING_DELAY, MIN_PACING_DELAY};
pub use request::{BodyEncoding, BuiltRequest, Method, RequestOptions};
pub use traits::{
    StaticResolver, Transport, UserAgentResolver, FALLBACK_USER_AGENT, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};
