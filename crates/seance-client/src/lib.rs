pub mod auth;
pub mod encode;
pub mod gate;
pub mod session;
pub mod transport;

pub use auth::Credentials;
pub use session::Session;
pub use transport::ReqwestTransport;
