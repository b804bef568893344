pub mod auth;
pub mod headers;
pub mod session_timeout;

pub use auth::{authenticate, authorize, Policy, Principal};
pub use headers::cache_and_transport_headers;
pub use session_timeout::session_timeout;
