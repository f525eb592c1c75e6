//! Inbound transports.

pub mod http;
pub mod rate_limit;

pub use http::{router, AppState, HttpTransport};
pub use rate_limit::{Decision, RateLimiter};
