//! Wire types and errors for the HTTP front door.

pub mod api;
pub mod error;

pub use api::{HealthResponse, TrackQuery};
pub use error::{ServerError, ServerResult};
