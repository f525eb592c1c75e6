//! courier-track server: JSON tracking API and static frontend over HTTP.

pub mod config;
pub mod transport;
pub mod types;

pub use config::{load_registry, resolve_couriers_path, ServerConfig};
pub use transport::{router, AppState, HttpTransport};
pub use types::{ServerError, ServerResult};
