//! courier-track: resolve a shipment's status and history from third-party
//! courier services through ordered fallback retrieval chains.

pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod registry;
pub mod session;
pub mod strategy;
pub mod tracker;
pub mod types;

pub use classify::classify;
pub use config::CourierConfig;
pub use error::{ConfigError, StrategyError, TrackError, TrackResult};
pub use http::HttpClient;
pub use normalize::{Normalize, Normalized, Normalizer};
pub use registry::{CourierEntry, Registry, Step};
pub use strategy::{RawPayload, Strategy, StrategyKind};
pub use tracker::Tracker;
pub use types::*;
