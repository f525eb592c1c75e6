use serde::{Deserialize, Serialize};

/// Query string of `GET /api/track`. Both parameters are optional here so
/// that a missing one produces the tracking failure body rather than an
/// extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackQuery {
    pub courier: Option<String>,
    pub number: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub couriers: Vec<String>,
}

impl HealthResponse {
    pub fn ok(couriers: Vec<String>) -> Self {
        Self {
            status: "ok".to_string(),
            couriers,
        }
    }
}
