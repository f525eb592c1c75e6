//! Canonical tracking data shared by every courier.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TrackError;

/// One resolution call: which courier, which tracking number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRequest {
    pub courier_id: String,
    pub tracking_number: String,
}

impl TrackingRequest {
    /// Build a request, normalizing the tracking number (trimmed, upper-cased).
    pub fn new(courier_id: &str, tracking_number: &str) -> Self {
        Self {
            courier_id: courier_id.trim().to_string(),
            tracking_number: normalize_tracking_number(tracking_number),
        }
    }
}

/// Trim and upper-case a raw tracking number.
pub fn normalize_tracking_number(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A single courier-agnostic checkpoint.
///
/// Serialized as `{date, event, location}` for compatibility with existing
/// clients of the tracking API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Courier-specific timestamp text, possibly empty. Never parsed.
    #[serde(rename = "date")]
    pub timestamp: String,
    /// Free-text description. Never empty after normalization.
    #[serde(rename = "event")]
    pub description: String,
    /// Scan location, possibly empty.
    pub location: String,
}

impl TrackingEvent {
    pub fn new(
        timestamp: impl Into<String>,
        description: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            description: description.into(),
            location: location.into(),
        }
    }
}

/// Shipment lifecycle state derived from event text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Booked")]
    Booked,
    #[default]
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Returned")]
    Returned,
    #[serde(rename = "Delivery Failed")]
    DeliveryFailed,
}

impl Status {
    /// Display label, identical to the serialized form.
    pub fn label(self) -> &'static str {
        match self {
            Status::Booked => "Booked",
            Status::InTransit => "In Transit",
            Status::OutForDelivery => "Out for Delivery",
            Status::Delivered => "Delivered",
            Status::Returned => "Returned",
            Status::DeliveryFailed => "Delivery Failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSuccess {
    /// Courier display name.
    pub courier: String,
    pub tracking_number: String,
    pub status: Status,
    pub estimated_delivery: Option<String>,
    /// Most recent first. Never empty.
    pub events: Vec<TrackingEvent>,
}

/// Outcome of one resolution call, serialized with a `success` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackingResult {
    Success(TrackingSuccess),
    Failure { error: String },
}

impl TrackingResult {
    pub fn failure(error: impl Into<String>) -> Self {
        TrackingResult::Failure {
            error: error.into(),
        }
    }

    /// Convert a resolution error into its user-presentable failure.
    pub fn from_error(err: &TrackError) -> Self {
        Self::failure(err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TrackingResult::Success(_))
    }

    pub fn as_success(&self) -> Option<&TrackingSuccess> {
        match self {
            TrackingResult::Success(s) => Some(s),
            TrackingResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TrackingResult::Success(_) => None,
            TrackingResult::Failure { error } => Some(error),
        }
    }
}

impl From<Result<TrackingSuccess, TrackError>> for TrackingResult {
    fn from(r: Result<TrackingSuccess, TrackError>) -> Self {
        match r {
            Ok(s) => TrackingResult::Success(s),
            Err(e) => TrackingResult::from_error(&e),
        }
    }
}

impl Serialize for TrackingResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrackingResult::Success(s) => {
                let len = if s.estimated_delivery.is_some() { 6 } else { 5 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("courier", &s.courier)?;
                map.serialize_entry("trackingNumber", &s.tracking_number)?;
                map.serialize_entry("status", &s.status)?;
                if let Some(eta) = &s.estimated_delivery {
                    map.serialize_entry("estimatedDelivery", eta)?;
                }
                map.serialize_entry("events", &s.events)?;
                map.end()
            }
            TrackingResult::Failure { error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_normalizes_number() {
        let req = TrackingRequest::new(" IndiaPost ", "  ee123456789in \n");
        assert_eq!(req.courier_id, "IndiaPost");
        assert_eq!(req.tracking_number, "EE123456789IN");
    }

    #[test]
    fn test_success_wire_shape() {
        let result = TrackingResult::Success(TrackingSuccess {
            courier: "Delhivery".into(),
            tracking_number: "123".into(),
            status: Status::OutForDelivery,
            estimated_delivery: None,
            events: vec![TrackingEvent::new("2024-01-02", "Out for delivery", "Pune")],
        });

        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(
            v,
            json!({
                "success": true,
                "courier": "Delhivery",
                "trackingNumber": "123",
                "status": "Out for Delivery",
                "events": [{"date": "2024-01-02", "event": "Out for delivery", "location": "Pune"}]
            })
        );
    }

    #[test]
    fn test_estimated_delivery_included_when_present() {
        let result = TrackingResult::Success(TrackingSuccess {
            courier: "Delhivery".into(),
            tracking_number: "123".into(),
            status: Status::InTransit,
            estimated_delivery: Some("2024-01-05".into()),
            events: vec![TrackingEvent::new("", "In transit", "")],
        });
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["estimatedDelivery"], "2024-01-05");
    }

    #[test]
    fn test_failure_wire_shape() {
        let v = serde_json::to_value(TrackingResult::failure("nope")).unwrap();
        assert_eq!(v, json!({"success": false, "error": "nope"}));
    }
}
