//! Event normalizers: raw courier payloads in, canonical events out.
//!
//! Every normalizer is total. Missing fields become empty strings, records
//! without a description are dropped, and a payload of the wrong shape simply
//! yields no events.

mod html;
mod json;

use serde::{Deserialize, Serialize};

use crate::strategy::RawPayload;
use crate::types::TrackingEvent;

/// Canonical output of one strategy attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Most recent first, as served by the courier.
    pub events: Vec<TrackingEvent>,
    pub estimated_delivery: Option<String>,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Build from candidate events, trimming fields and dropping any event
    /// whose description is empty.
    pub fn from_events(events: impl IntoIterator<Item = TrackingEvent>) -> Self {
        let events = events
            .into_iter()
            .map(|e| TrackingEvent {
                timestamp: e.timestamp.trim().to_string(),
                description: e.description.trim().to_string(),
                location: e.location.trim().to_string(),
            })
            .filter(|e| !e.description.is_empty())
            .collect();
        Self {
            events,
            estimated_delivery: None,
        }
    }

    pub fn with_estimated_delivery(mut self, eta: Option<String>) -> Self {
        self.estimated_delivery = eta
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

/// Converts a raw payload into canonical events.
pub trait Normalize: Send + Sync {
    fn normalize(&self, payload: &RawPayload) -> Normalized;
}

impl<F> Normalize for F
where
    F: Fn(&RawPayload) -> Normalized + Send + Sync,
{
    fn normalize(&self, payload: &RawPayload) -> Normalized {
        self(payload)
    }
}

/// The built-in normalizers, selectable from configuration by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Normalizer {
    /// Delhivery `ShipmentData[0].Shipment.Scans`.
    DelhiveryShipments,
    /// India Post article-details array.
    IndiaPostArticles,
    /// India Post consignment array.
    IndiaPostConsignment,
    /// Ekart `trackDetails`.
    EkartDetails,
    /// Shadowfax `events` / `tracking_events`, optionally wrapped in `data`.
    ShadowfaxTrack,
    /// `table tr` rows: timestamp, description, location columns.
    TableRows {
        #[serde(default = "default_min_cells")]
        min_cells: usize,
        #[serde(default)]
        require_timestamp: bool,
    },
    /// Whole-text list items under tracking/timeline/event containers.
    ListItems {
        selectors: String,
        #[serde(default = "default_min_text_len")]
        min_text_len: usize,
    },
    /// Next.js `__NEXT_DATA__` embedded JSON, with a list-item fallback.
    NextData {
        fallback_selectors: String,
        #[serde(default = "default_min_text_len")]
        min_text_len: usize,
    },
}

fn default_min_cells() -> usize {
    2
}

fn default_min_text_len() -> usize {
    4
}

impl Normalizer {
    /// CSS selector groups this normalizer will parse, for validation at
    /// registry build time.
    pub fn selectors(&self) -> Option<&str> {
        match self {
            Normalizer::ListItems { selectors, .. } => Some(selectors),
            Normalizer::NextData {
                fallback_selectors, ..
            } => Some(fallback_selectors),
            _ => None,
        }
    }
}

impl Normalize for Normalizer {
    fn normalize(&self, payload: &RawPayload) -> Normalized {
        match (self, payload) {
            (Normalizer::DelhiveryShipments, RawPayload::Json(v)) => json::delhivery(v),
            (Normalizer::IndiaPostArticles, RawPayload::Json(v)) => json::india_post_articles(v),
            (Normalizer::IndiaPostConsignment, RawPayload::Json(v)) => {
                json::india_post_consignment(v)
            }
            (Normalizer::EkartDetails, RawPayload::Json(v)) => json::ekart(v),
            (Normalizer::ShadowfaxTrack, RawPayload::Json(v)) => json::shadowfax(v),
            (
                Normalizer::TableRows {
                    min_cells,
                    require_timestamp,
                },
                RawPayload::Html(body),
            ) => html::table_rows(body, *min_cells, *require_timestamp),
            (
                Normalizer::ListItems {
                    selectors,
                    min_text_len,
                },
                RawPayload::Html(body),
            ) => html::list_items(body, selectors, *min_text_len),
            (
                Normalizer::NextData {
                    fallback_selectors,
                    min_text_len,
                },
                RawPayload::Html(body),
            ) => html::next_data(body, fallback_selectors, *min_text_len),
            _ => Normalized::default(),
        }
    }
}

/// First candidate that is non-empty after trimming, else empty string.
pub(crate) fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_events_drops_empty_descriptions() {
        let n = Normalized::from_events(vec![
            TrackingEvent::new("2024-01-01", "  ", "Delhi"),
            TrackingEvent::new(" 2024-01-02 ", " Picked up ", " Mumbai "),
        ]);
        assert_eq!(n.events, vec![TrackingEvent::new("2024-01-02", "Picked up", "Mumbai")]);
    }

    #[test]
    fn test_blank_eta_is_dropped() {
        let n = Normalized::default().with_estimated_delivery(Some("  ".into()));
        assert_eq!(n.estimated_delivery, None);
    }

    #[test]
    fn test_first_non_empty() {
        assert_eq!(first_non_empty([None, Some(" "), Some("b"), Some("c")]), "b");
        assert_eq!(first_non_empty([None, None]), "");
    }

    #[test]
    fn test_payload_kind_mismatch_is_empty() {
        let n = Normalizer::DelhiveryShipments.normalize(&RawPayload::Html("<p>x</p>".into()));
        assert!(n.is_empty());
        let n = Normalizer::TableRows {
            min_cells: 2,
            require_timestamp: false,
        }
        .normalize(&RawPayload::Json(json!([])));
        assert!(n.is_empty());
    }

    #[test]
    fn test_closure_normalizer() {
        let f = |p: &RawPayload| match p {
            RawPayload::Json(v) => Normalized::from_events(
                v.as_array()
                    .into_iter()
                    .flatten()
                    .map(|e| TrackingEvent::new("", e.as_str().unwrap_or(""), "")),
            ),
            RawPayload::Html(_) => Normalized::default(),
        };
        let n = f.normalize(&RawPayload::Json(json!(["a", "", "b"])));
        assert_eq!(n.events.len(), 2);
    }

    #[test]
    fn test_normalizer_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            normalizer: Normalizer,
        }
        let w: Wrapper =
            toml::from_str(r#"normalizer = { type = "table_rows", min_cells = 3 }"#).unwrap();
        assert_eq!(
            w.normalizer,
            Normalizer::TableRows {
                min_cells: 3,
                require_timestamp: false
            }
        );
        let w: Wrapper = toml::from_str(r#"normalizer = { type = "ekart_details" }"#).unwrap();
        assert_eq!(w.normalizer, Normalizer::EkartDetails);
    }
}
