//! Raw-payload schemas for JSON couriers.
//!
//! Every field is optional and every scalar is read leniently (strings,
//! numbers and booleans are all accepted as text) so a partially-populated
//! record never sinks the whole payload. Each extractor documents its field
//! fallback chain.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use super::{first_non_empty, Normalized};
use crate::types::TrackingEvent;

/// Accept any scalar as text; null, arrays and objects become `None`.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept an array, keeping only the items that match `T`; anything else is
/// an empty list.
fn lenient_vec<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Vec<T>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn parse<T: DeserializeOwned + Default>(value: &Value) -> T {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn parse_list<T: DeserializeOwned>(value: &Value) -> Vec<T> {
    lenient_vec(value.clone()).unwrap_or_default()
}

// ── Delhivery ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DelhiveryEnvelope {
    #[serde(rename = "ShipmentData", deserialize_with = "lenient_vec")]
    shipment_data: Vec<DelhiveryShipmentData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DelhiveryShipmentData {
    #[serde(rename = "Shipment")]
    shipment: Option<DelhiveryShipment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DelhiveryShipment {
    #[serde(rename = "Scans", deserialize_with = "lenient_vec")]
    scans: Vec<DelhiveryScan>,
    #[serde(rename = "ExpectedDeliveryDate", deserialize_with = "lenient_string")]
    expected_delivery_date: Option<String>,
    #[serde(rename = "PromisedDeliveryDate", deserialize_with = "lenient_string")]
    promised_delivery_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DelhiveryScan {
    #[serde(rename = "ScanDetail")]
    scan_detail: Option<DelhiveryScanDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct DelhiveryScanDetail {
    #[serde(deserialize_with = "lenient_string")]
    scan_date_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    instructions: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    scan: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    scan_type: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    scanned_location: Option<String>,
}

/// Envelope: `ShipmentData[0].Shipment`.
///
/// - timestamp: `ScanDateTime`
/// - description: `Instructions`, else `Scan`, else `ScanType`
/// - location: `ScannedLocation`
/// - estimated delivery: `ExpectedDeliveryDate`, else `PromisedDeliveryDate`
pub(super) fn delhivery(value: &Value) -> Normalized {
    let envelope: DelhiveryEnvelope = parse(value);
    let Some(shipment) = envelope
        .shipment_data
        .into_iter()
        .next()
        .and_then(|d| d.shipment)
    else {
        return Normalized::default();
    };

    let events = shipment
        .scans
        .iter()
        .filter_map(|s| s.scan_detail.as_ref())
        .map(|d| {
            TrackingEvent::new(
                first_non_empty([d.scan_date_time.as_deref()]),
                first_non_empty([
                    d.instructions.as_deref(),
                    d.scan.as_deref(),
                    d.scan_type.as_deref(),
                ]),
                first_non_empty([d.scanned_location.as_deref()]),
            )
        });

    let eta = first_non_empty([
        shipment.expected_delivery_date.as_deref(),
        shipment.promised_delivery_date.as_deref(),
    ]);
    Normalized::from_events(events).with_estimated_delivery(Some(eta))
}

// ── India Post ──────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndiaPostRecord {
    #[serde(rename = "EventDate", deserialize_with = "lenient_string")]
    event_date: Option<String>,
    #[serde(rename = "EventTime", deserialize_with = "lenient_string")]
    event_time: Option<String>,
    #[serde(rename = "Event", deserialize_with = "lenient_string")]
    event: Option<String>,
    #[serde(rename = "Description", deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(rename = "Office", deserialize_with = "lenient_string")]
    office: Option<String>,
    #[serde(rename = "Location", deserialize_with = "lenient_string")]
    location: Option<String>,
    #[serde(rename = "date", deserialize_with = "lenient_string")]
    date_lower: Option<String>,
    #[serde(rename = "event", deserialize_with = "lenient_string")]
    event_lower: Option<String>,
    #[serde(rename = "location", deserialize_with = "lenient_string")]
    location_lower: Option<String>,
}

/// Top-level array from the article-details endpoint.
///
/// - timestamp: `EventDate` and `EventTime` joined by a space
/// - description: `Event`, else `Description`
/// - location: `Office`, else `Location`
pub(super) fn india_post_articles(value: &Value) -> Normalized {
    let records: Vec<IndiaPostRecord> = parse_list(value);
    Normalized::from_events(records.iter().map(|r| {
        let date = first_non_empty([r.event_date.as_deref()]);
        let time = first_non_empty([r.event_time.as_deref()]);
        TrackingEvent::new(
            format!("{date} {time}"),
            first_non_empty([r.event.as_deref(), r.description.as_deref()]),
            first_non_empty([r.office.as_deref(), r.location.as_deref()]),
        )
    }))
}

/// Top-level array from the consignment endpoint.
///
/// - timestamp: `EventDate`, else `date`
/// - description: `Event`, else `event`, else `Description`
/// - location: `Office`, else `location`
pub(super) fn india_post_consignment(value: &Value) -> Normalized {
    let records: Vec<IndiaPostRecord> = parse_list(value);
    Normalized::from_events(records.iter().map(|r| {
        TrackingEvent::new(
            first_non_empty([r.event_date.as_deref(), r.date_lower.as_deref()]),
            first_non_empty([
                r.event.as_deref(),
                r.event_lower.as_deref(),
                r.description.as_deref(),
            ]),
            first_non_empty([r.office.as_deref(), r.location_lower.as_deref()]),
        )
    }))
}

// ── Ekart ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EkartEnvelope {
    #[serde(rename = "trackDetails", deserialize_with = "lenient_vec")]
    track_details: Vec<EkartDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EkartDetail {
    #[serde(rename = "statusDateTime", deserialize_with = "lenient_string")]
    status_date_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    location: Option<String>,
}

/// Envelope: `trackDetails[]` with `statusDateTime`, `status`, `location`.
pub(super) fn ekart(value: &Value) -> Normalized {
    let envelope: EkartEnvelope = parse(value);
    Normalized::from_events(envelope.track_details.iter().map(|d| {
        TrackingEvent::new(
            first_non_empty([d.status_date_time.as_deref()]),
            first_non_empty([d.status.as_deref()]),
            first_non_empty([d.location.as_deref()]),
        )
    }))
}

// ── Shadowfax ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShadowfaxBody {
    #[serde(deserialize_with = "lenient_vec")]
    events: Vec<ShadowfaxEvent>,
    #[serde(deserialize_with = "lenient_vec")]
    tracking_events: Vec<ShadowfaxEvent>,
    #[serde(deserialize_with = "lenient_string")]
    current_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShadowfaxEvent {
    #[serde(deserialize_with = "lenient_string")]
    timestamp: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    location: Option<String>,
}

/// Body: `data` when it is an object, else the root.
///
/// - events: `events`, else `tracking_events`
/// - timestamp: `timestamp`, else `time`
/// - description: `status`, else `description`
/// - location: `location`
///
/// When no event survives but `current_status` is set, that status becomes
/// the single event.
pub(super) fn shadowfax(value: &Value) -> Normalized {
    let root = value.get("data").filter(|d| d.is_object()).unwrap_or(value);
    let body: ShadowfaxBody = parse(root);

    let raw = if body.events.is_empty() {
        &body.tracking_events
    } else {
        &body.events
    };
    let normalized = Normalized::from_events(raw.iter().map(|e| {
        TrackingEvent::new(
            first_non_empty([e.timestamp.as_deref(), e.time.as_deref()]),
            first_non_empty([e.status.as_deref(), e.description.as_deref()]),
            first_non_empty([e.location.as_deref()]),
        )
    }));
    if !normalized.is_empty() {
        return normalized;
    }

    Normalized::from_events([TrackingEvent::new(
        "",
        first_non_empty([body.current_status.as_deref()]),
        "",
    )])
}

// ── Next.js embedded data (Amazon) ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextData {
    props: NextProps,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextProps {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageProps {
    #[serde(rename = "packageDetails", deserialize_with = "lenient_vec")]
    package_details: Vec<NextPackage>,
    #[serde(rename = "trackingDetails")]
    tracking_details: Option<NextTrackingDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextTrackingDetails {
    #[serde(deserialize_with = "lenient_vec")]
    packages: Vec<NextPackage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextPackage {
    #[serde(rename = "trackingEvents", deserialize_with = "lenient_vec")]
    tracking_events: Vec<NextEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextEvent {
    #[serde(rename = "eventTime", deserialize_with = "lenient_string")]
    event_time: Option<String>,
    #[serde(rename = "eventDescription", deserialize_with = "lenient_string")]
    event_description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    location: Option<String>,
}

/// Packages: `props.pageProps.packageDetails`, else
/// `props.pageProps.trackingDetails.packages`; events from the first
/// package's `trackingEvents` (`eventTime`, `eventDescription`, `location`).
pub(super) fn next_data(value: &Value) -> Normalized {
    let data: NextData = parse(value);
    let page = data.props.page_props;
    let packages = if page.package_details.is_empty() {
        page.tracking_details.map(|t| t.packages).unwrap_or_default()
    } else {
        page.package_details
    };
    let Some(package) = packages.into_iter().next() else {
        return Normalized::default();
    };
    Normalized::from_events(package.tracking_events.iter().map(|e| {
        TrackingEvent::new(
            first_non_empty([e.event_time.as_deref()]),
            first_non_empty([e.event_description.as_deref()]),
            first_non_empty([e.location.as_deref()]),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_delhivery_fallback_chain_and_eta() {
        let payload = json!({
            "ShipmentData": [{
                "Shipment": {
                    "ExpectedDeliveryDate": "",
                    "PromisedDeliveryDate": "2024-03-09T23:59:00",
                    "Scans": [
                        {"ScanDetail": {"ScanDateTime": "2024-03-07T10:00:00", "Instructions": "Out for delivery", "Scan": "Dispatched", "ScannedLocation": "Pune_Hub"}},
                        {"ScanDetail": {"ScanDateTime": "2024-03-06T08:00:00", "Instructions": null, "Scan": "In Transit"}},
                        {"ScanDetail": {"ScanDateTime": "2024-03-05T08:00:00", "ScanType": "UD"}},
                        {"ScanDetail": {"ScanDateTime": "2024-03-04T08:00:00"}},
                        {"NoDetail": true},
                        42
                    ]
                }
            }]
        });
        let n = delhivery(&payload);
        assert_eq!(
            n.events,
            vec![
                TrackingEvent::new("2024-03-07T10:00:00", "Out for delivery", "Pune_Hub"),
                TrackingEvent::new("2024-03-06T08:00:00", "In Transit", ""),
                TrackingEvent::new("2024-03-05T08:00:00", "UD", ""),
            ]
        );
        assert_eq!(n.estimated_delivery.as_deref(), Some("2024-03-09T23:59:00"));
    }

    #[test]
    fn test_delhivery_missing_envelope() {
        assert!(delhivery(&json!({})).is_empty());
        assert!(delhivery(&json!({"ShipmentData": []})).is_empty());
        assert!(delhivery(&json!({"ShipmentData": "oops"})).is_empty());
        assert!(delhivery(&json!([1, 2])).is_empty());
    }

    #[test]
    fn test_india_post_articles() {
        let payload = json!([
            {"EventDate": "12/03/2024", "EventTime": "10:15", "Event": "Item Booked", "Office": "Srinagar HO"},
            {"EventDate": "13/03/2024", "Description": "Item Dispatched", "Location": "Jammu"},
            {"EventDate": "14/03/2024", "Event": ""},
            null
        ]);
        let n = india_post_articles(&payload);
        assert_eq!(
            n.events,
            vec![
                TrackingEvent::new("12/03/2024 10:15", "Item Booked", "Srinagar HO"),
                TrackingEvent::new("13/03/2024", "Item Dispatched", "Jammu"),
            ]
        );
    }

    #[test]
    fn test_india_post_consignment_lowercase_fields() {
        let payload = json!([
            {"date": "2024-03-12", "event": "Picked up", "location": "Delhi"},
            {"EventDate": "2024-03-13", "Event": "In transit", "Office": "Agra", "location": "ignored"}
        ]);
        let n = india_post_consignment(&payload);
        assert_eq!(
            n.events,
            vec![
                TrackingEvent::new("2024-03-12", "Picked up", "Delhi"),
                TrackingEvent::new("2024-03-13", "In transit", "Agra"),
            ]
        );
        assert!(india_post_consignment(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn test_ekart_numbers_read_as_text() {
        let payload = json!({"trackDetails": [
            {"statusDateTime": 1710000000, "status": "Shipment picked up", "location": "Bengaluru"},
            {"status": null}
        ]});
        let n = ekart(&payload);
        assert_eq!(
            n.events,
            vec![TrackingEvent::new("1710000000", "Shipment picked up", "Bengaluru")]
        );
        assert!(ekart(&json!({"trackDetails": []})).is_empty());
    }

    #[test]
    fn test_shadowfax_wrapped_and_current_status() {
        let wrapped = json!({"data": {"tracking_events": [
            {"time": "10:00", "description": "Out for delivery", "location": "Hyderabad"}
        ]}});
        assert_eq!(
            shadowfax(&wrapped).events,
            vec![TrackingEvent::new("10:00", "Out for delivery", "Hyderabad")]
        );

        let status_only = json!({"status": "ok", "current_status": "Delivered"});
        assert_eq!(
            shadowfax(&status_only).events,
            vec![TrackingEvent::new("", "Delivered", "")]
        );

        assert!(shadowfax(&json!({"status": "error"})).is_empty());
    }

    #[test]
    fn test_next_data_package_paths() {
        let direct = json!({"props": {"pageProps": {"packageDetails": [
            {"trackingEvents": [{"eventTime": "Mon 9am", "eventDescription": "Delivered", "location": "Kochi"}]}
        ]}}});
        assert_eq!(next_data(&direct).events.len(), 1);

        let nested = json!({"props": {"pageProps": {"trackingDetails": {"packages": [
            {"trackingEvents": [{"eventDescription": "Shipped"}, {"eventDescription": "Booked"}]}
        ]}}}});
        let n = next_data(&nested);
        assert_eq!(n.events[0].description, "Shipped");
        assert_eq!(n.events.len(), 2);

        assert!(next_data(&json!({"props": {}})).is_empty());
    }
}
