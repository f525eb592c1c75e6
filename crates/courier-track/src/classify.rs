//! Keyword classification of free-text event descriptions.
//!
//! Rules are evaluated in order and the first match wins. The order matters:
//! "out for delivery" also contains "deliver", and return/failure wording
//! often mentions transit as well.

use crate::types::Status;

/// Map an event description to a [`Status`]. Total: unmatched or empty text
/// yields [`Status::InTransit`].
pub fn classify(text: &str) -> Status {
    let t = text.to_lowercase();
    let has = |needle: &str| t.contains(needle);

    if has("deliver") && !has("undeliver") && !has("out for") && !has("failed") {
        return Status::Delivered;
    }
    if has("out for delivery") {
        return Status::OutForDelivery;
    }
    if has("return") {
        return Status::Returned;
    }
    if has("fail") || has("undeliver") || has("rto") {
        return Status::DeliveryFailed;
    }
    if has("transit")
        || has("dispatch")
        || has("despatch")
        || has("shipped")
        || has("depart")
    {
        return Status::InTransit;
    }
    if has("book") || has("accept") || has("pickup") || has("pick up") {
        return Status::Booked;
    }

    Status::InTransit
}
