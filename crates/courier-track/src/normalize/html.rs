//! Extraction from server-rendered tracking pages.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use super::{json, Normalized};
use crate::types::TrackingEvent;

/// Whitespace-collapsed text content of an element.
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `table tr` rows, skipping the first (header) row. Cells 0, 1 and 2 are
/// timestamp, description and location; rows with fewer than `min_cells`
/// cells are ignored.
pub(super) fn table_rows(html: &str, min_cells: usize, require_timestamp: bool) -> Normalized {
    let document = Html::parse_document(html);
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("table tr"), Selector::parse("td")) else {
        return Normalized::default();
    };

    let mut events = Vec::new();
    for row in document.select(&row_sel).skip(1) {
        let cells: Vec<String> = row.select(&cell_sel).map(|c| element_text(&c)).collect();
        if cells.len() < min_cells.max(2) {
            continue;
        }
        let timestamp = cells[0].clone();
        if require_timestamp && timestamp.is_empty() {
            continue;
        }
        let location = cells.get(2).cloned().unwrap_or_default();
        events.push(TrackingEvent::new(timestamp, cells[1].clone(), location));
    }
    Normalized::from_events(events)
}

/// Text of every element matching `selectors` that is longer than
/// `min_text_len` characters. An element repeating an earlier one's text is
/// skipped (nested matches such as a container and its items overlap).
pub(super) fn list_items(html: &str, selectors: &str, min_text_len: usize) -> Normalized {
    let document = Html::parse_document(html);
    collect_list_items(&document, selectors, min_text_len)
}

fn collect_list_items(document: &Html, selectors: &str, min_text_len: usize) -> Normalized {
    let Ok(sel) = Selector::parse(selectors) else {
        return Normalized::default();
    };

    let mut seen = HashSet::new();
    let mut events = Vec::new();
    for el in document.select(&sel) {
        let text = element_text(&el);
        if text.chars().count() <= min_text_len || !seen.insert(text.clone()) {
            continue;
        }
        events.push(TrackingEvent::new("", text, ""));
    }
    Normalized::from_events(events)
}

/// Events from the page's `script#__NEXT_DATA__` JSON, falling back to list
/// items over the same document when the embedded data yields nothing.
pub(super) fn next_data(html: &str, fallback_selectors: &str, min_text_len: usize) -> Normalized {
    let document = Html::parse_document(html);

    let embedded = Selector::parse("script#__NEXT_DATA__")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>())
        })
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
        .map(|value| json::next_data(&value))
        .unwrap_or_default();
    if !embedded.is_empty() {
        return embedded;
    }

    collect_list_items(&document, fallback_selectors, min_text_len)
}
