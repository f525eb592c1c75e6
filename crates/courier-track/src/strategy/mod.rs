//! Retrieval strategies: one way each of getting a raw payload out of a
//! courier's systems.

pub mod html;
pub mod json;
pub mod postback;

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::config::{Defaults, NUMBER_PLACEHOLDER};
use crate::error::StrategyError;

pub use html::HtmlStrategy;
pub use json::JsonStrategy;
pub use postback::PostbackStrategy;

/// What a strategy hands to its paired normalizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(serde_json::Value),
    Html(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Json,
    Html,
    Postback,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StrategyKind::Json => "json",
            StrategyKind::Html => "html",
            StrategyKind::Postback => "postback",
        })
    }
}

/// A single method of obtaining tracking data.
///
/// `fetch` never panics and never lets a transport error escape as anything
/// but a [`StrategyError`]; the orchestrator treats every error the same way.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch(&self, tracking_number: &str) -> Result<RawPayload, StrategyError>;
}

/// Substitute the tracking number into a URL template: percent-encoded in the
/// path, form-encoded in the query string.
pub fn render_url(template: &str, tracking_number: &str) -> String {
    let (path, query) = match template.find('?') {
        Some(i) => template.split_at(i),
        None => (template, ""),
    };
    let in_path = urlencoding::encode(tracking_number);
    let in_query: String =
        url::form_urlencoded::byte_serialize(tracking_number.as_bytes()).collect();
    format!(
        "{}{}",
        path.replace(NUMBER_PLACEHOLDER, &in_path),
        query.replace(NUMBER_PLACEHOLDER, &in_query)
    )
}

/// Substitute the tracking number into every string leaf of a JSON template.
pub fn render_body(template: &serde_json::Value, tracking_number: &str) -> serde_json::Value {
    use serde_json::Value;
    match template {
        Value::String(s) => Value::String(s.replace(NUMBER_PLACEHOLDER, tracking_number)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_body(v, tracking_number))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_body(v, tracking_number)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Build the request headers: the browser-like baseline from `defaults`,
/// overridden by the strategy's own entries.
///
/// Returns the offending header name on failure.
pub fn build_headers(
    defaults: &Defaults,
    overrides: &BTreeMap<String, String>,
) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    let baseline = [
        (USER_AGENT, defaults.user_agent.as_str()),
        (ACCEPT, defaults.accept.as_str()),
        (ACCEPT_LANGUAGE, defaults.accept_language.as_str()),
    ];
    for (name, value) in baseline {
        if value.is_empty() {
            continue;
        }
        let value = HeaderValue::from_str(value).map_err(|_| name.to_string())?;
        headers.insert(name, value);
    }
    for (name, value) in overrides {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| name.clone())?;
        let value = HeaderValue::from_str(value).map_err(|_| name.clone())?;
        headers.insert(header, value);
    }
    Ok(headers)
}
