//! Direct call to a courier's JSON endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::{render_body, render_url, RawPayload, Strategy, StrategyKind};
use crate::config::HttpMethod;
use crate::error::StrategyError;
use crate::http::HttpClient;

pub struct JsonStrategy {
    client: HttpClient,
    method: HttpMethod,
    url: String,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
    timeout: Duration,
}

impl JsonStrategy {
    pub fn new(
        client: HttpClient,
        method: HttpMethod,
        url: impl Into<String>,
        body: Option<serde_json::Value>,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            method,
            url: url.into(),
            body,
            headers,
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for JsonStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Json
    }

    async fn fetch(&self, tracking_number: &str) -> Result<RawPayload, StrategyError> {
        let url = render_url(&self.url, tracking_number);
        let resp = match self.method {
            HttpMethod::Get => self.client.get(&url, &self.headers, self.timeout).await?,
            HttpMethod::Post => {
                let body = self
                    .body
                    .as_ref()
                    .map(|b| render_body(b, tracking_number))
                    .unwrap_or(serde_json::Value::Null);
                self.client
                    .post_json(&url, &self.headers, &body, self.timeout)
                    .await?
            }
        };

        if resp.body.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        let value: serde_json::Value = serde_json::from_str(&resp.body)?;
        if value.is_null() {
            return Err(StrategyError::Empty);
        }
        Ok(RawPayload::Json(value))
    }
}
