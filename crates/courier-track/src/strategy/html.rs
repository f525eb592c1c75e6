//! Plain GET of a public tracking page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::{render_url, RawPayload, Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::http::HttpClient;

pub struct HtmlStrategy {
    client: HttpClient,
    url: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl HtmlStrategy {
    pub fn new(client: HttpClient, url: impl Into<String>, headers: HeaderMap, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            headers,
            timeout,
        }
    }
}

#[async_trait]
impl Strategy for HtmlStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Html
    }

    async fn fetch(&self, tracking_number: &str) -> Result<RawPayload, StrategyError> {
        let url = render_url(&self.url, tracking_number);
        let resp = self.client.get(&url, &self.headers, self.timeout).await?;
        if resp.body.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        Ok(RawPayload::Html(resp.body))
    }
}
