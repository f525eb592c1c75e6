//! Two-step form postback: load the tracking page, then submit its form with
//! the session cookies and hidden anti-forgery fields it handed out.
//!
//! Each step has its own timeout. A failure at either step fails the whole
//! attempt; neither step is retried.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use super::{render_url, RawPayload, Strategy, StrategyKind};
use crate::error::StrategyError;
use crate::http::HttpClient;
use crate::session::StrategySession;

/// Fixed names of the upstream form. Values are discovered on every call.
#[derive(Debug, Clone, Default)]
pub struct FormContract {
    pub hidden_fields: Vec<String>,
    pub number_field: String,
    pub extra_fields: BTreeMap<String, String>,
    /// `(header, hidden field)` carrying a request-verification token.
    pub token: Option<(String, String)>,
}

pub struct PostbackStrategy {
    client: HttpClient,
    url: String,
    headers: HeaderMap,
    get_timeout: Duration,
    post_timeout: Duration,
    form: FormContract,
}

impl PostbackStrategy {
    pub fn new(
        client: HttpClient,
        url: impl Into<String>,
        headers: HeaderMap,
        get_timeout: Duration,
        post_timeout: Duration,
        form: FormContract,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            headers,
            get_timeout,
            post_timeout,
            form,
        }
    }
}

#[async_trait]
impl Strategy for PostbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Postback
    }

    async fn fetch(&self, tracking_number: &str) -> Result<RawPayload, StrategyError> {
        let url = render_url(&self.url, tracking_number);

        let page = self.client.get(&url, &self.headers, self.get_timeout).await?;
        let session = StrategySession::capture(&page, &self.form.hidden_fields);
        tracing::debug!(
            final_url = %page.final_url,
            cookies = session.cookie_count(),
            hidden_fields = self.form.hidden_fields.len(),
            "Postback: captured form session"
        );

        let form = session.form_payload(
            &self.form.extra_fields,
            &self.form.number_field,
            tracking_number,
        );
        let token = self
            .form
            .token
            .as_ref()
            .map(|(header, field)| (header.as_str(), field.as_str()));
        let headers = session.post_headers(&self.headers, token);

        let resp = self
            .client
            .post_form(&url, &headers, &form, self.post_timeout)
            .await?;
        if resp.body.trim().is_empty() {
            return Err(StrategyError::Empty);
        }
        Ok(RawPayload::Html(resp.body))
    }
}
