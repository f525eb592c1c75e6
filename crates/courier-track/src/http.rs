//! Async HTTP client wrapping reqwest.
//!
//! One shared connection pool for every strategy. No cookie jar: session
//! state is carried explicitly by the postback strategy so nothing leaks
//! between requests. No retries either; the strategy chain is the only
//! resilience mechanism.

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::StrategyError;

/// Response from an upstream call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub final_url: String,
    /// All response headers, repeated names kept (needed for `set-cookie`).
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// All values of a header, case-insensitive.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP client shared by all retrieval strategies.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Create a client that follows up to five redirects. Timeouts are set
    /// per request by the calling strategy.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    pub async fn get(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<HttpResponse, StrategyError> {
        let builder = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(timeout);
        Self::send(builder).await
    }

    /// POST a JSON body.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, StrategyError> {
        let builder = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .timeout(timeout);
        Self::send(builder).await
    }

    /// POST form data (url-encoded).
    pub async fn post_form(
        &self,
        url: &str,
        headers: &HeaderMap,
        form_fields: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, StrategyError> {
        let builder = self
            .client
            .post(url)
            .headers(headers.clone())
            .form(form_fields)
            .timeout(timeout);
        Self::send(builder).await
    }

    async fn send(builder: reqwest::RequestBuilder) -> Result<HttpResponse, StrategyError> {
        let r = builder.send().await?;
        let status = r.status();
        if !status.is_success() {
            return Err(StrategyError::Status(status.as_u16()));
        }
        let final_url = r.url().to_string();

        let headers: Vec<(String, String)> = r
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let body = r.text().await?;

        Ok(HttpResponse {
            final_url,
            headers,
            body,
        })
    }
}
