//! Per-attempt session state for form-postback tracking pages.
//!
//! A [`StrategySession`] lives for exactly one GET + POST pair: it captures
//! the cookies and hidden anti-forgery inputs served with the form page and
//! replays them in the submission. It is never shared or persisted.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE};
use scraper::{Html, Selector};

use crate::http::HttpResponse;

/// Cookies and hidden form values captured from a form page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategySession {
    /// `name=value` pairs in arrival order; a later cookie replaces an earlier
    /// one with the same name.
    cookies: Vec<(String, String)>,
    hidden_fields: BTreeMap<String, String>,
}

impl StrategySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture session state from the form page response.
    ///
    /// Every name in `field_names` gets an entry, empty when the page does not
    /// carry it.
    pub fn capture(page: &HttpResponse, field_names: &[String]) -> Self {
        let mut session = Self::new();
        session.absorb_cookies(page.header_values("set-cookie"));

        let document = Html::parse_document(&page.body);
        for name in field_names {
            let value = hidden_field(&document, name);
            session.hidden_fields.insert(name.clone(), value);
        }
        session
    }

    /// Record `Set-Cookie` header values, keeping only the `name=value` part.
    pub fn absorb_cookies<'a>(&mut self, set_cookie: impl IntoIterator<Item = &'a str>) {
        for raw in set_cookie {
            let pair = raw.split(';').next().unwrap_or("").trim();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            match self.cookies.iter_mut().find(|(n, _)| n == name) {
                Some(existing) => existing.1 = value,
                None => self.cookies.push((name.to_string(), value)),
            }
        }
    }

    /// Captured hidden value, or empty string.
    pub fn hidden(&self, name: &str) -> &str {
        self.hidden_fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn cookie_count(&self) -> usize {
        self.cookies.len()
    }

    /// Cookies serialized for a `Cookie` request header, `None` when empty.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(n, v)| format!("{n}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Assemble the url-encoded form body: static fields, then every
    /// captured hidden field, then the tracking number.
    pub fn form_payload(
        &self,
        extra_fields: &BTreeMap<String, String>,
        number_field: &str,
        tracking_number: &str,
    ) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = extra_fields
            .iter()
            .filter(|(k, _)| !self.hidden_fields.contains_key(*k) && k.as_str() != number_field)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        form.extend(
            self.hidden_fields
                .iter()
                .filter(|(k, _)| k.as_str() != number_field)
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        form.push((number_field.to_string(), tracking_number.to_string()));
        form
    }

    /// Headers for the follow-up POST: `base`, plus the form content type,
    /// the captured cookies, and the verification token when configured and
    /// present on the page.
    pub fn post_headers(&self, base: &HeaderMap, token: Option<(&str, &str)>) -> HeaderMap {
        let mut headers = base.clone();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        if let Some(cookie) = self.cookie_header() {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                headers.insert(COOKIE, value);
            }
        }
        if let Some((header, field)) = token {
            let value = self.hidden(field);
            if !value.is_empty() {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(header.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    headers.insert(name, value);
                }
            }
        }
        headers
    }
}

/// Value of the `<input>` named `name`, or empty string when absent.
pub fn hidden_field(document: &Html, name: &str) -> String {
    let Ok(input_sel) = Selector::parse("input") else {
        return String::new();
    };
    document
        .select(&input_sel)
        .find(|el| el.value().attr("name") == Some(name))
        .and_then(|el| el.value().attr("value"))
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_PAGE: &str = r#"
        <html><body>
            <form method="post" action="trackconsignment.aspx">
                <input type="hidden" name="__VIEWSTATE" value="dDwtMTA4NzA=" />
                <input type="hidden" name="__VIEWSTATEGENERATOR" value="CA0B0334" />
                <input type="hidden" name="__RequestVerificationToken" value="tok-123" />
                <input type="text" name="ctl00$PlaceHolderMain$ucOERControl$txtTrackNum" />
            </form>
        </body></html>
    "#;

    fn page(headers: Vec<(&str, &str)>) -> HttpResponse {
        HttpResponse {
            final_url: "https://post.test/track".into(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: FORM_PAGE.to_string(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_hidden_field_lookup() {
        let doc = Html::parse_document(FORM_PAGE);
        assert_eq!(hidden_field(&doc, "__VIEWSTATE"), "dDwtMTA4NzA=");
        assert_eq!(hidden_field(&doc, "__EVENTVALIDATION"), "");
        // present but without a value attribute
        assert_eq!(
            hidden_field(&doc, "ctl00$PlaceHolderMain$ucOERControl$txtTrackNum"),
            ""
        );
    }

    #[test]
    fn test_capture_fills_missing_fields_with_empty() {
        let session = StrategySession::capture(
            &page(vec![]),
            &names(&["__VIEWSTATE", "__EVENTVALIDATION"]),
        );
        assert_eq!(session.hidden("__VIEWSTATE"), "dDwtMTA4NzA=");
        assert_eq!(session.hidden("__EVENTVALIDATION"), "");
        assert_eq!(session.cookie_header(), None);
    }

    #[test]
    fn test_cookies_keep_name_value_and_replace_duplicates() {
        let session = StrategySession::capture(
            &page(vec![
                ("set-cookie", "ASP.NET_SessionId=abc; path=/; HttpOnly"),
                ("set-cookie", "lb=node1"),
                ("Set-Cookie", "ASP.NET_SessionId=def; path=/"),
                ("set-cookie", "garbage-without-equals"),
            ]),
            &[],
        );
        assert_eq!(session.cookie_count(), 2);
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("ASP.NET_SessionId=def; lb=node1")
        );
    }

    #[test]
    fn test_form_payload_contents() {
        let session = StrategySession::capture(
            &page(vec![]),
            &names(&["__VIEWSTATE", "__VIEWSTATEGENERATOR"]),
        );
        let mut extra = BTreeMap::new();
        extra.insert("__EVENTTARGET".to_string(), String::new());
        extra.insert("btnSearch".to_string(), "Track Now".to_string());

        let form = session.form_payload(&extra, "txtTrackNum", "EE123456789IN");
        assert_eq!(
            form,
            vec![
                ("__EVENTTARGET".to_string(), String::new()),
                ("btnSearch".to_string(), "Track Now".to_string()),
                ("__VIEWSTATE".to_string(), "dDwtMTA4NzA=".to_string()),
                ("__VIEWSTATEGENERATOR".to_string(), "CA0B0334".to_string()),
                ("txtTrackNum".to_string(), "EE123456789IN".to_string()),
            ]
        );
    }

    #[test]
    fn test_post_headers_merge_cookie_and_token() {
        let session = StrategySession::capture(
            &page(vec![("set-cookie", "sid=42; path=/")]),
            &names(&["__RequestVerificationToken"]),
        );
        let mut base = HeaderMap::new();
        base.insert("referer", HeaderValue::from_static("https://post.test/"));

        let headers = session.post_headers(
            &base,
            Some(("RequestVerificationToken", "__RequestVerificationToken")),
        );
        assert_eq!(headers["referer"], "https://post.test/");
        assert_eq!(headers[COOKIE], "sid=42");
        assert_eq!(headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(headers["requestverificationtoken"], "tok-123");
    }

    #[test]
    fn test_post_headers_skip_absent_token() {
        let session = StrategySession::new();
        let headers = session.post_headers(&HeaderMap::new(), Some(("X-CSRF", "_csrf")));
        assert!(headers.get("x-csrf").is_none());
        assert!(headers.get(COOKIE).is_none());
    }
}
