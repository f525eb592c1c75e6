//! Courier configuration: every outbound contract (URLs, headers, form field
//! names, timeouts) as data.
//!
//! Upstream tracking endpoints change without notice, so nothing here is
//! hard-wired into the strategies. A default document is embedded at compile
//! time and can be replaced wholesale by a TOML file.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::normalize::Normalizer;

/// Raw TOML of the built-in courier table, embedded at compile time.
const BUILTIN_COURIERS_TOML: &str = include_str!("couriers.toml");

/// Placeholder substituted with the tracking number in URL and body templates.
pub const NUMBER_PLACEHOLDER: &str = "{number}";

/// Root of a courier configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(rename = "courier", default)]
    pub couriers: Vec<CourierSpec>,
}

/// Header baseline and time limits applied to every strategy unless
/// overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Per-call timeout for single-request strategies.
    pub timeout_secs: u64,
    /// Upper bound on a whole resolution, across all strategies.
    pub deadline_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .to_string(),
            accept_language: "en-IN,en;q=0.9".to_string(),
            timeout_secs: 15,
            deadline_secs: 65,
        }
    }
}

impl Defaults {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// One courier and its ordered retrieval chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierSpec {
    /// Lookup key, matched case-insensitively.
    pub id: String,
    /// Display name reported in results.
    pub name: String,
    /// Message returned when every strategy comes back empty.
    #[serde(default)]
    pub unavailable_message: Option<String>,
    #[serde(rename = "strategy", default)]
    pub strategies: Vec<StrategySpec>,
}

impl CourierSpec {
    /// Sum of every strategy's time budget: the worst case for one walk of
    /// the chain.
    pub fn chain_budget(&self, defaults: &Defaults) -> Duration {
        self.strategies.iter().map(|s| s.time_budget(defaults)).sum()
    }

    pub fn unavailable_message(&self) -> String {
        self.unavailable_message
            .clone()
            .unwrap_or_else(|| format!("{} tracking failed. Try again.", self.name))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// How to obtain a raw payload. Tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    Json(JsonSpec),
    Html(HtmlSpec),
    Postback(PostbackSpec),
}

impl StrategySpec {
    pub fn normalizer(&self) -> &Normalizer {
        match self {
            StrategySpec::Json(s) => &s.normalizer,
            StrategySpec::Html(s) => &s.normalizer,
            StrategySpec::Postback(s) => &s.normalizer,
        }
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        match self {
            StrategySpec::Json(s) => &s.headers,
            StrategySpec::Html(s) => &s.headers,
            StrategySpec::Postback(s) => &s.headers,
        }
    }

    /// Longest this strategy can take before its own timeouts fire.
    pub fn time_budget(&self, defaults: &Defaults) -> Duration {
        let single = |t: Option<u64>| t.map(Duration::from_secs).unwrap_or_else(|| defaults.timeout());
        match self {
            StrategySpec::Json(s) => single(s.timeout_secs),
            StrategySpec::Html(s) => single(s.timeout_secs),
            StrategySpec::Postback(s) => {
                Duration::from_secs(s.get_timeout_secs + s.post_timeout_secs)
            }
        }
    }
}

/// A single call to a JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSpec {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    /// JSON body template for POST; string leaves equal to `{number}` are
    /// replaced with the tracking number.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub normalizer: Normalizer,
}

/// A single GET of a public tracking page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlSpec {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub normalizer: Normalizer,
}

/// Load a form page, then submit it with the captured session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostbackSpec {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_get_timeout")]
    pub get_timeout_secs: u64,
    #[serde(default = "default_post_timeout")]
    pub post_timeout_secs: u64,
    /// Names of hidden inputs whose values are echoed back in the POST.
    #[serde(default)]
    pub hidden_fields: Vec<String>,
    /// Form field carrying the tracking number.
    pub number_field: String,
    /// Static form values (event target, submit button, ...).
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
    /// Hidden input holding a request-verification token...
    #[serde(default)]
    pub token_field: Option<String>,
    /// ...and the header it is sent back in.
    #[serde(default)]
    pub token_header: Option<String>,
    pub normalizer: Normalizer,
}

fn default_get_timeout() -> u64 {
    15
}

fn default_post_timeout() -> u64 {
    20
}

impl CourierConfig {
    /// The embedded default courier table.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_COURIERS_TOML)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a courier table from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn courier(&self, id: &str) -> Option<&CourierSpec> {
        self.couriers
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses() {
        let config = CourierConfig::builtin().unwrap();
        let ids: Vec<_> = config.couriers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "indiapost",
                "bluedart",
                "delhivery",
                "dtdc",
                "ekart",
                "xpressbees",
                "shadowfax",
                "ecom",
                "amazon"
            ]
        );
        assert!(config.couriers.iter().all(|c| !c.strategies.is_empty()));
        assert_eq!(config.defaults.timeout_secs, 15);
    }

    #[test]
    fn test_india_post_chain_order() {
        let config = CourierConfig::builtin().unwrap();
        let ip = config.courier("IndiaPost").unwrap();
        assert_eq!(ip.name, "India Post");
        assert_eq!(ip.strategies.len(), 3);
        assert!(matches!(
            &ip.strategies[0],
            StrategySpec::Json(JsonSpec { method: HttpMethod::Post, .. })
        ));
        assert!(matches!(
            &ip.strategies[1],
            StrategySpec::Json(JsonSpec { method: HttpMethod::Get, .. })
        ));
        match &ip.strategies[2] {
            StrategySpec::Postback(p) => {
                assert_eq!(p.get_timeout_secs, 15);
                assert_eq!(p.post_timeout_secs, 20);
                assert!(p.hidden_fields.iter().any(|f| f == "__VIEWSTATE"));
                assert_eq!(p.number_field, "ctl00$PlaceHolderMain$ucOERControl$txtTrackNum");
            }
            other => panic!("expected postback, got {other:?}"),
        }
    }

    #[test]
    fn test_minimal_document() {
        let doc = r#"
            [[courier]]
            id = "acme"
            name = "Acme"

            [[courier.strategy]]
            kind = "html"
            url = "https://acme.test/track/{number}"
            normalizer = { type = "table_rows" }
        "#;
        let config = CourierConfig::from_toml_str(doc).unwrap();
        assert_eq!(config.defaults.timeout_secs, 15);
        let acme = config.courier("ACME").unwrap();
        assert_eq!(acme.unavailable_message(), "Acme tracking failed. Try again.");
        assert!(matches!(acme.strategies[0], StrategySpec::Html(_)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let doc = r#"
            [[courier]]
            id = "acme"
            name = "Acme"

            [[courier.strategy]]
            kind = "carrier_pigeon"
            url = "https://acme.test"
            normalizer = { type = "table_rows" }
        "#;
        assert!(matches!(
            CourierConfig::from_toml_str(doc),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("couriers.toml");
        std::fs::write(
            &path,
            "[defaults]\ndeadline_secs = 5\n\n[[courier]]\nid = \"x\"\nname = \"X\"\n",
        )
        .unwrap();
        let config = CourierConfig::load(&path).unwrap();
        assert_eq!(config.defaults.deadline(), Duration::from_secs(5));
        assert_eq!(config.couriers.len(), 1);
    }
}
