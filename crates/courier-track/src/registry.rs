//! Courier registry: courier id → ordered (strategy, normalizer) chain.
//!
//! Built once at startup and read-only afterwards; share it behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scraper::Selector;

use crate::config::{CourierConfig, CourierSpec, Defaults, StrategySpec};
use crate::error::ConfigError;
use crate::http::HttpClient;
use crate::normalize::Normalize;
use crate::strategy::postback::FormContract;
use crate::strategy::{
    build_headers, HtmlStrategy, JsonStrategy, PostbackStrategy, Strategy,
};

/// One link of a retrieval chain.
#[derive(Clone)]
pub struct Step {
    pub strategy: Arc<dyn Strategy>,
    pub normalizer: Arc<dyn Normalize>,
}

impl Step {
    pub fn new(strategy: Arc<dyn Strategy>, normalizer: Arc<dyn Normalize>) -> Self {
        Self {
            strategy,
            normalizer,
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.strategy.kind())
            .finish()
    }
}

/// A courier and its retrieval chain, in priority order.
#[derive(Debug, Clone)]
pub struct CourierEntry {
    pub id: String,
    pub name: String,
    pub unavailable_message: String,
    pub steps: Vec<Step>,
}

impl CourierEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            unavailable_message: format!("{name} tracking failed. Try again."),
            name,
            steps: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.unavailable_message = message.into();
        self
    }

    pub fn with_step(mut self, strategy: Arc<dyn Strategy>, normalizer: Arc<dyn Normalize>) -> Self {
        self.steps.push(Step::new(strategy, normalizer));
        self
    }
}

/// Read-only lookup table of couriers.
#[derive(Debug, Clone)]
pub struct Registry {
    couriers: Vec<Arc<CourierEntry>>,
    index: HashMap<String, usize>,
    deadline: Duration,
}

impl Registry {
    /// Empty registry with the given aggregate resolution deadline.
    pub fn new(deadline: Duration) -> Self {
        Self {
            couriers: Vec::new(),
            index: HashMap::new(),
            deadline,
        }
    }

    /// Registry for the embedded courier table.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_config(&CourierConfig::builtin()?, HttpClient::new())
    }

    /// Build every courier's chain from configuration, validating headers and
    /// selectors up front so nothing fails at request time. Every chain must
    /// fit inside the aggregate deadline, so a late strategy is never cut off
    /// before its own timeout.
    pub fn from_config(config: &CourierConfig, client: HttpClient) -> Result<Self, ConfigError> {
        let deadline = config.defaults.deadline();
        let mut registry = Self::new(deadline);
        for spec in &config.couriers {
            let chain = spec.chain_budget(&config.defaults);
            if chain > deadline {
                return Err(ConfigError::DeadlineTooShort {
                    courier: spec.id.clone(),
                    chain_secs: chain.as_secs(),
                    deadline_secs: deadline.as_secs(),
                });
            }
            let entry = build_entry(spec, &config.defaults, &client)?;
            registry.register(entry)?;
        }
        Ok(registry)
    }

    /// Add a courier. Ids are unique case-insensitively and chains must be
    /// non-empty.
    pub fn register(&mut self, entry: CourierEntry) -> Result<(), ConfigError> {
        let key = entry.id.trim().to_lowercase();
        if self.index.contains_key(&key) {
            return Err(ConfigError::DuplicateCourier(entry.id));
        }
        if entry.steps.is_empty() {
            return Err(ConfigError::EmptyChain(entry.id));
        }
        self.index.insert(key, self.couriers.len());
        self.couriers.push(Arc::new(entry));
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, courier_id: &str) -> Option<Arc<CourierEntry>> {
        self.index
            .get(&courier_id.trim().to_lowercase())
            .map(|&i| Arc::clone(&self.couriers[i]))
    }

    /// Couriers in registration order.
    pub fn couriers(&self) -> impl Iterator<Item = &CourierEntry> {
        self.couriers.iter().map(|c| c.as_ref())
    }

    pub fn ids(&self) -> Vec<String> {
        self.couriers.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

fn build_entry(
    spec: &CourierSpec,
    defaults: &Defaults,
    client: &HttpClient,
) -> Result<CourierEntry, ConfigError> {
    let mut entry =
        CourierEntry::new(spec.id.trim(), spec.name.clone()).with_message(spec.unavailable_message());

    for strategy_spec in &spec.strategies {
        let headers =
            build_headers(defaults, strategy_spec.headers()).map_err(|name| {
                ConfigError::InvalidHeader {
                    courier: spec.id.clone(),
                    name,
                }
            })?;

        let normalizer = strategy_spec.normalizer().clone();
        if let Some(selectors) = normalizer.selectors() {
            if Selector::parse(selectors).is_err() {
                return Err(ConfigError::InvalidSelector {
                    courier: spec.id.clone(),
                    selector: selectors.to_string(),
                });
            }
        }

        let strategy: Arc<dyn Strategy> = match strategy_spec {
            StrategySpec::Json(s) => Arc::new(JsonStrategy::new(
                client.clone(),
                s.method,
                s.url.clone(),
                s.body.clone(),
                headers,
                s.timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| defaults.timeout()),
            )),
            StrategySpec::Html(s) => Arc::new(HtmlStrategy::new(
                client.clone(),
                s.url.clone(),
                headers,
                s.timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| defaults.timeout()),
            )),
            StrategySpec::Postback(s) => {
                let mut hidden_fields = s.hidden_fields.clone();
                let token = match (&s.token_header, &s.token_field) {
                    (Some(header), Some(field)) => {
                        if !hidden_fields.contains(field) {
                            hidden_fields.push(field.clone());
                        }
                        Some((header.clone(), field.clone()))
                    }
                    _ => None,
                };
                Arc::new(PostbackStrategy::new(
                    client.clone(),
                    s.url.clone(),
                    headers,
                    Duration::from_secs(s.get_timeout_secs),
                    Duration::from_secs(s.post_timeout_secs),
                    FormContract {
                        hidden_fields,
                        number_field: s.number_field.clone(),
                        extra_fields: s.extra_fields.clone(),
                        token,
                    },
                ))
            }
        };

        entry = entry.with_step(strategy, Arc::new(normalizer));
    }

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;
    use crate::normalize::Normalized;
    use crate::strategy::{RawPayload, StrategyKind};
    use async_trait::async_trait;

    struct Never;

    #[async_trait]
    impl Strategy for Never {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Json
        }

        async fn fetch(&self, _: &str) -> Result<RawPayload, StrategyError> {
            Err(StrategyError::Empty)
        }
    }

    fn entry(id: &str) -> CourierEntry {
        CourierEntry::new(id, id.to_uppercase())
            .with_step(Arc::new(Never), Arc::new(|_: &RawPayload| Normalized::default()))
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.ids()[0], "indiapost");
        assert_eq!(registry.deadline(), Duration::from_secs(65));

        let ip = registry.lookup("INDIAPOST").unwrap();
        assert_eq!(ip.name, "India Post");
        let kinds: Vec<_> = ip.steps.iter().map(|s| s.strategy.kind()).collect();
        assert_eq!(
            kinds,
            vec![StrategyKind::Json, StrategyKind::Json, StrategyKind::Postback]
        );

        let amazon = registry.lookup(" amazon ").unwrap();
        assert_eq!(amazon.steps.len(), 1);
        assert_eq!(amazon.unavailable_message, "Amazon tracking failed.");
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = Registry::builtin().unwrap();
        assert!(registry.lookup("notarealcourier").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut registry = Registry::new(Duration::from_secs(1));
        registry.register(entry("acme")).unwrap();
        assert!(matches!(
            registry.register(entry("ACME")),
            Err(ConfigError::DuplicateCourier(_))
        ));
    }

    #[test]
    fn test_empty_chain_rejected() {
        let mut registry = Registry::new(Duration::from_secs(1));
        assert!(matches!(
            registry.register(CourierEntry::new("acme", "Acme")),
            Err(ConfigError::EmptyChain(_))
        ));
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let doc = r#"
            [[courier]]
            id = "acme"
            name = "Acme"

            [[courier.strategy]]
            kind = "html"
            url = "https://acme.test/{number}"
            normalizer = { type = "list_items", selectors = "li[" }
        "#;
        let config = CourierConfig::from_toml_str(doc).unwrap();
        assert!(matches!(
            Registry::from_config(&config, HttpClient::new()),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let doc = r#"
            [[courier]]
            id = "acme"
            name = "Acme"

            [[courier.strategy]]
            kind = "html"
            url = "https://acme.test/{number}"
            headers = { "Bad Header" = "x" }
            normalizer = { type = "table_rows" }
        "#;
        let config = CourierConfig::from_toml_str(doc).unwrap();
        assert!(matches!(
            Registry::from_config(&config, HttpClient::new()),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_builtin_chains_fit_deadline() {
        let config = CourierConfig::builtin().unwrap();
        for spec in &config.couriers {
            let chain = spec.chain_budget(&config.defaults);
            assert!(
                chain <= config.defaults.deadline(),
                "{} needs {chain:?}, deadline {:?}",
                spec.id,
                config.defaults.deadline()
            );
        }
        let indiapost = config.courier("indiapost").unwrap();
        assert_eq!(
            indiapost.chain_budget(&config.defaults),
            Duration::from_secs(65)
        );
    }

    #[test]
    fn test_deadline_shorter_than_chain_rejected() {
        let doc = r#"
            [defaults]
            deadline_secs = 3

            [[courier]]
            id = "p"
            name = "Postback Co"

            [[courier.strategy]]
            kind = "html"
            url = "https://p.test/{number}"
            timeout_secs = 1
            normalizer = { type = "table_rows" }

            [[courier.strategy]]
            kind = "postback"
            url = "https://p.test/track.aspx"
            get_timeout_secs = 2
            post_timeout_secs = 2
            number_field = "txtTrackNum"
            normalizer = { type = "table_rows" }
        "#;
        let config = CourierConfig::from_toml_str(doc).unwrap();
        match Registry::from_config(&config, HttpClient::new()) {
            Err(ConfigError::DeadlineTooShort {
                courier,
                chain_secs,
                deadline_secs,
            }) => {
                assert_eq!(courier, "p");
                assert_eq!(chain_secs, 5);
                assert_eq!(deadline_secs, 3);
            }
            other => panic!("expected DeadlineTooShort, got {other:?}"),
        }
    }
}
