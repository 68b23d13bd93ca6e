//! Configuration of a client and logger, either deserialized from the application's own
//! configuration or read from the environment.
use crate::logger::LokiLoggerBuilder;
use crate::payload::tenant_header;
#[cfg(feature = "ureq")]
use crate::NetworkingBackend;
use crate::{Credentials, LabelSet, LokiClient, LokiLogger, PushError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Everything which is needed to push logs to a Loki instance.
///
/// All fields are optional when deserializing, missing ones take their default value.
///
/// # Example
/// ```
/// use loki_push::LokiConfig;
///
/// let config: LokiConfig = serde_json::from_str(r#"{
///     "url": "http://loki:3100",
///     "tenant": "tenant1",
///     "labels": {"application": "billing", "environment": "dev"}
/// }"#).unwrap();
///
/// assert_eq!(config.tenant(), Some("tenant1"));
/// assert!(config.credentials().is_none());
/// ```
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LokiConfig {
    /// The root of the Loki instance or the full push URL
    pub url: String,
    /// The tenant for multi-tenant setups
    pub tenant: Option<String>,
    pub user: Option<String>,
    /// The password (an API key for Grafana Cloud)
    pub password: Option<String>,
    /// Labels which are attached to every stream
    pub labels: BTreeMap<String, String>,
    /// Attach a `level` label with the level of each record
    pub include_level: bool,
    /// The timeout for a single push in seconds
    pub timeout_secs: u64,
}

impl Default for LokiConfig {
    fn default() -> Self {
        LokiConfig {
            url: "http://localhost:3100".to_string(),
            tenant: None,
            user: None,
            password: None,
            labels: BTreeMap::new(),
            include_level: true,
            timeout_secs: crate::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl std::fmt::Debug for LokiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LokiConfig")
            .field("url", &self.url)
            .field("tenant", &self.tenant)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("labels", &self.labels)
            .field("include_level", &self.include_level)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LokiConfig {
    /// Read the configuration from the environment.
    ///
    /// | Variable            | Meaning                                        |
    /// |---------------------|------------------------------------------------|
    /// | `LOKI_URL`          | root of the Loki instance or full push URL     |
    /// | `LOKI_TENANT`       | tenant for multi-tenant setups                 |
    /// | `LOKI_USER`         | login for basic authentication (`LOKI_USERNAME` works too) |
    /// | `LOKI_PASSWORD`     | password for basic authentication              |
    /// | `LOKI_LABELS`       | comma separated `name=value` pairs             |
    /// | `LOKI_TIMEOUT_SECS` | timeout for a single push                      |
    pub fn from_env() -> Result<LokiConfig, PushError> {
        LokiConfig::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any source of environment-like variables.
    pub fn from_lookup<F>(lookup: F) -> Result<LokiConfig, PushError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LokiConfig::default();

        if let Some(url) = lookup("LOKI_URL") {
            config.url = url;
        }
        config.tenant = lookup("LOKI_TENANT");
        config.user = lookup("LOKI_USER").or_else(|| lookup("LOKI_USERNAME"));
        config.password = lookup("LOKI_PASSWORD");

        if let Some(labels) = lookup("LOKI_LABELS") {
            config.labels = parse_labels(&labels)?;
        }
        if let Some(timeout) = lookup("LOKI_TIMEOUT_SECS") {
            config.timeout_secs = timeout
                .trim()
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    PushError::Configuration(format!("`{}` is not a valid timeout", timeout))
                })?;
        }

        Ok(config)
    }

    /// The tenant, if one is configured and not blank
    pub fn tenant(&self) -> Option<&str> {
        tenant_header(self.tenant.as_deref())
    }

    /// The credentials, if both login and password are configured and not blank
    pub fn credentials(&self) -> Option<Credentials> {
        let credentials = Credentials::new(self.user.as_deref()?, self.password.as_deref()?);
        credentials.authorization_header().map(|_| credentials)
    }

    pub fn label_set(&self) -> LabelSet {
        self.labels.iter().map(|(name, value)| (name.as_str(), value.as_str())).collect()
    }

    /// Build a [`LokiClient`] for the configured endpoint.
    ///
    /// Fails with [`PushError::Configuration`] if the endpoint is invalid or the timeout is zero.
    pub fn client(&self) -> Result<LokiClient, PushError> {
        if self.timeout_secs == 0 {
            return Err(PushError::Configuration(
                "the timeout must be at least one second".to_string(),
            ));
        }
        let builder = LokiClient::builder()
            .endpoint(&self.url)
            .timeout(Duration::from_secs(self.timeout_secs));
        #[cfg(feature = "ureq")]
        let builder = builder.network(NetworkingBackend::Ureq);

        builder.build()
    }

    /// Create a [`LokiLoggerBuilder`] with the configured labels, tenant and credentials.
    pub fn logger(&self, client: Arc<LokiClient>) -> LokiLoggerBuilder {
        let mut builder = LokiLogger::builder(client).labels(self.label_set());
        if let Some(tenant) = self.tenant() {
            builder = builder.tenant(tenant);
        }
        if let Some(credentials) = self.credentials() {
            builder = builder.credentials(credentials);
        }
        if self.include_level {
            builder = builder.include_level();
        }
        builder
    }
}

fn parse_labels(raw: &str) -> Result<BTreeMap<String, String>, PushError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(PushError::Configuration(format!(
                "`{}` is not a valid label, expected `name=value`",
                pair
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::testing::SpyBackend;
    use crate::{LokiClient, LokiConfig, PushError};
    use log::{Level, Log, Record};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn reading_an_empty_environment_uses_the_defaults() {
        let config = LokiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LokiConfig::default());
        assert_eq!(config.url, "http://localhost:3100");
        assert_eq!(config.tenant(), None);
        assert!(config.credentials().is_none());
    }

    #[test]
    fn reading_the_environment_works() {
        let config = LokiConfig::from_lookup(lookup(&[
            ("LOKI_URL", "https://logs.example.com/loki/api/v1/push"),
            ("LOKI_TENANT", "tenant1"),
            ("LOKI_USERNAME", "username"),
            ("LOKI_PASSWORD", "password"),
            ("LOKI_LABELS", "application=billing, environment = dev,"),
            ("LOKI_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.url, "https://logs.example.com/loki/api/v1/push");
        assert_eq!(config.tenant(), Some("tenant1"));
        assert_eq!(
            config.credentials().unwrap().authorization_header(),
            Some("Basic dXNlcm5hbWU6cGFzc3dvcmQ=".to_string())
        );
        assert_eq!(config.label_set().get("environment"), Some("dev"));
        assert_eq!(config.label_set().len(), 2);
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn reading_malformed_variables_fails() {
        let labels = LokiConfig::from_lookup(lookup(&[("LOKI_LABELS", "application")]));
        assert!(matches!(labels, Err(PushError::Configuration(_))));

        let labels = LokiConfig::from_lookup(lookup(&[("LOKI_LABELS", "=billing")]));
        assert!(matches!(labels, Err(PushError::Configuration(_))));

        let timeout = LokiConfig::from_lookup(lookup(&[("LOKI_TIMEOUT_SECS", "soon")]));
        assert!(matches!(timeout, Err(PushError::Configuration(_))));

        let timeout = LokiConfig::from_lookup(lookup(&[("LOKI_TIMEOUT_SECS", "0")]));
        assert!(matches!(timeout, Err(PushError::Configuration(_))));
    }

    #[test]
    fn zero_timeouts_are_rejected_when_building_the_client() {
        let config = LokiConfig {
            timeout_secs: 0,
            ..LokiConfig::default()
        };
        assert!(matches!(config.client(), Err(PushError::Configuration(_))));
    }

    #[test]
    fn blank_tenants_and_one_sided_credentials_are_ignored() {
        let config = LokiConfig {
            tenant: Some("  ".to_string()),
            user: Some("username".to_string()),
            password: Some(" ".to_string()),
            ..LokiConfig::default()
        };
        assert_eq!(config.tenant(), None);
        assert!(config.credentials().is_none());

        let config = LokiConfig {
            user: Some("username".to_string()),
            ..LokiConfig::default()
        };
        assert!(config.credentials().is_none());
    }

    #[test]
    fn deserializing_a_partial_configuration_keeps_the_defaults() {
        let config: LokiConfig = serde_json::from_str(r#"{"url": "http://loki:3100"}"#).unwrap();
        assert_eq!(config.url, "http://loki:3100");
        assert!(config.include_level);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn the_password_is_not_part_of_the_debug_output() {
        let config = LokiConfig {
            password: Some("hunter2".to_string()),
            ..LokiConfig::default()
        };
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn configured_loggers_push_with_tenant_labels_and_credentials() {
        let spy = SpyBackend::responding(204);
        let client = LokiClient::builder().backend(spy.clone()).build().unwrap();
        let config = LokiConfig {
            tenant: Some("tenant1".to_string()),
            user: Some("username".to_string()),
            password: Some("password".to_string()),
            labels: [("application".to_string(), "billing".to_string())].into(),
            ..LokiConfig::default()
        };

        let logger = config.logger(Arc::new(client)).build();
        logger.log(
            &Record::builder()
                .args(format_args!("invoice sent"))
                .level(Level::Info)
                .target("billing")
                .build(),
        );

        let push = spy.last_call().unwrap();
        assert_eq!(push.header("X-Scope-OrgID"), Some("tenant1"));
        assert!(push.header("Authorization").is_some());
        let body: serde_json::Value = serde_json::from_slice(&push.body).unwrap();
        assert_eq!(body["streams"][0]["stream"]["application"], "billing");
        assert_eq!(body["streams"][0]["stream"]["level"], "info");
    }

    #[cfg(feature = "ureq")]
    #[test]
    fn configured_clients_use_the_normalized_endpoint() {
        let config = LokiConfig {
            url: "http://loki:3100/".to_string(),
            ..LokiConfig::default()
        };
        assert_eq!(
            config.client().unwrap().endpoint().as_str(),
            "http://loki:3100/loki/api/v1/push"
        );
    }
}
