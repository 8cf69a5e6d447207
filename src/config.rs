use std::fmt;

use reqwest::Url;
use serde::Deserialize;

use crate::{Result, ServiceError};

/// Remote endpoint settings supplied by the host application.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// When `false`, every send fails with [`ServiceError::Disabled`] without I/O.
    pub enabled: bool,
    /// Absolute base URL that request paths are resolved against. Only
    /// required when `enabled` is set.
    pub base_url: String,
    /// API key sent as a bearer token. Empty means no `Authorization` header.
    pub api_key: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("enabled", &self.enabled)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ClientConfig {
    pub fn new(enabled: bool, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            enabled,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Reads the configuration from environment variables.
    ///
    /// Reads:
    /// - `SERVICE_ENABLED` — `true`/`1`/`yes`/`on` (case-insensitive); absent means disabled
    /// - `SERVICE_URL` — base URL of the remote API, required when enabled
    /// - `SERVICE_KEY` — API key (optional)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup("SERVICE_ENABLED") {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                ServiceError::Config(format!("SERVICE_ENABLED has invalid value '{value}'"))
            })?,
            None => false,
        };
        let base_url = lookup("SERVICE_URL").unwrap_or_default();
        if enabled && base_url.trim().is_empty() {
            return Err(ServiceError::Config(
                "missing SERVICE_URL environment variable".to_owned(),
            ));
        }
        let api_key = lookup("SERVICE_KEY").unwrap_or_default();
        Ok(Self::new(enabled, base_url.trim(), api_key.trim()))
    }

    /// Parses `base_url`, requiring an absolute `http` or `https` URL.
    pub(crate) fn parsed_base_url(&self) -> Result<Url> {
        let url = Url::parse(self.base_url.trim()).map_err(|err| {
            ServiceError::Config(format!("invalid base_url '{}': {err}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ServiceError::Config(format!(
                "unsupported base_url scheme '{other}'"
            ))),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::ClientConfig;
    use crate::ServiceError;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SERVICE_ENABLED", "TRUE"),
            ("SERVICE_URL", " https://api.example.com/v1 "),
            ("SERVICE_KEY", "k-123"),
        ]))
        .expect("config must parse");
        assert!(config.enabled);
        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.api_key, "k-123");
    }

    #[test]
    fn missing_enabled_flag_means_disabled() {
        let config = ClientConfig::from_lookup(lookup(&[("SERVICE_URL", "http://localhost")]))
            .expect("config must parse");
        assert!(!config.enabled);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn rejects_missing_url_and_bad_flag() {
        let err = ClientConfig::from_lookup(lookup(&[("SERVICE_ENABLED", "1")]))
            .expect_err("url is required");
        assert!(matches!(err, ServiceError::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[
            ("SERVICE_ENABLED", "maybe"),
            ("SERVICE_URL", "http://localhost"),
        ]))
        .expect_err("flag must be boolean");
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn disabled_config_needs_no_url() {
        let config = ClientConfig::from_lookup(lookup(&[("SERVICE_ENABLED", "false")]))
            .expect("disabled config must parse without a url");
        assert!(!config.enabled);
        assert!(config.base_url.is_empty());

        let config = ClientConfig::from_lookup(lookup(&[])).expect("empty env must parse");
        assert!(!config.enabled);
    }

    #[test]
    fn base_url_must_be_http() {
        let config = ClientConfig::new(true, "ftp://files.example.com", "");
        assert!(config.parsed_base_url().is_err());
        let config = ClientConfig::new(true, "not a url", "");
        assert!(config.parsed_base_url().is_err());
        let config = ClientConfig::new(true, "https://api.example.com", "");
        assert!(config.parsed_base_url().is_ok());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ClientConfig::new(true, "https://api.example.com", "secret-key");
        let debug = format!("{config:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://api.example.com"}"#)
                .expect("config must parse");
        assert!(!config.enabled);
        assert!(config.api_key.is_empty());
    }
}
