//! Client configuration.
//!
//! # Design
//! `ClientOptions` is created once per client and shared behind an `Arc` by
//! every call. Only the auth token slot changes after construction: login
//! and logout responses write it, every request reads it. The lock makes
//! each read or write atomic but does not order concurrent logins and
//! logouts against each other; callers that need that must serialize those
//! calls themselves.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ApiError;

pub const DEFAULT_HOST: &str = "api.contentstack.io";
pub const DEFAULT_VERSION: &str = "v3";

/// Outbound proxy used by both transports.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProxyOptions {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyOptions {
    pub fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("http://{user}:{pass}@{}:{}", self.host, self.port),
            (Some(user), None) => format!("http://{user}@{}:{}", self.host, self.port),
            _ => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub version: String,
    #[serde(rename = "authtoken")]
    auth_token: RwLock<Option<String>>,
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    pub max_response_content_buffer_size: usize,
    pub retry_on_error: bool,
    pub retry_limit: u32,
    #[serde(rename = "retry_delay_ms", with = "millis")]
    pub retry_delay: Duration,
    pub proxy: Option<ProxyOptions>,
    pub early_access: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: 443,
            version: DEFAULT_VERSION.to_string(),
            auth_token: RwLock::new(None),
            timeout: Duration::from_secs(30),
            max_response_content_buffer_size: 1024 * 1024 * 1024,
            retry_on_error: true,
            retry_limit: 5,
            retry_delay: Duration::from_millis(300),
            proxy: None,
            early_access: Vec::new(),
        }
    }
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        serde_json::from_str(raw).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        self.set_auth_token(Some(token.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry_on_error: bool, retry_limit: u32, retry_delay: Duration) -> Self {
        self.retry_on_error = retry_on_error;
        self.retry_limit = retry_limit;
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyOptions) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_early_access(mut self, features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.early_access = features.into_iter().map(Into::into).collect();
        self
    }

    /// `scheme://host:port/version`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.scheme,
            self.host.trim_end_matches('/'),
            self.port,
            self.version.trim_matches('/')
        )
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token().is_some()
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_public_api() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url(), "https://api.contentstack.io:443/v3");
        assert!(options.retry_on_error);
        assert_eq!(options.retry_limit, 5);
        assert!(!options.is_authenticated());
    }

    #[test]
    fn loads_from_json_with_defaults() {
        let options = ClientOptions::from_json(
            r#"{"host":"eu-api.contentstack.com","authtoken":"tok","timeout_ms":1500,"retry_limit":2,"early_access":["taxonomy"]}"#,
        )
        .unwrap();
        assert_eq!(options.host, "eu-api.contentstack.com");
        assert_eq!(options.port, 443);
        assert_eq!(options.auth_token().as_deref(), Some("tok"));
        assert_eq!(options.timeout, Duration::from_millis(1500));
        assert_eq!(options.retry_limit, 2);
        assert_eq!(options.retry_delay, Duration::from_millis(300));
        assert_eq!(options.early_access, vec!["taxonomy".to_string()]);
    }

    #[test]
    fn bad_json_is_reported() {
        let err = ClientOptions::from_json("{").unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn auth_token_slot_is_shared_and_mutable() {
        let options = ClientOptions::new().with_auth_token("a");
        options.set_auth_token(Some("b".into()));
        assert_eq!(options.auth_token().as_deref(), Some("b"));
        options.set_auth_token(None);
        assert!(!options.is_authenticated());
    }

    #[test]
    fn proxy_url_includes_credentials() {
        let proxy = ProxyOptions {
            host: "proxy.local".into(),
            port: 8080,
            username: Some("u".into()),
            password: Some("p".into()),
        };
        assert_eq!(proxy.url(), "http://u:p@proxy.local:8080");
    }
}
