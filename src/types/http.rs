//! Connection settings for the reqwest-backed transport.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::defaults;

/// How the default transport talks to every backend.
///
/// `timeout` bounds unary calls from send to last body byte. Streamed calls
/// use `stream_timeout` instead, which is unset by default so long answers
/// are not cut off mid-stream; cancellation is the way to bound them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(with = "secs")]
    pub timeout: Option<Duration>,
    #[serde(with = "secs")]
    pub stream_timeout: Option<Duration>,
    #[serde(with = "secs")]
    pub connect_timeout: Option<Duration>,
    /// Sent with every request, before backend-specific headers.
    pub headers: HashMap<String, String>,
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    /// Ask for `Accept-Encoding: identity` on streamed calls. Some proxies
    /// buffer compressed event streams until the connection closes.
    pub stream_disable_compression: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Some(defaults::http::REQUEST_TIMEOUT),
            stream_timeout: None,
            connect_timeout: Some(defaults::http::CONNECT_TIMEOUT),
            headers: HashMap::new(),
            proxy: None,
            user_agent: Some(defaults::http::USER_AGENT.to_string()),
            stream_disable_compression: true,
        }
    }
}

impl HttpConfig {
    pub fn builder() -> HttpConfigBuilder {
        HttpConfigBuilder::default()
    }
}

/// Builder for [`HttpConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct HttpConfigBuilder {
    config: HttpConfig,
}

impl HttpConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Let unary calls run for as long as the backend takes.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.config.stream_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.config.proxy = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn stream_disable_compression(mut self, disable: bool) -> Self {
        self.config.stream_disable_compression = disable;
        self
    }

    pub fn build(self) -> HttpConfig {
        self.config
    }
}

/// Optional durations as whole seconds.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_only_touches_what_it_is_told() {
        let cfg = HttpConfig::builder()
            .timeout(Duration::from_secs(5))
            .header("x-trace", "1")
            .build();
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.connect_timeout, Some(defaults::http::CONNECT_TIMEOUT));
        assert_eq!(cfg.stream_timeout, None);
        assert_eq!(cfg.headers.get("x-trace").map(String::as_str), Some("1"));
        assert!(cfg.stream_disable_compression);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: HttpConfig =
            serde_json::from_value(serde_json::json!({"timeout": 42, "proxy": "http://proxy:3128"}))
                .unwrap();
        assert_eq!(cfg.timeout, Some(Duration::from_secs(42)));
        assert_eq!(cfg.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(cfg.user_agent.as_deref(), Some(defaults::http::USER_AGENT));

        let json = serde_json::to_value(HttpConfig::builder().no_timeout().build()).unwrap();
        assert!(json["timeout"].is_null());
    }
}
