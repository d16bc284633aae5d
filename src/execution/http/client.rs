//! reqwest client construction.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;

use crate::error::LlmError;
use crate::types::HttpConfig;

/// Build a `reqwest::Client` from [`HttpConfig`].
///
/// Request deadlines are not set here: unary and streamed calls need
/// different ones, so the transport applies them per request.
pub fn build_http_client_from_config(config: &HttpConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();

    if let Some(connect_timeout) = config.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }
    if let Some(proxy_url) = &config.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid proxy URL: {e}")))?;
        builder = builder.proxy(proxy);
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent);
    }
    if !config.headers.is_empty() {
        builder = builder.default_headers(header_map(&config.headers)?);
    }

    builder
        .build()
        .map_err(|e| LlmError::HttpError(format!("Failed to create HTTP client: {e}")))
}

/// Convert string pairs into a validated [`HeaderMap`].
pub fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, LlmError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (k, v) in headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid header name '{k}': {e}")))?;
        let value = HeaderValue::from_str(v).map_err(|e| {
            LlmError::ConfigurationError(format!("Invalid header value for '{k}': {e}"))
        })?;
        map.insert(name, value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config_builds() {
        assert!(build_http_client_from_config(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn custom_config_builds() {
        let config = HttpConfig::builder()
            .connect_timeout(Duration::from_secs(5))
            .proxy("http://127.0.0.1:3128")
            .header("x-team", "core")
            .build();
        assert!(build_http_client_from_config(&config).is_ok());
    }

    #[test]
    fn malformed_proxy_is_a_configuration_error() {
        let config = HttpConfig::builder().proxy("::not a url::").build();
        assert!(matches!(
            build_http_client_from_config(&config),
            Err(LlmError::ConfigurationError(_))
        ));
    }

    #[test]
    fn invalid_header_name_is_rejected() {
        let mut headers = HashMap::new();
        headers.insert("bad header".to_string(), "v".to_string());
        assert!(header_map(&headers).is_err());
    }
}
