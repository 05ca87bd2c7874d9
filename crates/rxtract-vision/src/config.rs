//! Configuration for the inference HTTP clients.

use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Connection settings shared by the detection and recognition clients.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use rxtract_vision::InferenceConfig;
///
/// let config = InferenceConfig::new("http://localhost:9001")?
///     .with_timeout(Duration::from_secs(60))
///     .with_api_key("secret");
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Base URL of the model-serving endpoint
    base_url: Url,

    /// Bearer token for the endpoint, if it requires one
    api_key: Option<String>,

    /// Request timeout
    timeout: Duration,

    /// TCP connect timeout
    connect_timeout: Duration,

    /// User agent string for HTTP requests
    user_agent: String,
}

impl InferenceConfig {
    /// Creates a configuration with the given base URL and default settings.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            Error::invalid_config(format!("invalid base URL '{}': {}", base_url.as_ref(), e))
        })?;

        Ok(Self {
            base_url,
            api_key: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            user_agent: format!("rxtract-vision/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Base URL of the endpoint.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// API key, if configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// User agent string.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Joins a path onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = InferenceConfig::new("http://localhost:9001").unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:9001/");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(InferenceConfig::new("not a url").is_err());
    }

    #[test]
    fn fluent_overrides() {
        let config = InferenceConfig::new("https://models.internal")
            .unwrap()
            .with_api_key("k")
            .with_timeout(Duration::from_secs(90));
        assert_eq!(config.api_key(), Some("k"));
        assert_eq!(config.timeout(), Duration::from_secs(90));
    }

    #[test]
    fn endpoint_join() {
        let config = InferenceConfig::new("http://localhost:9001").unwrap();
        let url = config.endpoint("v1/detect").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9001/v1/detect");
    }
}
