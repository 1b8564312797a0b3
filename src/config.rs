//! Client configuration.
//!
//! All behaviour of the conversion client is controlled through
//! [`ClientConfig`], built via its [`ClientConfigBuilder`]. One struct keeps
//! every knob in one place so a CLI, a test, or an embedding application can
//! construct a session the same way.

use crate::error::ConvertError;
use crate::events::EventCallback;
use reqwest::Url;
use std::fmt;

/// Backend address used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for a conversion session.
///
/// Built via [`ClientConfig::builder()`] or using [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use lecturedesk::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://converter.internal:8000")
///     .request_timeout_secs(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://converter.internal:8000");
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    /// Base address of the conversion backend. Default: `http://localhost:8000`.
    ///
    /// Endpoint paths (`/process`, `/braille`) are appended to it.
    pub base_url: String,

    /// Whole-request timeout in seconds. Default: `None`.
    ///
    /// `None` leaves timing to the transport: a request runs until the
    /// backend answers or the connection fails. Conversions of long slide
    /// decks routinely take minutes, so there is no built-in deadline.
    pub request_timeout_secs: Option<u64>,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Largest file, in bytes, intake will read into memory. Default: 100 MiB.
    pub max_upload_bytes: u64,

    /// Receiver for rejection / job / download notifications.
    pub event_callback: Option<EventCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            user_agent: format!("lecturedesk/{}", env!("CARGO_PKG_VERSION")),
            max_upload_bytes: 100 * 1024 * 1024,
            event_callback: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field(
                "event_callback",
                &self.event_callback.as_ref().map(|_| "<dyn JobEventCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of `endpoint` on the configured backend.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = Some(secs);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn event_callback(mut self, cb: EventCallback) -> Self {
        self.config.event_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ConvertError> {
        let c = &self.config;
        let url = Url::parse(&c.base_url).map_err(|e| {
            ConvertError::InvalidConfig(format!("base URL '{}' is not valid: {e}", c.base_url))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConvertError::InvalidConfig(format!(
                "base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if c.request_timeout_secs == Some(0) {
            return Err(ConvertError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.request_timeout_secs, None);
        assert!(c.user_agent.starts_with("lecturedesk/"));
    }

    #[test]
    fn endpoint_url_joins_cleanly() {
        let c = ClientConfig::builder()
            .base_url("http://example.test:9000/")
            .build()
            .unwrap();
        assert_eq!(c.endpoint_url("/braille"), "http://example.test:9000/braille");
        assert_eq!(c.endpoint_url("process"), "http://example.test:9000/process");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = ClientConfig::builder()
            .base_url("ftp://example.test")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_garbage_base_url() {
        assert!(ClientConfig::builder().base_url("not a url").build().is_err());
    }

    #[test]
    fn rejects_zero_timeout_and_zero_limit() {
        assert!(ClientConfig::builder().request_timeout_secs(0).build().is_err());
        assert!(ClientConfig::builder().max_upload_bytes(0).build().is_err());
    }
}
