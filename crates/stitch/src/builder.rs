use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::warn;

use crate::config::StitchConfig;
use crate::proxy::ProxyConfig;

/// Fluent construction of a [`StitchConfig`].
#[derive(Debug, Clone, Default)]
pub struct StitchConfigBuilder {
    config: StitchConfig,
}

impl StitchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.base.user_agent = user_agent.into();
        self
    }

    /// Adds a header; names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.config.base.headers.insert(name, value);
            }
            _ => warn!(header = name, "Ignoring invalid header"),
        }
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.base.params.push((key.into(), value.into()));
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.base.proxy = Some(proxy);
        self
    }

    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.config.base.use_system_proxy = enabled;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.base.connect_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.fetch.concurrency = concurrency;
        self
    }

    pub fn with_segment_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.segment_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.overall_timeout = timeout;
        self
    }

    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch.manifest_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.fetch.retry.max_retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, base: Duration, max: Duration) -> Self {
        self.config.fetch.retry.base_delay = base;
        self.config.fetch.retry.max_delay = max;
        self
    }

    pub fn with_implicit_offsets(mut self, enabled: bool) -> Self {
        self.config.parser.allow_implicit_offset = enabled;
        self
    }

    pub fn build(self) -> StitchConfig {
        self.config
    }
}
