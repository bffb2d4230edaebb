use std::time::Duration;

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use crate::error::{Result, StitchError};
use crate::manifest::ParserOptions;
use crate::proxy::{ProxyConfig, build_proxy};
use crate::retry::RetryPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// HTTP client options shared by manifest and segment requests
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    pub user_agent: String,

    /// Headers sent with every request
    pub headers: HeaderMap,

    /// Extra query parameters appended to every request
    pub params: Vec<(String, String)>,

    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings when no explicit proxy is set
    pub use_system_proxy: bool,

    pub danger_accept_invalid_certs: bool,

    /// Maximum idle connections to keep per host
    pub pool_max_idle_per_host: usize,

    /// Duration to keep idle connections alive before closing
    pub pool_idle_timeout: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::default_headers(),
            params: Vec::new(),
            proxy: None,
            use_system_proxy: true,
            danger_accept_invalid_certs: false,
            pool_max_idle_per_host: 8,
            pool_idle_timeout: Duration::from_secs(30),
        }
    }
}

impl DownloaderConfig {
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        headers
    }
}

/// Segment fan-out and time limits
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum segments in flight at once
    pub concurrency: usize,
    /// Limit for one segment request, including the body
    pub segment_timeout: Duration,
    /// Limit for the whole reassembly
    pub overall_timeout: Duration,
    /// Limit for fetching the manifest text
    pub manifest_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            segment_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(10 * 60),
            manifest_timeout: Duration::from_secs(15),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(StitchError::configuration("concurrency must be at least 1"));
        }
        if self.segment_timeout.is_zero()
            || self.overall_timeout.is_zero()
            || self.manifest_timeout.is_zero()
        {
            return Err(StitchError::configuration("timeouts must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StitchConfig {
    pub base: DownloaderConfig,
    pub fetch: FetchConfig,
    pub parser: ParserOptions,
}

impl StitchConfig {
    pub fn builder() -> crate::builder::StitchConfigBuilder {
        crate::builder::StitchConfigBuilder::new()
    }
}

/// Create the reqwest client for `config`.
pub fn create_client(config: &DownloaderConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(config.pool_idle_timeout)
        .danger_accept_invalid_certs(config.danger_accept_invalid_certs)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        builder = builder.proxy(build_proxy(proxy_config)?);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy");
    } else if !config.use_system_proxy {
        builder = builder.no_proxy();
        debug!("Proxy disabled");
    }

    builder.build().map_err(StitchError::from)
}
