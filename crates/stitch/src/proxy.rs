use reqwest::Proxy;

use crate::error::{Result, StitchError};

/// Kind of proxy in front of every manifest and segment request
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ProxyType {
    Http,
    Https,
    Socks5,
}

/// Basic-auth credentials for the proxy
#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>, proxy_type: ProxyType) -> Self {
        Self {
            url: url.into(),
            proxy_type,
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Normalized proxy URL; bare `host:port` SOCKS addresses get a `socks5://` scheme.
    fn endpoint(&self) -> String {
        match self.proxy_type {
            ProxyType::Socks5
                if !(self.url.starts_with("socks5://") || self.url.starts_with("socks5h://")) =>
            {
                format!("socks5://{}", self.url)
            }
            _ => self.url.clone(),
        }
    }
}

/// Build the reqwest proxy for `config`.
pub fn build_proxy(config: &ProxyConfig) -> Result<Proxy> {
    let endpoint = config.endpoint();
    let proxy = match config.proxy_type {
        ProxyType::Http => Proxy::http(&endpoint),
        ProxyType::Https => Proxy::https(&endpoint),
        ProxyType::Socks5 => Proxy::all(&endpoint),
    }
    .map_err(|e| {
        StitchError::proxy_configuration(format!(
            "invalid {:?} proxy `{endpoint}`: {e}",
            config.proxy_type
        ))
    })?;

    Ok(match &config.auth {
        Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
        None => proxy,
    })
}
