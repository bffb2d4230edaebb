use reqwest::StatusCode;

use crate::manifest::ByteRange;

pub type Result<T, E = StitchError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StitchError {
    #[error("download cancelled")]
    Cancelled,

    #[error("malformed manifest at line {line} (`{content}`): {reason}")]
    ManifestFormat {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("manifest{} contains no segments", .url.as_deref().map(|u| format!(" {u}")).unwrap_or_default())]
    EmptyManifest { url: Option<String> },

    #[error("segment #{index} ({url}) failed: {source}")]
    SegmentFetch {
        index: usize,
        url: String,
        #[source]
        source: Box<StitchError>,
    },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("proxy configuration error: {reason}")]
    ProxyConfiguration { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} during {operation} for {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("range {range} not satisfiable for {url}")]
    RangeNotSatisfiable { url: String, range: ByteRange },

    #[error("server ignored range {range} for {url} and returned only {received} bytes")]
    RangeNotHonored {
        url: String,
        range: ByteRange,
        received: usize,
    },

    #[error("operation timed out: {reason}")]
    Timeout { reason: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl StitchError {
    pub fn manifest_format(
        line: usize,
        content: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ManifestFormat {
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn proxy_configuration(reason: impl Into<String>) -> Self {
        Self::ProxyConfiguration {
            reason: reason.into(),
        }
    }

    pub fn http_status(
        status: StatusCode,
        url: impl Into<String>,
        operation: &'static str,
    ) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }

    pub fn segment(index: usize, url: impl Into<String>, source: StitchError) -> Self {
        Self::SegmentFetch {
            index,
            url: url.into(),
            source: Box::new(source),
        }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout {
            reason: reason.into(),
        }
    }

    /// Index of the failing segment, if this error came from a segment fetch.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            Self::SegmentFetch { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { source } => {
                source.is_connect()
                    || source.is_timeout()
                    || source.is_request()
                    || source.is_body()
                    || source.is_decode()
            }
            Self::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Timeout { .. } | Self::Io { .. } => true,
            Self::SegmentFetch { source, .. } => source.is_retryable(),
            Self::Cancelled
            | Self::ManifestFormat { .. }
            | Self::EmptyManifest { .. }
            | Self::InvalidUrl { .. }
            | Self::ProxyConfiguration { .. }
            | Self::Configuration { .. }
            | Self::RangeNotSatisfiable { .. }
            | Self::RangeNotHonored { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_not_retryable() {
        let err = StitchError::http_status(StatusCode::NOT_FOUND, "http://h/a.ts", "segment");
        assert!(!err.is_retryable());

        let err = StitchError::http_status(StatusCode::BAD_GATEWAY, "http://h/a.ts", "segment");
        assert!(err.is_retryable());

        let err = StitchError::http_status(StatusCode::TOO_MANY_REQUESTS, "http://h/a.ts", "segment");
        assert!(err.is_retryable());
    }

    #[test]
    fn segment_error_names_index_and_url() {
        let err = StitchError::segment(
            3,
            "http://h/a/seg3.ts",
            StitchError::http_status(StatusCode::NOT_FOUND, "http://h/a/seg3.ts", "segment"),
        );
        assert_eq!(err.segment_index(), Some(3));
        let msg = err.to_string();
        assert!(msg.contains("#3"), "{msg}");
        assert!(msg.contains("http://h/a/seg3.ts"), "{msg}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn empty_manifest_message() {
        let err = StitchError::EmptyManifest { url: None };
        assert_eq!(err.to_string(), "manifest contains no segments");
        let err = StitchError::EmptyManifest {
            url: Some("http://h/index.m3u8".into()),
        };
        assert_eq!(
            err.to_string(),
            "manifest http://h/index.m3u8 contains no segments"
        );
    }
}
