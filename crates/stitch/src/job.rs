use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Span, info_span};
use url::Url;
use uuid::Uuid;

/// Per-request context threaded through parsing and fetching.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    id: Uuid,
    manifest_url: Url,
    started: Instant,
    token: CancellationToken,
}

impl DownloadJob {
    pub fn new(manifest_url: Url) -> Self {
        Self::with_token(manifest_url, CancellationToken::new())
    }

    /// The job is cancelled together with `token`.
    pub fn with_token(manifest_url: Url, token: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            manifest_url,
            started: Instant::now(),
            token,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn manifest_url(&self) -> &Url {
        &self.manifest_url
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn span(&self) -> Span {
        info_span!("download", job_id = %self.id, url = %self.manifest_url)
    }
}
