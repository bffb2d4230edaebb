// End-to-end download: manifest URL in, reassembled media out.

use std::sync::Arc;

use reqwest::Client;
use tracing::{Instrument, debug, info};
use url::Url;

use crate::config::{StitchConfig, create_client};
use crate::error::{Result, StitchError};
use crate::fetch::{HttpSegmentFetcher, ProgressCallback, ReassembledMedia, Reassembler};
use crate::job::DownloadJob;
use crate::manifest::{Manifest, ManifestParser, base_url_for};
use crate::retry::with_retry;

pub struct StitchDownloader {
    client: Client,
    config: StitchConfig,
    parser: ManifestParser,
    reassembler: Reassembler<HttpSegmentFetcher>,
}

impl StitchDownloader {
    pub fn new() -> Result<Self> {
        Self::with_config(StitchConfig::default())
    }

    pub fn with_config(config: StitchConfig) -> Result<Self> {
        config.fetch.validate()?;
        let client = create_client(&config.base)?;
        let fetcher = Arc::new(HttpSegmentFetcher::new(client.clone(), &config));
        Ok(Self {
            parser: ManifestParser::new(config.parser.clone()),
            reassembler: Reassembler::new(fetcher, config.fetch.clone()),
            client,
            config,
        })
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.reassembler = self.reassembler.with_progress(callback);
        self
    }

    /// Validate `manifest_url` and open a job for it.
    pub fn job(&self, manifest_url: &str) -> Result<DownloadJob> {
        let url = parse_http_url(manifest_url)?;
        Ok(DownloadJob::new(url))
    }

    /// Fetch, parse and reassemble the manifest at `manifest_url`.
    pub async fn download(&self, manifest_url: &str) -> Result<ReassembledMedia> {
        let job = self.job(manifest_url)?;
        self.run(&job).await
    }

    pub async fn run(&self, job: &DownloadJob) -> Result<ReassembledMedia> {
        let manifest = self.load_manifest(job).instrument(job.span()).await?;
        self.reassembler.fetch(job, &manifest).await
    }

    pub async fn load_manifest(&self, job: &DownloadJob) -> Result<Manifest> {
        let text = self.fetch_manifest_text(job).await?;
        let base = base_url_for(job.manifest_url())?;
        debug!(base_url = %base, bytes = text.len(), "Manifest fetched");

        let manifest = self.parser.parse_with_base(&text, &base)?;
        info!(
            segments = manifest.len(),
            duration_secs = manifest.total_duration(),
            expected_bytes = ?manifest.expected_len(),
            "Manifest parsed"
        );
        Ok(manifest)
    }

    async fn fetch_manifest_text(&self, job: &DownloadJob) -> Result<String> {
        let fetch = with_retry(&self.config.fetch.retry, job.token(), "manifest", |_| {
            self.fetch_manifest_once(job.manifest_url())
        });

        tokio::select! {
            _ = job.token().cancelled() => Err(StitchError::Cancelled),
            res = fetch => res,
        }
    }

    async fn fetch_manifest_once(&self, url: &Url) -> Result<String> {
        let mut request = self
            .client
            .get(url.clone())
            .timeout(self.config.fetch.manifest_timeout);
        if !self.config.base.params.is_empty() {
            request = request.query(&self.config.base.params);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StitchError::http_status(status, url.as_str(), "manifest fetch"));
        }
        Ok(response.text().await?)
    }
}

fn parse_http_url(input: &str) -> Result<Url> {
    let url = Url::parse(input).map_err(|e| StitchError::invalid_url(input, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(StitchError::invalid_url(
            input,
            format!("unsupported scheme `{other}`"),
        )),
    }
}
