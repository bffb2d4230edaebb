//! Reassembles a single media file from a segmented playlist manifest.
//!
//! The manifest is a simplified HLS media playlist: each `#EXTINF:` entry
//! names one segment, optionally restricted to a sub-range of its resource
//! with `#EXT-X-BYTERANGE:<length>@<offset>`. [`ManifestParser`] turns the
//! text into ordered [`SegmentDescriptor`]s, [`Reassembler`] fetches them with
//! bounded concurrency and concatenates the bodies in manifest order, and
//! [`StitchDownloader`] wires both to a reqwest client.
//!
//! ```no_run
//! # async fn demo() -> stitch_engine::Result<()> {
//! use stitch_engine::{StitchConfig, StitchDownloader};
//!
//! let config = StitchConfig::builder().with_concurrency(6).build();
//! let downloader = StitchDownloader::with_config(config)?;
//! let media = downloader.download("https://example.com/v/index.m3u8").await?;
//! tokio::fs::write(format!("{}.mp4", media.job_id), &media.bytes).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod job;
pub mod manifest;
pub mod proxy;
pub mod retry;

pub use builder::StitchConfigBuilder;
pub use config::{DownloaderConfig, FetchConfig, StitchConfig, create_client};
pub use downloader::StitchDownloader;
pub use error::{Result, StitchError};
pub use fetch::{
    FetchProgress, HttpSegmentFetcher, ProgressCallback, ReassembledMedia, Reassembler,
    SegmentSource,
};
pub use job::DownloadJob;
pub use manifest::{
    ByteRange, Manifest, ManifestParser, ParserOptions, SegmentDescriptor, base_url_for,
    parse_manifest,
};
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
pub use retry::RetryPolicy;
