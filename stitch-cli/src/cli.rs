use std::path::PathBuf;

use clap::Parser;
use stitch_engine::ProxyType;

#[derive(Parser, Debug)]
#[command(
    name = "stitch",
    author,
    version,
    about = "Download a segmented playlist and stitch it into one media file"
)]
pub struct Args {
    /// Manifest URL (http or https)
    #[arg(required = true)]
    pub url: String,

    /// Output directory
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Output file name (defaults to `<job-id>.mp4`)
    #[arg(short = 'n', long = "name")]
    pub name: Option<String>,

    /// Maximum number of segments fetched at once
    #[arg(short = 'j', long = "concurrency", default_value_t = 4)]
    pub concurrency: usize,

    /// Per-segment request timeout in seconds
    #[arg(long = "segment-timeout", default_value_t = 30)]
    pub segment_timeout: u64,

    /// Overall download timeout in seconds
    #[arg(long = "timeout", default_value_t = 600)]
    pub timeout: u64,

    /// Manifest request timeout in seconds
    #[arg(long = "manifest-timeout", default_value_t = 15)]
    pub manifest_timeout: u64,

    /// Retries per request on transient errors
    #[arg(long = "retries", default_value_t = 3)]
    pub retries: u32,

    /// Accept `#EXT-X-BYTERANGE` entries without an offset
    #[arg(long = "implicit-offsets")]
    pub implicit_offsets: bool,

    /// Extra request header, "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Query parameter appended to every request, "key=value" (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Override the User-Agent header
    #[arg(long = "user-agent", env = "STITCH_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy server URL
    #[arg(long = "proxy", env = "STITCH_PROXY")]
    pub proxy: Option<String>,

    #[arg(long = "proxy-type", value_enum, default_value = "http")]
    pub proxy_type: ProxyType,

    #[arg(long = "proxy-user", requires = "proxy")]
    pub proxy_user: Option<String>,

    #[arg(long = "proxy-pass", requires = "proxy_user")]
    pub proxy_pass: Option<String>,

    /// Ignore HTTP(S)_PROXY from the environment
    #[arg(long = "no-system-proxy")]
    pub no_system_proxy: bool,

    /// Hide the progress bar
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}
