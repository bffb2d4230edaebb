mod cli;
mod error;
mod output;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use stitch_engine::{FetchProgress, ProxyConfig, StitchConfig, StitchDownloader};
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::Args;
use crate::error::{AppError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        if e.is_cancelled() {
            warn!("Download cancelled");
        } else {
            error!("{e}");
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args) -> Result<()> {
    let config = build_config(&args)?;
    let progress = (!args.no_progress && !args.quiet).then(progress_bar);

    let mut downloader = StitchDownloader::with_config(config)?;
    if let Some(pb) = &progress {
        downloader = downloader.with_progress(progress_callback(pb.clone()));
    }

    let job = downloader.job(&args.url)?;
    let token = job.token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let file_name = utils::output_file_name(args.name.as_deref(), &job.id().to_string())?;
    let result = downloader.run(&job).await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let media = result?;

    let path = output::write_media(&args.output_dir, &file_name, &media.bytes).await?;
    info!(
        path = %path.display(),
        size = %HumanBytes(media.len() as u64),
        segments = media.segment_count,
        elapsed_ms = media.elapsed.as_millis() as u64,
        "Saved"
    );
    Ok(())
}

fn build_config(args: &Args) -> Result<StitchConfig> {
    if args.concurrency == 0 {
        return Err(AppError::InvalidInput(
            "concurrency must be at least 1".to_string(),
        ));
    }

    let mut builder = StitchConfig::builder()
        .with_concurrency(args.concurrency)
        .with_segment_timeout(Duration::from_secs(args.segment_timeout))
        .with_timeout(Duration::from_secs(args.timeout))
        .with_manifest_timeout(Duration::from_secs(args.manifest_timeout))
        .with_max_retries(args.retries)
        .with_implicit_offsets(args.implicit_offsets)
        .with_system_proxy(!args.no_system_proxy);

    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent.clone());
    }
    for (name, value) in utils::parse_headers(&args.headers)? {
        builder = builder.with_header(&name, &value);
    }
    for (key, value) in utils::parse_params(&args.params)? {
        builder = builder.with_param(key, value);
    }
    if let Some(url) = &args.proxy {
        let mut proxy = ProxyConfig::new(url.clone(), args.proxy_type);
        if let Some(user) = &args.proxy_user {
            proxy = proxy.with_auth(user.clone(), args.proxy_pass.clone().unwrap_or_default());
        }
        builder = builder.with_proxy(proxy);
    }

    Ok(builder.build())
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} segments {msg} ({elapsed})",
    )
    .map(|style| style.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn progress_callback(pb: ProgressBar) -> stitch_engine::ProgressCallback {
    let downloaded = std::sync::atomic::AtomicU64::new(0);
    Arc::new(move |event: FetchProgress| match event {
        FetchProgress::Started { total } => pb.set_length(total as u64),
        FetchProgress::SegmentCompleted {
            bytes, completed, ..
        } => {
            let so_far = downloaded.fetch_add(bytes as u64, std::sync::atomic::Ordering::Relaxed)
                + bytes as u64;
            pb.set_position(completed as u64);
            pb.set_message(HumanBytes(so_far).to_string());
        }
        FetchProgress::Finished { bytes } => {
            pb.set_message(HumanBytes(bytes as u64).to_string());
        }
    })
}
