use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ftpdl::cli::Args;
use ftpdl::commands::{self, Inputs, RunOptions};
use ftpdl::config::FtpConfig;
use ftpdl::worker::default_download_dir;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ftpdl=info".into()))
        .with_writer(std::io::stderr)
        .init();

    let mut download_dir = args.download_dir.clone().unwrap_or_else(default_download_dir);
    if download_dir.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            download_dir = cwd.join(&download_dir);
        }
    }

    let rt = tokio::runtime::Runtime::new()?;

    if args.list {
        return rt.block_on(commands::list_downloads(download_dir));
    }

    let config = args.apply_overrides(FtpConfig::load_from_file(&args.config)?);
    config.validate()?;
    tracing::debug!(?config, download_dir = %download_dir.display(), "starting");

    let inputs = Inputs {
        urls: args.urls.clone(),
        tasks_file: args.tasks_file.clone(),
        interactive: args.wants_interactive(),
    };
    let options = RunOptions {
        config,
        download_dir,
        concurrency: args.concurrency.unwrap_or_else(num_cpus::get),
    };

    let summary = rt.block_on(commands::run_downloads(inputs, options))?;
    // each failure was already reported as it happened
    if !summary.failed.is_empty() {
        bail!("{} of {} downloads failed", summary.failed.len(), summary.total());
    }
    Ok(())
}
