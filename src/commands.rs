use anyhow::{Context, Result};
use indicatif::{HumanBytes, MultiProgress};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::FtpConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{TransferError, ValidationError};
use crate::ftp::{Connector, SuppaConnector};
use crate::progress::{DisplayRegistry, Reporter};
use crate::worker::TransferOutcome;

/// Where URLs come from, in the order they are submitted.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub urls: Vec<String>,
    pub tasks_file: Option<PathBuf>,
    pub interactive: bool,
}

/// How the joined transfers ended, sorted by identifier.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReportSummary {
    pub completed: Vec<String>,
    pub failed: Vec<(String, TransferError)>,
}

impl ReportSummary {
    pub fn from_outcomes(outcomes: Vec<TransferOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.result {
                Ok(_) => summary.completed.push(outcome.identifier),
                Err(error) => summary.failed.push((outcome.identifier, error)),
            }
        }
        summary.completed.sort();
        summary.failed.sort_by(|a, b| a.0.cmp(&b.0));
        summary
    }

    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: FtpConfig,
    pub download_dir: PathBuf,
    pub concurrency: usize,
}

pub async fn run_downloads(inputs: Inputs, options: RunOptions) -> Result<ReportSummary> {
    let registry = DisplayRegistry::new();
    let reporter = Reporter::new(registry.clone());
    run_with(SuppaConnector, inputs, options, registry, reporter).await
}

/// Submit every input URL, wait for all transfers and summarize how they ended.
pub async fn run_with<C: Connector>(
    connector: C,
    inputs: Inputs,
    options: RunOptions,
    registry: DisplayRegistry,
    reporter: Reporter,
) -> Result<ReportSummary> {
    let (tx, rx) = mpsc::unbounded_channel();
    let multi_progress = reporter.multi_progress();
    let reporter_handle = tokio::spawn(reporter.run(rx));

    let mut dispatcher = Dispatcher::new(
        connector,
        options.config,
        options.download_dir,
        options.concurrency,
        registry,
        tx,
    );

    submit_all(&mut dispatcher, inputs.urls.iter().map(String::as_str));

    if let Some(tasks_file) = &inputs.tasks_file {
        let lines = read_tasks_file(tasks_file).await?;
        submit_all(&mut dispatcher, lines.iter().map(String::as_str));
    }

    if inputs.interactive {
        read_interactive(&mut dispatcher, &multi_progress).await?;
    }

    let accepted = dispatcher.accepted();
    tracing::debug!(accepted, "all requests dispatched, waiting for workers");
    let summary = ReportSummary::from_outcomes(dispatcher.join().await);

    // workers are joined, so every sender is gone and the reporter drains and stops
    reporter_handle.await.context("progress reporter stopped unexpectedly")?;
    tracing::info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        "all downloads finished"
    );
    Ok(summary)
}

/// Submit each non-blank line. Rejections are reported and skipped.
pub fn submit_all<'a, C: Connector>(
    dispatcher: &mut Dispatcher<C>,
    urls: impl IntoIterator<Item = &'a str>,
) -> Vec<ValidationError> {
    let mut rejected = vec![];
    for url in urls {
        if url.trim().is_empty() {
            continue;
        }
        if let Err(e) = dispatcher.submit(url) {
            eprintln!("Error: {}", e);
            rejected.push(e);
        }
    }
    rejected
}

async fn read_tasks_file(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path)
        .await
        .context(format!("Failed to open tasks file: {:?}", path))?;
    let mut lines = BufReader::new(file).lines();
    let mut urls = vec![];
    while let Some(line) = lines.next_line().await? {
        let raw = line.trim();
        if !raw.is_empty() && !raw.starts_with('#') {
            urls.push(raw.to_string());
        }
    }
    Ok(urls)
}

/// One URL per line from stdin, each dispatched as soon as it is entered.
/// The hint goes through the bars' own output so redraws don't clobber it.
async fn read_interactive<C: Connector>(
    dispatcher: &mut Dispatcher<C>,
    multi_progress: &MultiProgress,
) -> Result<()> {
    if std::io::stdin().is_terminal() {
        let _ = multi_progress.println("Enter FTP URLs, one per line (Ctrl-D to finish):");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        submit_all(dispatcher, [line.as_str()]);
    }
    Ok(())
}

pub async fn list_downloads(download_dir: PathBuf) -> Result<()> {
    if !download_dir.exists() {
        println!("Download directory {:?} does not exist.", download_dir);
        println!("Tip: if you used a custom download directory, pass it with --download-dir");
        return Ok(());
    }

    println!("{:<50} {:<15}", "Filename", "Size");
    println!("{:-<50} {:-<15}", "", "");

    let mut files = vec![];
    let mut entries = fs::read_dir(&download_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            files.push((entry.file_name().to_string_lossy().to_string(), metadata.len()));
        }
    }
    files.sort();

    let total: u64 = files.iter().map(|(_, len)| len).sum();
    for (name, len) in &files {
        println!("{:<50} {:<15}", name, format!("{}", HumanBytes(*len)));
    }

    if files.is_empty() {
        println!("No downloaded files in {:?}.", download_dir);
    } else {
        println!();
        println!("Files: {} | Total: {}", files.len(), HumanBytes(total));
    }
    Ok(())
}
