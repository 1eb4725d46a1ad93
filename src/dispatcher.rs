use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::FtpConfig;
use crate::error::{TransferError, ValidationError};
use crate::ftp::Connector;
use crate::intake::DownloadRequest;
use crate::progress::DisplayRegistry;
use crate::state::TransferEvent;
use crate::worker::{self, TransferOutcome};

/// Accepts URLs and runs one worker per accepted request on a bounded pool.
///
/// `submit` never waits for a transfer; at most `concurrency` transfers run
/// at once and the rest wait for a permit. `join` waits for all of them.
pub struct Dispatcher<C: Connector> {
    connector: Arc<C>,
    config: Arc<FtpConfig>,
    download_dir: Arc<PathBuf>,
    registry: DisplayRegistry,
    events: UnboundedSender<TransferEvent>,
    semaphore: Arc<Semaphore>,
    accepted: usize,
    workers: JoinSet<TransferOutcome>,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(
        connector: C,
        config: FtpConfig,
        download_dir: PathBuf,
        concurrency: usize,
        registry: DisplayRegistry,
        events: UnboundedSender<TransferEvent>,
    ) -> Self {
        Self {
            connector: Arc::new(connector),
            config: Arc::new(config),
            download_dir: Arc::new(download_dir),
            registry,
            events,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            accepted: 0,
            workers: JoinSet::new(),
        }
    }

    /// Number of requests accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Workers not yet joined, running or waiting for a permit.
    pub fn in_flight(&self) -> usize {
        self.workers.len()
    }

    /// Validate `url`, register its display entry and schedule its worker.
    /// Identifiers stay unique because the counter only moves under `&mut self`.
    pub fn submit(&mut self, url: &str) -> Result<DownloadRequest, ValidationError> {
        let request = DownloadRequest::parse(url, self.accepted)?;
        self.accepted += 1;

        if let Some(host) = request.url_host() {
            if host != self.config.host {
                tracing::warn!(
                    url_host = %host,
                    configured_host = %self.config.host,
                    "URL host differs from the configured server; fetching {} from {}/{}",
                    request.filename,
                    self.config.host,
                    self.config.remote_dir
                );
            }
        }

        self.registry.register(&request.identifier, &request.filename);
        let _ = self.events.send(TransferEvent::Queued {
            id: request.identifier.clone(),
            filename: request.filename.clone(),
        });
        tracing::info!(id = %request.identifier, url = %request.url, "queued");

        let connector = self.connector.clone();
        let config = self.config.clone();
        let download_dir = self.download_dir.clone();
        let semaphore = self.semaphore.clone();
        let events = self.events.clone();
        let job = request.clone();

        self.workers.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let failed_events = events.clone();
            let fallback = job.clone();

            let handle = tokio::task::spawn_blocking(move || {
                worker::execute(&*connector, &config, &download_dir, &job, &events)
            });
            match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let error = TransferError::unknown(&fallback.filename, format!("worker panicked: {}", e));
                    tracing::error!(id = %fallback.identifier, "{}", error);
                    let _ = failed_events.send(TransferEvent::Failed {
                        id: fallback.identifier.clone(),
                        filename: fallback.filename.clone(),
                        error: error.clone(),
                    });
                    TransferOutcome {
                        identifier: fallback.identifier,
                        filename: fallback.filename,
                        result: Err(error),
                    }
                }
            }
        });

        Ok(request)
    }

    /// Wait for every dispatched worker. Dropping the dispatcher's event
    /// sender here lets the reporter finish once the last worker is done.
    pub async fn join(mut self) -> Vec<TransferOutcome> {
        let mut outcomes = Vec::with_capacity(self.workers.len());
        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("download task failed to join: {}", e),
            }
        }
        outcomes
    }
}
