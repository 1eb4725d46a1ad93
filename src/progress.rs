use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::TransferError;
use crate::state::TransferEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum EntryStatus {
    Queued,
    Downloading,
    Completed,
    Failed(String),
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Queued => write!(f, "Queued"),
            EntryStatus::Downloading => write!(f, "Downloading"),
            EntryStatus::Completed => write!(f, "Completed"),
            EntryStatus::Failed(reason) => write!(f, "Failed ({})", reason),
        }
    }
}

/// Read-only mirror of one transfer, as the display sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayEntry {
    pub filename: String,
    pub progress: f64,
    pub reports: usize,
    pub status: EntryStatus,
}

/// Per-request progress entries keyed by identifier. Cheap to clone; all
/// clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct DisplayRegistry {
    entries: Arc<DashMap<String, DisplayEntry>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: &str, filename: &str) {
        self.entries.insert(
            id.to_string(),
            DisplayEntry {
                filename: filename.to_string(),
                progress: 0.0,
                reports: 0,
                status: EntryStatus::Queued,
            },
        );
    }

    /// Apply a progress value. Unknown identifiers are ignored, as are
    /// values below what was already applied. Returns whether the entry changed.
    pub fn report(&self, id: &str, fraction: f64) -> bool {
        match self.entries.get_mut(id) {
            Some(mut entry) => {
                entry.reports += 1;
                if fraction >= entry.progress {
                    entry.progress = fraction.min(100.0);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    pub fn mark_downloading(&self, id: &str) {
        self.set_status(id, EntryStatus::Downloading);
    }

    pub fn mark_completed(&self, id: &str) {
        self.set_status(id, EntryStatus::Completed);
    }

    pub fn mark_failed(&self, id: &str, error: &TransferError) {
        self.set_status(id, EntryStatus::Failed(error.category().to_string()));
    }

    fn set_status(&self, id: &str, status: EntryStatus) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            entry.status = status;
        }
    }

    pub fn remove(&self, id: &str) -> Option<DisplayEntry> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    pub fn get(&self, id: &str) -> Option<DisplayEntry> {
        self.entries.get(id).map(|entry| entry.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries sorted by identifier.
    pub fn snapshot(&self) -> Vec<(String, DisplayEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

/// The single consumer of transfer events. Applies them to the registry in
/// arrival order and renders one bar per request.
pub struct Reporter {
    registry: DisplayRegistry,
    multi_progress: MultiProgress,
    bars: HashMap<String, ProgressBar>,
}

impl Reporter {
    pub fn new(registry: DisplayRegistry) -> Self {
        let multi_progress = MultiProgress::new();
        multi_progress.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        Self::with_multi_progress(registry, multi_progress)
    }

    /// A reporter that renders nothing.
    pub fn hidden(registry: DisplayRegistry) -> Self {
        Self::with_multi_progress(registry, MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    fn with_multi_progress(registry: DisplayRegistry, multi_progress: MultiProgress) -> Self {
        Self {
            registry,
            multi_progress,
            bars: HashMap::new(),
        }
    }

    /// Handle for printing above the bars while the reporter runs.
    pub fn multi_progress(&self) -> MultiProgress {
        self.multi_progress.clone()
    }

    pub async fn run(mut self, mut events: UnboundedReceiver<TransferEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
    }

    pub fn apply(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::Queued { id, filename } => {
                let pb = self.multi_progress.add(ProgressBar::new(0));
                pb.set_style(bar_style());
                pb.set_message(format!("Queued      {}", filename));
                self.bars.insert(id, pb);
            }
            TransferEvent::Started { id, total_size } => {
                self.registry.mark_downloading(&id);
                if let Some(pb) = self.bars.get(&id) {
                    pb.set_length(total_size);
                    let filename = self.registry.get(&id).map(|e| e.filename).unwrap_or_default();
                    pb.set_message(format!("Downloading {}", filename));
                }
            }
            TransferEvent::Progress {
                id,
                bytes_downloaded,
                fraction,
                ..
            } => {
                if self.registry.report(&id, fraction) {
                    if let Some(pb) = self.bars.get(&id) {
                        pb.set_position(bytes_downloaded);
                    }
                }
            }
            TransferEvent::Finished { id, filename, .. } => {
                self.registry.mark_completed(&id);
                if let Some(pb) = self.bars.remove(&id) {
                    pb.finish_with_message(format!("Completed   {}", filename));
                }
                let _ = self
                    .multi_progress
                    .println(format!("Download of {} complete.", filename));
            }
            TransferEvent::Failed { id, filename, error } => {
                self.registry.mark_failed(&id, &error);
                if let Some(pb) = self.bars.remove(&id) {
                    pb.abandon_with_message(format!("Failed      {}", filename));
                }
                let _ = self.multi_progress.println(format!("Error: {}", error));
            }
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes:>12}/{total_bytes:<12} {bytes_per_sec:>12} {eta:>4} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}
