use crate::error::TransferError;

/// Running totals for one transfer. Owned by its worker.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferState {
    pub identifier: String,
    pub bytes_downloaded: u64,
    pub total_size: u64,
    pub progress_fraction: f64,
}

impl TransferState {
    pub fn new(identifier: &str, total_size: u64) -> Self {
        Self {
            identifier: identifier.to_string(),
            bytes_downloaded: 0,
            total_size,
            progress_fraction: 0.0,
        }
    }

    /// Account for one received chunk and return the new percentage.
    pub fn advance(&mut self, len: usize) -> f64 {
        self.bytes_downloaded += len as u64;
        let fraction = if self.total_size == 0 {
            100.0
        } else {
            (self.bytes_downloaded as f64 / self.total_size as f64) * 100.0
        };
        // servers occasionally send more than SIZE announced
        self.progress_fraction = fraction.min(100.0).max(self.progress_fraction);
        self.progress_fraction
    }
}

/// Everything the reporter hears about a request, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Queued {
        id: String,
        filename: String,
    },
    Started {
        id: String,
        total_size: u64,
    },
    Progress {
        id: String,
        bytes_downloaded: u64,
        total_size: u64,
        fraction: f64,
    },
    Finished {
        id: String,
        filename: String,
        bytes: u64,
    },
    Failed {
        id: String,
        filename: String,
        error: TransferError,
    },
}

impl TransferEvent {
    pub fn id(&self) -> &str {
        match self {
            TransferEvent::Queued { id, .. }
            | TransferEvent::Started { id, .. }
            | TransferEvent::Progress { id, .. }
            | TransferEvent::Finished { id, .. }
            | TransferEvent::Failed { id, .. } => id,
        }
    }
}
