use thiserror::Error;

/// Rejection at intake. No entry is registered and no worker is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid FTP URL {0:?}. It should start with 'ftp://'")]
    InvalidScheme(String),
}

/// Why a transfer failed. Each variant maps to one human-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("File not found on the server: {0}")]
    FileNotFound(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Temporary error: {0}")]
    Temporary(String),

    #[error("Error downloading {filename}: {detail}")]
    Unknown { filename: String, detail: String },
}

impl TransferError {
    pub fn unknown(filename: &str, detail: impl ToString) -> Self {
        TransferError::Unknown {
            filename: filename.to_string(),
            detail: detail.to_string(),
        }
    }

    /// Categorize an FTP reply code. 4xx is transient, 5xx is permanent.
    pub fn from_reply(code: u32, detail: String, filename: &str) -> Self {
        match code {
            400..=499 => TransferError::Temporary(detail),
            500..=599 => TransferError::Permission(detail),
            _ => TransferError::unknown(filename, detail),
        }
    }

    /// Short label used in the display registry and the listing.
    pub fn category(&self) -> &'static str {
        match self {
            TransferError::FileNotFound(_) => "not found",
            TransferError::Permission(_) => "permission",
            TransferError::Temporary(_) => "temporary",
            TransferError::Unknown { .. } => "error",
        }
    }
}
