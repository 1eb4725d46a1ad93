pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ftp;
pub mod intake;
pub mod progress;
pub mod state;
pub mod worker;

pub use config::FtpConfig;
pub use dispatcher::Dispatcher;
pub use error::{TransferError, ValidationError};
pub use intake::DownloadRequest;
pub use progress::{DisplayEntry, DisplayRegistry, EntryStatus, Reporter};
pub use state::{TransferEvent, TransferState};
