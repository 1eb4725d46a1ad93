use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedSender;

use crate::config::FtpConfig;
use crate::error::TransferError;
use crate::ftp::{Connector, Session};
use crate::intake::DownloadRequest;
use crate::state::{TransferEvent, TransferState};

/// What the dispatcher learns when a worker is joined.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub identifier: String,
    pub filename: String,
    pub result: Result<u64, TransferError>,
}

/// Run one transfer to completion and report its end state on `events`.
/// Never panics on transfer errors; they become a `Failed` event.
pub fn execute<C: Connector>(
    connector: &C,
    config: &FtpConfig,
    download_dir: &Path,
    request: &DownloadRequest,
    events: &UnboundedSender<TransferEvent>,
) -> TransferOutcome {
    let result = run_transfer(connector, config, download_dir, request, events);
    let event = match &result {
        Ok(bytes) => {
            tracing::info!(id = %request.identifier, bytes, "download of {} complete", request.filename);
            TransferEvent::Finished {
                id: request.identifier.clone(),
                filename: request.filename.clone(),
                bytes: *bytes,
            }
        }
        Err(error) => {
            tracing::warn!(id = %request.identifier, category = error.category(), "{}", error);
            TransferEvent::Failed {
                id: request.identifier.clone(),
                filename: request.filename.clone(),
                error: error.clone(),
            }
        }
    };
    let _ = events.send(event);

    TransferOutcome {
        identifier: request.identifier.clone(),
        filename: request.filename.clone(),
        result,
    }
}

/// Connect, change directory, size the file and stream it to disk.
/// Returns the number of bytes written.
pub fn run_transfer<C: Connector>(
    connector: &C,
    config: &FtpConfig,
    download_dir: &Path,
    request: &DownloadRequest,
    events: &UnboundedSender<TransferEvent>,
) -> Result<u64, TransferError> {
    let filename = request.filename.as_str();

    let mut session = connector.connect(config)?;
    session.cwd(&config.remote_dir)?;

    fs::create_dir_all(download_dir)
        .map_err(|e| TransferError::unknown(filename, format!("Failed to create download directory: {}", e)))?;
    let local_path = download_dir.join(filename);

    let total_size = session.size(filename)?;
    let mut state = TransferState::new(&request.identifier, total_size);
    let _ = events.send(TransferEvent::Started {
        id: request.identifier.clone(),
        total_size,
    });
    tracing::debug!(id = %request.identifier, total_size, path = %local_path.display(), "starting retrieve");

    let file = File::create(&local_path)
        .map_err(|e| TransferError::unknown(filename, format!("Failed to open {}: {}", local_path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; config.chunk_size];

    session.retrieve(filename, &mut |reader| {
        loop {
            let len = read_chunk(reader, &mut buffer).map_err(|e| TransferError::unknown(filename, e))?;
            if len == 0 {
                break;
            }
            writer
                .write_all(&buffer[..len])
                .map_err(|e| TransferError::unknown(filename, e))?;
            let fraction = state.advance(len);
            let _ = events.send(TransferEvent::Progress {
                id: state.identifier.clone(),
                bytes_downloaded: state.bytes_downloaded,
                total_size: state.total_size,
                fraction,
            });
            if len < buffer.len() {
                break;
            }
        }
        Ok(())
    })?;

    writer
        .flush()
        .map_err(|e| TransferError::unknown(filename, format!("Failed to flush file: {}", e)))?;
    drop(writer);

    if let Err(e) = session.quit() {
        tracing::debug!(id = %request.identifier, "QUIT failed after transfer: {}", e);
    }
    Ok(state.bytes_downloaded)
}

/// Fill `buf` completely unless the stream ends first, so every chunk but
/// the last has the configured size.
fn read_chunk(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// `downloads/` next to the running executable, or under the working
/// directory if the executable path is unavailable.
pub fn default_download_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join("downloads")
}
