//! The FTP operations a transfer needs, behind a trait so workers can run
//! against a real server or an in-memory one.

use std::io::Read;
use std::net::ToSocketAddrs;
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use crate::config::FtpConfig;
use crate::error::TransferError;

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";
const FILE_UNAVAILABLE: u32 = 550;

/// Opens logged-in control connections.
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    fn connect(&self, config: &FtpConfig) -> Result<Self::Session, TransferError>;
}

/// A logged-in control connection.
pub trait Session: Send {
    fn cwd(&mut self, dir: &str) -> Result<(), TransferError>;

    /// Byte length of `filename`. A missing file is `FileNotFound`.
    fn size(&mut self, filename: &str) -> Result<u64, TransferError>;

    /// Open a binary data connection for `filename` and hand the stream to
    /// `consume`. The transfer is finalized only if `consume` succeeds.
    fn retrieve(
        &mut self,
        filename: &str,
        consume: &mut dyn FnMut(&mut dyn Read) -> Result<(), TransferError>,
    ) -> Result<(), TransferError>;

    fn quit(&mut self) -> Result<(), TransferError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SuppaConnector;

pub struct SuppaSession {
    stream: FtpStream,
    timeout: Duration,
}

impl Connector for SuppaConnector {
    type Session = SuppaSession;

    fn connect(&self, config: &FtpConfig) -> Result<SuppaSession, TransferError> {
        let target = format!("{}:{}", config.host, config.port);
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()
            .map_err(|e| TransferError::unknown(&target, e))?
            .next()
            .ok_or_else(|| TransferError::unknown(&target, "host did not resolve"))?;

        let mut stream = FtpStream::connect_timeout(addr, config.timeout())
            .map_err(|e| map_ftp_error(e, &target))?;
        let socket = stream.get_ref();
        socket
            .set_read_timeout(Some(config.timeout()))
            .and_then(|_| socket.set_write_timeout(Some(config.timeout())))
            .map_err(|e| TransferError::unknown(&target, e))?;

        stream
            .login(ANONYMOUS_USER, ANONYMOUS_PASSWORD)
            .map_err(|e| map_ftp_error(e, &target))?;
        // SIZE is refused or reports converted lengths in ASCII mode
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| map_ftp_error(e, &target))?;
        tracing::debug!(host = %config.host, "logged in anonymously");
        Ok(SuppaSession {
            stream,
            timeout: config.timeout(),
        })
    }
}

impl Session for SuppaSession {
    fn cwd(&mut self, dir: &str) -> Result<(), TransferError> {
        self.stream.cwd(dir).map_err(|e| map_ftp_error(e, dir))
    }

    fn size(&mut self, filename: &str) -> Result<u64, TransferError> {
        match self.stream.size(filename) {
            Ok(size) => Ok(size as u64),
            Err(FtpError::UnexpectedResponse(resp)) if resp.status.code() == FILE_UNAVAILABLE => {
                Err(TransferError::FileNotFound(filename.to_string()))
            }
            Err(e) => Err(map_ftp_error(e, filename)),
        }
    }

    fn retrieve(
        &mut self,
        filename: &str,
        consume: &mut dyn FnMut(&mut dyn Read) -> Result<(), TransferError>,
    ) -> Result<(), TransferError> {
        let mut data = self
            .stream
            .retr_as_stream(filename)
            .map_err(|e| map_ftp_error(e, filename))?;
        data.get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| TransferError::unknown(filename, e))?;
        consume(&mut data)?;
        self.stream
            .finalize_retr_stream(data)
            .map_err(|e| map_ftp_error(e, filename))
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        self.stream.quit().map_err(|e| map_ftp_error(e, "QUIT"))
    }
}

/// Sort a client error into the transfer taxonomy. Server replies keep
/// their text as detail.
pub fn map_ftp_error(err: FtpError, filename: &str) -> TransferError {
    match err {
        FtpError::UnexpectedResponse(resp) => {
            let code = resp.status.code();
            let body = String::from_utf8_lossy(&resp.body).trim().to_string();
            let detail = if body.is_empty() { code.to_string() } else { body };
            TransferError::from_reply(code, detail, filename)
        }
        other => TransferError::unknown(filename, other),
    }
}
