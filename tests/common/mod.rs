#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ftpdl::config::FtpConfig;
use ftpdl::error::TransferError;
use ftpdl::ftp::{Connector, Session};

pub mod loopback;

pub const REMOTE_DIR: &str = "holdings";

pub fn test_config(chunk_size: usize) -> FtpConfig {
    FtpConfig {
        host: "ftp.example.org".into(),
        remote_dir: REMOTE_DIR.into(),
        chunk_size,
        ..FtpConfig::default()
    }
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// An FTP server that lives in memory and serves one directory.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    files: Arc<HashMap<String, Vec<u8>>>,
    login_error: Option<TransferError>,
    fail_after: Option<usize>,
    read_step: Option<usize>,
    read_delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    pub max_active: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn with_files(files: &[(&str, Vec<u8>)]) -> Self {
        Self {
            files: Arc::new(
                files
                    .iter()
                    .map(|(name, data)| (name.to_string(), data.clone()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn refuse_login(mut self, error: TransferError) -> Self {
        self.login_error = Some(error);
        self
    }

    /// Break the data connection after `bytes` have been sent.
    pub fn fail_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    /// Deliver at most `step` bytes per read call.
    pub fn read_step(mut self, step: usize) -> Self {
        self.read_step = Some(step);
        self
    }

    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }
}

pub struct MemorySession {
    server: MemoryConnector,
    in_dir: bool,
}

impl Connector for MemoryConnector {
    type Session = MemorySession;

    fn connect(&self, _config: &FtpConfig) -> Result<MemorySession, TransferError> {
        if let Some(err) = &self.login_error {
            return Err(err.clone());
        }
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(MemorySession {
            server: self.clone(),
            in_dir: false,
        })
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.server.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Session for MemorySession {
    fn cwd(&mut self, dir: &str) -> Result<(), TransferError> {
        if dir == REMOTE_DIR {
            self.in_dir = true;
            Ok(())
        } else {
            Err(TransferError::Permission(format!("550 {}: No such file or directory", dir)))
        }
    }

    fn size(&mut self, filename: &str) -> Result<u64, TransferError> {
        match self.server.files.get(filename) {
            Some(data) if self.in_dir => Ok(data.len() as u64),
            _ => Err(TransferError::FileNotFound(filename.to_string())),
        }
    }

    fn retrieve(
        &mut self,
        filename: &str,
        consume: &mut dyn FnMut(&mut dyn Read) -> Result<(), TransferError>,
    ) -> Result<(), TransferError> {
        let data = self
            .server
            .files
            .get(filename)
            .ok_or_else(|| TransferError::Permission(format!("550 {}: not found", filename)))?;
        let mut reader = MemoryReader {
            data,
            sent: 0,
            step: self.server.read_step.unwrap_or(usize::MAX),
            fail_after: self.server.fail_after,
            delay: self.server.read_delay,
        };
        consume(&mut reader)
    }

    fn quit(&mut self) -> Result<(), TransferError> {
        Ok(())
    }
}

struct MemoryReader<'a> {
    data: &'a [u8],
    sent: usize,
    step: usize,
    fail_after: Option<usize>,
    delay: Option<Duration>,
}

impl Read for MemoryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some(limit) = self.fail_after {
            if self.sent >= limit {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer"));
            }
        }
        let remaining = &self.data[self.sent..];
        let mut n = remaining.len().min(buf.len()).min(self.step);
        if let Some(limit) = self.fail_after {
            n = n.min(limit - self.sent);
        }
        buf[..n].copy_from_slice(&remaining[..n]);
        self.sent += n;
        Ok(n)
    }
}
