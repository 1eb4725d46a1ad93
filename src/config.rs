use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "ftp.bmrb.io";
pub const DEFAULT_REMOTE_DIR: &str = "pdb/holdings";
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Where and how workers fetch files. Passed to every worker at dispatch.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub remote_dir: String,
    pub chunk_size: usize,
    pub timeout_secs: u64,
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 21,
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_secs: 30,
        }
    }
}

impl FtpConfig {
    /// Read a TOML file. A missing file yields defaults, a malformed one is an error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config file {:?}", path))
            }
        };
        let config: FtpConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
