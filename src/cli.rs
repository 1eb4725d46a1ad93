use clap::Parser;
use std::path::PathBuf;

use crate::config::FtpConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download files from an FTP server with live progress", long_about = None)]
pub struct Args {
    /// FTP URLs to download (must start with ftp://)
    #[arg(index = 1)]
    pub urls: Vec<String>,

    /// Path to a file containing URLs (one per line)
    #[arg(short = 't', long = "tasks-file")]
    pub tasks_file: Option<PathBuf>,

    /// Read URLs from stdin, one per line (default when no URL or tasks file is given)
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Directory to save downloaded files (defaults to "downloads" next to the executable)
    #[arg(short = 'd', long = "download-dir")]
    pub download_dir: Option<PathBuf>,

    /// Maximum number of concurrent downloads (defaults to number of logical CPUs)
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// TOML file with host, port, remote_dir, chunk_size and timeout_secs
    #[arg(long, default_value = "ftpdl.toml")]
    pub config: PathBuf,

    /// FTP server to fetch from
    #[arg(long)]
    pub host: Option<String>,

    /// FTP control port
    #[arg(long)]
    pub port: Option<u16>,

    /// Remote directory holding the files
    #[arg(long = "remote-dir")]
    pub remote_dir: Option<String>,

    /// Bytes per read; progress is reported once per chunk
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<usize>,

    /// Blocking I/O timeout in seconds for the control connection
    #[arg(long = "timeout")]
    pub timeout_secs: Option<u64>,

    /// List downloaded files and exit
    #[arg(short = 'l', long)]
    pub list: bool,
}

impl Args {
    /// Layer command-line overrides on top of a loaded config.
    pub fn apply_overrides(&self, mut config: FtpConfig) -> FtpConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.remote_dir {
            config.remote_dir = dir.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        config
    }

    pub fn wants_interactive(&self) -> bool {
        self.interactive || (self.urls.is_empty() && self.tasks_file.is_none())
    }
}
