use crate::error::ValidationError;
use url::Url;

pub const FTP_SCHEME_PREFIX: &str = "ftp://";

/// One accepted URL, ready to hand to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub filename: String,
    pub identifier: String,
}

impl DownloadRequest {
    /// Validate `url` and derive its filename and identifier.
    /// `sequence` is the number of requests accepted before this one.
    pub fn parse(url: &str, sequence: usize) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() || !url.starts_with(FTP_SCHEME_PREFIX) {
            return Err(ValidationError::InvalidScheme(url.to_string()));
        }

        let filename = filename_from_url(url).to_string();
        let identifier = format!("{}_{}", sequence, filename);
        Ok(Self {
            url: url.to_string(),
            filename,
            identifier,
        })
    }

    /// Host named in the URL, if it parses.
    pub fn url_host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// Text after the last `/`. Empty when the URL ends with a slash.
pub fn filename_from_url(url: &str) -> &str {
    match url.rfind('/') {
        Some(idx) => &url[idx + 1..],
        None => url,
    }
}
