//! Archive download over HTTP.
//!
//! Provides a trait-based abstraction for retrieving archive bytes so that
//! the installer can be exercised without network access.

use std::io::Read;
use std::time::Duration;

/// Default network timeout for archive downloads.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for retrieving an archive by URL.
///
/// # Examples
///
/// ```
/// use formulary_installer::archive::download::HttpFetcher;
///
/// let fetcher = HttpFetcher::default();
/// // Use fetcher.fetch("https://...") in production
/// # let _ = fetcher;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Download the resource at `url` and return its bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails, the server answers with an
    /// error status, or the body cannot be read.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Errors arising from archive download operations.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested archive was not found (HTTP 404).
    #[error("archive not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error while reading the response body.
    #[error("I/O error reading download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based fetcher using `ureq`.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut body = response.into_body();
        let mut bytes = Vec::new();
        body.as_reader().read_to_end(&mut bytes)?;
        log::debug!("received {} bytes from {url}", bytes.len());
        Ok(bytes)
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
