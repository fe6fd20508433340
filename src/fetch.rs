//! HTTP downloads.
//!
//! Used for the package manager's bootstrap installer script and for the
//! repository archive fallback. Bodies are streamed straight to disk.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Downloads URLs to files.
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default 5-minute timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(300))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("groundwork/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, timeout })
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Download `url` into `dest`, replacing it.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::debug!("Downloading {} to {}", url, dest.display());
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("HTTP {} fetching {}", response.status(), url);
        }

        let mut file = File::create(dest)
            .with_context(|| format!("Cannot create {}", dest.display()))?;
        let bytes = response
            .copy_to(&mut file)
            .with_context(|| format!("Download of {} was interrupted", url))?;
        file.flush()?;

        tracing::debug!("Downloaded {} bytes from {}", bytes, url);
        Ok(bytes)
    }
}

/// Download with a default fetcher.
pub fn download(url: &str, dest: &Path) -> Result<()> {
    HttpFetcher::new()?.download(url, dest).map(|_| ())
}
