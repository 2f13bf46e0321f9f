// HTTP access for the installer engine: fetching listing pages / release documents and
// streaming installer artifacts to disk. The `HttpClient` trait is the seam the
// resolver and orchestrator depend on; `UreqClient` is the production implementation.

use crate::libs::run_context::CancelToken;
use crate::log_debug;
use crate::schemas::config::NetworkConfig;
use crate::schemas::errors::InstallError;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

// Read size for artifact downloads. The cancel token is checked between reads.
const COPY_CHUNK: usize = 64 * 1024;

/// A fetched text document together with the URL it was finally served from
/// (after redirects). Relative links on the page resolve against `final_url`.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

pub trait HttpClient {
    /// GETs a text document. Any non-2xx status is a `Fetch` error.
    fn get_text(&self, url: &str) -> Result<FetchedPage, InstallError>;

    /// Streams `url` into `dest`, returning the number of bytes written. A partially
    /// written file is removed on failure.
    ///
    /// Returns `InstallError::Cancelled` soon after `cancel` fires, without waiting for
    /// the transfer to finish.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
    ) -> Result<u64, InstallError>;
}

/// Blocking client backed by `ureq`, with separate agents (and timeouts) for
/// listing fetches and for artifact downloads.
pub struct UreqClient {
    listing_agent: ureq::Agent,
    download_agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(network: &NetworkConfig) -> Self {
        let build = |timeout_secs: u64| {
            ureq::AgentBuilder::new()
                .user_agent(&network.user_agent)
                .timeout_connect(Duration::from_secs(timeout_secs.min(30)))
                .timeout(Duration::from_secs(timeout_secs))
                .redirects(10)
                .build()
        };
        UreqClient {
            listing_agent: build(network.fetch_timeout_secs),
            download_agent: build(network.download_timeout_secs),
        }
    }

    fn call(agent: &ureq::Agent, url: &str) -> Result<ureq::Response, InstallError> {
        let fetch_error = |reason: String| InstallError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = match agent.get(url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(fetch_error(format!("HTTP {} {}", code, response.status_text())));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(fetch_error(transport.to_string()));
            }
        };
        if !(200..300).contains(&response.status()) {
            return Err(fetch_error(format!("unexpected HTTP status {}", response.status())));
        }
        Ok(response)
    }
}

/// Copies `reader` into `writer` chunk by chunk.
///
/// # Returns
/// * `Ok(Some(bytes))` once the reader is exhausted.
/// * `Ok(None)` if `cancel` fired before the copy finished.
/// * `Err(_)` on a read or write failure.
fn copy_until_cancelled(
    reader: &mut impl Read,
    writer: &mut impl Write,
    cancel: &CancelToken,
) -> io::Result<Option<u64>> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let read = match reader.read(&mut buf) {
            Ok(0) => return Ok(Some(total)),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..read])?;
        total += read as u64;
    }
}

impl HttpClient for UreqClient {
    fn get_text(&self, url: &str) -> Result<FetchedPage, InstallError> {
        log_debug!("[Http] GET {}", url);
        let response = Self::call(&self.listing_agent, url)?;
        let final_url = response.get_url().to_string();
        let body = response.into_string().map_err(|e| InstallError::Fetch {
            url: url.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;
        Ok(FetchedPage { final_url, body })
    }

    fn download(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancelToken,
    ) -> Result<u64, InstallError> {
        log_debug!("[Http] Downloading {} to {}", url, dest.display());
        let response = Self::call(&self.download_agent, url)?;

        let mut file = File::create(dest).map_err(|source| InstallError::Io {
            context: format!("failed to create {}", dest.display()),
            source,
        })?;
        let mut reader = response.into_reader();
        let copied = copy_until_cancelled(&mut reader, &mut file, cancel);

        // Anything short of a complete copy leaves no file behind.
        if !matches!(copied, Ok(Some(_))) {
            drop(file);
            let _ = fs::remove_file(dest);
        }
        match copied {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => {
                log_debug!("[Http] Download of {} cancelled", url);
                Err(InstallError::Cancelled)
            }
            Err(e) => Err(InstallError::Fetch {
                url: url.to_string(),
                reason: format!("download interrupted: {e}"),
            }),
        }
    }
}
