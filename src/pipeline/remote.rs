//! Remote diagram rendering via a Mermaid-ink compatible service.
//!
//! The diagram source travels inside the URL as URL-safe base64, so a plain
//! GET is enough. Responses are checked for a PNG or JPEG signature before
//! they are trusted, and stored in the render's scratch directory under a
//! content-hash file name so identical diagrams share one file.

use crate::config::RemoteConfig;
use crate::error::DiagramError;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Fetches a rendered image for a diagram source.
///
/// Implementations return the raw response body; signature checks happen in
/// [`persist_image`].
pub trait DiagramFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, DiagramError>;
}

/// Blocking HTTP client for a Mermaid-ink style endpoint.
pub struct MermaidInkFetcher {
    client: reqwest::blocking::Client,
    endpoint: String,
    query: String,
    timeout_secs: u64,
}

impl MermaidInkFetcher {
    pub fn new(config: &RemoteConfig) -> Result<Self, DiagramError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DiagramError::Network {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            query: config.query.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

impl DiagramFetcher for MermaidInkFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>, DiagramError> {
        let url = diagram_url(&self.endpoint, &self.query, source);
        debug!("Fetching diagram ({} source bytes)", source.len());

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_timeout() {
                DiagramError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                DiagramError::Network {
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiagramError::HttpStatus {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| DiagramError::Network {
                detail: e.to_string(),
            })
    }
}

/// Build the request URL: `{endpoint}/{urlsafe-base64(source)}?{query}`.
pub fn diagram_url(endpoint: &str, query: &str, source: &str) -> String {
    let encoded = URL_SAFE.encode(source.as_bytes());
    let base = endpoint.trim_end_matches('/');
    if query.is_empty() {
        format!("{base}/{encoded}")
    } else {
        format!("{base}/{encoded}?{query}")
    }
}

/// Identify a PNG or JPEG by its leading bytes.
pub fn sniff_image_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(PNG_SIGNATURE) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Scratch file name derived from the diagram source.
pub fn scratch_file_name(source: &str, format: ImageFormat) -> String {
    let digest = hex::encode(Sha256::digest(source.as_bytes()));
    let ext = if format == ImageFormat::Jpeg { "jpg" } else { "png" };
    format!("mermaid_{}.{ext}", &digest[..16])
}

/// Check the signature of a fetched body and write it into `scratch_dir`.
pub fn persist_image(
    bytes: &[u8],
    source: &str,
    scratch_dir: &Path,
) -> Result<(PathBuf, ImageFormat), DiagramError> {
    let format = sniff_image_format(bytes).ok_or_else(|| DiagramError::NotAnImage {
        magic: bytes.iter().take(8).copied().collect(),
    })?;
    let path = scratch_dir.join(scratch_file_name(source, format));
    std::fs::write(&path, bytes).map_err(|e| DiagramError::ScratchWrite {
        detail: format!("{}: {e}", path.display()),
    })?;
    Ok((path, format))
}
