//! Error types for the edgequake-md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the render cannot proceed at all
//!   (unreadable input, invalid configuration, PDFium unavailable, a drawing
//!   call rejected by the PDF engine). Returned as `Err(Md2PdfError)` from the
//!   top-level `render*` functions.
//!
//! * [`DiagramError`] — **Non-fatal**: one step of the diagram fallback chain
//!   failed (asset missing, bad image bytes, network timeout). Stored inside
//!   [`crate::output::DiagramReport`] so callers can see why a placeholder was
//!   drawn instead of the real diagram.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-md2pdf library.
///
/// Diagram resolution failures use [`DiagramError`] and are recorded in
/// [`crate::output::DiagramReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Input file exists but could not be read as UTF-8 text.
    #[error("Failed to read input '{path}': {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    EngineBindingFailed(String),

    /// Downloading or unpacking the pdfium archive failed.
    #[error("Failed to fetch the pdfium library: {0}")]
    EngineDownloadFailed(String),

    // ── Drawing errors ────────────────────────────────────────────────────
    /// The PDF engine rejected a drawing or serialisation call.
    #[error("PDF drawing failed on page {page}: {detail}")]
    DrawFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the scratch directory for downloaded diagrams.
    #[error("Failed to create scratch directory: {0}")]
    ScratchDir(#[source] std::io::Error),

    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a swallowed diagram failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// A local diagram image or dependent file is absent.
    AssetMissing,
    /// A file or network response is not a usable image.
    MalformedAsset,
    /// Timeout, connection failure or error status from the remote renderer.
    TransientNetwork,
}

/// A non-fatal failure of one diagram fallback step.
///
/// The resolver always falls through to the next step; the final placeholder
/// step cannot produce one of these.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum DiagramError {
    /// No pre-rendered asset is configured for this diagram kind.
    #[error("no local asset configured for '{kind}' diagrams")]
    AssetNotConfigured { kind: String },

    /// The configured asset file does not exist.
    #[error("diagram asset not found: '{path}'")]
    AssetMissing { path: PathBuf },

    /// The asset exists but could not be decoded as an image.
    #[error("diagram asset '{path}' is not a loadable image: {detail}")]
    MalformedAsset { path: PathBuf, detail: String },

    /// Remote rendering is switched off in the configuration.
    #[error("remote diagram rendering is disabled")]
    RemoteDisabled,

    /// Connection-level failure talking to the diagram service.
    #[error("diagram service request failed: {detail}")]
    Network { detail: String },

    /// The diagram service did not answer within the timeout.
    #[error("diagram service timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The diagram service answered with a non-success status.
    #[error("diagram service returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// The response body does not start with a known image signature.
    #[error("diagram service response is not an image (first bytes: {magic:02x?})")]
    NotAnImage { magic: Vec<u8> },

    /// The downloaded image could not be written to the scratch directory.
    #[error("failed to persist downloaded diagram: {detail}")]
    ScratchWrite { detail: String },

    /// The image was fetched but could not be placed on the page.
    #[error("failed to place diagram image: {detail}")]
    Placement { detail: String },
}

impl DiagramError {
    /// Map the error onto the asset-missing / malformed-asset /
    /// transient-network taxonomy.
    pub fn category(&self) -> FailureCategory {
        match self {
            // A disabled renderer leaves the remote image as absent as a
            // missing local file.
            DiagramError::AssetNotConfigured { .. }
            | DiagramError::AssetMissing { .. }
            | DiagramError::RemoteDisabled => FailureCategory::AssetMissing,
            DiagramError::MalformedAsset { .. }
            | DiagramError::NotAnImage { .. }
            | DiagramError::ScratchWrite { .. }
            | DiagramError::Placement { .. } => FailureCategory::MalformedAsset,
            DiagramError::Network { .. }
            | DiagramError::Timeout { .. }
            | DiagramError::HttpStatus { .. } => FailureCategory::TransientNetwork,
        }
    }
}
