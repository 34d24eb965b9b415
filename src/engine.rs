//! Locate, download and bind the PDFium shared library.
//!
//! PDFium is resolved in this order:
//!
//! 1. the path in [`RenderConfig::pdfium_library`],
//! 2. `PDFIUM_LIB_PATH`,
//! 3. the per-user cache (`~/.cache/md2pdf/pdfium-{VERSION}/` on Linux),
//! 4. a download of the platform archive from
//!    [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//!    into that cache, when [`RenderConfig::allow_engine_download`] is set,
//! 5. the system library search path.
//!
//! The resolved path is remembered for the rest of the process so repeated
//! renders skip the lookup.

use crate::config::RenderConfig;
use crate::error::Md2PdfError;
use pdfium_render::prelude::Pdfium;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// The pdfium-binaries release tag used for downloads.
pub const PDFIUM_VERSION: &str = "7690";

const BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Overrides the cache root.
pub const CACHE_DIR_ENV: &str = "MD2PDF_PDFIUM_CACHE_DIR";

static RESOLVED_PATH: OnceLock<PathBuf> = OnceLock::new();

struct PlatformInfo {
    archive_name: &'static str,
    lib_path_in_archive: &'static str,
    lib_name: &'static str,
}

fn detect_platform() -> Option<PlatformInfo> {
    let archive_name = match (std::env::consts::OS, std::env::consts::ARCH) {
        ("macos", "aarch64") => "pdfium-mac-arm64.tgz",
        ("macos", "x86_64") => "pdfium-mac-x64.tgz",
        ("linux", "x86_64") => "pdfium-linux-x64.tgz",
        ("linux", "aarch64") => "pdfium-linux-arm64.tgz",
        ("windows", "x86_64") => "pdfium-win-x64.tgz",
        ("windows", "aarch64") => "pdfium-win-arm64.tgz",
        ("windows", "x86") => "pdfium-win-x86.tgz",
        _ => return None,
    };
    let (lib_path_in_archive, lib_name) = match std::env::consts::OS {
        "macos" => ("lib/libpdfium.dylib", "libpdfium.dylib"),
        "windows" => ("bin/pdfium.dll", "pdfium.dll"),
        _ => ("lib/libpdfium.so", "libpdfium.so"),
    };
    Some(PlatformInfo {
        archive_name,
        lib_path_in_archive,
        lib_name,
    })
}

/// Per-version cache directory for the downloaded library.
pub fn cache_dir() -> PathBuf {
    let version_dir = format!("pdfium-{PDFIUM_VERSION}");
    if let Ok(root) = std::env::var(CACHE_DIR_ENV) {
        return PathBuf::from(root).join(version_dir);
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("md2pdf")
        .join(version_dir)
}

/// Bind PDFium for one render.
pub fn bind(config: &RenderConfig) -> Result<Pdfium, Md2PdfError> {
    match locate_library(config.pdfium_library.as_deref(), config.allow_engine_download)? {
        Some(path) => bind_from_path(&path),
        None => {
            debug!("Binding to system pdfium library");
            Pdfium::bind_to_system_library()
                .map(Pdfium::new)
                .map_err(|e| Md2PdfError::EngineBindingFailed(format!("system library: {e}")))
        }
    }
}

/// Bind to the library at an explicit `path`.
pub fn bind_from_path(path: &Path) -> Result<Pdfium, Md2PdfError> {
    debug!("Binding to pdfium at {}", path.display());
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| Md2PdfError::EngineBindingFailed(format!("'{}': {e}", path.display())))
}

/// Find a library file, downloading it when allowed.
///
/// `Ok(None)` means no file was found and the system library should be
/// tried.
pub fn locate_library(
    explicit: Option<&Path>,
    allow_download: bool,
) -> Result<Option<PathBuf>, Md2PdfError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Md2PdfError::EngineBindingFailed(format!(
            "configured pdfium library '{}' does not exist",
            path.display()
        )));
    }

    if let Some(path) = RESOLVED_PATH.get() {
        return Ok(Some(path.clone()));
    }

    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let p = PathBuf::from(env_path);
        if p.is_file() {
            return Ok(Some(remember(p)));
        }
        warn!("PDFIUM_LIB_PATH '{}' not found, falling back", p.display());
    }

    let Some(platform) = detect_platform() else {
        warn!(
            "No prebuilt pdfium for {}/{}, using the system library",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        return Ok(None);
    };

    let dir = cache_dir();
    let lib_path = dir.join(platform.lib_name);
    if lib_path.is_file() {
        return Ok(Some(remember(lib_path)));
    }

    if !allow_download {
        debug!("pdfium not cached and download disabled");
        return Ok(None);
    }

    let url = format!(
        "{}/chromium%2F{}/{}",
        BASE_URL, PDFIUM_VERSION, platform.archive_name
    );
    info!("Downloading pdfium {} to {}", PDFIUM_VERSION, dir.display());
    std::fs::create_dir_all(&dir).map_err(|e| {
        Md2PdfError::EngineDownloadFailed(format!("cannot create {}: {e}", dir.display()))
    })?;
    let archive = download_bytes(&url)?;
    extract_library(&archive, platform.lib_path_in_archive, &lib_path)?;
    Ok(Some(remember(lib_path)))
}

fn remember(path: PathBuf) -> PathBuf {
    let _ = RESOLVED_PATH.set(path.clone());
    path
}

fn download_bytes(url: &str) -> Result<Vec<u8>, Md2PdfError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("edgequake-md2pdf/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| Md2PdfError::EngineDownloadFailed(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|e| Md2PdfError::EngineDownloadFailed(format!("GET {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(Md2PdfError::EngineDownloadFailed(format!(
            "HTTP {} for {url}",
            response.status()
        )));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(35 * 1024 * 1024) as usize);
    response
        .read_to_end(&mut buf)
        .map_err(|e| Md2PdfError::EngineDownloadFailed(format!("read error: {e}")))?;
    debug!("Downloaded {} bytes of pdfium archive", buf.len());
    Ok(buf)
}

/// Extract a single file from a gzipped tar archive into `dest_path`.
fn extract_library(
    archive_bytes: &[u8],
    lib_path_in_archive: &str,
    dest_path: &Path,
) -> Result<(), Md2PdfError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let extract_err =
        |e: std::io::Error| Md2PdfError::EngineDownloadFailed(format!("extract: {e}"));
    let mut archive = Archive::new(GzDecoder::new(archive_bytes));

    for entry in archive.entries().map_err(extract_err)? {
        let mut entry = entry.map_err(extract_err)?;
        let matches = entry.path().map_err(extract_err)?.to_string_lossy() == lib_path_in_archive;
        if matches {
            entry.unpack(dest_path).map_err(extract_err)?;
            return Ok(());
        }
    }

    Err(Md2PdfError::EngineDownloadFailed(format!(
        "library '{lib_path_in_archive}' not found in archive"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn archive_with(path: &str, body: &[u8]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, body).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn extracts_named_entry() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("libpdfium.so");
        let archive = archive_with("lib/libpdfium.so", b"ELF");
        extract_library(&archive, "lib/libpdfium.so", &dest).unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"ELF");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let archive = archive_with("README", b"hi");
        let err = extract_library(&archive, "lib/libpdfium.so", &dir.path().join("x")).unwrap_err();
        assert!(matches!(err, Md2PdfError::EngineDownloadFailed(_)));
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = locate_library(Some(Path::new("/nonexistent/libpdfium.so")), false).unwrap_err();
        assert!(matches!(err, Md2PdfError::EngineBindingFailed(_)));
    }

    #[test]
    fn explicit_path_is_used_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = locate_library(Some(file.path()), false).unwrap();
        assert_eq!(found.as_deref(), Some(file.path()));
    }

    #[test]
    fn cache_dir_is_versioned() {
        assert!(cache_dir().ends_with(format!("pdfium-{PDFIUM_VERSION}")));
    }
}
