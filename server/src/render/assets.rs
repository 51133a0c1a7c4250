//! Image sources for composition: background assets, QR files, and
//! embedded data URIs.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("not a data URI")]
    NotDataUri,
    #[error("data URI is not base64-encoded")]
    NotBase64,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("unsafe asset path: {0}")]
    UnsafePath(String),
}

/// Resolves and decodes the images a composition needs.
#[derive(Debug, Clone)]
pub struct AssetStore {
    asset_dir: PathBuf,
    qr_dir: PathBuf,
}

impl AssetStore {
    #[must_use]
    pub fn new(asset_dir: PathBuf, qr_dir: PathBuf) -> Self {
        Self { asset_dir, qr_dir }
    }

    /// Background asset by file name. Missing files are expected (the
    /// caller has a fallback) and only logged at debug.
    #[must_use]
    pub fn load_background(&self, name: &str) -> Option<RgbaImage> {
        match read_image(&self.asset_dir, name) {
            Ok(img) => Some(img),
            Err(AssetError::Io { path, source }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "background asset not found");
                None
            }
            Err(e) => {
                warn!(asset = name, error = %e, "background asset unusable");
                None
            }
        }
    }

    /// An image element's source. Only embedded data URIs are rasterizable.
    #[must_use]
    pub fn load_embedded(&self, source_ref: &str) -> Option<RgbaImage> {
        if !source_ref.starts_with("data:") {
            return None;
        }
        match decode_data_uri(source_ref).and_then(|bytes| decode_image(&bytes)) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(error = %e, "embedded image unusable");
                None
            }
        }
    }

    /// A QR code's source: a data URI, or a file under the QR asset root.
    #[must_use]
    pub fn load_qr(&self, source_ref: &str) -> Option<RgbaImage> {
        if source_ref.starts_with("data:") {
            return self.load_embedded(source_ref);
        }
        match read_image(&self.qr_dir, source_ref) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(source = source_ref, error = %e, "QR image unusable");
                None
            }
        }
    }
}

/// Payload bytes of a base64 `data:` URI.
///
/// # Errors
///
/// Rejects non-`data:` strings, non-base64 encodings, and bad base64.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let rest = uri.strip_prefix("data:").ok_or(AssetError::NotDataUri)?;
    let (meta, payload) = rest.split_once(',').ok_or(AssetError::NotDataUri)?;
    if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(AssetError::NotBase64);
    }
    Ok(STANDARD.decode(payload.trim())?)
}

fn decode_image(bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Read `name` from `root`, keeping only its final path component so a
/// reference can never escape the root.
fn read_image(root: &Path, name: &str) -> Result<RgbaImage, AssetError> {
    let file = safe_file_name(name).ok_or_else(|| AssetError::UnsafePath(name.to_owned()))?;
    let path = root.join(file);
    match std::fs::read(&path) {
        Ok(bytes) => decode_image(&bytes),
        Err(source) => Err(AssetError::Io { path, source }),
    }
}

/// Final component of a `/`- or `\`-separated reference, if it is a plain
/// file name.
#[must_use]
pub fn safe_file_name(reference: &str) -> Option<&str> {
    let name = reference.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name)
}

#[cfg(test)]
#[path = "assets_test.rs"]
mod tests;
