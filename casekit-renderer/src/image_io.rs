//! Image decoding from bytes, files and data URIs.

use std::path::Path;

use base64::Engine as _;
use image::RgbaImage;

use crate::error::{RenderError, RenderResult};

/// Raster format detected from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl SniffedFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }
        Self::Unknown
    }

    /// Whether the bytes look like any supported raster image.
    #[must_use]
    pub fn is_image(data: &[u8]) -> bool {
        Self::from_magic_bytes(data) != Self::Unknown
    }
}

/// Decode an image from raw bytes into RGBA.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the bytes cannot be decoded.
pub fn load_from_bytes(data: &[u8], asset: &str) -> RenderResult<RgbaImage> {
    let img = image::load_from_memory(data).map_err(|e| RenderError::resource(asset, e))?;
    Ok(img.to_rgba8())
}

/// Decode an image from a file on disk.
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the file cannot be read or decoded.
pub fn load_from_path(path: &Path) -> RenderResult<RgbaImage> {
    let asset = path.display().to_string();
    let data = std::fs::read(path).map_err(|e| RenderError::resource(&asset, e))?;
    load_from_bytes(&data, &asset)
}

/// Decode an image from a base64 data URI
/// (`data:image/png;base64,iVBOR...`).
///
/// # Errors
///
/// Returns [`RenderError::Resource`] if the URI is malformed or the payload
/// cannot be decoded.
pub fn load_from_data_uri(uri: &str) -> RenderResult<RgbaImage> {
    const ASSET: &str = "data URI image";

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::resource(ASSET, "not a data URI"))?;
    let comma = rest
        .find(',')
        .ok_or_else(|| RenderError::resource(ASSET, "missing ',' separator"))?;
    let (meta, payload) = rest.split_at(comma);
    let payload = &payload[1..];

    if !meta.contains("base64") {
        return Err(RenderError::resource(ASSET, "only base64 data URIs are supported"));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| RenderError::resource(ASSET, e))?;
    load_from_bytes(&bytes, ASSET)
}

/// Encode an RGBA image as a PNG data URI.
///
/// # Errors
///
/// Returns [`RenderError::Encode`] if PNG encoding fails.
pub fn to_png_data_uri(image: &RgbaImage) -> RenderResult<String> {
    let mut buf = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(buf.into_inner());
    Ok(format!("data:image/png;base64,{encoded}"))
}
