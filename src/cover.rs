// Optional cover image for the report.
//
// Fetching is best-effort: every failure becomes a `ResourceFetchError` and
// `resolve_cover` turns that into "no cover" with a warning.
use crate::config::CoverConfig;
use crate::error::ResourceFetchError;
use image::ImageFormat;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cover bytes ready to embed, always PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn decode_err<E: std::fmt::Display>(e: E) -> ResourceFetchError {
    ResourceFetchError::Decode(e.to_string())
}

/// Decode any supported image (PNG, JPEG, GIF, BMP, WebP). PNG input is kept
/// as-is; other formats are re-encoded to PNG.
pub fn decode_cover(bytes: Vec<u8>) -> Result<CoverImage, ResourceFetchError> {
    let format = image::guess_format(&bytes).map_err(decode_err)?;
    let decoded = image::load_from_memory_with_format(&bytes, format).map_err(decode_err)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(ResourceFetchError::Decode("empty image".into()));
    }
    let png = if format == ImageFormat::Png {
        bytes
    } else {
        debug!(?format, width, height, "re-encoding cover image as PNG");
        encode_png(&decoded.to_rgba8().into_raw(), width, height)?
    };
    Ok(CoverImage { png, width, height })
}

fn encode_png(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ResourceFetchError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder
            .write_header()
            .map_err(decode_err)?
            .write_image_data(rgba)
            .map_err(decode_err)?;
    }
    Ok(buffer)
}

pub fn load_cover(path: &Path) -> Result<CoverImage, ResourceFetchError> {
    decode_cover(std::fs::read(path)?)
}

pub fn fetch_cover(url: &str, timeout: Duration) -> Result<CoverImage, ResourceFetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()?;
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    decode_cover(bytes.to_vec())
}

/// Local path wins over URL. Any failure degrades to `None`.
pub fn resolve_cover(cfg: &CoverConfig) -> Option<CoverImage> {
    let result = if let Some(path) = &cfg.path {
        load_cover(path)
    } else if let Some(url) = &cfg.url {
        fetch_cover(url, Duration::from_secs(cfg.timeout_secs))
    } else {
        return None;
    };
    match result {
        Ok(cover) => {
            info!(width = cover.width, height = cover.height, "cover image ready");
            Some(cover)
        }
        Err(e) => {
            warn!(error = %e, "cover image unavailable, continuing without it");
            None
        }
    }
}
