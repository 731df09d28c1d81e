//! Texture data as a cacheable resource
//!
//! Images are decoded with the `image` crate and converted to RGBA8.

use std::path::Path;

use phantasm_core::{BoxError, Resource};

/// Decoded RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Row-major pixels, four bytes each
    pub rgba: Vec<u8>,
}

impl Resource for TextureData {}

impl TextureData {
    /// Decode an encoded image (PNG) held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BoxError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self {
            width,
            height,
            rgba: image.into_raw(),
        })
    }

    /// Single-color texture, useful as a fallback
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let rgba = color.repeat((width * height) as usize);
        Self { width, height, rgba }
    }

    /// RGBA of the pixel at (x, y), if inside the texture
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Resource loader for image files
pub fn load_texture(path: &Path) -> Result<TextureData, BoxError> {
    log::debug!("Decoding texture {}", path.display());
    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(TextureData {
        width,
        height,
        rgba: image.into_raw(),
    })
}
