//! Texture image loading
//!
//! Decodes image files into tightly packed RGBA8 pixel data ready for
//! uploading to a staging buffer.

use std::path::Path;

use crate::assets::AssetError;

/// Decoded image pixels in RGBA8 layout
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Pixel bytes, row major, 4 bytes per pixel
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load and decode an image file, converting to RGBA8
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let decoded = image::open(path.as_ref())?.to_rgba8();
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(AssetError::InvalidData(format!(
                "{} decoded to a zero-sized image",
                path.as_ref().display()
            )));
        }

        log::debug!(
            "Loaded texture: {}x{} ({} bytes)",
            width,
            height,
            decoded.len()
        );
        Ok(Self {
            pixels: decoded.into_raw(),
            width,
            height,
        })
    }

    /// Total size of the pixel data in bytes
    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A PNG written to disk decodes to the expected RGBA8 layout.
    #[test]
    fn decodes_png_to_rgba8() {
        let dir = std::env::temp_dir().join("render_engine_image_load_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.png");

        let mut buffer = image::RgbaImage::new(2, 2);
        buffer.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        buffer.put_pixel(1, 1, image::Rgba([0, 0, 255, 255]));
        buffer.save(&path).unwrap();

        let data = ImageData::load(&path).unwrap();
        assert_eq!(data.width, 2);
        assert_eq!(data.height, 2);
        assert_eq!(data.byte_size(), 16);
        assert_eq!(&data.pixels[0..4], &[255, 0, 0, 255]);

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    /// A missing file surfaces as an error instead of a panic.
    #[test]
    fn missing_file_is_an_error() {
        let result = ImageData::load("definitely/not/a/real/texture.png");
        assert!(result.is_err());
    }
}
