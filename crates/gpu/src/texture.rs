use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageReader, Rgba, RgbaImage};

/// Side length of the generated placeholder texture.
pub const PLACEHOLDER_SIZE: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub reason: String,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "image decode failed: {}", self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// CPU-side RGBA image ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pixels: RgbaImage,
    placeholder: bool,
}

impl DecodedImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            placeholder: false,
        }
    }

    /// Fully transparent texture shown on cells without a photo.
    pub fn placeholder() -> Self {
        Self {
            pixels: RgbaImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Rgba([255, 255, 255, 0])),
            placeholder: true,
        }
    }

    /// Decodes any still image format the `image` crate recognises.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError {
                reason: "empty payload".to_string(),
            });
        }
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| DecodeError {
                reason: format!("failed to guess format: {e}"),
            })?;
        let img = reader.decode().map_err(|e| DecodeError {
            reason: e.to_string(),
        })?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Downscales so neither side exceeds `max_dim`, keeping aspect ratio.
    pub fn fit_within(self, max_dim: u32) -> Self {
        let (w, h) = (self.width(), self.height());
        if max_dim == 0 || (w <= max_dim && h <= max_dim) {
            return self;
        }
        let scale = max_dim as f64 / w.max(h) as f64;
        let nw = ((w as f64 * scale).round() as u32).max(1);
        let nh = ((h as f64 * scale).round() as u32).max(1);
        Self {
            pixels: image::imageops::resize(&self.pixels, nw, nh, FilterType::Triangle),
            placeholder: self.placeholder,
        }
    }
}
