use std::sync::Arc;

use anyhow::Context as _;
use image::ImageEncoder as _;
use image::codecs::png::PngEncoder;

use crate::foundation::core::Canvas;
use crate::foundation::error::AvatarResult;
use crate::foundation::math::unpremultiply_rgba8_in_place;

/// A composited RGBA8 frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Tightly packed RGBA8 pixels, row-major.
    pub data: Vec<u8>,
    /// Whether `data` holds premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Fully transparent premultiplied frame covering `canvas`.
    pub fn transparent(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data: vec![0; canvas.byte_len()],
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)` as stored, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data
            .get(i..i + 4)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Encode as a straight-alpha RGBA8 PNG.
    pub fn encode_png(&self) -> AvatarResult<Arc<[u8]>> {
        let mut straight = self.data.clone();
        if self.premultiplied {
            unpremultiply_rgba8_in_place(&mut straight);
        }

        let mut out = Vec::with_capacity(straight.len() / 4 + 64);
        PngEncoder::new(&mut out)
            .write_image(
                &straight,
                self.width,
                self.height,
                image::ExtendedColorType::Rgba8,
            )
            .with_context(|| format!("encode {}x{} png", self.width, self.height))?;
        Ok(Arc::from(out))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/frame.rs"]
mod tests;
