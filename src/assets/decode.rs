use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context as _;
use image::AnimationDecoder as _;
use image::codecs::gif::GifDecoder;

use crate::assets::store::PreparedImage;
use crate::foundation::error::{AvatarError, AvatarResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Delay used for GIF frames that declare none.
pub const DEFAULT_GIF_FRAME_SECS: f64 = 0.1;

/// Decode any still image format `image` understands into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> AvatarResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Decode every frame of a GIF with its delay in seconds.
pub fn decode_gif(bytes: &[u8]) -> AvatarResult<Vec<(PreparedImage, f64)>> {
    let decoder = GifDecoder::new(Cursor::new(bytes)).context("open gif decoder")?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .context("decode gif frames")?;
    if frames.is_empty() {
        return Err(AvatarError::asset("gif has no frames"));
    }

    Ok(frames
        .into_iter()
        .map(|frame| {
            let (num, den) = frame.delay().numer_denom_ms();
            let ms = if den == 0 {
                0.0
            } else {
                f64::from(num) / f64::from(den)
            };
            let secs = if ms > 0.0 {
                ms / 1000.0
            } else {
                DEFAULT_GIF_FRAME_SECS
            };

            let buf = frame.into_buffer();
            let (width, height) = buf.dimensions();
            let mut data = buf.into_raw();
            premultiply_rgba8_in_place(&mut data);
            (
                PreparedImage {
                    width,
                    height,
                    rgba8_premul: Arc::new(data),
                },
                secs,
            )
        })
        .collect())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
