use std::sync::Arc;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::assets::store::PreparedImage;
use crate::foundation::error::{AvatarError, AvatarResult};

/// Largest resample result in pixels (a 8192x8192 RGBA8 buffer is 256 MiB).
pub const MAX_SCALED_PIXELS: f64 = 8192.0 * 8192.0;

fn to_buffer(img: &PreparedImage) -> AvatarResult<RgbaImage> {
    RgbaImage::from_raw(img.width, img.height, img.rgba8_premul.to_vec())
        .ok_or_else(|| AvatarError::render("image buffer does not match its dimensions"))
}

fn from_buffer(buf: RgbaImage) -> PreparedImage {
    let (width, height) = buf.dimensions();
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(buf.into_raw()),
    }
}

/// Resample by independent horizontal and vertical factors.
///
/// Sizes are rounded to the nearest pixel. A result with a zero dimension, or one larger than
/// [`MAX_SCALED_PIXELS`], is an error.
pub fn scale_image(
    img: &PreparedImage,
    sx: f64,
    sy: f64,
    filter: FilterType,
) -> AvatarResult<PreparedImage> {
    if !(sx.is_finite() && sy.is_finite()) {
        return Err(AvatarError::render(format!("non-finite scale {sx}x{sy}")));
    }
    let w = (f64::from(img.width) * sx).round();
    let h = (f64::from(img.height) * sy).round();
    if !(w >= 1.0 && h >= 1.0) {
        return Err(AvatarError::render(format!(
            "scaling {}x{} by {sx}x{sy} gives a degenerate image",
            img.width, img.height
        )));
    }
    if w * h > MAX_SCALED_PIXELS {
        return Err(AvatarError::render(format!(
            "scaling {}x{} by {sx}x{sy} gives a {w}x{h} image, too large",
            img.width, img.height
        )));
    }
    let (w, h) = (w as u32, h as u32);
    if w == img.width && h == img.height {
        return Ok(img.clone());
    }

    let src = to_buffer(img)?;
    Ok(from_buffer(imageops::resize(&src, w, h, filter)))
}

/// Rotate counter-clockwise by whole degrees, growing the bounds to fit.
///
/// Right angles are exact pixel permutations; other angles use bilinear sampling.
pub fn rotate_image(img: &PreparedImage, degrees: i32) -> AvatarResult<PreparedImage> {
    let deg = degrees.rem_euclid(360);
    match deg {
        0 => return Ok(img.clone()),
        90 => return Ok(from_buffer(imageops::rotate270(&to_buffer(img)?))),
        180 => return Ok(from_buffer(imageops::rotate180(&to_buffer(img)?))),
        270 => return Ok(from_buffer(imageops::rotate90(&to_buffer(img)?))),
        _ => {}
    }
    if img.width == 0 || img.height == 0 {
        return Err(AvatarError::render("cannot rotate an empty image"));
    }

    let theta = f64::from(deg).to_radians();
    let (sin, cos) = theta.sin_cos();
    let w = f64::from(img.width);
    let h = f64::from(img.height);
    let out_w = (w * cos.abs() + h * sin.abs()).ceil().max(1.0) as u32;
    let out_h = (w * sin.abs() + h * cos.abs()).ceil().max(1.0) as u32;

    let src = img.rgba8_premul.as_slice();
    let (scx, scy) = (w / 2.0, h / 2.0);
    let (dcx, dcy) = (f64::from(out_w) / 2.0, f64::from(out_h) / 2.0);

    let mut out = vec![0u8; out_w as usize * out_h as usize * 4];
    for oy in 0..out_h {
        for ox in 0..out_w {
            let dx = f64::from(ox) + 0.5 - dcx;
            let dy = f64::from(oy) + 0.5 - dcy;
            // Inverse of a counter-clockwise turn in y-down coordinates.
            let sx = dx * cos - dy * sin + scx - 0.5;
            let sy = dx * sin + dy * cos + scy - 0.5;
            let px = sample_bilinear(src, img.width, img.height, sx, sy);
            let o = (oy as usize * out_w as usize + ox as usize) * 4;
            out[o..o + 4].copy_from_slice(&px);
        }
    }

    Ok(PreparedImage {
        width: out_w,
        height: out_h,
        rgba8_premul: Arc::new(out),
    })
}

fn sample_bilinear(src: &[u8], w: u32, h: u32, x: f64, y: f64) -> [u8; 4] {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let fetch = |px: i64, py: i64| -> [f64; 4] {
        if px < 0 || py < 0 || px >= i64::from(w) || py >= i64::from(h) {
            return [0.0; 4];
        }
        let i = (py as usize * w as usize + px as usize) * 4;
        [
            f64::from(src[i]),
            f64::from(src[i + 1]),
            f64::from(src[i + 2]),
            f64::from(src[i + 3]),
        ]
    };

    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/composite/transform.rs"]
mod tests;
