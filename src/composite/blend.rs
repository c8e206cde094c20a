use crate::assets::store::PreparedImage;
use crate::composite::frame::FrameRGBA;
use crate::foundation::math::mul_div255_u8;

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra opacity factor.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Composite `img` onto `frame` with its top-left corner at `(x, y)`, clipped to the frame.
///
/// Returns the number of pixels touched; zero when the image lies fully outside.
pub fn blit_over(frame: &mut FrameRGBA, img: &PreparedImage, x: i64, y: i64) -> usize {
    let fw = i64::from(frame.width);
    let fh = i64::from(frame.height);
    let iw = i64::from(img.width);
    let ih = i64::from(img.height);

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + iw).min(fw);
    let y1 = (y + ih).min(fh);
    if x0 >= x1 || y0 >= y1 {
        return 0;
    }

    let src = img.rgba8_premul.as_slice();
    let span = (x1 - x0) as usize;
    for dy in y0..y1 {
        let sy = (dy - y) as usize;
        let sx = (x0 - x) as usize;
        let s_off = (sy * img.width as usize + sx) * 4;
        let d_off = (dy as usize * frame.width as usize + x0 as usize) * 4;

        let src_row = &src[s_off..s_off + span * 4];
        let dst_row = &mut frame.data[d_off..d_off + span * 4];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            if s[3] == 0 {
                continue;
            }
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], 1.0);
            d.copy_from_slice(&out);
        }
    }
    span * (y1 - y0) as usize
}

/// Composite a solid premultiplied color over the whole frame.
pub fn fill_over(frame: &mut FrameRGBA, color: PremulRgba8) {
    if color[3] == 0 {
        return;
    }
    for d in frame.data.chunks_exact_mut(4) {
        let out = over([d[0], d[1], d[2], d[3]], color, 1.0);
        d.copy_from_slice(&out);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composite/blend.rs"]
mod tests;
