use std::io::Cursor;

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, RgbaImage};

use super::*;

fn gif_bytes(delays_ms: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut enc = GifEncoder::new(&mut buf);
        let frames = delays_ms.iter().enumerate().map(|(i, ms)| {
            let shade = (i as u8).wrapping_mul(60);
            let img = RgbaImage::from_pixel(2, 2, image::Rgba([shade, 0, 0, 255]));
            Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(*ms, 1))
        });
        enc.encode_frames(frames).unwrap();
    }
    buf
}

#[test]
fn decode_image_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn garbage_is_rejected() {
    assert!(decode_image(b"not an image").is_err());
    assert!(decode_gif(b"GIF89a").is_err());
}

#[test]
fn gif_frames_keep_their_delays() {
    let frames = decode_gif(&gif_bytes(&[50, 200])).unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!((frames[0].0.width, frames[0].0.height), (2, 2));
    assert!((frames[0].1 - 0.05).abs() < 1e-9);
    assert!((frames[1].1 - 0.2).abs() < 1e-9);
}

#[test]
fn zero_gif_delay_becomes_default() {
    let frames = decode_gif(&gif_bytes(&[0, 0])).unwrap();
    assert!(frames.iter().all(|(_, d)| *d == DEFAULT_GIF_FRAME_SECS));
}
