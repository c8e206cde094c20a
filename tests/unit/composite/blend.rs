use std::sync::Arc;

use super::*;
use crate::foundation::core::Canvas;

fn solid(width: u32, height: u32, px: [u8; 4]) -> PreparedImage {
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(px.repeat((width * height) as usize)),
    }
}

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_dst_transparent_returns_src() {
    let dst = [0, 0, 0, 0];
    let src = [100, 110, 120, 200];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn blit_clips_to_frame() {
    let mut frame = FrameRGBA::transparent(Canvas::new(3, 3).unwrap());
    let img = solid(2, 2, [255, 0, 0, 255]);

    assert_eq!(blit_over(&mut frame, &img, -1, -1), 1);
    assert_eq!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(1, 0), Some([0, 0, 0, 0]));
    assert_eq!(frame.pixel(0, 1), Some([0, 0, 0, 0]));

    assert_eq!(blit_over(&mut frame, &img, 2, 2), 1);
    assert_eq!(frame.pixel(2, 2), Some([255, 0, 0, 255]));
}

#[test]
fn blit_outside_touches_nothing() {
    let mut frame = FrameRGBA::transparent(Canvas::new(3, 3).unwrap());
    let img = solid(2, 2, [255, 255, 255, 255]);
    assert_eq!(blit_over(&mut frame, &img, 3, 0), 0);
    assert_eq!(blit_over(&mut frame, &img, -2, 0), 0);
    assert_eq!(blit_over(&mut frame, &img, 0, -5), 0);
    assert!(frame.data.iter().all(|b| *b == 0));
}

#[test]
fn later_blits_stack_on_top() {
    let mut frame = FrameRGBA::transparent(Canvas::new(1, 1).unwrap());
    blit_over(&mut frame, &solid(1, 1, [255, 0, 0, 255]), 0, 0);
    blit_over(&mut frame, &solid(1, 1, [0, 0, 128, 128]), 0, 0);
    assert_eq!(frame.pixel(0, 0), Some([127, 0, 128, 255]));
}

#[test]
fn half_black_fill_darkens_opaque_white() {
    let mut frame = FrameRGBA::transparent(Canvas::new(2, 1).unwrap());
    frame.data.fill(255);
    fill_over(&mut frame, [0, 0, 0, 128]);
    assert_eq!(frame.pixel(0, 0), Some([127, 127, 127, 255]));
    assert_eq!(frame.pixel(1, 0), Some([127, 127, 127, 255]));
}
