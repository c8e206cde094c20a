use super::*;

fn image_from(width: u32, height: u32, pixels: &[[u8; 4]]) -> PreparedImage {
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(pixels.concat()),
    }
}

fn px(img: &PreparedImage, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * img.width + x) * 4) as usize;
    let d = &img.rgba8_premul;
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

#[test]
fn scale_rounds_to_nearest_pixel() {
    let img = image_from(2, 2, &[RED; 4]);
    let up = scale_image(&img, 2.0, 1.5, FilterType::Triangle).unwrap();
    assert_eq!((up.width, up.height), (4, 3));
    assert_eq!(px(&up, 1, 1), RED);

    let same = scale_image(&img, 1.1, 1.1, FilterType::Lanczos3).unwrap();
    assert_eq!(same, img);
}

#[test]
fn degenerate_scale_is_an_error() {
    let img = image_from(2, 2, &[RED; 4]);
    assert!(scale_image(&img, 0.0, 1.0, FilterType::Triangle).is_err());
    assert!(scale_image(&img, 1.0, 0.1, FilterType::Triangle).is_err());
    assert!(scale_image(&img, f64::NAN, 1.0, FilterType::Triangle).is_err());
    assert!(scale_image(&img, -2.0, 1.0, FilterType::Triangle).is_err());
}

#[test]
fn right_angle_rotation_is_counter_clockwise() {
    // Red on the left, blue on the right.
    let img = image_from(2, 1, &[RED, BLUE]);

    let ccw = rotate_image(&img, 90).unwrap();
    assert_eq!((ccw.width, ccw.height), (1, 2));
    assert_eq!(px(&ccw, 0, 0), BLUE);
    assert_eq!(px(&ccw, 0, 1), RED);

    let cw = rotate_image(&img, -90).unwrap();
    assert_eq!(px(&cw, 0, 0), RED);
    assert_eq!(px(&cw, 0, 1), BLUE);

    let half = rotate_image(&img, 180).unwrap();
    assert_eq!(px(&half, 0, 0), BLUE);

    assert_eq!(rotate_image(&img, 360).unwrap(), img);
    assert_eq!(rotate_image(&img, 450).unwrap(), ccw);
}

#[test]
fn arbitrary_rotation_expands_bounds() {
    let img = image_from(10, 10, &[RED; 100]);
    let r = rotate_image(&img, 45).unwrap();
    assert_eq!((r.width, r.height), (15, 15));
    assert_eq!(px(&r, 7, 7), RED);
    // Corners of the expanded box are outside the rotated square.
    assert_eq!(px(&r, 0, 0)[3], 0);
    assert_eq!(px(&r, 14, 14)[3], 0);
}

#[test]
fn oversized_scale_is_rejected() {
    let img = image_from(2, 2, &[RED; 4]);
    let err = scale_image(&img, 1.0, 1.0e8, FilterType::Triangle).unwrap_err();
    assert!(err.to_string().contains("too large"));
    assert!(scale_image(&img, 1.0e9, 1.0e9, FilterType::Lanczos3).is_err());
    assert!(scale_image(&img, 4097.0, 4097.0, FilterType::Triangle).is_err());
}
