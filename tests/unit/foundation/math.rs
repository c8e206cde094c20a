use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(0, 255), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(100, 128), ((100u16 * 128 + 127) / 255) as u8);
}

#[test]
fn premultiply_zeroes_transparent_pixels() {
    let mut px = vec![200, 100, 50, 0, 200, 100, 50, 255];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[0, 0, 0, 0]);
    assert_eq!(&px[4..], &[200, 100, 50, 255]);
}

#[test]
fn unpremultiply_inverts_within_rounding() {
    let straight = [100u8, 50, 200, 128];
    let mut px = straight.to_vec();
    premultiply_rgba8_in_place(&mut px);
    unpremultiply_rgba8_in_place(&mut px);
    for i in 0..3 {
        assert!((i32::from(px[i]) - i32::from(straight[i])).abs() <= 1);
    }
    assert_eq!(px[3], 128);
}
