use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn fps_frame_duration() {
    let fps = Fps::new(60, 1).unwrap();
    assert!((fps.frame_duration_secs() - 1.0 / 60.0).abs() < 1e-12);
    assert_eq!(fps.frame_duration(), Duration::from_secs_f64(1.0 / 60.0));

    let ntsc = Fps::new(30000, 1001).unwrap();
    assert!((ntsc.as_f64() - 29.97).abs() < 0.01);
}

#[test]
fn canvas_validation_and_len() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    let c = Canvas::new(3, 2).unwrap();
    assert_eq!(c.byte_len(), 24);
    assert_eq!(Canvas::default().width, 512);
}
