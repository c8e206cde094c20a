use super::*;

#[test]
fn chunk_layout_matches_multipart_framing() {
    let chunk = multipart_chunk(b"PNGDATA");
    let expected = b"--frameboundary\r\nContent-Type: image/png\r\nContent-Length: 7\r\n\r\nPNGDATA\r\n";
    assert_eq!(chunk, expected.to_vec());
}

#[test]
fn empty_frame_still_frames_correctly() {
    let chunk = multipart_chunk(b"");
    assert!(chunk.ends_with(b"Content-Length: 0\r\n\r\n\r\n"));
}

#[test]
fn content_type_names_the_boundary() {
    assert_eq!(
        stream_content_type(),
        "multipart/x-mixed-replace; boundary=frameboundary"
    );
}

#[test]
fn response_head_ends_with_blank_line() {
    let head = response_head("404 Not Found", "text/plain", Some(9));
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(head.contains("Content-Length: 9\r\n"));
    assert!(head.ends_with("\r\n\r\n"));

    let open = response_head("200 OK", "text/html", None);
    assert!(!open.contains("Content-Length"));
}
