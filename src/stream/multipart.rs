/// Multipart boundary token, as declared in the response `Content-Type`.
pub const BOUNDARY: &str = "frameboundary";

/// `Content-Type` of the `/stream` response.
pub fn stream_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={BOUNDARY}")
}

/// Viewer page served at `/`.
pub const INDEX_HTML: &str = "<html><body style='margin:0;'><img src='/stream' style='width:100%; height:100%; object-fit:contain;'/></body></html>";

/// One multipart part carrying a PNG frame.
pub fn multipart_chunk(frame: &[u8]) -> Vec<u8> {
    let head = format!(
        "--{BOUNDARY}\r\nContent-Type: image/png\r\nContent-Length: {}\r\n\r\n",
        frame.len()
    );
    let mut out = Vec::with_capacity(head.len() + frame.len() + 2);
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(frame);
    out.extend_from_slice(b"\r\n");
    out
}

/// Head of a plain HTTP/1.1 response that closes the connection afterwards.
pub fn response_head(status: &str, content_type: &str, content_length: Option<usize>) -> String {
    let mut head = format!("HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\n");
    if let Some(len) = content_length {
        head.push_str(&format!("Content-Length: {len}\r\n"));
    }
    head.push_str("Cache-Control: no-cache, no-store\r\nConnection: close\r\n\r\n");
    head
}

#[cfg(test)]
#[path = "../../tests/unit/stream/multipart.rs"]
mod tests;
