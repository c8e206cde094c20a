use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::foundation::error::{AvatarError, AvatarResult};
use crate::stream::FrameSource;
use crate::stream::multipart::{INDEX_HTML, multipart_chunk, response_head, stream_content_type};

const ACCEPT_POLL: Duration = Duration::from_millis(20);
const CLIENT_IO_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// Serves the latest frames of a [`FrameSource`] over HTTP.
///
/// `/stream` is a `multipart/x-mixed-replace` stream of PNG parts, `/` a small viewer page, and
/// every other path a 404. Each client runs on its own thread; a client that disconnects only
/// ends its own loop.
pub struct StreamServer {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    clients: Arc<AtomicUsize>,
    accept: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for StreamServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamServer")
            .field("local_addr", &self.local_addr)
            .field("clients", &self.client_count())
            .finish_non_exhaustive()
    }
}

impl StreamServer {
    /// Bind `addr` and start accepting clients.
    pub fn bind(addr: impl ToSocketAddrs, source: Arc<dyn FrameSource>) -> AvatarResult<Self> {
        let listener = TcpListener::bind(addr).context("bind stream server")?;
        listener
            .set_nonblocking(true)
            .context("make listener non-blocking")?;
        let local_addr = listener.local_addr().context("read listener address")?;

        let stop = Arc::new(AtomicBool::new(false));
        let clients = Arc::new(AtomicUsize::new(0));
        let accept = {
            let stop = Arc::clone(&stop);
            let clients = Arc::clone(&clients);
            thread::Builder::new()
                .name("avatarcast-http".to_string())
                .spawn(move || accept_loop(&listener, &source, &stop, &clients))
                .map_err(|e| AvatarError::render(format!("failed to spawn http thread: {e}")))?
        };

        info!(%local_addr, "stream server listening");
        Ok(Self {
            local_addr,
            stop,
            clients,
            accept: Some(accept),
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Clients currently connected.
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::Acquire)
    }

    /// Stop accepting and tell streaming clients to finish. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.accept.take() {
            if handle.join().is_err() {
                warn!("http accept thread panicked");
            }
            info!(local_addr = %self.local_addr, "stream server stopped");
        }
    }
}

impl Drop for StreamServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: &TcpListener,
    source: &Arc<dyn FrameSource>,
    stop: &Arc<AtomicBool>,
    clients: &Arc<AtomicUsize>,
) {
    while !stop.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((conn, peer)) => {
                let source = Arc::clone(source);
                let stop = Arc::clone(stop);
                let clients = Arc::clone(clients);
                clients.fetch_add(1, Ordering::AcqRel);
                let spawned = thread::Builder::new()
                    .name("avatarcast-client".to_string())
                    .spawn(move || {
                        if let Err(e) = handle_client(conn, source.as_ref(), &stop) {
                            debug!(%peer, error = %e, "client ended");
                        }
                        clients.fetch_sub(1, Ordering::AcqRel);
                    });
                if let Err(e) = spawned {
                    warn!(%peer, error = %e, "failed to spawn client thread");
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

fn handle_client(conn: TcpStream, source: &dyn FrameSource, stop: &AtomicBool) -> anyhow::Result<()> {
    conn.set_nonblocking(false)?;
    conn.set_read_timeout(Some(CLIENT_IO_TIMEOUT))?;
    conn.set_write_timeout(Some(CLIENT_IO_TIMEOUT))?;
    conn.set_nodelay(true)?;

    let (method, path) = read_request_line(&conn)?;
    let mut out = conn;
    if method != "GET" {
        let body = "method not allowed";
        out.write_all(response_head("405 Method Not Allowed", "text/plain", Some(body.len())).as_bytes())?;
        out.write_all(body.as_bytes())?;
        return Ok(());
    }

    match path.as_str() {
        "/" => {
            out.write_all(
                response_head("200 OK", "text/html; charset=utf-8", Some(INDEX_HTML.len()))
                    .as_bytes(),
            )?;
            out.write_all(INDEX_HTML.as_bytes())?;
        }
        "/stream" => stream_frames(out, source, stop)?,
        _ => {
            let body = "not found";
            out.write_all(response_head("404 Not Found", "text/plain", Some(body.len())).as_bytes())?;
            out.write_all(body.as_bytes())?;
        }
    }
    Ok(())
}

fn stream_frames(mut out: TcpStream, source: &dyn FrameSource, stop: &AtomicBool) -> anyhow::Result<()> {
    out.write_all(response_head("200 OK", &stream_content_type(), None).as_bytes())?;
    out.flush()?;

    let period = source.fps().frame_duration();
    while !stop.load(Ordering::Acquire) {
        if let Some(frame) = source.latest_frame() {
            out.write_all(&multipart_chunk(&frame))
                .context("client disconnected")?;
            out.flush()?;
        }
        thread::sleep(period);
    }
    Ok(())
}

/// Read the request head and return `(method, path)` with any query string removed.
fn read_request_line(conn: &TcpStream) -> anyhow::Result<(String, String)> {
    let mut reader = BufReader::new(conn);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // Drain headers so the client sees a clean response.
    let mut total = request_line.len();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        total += n;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        if total > MAX_REQUEST_HEAD {
            anyhow::bail!("request head too large");
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("empty request")?.to_string();
    let target = parts.next().context("request without a path")?;
    let path = target.split(['?', '#']).next().unwrap_or(target).to_string();
    Ok((method, path))
}

#[cfg(test)]
#[path = "../../tests/unit/stream/server.rs"]
mod tests;
