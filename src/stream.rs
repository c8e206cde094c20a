use std::sync::Arc;

use crate::foundation::core::Fps;
use crate::session::renderer::Renderer;

pub(crate) mod multipart;
pub(crate) mod server;

pub use multipart::{BOUNDARY, INDEX_HTML, multipart_chunk};

/// Anything that can hand out the latest encoded frame.
pub trait FrameSource: Send + Sync {
    /// Latest PNG frame, if one has been published.
    fn latest_frame(&self) -> Option<Arc<[u8]>>;

    /// Rate at which new frames appear.
    fn fps(&self) -> Fps;
}

impl FrameSource for Renderer {
    fn latest_frame(&self) -> Option<Arc<[u8]>> {
        self.get_frame_bytes()
    }

    fn fps(&self) -> Fps {
        Renderer::fps(self)
    }
}
