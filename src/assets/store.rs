use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::assets::decode::{decode_gif, decode_image};
use crate::composite::transform::{rotate_image, scale_image};
use crate::foundation::error::{AvatarError, AvatarResult};
use crate::model::avatar::{Layer, Model};

/// Decoded premultiplied RGBA8 image, cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixel bytes, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Looping frame sequence with per-frame delays.
#[derive(Clone, Debug)]
pub struct PreparedAnimation {
    frames: Vec<PreparedImage>,
    delays: Vec<f64>,
    total_secs: f64,
}

impl PreparedAnimation {
    /// Build from decoded frames. Non-positive delays are kept as zero-length frames.
    pub fn new(frames: Vec<(PreparedImage, f64)>) -> AvatarResult<Self> {
        if frames.is_empty() {
            return Err(AvatarError::asset("animation needs at least one frame"));
        }
        let (frames, delays): (Vec<_>, Vec<_>) = frames
            .into_iter()
            .map(|(img, d)| (img, if d.is_finite() { d.max(0.0) } else { 0.0 }))
            .unzip();
        let total_secs = delays.iter().sum();
        Ok(Self {
            frames,
            delays,
            total_secs,
        })
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; an animation holds at least one frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Length of one loop in seconds.
    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    /// Frame shown `t` seconds into playback, looping forever.
    pub fn frame_at(&self, t: f64) -> &PreparedImage {
        let first = &self.frames[0];
        if !(self.total_secs > 0.0) || !t.is_finite() {
            return first;
        }
        let mut local = t.rem_euclid(self.total_secs);
        for (img, d) in self.frames.iter().zip(&self.delays) {
            if local < *d {
                return img;
            }
            local -= d;
        }
        self.frames.last().unwrap_or(first)
    }
}

/// Load-time prepared pixels for one layer.
#[derive(Clone, Debug)]
pub enum PreparedLayer {
    /// Still image.
    Static(PreparedImage),
    /// Animated GIF.
    Animated(PreparedAnimation),
}

impl PreparedLayer {
    /// Image to draw at renderer time `t`.
    pub fn image_at(&self, t: f64) -> &PreparedImage {
        match self {
            Self::Static(img) => img,
            Self::Animated(anim) => anim.frame_at(t),
        }
    }
}

/// Per-model cache of decoded, scaled and rotated layer images keyed by layer name.
#[derive(Clone, Debug, Default)]
pub struct PreparedLayerStore {
    layers: HashMap<String, PreparedLayer>,
    failures: Vec<(String, String)>,
}

impl PreparedLayerStore {
    /// Decode and transform every layer with a `file`, resolving paths against `root`.
    ///
    /// A layer that fails is logged, recorded in [`PreparedLayerStore::failures`] and left out;
    /// it renders as invisible.
    #[tracing::instrument(skip(model), fields(model = %model.name, layers = model.layers.len()))]
    pub fn prepare(model: &Model, root: &Path) -> Self {
        let mut out = Self::default();
        for layer in &model.layers {
            let Some(file) = layer.file.as_deref() else {
                debug!(layer = %layer.name, "layer has no file");
                continue;
            };
            match prepare_layer(layer, file, root) {
                Ok(prepared) => {
                    out.layers.insert(layer.name.clone(), prepared);
                }
                Err(e) => {
                    warn!(layer = %layer.name, file, error = %e, "failed to prepare layer");
                    out.failures.push((layer.name.clone(), e.to_string()));
                }
            }
        }
        debug!(
            prepared = out.layers.len(),
            failed = out.failures.len(),
            "layer store ready"
        );
        out
    }

    /// Prepared pixels for a layer.
    pub fn get(&self, layer_name: &str) -> Option<&PreparedLayer> {
        self.layers.get(layer_name)
    }

    /// Insert or replace a layer's pixels.
    pub fn insert(&mut self, layer_name: impl Into<String>, layer: PreparedLayer) {
        self.layers.insert(layer_name.into(), layer);
    }

    /// Number of prepared layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether nothing was prepared.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(layer name, error message)` for every layer that failed to prepare.
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }
}

fn prepare_layer(layer: &Layer, file: &str, root: &Path) -> AvatarResult<PreparedLayer> {
    let rel = normalize_rel_path(file)?;
    let path = root.join(&rel);
    let bytes = std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;

    let animated = layer.is_gif || rel.to_ascii_lowercase().ends_with(".gif");
    if animated {
        let mut frames = decode_gif(&bytes)?;
        if frames.len() > 1 {
            for (img, _) in &mut frames {
                *img = load_time_transform(img, layer)?;
            }
            return Ok(PreparedLayer::Animated(PreparedAnimation::new(frames)?));
        }
        let (img, _) = frames
            .pop()
            .ok_or_else(|| AvatarError::asset("gif has no frames"))?;
        return Ok(PreparedLayer::Static(load_time_transform(&img, layer)?));
    }

    let img = decode_image(&bytes)?;
    Ok(PreparedLayer::Static(load_time_transform(&img, layer)?))
}

/// Fixed per-layer transform: scale, then counter-clockwise rotation.
fn load_time_transform(img: &PreparedImage, layer: &Layer) -> AvatarResult<PreparedImage> {
    let scaled = if layer.scale == 1.0 {
        img.clone()
    } else {
        scale_image(img, layer.scale, layer.scale, FilterType::Lanczos3)?
    };
    rotate_image(&scaled, layer.rotation)
}

/// Normalize a model-relative asset path: `\` becomes `/`, `.` segments are dropped, absolute
/// paths and `..` are rejected.
pub fn normalize_rel_path(source: &str) -> AvatarResult<String> {
    let s = source.trim().replace('\\', "/");
    if s.starts_with('/') || s.get(1..2) == Some(":") {
        return Err(AvatarError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(AvatarError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(AvatarError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(AvatarError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
