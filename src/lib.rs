//! Avatarcast turns an audio level into frames of a layered 2D avatar.
//!
//! A [`Model`] describes image layers and mutually exclusive groups of layers. Each tick the
//! [`GroupStateResolver`] picks one child per group (blink, open, random or voice state), the
//! [`FrameCompositor`] stacks the chosen layers with per-tick effects, and the [`Renderer`]
//! publishes the result as PNG bytes:
//!
//! - Build a [`Renderer`] from [`RendererOpts`] and [`Renderer::start`] its render thread
//! - [`Renderer::load_model`] and feed [`Renderer::set_audio_level`] from any thread
//! - Pull [`Renderer::get_frame_bytes`], or serve it with a [`StreamServer`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod assets;
mod foundation;

pub(crate) mod audio;
pub(crate) mod composite;
pub(crate) mod config;
pub(crate) mod model;
pub(crate) mod resolve;
pub(crate) mod session;
/// Multipart PNG streaming over HTTP.
pub mod stream;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{Canvas, Fps};
pub use crate::foundation::error::{AvatarError, AvatarResult};

pub use crate::assets::store::{
    PreparedAnimation, PreparedImage, PreparedLayer, PreparedLayerStore, normalize_rel_path,
};
pub use crate::audio::level::{
    BlockMeter, CAPTURE_BLOCK, LevelConditioner, downmix_mono, rms_level,
};
#[cfg(feature = "mic")]
pub use crate::audio::mic::{MicSource, input_device_names};
pub use crate::audio::simulated::{SimulatedSource, simulated_level};
pub use crate::composite::compositor::{FrameCompositor, TickInputs};
pub use crate::composite::effects::{EffectSample, is_idle};
pub use crate::composite::frame::FrameRGBA;
pub use crate::config::render::{
    ActiveStates, EffectToggles, RenderConfig, ResolveStage, Thresholds,
};
pub use crate::config::settings::Settings;
pub use crate::model::avatar::{Group, Layer, Model};
pub use crate::model::def::{GroupDef, LayerDef, ModelDef};
pub use crate::model::state::{LogicState, VoiceState};
pub use crate::resolve::classify::{classify_level, resolve_voice_layer};
pub use crate::resolve::resolver::{GroupStateResolver, GroupTimers, ResolveCtx};
pub use crate::session::renderer::{Renderer, RendererOpts};
pub use crate::session::scene::LoadSummary;
pub use crate::stream::FrameSource;
pub use crate::stream::server::StreamServer;
