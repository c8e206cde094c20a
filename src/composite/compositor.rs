use std::borrow::Cow;
use std::collections::HashMap;

use image::imageops::FilterType;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::assets::store::{PreparedImage, PreparedLayerStore};
use crate::composite::blend::{blit_over, fill_over};
use crate::composite::effects::{EffectSample, IDLE_DIM_ALPHA, is_idle};
use crate::composite::frame::FrameRGBA;
use crate::composite::transform::scale_image;
use crate::config::render::RenderConfig;
use crate::foundation::core::Canvas;
use crate::foundation::error::AvatarResult;
use crate::model::avatar::{Layer, Model};
use crate::resolve::resolver::{GroupStateResolver, ResolveCtx};

/// Inputs sampled once at the start of a tick.
#[derive(Clone, Copy, Debug)]
pub struct TickInputs<'a> {
    /// Seconds on the renderer clock.
    pub now: f64,
    /// Gated audio level.
    pub level: f32,
    /// Clock time of the last above-gate level.
    pub last_activity: f64,
    /// Configuration snapshot.
    pub config: &'a RenderConfig,
}

/// Builds one frame per tick from the model, its prepared images and the group choices.
#[derive(Debug)]
pub struct FrameCompositor {
    canvas: Canvas,
    rng: StdRng,
}

impl FrameCompositor {
    /// Compositor for a fixed canvas; `seed` drives the shake effect.
    pub fn new(canvas: Canvas, seed: u64) -> Self {
        Self {
            canvas,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Composite one frame.
    ///
    /// Layers are drawn in list order. A grouped layer is drawn only when it is its group's
    /// choice for this tick, so a group without a choice hides all of its children. Layers that
    /// are invisible, missing from `store`, or fail a per-tick transform are skipped.
    pub fn compose(
        &mut self,
        model: &Model,
        store: &PreparedLayerStore,
        resolver: &mut GroupStateResolver,
        tick: &TickInputs<'_>,
    ) -> FrameRGBA {
        let ctx = ResolveCtx {
            now: tick.now,
            level: tick.level,
            config: tick.config,
        };
        let choices: HashMap<&str, Option<&str>> = model
            .groups
            .iter()
            .map(|g| g.name.as_str())
            .zip(resolver.resolve_all(model, &ctx))
            .collect();

        let fx = self.sample_effects(tick);
        let mut frame = FrameRGBA::transparent(self.canvas);

        for layer in &model.layers {
            if !layer.visible {
                continue;
            }
            if let Some(group) = layer.group.as_deref()
                && choices.get(group).copied().flatten() != Some(layer.name.as_str())
            {
                continue;
            }
            let Some(prepared) = store.get(&layer.name) else {
                continue;
            };

            let img = match per_tick_transform(prepared.image_at(tick.now), layer, &fx) {
                Ok(img) => img,
                Err(e) => {
                    debug!(layer = %layer.name, error = %e, "skipping layer this tick");
                    continue;
                }
            };
            let (x, y) = self.placement(&img, layer, &fx);
            blit_over(&mut frame, &img, x, y);
        }

        if fx.idle_dim {
            fill_over(&mut frame, [0, 0, 0, IDLE_DIM_ALPHA]);
        }
        frame
    }

    /// Frame for a renderer without a model: transparent, dimmed when idle.
    pub fn compose_blank(&mut self, tick: &TickInputs<'_>) -> FrameRGBA {
        let mut frame = FrameRGBA::transparent(self.canvas);
        if is_idle(tick.config, tick.now, tick.last_activity) {
            fill_over(&mut frame, [0, 0, 0, IDLE_DIM_ALPHA]);
        }
        frame
    }

    fn sample_effects(&mut self, tick: &TickInputs<'_>) -> EffectSample {
        let idle = is_idle(tick.config, tick.now, tick.last_activity);
        EffectSample::sample(
            &tick.config.effects,
            tick.level,
            tick.now,
            idle,
            &mut self.rng,
        )
    }

    fn placement(&self, img: &PreparedImage, layer: &Layer, fx: &EffectSample) -> (i64, i64) {
        let cw = i64::from(self.canvas.width);
        let ch = i64::from(self.canvas.height);
        let x = (cw - i64::from(img.width)).div_euclid(2) + i64::from(layer.x) + fx.offset_x;
        let y = (ch - i64::from(img.height)).div_euclid(2) + i64::from(layer.y) + fx.offset_y;
        (x, y)
    }
}

/// Ephemeral transforms, recomputed every tick and never cached.
fn per_tick_transform<'a>(
    img: &'a PreparedImage,
    layer: &Layer,
    fx: &EffectSample,
) -> AvatarResult<Cow<'a, PreparedImage>> {
    let mut out = Cow::Borrowed(img);
    if layer.speech && fx.speech_stretch > 1.0 {
        out = Cow::Owned(scale_image(&out, 1.0, fx.speech_stretch, FilterType::Triangle)?);
    }
    if let Some(s) = fx.pulse_scale {
        out = Cow::Owned(scale_image(&out, s, s, FilterType::Lanczos3)?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
