use rand::Rng;

use crate::config::render::{EffectToggles, RenderConfig};

/// Opacity of the black idle overlay (about 50 %).
pub const IDLE_DIM_ALPHA: u8 = 128;
/// Angular speed shared by the bounce and pulse oscillations, in radians per second.
pub const WAVE_SPEED: f64 = 5.0;
/// Level below which the speech stretch stays at 1.
pub const SPEECH_FLOOR: f32 = 0.05;

const SHAKE_MAX_PX: f64 = 10.0;
const BOUNCE_MAX_PX: f64 = 10.0;
const PULSE_DEPTH: f64 = 0.1;
const SPEECH_GAIN: f64 = 0.8;

/// Ephemeral per-tick effect values, computed once and applied to every drawn layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectSample {
    /// Horizontal offset in pixels.
    pub offset_x: i64,
    /// Vertical offset in pixels.
    pub offset_y: i64,
    /// Uniform resample factor, `None` when pulse is off or neutral.
    pub pulse_scale: Option<f64>,
    /// Vertical stretch for layers flagged `speech`.
    pub speech_stretch: f64,
    /// Darken the finished frame.
    pub idle_dim: bool,
}

impl EffectSample {
    /// Sample the effects for one tick.
    pub fn sample(
        effects: &EffectToggles,
        level: f32,
        now: f64,
        idle_dim: bool,
        rng: &mut impl Rng,
    ) -> Self {
        let level = f64::from(unit_level(level));

        let (mut dx, mut dy) = (0.0f64, 0.0f64);
        if effects.shake {
            let m = (level * 5.0).min(1.0) * SHAKE_MAX_PX;
            if m > 0.0 {
                dx += rng.gen_range(-m..=m);
                dy += rng.gen_range(-m..=m);
            }
        }
        if effects.bounce {
            dy += (now * WAVE_SPEED).sin() * (level * 20.0).min(BOUNCE_MAX_PX);
        }

        let pulse_scale = if effects.pulse {
            let s = 1.0 + (now * WAVE_SPEED).sin() * PULSE_DEPTH * level;
            (s != 1.0).then_some(s)
        } else {
            None
        };

        Self {
            offset_x: dx.round() as i64,
            offset_y: dy.round() as i64,
            pulse_scale,
            speech_stretch: speech_stretch(level as f32),
            idle_dim,
        }
    }
}

/// Vertical stretch for `speech` layers: `1 + max(0, level - 0.05) * 0.8`.
pub fn speech_stretch(level: f32) -> f64 {
    1.0 + f64::from((unit_level(level) - SPEECH_FLOOR).max(0.0)) * SPEECH_GAIN
}

/// Effect math only ever sees levels in `[0, 1]`; NaN counts as silence.
fn unit_level(level: f32) -> f32 {
    if level.is_finite() {
        level.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Whether idle dimming applies: enabled, and strictly more than `idle_timeout` seconds since the
/// last above-gate level.
pub fn is_idle(config: &RenderConfig, now: f64, last_activity: f64) -> bool {
    config.idle_enabled && now - last_activity > config.idle_timeout
}

#[cfg(test)]
#[path = "../../tests/unit/composite/effects.rs"]
mod tests;
