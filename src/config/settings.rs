use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use tracing::{debug, warn};

use crate::audio::level::LevelConditioner;
use crate::config::render::{ActiveStates, EffectToggles, RenderConfig, Thresholds};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{AvatarError, AvatarResult};
use crate::session::renderer::{Renderer, RendererOpts};

/// Noise gate applied when the gate is enabled.
pub const DEFAULT_NOISE_GATE: f32 = 0.01;

/// Persisted application settings.
///
/// Missing keys take their defaults, so settings files written by older versions keep loading.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Voice thresholds.
    pub thresholds: Thresholds,
    /// Enabled voice states.
    pub active_states: ActiveStates,
    /// Global effect toggles.
    pub effects: EffectToggles,
    /// Whether the noise gate is on.
    pub noise_gate_enabled: bool,
    /// Gate level used when enabled.
    pub noise_gate: f32,
    /// Multiplier applied to raw source levels.
    pub sensitivity: f32,
    /// Input device name; `None`, empty or "Default" pick the host default.
    pub mic_device: Option<String>,
    /// Idle dimming on or off.
    pub idle_enabled: bool,
    /// Seconds without activity before dimming.
    pub idle_timeout: f64,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Render loop frame rate.
    pub fps: u32,
    /// Port of the frame stream server.
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            active_states: ActiveStates::default(),
            effects: EffectToggles::default(),
            noise_gate_enabled: true,
            noise_gate: DEFAULT_NOISE_GATE,
            sensitivity: 1.0,
            mic_device: None,
            idle_enabled: false,
            idle_timeout: 5.0,
            width: 700,
            height: 700,
            fps: 60,
            port: 6969,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> AvatarResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read settings '{}'", path.display()))?;
        serde_json::from_str(&text).map_err(|e| AvatarError::serde(e.to_string()))
    }

    /// Read settings, falling back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file; using defaults");
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
            Self::default()
        })
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: &Path) -> AvatarResult<()> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| AvatarError::serde(e.to_string()))?;
        std::fs::write(path, text).with_context(|| format!("write settings '{}'", path.display()))?;
        Ok(())
    }

    /// Gate in effect: the configured gate when enabled, otherwise zero.
    pub fn effective_noise_gate(&self) -> f32 {
        if self.noise_gate_enabled {
            self.noise_gate.max(0.0)
        } else {
            0.0
        }
    }

    /// Runtime render configuration described by these settings.
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            thresholds: self.thresholds,
            active_states: self.active_states,
            effects: self.effects,
            noise_gate: self.effective_noise_gate(),
            idle_enabled: self.idle_enabled,
            idle_timeout: self.idle_timeout,
            ..RenderConfig::default()
        }
    }

    /// Renderer construction options.
    pub fn renderer_opts(&self) -> AvatarResult<RendererOpts> {
        Ok(RendererOpts {
            canvas: Canvas::new(self.width, self.height)?,
            fps: Fps::new(self.fps, 1)?,
            seed: None,
            stop_timeout: Duration::from_secs(1),
        })
    }

    /// Conditioner for raw source levels.
    pub fn conditioner(&self) -> LevelConditioner {
        LevelConditioner {
            sensitivity: self.sensitivity,
            noise_gate: self.effective_noise_gate(),
        }
    }

    /// Device to capture from, or `None` for the host default.
    pub fn mic_device_name(&self) -> Option<&str> {
        self.mic_device
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("default"))
    }

    /// Push the runtime part of these settings into a renderer.
    pub fn apply(&self, renderer: &Renderer) {
        let mut config = renderer.config();
        let wanted = self.render_config();
        config.thresholds = wanted.thresholds;
        config.active_states = wanted.active_states;
        config.effects = wanted.effects;
        config.noise_gate = wanted.noise_gate;
        config.idle_enabled = wanted.idle_enabled;
        config.idle_timeout = wanted.idle_timeout;
        renderer.set_config(config);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/config/settings.rs"]
mod tests;
