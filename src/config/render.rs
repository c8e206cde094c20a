use crate::model::state::VoiceState;

/// Audio-level thresholds per voice state, expected ascending.
///
/// Classification picks the loudest state whose threshold is strictly exceeded, so non-monotonic
/// values still produce exactly one state.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Threshold for `silent`.
    pub silent: f32,
    /// Threshold for `whisper`.
    pub whisper: f32,
    /// Threshold for `normal`.
    pub normal: f32,
    /// Threshold for `shout`.
    pub shout: f32,
}

impl Thresholds {
    /// Threshold configured for `state`.
    pub fn get(&self, state: VoiceState) -> f32 {
        match state {
            VoiceState::Silent => self.silent,
            VoiceState::Whisper => self.whisper,
            VoiceState::Normal => self.normal,
            VoiceState::Shout => self.shout,
        }
    }

    /// Whether thresholds are non-decreasing from `silent` to `shout`.
    pub fn is_monotonic(&self) -> bool {
        self.silent <= self.whisper && self.whisper <= self.normal && self.normal <= self.shout
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            silent: 0.05,
            whisper: 0.25,
            normal: 0.6,
            shout: 0.8,
        }
    }
}

/// Which voice states may be selected; inactive states fall back to their neighbours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ActiveStates {
    /// `silent` enabled.
    pub silent: bool,
    /// `whisper` enabled.
    pub whisper: bool,
    /// `normal` enabled.
    pub normal: bool,
    /// `shout` enabled.
    pub shout: bool,
}

impl ActiveStates {
    /// Whether `state` is enabled.
    pub fn is_active(&self, state: VoiceState) -> bool {
        match state {
            VoiceState::Silent => self.silent,
            VoiceState::Whisper => self.whisper,
            VoiceState::Normal => self.normal,
            VoiceState::Shout => self.shout,
        }
    }
}

impl Default for ActiveStates {
    fn default() -> Self {
        Self {
            silent: true,
            whisper: true,
            normal: true,
            shout: true,
        }
    }
}

/// Global effect toggles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectToggles {
    /// Random per-frame jitter scaled by level.
    pub shake: bool,
    /// Vertical sine bob scaled by level.
    pub bounce: bool,
    /// Uniform sine scale scaled by level.
    pub pulse: bool,
    /// Periodic blink windows for groups with `blink_freq > 0`.
    pub blink: bool,
    /// Random child switching for groups that opt in.
    pub random_effect: bool,
}

impl Default for EffectToggles {
    fn default() -> Self {
        Self {
            shake: false,
            bounce: false,
            pulse: false,
            blink: true,
            random_effect: false,
        }
    }
}

/// Override stages tried before voice classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveStage {
    /// Blink window override.
    Blink,
    /// `logic.open` override.
    Open,
    /// Random child switching.
    Random,
}

impl ResolveStage {
    /// Default precedence: blink, then open, then random.
    pub const DEFAULT_ORDER: [ResolveStage; 3] =
        [ResolveStage::Blink, ResolveStage::Open, ResolveStage::Random];
}

/// Renderer configuration that may change at any time while the render loop runs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Voice-state thresholds.
    pub thresholds: Thresholds,
    /// Enabled voice states.
    pub active_states: ActiveStates,
    /// Global effect toggles.
    pub effects: EffectToggles,
    /// Levels at or below this are treated as silence and do not count as activity.
    pub noise_gate: f32,
    /// Dim the frame after `idle_timeout` seconds without activity.
    pub idle_enabled: bool,
    /// Seconds of inactivity before idle dimming.
    pub idle_timeout: f64,
    /// Relative jitter applied to blink intervals (`0.3` = ±30 %).
    pub blink_jitter: f64,
    /// Override stages in the order they are tried. Stages left out are disabled.
    pub precedence: Vec<ResolveStage>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            active_states: ActiveStates::default(),
            effects: EffectToggles::default(),
            noise_gate: 0.01,
            idle_enabled: false,
            idle_timeout: 5.0,
            blink_jitter: 0.3,
            precedence: ResolveStage::DEFAULT_ORDER.to_vec(),
        }
    }
}

/// Drop repeated stages, keeping the first occurrence.
pub(crate) fn dedup_stages(stages: impl IntoIterator<Item = ResolveStage>) -> Vec<ResolveStage> {
    let mut out = Vec::with_capacity(3);
    for s in stages {
        if !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/config/render.rs"]
mod tests;
