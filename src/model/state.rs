/// Voice-activity state classified from the audio level, ordered quietest to loudest.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VoiceState {
    /// At or below the `silent` threshold.
    Silent,
    /// Above the `whisper` threshold.
    Whisper,
    /// Above the `normal` threshold.
    Normal,
    /// Above the `shout` threshold.
    Shout,
}

impl VoiceState {
    /// All voice states in ascending loudness.
    pub const ALL: [VoiceState; 4] = [
        VoiceState::Silent,
        VoiceState::Whisper,
        VoiceState::Normal,
        VoiceState::Shout,
    ];

    /// Position in [`VoiceState::ALL`].
    pub fn rank(self) -> usize {
        match self {
            VoiceState::Silent => 0,
            VoiceState::Whisper => 1,
            VoiceState::Normal => 2,
            VoiceState::Shout => 3,
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        LogicState::from(self).as_str()
    }
}

/// Key of a group's `logic` table.
///
/// The four voice states select a layer by loudness; `blink` names the layer shown during a blink
/// window and `open` names a layer that overrides voice-driven selection.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogicState {
    /// Voice state `silent`.
    Silent,
    /// Voice state `whisper`.
    Whisper,
    /// Voice state `normal`.
    Normal,
    /// Voice state `shout`.
    Shout,
    /// Layer shown while a blink window is open.
    Blink,
    /// Layer shown whenever the group is not blinking.
    Open,
}

impl LogicState {
    /// Every recognized logic key.
    pub const ALL: [LogicState; 6] = [
        LogicState::Silent,
        LogicState::Whisper,
        LogicState::Normal,
        LogicState::Shout,
        LogicState::Blink,
        LogicState::Open,
    ];

    /// Canonical lowercase name as stored in model JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicState::Silent => "silent",
            LogicState::Whisper => "whisper",
            LogicState::Normal => "normal",
            LogicState::Shout => "shout",
            LogicState::Blink => "blink",
            LogicState::Open => "open",
        }
    }

    /// Parse a logic key, ignoring case and surrounding whitespace.
    pub fn parse(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(key))
    }
}

impl From<VoiceState> for LogicState {
    fn from(v: VoiceState) -> Self {
        match v {
            VoiceState::Silent => LogicState::Silent,
            VoiceState::Whisper => LogicState::Whisper,
            VoiceState::Normal => LogicState::Normal,
            VoiceState::Shout => LogicState::Shout,
        }
    }
}

impl std::fmt::Display for VoiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for LogicState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/state.rs"]
mod tests;
