use crate::config::render::{ActiveStates, Thresholds};
use crate::model::avatar::Group;
use crate::model::state::{LogicState, VoiceState};

/// Levels this close to zero count as silence even with the noise gate disabled.
pub(crate) const LEVEL_EPSILON: f32 = 0.001;

/// Classify an audio level into exactly one voice state.
///
/// Levels at or below the noise gate are `silent`. Otherwise the loudest state whose threshold is
/// strictly exceeded wins, defaulting to `silent`. Raising the level never lowers the result.
pub fn classify_level(level: f32, thresholds: &Thresholds, noise_gate: f32) -> VoiceState {
    // Written as a negated comparison so NaN lands on silent.
    if !(level > noise_gate.max(LEVEL_EPSILON)) {
        return VoiceState::Silent;
    }
    VoiceState::ALL
        .into_iter()
        .rev()
        .find(|s| level > thresholds.get(*s))
        .unwrap_or(VoiceState::Silent)
}

/// Pick the group child for a classified voice state.
///
/// When `state` is inactive or unmapped, the nearest quieter active mapped state is used, then
/// the nearest louder one, and finally whatever `silent` maps to (which may be nothing).
pub fn resolve_voice_layer<'g>(
    group: &'g Group,
    state: VoiceState,
    active: &ActiveStates,
) -> Option<&'g str> {
    let mapped = move |s: VoiceState| {
        if active.is_active(s) {
            group.logic_for(LogicState::from(s))
        } else {
            None
        }
    };

    if let Some(name) = mapped(state) {
        return Some(name);
    }

    let rank = state.rank();
    let quieter = VoiceState::ALL[..rank].iter().rev();
    let louder = VoiceState::ALL[rank + 1..].iter();
    quieter
        .chain(louder)
        .find_map(|s| mapped(*s))
        .or_else(|| group.logic_for(LogicState::Silent))
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/classify.rs"]
mod tests;
