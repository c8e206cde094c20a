use std::collections::BTreeMap;

use super::*;

fn mouth() -> Group {
    let mut logic = BTreeMap::new();
    logic.insert(LogicState::Silent, "closed".to_string());
    logic.insert(LogicState::Normal, "open".to_string());
    Group {
        name: "mouth".to_string(),
        children: vec!["closed".to_string(), "open".to_string()],
        logic,
        blink_freq: 0.0,
        random_effect: false,
        random_min: 1.0,
        random_max: 3.0,
    }
}

#[test]
fn classification_uses_strict_thresholds() {
    let t = Thresholds::default();
    assert_eq!(classify_level(0.0, &t, 0.0), VoiceState::Silent);
    assert_eq!(classify_level(0.05, &t, 0.0), VoiceState::Silent);
    assert_eq!(classify_level(0.06, &t, 0.0), VoiceState::Silent);
    assert_eq!(classify_level(0.25, &t, 0.0), VoiceState::Silent);
    assert_eq!(classify_level(0.3, &t, 0.0), VoiceState::Whisper);
    assert_eq!(classify_level(0.7, &t, 0.0), VoiceState::Normal);
    assert_eq!(classify_level(0.81, &t, 0.0), VoiceState::Shout);
    assert_eq!(classify_level(5.0, &t, 0.0), VoiceState::Shout);
}

#[test]
fn noise_gate_forces_silent() {
    let t = Thresholds::default();
    assert_eq!(classify_level(0.7, &t, 0.7), VoiceState::Silent);
    assert_eq!(classify_level(0.0005, &t, 0.0), VoiceState::Silent);
    assert_eq!(classify_level(f32::NAN, &t, 0.0), VoiceState::Silent);
}

#[test]
fn classification_is_monotonic_in_level() {
    let threshold_sets = [
        Thresholds::default(),
        Thresholds {
            silent: 0.0,
            whisper: 0.0,
            normal: 0.5,
            shout: 0.5,
        },
        Thresholds {
            silent: 0.1,
            whisper: 0.2,
            normal: 0.3,
            shout: 1.0,
        },
        // Non-monotonic input still yields a single, monotone classification.
        Thresholds {
            silent: 0.4,
            whisper: 0.1,
            normal: 0.9,
            shout: 0.6,
        },
    ];

    for t in threshold_sets {
        for gate in [0.0f32, 0.01, 0.3] {
            let mut prev = VoiceState::Silent.rank();
            for i in 0..=1200 {
                let level = i as f32 / 1000.0;
                let rank = classify_level(level, &t, gate).rank();
                assert!(
                    rank >= prev,
                    "rank dropped at level {level} for {t:?} gate {gate}"
                );
                prev = rank;
            }
        }
    }
}

#[test]
fn mouth_scenario_resolves_expected_children() {
    let g = mouth();
    let t = Thresholds::default();
    let active = ActiveStates::default();

    let pick = |level: f32| resolve_voice_layer(&g, classify_level(level, &t, 0.0), &active);
    assert_eq!(pick(0.0), Some("closed"));
    assert_eq!(pick(0.7), Some("open"));
    assert_eq!(pick(0.3), Some("closed"));
    assert_eq!(pick(0.9), Some("open"));
}

#[test]
fn inactive_state_searches_quieter_then_louder() {
    let g = mouth();
    let mut active = ActiveStates::default();

    active.normal = false;
    assert_eq!(
        resolve_voice_layer(&g, VoiceState::Normal, &active),
        Some("closed")
    );

    active.silent = false;
    active.normal = true;
    assert_eq!(
        resolve_voice_layer(&g, VoiceState::Whisper, &active),
        Some("open")
    );

    // Nothing active and mapped: falls back to whatever silent maps to.
    active.normal = false;
    assert_eq!(
        resolve_voice_layer(&g, VoiceState::Shout, &active),
        Some("closed")
    );
}

#[test]
fn empty_logic_resolves_to_nothing() {
    let mut g = mouth();
    g.logic.clear();
    for s in VoiceState::ALL {
        assert_eq!(resolve_voice_layer(&g, s, &ActiveStates::default()), None);
    }
}
