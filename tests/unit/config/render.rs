use super::*;

#[test]
fn defaults_match_the_stock_voice_profile() {
    let c = RenderConfig::default();
    assert_eq!(c.thresholds.get(VoiceState::Silent), 0.05);
    assert_eq!(c.thresholds.get(VoiceState::Shout), 0.8);
    assert!(c.thresholds.is_monotonic());
    assert!(VoiceState::ALL.iter().all(|s| c.active_states.is_active(*s)));
    assert!(c.effects.blink);
    assert!(!c.effects.shake && !c.effects.random_effect);
    assert_eq!(c.precedence, ResolveStage::DEFAULT_ORDER.to_vec());
}

#[test]
fn partial_json_fills_defaults() {
    let c: RenderConfig =
        serde_json::from_str(r#"{"thresholds": {"shout": 0.9}, "effects": {"shake": true}}"#)
            .unwrap();
    assert_eq!(c.thresholds.shout, 0.9);
    assert_eq!(c.thresholds.normal, 0.6);
    assert!(c.effects.shake);
    assert!(c.effects.blink);
    assert_eq!(c.noise_gate, 0.01);
}

#[test]
fn precedence_serializes_as_lowercase_names() {
    let c = RenderConfig {
        precedence: vec![ResolveStage::Open, ResolveStage::Blink],
        ..RenderConfig::default()
    };
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["precedence"], serde_json::json!(["open", "blink"]));
}

#[test]
fn dedup_keeps_first_occurrence() {
    let out = dedup_stages([
        ResolveStage::Random,
        ResolveStage::Blink,
        ResolveStage::Random,
        ResolveStage::Blink,
    ]);
    assert_eq!(out, vec![ResolveStage::Random, ResolveStage::Blink]);
}

#[test]
fn non_monotonic_thresholds_are_detected() {
    let t = Thresholds {
        silent: 0.5,
        whisper: 0.2,
        normal: 0.6,
        shout: 0.8,
    };
    assert!(!t.is_monotonic());
}
