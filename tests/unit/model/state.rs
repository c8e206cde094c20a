use super::*;

#[test]
fn voice_states_are_ordered_by_rank() {
    for (i, s) in VoiceState::ALL.iter().enumerate() {
        assert_eq!(s.rank(), i);
    }
    assert!(VoiceState::Silent < VoiceState::Shout);
}

#[test]
fn logic_keys_parse_case_insensitively() {
    assert_eq!(LogicState::parse("silent"), Some(LogicState::Silent));
    assert_eq!(LogicState::parse(" Blink "), Some(LogicState::Blink));
    assert_eq!(LogicState::parse("OPEN"), Some(LogicState::Open));
    assert_eq!(LogicState::parse("scream"), None);
    assert_eq!(LogicState::parse(""), None);
}

#[test]
fn voice_state_maps_to_logic_key() {
    for v in VoiceState::ALL {
        assert_eq!(LogicState::from(v).as_str(), v.as_str());
    }
}

#[test]
fn serde_uses_lowercase_names() {
    let s = serde_json::to_string(&LogicState::Whisper).unwrap();
    assert_eq!(s, "\"whisper\"");
    let v: VoiceState = serde_json::from_str("\"shout\"").unwrap();
    assert_eq!(v, VoiceState::Shout);
}
