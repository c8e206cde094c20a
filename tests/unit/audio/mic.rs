use super::*;

#[test]
fn unknown_device_fails_to_start() {
    let result = MicSource::start(Some("avatarcast-no-such-input-device"), |_| {});
    assert!(result.is_err());
}
