use super::*;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "avatarcast_{name}_{}_{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

#[test]
fn older_settings_files_keep_loading() {
    let s: Settings = serde_json::from_str(
        r#"{
            "thresholds": {"silent": 0.1, "whisper": 0.3, "normal": 0.5, "shout": 0.9},
            "active_states": {"whisper": false},
            "effects": {"shake": true, "bounce": false, "pulse": false, "blink": true},
            "sensitivity": 2.5,
            "noise_gate_enabled": false,
            "mic_device": "Default"
        }"#,
    )
    .unwrap();
    assert_eq!(s.thresholds.shout, 0.9);
    assert!(!s.active_states.whisper);
    assert!(s.active_states.shout);
    assert!(s.effects.shake && !s.effects.random_effect);
    assert_eq!(s.sensitivity, 2.5);
    assert_eq!(s.effective_noise_gate(), 0.0);
    assert_eq!(s.mic_device.as_deref(), Some("Default"));
    assert_eq!((s.width, s.height, s.fps, s.port), (700, 700, 60, 6969));
}

#[test]
fn save_then_load_preserves_settings() {
    let path = temp_path("settings_roundtrip");
    let s = Settings {
        idle_enabled: true,
        idle_timeout: 12.0,
        port: 7000,
        ..Settings::default()
    };
    s.save(&path).unwrap();
    assert_eq!(Settings::load(&path).unwrap(), s);
    std::fs::remove_file(&path).ok();
}

#[test]
fn broken_or_missing_files_fall_back_to_defaults() {
    let missing = temp_path("settings_missing");
    assert_eq!(Settings::load_or_default(&missing), Settings::default());

    let broken = temp_path("settings_broken");
    std::fs::write(&broken, "{ not json").unwrap();
    assert!(matches!(Settings::load(&broken), Err(AvatarError::Serde(_))));
    assert_eq!(Settings::load_or_default(&broken), Settings::default());
    std::fs::remove_file(&broken).ok();
}

#[test]
fn derived_views_follow_settings() {
    let s = Settings {
        sensitivity: 3.0,
        noise_gate: 0.2,
        width: 320,
        height: 240,
        fps: 24,
        ..Settings::default()
    };
    assert_eq!(s.render_config().noise_gate, 0.2);
    assert_eq!(s.conditioner().sensitivity, 3.0);

    let opts = s.renderer_opts().unwrap();
    assert_eq!(opts.canvas, Canvas::new(320, 240).unwrap());
    assert_eq!(opts.fps, Fps::new(24, 1).unwrap());

    let bad = Settings {
        fps: 0,
        ..Settings::default()
    };
    assert!(bad.renderer_opts().is_err());
}

#[test]
fn apply_keeps_renderer_only_fields() {
    let r = Renderer::new(RendererOpts {
        seed: Some(0),
        ..RendererOpts::default()
    });
    r.set_blink_jitter(0.0);

    let s = Settings {
        noise_gate_enabled: false,
        idle_enabled: true,
        ..Settings::default()
    };
    s.apply(&r);

    let c = r.config();
    assert_eq!(c.noise_gate, 0.0);
    assert!(c.idle_enabled);
    assert_eq!(c.blink_jitter, 0.0);
}

#[test]
fn default_mic_names_pick_the_host_default() {
    let named = |name: Option<&str>| Settings {
        mic_device: name.map(str::to_string),
        ..Settings::default()
    };
    assert_eq!(named(None).mic_device_name(), None);
    assert_eq!(named(Some("")).mic_device_name(), None);
    assert_eq!(named(Some("Default")).mic_device_name(), None);
    assert_eq!(named(Some("default")).mic_device_name(), None);
    assert_eq!(
        named(Some(" USB Audio ")).mic_device_name(),
        Some("USB Audio")
    );
}
