use super::*;
use crate::foundation::clock::ManualClock;

fn small_opts() -> RendererOpts {
    RendererOpts {
        canvas: Canvas::new(8, 8).unwrap(),
        fps: Fps::new(120, 1).unwrap(),
        seed: Some(1),
        stop_timeout: Duration::from_secs(1),
    }
}

fn manual() -> (Renderer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let r = Renderer::with_clock(small_opts(), clock.clone());
    (r, clock)
}

#[test]
fn audio_level_is_sanitized_and_gated() {
    let (r, _) = manual();
    r.set_noise_gate(0.1);

    r.set_audio_level(0.5);
    assert_eq!(r.audio_level(), 0.5);
    r.set_audio_level(0.1);
    assert_eq!(r.audio_level(), 0.0);
    r.set_audio_level(-3.0);
    assert_eq!(r.audio_level(), 0.0);
    r.set_audio_level(f32::NAN);
    assert_eq!(r.audio_level(), 0.0);
    r.set_audio_level(f32::INFINITY);
    assert_eq!(r.audio_level(), 0.0);
    r.set_audio_level(2.0);
    assert_eq!(r.audio_level(), 1.0);
    r.set_audio_level(1.0e7);
    assert_eq!(r.audio_level(), 1.0);
}

#[test]
fn setters_update_the_config_snapshot() {
    let (r, _) = manual();
    let t = Thresholds {
        silent: 0.1,
        whisper: 0.2,
        normal: 0.3,
        shout: 0.4,
    };
    r.set_thresholds(t);
    r.set_thresholds(t);
    r.set_noise_gate(-1.0);
    r.set_idle(true, 2.5);
    r.set_blink_jitter(0.0);
    r.set_precedence([ResolveStage::Open, ResolveStage::Open, ResolveStage::Blink]);
    r.set_effects(EffectToggles {
        shake: true,
        ..EffectToggles::default()
    });
    r.set_active_states(ActiveStates {
        shout: false,
        ..ActiveStates::default()
    });

    let c = r.config();
    assert_eq!(c.thresholds, t);
    assert_eq!(c.noise_gate, 0.0);
    assert!(c.idle_enabled);
    assert_eq!(c.idle_timeout, 2.5);
    assert_eq!(c.blink_jitter, 0.0);
    assert_eq!(c.precedence, vec![ResolveStage::Open, ResolveStage::Blink]);
    assert!(c.effects.shake);
    assert!(!c.active_states.shout);

    let mut whole = RenderConfig::default();
    whole.noise_gate = 0.3;
    whole.precedence = vec![ResolveStage::Random, ResolveStage::Random];
    r.set_config(whole);
    assert_eq!(r.config().precedence, vec![ResolveStage::Random]);
    r.set_audio_level(0.25);
    assert_eq!(r.audio_level(), 0.0);
}

#[test]
fn render_once_without_model_is_blank() {
    let (r, _) = manual();
    assert!(r.get_frame_bytes().is_none());

    let png = r.render_once().unwrap();
    assert_eq!(r.frames_rendered(), 1);
    assert_eq!(r.get_frame_bytes().as_deref(), Some(&*png));

    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (8, 8));
    assert!(img.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn idle_follows_activity_on_the_clock() {
    let (r, clock) = manual();
    r.set_idle(true, 5.0);
    r.set_noise_gate(0.05);

    clock.set(5.0);
    assert!(!r.idle_active());
    clock.set(5.25);
    assert!(r.idle_active());

    // Gated levels do not count as activity.
    r.set_audio_level(0.04);
    assert!(r.idle_active());

    r.set_audio_level(0.5);
    assert!(!r.idle_active());

    clock.advance(5.0);
    assert!(!r.idle_active());
    clock.advance(0.25);
    assert!(r.idle_active());

    let png = r.render_once().unwrap();
    let img = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 128]);
}

#[test]
fn load_model_bumps_generation_and_reports_failures() {
    let (r, _) = manual();
    let model = Model::from_json_str(
        r#"{"name": "m", "layers": [{"name": "a", "file": "nope.png"}, {"name": "b"}]}"#,
    )
    .unwrap();
    let dir = std::env::temp_dir();

    let first = r.load_model(model.clone(), &dir);
    assert_eq!(first.generation, 1);
    assert_eq!(first.layers, 2);
    assert_eq!(first.prepared, 0);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].0, "a");

    let second = r.load_model(model.clone(), &dir);
    assert_eq!(second.generation, 2);
    assert_eq!(r.model(), Some(model));
}

#[test]
fn start_and_stop_are_idempotent() {
    let r = Renderer::new(small_opts());
    assert!(!r.is_running());
    r.stop();

    r.start().unwrap();
    r.start().unwrap();
    assert!(r.is_running());

    let deadline = Instant::now() + Duration::from_secs(5);
    while r.get_frame_bytes().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(r.get_frame_bytes().is_some());

    r.stop();
    r.stop();
    assert!(!r.is_running());

    let after = r.frames_rendered();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(r.frames_rendered(), after);

    r.start().unwrap();
    assert!(r.is_running());
}
