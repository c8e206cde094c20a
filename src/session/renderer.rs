use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::composite::compositor::{FrameCompositor, TickInputs};
use crate::composite::effects::is_idle;
use crate::config::render::{
    ActiveStates, EffectToggles, RenderConfig, ResolveStage, Thresholds, dedup_stages,
};
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{AvatarError, AvatarResult};
use crate::foundation::sync::lock;
use crate::model::avatar::Model;
use crate::resolve::resolver::GroupStateResolver;
use crate::session::scene::{LoadSummary, Scene};

/// Longest single sleep in the render loop, so `stop` is noticed promptly at low frame rates.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(20);
const STOP_POLL: Duration = Duration::from_millis(2);

/// Construction-time renderer options.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererOpts {
    /// Output canvas.
    pub canvas: Canvas,
    /// Target frame rate of the render loop.
    pub fps: Fps,
    /// Seed for blink jitter, random switching and shake. `None` picks one at random.
    pub seed: Option<u64>,
    /// How long `stop` waits for the render thread before detaching it.
    pub stop_timeout: Duration,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas {
                width: 700,
                height: 700,
            },
            fps: Fps { num: 60, den: 1 },
            seed: None,
            stop_timeout: Duration::from_secs(1),
        }
    }
}

/// Audio inputs written by any thread and read once per tick. Floats are stored as raw bits.
#[derive(Debug)]
struct AudioState {
    level_bits: AtomicU32,
    gate_bits: AtomicU32,
    last_activity_bits: AtomicU64,
}

impl AudioState {
    fn new(gate: f32, now: f64) -> Self {
        Self {
            level_bits: AtomicU32::new(0.0f32.to_bits()),
            gate_bits: AtomicU32::new(gate.to_bits()),
            last_activity_bits: AtomicU64::new(now.to_bits()),
        }
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Acquire))
    }

    fn gate(&self) -> f32 {
        f32::from_bits(self.gate_bits.load(Ordering::Acquire))
    }

    fn set_gate(&self, gate: f32) {
        self.gate_bits.store(gate.to_bits(), Ordering::Release);
    }

    fn last_activity(&self) -> f64 {
        f64::from_bits(self.last_activity_bits.load(Ordering::Acquire))
    }
}

/// State owned by whichever thread is running a tick.
#[derive(Debug)]
struct TickState {
    resolver: Option<(u64, GroupStateResolver)>,
    compositor: FrameCompositor,
}

struct Shared {
    opts: RendererOpts,
    seed: u64,
    clock: Arc<dyn Clock>,
    frame: Mutex<Option<Arc<[u8]>>>,
    scene: Mutex<Option<Arc<Scene>>>,
    generation: AtomicU64,
    config: Mutex<RenderConfig>,
    audio: AudioState,
    tick: Mutex<TickState>,
    running: AtomicBool,
    frames_rendered: AtomicU64,
}

struct RunHandle {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

/// Drives the render loop and publishes the latest encoded frame.
///
/// All methods take `&self` and may be called from any thread; wrap the renderer in an [`Arc`] to
/// share it. Configuration and audio updates are picked up on the next tick.
pub struct Renderer {
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("opts", &self.shared.opts)
            .field("running", &self.is_running())
            .field("frames_rendered", &self.frames_rendered())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Stopped renderer on the system clock with the default configuration.
    pub fn new(opts: RendererOpts) -> Self {
        Self::with_clock(opts, Arc::new(SystemClock::new()))
    }

    /// Stopped renderer reading time from `clock`.
    pub fn with_clock(opts: RendererOpts, clock: Arc<dyn Clock>) -> Self {
        let seed = opts.seed.unwrap_or_else(rand::random);
        let config = RenderConfig::default();
        let now = clock.now_secs();
        let shared = Shared {
            seed,
            clock,
            frame: Mutex::new(None),
            scene: Mutex::new(None),
            generation: AtomicU64::new(0),
            audio: AudioState::new(config.noise_gate, now),
            config: Mutex::new(config),
            tick: Mutex::new(TickState {
                resolver: None,
                compositor: FrameCompositor::new(opts.canvas, seed),
            }),
            running: AtomicBool::new(false),
            frames_rendered: AtomicU64::new(0),
            opts,
        };
        Self {
            shared: Arc::new(shared),
            run: Mutex::new(None),
        }
    }

    /// Start the render thread. Calling it while running does nothing.
    pub fn start(&self) -> AvatarResult<()> {
        let mut run = lock(&self.run);
        if let Some(h) = run.as_ref()
            && !h.handle.is_finished()
        {
            return Ok(());
        }
        if let Some(old) = run.take()
            && old.handle.join().is_err()
        {
            warn!("previous render thread panicked");
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&self.shared);
        let thread_cancel = Arc::clone(&cancel);
        let handle = thread::Builder::new()
            .name("avatarcast-render".to_string())
            .spawn(move || render_loop(&shared, &thread_cancel))
            .map_err(|e| AvatarError::render(format!("failed to spawn render thread: {e}")))?;

        self.shared.running.store(true, Ordering::Release);
        *run = Some(RunHandle { handle, cancel });
        info!(
            width = self.shared.opts.canvas.width,
            height = self.shared.opts.canvas.height,
            fps = self.shared.opts.fps.as_f64(),
            "render loop started"
        );
        Ok(())
    }

    /// Stop the render thread, waiting up to `stop_timeout` for it to exit.
    ///
    /// A thread that does not exit in time is detached; it still observes its cancel flag and
    /// ends after its current tick. Safe to call repeatedly.
    pub fn stop(&self) {
        let Some(RunHandle { handle, cancel }) = lock(&self.run).take() else {
            return;
        };
        cancel.store(true, Ordering::Release);
        self.shared.running.store(false, Ordering::Release);

        let deadline = Instant::now() + self.shared.opts.stop_timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(STOP_POLL);
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("render thread panicked");
            }
            info!("render loop stopped");
        } else {
            warn!(
                timeout = ?self.shared.opts.stop_timeout,
                "render thread did not stop in time; detaching"
            );
        }
    }

    /// Whether the render thread is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Replace the current model.
    ///
    /// Images are prepared on the calling thread without blocking the render loop; the finished
    /// scene is swapped in as a whole and group timers restart on the next tick. When two loads
    /// race, the one started last wins.
    pub fn load_model(&self, model: Model, dir: &Path) -> LoadSummary {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let scene = Arc::new(Scene::prepare(model, dir, generation));
        let summary = scene.summary();

        let mut slot = lock(&self.shared.scene);
        if slot.as_ref().is_none_or(|s| s.generation < generation) {
            *slot = Some(scene);
            info!(
                generation,
                layers = summary.layers,
                prepared = summary.prepared,
                failed = summary.failures.len(),
                "model loaded"
            );
        } else {
            debug!(generation, "a newer model was loaded meanwhile; discarding");
        }
        summary
    }

    /// Load a model file, resolving layer files next to it.
    pub fn load_model_file(&self, path: &Path) -> AvatarResult<LoadSummary> {
        let model = Model::load(path)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(self.load_model(model, dir))
    }

    /// Currently loaded model, if any.
    pub fn model(&self) -> Option<Model> {
        lock(&self.shared.scene).as_ref().map(|s| s.model.clone())
    }

    /// Feed a new audio level. Non-finite values count as silence and the level is clamped to
    /// `[0, 1]`; levels at or below the noise gate become zero and do not count as activity.
    pub fn set_audio_level(&self, level: f32) {
        let level = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let audio = &self.shared.audio;
        let gated = if level > audio.gate() { level } else { 0.0 };
        audio.level_bits.store(gated.to_bits(), Ordering::Release);
        if gated > 0.0 {
            let now = self.shared.clock.now_secs();
            audio
                .last_activity_bits
                .store(now.to_bits(), Ordering::Release);
        }
    }

    /// Last gated audio level.
    pub fn audio_level(&self) -> f32 {
        self.shared.audio.level()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> RenderConfig {
        lock(&self.shared.config).clone()
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, mut config: RenderConfig) {
        config.precedence = dedup_stages(config.precedence);
        config.noise_gate = sanitize_gate(config.noise_gate);
        self.shared.audio.set_gate(config.noise_gate);
        *lock(&self.shared.config) = config;
    }

    fn update_config(&self, f: impl FnOnce(&mut RenderConfig)) {
        f(&mut *lock(&self.shared.config));
    }

    /// Replace the voice thresholds.
    pub fn set_thresholds(&self, thresholds: Thresholds) {
        if !thresholds.is_monotonic() {
            warn!(?thresholds, "thresholds are not ascending");
        }
        self.update_config(|c| c.thresholds = thresholds);
    }

    /// Enable or disable voice states.
    pub fn set_active_states(&self, active: ActiveStates) {
        self.update_config(|c| c.active_states = active);
    }

    /// Replace the effect toggles.
    pub fn set_effects(&self, effects: EffectToggles) {
        self.update_config(|c| c.effects = effects);
    }

    /// Set the noise gate; negative and non-finite values become zero.
    pub fn set_noise_gate(&self, gate: f32) {
        let gate = sanitize_gate(gate);
        self.shared.audio.set_gate(gate);
        self.update_config(|c| c.noise_gate = gate);
    }

    /// Configure idle dimming.
    pub fn set_idle(&self, enabled: bool, timeout_secs: f64) {
        let timeout = if timeout_secs.is_finite() {
            timeout_secs.max(0.0)
        } else {
            0.0
        };
        self.update_config(|c| {
            c.idle_enabled = enabled;
            c.idle_timeout = timeout;
        });
    }

    /// Set the relative blink interval jitter.
    pub fn set_blink_jitter(&self, jitter: f64) {
        self.update_config(|c| c.blink_jitter = jitter);
    }

    /// Set the override order tried before voice classification. Repeats are dropped.
    pub fn set_precedence(&self, stages: impl IntoIterator<Item = ResolveStage>) {
        let stages = dedup_stages(stages);
        self.update_config(|c| c.precedence = stages);
    }

    /// Whether idle dimming applies right now.
    pub fn idle_active(&self) -> bool {
        let config = self.config();
        is_idle(
            &config,
            self.shared.clock.now_secs(),
            self.shared.audio.last_activity(),
        )
    }

    /// Latest published PNG frame. Never blocks on rendering.
    pub fn get_frame_bytes(&self) -> Option<Arc<[u8]>> {
        lock(&self.shared.frame).clone()
    }

    /// Run one tick on the calling thread and publish its frame.
    pub fn render_once(&self) -> AvatarResult<Arc<[u8]>> {
        tick(&self.shared)
    }

    /// Frames published so far.
    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames_rendered.load(Ordering::Relaxed)
    }

    /// Target frame rate.
    pub fn fps(&self) -> Fps {
        self.shared.opts.fps
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.shared.opts.canvas
    }

    /// Seed in use.
    pub fn seed(&self) -> u64 {
        self.shared.seed
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sanitize_gate(gate: f32) -> f32 {
    if gate.is_finite() { gate.max(0.0) } else { 0.0 }
}

fn render_loop(shared: &Shared, cancel: &AtomicBool) {
    let period = shared.opts.fps.frame_duration();
    let mut next = Instant::now();
    while !cancel.load(Ordering::Acquire) {
        if let Err(e) = tick(shared) {
            warn!(error = %e, "render tick failed");
        }

        next += period;
        let now = Instant::now();
        if next <= now {
            // Behind schedule: skip the missed slots instead of bursting.
            next = now;
            continue;
        }
        while !cancel.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= next {
                break;
            }
            thread::sleep((next - now).min(MAX_SLEEP_SLICE));
        }
    }
}

fn tick(shared: &Shared) -> AvatarResult<Arc<[u8]>> {
    let now = shared.clock.now_secs();
    let scene = lock(&shared.scene).clone();
    let config = lock(&shared.config).clone();
    let inputs = TickInputs {
        now,
        level: shared.audio.level(),
        last_activity: shared.audio.last_activity(),
        config: &config,
    };

    let frame = {
        let mut state = lock(&shared.tick);
        let TickState {
            resolver,
            compositor,
        } = &mut *state;
        match scene.as_deref() {
            Some(scene) => {
                if resolver
                    .as_ref()
                    .is_none_or(|(generation, _)| *generation != scene.generation)
                {
                    debug!(generation = scene.generation, "resetting group timers");
                    *resolver = Some((
                        scene.generation,
                        GroupStateResolver::new(&scene.model, shared.seed),
                    ));
                }
                match resolver {
                    Some((_, r)) => compositor.compose(&scene.model, &scene.store, r, &inputs),
                    None => compositor.compose_blank(&inputs),
                }
            }
            None => compositor.compose_blank(&inputs),
        }
    };

    let png = frame.encode_png()?;
    *lock(&shared.frame) = Some(Arc::clone(&png));
    shared.frames_rendered.fetch_add(1, Ordering::Relaxed);
    Ok(png)
}

#[cfg(test)]
#[path = "../../tests/unit/session/renderer.rs"]
mod tests;
