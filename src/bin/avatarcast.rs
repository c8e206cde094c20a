use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use avatarcast::{Canvas, ManualClock, Renderer, Settings, SimulatedSource, StreamServer};

#[derive(Parser, Debug)]
#[command(name = "avatarcast", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Serve a live frame stream driven by the microphone, or the simulated level source.
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Model JSON; layer files resolve next to it.
    #[arg(long)]
    model: PathBuf,

    /// Raw audio level before sensitivity and gating.
    #[arg(long, default_value_t = 0.0)]
    level: f32,

    /// Renderer clock time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override canvas width.
    #[arg(long)]
    width: Option<u32>,

    /// Override canvas height.
    #[arg(long)]
    height: Option<u32>,

    /// Seed for blink, random and shake effects.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Model JSON; layer files resolve next to it.
    #[arg(long)]
    model: PathBuf,

    /// Settings JSON; missing files fall back to defaults.
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to bind; defaults to the settings port.
    #[arg(long)]
    port: Option<u16>,

    /// Seed for blink, random and shake effects.
    #[arg(long)]
    seed: Option<u64>,

    /// Exit after this many seconds instead of running until killed.
    #[arg(long)]
    duration: Option<f64>,

    /// Drive the avatar from the simulated level source instead of the microphone.
    #[arg(long)]
    simulate: bool,
}

enum LevelFeed {
    Simulated(SimulatedSource),
    #[cfg(feature = "mic")]
    Mic(avatarcast::MicSource),
}

impl LevelFeed {
    fn start(
        settings: &Settings,
        renderer: &Arc<Renderer>,
        simulate: bool,
    ) -> anyhow::Result<Self> {
        #[cfg(feature = "mic")]
        if !simulate {
            let conditioner = settings.conditioner();
            let feed = Arc::clone(renderer);
            match avatarcast::MicSource::start(settings.mic_device_name(), move |raw| {
                feed.set_audio_level(conditioner.apply(raw))
            }) {
                Ok(mic) => return Ok(Self::Mic(mic)),
                Err(e) => {
                    tracing::warn!(error = %e, "microphone unavailable, using simulated levels")
                }
            }
        }
        #[cfg(not(feature = "mic"))]
        if !simulate {
            tracing::info!("built without microphone support, using simulated levels");
        }

        let conditioner = settings.conditioner();
        let feed = Arc::clone(renderer);
        let source =
            SimulatedSource::start(move |raw| feed.set_audio_level(conditioner.apply(raw)))?;
        Ok(Self::Simulated(source))
    }

    fn stop(&mut self) {
        match self {
            Self::Simulated(source) => source.stop(),
            #[cfg(feature = "mic")]
            Self::Mic(mic) => mic.stop(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Serve(args) => cmd_serve(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let mut opts = settings.renderer_opts()?;
    opts.canvas = Canvas::new(
        args.width.unwrap_or(opts.canvas.width),
        args.height.unwrap_or(opts.canvas.height),
    )?;
    opts.seed = Some(args.seed);

    let renderer = Renderer::with_clock(opts, Arc::new(ManualClock::new(args.time)));
    settings.apply(&renderer);
    let summary = renderer.load_model_file(&args.model)?;
    for (layer, error) in &summary.failures {
        eprintln!("warning: layer '{layer}' not drawn: {error}");
    }

    renderer.set_audio_level(settings.conditioner().apply(args.level));
    let png = renderer.render_once()?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(&args.settings);
    let mut opts = settings.renderer_opts()?;
    opts.seed = args.seed;

    let renderer = Arc::new(Renderer::new(opts));
    settings.apply(&renderer);
    let summary = renderer.load_model_file(&args.model)?;
    tracing::info!(
        layers = summary.layers,
        groups = summary.groups,
        failed = summary.failures.len(),
        "model ready"
    );
    renderer.start()?;

    let mut audio = LevelFeed::start(&settings, &renderer, args.simulate)?;

    let port = args.port.unwrap_or(settings.port);
    let mut server = StreamServer::bind((args.bind.as_str(), port), renderer.clone())?;
    eprintln!("streaming on http://{}/stream", server.local_addr());

    let deadline = args
        .duration
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| Instant::now() + Duration::from_secs_f64(d));
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    server.stop();
    audio.stop();
    renderer.stop();
    eprintln!("rendered {} frames", renderer.frames_rendered());
    Ok(())
}
