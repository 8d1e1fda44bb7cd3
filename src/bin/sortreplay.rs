use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use sortreplay::{PlaybackObserver, TraceSource as _};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sortreplay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a trace from the algorithm backend and save it as JSON.
    Fetch(FetchArgs),
    /// Render the frame at one playback position as a PNG.
    Frame(FrameArgs),
    /// Render every position to an MP4 (requires `ffmpeg` on PATH) or a PNG directory.
    Render(RenderArgs),
    /// Play a trace in real time, logging each committed step.
    Play(PlayArgs),
}

#[derive(clap::Args, Debug)]
struct BackendArgs {
    /// Algorithm backend base URL.
    #[arg(long, env = "SORTREPLAY_BACKEND_URL")]
    backend_url: Option<String>,

    /// Request timeout in milliseconds.
    #[arg(long, env = "SORTREPLAY_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Requested array size (backend default when omitted).
    #[arg(long)]
    size: Option<u32>,

    /// Requested sort direction (backend default when omitted).
    #[arg(long, value_enum)]
    direction: Option<DirectionChoice>,
}

#[derive(clap::Args, Debug)]
struct SurfaceArgs {
    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Render settings JSON (viewport + palette).
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FetchArgs {
    /// Algorithm name, e.g. `bubble`, `merge`, `quick`.
    #[arg(long)]
    algorithm: String,

    /// Output trace JSON path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input trace JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Number of committed actions (0 = the unsorted input).
    #[arg(long)]
    position: usize,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    surface: SurfaceArgs,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input trace JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output `.mp4` file, or a directory for a PNG sequence.
    #[arg(long)]
    out: PathBuf,

    /// Output frames per second (MP4 only).
    #[arg(long, default_value_t = sortreplay::present::DEFAULT_FPS)]
    fps: u32,

    #[command(flatten)]
    surface: SurfaceArgs,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Fetch this algorithm from the backend.
    #[arg(long, conflicts_with = "in_path", required_unless_present = "in_path")]
    algorithm: Option<String>,

    /// Replay a saved trace JSON instead of fetching.
    #[arg(long = "in")]
    in_path: Option<PathBuf>,

    /// Milliseconds between steps.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Also write each committed frame as a PNG into this directory.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(flatten)]
    surface: SurfaceArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionChoice {
    Asc,
    Desc,
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
        Command::Fetch(args) => cmd_fetch(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
        Command::Play(args) => cmd_play(args),
    }
}

fn fetch_bundle(algorithm: &str, args: &BackendArgs) -> anyhow::Result<sortreplay::TraceBundle> {
    let mut cfg = sortreplay::ClientConfig::from_env();
    if let Some(url) = &args.backend_url {
        cfg.base_url = url.clone();
    }
    if let Some(ms) = args.timeout_ms.filter(|&ms| ms > 0) {
        cfg.timeout = Duration::from_millis(ms);
    }

    let request = sortreplay::TraceRequest {
        array_size: args.size,
        sort_direction: args.direction.map(|d| match d {
            DirectionChoice::Asc => sortreplay::SortDirection::Asc,
            DirectionChoice::Desc => sortreplay::SortDirection::Desc,
        }),
    };

    let source = sortreplay::HttpTraceSource::new(cfg)?;
    let bundle = source
        .load_trace(algorithm, &request)
        .with_context(|| format!("load trace for '{algorithm}'"))?;
    Ok(bundle)
}

fn read_settings(args: &SurfaceArgs) -> anyhow::Result<sortreplay::RenderSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read settings '{}'", path.display()))?;
            serde_json::from_str::<sortreplay::RenderSettings>(&text)
                .with_context(|| "parse settings JSON")?
        }
        None => sortreplay::RenderSettings::default(),
    };
    if let Some(w) = args.width {
        settings.viewport.width = w;
    }
    if let Some(h) = args.height {
        settings.viewport.height = h;
    }
    settings.validate()?;
    Ok(settings)
}

fn cmd_fetch(args: FetchArgs) -> anyhow::Result<()> {
    let bundle = fetch_bundle(&args.algorithm, &args.backend)?;
    bundle.write_json(&args.out)?;
    eprintln!(
        "wrote {} ({} values, {} actions)",
        args.out.display(),
        bundle.original.len(),
        bundle.trace.len()
    );
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let bundle = sortreplay::TraceBundle::read_json(&args.in_path)?;
    let settings = read_settings(&args.surface)?;
    if args.position > bundle.trace.len() {
        anyhow::bail!(
            "position {} is past the end of the trace ({} actions)",
            args.position,
            bundle.trace.len()
        );
    }

    let mut engine = sortreplay::ReplayEngine::new();
    engine.load_bundle(bundle)?;
    for _ in 0..args.position {
        engine.step()?;
    }

    let renderer = sortreplay::CpuBarRenderer::new(settings)?;
    let frame = renderer.render(
        engine.working_array(),
        engine.current_action(),
        engine.fixed_max(),
    )?;
    sortreplay::write_png(&args.out, &frame, settings.palette.background.to_array())?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let bundle = sortreplay::TraceBundle::read_json(&args.in_path)?;
    let settings = read_settings(&args.surface)?;

    let is_mp4 = args
        .out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp4"));
    let frames = if is_mp4 {
        let sink = sortreplay::FfmpegSink::new(&args.out, true);
        render_all(bundle, settings, sink, args.fps)?
    } else {
        let sink = sortreplay::PngSequenceSink::new(&args.out);
        render_all(bundle, settings, sink, args.fps)?
    };

    eprintln!("wrote {} ({frames} frames)", args.out.display());
    Ok(())
}

/// Step through the whole trace, presenting position 0 through the terminal position.
fn render_all<S: sortreplay::FrameSink>(
    bundle: sortreplay::TraceBundle,
    settings: sortreplay::RenderSettings,
    sink: S,
    fps: u32,
) -> anyhow::Result<u64> {
    let presenter = sortreplay::Presenter::new(settings, sink)?.with_fps(fps);
    let mut engine =
        sortreplay::ReplayEngine::with_parts(presenter, sortreplay::MonotonicClock::new());
    engine.load_bundle(bundle)?;
    for _ in 0..engine.trace_len() {
        engine.step()?;
    }
    let presenter = engine.into_observer();
    let frames = presenter.frames_presented();
    presenter.finish()?;
    Ok(frames)
}

/// Logs each committed frame and optionally writes it out.
struct PlayObserver {
    presenter: Option<sortreplay::Presenter<sortreplay::PngSequenceSink>>,
}

impl PlaybackObserver for PlayObserver {
    fn on_commit(&mut self, view: &sortreplay::FrameView<'_>) -> sortreplay::ReplayResult<()> {
        tracing::info!(
            position = view.position,
            of = view.trace_len,
            state = ?view.state,
            action = ?view.action,
            "frame"
        );
        match self.presenter.as_mut() {
            Some(p) => p.on_commit(view),
            None => Ok(()),
        }
    }
}

fn cmd_play(args: PlayArgs) -> anyhow::Result<()> {
    let bundle = match (&args.algorithm, &args.in_path) {
        (_, Some(path)) => sortreplay::TraceBundle::read_json(path)?,
        (Some(name), None) => fetch_bundle(name, &args.backend)?,
        (None, None) => anyhow::bail!("either --algorithm or --in is required"),
    };
    let settings = read_settings(&args.surface)?;

    let presenter = args
        .out_dir
        .as_deref()
        .map(|dir: &Path| {
            sortreplay::Presenter::new(settings, sortreplay::PngSequenceSink::new(dir))
        })
        .transpose()?;

    let mut engine = sortreplay::ReplayEngine::with_parts(
        PlayObserver { presenter },
        sortreplay::MonotonicClock::new(),
    );
    engine.change_rate(Duration::from_millis(args.interval_ms.max(1)))?;
    engine.load_bundle(bundle)?;
    engine.play()?;
    let ticks = engine.run_until_idle()?;

    let state = engine.state();
    if let Some(p) = engine.into_observer().presenter {
        p.finish()?;
    }
    eprintln!("playback {state:?} after {ticks} steps");
    Ok(())
}
