mod svg;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use leap_core::{ClockMode, FrameReport, InkSession, Viewport};
use leap_store::{DataDir, read_snapshot, write_snapshot};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(name = "leap", about = "Homeostatic forgetting ink engine, headless driver")]
struct Cli {
    /// Data directory (defaults to $LEAP_DATA_DIR, then ~/.leap)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct ViewArgs {
    /// Canvas width in pixels
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Canvas height in pixels
    #[arg(long, default_value_t = 600.0)]
    height: f64,
}

impl ViewArgs {
    fn viewport(self) -> Viewport {
        Viewport::new(self.width, self.height)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Draw one stroke through the given points, one clock tick per point
    Draw {
        /// Points as `x,y`
        #[arg(required = true, num_args = 2.., value_parser = parse_point)]
        points: Vec<(f64, f64)>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Draw random scribbles and report how the controller responds
    Simulate {
        /// Number of scribbles
        #[arg(long, default_value_t = 20)]
        strokes: usize,

        /// Samples per scribble
        #[arg(long, default_value_t = 24)]
        samples: usize,

        /// Virtual seconds that pass between scribbles
        #[arg(long, default_value_t = 1.0)]
        gap: f64,

        /// RNG seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Keep the result as the working canvas
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Replay the canvas from a point in virtual time up to now
    Play {
        /// Start time as a fraction of the timeline span
        #[arg(long, default_value_t = 0.0)]
        from: f64,

        /// Do not wait between ticks
        #[arg(long)]
        instant: bool,

        /// Print a progress line every N ticks
        #[arg(long, default_value_t = 30)]
        every: usize,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Move the canvas to a point in virtual time
    Seek {
        /// Virtual time in seconds
        #[arg(conflicts_with_all = ["fraction", "now"])]
        time: Option<f64>,

        /// Position as a fraction of the timeline span
        #[arg(long, conflicts_with = "now")]
        fraction: Option<f64>,

        /// Jump to the newest committed ink
        #[arg(long)]
        now: bool,
    },

    /// Show canvas statistics at the current virtual time
    Stats {
        #[command(flatten)]
        view: ViewArgs,
    },

    /// List world lines
    Segments,

    /// Render the canvas at the current virtual time as SVG
    Render {
        /// Output file path
        path: PathBuf,

        /// Highlight one world line
        #[arg(long)]
        lane: Option<usize>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Set the target ink density in settings
    SetTarget {
        /// Fraction of the canvas covered, 0..=1
        density: f64,
    },

    /// Drop all ink and return to time zero
    Clear,

    /// Export the canvas to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Replace the canvas with a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn parse_point(s: &str) -> std::result::Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate '{v}'"))
    };
    Ok((parse(x)?, parse(y)?))
}

fn open_data_dir(cli: &Cli) -> Result<DataDir> {
    DataDir::open(cli.data_dir.as_deref()).context("failed to open data directory")
}

fn load_canvas(data: &DataDir) -> Result<InkSession> {
    data.load_session().context("failed to load canvas")
}

fn save_canvas(data: &DataDir, session: &InkSession) -> Result<()> {
    data.save_session(session).context("failed to save canvas")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Draw { points, view } => cmd_draw(&cli, points, *view),
        Commands::Simulate {
            strokes,
            samples,
            gap,
            seed,
            save,
            view,
        } => cmd_simulate(&cli, *strokes, *samples, *gap, *seed, *save, *view),
        Commands::Play {
            from,
            instant,
            every,
            view,
        } => cmd_play(&cli, *from, *instant, *every, *view).await,
        Commands::Seek {
            time,
            fraction,
            now,
        } => cmd_seek(&cli, *time, *fraction, *now),
        Commands::Stats { view } => cmd_stats(&cli, *view),
        Commands::Segments => cmd_segments(&cli),
        Commands::Render { path, lane, view } => cmd_render(&cli, path, *lane, *view),
        Commands::SetTarget { density } => cmd_set_target(&cli, *density),
        Commands::Clear => cmd_clear(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

fn print_frame(report: &FrameReport) {
    println!(
        "t={:>8.3}  density={:.4}  lambda_factor={:.3}  visible={}  retired={}",
        report.virtual_time,
        report.density,
        report.lambda_factor,
        report.decay.drawable,
        report.decay.retired,
    );
}

fn cmd_draw(cli: &Cli, points: &[(f64, f64)], view: ViewArgs) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;

    let (x0, y0) = points[0];
    session.pointer_down(x0, y0);
    for &(x, y) in &points[1..] {
        session.pointer_move(x, y);
        session.tick();
        session.frame(view.viewport());
    }
    let Some(index) = session.pointer_up() else {
        bail!("stroke needs at least two points");
    };
    let report = session.frame(view.viewport());
    save_canvas(&data, &session)?;

    let segments = session.segments();
    let lane = segments.iter().position(|s| s.contains(index)).unwrap_or(0);
    println!(
        "stroke {index} committed at t={:.3} on world line {lane}",
        session.store().strokes()[index].creation_time()
    );
    print_frame(&report);
    Ok(())
}

fn cmd_simulate(
    cli: &Cli,
    strokes: usize,
    samples: usize,
    gap: f64,
    seed: u64,
    save: bool,
    view: ViewArgs,
) -> Result<()> {
    let step = view.width.min(view.height) / 20.0;
    if !(view.width.is_finite() && view.height.is_finite()) || step <= 0.0 {
        bail!(
            "viewport must be finite and positive, got {}x{}",
            view.width,
            view.height
        );
    }
    let data = open_data_dir(cli)?;
    let mut session = if save {
        load_canvas(&data)?
    } else {
        InkSession::new(data.settings().engine.clone())
    };
    let viewport = view.viewport();
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut last = session.frame(viewport);
    for i in 0..strokes {
        let (mut x, mut y) = (
            rng.random_range(0.0..view.width),
            rng.random_range(0.0..view.height),
        );
        session.pointer_down(x, y);
        for _ in 0..samples.max(1) {
            x = (x + rng.random_range(-step..step)).clamp(0.0, view.width);
            y = (y + rng.random_range(-step..step)).clamp(0.0, view.height);
            session.pointer_move(x, y);
            session.tick();
            session.frame(viewport);
        }
        session.pointer_up();
        last = session.frame(viewport);
        print!("stroke {i:>3}  ");
        print_frame(&last);

        if gap > 0.0 {
            session.seek(session.virtual_time() + gap);
        }
    }

    println!(
        "done. strokes={}, density={:.4}, lambda_factor={:.3}",
        session.store().len(),
        last.density,
        last.lambda_factor
    );
    if save {
        save_canvas(&data, &session)?;
    }
    Ok(())
}

async fn cmd_play(cli: &Cli, from: f64, instant: bool, every: usize, view: ViewArgs) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;
    let viewport = view.viewport();

    session.seek_fraction(from);
    if !session.play() {
        bail!("cannot start playback");
    }
    tracing::info!(
        "playing from t={:.3} to t={:.3}",
        session.virtual_time(),
        session.max_virtual_time()
    );

    let period = Duration::from_millis(session.config().timeline.tick_period_ms);
    let mut interval = tokio::time::interval(period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let every = every.max(1);
    let mut ticks = 0usize;
    let mut report = session.frame(viewport);
    let mut interrupted = false;
    while session.clock() == ClockMode::Playing {
        if !instant {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut ctrl_c => {
                    interrupted = true;
                    break;
                }
            }
        }
        session.tick();
        report = session.frame(viewport);
        ticks += 1;
        if ticks % every == 0 {
            print_frame(&report);
        }
    }

    if interrupted {
        session.pause();
        println!("interrupted at t={:.3} after {ticks} ticks", report.virtual_time);
    } else {
        println!("reached now at t={:.3} after {ticks} ticks", report.virtual_time);
    }
    save_canvas(&data, &session)
}

fn cmd_seek(cli: &Cli, time: Option<f64>, fraction: Option<f64>, now: bool) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;

    let rewound = match (time, fraction, now) {
        (Some(t), _, _) => session.seek(t),
        (_, Some(f), _) => session.seek_fraction(f),
        (_, _, true) => session.jump_to_now(),
        _ => bail!("give a time, --fraction or --now"),
    };
    save_canvas(&data, &session)?;

    println!(
        "virtual time {:.3} (now {:.3}){}",
        session.virtual_time(),
        session.max_virtual_time(),
        if rewound { ", rewound" } else { "" }
    );
    Ok(())
}

fn cmd_stats(cli: &Cli, view: ViewArgs) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;
    let report = session.frame(view.viewport());

    println!("strokes:       {}", session.store().len());
    println!("world lines:   {}", session.segments().len());
    println!("virtual_time:  {:.3}", report.virtual_time);
    println!("now:           {:.3}", report.max_virtual_time);
    println!("density:       {:.4}", report.density);
    println!("target:        {:.4}", session.controller().config().target_density);
    println!("lambda_factor: {:.3}", report.lambda_factor);
    println!("lambda:        {:.4}", report.effective_lambda);
    println!("visible:       {}", report.decay.drawable);
    println!("pending:       {}", report.decay.pending);
    println!("retired:       {}", report.decay.retired);
    Ok(())
}

fn cmd_segments(cli: &Cli) -> Result<()> {
    let data = open_data_dir(cli)?;
    let session = load_canvas(&data)?;
    let segments = session.segments();

    if segments.is_empty() {
        println!("(no world lines)");
        return Ok(());
    }
    for seg in &segments {
        println!(
            "lane {:>2}: strokes {}..{} ({}), t={:.3}..{:.3}",
            seg.lane,
            seg.indices.start,
            seg.indices.end,
            seg.len(),
            seg.first_time,
            seg.last_time
        );
    }
    Ok(())
}

fn cmd_render(cli: &Cli, path: &Path, lane: Option<usize>, view: ViewArgs) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;
    session.frame(view.viewport());

    if let Some(lane) = lane {
        let layout = session.lane_layout();
        let y = layout.lane_y(lane) + layout.lane_height / 2.0;
        if session.hover_timeline(Some(y)) != Some(lane) {
            bail!("no world line {lane}");
        }
    }

    let items = session.render_list();
    let doc = svg::render_svg(&items, view.width, view.height);
    std::fs::write(path, doc).with_context(|| format!("failed to write {}", path.display()))?;

    println!("rendered {} strokes to {}", items.len(), path.display());
    Ok(())
}

fn cmd_set_target(cli: &Cli, density: f64) -> Result<()> {
    if !density.is_finite() {
        bail!("target density must be a number");
    }
    let mut data = open_data_dir(cli)?;
    let target = data
        .update_settings(|s| s.engine.controller.target_density = density)
        .context("failed to save settings")?
        .engine
        .controller
        .target_density;

    println!("target density {target:.4}");
    Ok(())
}

fn cmd_clear(cli: &Cli) -> Result<()> {
    let data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;
    let dropped = session.store().len();
    session.clear();
    save_canvas(&data, &session)?;

    println!("cleared {dropped} strokes");
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let mut data = open_data_dir(cli)?;
    let session = load_canvas(&data)?;

    write_snapshot(path, &session.snapshot())
        .with_context(|| format!("failed to write {}", path.display()))?;
    data.remember_folder(path)
        .context("failed to save settings")?;

    println!("exported {} strokes to {}", session.store().len(), path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let mut data = open_data_dir(cli)?;
    let mut session = load_canvas(&data)?;

    let snapshot =
        read_snapshot(path).with_context(|| format!("failed to import {}", path.display()))?;
    session.restore(snapshot);
    save_canvas(&data, &session)?;
    data.remember_folder(path)
        .context("failed to save settings")?;

    println!(
        "imported {} strokes from {}. world lines={}, t={:.3}",
        session.store().len(),
        path.display(),
        session.segments().len(),
        session.virtual_time()
    );
    Ok(())
}
