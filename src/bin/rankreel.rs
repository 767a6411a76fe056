use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;

use rankreel::render::thumbs::ThumbnailSource;
use rankreel::services::{narration::CommandNarrator, theme_file::ThemeFile, ytdlp::YtDlp};
use rankreel::text::shaper::FontWeight;

#[derive(Parser, Debug)]
#[command(name = "rankreel", version)]
struct Cli {
    /// JSON configuration file; unset fields keep their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the scratch directory.
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    /// Override the output directory.
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Rasterization threads (0 renders sequentially).
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a full ranking video (requires `ffmpeg`, `yt-dlp` and the narrator on PATH).
    Run(RunArgs),
    /// Render one card's overlay frames for inspection.
    Card(CardArgs),
    /// Print the intro and card filter graphs.
    Graph(GraphArgs),
    /// Score search results for one song.
    Score(ScoreArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Theme JSON (`theme_title` + `ranking`).
    #[arg(long)]
    theme: PathBuf,
}

#[derive(Parser, Debug)]
struct CardArgs {
    /// Theme JSON containing the entry.
    #[arg(long)]
    theme: PathBuf,

    /// Rank of the entry to render.
    #[arg(long)]
    rank: u32,

    /// Output directory for `frame_%04d.png`.
    #[arg(long)]
    out: PathBuf,

    /// Thumbnail image, or a directory of `thumb_%04d.jpg` frames.
    #[arg(long)]
    thumb: Option<PathBuf>,

    /// Card duration in seconds (defaults to the configured card length).
    #[arg(long)]
    duration: Option<f64>,

    /// Print which fonts were resolved (source + SHA-256 of font bytes).
    #[arg(long)]
    dump_fonts: bool,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Theme title for the intro.
    #[arg(long)]
    title: String,

    /// Background clip.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Offset into the background for the card.
    #[arg(long, default_value_t = 0.0)]
    seek: f64,

    /// Whether the background has an audio stream.
    #[arg(long)]
    silent_background: bool,

    /// Narration audio for the intro.
    #[arg(long, default_value = "narration.mp3")]
    narration: PathBuf,

    /// Narration length in seconds, if known.
    #[arg(long)]
    narration_duration: Option<f64>,

    /// Directory holding the card's overlay frames.
    #[arg(long, default_value = "frames")]
    frames: PathBuf,
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    /// JSON array of `{title, channel, url, duration_seconds}`.
    #[arg(long)]
    entries: PathBuf,

    #[arg(long)]
    artist: String,

    #[arg(long)]
    song: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli)?;
    match cli.cmd {
        Command::Run(args) => cmd_run(cfg, args),
        Command::Card(args) => cmd_card(cfg, args),
        Command::Graph(args) => cmd_graph(cfg, args),
        Command::Score(args) => cmd_score(cfg, args),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<rankreel::ReelConfig> {
    let mut cfg = match &cli.config {
        Some(path) => rankreel::ReelConfig::load(path)?,
        None => rankreel::ReelConfig::default(),
    };
    if let Some(s) = &cli.scratch {
        cfg.dirs.scratch = s.clone();
    }
    if let Some(o) = &cli.output {
        cfg.dirs.output = o.clone();
    }
    match cli.threads {
        Some(0) => cfg.threading.parallel = false,
        Some(n) => {
            cfg.threading.parallel = true;
            cfg.threading.threads = Some(n);
        }
        None => {}
    }
    cfg.validate()?;
    Ok(cfg)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn cmd_run(cfg: rankreel::ReelConfig, args: RunArgs) -> anyhow::Result<()> {
    let fonts = rankreel::FontSet::load(&cfg.fonts)?;
    let media = rankreel::Ffmpeg::new(&cfg)?;
    let ytdlp = YtDlp::new(&cfg.acquisition, Some(&cfg.encoder.ffmpeg))?;
    let collab = rankreel::Collaborators {
        content: Box::new(ThemeFile::new(args.theme)),
        search: Box::new(ytdlp.clone()),
        downloader: Box::new(ytdlp),
        narrator: Box::new(CommandNarrator::new(&cfg.narrator)?),
        media: Box::new(media),
    };
    let orchestrator = rankreel::ClipPipelineOrchestrator::new(cfg, fonts, collab)?;

    let handle = rankreel::spawn_run(orchestrator)?;
    for event in handle.events.iter() {
        eprintln!("{}", describe(&event));
    }
    let report = handle.wait()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    match report.outcome {
        rankreel::RunOutcome::Finished { output } => {
            eprintln!("wrote {}", output.display());
            Ok(())
        }
        rankreel::RunOutcome::NothingProduced => anyhow::bail!("no clip was produced"),
    }
}

fn describe(event: &rankreel::PipelineEvent) -> String {
    use rankreel::PipelineEvent as E;
    match event {
        E::RunStarted => "run started".to_string(),
        E::ThemeReady { title, items } => format!("theme: {title} ({items} items)"),
        E::IntroBuilt { clip, duration_s } => {
            format!("intro built: {} ({duration_s:.2}s)", clip.display())
        }
        E::IntroSkipped { reason } => format!("intro skipped: {reason}"),
        E::StageEntered { rank, stage } => format!("#{rank}: {stage}"),
        E::CandidateSelected { rank, title, score } => {
            format!("#{rank}: selected '{title}' (score {score})")
        }
        E::ItemDone { rank, clip } => format!("#{rank}: done -> {}", clip.display()),
        E::ItemSkipped {
            rank,
            stage,
            reason,
        } => format!("#{rank}: skipped while {stage}: {reason}"),
        E::Concatenating { clips } => format!("concatenating {clips} clips"),
        E::Finished { output } => format!("finished: {}", output.display()),
        E::NothingProduced => "nothing produced".to_string(),
    }
}

fn cmd_card(cfg: rankreel::ReelConfig, args: CardArgs) -> anyhow::Result<()> {
    let theme: rankreel::ThemeData = read_json(&args.theme, "theme")?;
    let entry = theme
        .ranking
        .iter()
        .find(|e| e.rank == args.rank)
        .with_context(|| format!("theme has no entry with rank {}", args.rank))?;

    let fonts = rankreel::FontSet::load(&cfg.fonts)?;
    if args.dump_fonts {
        dump_font_diagnostics(&fonts);
    }

    let thumbs = match args.thumb {
        Some(p) if p.is_dir() => ThumbnailSource::Sequence(p),
        Some(p) => ThumbnailSource::Still(p),
        None => ThumbnailSource::None,
    };
    let duration = args.duration.unwrap_or(cfg.card_duration_s);
    let compositor = rankreel::FrameCompositor::new(&cfg, fonts)?;
    let frames = compositor.render(entry, &theme.title, &thumbs, duration, &args.out)?;

    eprintln!(
        "wrote {} frames to {}",
        frames.count,
        frames.dir.display()
    );
    Ok(())
}

fn dump_font_diagnostics(fonts: &rankreel::FontSet) {
    eprintln!("font diagnostics:");
    for (label, weight) in [("bold", FontWeight::Bold), ("regular", FontWeight::Regular)] {
        let font = fonts.get(weight);
        eprintln!("  {label}:");
        eprintln!("    source: {}", font.source);
        eprintln!("    sha256: {}", sha256_hex(&font.bytes));
    }
}

fn cmd_graph(cfg: rankreel::ReelConfig, args: GraphArgs) -> anyhow::Result<()> {
    let compiler = rankreel::FilterGraphCompiler::new(&cfg)?;
    let font = rankreel::FontSet::load(&cfg.fonts)
        .ok()
        .and_then(|f| f.get(FontWeight::Bold).file_path().map(Path::to_path_buf));

    let background = args.background.map(|path| rankreel::BackgroundClip {
        path,
        seek_s: args.seek,
        has_audio: !args.silent_background,
    });

    let intro = compiler.compile_intro(
        &args.title,
        background.as_ref(),
        &args.narration,
        args.narration_duration,
        font.as_deref(),
    );
    let frames = rankreel::FrameSequence {
        dir: args.frames,
        count: cfg.card_frames(),
        fps: cfg.fps()?,
    };
    let card = compiler.compile_card(background.as_ref(), &frames);

    println!("intro:\n{}\n", intro.to_filter_complex()?);
    println!("card:\n{}", card.to_filter_complex()?);
    Ok(())
}

fn cmd_score(cfg: rankreel::ReelConfig, args: ScoreArgs) -> anyhow::Result<()> {
    let entries: Vec<rankreel::SearchEntry> = read_json(&args.entries, "search entries")?;
    let scorer = rankreel::CandidateScorer::new(cfg.scoring);
    let ranked = scorer.rank(&entries, &args.artist, &args.song);
    println!("{}", serde_json::to_string_pretty(&ranked)?);

    let best = scorer.score(&entries, &args.artist, &args.song)?;
    eprintln!("best: {} ({})", best.title, best.score);
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
