// beatline: command-line front end for the judgment engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use beatline::config::{LatencyOffset, PlayerConfig};
use beatline::database::{SqliteScoreStore, default_score_db_path, scan_catalog};
use beatline::model::parse_beatmap;
use beatline::state::session::{
    EngineEvent, SessionController, SessionOptions, drive_autoplay,
};
use beatline::traits::{ManualClock, PreparedLoader};
use beatline::util::{UserError, init_logging};

#[derive(Parser, Debug)]
#[command(name = "beatline", about = "Tap-timing judgment engine tools")]
struct Cli {
    /// Show debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to a daily file in this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Player config JSON file (defaults to the platform config directory).
    #[arg(long, global = true, env = "BEATLINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarize a beatmap file.
    Inspect {
        beatmap: PathBuf,
    },
    /// List the songs under beatmap directories with their best scores.
    Songs {
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// Score database path.
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Play a beatmap with perfect scripted taps and record the result.
    Autoplay(AutoplayArgs),
    /// Show or step the persisted latency offset.
    Latency {
        #[arg(long, conflicts_with = "down")]
        up: bool,
        #[arg(long)]
        down: bool,
    },
}

#[derive(Args, Debug)]
struct AutoplayArgs {
    beatmap: PathBuf,

    /// Track length reported by the simulated clock.
    #[arg(long)]
    duration_ms: Option<f64>,

    /// Override the configured latency offset.
    #[arg(long, allow_hyphen_values = true)]
    latency_ms: Option<i32>,

    /// Score database path.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Clock tick interval.
    #[arg(long, default_value_t = 16.0)]
    tick_ms: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref(), cli.verbose)?;

    let config_path = cli.config.clone().unwrap_or_else(PlayerConfig::default_path);
    match cli.command {
        Command::Inspect { beatmap } => inspect(&beatmap),
        Command::Songs { dirs, db } => songs(&dirs, db),
        Command::Autoplay(args) => autoplay(&args, &config_path),
        Command::Latency { up, down } => latency(&config_path, up, down),
    }
}

fn read_beatmap_text(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!(UserError::beatmap_not_found(path));
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn inspect(path: &Path) -> Result<()> {
    let beatmap = parse_beatmap(&read_beatmap_text(path)?)
        .map_err(|e| anyhow::anyhow!("{}\n{e}", UserError::beatmap_invalid(e.field())))?;

    let mut per_lane: BTreeMap<i64, usize> = BTreeMap::new();
    for note in &beatmap.notes {
        *per_lane.entry(note.lane).or_default() += 1;
    }

    println!(
        "{} / {} [{}] level {}",
        beatmap.song_title, beatmap.artist, beatmap.difficulty_name, beatmap.level
    );
    println!("notes: {}", beatmap.note_count());
    for (lane, count) in &per_lane {
        println!("  lane {lane}: {count}");
    }
    if let Some(first) = beatmap.notes.first() {
        println!("first hit: {} ms", first.time_ms + beatmap.offset_ms);
    }
    for note in beatmap.notes.iter().take(5) {
        println!(
            "  {:>8.1} ms  lane {}  {:?}",
            note.time_ms, note.lane, note.note_type
        );
    }
    Ok(())
}

fn songs(dirs: &[PathBuf], db: Option<PathBuf>) -> Result<()> {
    let catalog = scan_catalog(dirs)?;
    if catalog.is_empty() {
        bail!("no beatmaps found");
    }

    let db_path = db.unwrap_or_else(default_score_db_path);
    let store = SqliteScoreStore::open(&db_path)
        .with_context(|| UserError::database_error("open"))?;

    for song in catalog.songs() {
        println!("{} / {} [{}]", song.title, song.artist, song.song_id);
        for (entry, best) in song.high_scores(&store) {
            let best = match best {
                Some(record) => format!("best {} (max combo {})", record.score, record.max_combo),
                None => "not played".to_string(),
            };
            println!(
                "  {:<12} Lv.{:<3} {:>5} notes  {best}",
                entry.difficulty_name, entry.level, entry.note_count
            );
        }
    }
    info!(songs = catalog.len(), charts = catalog.chart_count(), "catalog listed");
    Ok(())
}

fn autoplay(args: &AutoplayArgs, config_path: &Path) -> Result<()> {
    let config = PlayerConfig::load_from(config_path)?;
    let mut options = SessionOptions::from_config(&config);
    if let Some(latency) = args.latency_ms {
        options.latency = LatencyOffset::new(latency);
    }

    let raw: serde_json::Value = serde_json::from_str(&read_beatmap_text(&args.beatmap)?)?;
    let db_path = args.db.clone().unwrap_or_else(default_score_db_path);
    let store = SqliteScoreStore::open(&db_path)
        .with_context(|| UserError::database_error("open"))?;

    let mut controller = SessionController::with_system_time(store, options);
    let mut loader = PreparedLoader::new(raw, ManualClock::new(args.duration_ms));
    controller.load(&mut loader)?;
    controller.start()?;
    info!(path = %args.beatmap.display(), "autoplay started");

    let events = drive_autoplay(&mut controller, args.tick_ms);
    let result = events
        .iter()
        .find_map(EngineEvent::as_result)
        .context("session ended without a result")?;
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn latency(config_path: &Path, up: bool, down: bool) -> Result<()> {
    let mut config = PlayerConfig::load_from(config_path)?;
    if up || down {
        let value = if up {
            config.increase_latency()
        } else {
            config.decrease_latency()
        };
        config
            .save_to(config_path)
            .context(UserError::config_save_error())?;
        info!(latency_ms = value.ms(), "latency offset updated");
    }
    println!("{} ms", config.latency_offset_ms.ms());
    Ok(())
}
