use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use glam::{DQuat, DVec3};
use saberline_collision::{CutDetector, Swing};
use saberline_common::{Aabb, Pose};
use saberline_input::ScriptedSwings;
use saberline_kernel::{Level, LevelDifficulty, SessionConfig};
use saberline_persist::{RecordingMeta, RecordingStore};
use saberline_tools::{CutStepRecorder, DEMO_PLAY_TYPE, HeadlessRunner, RunConfig, RunOutcome, demo_level};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Level reference stored for recordings of the built-in demo chart.
const DEMO_PREFIX: &str = "demo:";

#[derive(Parser)]
#[command(name = "saberline-cli", about = "Headless play, replay and cut debugging for saberline levels")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct LevelArgs {
    /// Level JSON file. The built-in demo chart is used when omitted.
    #[arg(short, long)]
    level: Option<PathBuf>,
    /// Play type to pick the difficulty from
    #[arg(long, default_value = DEMO_PLAY_TYPE)]
    play_type: String,
    /// Difficulty name. Defaults to the first of the play type.
    #[arg(short, long)]
    difficulty: Option<String>,
    /// Number of demo blocks when no level file is given
    #[arg(long, default_value = "16")]
    beats: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and kernel constants
    Info,
    /// Play a level with scripted swings and store the recording
    Play {
        #[command(flatten)]
        level: LevelArgs,
        /// Session config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Recording store directory
        #[arg(short, long, default_value = "saberline-store")]
        store: PathBuf,
        /// Seconds per simulation tick
        #[arg(long, default_value_t = 1.0 / 90.0)]
        tick: f64,
        /// Also write the raw wire bytes of the recording to this file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Do not save the recording to the store
        #[arg(long)]
        no_save: bool,
    },
    /// Replay a stored recording and compare against what was recorded
    Replay {
        /// Recording store directory
        #[arg(short, long, default_value = "saberline-store")]
        store: PathBuf,
        /// Recording id. Defaults to the latest.
        #[arg(short, long)]
        id: Option<u32>,
    },
    /// Check the store's hash chain and replay every recording
    Verify {
        /// Recording store directory
        #[arg(short, long, default_value = "saberline-store")]
        store: PathBuf,
    },
    /// Trace a single cut test step by step
    Cut {
        /// Block centre x y z
        #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [0.0, 1.7, -1.5])]
        block: Vec<f64>,
        /// Block rotation about Z in degrees
        #[arg(long, default_value = "0")]
        rot: f64,
        /// Previous saber grip position x y z
        #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [0.0, 2.5, 0.0])]
        from: Vec<f64>,
        /// Current saber grip position x y z
        #[arg(long, num_args = 3, allow_negative_numbers = true, default_values_t = [0.0, 0.9, 0.0])]
        to: Vec<f64>,
        /// Half the block's edge length
        #[arg(long, default_value = "0.5")]
        half_extent: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("saberline-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "kernel: object_speed={} jump_offset={} despawn={} beat_z={}",
                saberline_kernel::DEFAULT_OBJECT_SPEED,
                saberline_kernel::DEFAULT_JUMP_OFFSET,
                saberline_kernel::REAR_DESPAWN_DISTANCE,
                saberline_kernel::BEAT_Z_OFFSET,
            );
            println!(
                "recording: {} f64 per frame, {} frames per chunk",
                saberline_kernel::FRAME_FIELDS,
                saberline_kernel::RECORDING_CHUNK_FRAMES
            );
            let config = SessionConfig::default();
            println!("default session: {}", serde_json::to_string(&config)?);
        }
        Commands::Play {
            level,
            config,
            store,
            tick,
            export,
            no_save,
        } => {
            let (reference, difficulty) = load_difficulty(&level)?;
            let config = load_config(config.as_deref())?;
            let difficulty = Arc::new(difficulty);
            let run = RunConfig {
                tick_seconds: tick,
                ..RunConfig::for_difficulty(&difficulty)
            };
            let mut swings = ScriptedSwings::from_difficulty(&difficulty, config.player_height);
            let outcome = HeadlessRunner::new(run).run_live(Arc::clone(&difficulty), config.clone(), &mut swings)?;
            print_outcome("Live", &outcome, difficulty.objects.len());

            let recording = outcome.recording.context("live run produced no recording")?;
            if let Some(path) = export {
                let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
                saberline_persist::write_recording(std::io::BufWriter::new(file), &recording)?;
                println!("Exported {} frames to {}", recording.frame_count(), path.display());
            }
            if no_save {
                return Ok(());
            }
            let mut store = RecordingStore::open(&store)?;
            let meta = RecordingMeta {
                level: reference,
                play_type: level.play_type.clone(),
                difficulty: difficulty.name.clone(),
                config,
                tick_seconds: Some(tick),
                frame_count: recording.frame_count() as u64,
                cut_count: outcome.cuts.len() as u32,
            };
            let id = store.save(&recording, &meta)?;
            println!("Saved recording {id} to {}", store.root().display());
        }
        Commands::Replay { store, id } => {
            let store = RecordingStore::open(&store)?;
            let id = match id {
                Some(id) => id,
                None if store.recording_count() > 0 => store.recording_count(),
                None => bail!("store {} has no recordings", store.root().display()),
            };
            let (matched, outcome, objects) = replay_stored(&store, id)?;
            print_outcome("Replay", &outcome, objects);
            println!("Match: {}", if matched { "OK" } else { "MISMATCH" });
            if !matched {
                bail!("replay of recording {id} diverged from the recorded run");
            }
        }
        Commands::Verify { store } => {
            let store = RecordingStore::open(&store)?;
            store.verify_integrity()?;
            println!("Integrity: OK ({} recordings)", store.recording_count());
            let mut mismatches = 0;
            for id in 1..=store.recording_count() {
                let (matched, outcome, _) = replay_stored(&store, id)?;
                println!(
                    "  #{id}: cuts={} ticks={} {}",
                    outcome.cuts.len(),
                    outcome.ticks,
                    if matched { "OK" } else { "MISMATCH" }
                );
                if !matched {
                    mismatches += 1;
                }
            }
            if mismatches > 0 {
                bail!("{mismatches} recordings failed to replay identically");
            }
        }
        Commands::Cut {
            block,
            rot,
            from,
            to,
            half_extent,
        } => {
            let block = Pose::new(vec3(&block)?, DQuat::from_rotation_z(rot.to_radians()));
            let detector = CutDetector::new(SessionConfig::default().saber, Aabb::cube(half_extent));
            let mut recorder = CutStepRecorder::new();
            let result = detector.cut_traced(
                &block,
                &Pose::at(vec3(&from)?),
                &Pose::at(vec3(&to)?),
                &Swing::default(),
                &mut recorder,
            );
            print!("{recorder}");
            match result {
                Some(cut) => println!(
                    "accuracy={:.3} speed={:.3} strength={:.3} angle={:.3}",
                    cut.accuracy, cut.speed, cut.strength, cut.angle
                ),
                None => println!("no cut"),
            }
        }
    }

    Ok(())
}

fn vec3(v: &[f64]) -> anyhow::Result<DVec3> {
    match v {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        _ => bail!("expected three coordinates, got {}", v.len()),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve a difficulty and the reference a recording stores for it.
fn load_difficulty(args: &LevelArgs) -> anyhow::Result<(String, LevelDifficulty)> {
    let (reference, level) = match &args.level {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let level: Level =
                serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            (path.display().to_string(), level)
        }
        None => (format!("{DEMO_PREFIX}{}", args.beats), demo_level(args.beats)),
    };
    let difficulty = level
        .difficulty(&args.play_type, args.difficulty.as_deref())
        .with_context(|| format!("no {} difficulty {:?} in {reference}", args.play_type, args.difficulty))?
        .clone();
    info!(level = %level.title, objects = difficulty.objects.len(), "level loaded");
    Ok((reference, difficulty))
}

/// Replay recording `id` and report whether it reproduced the stored cut count.
fn replay_stored(store: &RecordingStore, id: u32) -> anyhow::Result<(bool, RunOutcome, usize)> {
    let (recording, meta) = store.load(id)?;
    let args = match meta.level.strip_prefix(DEMO_PREFIX) {
        Some(beats) => LevelArgs {
            level: None,
            play_type: meta.play_type.clone(),
            difficulty: meta.difficulty.clone(),
            beats: beats.parse().with_context(|| format!("bad demo reference {}", meta.level))?,
        },
        None => LevelArgs {
            level: Some(PathBuf::from(&meta.level)),
            play_type: meta.play_type.clone(),
            difficulty: meta.difficulty.clone(),
            beats: 0,
        },
    };
    let (_, difficulty) = load_difficulty(&args)?;
    let difficulty = Arc::new(difficulty);
    let mut run = RunConfig::for_difficulty(&difficulty);
    if let Some(tick) = meta.tick_seconds {
        run.tick_seconds = tick;
    }
    let frames = recording.frame_count() as u64;
    let objects = difficulty.objects.len();
    let outcome = HeadlessRunner::new(run).run_replay(difficulty, meta.config.clone(), recording)?;
    let matched = outcome.cuts.len() as u32 == meta.cut_count && outcome.ticks == frames;
    Ok((matched, outcome, objects))
}

fn print_outcome(label: &str, outcome: &RunOutcome, objects: usize) {
    println!(
        "{label}: cuts={}/{objects} evicted={} ticks={} time={:.3}",
        outcome.cuts.len(),
        outcome.evicted,
        outcome.ticks,
        outcome.final_time
    );
    println!(
        "  tick cost: avg={:?} max={:?}  blocks spawned={} leaked={}",
        outcome.average_tick, outcome.max_tick, outcome.blocks_spawned, outcome.blocks_leaked
    );
}
