mod backend;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use story_soundboard_core::{
    load_project, AppConfig, AssetId, CueStatus, StorySession,
};
use tracing_subscriber::EnvFilter;

use crate::backend::RodioBackend;

fn main() -> story_soundboard_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { sounds_dir } => run_scan(&sounds_dir),
        Commands::Play {
            sound,
            volume,
            sounds_dir,
        } => run_play(&sound, volume, &sounds_dir),
        Commands::Inspect { project } => run_inspect(&project),
    }
}

fn run_scan(sounds_dir: &PathBuf) -> story_soundboard_core::Result<()> {
    let mut session = StorySession::new(
        Box::new(story_soundboard_core::NullBackend::new()),
        AppConfig::with_sounds_dir(sounds_dir),
    );
    let found = session.scan_sounds()?;
    tracing::info!(found, dir = %sounds_dir.display(), "scan complete");

    for asset in session.catalog().list() {
        let status = if asset.available { "ok" } else { "missing" };
        println!("{:<8} {:<24} {}", status, asset.display_name, asset.id);
    }
    Ok(())
}

fn run_play(sound: &str, volume: f32, sounds_dir: &PathBuf) -> story_soundboard_core::Result<()> {
    let mut session = StorySession::new(
        Box::new(RodioBackend::new()?),
        AppConfig::with_sounds_dir(sounds_dir),
    );
    session.scan_sounds()?;
    session.set_master_volume(volume);

    let asset = session
        .catalog()
        .list()
        .find(|a| a.id.as_str() == sound || a.display_name.eq_ignore_ascii_case(sound))
        .map(|a| a.id.clone());
    let Some(asset) = asset else {
        tracing::warn!(sound, "no such sound in the catalog");
        return Ok(());
    };

    tracing::info!(asset = %asset, volume, "firing");
    if session.fire_asset(asset).is_none() {
        return Ok(());
    }

    // Block until the voice drains; the engine itself never waits on audio.
    loop {
        session.reap_finished();
        if session.playback().active_handles().is_empty() {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }
    Ok(())
}

fn run_inspect(project: &PathBuf) -> story_soundboard_core::Result<()> {
    let file = load_project(project)?;
    let active = file
        .cues
        .iter()
        .filter(|c| c.status == CueStatus::Active)
        .count();
    let detached = file.cues.len() - active;

    println!("text length:   {} bytes", file.text.len());
    println!("master volume: {}", file.master_volume);
    println!("cues:          {} active, {} detached", active, detached);
    for cue in file.cues.iter().filter(|c| c.status == CueStatus::Detached) {
        println!(
            "  detached {} -> {} (volume {}), awaiting re-placement",
            cue.cue_id,
            AssetId::from(cue.asset.as_str()),
            cue.per_cue_volume
        );
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Narration soundboard engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the sounds directory and list the discovered assets.
    Scan {
        /// Directory to scan for audio files.
        #[arg(short, long, default_value = "sounds")]
        sounds_dir: PathBuf,
    },
    /// Fire one sound through the audio backend and wait for it to finish.
    Play {
        /// Asset id (relative path) or display name.
        sound: String,
        /// Master volume for the fire, clamped into [0, 1].
        #[arg(short, long, default_value_t = 1.0)]
        volume: f32,
        #[arg(short, long, default_value = "sounds")]
        sounds_dir: PathBuf,
    },
    /// Summarize a saved project file, including cues awaiting re-placement.
    Inspect {
        /// Path to the project JSON file.
        project: PathBuf,
    },
}
