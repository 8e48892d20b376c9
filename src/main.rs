use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::FuzzySelect;
use log::warn;
use vidascii::{
    delay_for_fps, install_interrupt_handler, AppConfig, CancelToken, FfmpegSource, FrameSource,
    PlaybackError, Player, PlayerConfig,
};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm"];

#[derive(Parser, Debug)]
#[command(version, about = "Play a video in the terminal as ASCII art.")]
struct Args {
    /// Input video file (prompted for when omitted)
    input: Option<PathBuf>,

    /// Output width in characters
    #[arg(long)]
    columns: Option<u32>,

    /// Character ramp, from least to most dense
    #[arg(long)]
    chars: Option<String>,

    /// Pace playback at this many frames per second instead of the source rate
    #[arg(long)]
    fps: Option<f64>,

    /// Fixed delay between frames in milliseconds (overrides --fps)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Use the small width preset
    #[arg(long, short, default_value_t = false, conflicts_with = "large")]
    small: bool,

    /// Use the large width preset
    #[arg(long, short, default_value_t = false, conflicts_with = "small")]
    large: bool,

    /// Config file to use instead of the default search path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the ffmpeg binary
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Print playback settings before starting
    #[arg(long, default_value_t = false)]
    log_details: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let mut cfg = AppConfig::load(args.config.as_deref())?;
    if args.ffmpeg.is_some() {
        cfg.ffmpeg_path = args.ffmpeg.clone();
    }
    if args.ffprobe.is_some() {
        cfg.ffprobe_path = args.ffprobe.clone();
    }

    let input_path = match &args.input {
        Some(p) => p.clone(),
        None => pick_input()?,
    };

    let preset_name = if args.small {
        "small"
    } else if args.large {
        "large"
    } else {
        cfg.default_preset.as_str()
    };
    let player_cfg = resolve_player_config(&cfg, preset_name, &args)?;

    if args.log_details {
        println!("--- Playback Details ---");
        println!(
            "Version: {}\nInput: {}\nColumns: {}\nRamp: \"{}\"\nFrame delay: {}",
            env!("CARGO_PKG_VERSION"),
            input_path.display(),
            player_cfg.columns,
            player_cfg.ramp.as_str(),
            match player_cfg.frame_delay {
                Some(d) => format!("{:?}", d),
                None => "from source".to_string(),
            }
        );
    }

    let cancel = CancelToken::new();
    if let Err(e) = install_interrupt_handler(&cancel) {
        warn!("could not install Ctrl+C handler: {}", e);
    }

    let ffmpeg = cfg.ffmpeg();
    let mut player = Player::new(player_cfg, io::stdout(), cancel);
    let outcome = player.run(|| {
        let source = FfmpegSource::open(&input_path, &ffmpeg)?;
        if args.log_details {
            let info = source.info();
            println!(
                "Source: {}x{} @ {:.3} fps",
                info.width, info.height, info.frame_rate
            );
        }
        Ok(source)
    });

    match outcome {
        Ok(outcome) => {
            println!("\n{}", outcome.message());
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ PlaybackError::SourceOpen { .. }) => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e).context("playback failed"),
    }
}

fn resolve_player_config(
    cfg: &AppConfig,
    preset_name: &str,
    args: &Args,
) -> Result<PlayerConfig> {
    let mut player_cfg = PlayerConfig::from_preset(cfg, preset_name)?;
    if let Some(columns) = args.columns {
        player_cfg = player_cfg.with_columns(columns)?;
    }
    if let Some(chars) = &args.chars {
        player_cfg = player_cfg.with_ramp(chars)?;
    }
    if let Some(fps) = args.fps {
        let delay = delay_for_fps(fps).context("invalid --fps")?;
        player_cfg = player_cfg.with_frame_delay(delay);
    }
    if let Some(ms) = args.delay_ms {
        player_cfg = player_cfg.with_frame_delay(Duration::from_millis(ms));
    }
    Ok(player_cfg)
}

fn pick_input() -> Result<PathBuf> {
    let files = find_media_files();
    if files.is_empty() {
        return Err(anyhow!(
            "No input given and no video files found in the current directory."
        ));
    }
    let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
        .with_prompt("Choose a video to play")
        .default(0)
        .items(&files)
        .interact()
        .context("choosing input file")?;
    Ok(PathBuf::from(&files[selection]))
}

fn find_media_files() -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
        })
        .filter_map(|e| e.path().to_str().map(str::to_string))
        .collect();
    files.sort();
    files
}
