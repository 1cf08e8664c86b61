use anyhow::{anyhow, Context, Result};
use asciivid::config::SettingsOverrides;
use asciivid::preprocessing::{resolve_preprocess_filter, PREPROCESS_PRESETS};
use asciivid::{AsciiPlayer, FrameFormat, Resolution, Settings};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dialoguer::{Confirm, FuzzySelect, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

const CONTAINER_EXTENSION: &str = "avid";

#[derive(Parser, Debug)]
#[command(version, about = "Play videos as ASCII art in the terminal, or save them for later.")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Config file (JSON or TOML) instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a video and draw it in the terminal as it plays
    ///
    /// The default 1600x900 decode with 16x9 blocks gives 100 columns by 100 rows,
    /// taller than most terminals. Use -s, a smaller --resolution or a larger
    /// --block-height to fit a shorter window.
    Live {
        /// Input video, or `-` for an image2pipe stream on stdin
        input: PathBuf,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Decode a video into a container file without drawing it
    Encode {
        /// Input video, or `-` for an image2pipe stream on stdin
        input: PathBuf,
        /// Destination (defaults to the input name with an .avid extension)
        output: Option<PathBuf>,
        /// Overwrite the destination if it exists
        #[arg(long, short = 'y', default_value_t = false)]
        force: bool,
        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Replay a container file
    Play {
        file: PathBuf,
        /// Playback rate (defaults to the preset's fps)
        #[arg(long)]
        fps: Option<u32>,
    },
    /// Show frame count and grid size of a container file
    Info {
        file: PathBuf,
        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the built-in preprocessing presets
    Presets,
}

#[derive(ClapArgs, Debug)]
struct TuningArgs {
    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Decode resolution, e.g. 1600x900
    #[arg(long)]
    resolution: Option<Resolution>,

    /// Pixels per output column
    #[arg(long)]
    block_width: Option<u32>,

    /// Pixels per output row
    #[arg(long)]
    block_height: Option<u32>,

    /// Preset from the config file
    #[arg(long, conflicts_with_all = &["small", "large"])]
    preset: Option<String>,

    /// Use the "small" preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["preset", "large"])]
    small: bool,

    /// Use the "large" preset
    #[arg(long, short, default_value_t = false, conflicts_with_all = &["preset", "small"])]
    large: bool,

    /// Image format ffmpeg emits: png or mjpeg
    #[arg(long)]
    format: Option<FrameFormat>,

    /// Character gradient from darkest to lightest
    #[arg(long)]
    palette: Option<String>,

    /// ffmpeg hardware acceleration method (e.g. cuda, vaapi, videotoolbox)
    #[arg(long)]
    hwaccel: Option<String>,

    /// Raw ffmpeg filter chain applied before scaling
    #[arg(long, conflicts_with = "preprocess_preset")]
    preprocess: Option<String>,

    /// Named preprocessing preset (see `asciivid presets`)
    #[arg(long)]
    preprocess_preset: Option<String>,
}

impl TuningArgs {
    fn preset_name(&self) -> Option<&str> {
        if self.small {
            Some("small")
        } else if self.large {
            Some("large")
        } else {
            self.preset.as_deref()
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    let player = AsciiPlayer::load(args.config.as_deref())?;

    match args.cmd {
        Some(Command::Live { input, tuning }) => {
            let settings = resolve_settings(&player, &tuning)?;
            let frames = player.encode_and_play(&input, &settings)?;
            log::info!("played {} frames", frames);
        }
        Some(Command::Encode { input, output, force, tuning }) => {
            let settings = resolve_settings(&player, &tuning)?;
            let output = output.unwrap_or_else(|| default_output(&input));
            if output.exists() && !force {
                return Err(anyhow!("{} already exists (use --force to overwrite)", output.display()));
            }
            run_encode(&player, &input, &output, &settings)?;
        }
        Some(Command::Play { file, fps }) => {
            let fps = match fps {
                Some(fps) => fps,
                None => player.settings_from_preset(None)?.fps,
            };
            player.play(&file, fps)?;
        }
        Some(Command::Info { file, json }) => {
            let info = player.info(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Frames: {}", info.frames);
                println!("Grid: {}x{}", info.columns, info.rows);
            }
        }
        Some(Command::Presets) => {
            for preset in PREPROCESS_PRESETS {
                println!("{:<16} {}", preset.name, preset.description);
            }
        }
        None => run_interactive(&player)?,
    }

    Ok(())
}

fn resolve_settings(player: &AsciiPlayer, tuning: &TuningArgs) -> Result<Settings> {
    let base = player.settings_from_preset(tuning.preset_name())?;
    let preprocess = resolve_preprocess_filter(tuning.preprocess.as_deref(), tuning.preprocess_preset.as_deref())?;
    let overrides = SettingsOverrides {
        fps: tuning.fps,
        resolution: tuning.resolution,
        block_width: tuning.block_width,
        block_height: tuning.block_height,
        palette: tuning.palette.clone(),
        frame_format: tuning.format,
        hwaccel: tuning.hwaccel.clone(),
        preprocess,
    };
    let settings = base.merged(&overrides);
    settings.validate().context("invalid settings")?;
    log::debug!("settings: {:?}", settings);
    Ok(settings)
}

fn default_output(input: &Path) -> PathBuf {
    if input == Path::new(asciivid::STDIN_SOURCE) {
        return PathBuf::from(format!("stdin.{}", CONTAINER_EXTENSION));
    }
    input.with_extension(CONTAINER_EXTENSION)
}

fn run_encode(player: &AsciiPlayer, input: &Path, output: &Path, settings: &Settings) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    let frames = player.encode_with_progress(input, output, settings, |progress| {
        pb.set_message(progress.message);
    });
    match frames {
        Ok(frames) => {
            pb.finish_with_message(format!("Wrote {} frames to {}", frames, output.display()));
            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Encoding failed");
            Err(e)
        }
    }
}

fn run_interactive(player: &AsciiPlayer) -> Result<()> {
    let files = find_media_files();
    if files.is_empty() {
        return Err(anyhow!("No videos or .{} files found in current directory.", CONTAINER_EXTENSION));
    }
    let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
        .with_prompt("Choose an input file")
        .default(0)
        .items(&files)
        .interact()?;
    let input = PathBuf::from(&files[selection]);
    let defaults = player.settings_from_preset(None)?;

    let fps: u32 = Input::new()
        .with_prompt("Frames per second (FPS)")
        .default(defaults.fps)
        .interact()?;

    if input.extension().is_some_and(|ext| ext == CONTAINER_EXTENSION) {
        player.play(&input, fps)?;
        return Ok(());
    }

    let modes = ["Play live", "Encode to file"];
    let mode = Select::new()
        .with_prompt("What do you want to do?")
        .default(0)
        .items(&modes)
        .interact()?;
    let settings = defaults.with_fps(fps);
    settings.validate().context("invalid settings")?;

    if mode == 0 {
        player.encode_and_play(&input, &settings)?;
        return Ok(());
    }

    let suggested = default_output(&input).to_string_lossy().into_owned();
    let output: String = Input::new().with_prompt("Output file").default(suggested).interact()?;
    let output = PathBuf::from(output);
    if output.exists()
        && !Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()?
    {
        println!("Operation cancelled.");
        return Ok(());
    }
    run_encode(player, &input, &output, &settings)
}

fn find_media_files() -> Vec<String> {
    WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path().extension().is_some_and(|ext| {
                    matches!(
                        ext.to_str(),
                        Some("mp4" | "mkv" | "mov" | "avi" | "webm" | "gif" | CONTAINER_EXTENSION)
                    )
                })
        })
        .map(|e| e.path().to_string_lossy().into_owned())
        .collect()
}
