//! # asciivid - ASCII video playback and recording
//!
//! `asciivid` turns a video into a stream of text frames. ffmpeg decodes the
//! video into a pipe of PNG (or MJPEG) images; every image is sampled on a
//! fixed block grid and mapped onto a character gradient. Frames are either
//! drawn straight to the terminal at the target frame rate, or saved to a
//! compact container file that can be replayed later without ffmpeg.
//!
//! ## Example
//!
//! ```no_run
//! use asciivid::{AsciiPlayer, Settings};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let player = AsciiPlayer::new();
//! let settings = Settings::default().with_fps(15);
//!
//! // Render once to a file, then replay it.
//! let frames = player.encode(Path::new("clip.mp4"), Path::new("clip.avid"), &settings)?;
//! println!("saved {} frames", frames);
//! player.play(Path::new("clip.avid"), 15)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress Reporting
//!
//! Encoding can report progress as frames are written:
//!
//! ```no_run
//! use asciivid::{AsciiPlayer, ProgressPhase, Settings};
//! use std::path::Path;
//!
//! let player = AsciiPlayer::new();
//! player.encode_with_progress(
//!     Path::new("clip.mp4"),
//!     Path::new("clip.avid"),
//!     &Settings::default(),
//!     |progress| match progress.phase {
//!         ProgressPhase::StartingDecoder => println!("starting ffmpeg..."),
//!         ProgressPhase::Rendering => println!("{} frames", progress.completed),
//!         ProgressPhase::Complete => println!("done"),
//!     },
//! ).unwrap();
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::path::Path;

pub mod codec;
pub mod config;
pub mod error;
pub mod pacer;
pub mod pipeline;
pub mod preprocessing;
pub mod raster;
pub mod rasterizer;
pub mod scanner;
pub mod sink;
pub mod source;

pub use codec::{decode_record, encode_record, read_container, ContainerReader, ContainerWriter};
pub use config::{AppConfig, FrameFormat, Preset, Resolution, Settings, SettingsOverrides};
pub use error::Error;
pub use pipeline::Pipeline;
pub use rasterizer::{AsciiFrame, GradientPalette, Rasterizer, DEFAULT_PALETTE};
pub use sink::{FileSink, FrameSink, TerminalSink};
pub use source::{ByteSource, FfmpegSource, ReaderSource};

/// Source name that reads an `image2pipe` stream from standard input.
pub const STDIN_SOURCE: &str = "-";

/// Represents the current phase of an encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Launching the decoder
    StartingDecoder,
    /// Frames are being rasterized and written
    Rendering,
    /// The container is complete
    Complete,
}

/// Progress information for long-running operations.
///
/// The number of frames in a video is not known up front, so there is only
/// a running count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub phase: ProgressPhase,
    /// Frames finished so far
    pub completed: u64,
    /// Human-readable status
    pub message: String,
}

impl Progress {
    pub fn starting_decoder() -> Self {
        Self {
            phase: ProgressPhase::StartingDecoder,
            completed: 0,
            message: "Starting decoder...".to_string(),
        }
    }

    pub fn rendering(completed: u64) -> Self {
        Self {
            phase: ProgressPhase::Rendering,
            completed,
            message: format!("Rendered {} frames", completed),
        }
    }

    pub fn complete(total_frames: u64) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            message: format!("Encoding complete: {} frames", total_frames),
        }
    }
}

/// Frame count and grid size of a saved container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub frames: u64,
    /// Width of the first frame in characters
    pub columns: usize,
    /// Height of the first frame in lines
    pub rows: usize,
}

/// Main entry point: live playback, encoding to a container, and replay.
pub struct AsciiPlayer {
    config: AppConfig,
}

impl AsciiPlayer {
    /// Create a player with the built-in configuration
    pub fn new() -> Self {
        Self { config: AppConfig::default() }
    }

    /// Create a player with a custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        GradientPalette::new(&config.palette).context("config palette")?;
        if !config.presets.contains_key(&config.default_preset) {
            return Err(anyhow!("default preset '{}' is not defined", config.default_preset));
        }
        Ok(Self { config })
    }

    /// Load configuration from a JSON or TOML file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let config = AppConfig::from_file(path).with_context(|| format!("loading config {}", path.display()))?;
        Self::with_config(config)
    }

    /// Use `path` if given, otherwise the first config file found in the usual places
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = AppConfig::load(path).context("loading configuration")?;
        Self::with_config(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Settings for a named preset (or the default preset when `None`)
    pub fn settings_from_preset(&self, name: Option<&str>) -> Result<Settings> {
        Ok(self.config.settings(name)?)
    }

    /// Decode `source` and draw every frame to stdout, paced at `settings.fps`.
    ///
    /// Nothing is written to disk. Returns the number of frames drawn.
    pub fn encode_and_play(&self, source: &Path, settings: &Settings) -> Result<u64> {
        settings.validate().context("invalid settings")?;
        let mut pipeline = Pipeline::new(settings)?;
        let mut input = open_source(source, settings)?;
        let mut sink = TerminalSink::stdout(settings.fps);
        let frames = pipeline
            .run(&mut input, &mut sink)
            .with_context(|| format!("playing {}", source.display()))?;
        Ok(frames)
    }

    /// Decode `source` into a container at `destination`, without drawing anything.
    ///
    /// Returns the number of records written.
    pub fn encode(&self, source: &Path, destination: &Path, settings: &Settings) -> Result<u64> {
        self.encode_with_progress(source, destination, settings, |_| {})
    }

    /// Like [`AsciiPlayer::encode`], reporting progress after every frame
    pub fn encode_with_progress<F>(&self, source: &Path, destination: &Path, settings: &Settings, mut progress_callback: F) -> Result<u64>
    where
        F: FnMut(Progress),
    {
        settings.validate().context("invalid settings")?;
        let mut pipeline = Pipeline::new(settings)?;
        let mut sink =
            FileSink::create(destination).with_context(|| format!("creating {}", destination.display()))?;

        progress_callback(Progress::starting_decoder());
        let mut input = open_source(source, settings)?;
        let frames = pipeline
            .run_with_progress(&mut input, &mut sink, |n| progress_callback(Progress::rendering(n)))
            .with_context(|| format!("encoding {} to {}", source.display(), destination.display()))?;

        progress_callback(Progress::complete(frames));
        log::info!("wrote {} records to {}", frames, destination.display());
        Ok(frames)
    }

    /// Replay a container to stdout at `fps`.
    ///
    /// Stops at the first record that fails to decode.
    pub fn play(&self, file: &Path, fps: u32) -> Result<u64> {
        if fps == 0 {
            return Err(anyhow!("fps must be at least 1"));
        }
        let reader = ContainerReader::open(file).with_context(|| format!("opening {}", file.display()))?;
        let mut sink = TerminalSink::stdout(fps);
        let frames = play_frames(reader, &mut sink).with_context(|| format!("playing {}", file.display()))?;
        Ok(frames)
    }

    /// Count the records of a container and report its grid size.
    ///
    /// Every record is decoded, so a corrupt file fails here too.
    pub fn info(&self, file: &Path) -> Result<ContainerInfo> {
        let reader = ContainerReader::open(file).with_context(|| format!("opening {}", file.display()))?;
        let mut info = ContainerInfo::default();
        for frame in reader {
            let frame = frame.with_context(|| format!("reading {}", file.display()))?;
            if info.frames == 0 {
                info.columns = frame.columns();
                info.rows = frame.rows();
            }
            info.frames += 1;
        }
        Ok(info)
    }
}

impl Default for AsciiPlayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Feed every record of a container into `sink`, in file order.
pub fn play_records<R, K>(reader: R, sink: &mut K) -> error::Result<u64>
where
    R: BufRead,
    K: FrameSink + ?Sized,
{
    play_frames(ContainerReader::new(reader), sink)
}

fn play_frames<R, K>(reader: ContainerReader<R>, sink: &mut K) -> error::Result<u64>
where
    R: BufRead,
    K: FrameSink + ?Sized,
{
    let mut count = 0u64;
    for frame in reader {
        sink.accept(&frame?)?;
        count += 1;
    }
    sink.finish()?;
    log::info!("played {} frames", count);
    Ok(count)
}

/// `-` reads stdin; anything else is a file handed to ffmpeg.
fn open_source(source: &Path, settings: &Settings) -> Result<Box<dyn ByteSource>> {
    if source == Path::new(STDIN_SOURCE) {
        log::info!("reading frames from stdin");
        return Ok(Box::new(ReaderSource::new(io::stdin().lock())));
    }
    let ffmpeg = FfmpegSource::spawn(source, settings).with_context(|| format!("opening {}", source.display()))?;
    Ok(Box::new(ffmpeg))
}
