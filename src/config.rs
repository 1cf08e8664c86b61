//! Playback settings, presets and config file loading.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::rasterizer::{GradientPalette, DEFAULT_PALETTE};
use crate::scanner::{FrameMarkers, JPEG_MARKERS, PNG_MARKERS};

const CONFIG_STEM: &str = "asciivid";

/// Image container ffmpeg writes into its output pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// Lossless PNG frames (the default, slower to encode)
    #[default]
    Png,
    /// Motion JPEG frames, much cheaper for ffmpeg to produce
    Mjpeg,
}

impl FrameFormat {
    pub fn markers(self) -> FrameMarkers {
        match self {
            FrameFormat::Png => PNG_MARKERS,
            FrameFormat::Mjpeg => JPEG_MARKERS,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            FrameFormat::Png => image::ImageFormat::Png,
            FrameFormat::Mjpeg => image::ImageFormat::Jpeg,
        }
    }

    /// Value for ffmpeg's `-vcodec` when writing `image2pipe`.
    pub fn ffmpeg_codec(self) -> &'static str {
        match self {
            FrameFormat::Png => "png",
            FrameFormat::Mjpeg => "mjpeg",
        }
    }
}

impl FromStr for FrameFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(FrameFormat::Png),
            "mjpeg" | "jpeg" | "jpg" => Ok(FrameFormat::Mjpeg),
            other => Err(Error::Config(format!("unknown frame format '{}' (expected png or mjpeg)", other))),
        }
    }
}

/// Decode resolution requested from ffmpeg, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1600, 900)
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Config(format!("invalid resolution '{}' (expected e.g. 1600x900)", s));
        let (w, h) = s.trim().split_once(|c: char| c == 'x' || c == 'X').ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(bad());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Named quality preset from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub fps: u32,
    pub resolution: Resolution,
    pub block_width: u32,
    pub block_height: u32,
}

/// Everything one decode/encode/play run needs.
///
/// `block_width` is the horizontal sampling stride (pixels per output column)
/// and `block_height` the vertical one (pixels per output row).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Frames per second requested from ffmpeg and used for pacing
    pub fps: u32,
    /// Resolution ffmpeg scales to before frames reach the rasterizer
    pub resolution: Resolution,
    pub block_width: u32,
    pub block_height: u32,
    /// Gradient characters from darkest to lightest
    pub palette: String,
    pub frame_format: FrameFormat,
    /// Passed to ffmpeg as `-hwaccel`
    pub hwaccel: Option<String>,
    /// ffmpeg filter chain applied before `fps`/`scale`
    pub preprocess: Option<String>,
    /// ffmpeg executable name or path
    pub ffmpeg: String,
    /// Sleep between empty reads of the decoder pipe
    pub idle_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps: 24,
            resolution: Resolution::default(),
            block_width: 16,
            block_height: 9,
            palette: default_palette(),
            frame_format: FrameFormat::Png,
            hwaccel: None,
            preprocess: None,
            ffmpeg: default_ffmpeg(),
            idle_backoff_ms: 2,
        }
    }
}

impl Settings {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_blocks(mut self, block_width: u32, block_height: u32) -> Self {
        self.block_width = block_width;
        self.block_height = block_height;
        self
    }

    pub fn with_palette(mut self, palette: impl Into<String>) -> Self {
        self.palette = palette.into();
        self
    }

    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.frame_format = format;
        self
    }

    pub fn with_preprocess(mut self, filter: Option<String>) -> Self {
        self.preprocess = filter;
        self
    }

    /// Build settings from a preset, keeping the global parts of the config.
    pub fn from_preset(preset: &Preset, config: &AppConfig) -> Self {
        Self {
            fps: preset.fps,
            resolution: preset.resolution,
            block_width: preset.block_width,
            block_height: preset.block_height,
            palette: config.palette.clone(),
            frame_format: config.frame_format,
            hwaccel: config.hwaccel.clone(),
            ffmpeg: config.ffmpeg.clone(),
            ..Self::default()
        }
    }

    /// Layer caller overrides on top of these settings.
    pub fn merged(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(fps) = overrides.fps {
            self.fps = fps;
        }
        if let Some(resolution) = overrides.resolution {
            self.resolution = resolution;
        }
        if let Some(bw) = overrides.block_width {
            self.block_width = bw;
        }
        if let Some(bh) = overrides.block_height {
            self.block_height = bh;
        }
        if let Some(ref palette) = overrides.palette {
            self.palette = palette.clone();
        }
        if let Some(format) = overrides.frame_format {
            self.frame_format = format;
        }
        if overrides.hwaccel.is_some() {
            self.hwaccel = overrides.hwaccel.clone();
        }
        if overrides.preprocess.is_some() {
            self.preprocess = overrides.preprocess.clone();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(Error::Config("fps must be at least 1".into()));
        }
        if self.block_width == 0 || self.block_height == 0 {
            return Err(Error::Config(format!(
                "block size must be non-zero, got {}x{}",
                self.block_width, self.block_height
            )));
        }
        if self.ffmpeg.trim().is_empty() {
            return Err(Error::Config("ffmpeg executable cannot be empty".into()));
        }
        GradientPalette::new(&self.palette)?;
        Ok(())
    }

    pub fn gradient(&self) -> Result<GradientPalette> {
        GradientPalette::new(&self.palette)
    }
}

/// Optional per-invocation values, usually coming from CLI flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub fps: Option<u32>,
    pub resolution: Option<Resolution>,
    pub block_width: Option<u32>,
    pub block_height: Option<u32>,
    pub palette: Option<String>,
    pub frame_format: Option<FrameFormat>,
    pub hwaccel: Option<String>,
    pub preprocess: Option<String>,
}

fn default_palette() -> String {
    DEFAULT_PALETTE.iter().collect()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_preset_name() -> String {
    "default".to_string()
}

fn default_presets() -> HashMap<String, Preset> {
    let mut presets = HashMap::new();
    presets.insert(
        "default".to_string(),
        Preset { fps: 24, resolution: Resolution::new(1600, 900), block_width: 16, block_height: 9 },
    );
    presets.insert(
        "small".to_string(),
        Preset { fps: 15, resolution: Resolution::new(960, 540), block_width: 12, block_height: 24 },
    );
    presets.insert(
        "large".to_string(),
        Preset { fps: 30, resolution: Resolution::new(1920, 1080), block_width: 8, block_height: 16 },
    );
    presets
}

/// Contents of `asciivid.json` / `asciivid.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_presets")]
    pub presets: HashMap<String, Preset>,
    #[serde(default = "default_preset_name")]
    pub default_preset: String,
    #[serde(default = "default_palette")]
    pub palette: String,
    #[serde(default)]
    pub frame_format: FrameFormat,
    #[serde(default)]
    pub hwaccel: Option<String>,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            default_preset: default_preset_name(),
            palette: default_palette(),
            frame_format: FrameFormat::Png,
            hwaccel: None,
            ffmpeg: default_ffmpeg(),
        }
    }
}

impl AppConfig {
    /// Load an explicit config file, or search the usual locations.
    ///
    /// Search order: `<config dir>/asciivid/asciivid.{toml,json}`, then
    /// `./asciivid.{toml,json}`. Falls back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        for candidate in Self::search_paths() {
            if candidate.exists() {
                log::info!("using config {}", candidate.display());
                return Self::from_file(&candidate);
            }
        }
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut dirs_to_try: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::config_dir() {
            d.push(CONFIG_STEM);
            dirs_to_try.push(d);
        }
        dirs_to_try.push(PathBuf::from("."));

        dirs_to_try
            .into_iter()
            .flat_map(|d| ["toml", "json"].map(|ext| d.join(format!("{}.{}", CONFIG_STEM, ext))))
            .collect()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: AppConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text)
                .map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?,
            _ => serde_json::from_str(&text)
                .map_err(|e| Error::Config(format!("parsing {}: {}", path.display(), e)))?,
        };
        GradientPalette::new(&config.palette)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// Settings for `name`, or for the configured default preset.
    pub fn settings(&self, name: Option<&str>) -> Result<Settings> {
        let name = name.unwrap_or(&self.default_preset);
        let preset = self
            .preset(name)
            .ok_or_else(|| Error::Config(format!("preset '{}' not found", name)))?;
        Ok(Settings::from_preset(preset, self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.fps, 24);
        assert_eq!(s.resolution, Resolution::new(1600, 900));
        assert_eq!((s.block_width, s.block_height), (16, 9));
        assert_eq!(s.palette.chars().count(), 16);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn resolution_parsing() {
        assert_eq!("640x360".parse::<Resolution>().unwrap(), Resolution::new(640, 360));
        assert_eq!(" 1280X720 ".parse::<Resolution>().unwrap(), Resolution::new(1280, 720));
        assert!("640".parse::<Resolution>().is_err());
        assert!("0x360".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
        assert_eq!(Resolution::new(800, 600).to_string(), "800x600");
    }

    #[test]
    fn frame_format_parsing() {
        assert_eq!("png".parse::<FrameFormat>().unwrap(), FrameFormat::Png);
        assert_eq!("MJPEG".parse::<FrameFormat>().unwrap(), FrameFormat::Mjpeg);
        assert!("gif".parse::<FrameFormat>().is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(Settings::default().with_fps(0).validate().is_err());
        assert!(Settings::default().with_blocks(0, 9).validate().is_err());
        assert!(Settings::default().with_blocks(16, 0).validate().is_err());
        assert!(Settings::default().with_palette("#").validate().is_err());
        assert!(Settings::default().with_palette(" .\n#").validate().is_err());
    }

    #[test]
    fn overrides_merge_over_base() {
        let overrides = SettingsOverrides {
            fps: Some(12),
            block_height: Some(20),
            preprocess: Some("format=gray".into()),
            ..Default::default()
        };
        let s = Settings::default().merged(&overrides);
        assert_eq!(s.fps, 12);
        assert_eq!(s.block_width, 16);
        assert_eq!(s.block_height, 20);
        assert_eq!(s.preprocess.as_deref(), Some("format=gray"));
        assert_eq!(s.resolution, Resolution::new(1600, 900));
    }

    #[test]
    fn config_presets_resolve() {
        let cfg = AppConfig::default();
        let s = cfg.settings(None).unwrap();
        assert_eq!(s, Settings::default());
        let small = cfg.settings(Some("small")).unwrap();
        assert_eq!(small.fps, 15);
        assert!(cfg.settings(Some("missing")).is_err());
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let cfg: AppConfig = serde_json::from_str(r#"{"palette": " .:#", "frame_format": "mjpeg"}"#).unwrap();
        assert_eq!(cfg.palette, " .:#");
        assert_eq!(cfg.frame_format, FrameFormat::Mjpeg);
        assert_eq!(cfg.default_preset, "default");
        assert!(cfg.presets.contains_key("large"));
    }

    #[test]
    fn toml_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asciivid.toml");
        fs::write(
            &path,
            r#"
default_preset = "tiny"
hwaccel = "videotoolbox"

[presets.tiny]
fps = 10
resolution = "320x180"
block_width = 4
block_height = 8
"#,
        )
        .unwrap();
        let cfg = AppConfig::load(Some(&path)).unwrap();
        let s = cfg.settings(None).unwrap();
        assert_eq!(s.fps, 10);
        assert_eq!(s.resolution, Resolution::new(320, 180));
        assert_eq!(s.hwaccel.as_deref(), Some("videotoolbox"));
    }

    #[test]
    fn config_with_bad_palette_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asciivid.json");
        fs::write(&path, r#"{"palette": "x"}"#).unwrap();
        assert!(matches!(AppConfig::load(Some(&path)), Err(Error::Config(_))));
    }
}
