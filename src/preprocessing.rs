//! Optional ffmpeg filter chains applied before frames are scaled.

use crate::config::Resolution;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct PreprocessPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub filter: &'static str,
}

// Frames are reduced to luminance anyway, so every preset works in grayscale.
pub const PREPROCESS_PRESETS: &[PreprocessPreset] = &[
    PreprocessPreset {
        name: "contours",
        description: "Edge detection with strong contrast, good for outlines.",
        filter: "format=gray,edgedetect=mode=wires:high=0.2:low=0.05,eq=contrast=2.5:brightness=-0.1",
    },
    PreprocessPreset {
        name: "contours-soft",
        description: "Softer edges with less aggressive thresholds.",
        filter: "format=gray,edgedetect=mode=wires:high=0.12:low=0.03,eq=contrast=2.0:brightness=-0.05",
    },
    PreprocessPreset {
        name: "bw-contrast",
        description: "Plain contrast boost for clean monochrome output.",
        filter: "format=gray,eq=contrast=2.2:brightness=-0.08",
    },
    PreprocessPreset {
        name: "noir-detail",
        description: "Sharpened look that emphasizes texture.",
        filter: "format=gray,unsharp=5:5:1.0:5:5:0.0,eq=contrast=1.8:brightness=-0.04",
    },
    PreprocessPreset {
        name: "equalize",
        description: "Histogram equalization for dark or washed-out footage.",
        filter: "format=gray,histeq=strength=0.3",
    },
    PreprocessPreset {
        name: "soft-glow",
        description: "Gentle blur for smoother gradients.",
        filter: "format=gray,gblur=sigma=1.0,eq=contrast=1.08",
    },
];

/// Look a preset up by name, ignoring ASCII case.
pub fn find_preprocess_preset(name: &str) -> Option<&'static PreprocessPreset> {
    let name = name.trim();
    PREPROCESS_PRESETS.iter().find(|preset| preset.name.eq_ignore_ascii_case(name))
}

fn preset_names() -> String {
    PREPROCESS_PRESETS.iter().map(|p| p.name).collect::<Vec<_>>().join(", ")
}

/// Turn the `--preprocess` / `--preprocess-preset` pair into one filter chain.
///
/// A raw chain takes precedence over a preset name.
pub fn resolve_preprocess_filter(preprocess: Option<&str>, preprocess_preset: Option<&str>) -> Result<Option<String>> {
    match (preprocess.map(str::trim), preprocess_preset) {
        (Some(""), _) => Err(Error::Config("--preprocess needs an ffmpeg filter chain, got an empty string".into())),
        (Some(chain), _) => Ok(Some(chain.to_string())),
        (None, Some(name)) => match find_preprocess_preset(name) {
            Some(preset) => Ok(Some(preset.filter.to_string())),
            None => Err(Error::Config(format!(
                "--preprocess-preset '{}' does not exist (choose one of: {}; `asciivid presets` describes them)",
                name.trim(),
                preset_names()
            ))),
        },
        (None, None) => Ok(None),
    }
}

/// The `-vf` argument for decoding: `[PRE,]fps=F,scale=W:H`.
pub fn build_decode_vf(fps: u32, resolution: Resolution, preprocess_filter: Option<&str>) -> String {
    let base = format!("fps={},scale={}:{}", fps, resolution.width, resolution.height);
    let preprocess = preprocess_filter
        .map(str::trim)
        .map(|s| s.trim_end_matches(','))
        .filter(|s| !s.is_empty());
    match preprocess {
        Some(filter) => format!("{},{}", filter, base),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vf_without_preprocessing() {
        assert_eq!(build_decode_vf(24, Resolution::new(1600, 900), None), "fps=24,scale=1600:900");
        assert_eq!(build_decode_vf(24, Resolution::new(1600, 900), Some("  ")), "fps=24,scale=1600:900");
    }

    #[test]
    fn vf_prepends_preprocessing() {
        assert_eq!(
            build_decode_vf(10, Resolution::new(320, 180), Some("format=gray,")),
            "format=gray,fps=10,scale=320:180"
        );
    }

    #[test]
    fn explicit_filter_wins() {
        let f = resolve_preprocess_filter(Some(" hflip "), Some("contours")).unwrap();
        assert_eq!(f.as_deref(), Some("hflip"));
    }

    #[test]
    fn preset_lookup_is_case_insensitive() {
        let f = resolve_preprocess_filter(None, Some("BW-Contrast")).unwrap().unwrap();
        assert!(f.starts_with("format=gray"));
        assert_eq!(resolve_preprocess_filter(None, None).unwrap(), None);
    }

    #[test]
    fn bad_inputs_are_config_errors() {
        match resolve_preprocess_filter(Some("  "), None) {
            Err(Error::Config(msg)) => assert!(msg.starts_with("--preprocess "), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        match resolve_preprocess_filter(None, Some(" sepia ")) {
            Err(Error::Config(msg)) => {
                assert!(msg.starts_with("--preprocess-preset 'sepia'"), "{msg}");
                assert!(msg.contains("contours, contours-soft"), "{msg}");
                assert!(msg.contains("asciivid presets"), "{msg}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
