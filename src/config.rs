use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::mapping::{Ramp, DEFAULT_RAMP};
use crate::pacing::{delay_for_fps, FALLBACK_FPS};
use crate::source::FfmpegConfig;

pub const CONFIG_FILE_NAME: &str = "vidascii.json";

/// Output width preset
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Preset {
    pub columns: u32,
}

fn default_ascii_chars() -> String {
    DEFAULT_RAMP.to_string()
}

fn default_preset_name() -> String {
    "default".to_string()
}

fn default_fallback_fps() -> f64 {
    FALLBACK_FPS
}

fn default_presets() -> HashMap<String, Preset> {
    [("small", 80), ("default", 120), ("large", 200)]
        .into_iter()
        .map(|(name, columns)| (name.to_string(), Preset { columns }))
        .collect()
}

/// Settings read from `vidascii.json`
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_presets")]
    pub presets: HashMap<String, Preset>,
    #[serde(default = "default_preset_name")]
    pub default_preset: String,
    #[serde(default = "default_ascii_chars")]
    pub ascii_chars: String,
    /// Fixed delay between frames; overrides the source frame rate.
    #[serde(default)]
    pub frame_delay_ms: Option<u64>,
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: default_presets(),
            default_preset: default_preset_name(),
            ascii_chars: default_ascii_chars(),
            frame_delay_ms: None,
            fallback_fps: FALLBACK_FPS,
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl AppConfig {
    /// Read and validate a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config json {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load an explicit config file, or search the usual places.
    ///
    /// Search order: `<data dir>/vidascii/vidascii.json`, `./vidascii.json`,
    /// then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let mut tried: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push("vidascii");
            d.push(CONFIG_FILE_NAME);
            tried.push(d);
        }
        tried.push(PathBuf::from(CONFIG_FILE_NAME));

        for p in &tried {
            if p.exists() {
                debug!("using config {}", p.display());
                return Self::from_file(p);
            }
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Check the ramp, the fallback rate and every preset width
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ramp::new(&self.ascii_chars)?;
        delay_for_fps(self.fallback_fps)?;
        if self.presets.values().any(|p| p.columns == 0) {
            return Err(ConfigError::ZeroColumns);
        }
        Ok(())
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// ffmpeg/ffprobe locations from this config
    pub fn ffmpeg(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            ffprobe_path: self.ffprobe_path.clone(),
        }
    }
}

/// Everything the player needs, resolved once before playback starts.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub ramp: Ramp,
    /// Output width in characters
    pub columns: u32,
    /// Fixed frame delay; `None` derives it from the source frame rate.
    pub frame_delay: Option<Duration>,
    pub fallback_fps: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            ramp: Ramp::default(),
            columns: 120,
            frame_delay: None,
            fallback_fps: FALLBACK_FPS,
        }
    }
}

impl PlayerConfig {
    /// Resolve player settings from a named preset
    pub fn from_preset(cfg: &AppConfig, preset_name: &str) -> Result<Self, ConfigError> {
        let preset = cfg
            .get_preset(preset_name)
            .ok_or_else(|| ConfigError::MissingPreset(preset_name.to_string()))?;
        Ok(Self {
            ramp: Ramp::new(&cfg.ascii_chars)?,
            columns: preset.columns,
            frame_delay: cfg.frame_delay_ms.map(Duration::from_millis),
            fallback_fps: cfg.fallback_fps,
        })
    }

    /// Override the output width
    pub fn with_columns(mut self, columns: u32) -> Result<Self, ConfigError> {
        if columns == 0 {
            return Err(ConfigError::ZeroColumns);
        }
        self.columns = columns;
        Ok(self)
    }

    /// Override the character ramp
    pub fn with_ramp(mut self, chars: &str) -> Result<Self, ConfigError> {
        self.ramp = Ramp::new(chars)?;
        Ok(self)
    }

    /// Pace at a fixed delay instead of the source frame rate
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_builtin_presets() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        let player = PlayerConfig::from_preset(&cfg, "default").unwrap();
        assert_eq!(player.columns, 120);
        assert_eq!(player.ramp.as_str(), " .,:;!coOC#@");
        assert_eq!(player.frame_delay, None);
        assert_eq!(cfg.get_preset("small").unwrap().columns, 80);
        assert_eq!(cfg.get_preset("large").unwrap().columns, 200);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let json = r#"{"ascii_chars": " .#", "frame_delay_ms": 40}"#;
        let cfg: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_preset, "default");
        let player = PlayerConfig::from_preset(&cfg, &cfg.default_preset).unwrap();
        assert_eq!(player.ramp.as_str(), " .#");
        assert_eq!(player.frame_delay, Some(Duration::from_millis(40)));
        assert_eq!(player.fallback_fps, FALLBACK_FPS);
    }

    #[test]
    fn loads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"presets": {{"tiny": {{"columns": 20}}}}, "default_preset": "tiny",
                "ffmpeg_path": "/opt/ffmpeg/bin/ffmpeg"}}"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.get_preset("tiny"), Some(&Preset { columns: 20 }));
        assert_eq!(cfg.ffmpeg().ffmpeg_cmd(), Path::new("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(cfg.ffmpeg().ffprobe_cmd(), Path::new("ffprobe"));
    }

    #[test]
    fn rejects_non_ascii_ramp_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ascii_chars": " ░▒▓█"}}"#).unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("non-ASCII"));
    }

    #[test]
    fn rejects_bad_values() {
        let cfg = AppConfig {
            fallback_fps: 0.0,
            ..AppConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidFps(_))));

        let cfg = AppConfig::default();
        assert_eq!(
            PlayerConfig::from_preset(&cfg, "huge").unwrap_err(),
            ConfigError::MissingPreset("huge".to_string())
        );
        assert_eq!(
            PlayerConfig::default().with_columns(0).unwrap_err(),
            ConfigError::ZeroColumns
        );
    }

    #[test]
    fn rejects_fallback_fps_too_small_for_a_delay() {
        let cfg: AppConfig = serde_json::from_str(r#"{"fallback_fps": 1e-30}"#).unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidFps(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_fps": 5000}}"#).unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("fps must be between"));
    }
}
