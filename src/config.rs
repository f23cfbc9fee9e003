use crate::error::{CapsError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single equalizer band passed to the audio engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    pub frequency: f64,
    pub width_q: f64,
    pub gain_db: f64,
}

/// Parameters for the fixed filter chain applied to every talk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub channels: u8,
    pub normalise_db: f64,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    pub fade_shape: String,
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
    pub compand_attack_secs: f64,
    pub compand_decay_secs: f64,
    pub compand_soft_knee_db: f64,
    /// Transfer function as (input dB, output dB) pairs.
    pub compand_points: Vec<(f64, f64)>,
    pub equalizer: Vec<EqualizerBand>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            channels: 1,
            normalise_db: -24.0,
            fade_in_secs: 1.0,
            fade_out_secs: 2.0,
            fade_shape: "t".to_string(),
            highpass_hz: 100.0,
            lowpass_hz: 10000.0,
            compand_attack_secs: 0.005,
            compand_decay_secs: 0.12,
            compand_soft_knee_db: 6.0,
            compand_points: vec![
                (-90.0, -90.0),
                (-70.0, -55.0),
                (-50.0, -35.0),
                (-32.0, -32.0),
                (-24.0, -24.0),
                (0.0, -8.0),
            ],
            equalizer: vec![
                EqualizerBand {
                    frequency: 3000.0,
                    width_q: 1000.0,
                    gain_db: 3.0,
                },
                EqualizerBand {
                    frequency: 280.0,
                    width_q: 120.0,
                    gain_db: 3.0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File extensions picked up when scanning for raw recordings.
    pub audio_extensions: Vec<String>,
    /// Where processed talks are written when no directory is given.
    pub output_dir: PathBuf,
    /// Executable used for trimming, concatenation and filtering.
    pub sox_program: String,
    pub filters: FilterSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_extensions: vec!["mp3".to_string()],
            output_dir: PathBuf::from("processed"),
            sox_program: "sox".to_string(),
            filters: FilterSettings::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    CapsError::Config(format!("{}: {}", config_path.display(), e))
                })?;
            }
        }

        // Override with environment variables
        if let Ok(extensions) = std::env::var("CAPS_AUDIO_EXTENSIONS") {
            config.audio_extensions = parse_extension_list(&extensions);
        }
        if let Ok(dir) = std::env::var("CAPS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(program) = std::env::var("CAPS_SOX") {
            config.sox_program = program;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio_extensions.is_empty() {
            return Err(CapsError::Config(
                "At least one audio extension must be configured".to_string(),
            ));
        }

        let filters = &self.filters;
        if filters.channels == 0 {
            return Err(CapsError::Config(
                "Channel count must be greater than 0".to_string(),
            ));
        }
        if filters.highpass_hz >= filters.lowpass_hz {
            return Err(CapsError::Config(format!(
                "Highpass cutoff ({} Hz) must be below lowpass cutoff ({} Hz)",
                filters.highpass_hz, filters.lowpass_hz
            )));
        }
        if filters.fade_in_secs < 0.0 || filters.fade_out_secs < 0.0 {
            return Err(CapsError::Config(
                "Fade durations must not be negative".to_string(),
            ));
        }
        if filters.compand_attack_secs < 0.0 || filters.compand_decay_secs < 0.0 {
            return Err(CapsError::Config(
                "Compand attack and decay must not be negative".to_string(),
            ));
        }
        if filters.compand_points.is_empty() {
            return Err(CapsError::Config(
                "Compand transfer function needs at least one point".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("caps").join("config.toml"))
    }
}

/// Split a comma separated extension list, dropping blanks and leading dots.
fn parse_extension_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
