use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::FilterSettings;
use crate::error::{CapsError, Result};
use crate::metadata::Segment;

use super::AudioEngine;

/// Drives the `sox` command line tool.
#[derive(Debug, Clone)]
pub struct SoxEngine {
    program: String,
    filters: FilterSettings,
}

impl SoxEngine {
    pub fn new(program: impl Into<String>, filters: FilterSettings) -> Self {
        Self {
            program: program.into(),
            filters,
        }
    }

    /// Check that the configured executable runs.
    pub fn check(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| {
                CapsError::AudioProcessing(format!(
                    "{} not found. Install SoX and ensure it's in your PATH. Error: {e}",
                    self.program
                ))
            })?;

        if !output.status.success() {
            return Err(CapsError::AudioProcessing(format!(
                "{} --version failed",
                self.program
            )));
        }

        debug!("{} is available", self.program);
        Ok(())
    }

    fn run(&self, args: Vec<OsString>) -> Result<()> {
        debug!("Running {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                CapsError::AudioProcessing(format!("Failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapsError::AudioProcessing(format!(
                "{} failed: {}",
                self.program,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl AudioEngine for SoxEngine {
    fn name(&self) -> &'static str {
        "sox"
    }

    fn prepare(&self, input: &Path, output: &Path, segment: Option<&Segment>) -> Result<()> {
        let mut args = vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()];
        args.extend(prepare_effects(&self.filters, segment).into_iter().map(OsString::from));
        self.run(args)
    }

    fn concatenate(&self, inputs: &[PathBuf], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(CapsError::AudioProcessing(
                "Nothing to concatenate".to_string(),
            ));
        }

        let mut args: Vec<OsString> = vec!["--combine".into(), "concatenate".into()];
        args.extend(inputs.iter().map(|p| p.as_os_str().to_owned()));
        args.push(output.as_os_str().to_owned());
        self.run(args)
    }

    fn optimise(&self, input: &Path, output: &Path) -> Result<()> {
        let mut args = vec![input.as_os_str().to_owned(), output.as_os_str().to_owned()];
        args.extend(optimise_effects(&self.filters).into_iter().map(OsString::from));
        self.run(args)
    }
}

/// Downmix and normalise, then trim and fade when a segment is given.
pub fn prepare_effects(filters: &FilterSettings, segment: Option<&Segment>) -> Vec<String> {
    let mut effects = vec![
        "channels".to_string(),
        filters.channels.to_string(),
        "norm".to_string(),
        filters.normalise_db.to_string(),
    ];

    if let Some(segment) = segment {
        effects.extend([
            "trim".to_string(),
            segment.start().to_string(),
            segment.duration().as_secs().to_string(),
            "fade".to_string(),
            filters.fade_shape.clone(),
            filters.fade_in_secs.to_string(),
            "-0".to_string(),
            filters.fade_out_secs.to_string(),
        ]);
    }

    effects
}

/// Band-limit, compress and equalise.
pub fn optimise_effects(filters: &FilterSettings) -> Vec<String> {
    let transfer = filters
        .compand_points
        .iter()
        .map(|(input, output)| format!("{input},{output}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut effects = vec![
        "highpass".to_string(),
        "-2".to_string(),
        filters.highpass_hz.to_string(),
        "lowpass".to_string(),
        "-2".to_string(),
        filters.lowpass_hz.to_string(),
        "compand".to_string(),
        format!(
            "{},{}",
            filters.compand_attack_secs, filters.compand_decay_secs
        ),
        format!("{}:{}", filters.compand_soft_knee_db, transfer),
    ];

    for band in &filters.equalizer {
        effects.extend([
            "equalizer".to_string(),
            band.frequency.to_string(),
            format!("{}q", band.width_q),
            band.gain_db.to_string(),
        ]);
    }

    effects
}
