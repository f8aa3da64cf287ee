/*
 *  config.rs
 *
 *  LyAnalysis - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML, command line
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::analysis::AudioAnalysis;
use crate::bands::{is_supported_band_count, is_valid_window_size, DEFAULT_WINDOW_SIZE};
use crate::equalizer::EqLevels;
use crate::error::AnalysisError;
use crate::falloff::{Falloff, FalloffType};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level configuration. Every field is optional so files and flags can
/// be layered, unset values fall back to the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub sample_rate_hz: Option<u32>,
    pub window_size: Option<usize>,
    pub analysis: Option<AnalysisConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub bands: Option<usize>,
    pub default_bands: Option<usize>,
    pub noise_floor: Option<f32>,
    pub normalize: Option<NormalizeConfig>,
    pub auto_level: Option<AutoLevelConfig>,
    pub band_peak_falloff: Option<Falloff>,
    pub vu_peak_falloff: Option<Falloff>,
    pub sample_falloff: Option<Falloff>,
    pub equalizer: Option<EqualizerConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub enabled: bool,
    #[serde(default)]
    pub min: f32,
    #[serde(default = "one")]
    pub max: f32,
}

fn one() -> f32 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoLevelConfig {
    pub falloff: Falloff,
    pub min: f32,
    #[serde(default)]
    pub max: Option<f32>,
}

/// Either a three point curve or one gain per band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EqualizerConfig {
    Levels(EqLevels),
    Bands(Vec<f32>),
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "lyanalysis", version, about = "LyAnalysis spectrum and level analyzer")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[arg(long)]
    pub sample_rate_hz: Option<u32>,
    #[arg(long)]
    pub window_size: Option<usize>,
    #[arg(short = 'b', long)]
    pub bands: Option<usize>,
    #[arg(long)]
    pub noise_floor: Option<f32>,
    /// normalize output into 0..1
    #[arg(long, action = ArgAction::Set)]
    pub normalize: Option<bool>,
    /// auto-level falloff rate, exponential (0 turns auto-level off)
    #[arg(long)]
    pub auto_level: Option<f32>,

    /// raw little-endian i32 mono PCM, `-` for stdin
    #[arg(short = 'i', long, value_hint = ValueHint::FilePath, conflicts_with = "tone")]
    pub input: Option<PathBuf>,
    /// synthesize a sine at this frequency instead of reading input
    #[arg(short = 't', long)]
    pub tone: Option<f32>,
    /// add white noise to the synthesized tone
    #[arg(long, action = ArgAction::SetTrue, requires = "tone")]
    pub noise: bool,
    /// emit one JSON object per frame
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,
    /// stop after this many frames
    #[arg(short = 'n', long)]
    pub frames: Option<usize>,

    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Read YAML, merge, validate for an already parsed command line.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of the effective config.
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/lyanalysis/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/lyanalysis/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/lyanalysis.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["lyanalysis.yaml", "config.yaml", "config/lyanalysis.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.sample_rate_hz.is_some() { dst.sample_rate_hz = src.sample_rate_hz; }
    if src.window_size.is_some()    { dst.window_size = src.window_size; }
    match (&mut dst.analysis, src.analysis) {
        (None, Some(a)) => dst.analysis = Some(a),
        (Some(d), Some(s)) => merge_analysis(d, s),
        _ => {}
    }
}

fn merge_analysis(dst: &mut AnalysisConfig, src: AnalysisConfig) {
    if src.bands.is_some()             { dst.bands = src.bands; }
    if src.default_bands.is_some()     { dst.default_bands = src.default_bands; }
    if src.noise_floor.is_some()       { dst.noise_floor = src.noise_floor; }
    if src.normalize.is_some()         { dst.normalize = src.normalize; }
    if src.auto_level.is_some()        { dst.auto_level = src.auto_level; }
    if src.band_peak_falloff.is_some() { dst.band_peak_falloff = src.band_peak_falloff; }
    if src.vu_peak_falloff.is_some()   { dst.vu_peak_falloff = src.vu_peak_falloff; }
    if src.sample_falloff.is_some()    { dst.sample_falloff = src.sample_falloff; }
    if src.equalizer.is_some()         { dst.equalizer = src.equalizer; }
}

pub fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()      { cfg.log_level = cli.log_level.clone(); }
    if cli.verbose                  { cfg.log_level = Some("debug".into()); }
    if cli.sample_rate_hz.is_some() { cfg.sample_rate_hz = cli.sample_rate_hz; }
    if cli.window_size.is_some()    { cfg.window_size = cli.window_size; }

    let any_case = cli.bands.is_some()
        || cli.noise_floor.is_some()
        || cli.normalize.is_some()
        || cli.auto_level.is_some();

    if any_case && cfg.analysis.is_none() {
        cfg.analysis = Some(AnalysisConfig::default());
    }
    if let Some(analysis) = cfg.analysis.as_mut() {
        if cli.bands.is_some()       { analysis.bands = cli.bands; }
        if cli.noise_floor.is_some() { analysis.noise_floor = cli.noise_floor; }
        if let Some(enabled) = cli.normalize {
            let n = analysis.normalize.get_or_insert(NormalizeConfig { enabled, min: 0.0, max: 1.0 });
            n.enabled = enabled;
        }
        if let Some(rate) = cli.auto_level {
            let kind = if rate > 0.0 { FalloffType::Exponential } else { FalloffType::None };
            let a = analysis.auto_level.get_or_insert(AutoLevelConfig {
                falloff: Falloff::new(kind, rate),
                min: crate::autolevel::AUTO_LEVEL_MIN_DEFAULT,
                max: None,
            });
            a.falloff = Falloff::new(kind, rate);
        }
    }
}

fn check_falloff(name: &str, f: &Option<Falloff>) -> Result<(), ConfigError> {
    if let Some(f) = f {
        if !f.rate.is_finite() || f.rate < 0.0 {
            return Err(ConfigError::Validation(format!("{name} rate must be a finite value >= 0")));
        }
    }
    Ok(())
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(sr) = cfg.sample_rate_hz {
        if sr == 0 {
            return Err(ConfigError::Validation("sample_rate_hz must be > 0".into()));
        }
    }
    if let Some(w) = cfg.window_size {
        if !is_valid_window_size(w) {
            return Err(ConfigError::Validation(format!(
                "window_size {w} must be a power of two >= {}",
                crate::bands::MIN_WINDOW_SIZE
            )));
        }
    }
    let Some(analysis) = cfg.analysis.as_ref() else {
        return Ok(());
    };
    // an unsupported `bands` is tolerated, the engine substitutes the default
    if let Some(b) = analysis.default_bands {
        if !is_supported_band_count(b) {
            return Err(ConfigError::Validation("default_bands must be 1|2|4|8|16|32|64".into()));
        }
    }
    if let Some(n) = analysis.normalize {
        if n.min == n.max {
            return Err(ConfigError::Validation("normalize min and max must differ".into()));
        }
    }
    if let Some(a) = analysis.auto_level {
        check_falloff("auto_level", &Some(a.falloff))?;
        if let Some(max) = a.max {
            if max <= a.min {
                return Err(ConfigError::Validation("auto_level max must exceed min".into()));
            }
        }
    }
    check_falloff("band_peak_falloff", &analysis.band_peak_falloff)?;
    check_falloff("vu_peak_falloff", &analysis.vu_peak_falloff)?;
    check_falloff("sample_falloff", &analysis.sample_falloff)?;
    if let Some(EqualizerConfig::Bands(gains)) = analysis.equalizer.as_ref() {
        let bands = analysis.bands.filter(|b| is_supported_band_count(*b));
        if let Some(b) = bands {
            if gains.len() != b {
                return Err(ConfigError::Validation(format!(
                    "equalizer lists {} gains for {b} bands",
                    gains.len()
                )));
            }
        }
    }
    Ok(())
}

impl Config {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate_hz.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    pub fn window(&self) -> usize {
        self.window_size.unwrap_or(DEFAULT_WINDOW_SIZE)
    }

    /// Push every configured setting into `engine`.
    pub fn apply(&self, engine: &mut AudioAnalysis) -> Result<(), AnalysisError> {
        let Some(a) = self.analysis.as_ref() else {
            return Ok(());
        };
        if let Some(b) = a.default_bands {
            engine.set_default_band_size(b);
        }
        if let Some(b) = a.bands {
            engine.set_band_size(b);
        }
        if let Some(nf) = a.noise_floor {
            engine.set_noise_floor(nf);
        }
        if let Some(n) = a.normalize {
            engine.normalize(n.enabled, n.min, n.max);
        }
        if let Some(al) = a.auto_level {
            engine.auto_level(al.falloff, al.min, al.max);
        }
        if let Some(f) = a.band_peak_falloff {
            engine.band_peak_falloff(f);
        }
        if let Some(f) = a.vu_peak_falloff {
            engine.vu_peak_falloff(f);
        }
        if let Some(f) = a.sample_falloff {
            engine.samples_falloff(f);
        }
        match a.equalizer.as_ref() {
            Some(EqualizerConfig::Levels(l)) => engine.set_equalizer_levels(l.low, l.mid, l.high),
            Some(EqualizerConfig::Bands(g)) => engine.set_equalizer_bands(g)?,
            None => {}
        }
        Ok(())
    }
}
