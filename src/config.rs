use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub analyser: AnalyserConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Band smoothing and beat detection tuning
#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    /// Retained fraction of the previous smoothed value (alpha = 1 - smoothing)
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    /// Number of raw bass values in the rolling mean
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// Bass must exceed the rolling mean times this factor
    #[serde(default = "default_beat_threshold")]
    pub beat_threshold: f32,
    /// Minimum tick-over-tick bass rise for the derivative trigger
    #[serde(default = "default_derivative_threshold")]
    pub derivative_threshold: f32,
    /// Noise floor below which no beat fires
    #[serde(default = "default_min_bass")]
    pub min_bass: f32,
    #[serde(default = "default_beat_cooldown_ms")]
    pub beat_cooldown_ms: u64,
    /// Per-tick pulse multiplier
    #[serde(default = "default_beat_decay")]
    pub beat_decay: f32,
}

/// Byte spectrum analyser settings (mirrors a Web Audio AnalyserNode)
#[derive(Clone, Debug, Deserialize)]
pub struct AnalyserConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing_time_constant")]
    pub smoothing_time_constant: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackConfig {
    /// Display refresh rate the engine ticks at
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Loop file playback instead of going silent at the end
    #[serde(default = "default_looping")]
    pub looping: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            history_size: default_history_size(),
            beat_threshold: default_beat_threshold(),
            derivative_threshold: default_derivative_threshold(),
            min_bass: default_min_bass(),
            beat_cooldown_ms: default_beat_cooldown_ms(),
            beat_decay: default_beat_decay(),
        }
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing_time_constant: default_smoothing_time_constant(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl AnalyserConfig {
    /// Number of byte magnitudes the analyser produces
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            looping: default_looping(),
        }
    }
}

fn default_smoothing() -> f32 { 0.85 }
fn default_history_size() -> usize { 20 }
fn default_beat_threshold() -> f32 { 1.2 }
fn default_derivative_threshold() -> f32 { 0.15 }
fn default_min_bass() -> f32 { 0.08 }
fn default_beat_cooldown_ms() -> u64 { 100 }
fn default_beat_decay() -> f32 { 0.88 }
fn default_fft_size() -> usize { 256 }
fn default_smoothing_time_constant() -> f32 { 0.5 }
fn default_min_decibels() -> f32 { -100.0 }
fn default_max_decibels() -> f32 { -30.0 }
fn default_fps() -> u32 { 60 }
fn default_looping() -> bool { true }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config: {}", path.display()))
}

/// Explicit path, else `pulsewave.toml` in the working directory, else the user config dirs.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("pulsewave.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("pulsewave").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("pulsewave").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
