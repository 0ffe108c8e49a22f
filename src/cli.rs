use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pulsewave", about = "Audio band levels and beat pulse for audio-reactive visuals")]
pub struct Cli {
    /// Input audio or video file (WAV, MP3, FLAC, OGG, MP4)
    pub input: Option<PathBuf>,

    /// Output JSON file for offline analysis
    #[arg(short, long, default_value = "analysis.json")]
    pub output: PathBuf,

    /// Ticks per second (display refresh rate)
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Band smoothing factor (0.0-1.0, higher = smoother)
    #[arg(long, default_value_t = 0.85)]
    pub smoothing: f32,

    /// Play in real time and print band meters instead of exporting
    #[arg(long)]
    pub live: bool,

    /// Capture from the default microphone (live only)
    #[arg(long)]
    pub mic: bool,

    /// Start position in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f32,

    /// Stop live mode after this many seconds
    #[arg(long)]
    pub duration: Option<f32>,

    /// Meter bar width in characters
    #[arg(long, default_value_t = 16)]
    pub meter_width: usize,

    /// Config file (defaults to pulsewave.toml or the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
