use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::decode::AudioData;
use super::features::{BandEnergies, EngineOutput};
use super::source::FileSource;
use crate::clock::{Clock, ManualClock};
use crate::config::Config;
use crate::engine::Engine;

/// One tick of an offline run
#[derive(Clone, Debug, Serialize)]
pub struct FrameRecord {
    /// Playback position in seconds
    pub time: f32,
    #[serde(flatten)]
    pub output: EngineOutput,
    pub raw: BandEnergies,
    pub beat_fired: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisSummary {
    pub duration: f32,
    pub fps: u32,
    pub frames: usize,
    pub beat_times: Vec<f32>,
    pub tempo_bpm: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    pub summary: AnalysisSummary,
    pub frames: Vec<FrameRecord>,
}

/// Drive the engine over decoded audio with a simulated clock, one tick per video frame.
///
/// `on_frame` is called after every tick with (done, total).
pub fn analyze(
    audio: AudioData,
    config: &Config,
    start: Duration,
    mut on_frame: impl FnMut(usize, usize),
) -> Analysis {
    let fps = config.playback.fps.max(1);
    let frame_dt = Duration::from_secs_f64(1.0 / fps as f64);
    let duration = audio.duration();
    let start = start.min(duration);
    let total_frames = ((duration - start).as_secs_f64() * fps as f64).ceil() as usize;

    let clock = Arc::new(ManualClock::new());
    // Offline runs end at the media end, so never loop
    let mut source = FileSource::new(audio, &config.analyser, Arc::clone(&clock), false);
    source.seek(start);

    let mut engine = Engine::new(&config.engine);
    engine.start();

    log::info!("Analyzing {} frames at {} fps...", total_frames, fps);

    let mut frames = Vec::with_capacity(total_frames);
    let mut beat_times = Vec::new();

    for i in 0..total_frames {
        let time = (start + frame_dt * i as u32).as_secs_f32();
        if let Some(report) = engine.tick(&mut source, clock.now()) {
            if report.beat_fired {
                beat_times.push(time);
            }
            frames.push(FrameRecord {
                time,
                output: report.output,
                raw: report.raw,
                beat_fired: report.beat_fired,
            });
        }
        clock.advance(frame_dt);
        on_frame(i + 1, total_frames);
    }

    engine.stop();

    let tempo_bpm = estimate_tempo(&beat_times);
    log::info!(
        "Analysis: frames={}, beats={}, tempo={:.1} BPM",
        frames.len(),
        beat_times.len(),
        tempo_bpm
    );

    Analysis {
        summary: AnalysisSummary {
            duration: duration.as_secs_f32(),
            fps,
            frames: frames.len(),
            beat_times,
            tempo_bpm,
        },
        frames,
    }
}

/// Median inter-beat interval within 60-200 BPM, converted to BPM. 120 when unknown.
pub fn estimate_tempo(beat_times: &[f32]) -> f32 {
    if beat_times.len() < 2 {
        return 120.0;
    }

    let mut reasonable: Vec<f32> = beat_times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&i| (0.3..=1.0).contains(&i))
        .collect();

    if reasonable.is_empty() {
        return 120.0;
    }

    reasonable.sort_by(|a, b| a.total_cmp(b));
    60.0 / reasonable[reasonable.len() / 2]
}
