//! Spectrum sources: anything that can fill a byte buffer with the latest magnitudes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

use super::analyser::ByteAnalyser;
use super::decode::AudioData;
use crate::clock::Clock;
use crate::config::AnalyserConfig;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("unsupported input stream configuration: {0}")]
    UnsupportedConfig(String),
    #[error("failed to open input stream: {0}")]
    Stream(String),
    #[error("no decodable audio in {0}")]
    EmptyMedia(String),
}

pub trait SpectrumSource {
    /// Number of magnitudes one snapshot holds
    fn bin_count(&self) -> usize;

    /// Overwrite `buf` with the most recent magnitudes.
    ///
    /// Returns false when no snapshot is available this cycle; `buf` is then untouched.
    fn fill_latest(&mut self, buf: &mut [u8]) -> bool;
}

impl<S: SpectrumSource + ?Sized> SpectrumSource for Box<S> {
    fn bin_count(&self) -> usize {
        (**self).bin_count()
    }

    fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
        (**self).fill_latest(buf)
    }
}

/// Decoded audio played back against a clock
pub struct FileSource<C: Clock> {
    audio: AudioData,
    analyser: ByteAnalyser,
    clock: C,
    looping: bool,
    /// Clock reading at which playback was last anchored
    anchor_clock: Duration,
    /// Playback position at `anchor_clock`
    anchor_pos: Duration,
    window: Vec<f32>,
}

impl<C: Clock> FileSource<C> {
    pub fn new(audio: AudioData, config: &AnalyserConfig, clock: C, looping: bool) -> Self {
        let analyser = ByteAnalyser::new(config);
        let window = vec![0.0; analyser.fft_size()];
        let anchor_clock = clock.now();
        Self {
            audio,
            analyser,
            clock,
            looping,
            anchor_clock,
            anchor_pos: Duration::ZERO,
            window,
        }
    }

    pub fn duration(&self) -> Duration {
        self.audio.duration()
    }

    pub fn position(&self) -> Duration {
        let elapsed = self.clock.now().saturating_sub(self.anchor_clock);
        let pos = self.anchor_pos + elapsed;
        let duration = self.duration();
        if self.looping && !duration.is_zero() {
            Duration::from_nanos((pos.as_nanos() % duration.as_nanos()) as u64)
        } else {
            pos.min(duration)
        }
    }

    /// Jump to `position`, clamped to the media length. Spectral smoothing restarts.
    pub fn seek(&mut self, position: Duration) {
        self.anchor_clock = self.clock.now();
        self.anchor_pos = position.min(self.duration());
        self.analyser.reset();
    }

    fn fill_window(&mut self) {
        let samples = &self.audio.samples;
        let len = samples.len();
        let n = self.window.len();

        let elapsed = self.clock.now().saturating_sub(self.anchor_clock);
        let end = ((self.anchor_pos + elapsed).as_secs_f64() * self.audio.sample_rate as f64)
            as usize;

        for (i, slot) in self.window.iter_mut().enumerate() {
            // Sample index `end - n + i`, i.e. the n samples before the playhead
            let back = n - i;
            *slot = if len == 0 {
                0.0
            } else if self.looping {
                let idx = (end % len + len * (back / len + 1) - back) % len;
                samples[idx]
            } else if end >= back && end - back < len {
                samples[end - back]
            } else {
                0.0
            };
        }
    }
}

impl<C: Clock> SpectrumSource for FileSource<C> {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
        self.fill_window();
        self.analyser.process(&self.window, buf);
        true
    }
}

/// Bounded buffer of the most recent mono samples, shared between a capture callback
/// and the tick thread.
#[derive(Clone)]
pub struct SampleRing {
    inner: Arc<Mutex<VecDeque<f32>>>,
    capacity: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push_slice(&self, samples: &[f32]) {
        let Ok(mut ring) = self.inner.lock() else {
            return;
        };
        ring.extend(samples.iter().copied());
        let excess = ring.len().saturating_sub(self.capacity);
        ring.drain(..excess);
    }

    /// Copy the newest `out.len()` samples into `out`. False if not enough have arrived.
    pub fn copy_latest(&self, out: &mut [f32]) -> bool {
        let Ok(ring) = self.inner.lock() else {
            return false;
        };
        if ring.len() < out.len() {
            return false;
        }
        let start = ring.len() - out.len();
        for (slot, &s) in out.iter_mut().zip(ring.range(start..)) {
            *slot = s;
        }
        true
    }
}

/// Spectrum source over a live sample stream
pub struct SampleTap {
    ring: SampleRing,
    analyser: ByteAnalyser,
    window: Vec<f32>,
}

impl SampleTap {
    pub fn new(ring: SampleRing, config: &AnalyserConfig) -> Self {
        let analyser = ByteAnalyser::new(config);
        let window = vec![0.0; analyser.fft_size()];
        Self {
            ring,
            analyser,
            window,
        }
    }
}

impl SpectrumSource for SampleTap {
    fn bin_count(&self) -> usize {
        self.analyser.bin_count()
    }

    fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
        if !self.ring.copy_latest(&mut self.window) {
            return false;
        }
        self.analyser.process(&self.window, buf);
        true
    }
}
