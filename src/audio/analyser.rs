//! Byte-magnitude spectrum analyser with the semantics of a Web Audio `AnalyserNode`.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::config::AnalyserConfig;

pub struct ByteAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes carried between calls
    smoothed: Vec<f32>,
    time_constant: f32,
    min_db: f32,
    max_db: f32,
}

impl ByteAnalyser {
    pub fn new(config: &AnalyserConfig) -> Self {
        let fft_size = config.fft_size.max(2);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft,
            fft_size,
            window: blackman_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            time_constant: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_db: config.min_decibels,
            max_db: config.max_decibels,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyse the most recent `fft_size` samples of `samples` into `out`.
    ///
    /// Shorter input is zero-padded at the front. Writes at most `bin_count` bytes.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) {
        let n = self.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / n as f32;
        let tau = self.time_constant;
        let range = self.max_db - self.min_db;

        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            let value = tau * *smoothed + (1.0 - tau) * magnitude;
            // Non-finite values poison every later frame
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }

        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            let db = 20.0 * magnitude.log10();
            let scaled = if range > 0.0 {
                255.0 / range * (db - self.min_db)
            } else {
                0.0
            };
            *byte = if scaled.is_nan() { 0 } else { scaled.floor().clamp(0.0, 255.0) as u8 };
        }
    }

    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_bin: usize, n: usize, amplitude: f32) -> Vec<f32> {
        (0..n)
            .map(|i| {
                amplitude
                    * (2.0 * std::f32::consts::PI * freq_bin as f32 * i as f32 / n as f32).sin()
            })
            .collect()
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let mut analyser = ByteAnalyser::new(&AnalyserConfig::default());
        let mut out = vec![255u8; analyser.bin_count()];
        analyser.process(&vec![0.0; 256], &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_in_its_bin() {
        let mut analyser = ByteAnalyser::new(&AnalyserConfig::default());
        let mut out = vec![0u8; analyser.bin_count()];
        // Quiet enough that neighbouring bins stay below the clamp
        let input = sine(10, 256, 0.05);
        for _ in 0..8 {
            analyser.process(&input, &mut out);
        }
        let peak = out
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 10);
        assert!(out[10] > 200);
        assert!(out[60] < out[10]);
    }

    #[test]
    fn smoothing_carries_energy_between_calls() {
        let mut analyser = ByteAnalyser::new(&AnalyserConfig::default());
        let mut loud = vec![0u8; 128];
        let mut after = vec![0u8; 128];
        analyser.process(&sine(10, 256, 0.05), &mut loud);
        analyser.process(&vec![0.0; 256], &mut after);
        // Half the magnitude remains: about 6 dB lower, not silent
        assert!(after[10] > 0);
        assert!(after[10] < loud[10]);

        analyser.reset();
        analyser.process(&vec![0.0; 256], &mut after);
        assert_eq!(after[10], 0);
    }

    #[test]
    fn short_input_is_padded() {
        let config = AnalyserConfig::default();
        let mut short = ByteAnalyser::new(&config);
        let mut padded = ByteAnalyser::new(&config);

        let mut silent = vec![7u8; 128];
        short.process(&[0.0; 10], &mut silent);
        assert!(silent.iter().all(|&b| b == 0));
        short.reset();

        let mut full = vec![0.0; 246];
        full.extend_from_slice(&[0.5; 10]);
        let mut a = vec![0u8; 128];
        let mut b = vec![0u8; 128];
        short.process(&[0.5; 10], &mut a);
        padded.process(&full, &mut b);
        assert_eq!(a, b);
        assert!(a.iter().any(|&v| v > 0));
    }

    #[test]
    fn blackman_window_is_symmetric_and_bounded() {
        let w = blackman_window(256);
        assert!(w[0].abs() < 1e-6);
        assert!((w[128] - 1.0).abs() < 1e-4);
        assert!(w.iter().all(|&v| (-1e-6..=1.0 + 1e-6).contains(&v)));
        assert!((w[1] - w[255]).abs() < 1e-5);
    }
}
