//! Audio feature extraction and beat detection for audio-reactive shaders.
//!
//! A [`SpectrumSource`](audio::source::SpectrumSource) supplies byte magnitudes, the
//! [`Engine`](engine::Engine) reduces them to smoothed bass/mid/treble levels plus a
//! decaying beat pulse once per tick, and consumers read the published
//! [`EngineOutput`](audio::features::EngineOutput) through an
//! [`OutputHandle`](engine::OutputHandle).

pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod meter;
pub mod uniforms;
