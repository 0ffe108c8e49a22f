use serde::Serialize;

/// Three-band energy levels, each normalized to 0.0-1.0
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandEnergies {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

/// The state published to consumers once per tick.
///
/// Bands are the smoothed values; `beat` is the decaying pulse (post-decay for the
/// tick that produced it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct EngineOutput {
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub beat: f32,
}

impl EngineOutput {
    pub fn new(bands: BandEnergies, beat: f32) -> Self {
        Self {
            bass: bands.bass,
            mid: bands.mid,
            treble: bands.treble,
            beat,
        }
    }
}

/// Everything one tick produced, including the diagnostics that are not published.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub output: EngineOutput,
    /// Unsmoothed band energies for this tick
    pub raw: BandEnergies,
    /// Did a beat fire on this tick?
    pub beat_fired: bool,
}
