use super::features::BandEnergies;

/// Split a byte spectrum into bass/mid/treble thirds and average each into 0.0-1.0.
///
/// Boundaries are `N / 3` and `2 * (N / 3)`, so any remainder lands in the treble band.
pub fn extract_bands(bins: &[u8]) -> BandEnergies {
    let third = bins.len() / 3;

    BandEnergies {
        bass: band_average(&bins[..third]),
        mid: band_average(&bins[third..third * 2]),
        treble: band_average(&bins[third * 2..]),
    }
}

fn band_average(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / bins.len() as f32 / 255.0
}

/// Per-band exponential moving average
#[derive(Clone, Debug)]
pub struct BandSmoother {
    alpha: f32,
    state: BandEnergies,
}

impl BandSmoother {
    /// `smoothing` is the retained fraction of the previous value: 0.85 means alpha 0.15.
    pub fn new(smoothing: f32) -> Self {
        Self {
            alpha: (1.0 - smoothing).clamp(0.0, 1.0),
            state: BandEnergies::default(),
        }
    }

    pub fn update(&mut self, raw: BandEnergies) -> BandEnergies {
        self.state = BandEnergies {
            bass: ema(self.state.bass, raw.bass, self.alpha),
            mid: ema(self.state.mid, raw.mid, self.alpha),
            treble: ema(self.state.treble, raw.treble, self.alpha),
        };
        self.state
    }

    pub fn current(&self) -> BandEnergies {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = BandEnergies::default();
    }
}

fn ema(prev: f32, raw: f32, alpha: f32) -> f32 {
    prev + alpha * (raw - prev)
}
