use std::collections::VecDeque;
use std::time::Duration;

use crate::config::EngineConfig;

/// Bounded window of raw bass values, oldest evicted first.
#[derive(Clone, Debug)]
pub struct BeatHistory {
    values: VecDeque<f32>,
    capacity: usize,
}

impl BeatHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Result of feeding one raw bass value into the detector
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatOutcome {
    /// Pulse after this tick's decay
    pub pulse: f32,
    pub fired: bool,
}

/// Onset detector over the raw bass channel.
///
/// A beat fires when bass jumps above the rolling mean by `threshold`, or rises by more
/// than `derivative_threshold` since the previous tick, provided bass clears `min_bass`
/// and the cooldown since the last beat has elapsed. The pulse is set to 1.0 on a beat
/// and multiplied by `decay` on every tick.
#[derive(Clone, Debug)]
pub struct BeatDetector {
    history: BeatHistory,
    threshold: f32,
    derivative_threshold: f32,
    min_bass: f32,
    cooldown: Duration,
    decay: f32,

    prev_bass: f32,
    last_beat: Option<Duration>,
    pulse: f32,
}

impl BeatDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            history: BeatHistory::new(config.history_size),
            threshold: config.beat_threshold,
            derivative_threshold: config.derivative_threshold,
            min_bass: config.min_bass,
            cooldown: Duration::from_millis(config.beat_cooldown_ms),
            decay: config.beat_decay,
            prev_bass: 0.0,
            last_beat: None,
            pulse: 0.0,
        }
    }

    pub fn update(&mut self, bass: f32, now: Duration) -> BeatOutcome {
        self.history.push(bass);
        let avg_bass = self.history.mean();

        let derivative = bass - self.prev_bass;
        self.prev_bass = bass;

        let loud_enough = bass > self.min_bass;
        let threshold_beat = loud_enough && bass > avg_bass * self.threshold;
        let derivative_beat = loud_enough && derivative > self.derivative_threshold;

        let cooled_down = match self.last_beat {
            Some(last) => now.saturating_sub(last) > self.cooldown,
            None => true,
        };

        let fired = (threshold_beat || derivative_beat) && cooled_down;
        if fired {
            self.pulse = 1.0;
            self.last_beat = Some(now);
            log::debug!(
                "Beat at {:.3}s: bass={:.3} avg={:.3} delta={:.3}",
                now.as_secs_f32(),
                bass,
                avg_bass,
                derivative
            );
        }

        self.pulse *= self.decay;

        BeatOutcome {
            pulse: self.pulse,
            fired,
        }
    }

    pub fn pulse(&self) -> f32 {
        self.pulse
    }

    pub fn history(&self) -> &BeatHistory {
        &self.history
    }

    pub fn last_beat(&self) -> Option<Duration> {
        self.last_beat
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.prev_bass = 0.0;
        self.last_beat = None;
        self.pulse = 0.0;
    }
}
