//! Tick driver: owns all per-session state and publishes one output snapshot per tick.

use arc_swap::ArcSwap;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::audio::bands::{extract_bands, BandSmoother};
use crate::audio::beat::BeatDetector;
use crate::audio::features::{EngineOutput, TickReport};
use crate::audio::source::SpectrumSource;
use crate::clock::Clock;
use crate::config::EngineConfig;

/// Read-only view of the latest published output. Cheap to clone, never blocks.
#[derive(Clone)]
pub struct OutputHandle {
    inner: Arc<ArcSwap<EngineOutput>>,
}

impl OutputHandle {
    pub fn load(&self) -> EngineOutput {
        **self.inner.load()
    }
}

pub struct Engine {
    bins: Vec<u8>,
    smoother: BandSmoother,
    detector: BeatDetector,
    published: Arc<ArcSwap<EngineOutput>>,
    active: bool,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            bins: Vec::new(),
            smoother: BandSmoother::new(config.smoothing),
            detector: BeatDetector::new(config),
            published: Arc::new(ArcSwap::from_pointee(EngineOutput::default())),
            active: false,
        }
    }

    pub fn output(&self) -> OutputHandle {
        OutputHandle {
            inner: Arc::clone(&self.published),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begin a session from a cold state
    pub fn start(&mut self) {
        self.reset();
        self.active = true;
        log::info!("Audio session started");
    }

    /// End the session and clear all state. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.reset();
        log::info!("Audio session stopped");
    }

    fn reset(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0);
        self.smoother.reset();
        self.detector.reset();
        self.published.store(Arc::new(EngineOutput::default()));
    }

    /// Run one extraction/detection pass and publish the result.
    ///
    /// Returns None without touching any state if the engine is stopped or the source
    /// has no snapshot for this cycle.
    pub fn tick<S: SpectrumSource + ?Sized>(
        &mut self,
        source: &mut S,
        now: Duration,
    ) -> Option<TickReport> {
        if !self.active {
            return None;
        }

        let bin_count = source.bin_count();
        if self.bins.len() != bin_count {
            self.bins.resize(bin_count, 0);
        }
        if !source.fill_latest(&mut self.bins) {
            return None;
        }

        let raw = extract_bands(&self.bins);
        let bands = self.smoother.update(raw);
        let beat = self.detector.update(raw.bass, now);

        let output = EngineOutput::new(bands, beat.pulse);
        self.published.store(Arc::new(output));

        Some(TickReport {
            output,
            raw,
            beat_fired: beat.fired,
        })
    }
}

/// Owned scheduling handle that ticks an engine at a fixed refresh interval on its own
/// thread. The engine and source move into the thread, which is their only writer.
pub struct Ticker {
    output: OutputHandle,
    cancel: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<S, C>(
        mut engine: Engine,
        mut source: S,
        clock: C,
        interval: Duration,
    ) -> std::io::Result<Self>
    where
        S: SpectrumSource + Send + 'static,
        C: Clock + 'static,
    {
        let output = engine.output();
        let (cancel, cancelled) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("pulsewave-tick".into())
            .spawn(move || {
                engine.start();
                let mut next = Instant::now();
                loop {
                    if let Some(report) = engine.tick(&mut source, clock.now()) {
                        log::trace!("tick: {:?}", report.output);
                    }

                    next += interval;
                    let now = Instant::now();
                    if next < now {
                        // Fell behind; don't try to catch up with a burst of ticks
                        next = now;
                    }
                    match cancelled.recv_timeout(next - now) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                engine.stop();
            })?;

        Ok(Self {
            output,
            cancel: Some(cancel),
            handle: Some(handle),
        })
    }

    pub fn output(&self) -> OutputHandle {
        self.output.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel the pending tick, wait for the thread to reset the engine, and return.
    /// Idempotent.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Tick thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::BandEnergies;
    use crate::clock::ManualClock;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays the same snapshot forever
    struct Fixed(Vec<u8>);

    impl SpectrumSource for Fixed {
        fn bin_count(&self) -> usize {
            self.0.len()
        }

        fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
            buf.copy_from_slice(&self.0);
            true
        }
    }

    /// Plays back a queue of snapshots; `None` entries simulate a missing snapshot
    struct Scripted {
        len: usize,
        frames: VecDeque<Option<Vec<u8>>>,
    }

    impl SpectrumSource for Scripted {
        fn bin_count(&self) -> usize {
            self.len
        }

        fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
            match self.frames.pop_front().flatten() {
                Some(frame) => {
                    buf.copy_from_slice(&frame);
                    true
                }
                None => false,
            }
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl SpectrumSource for Counting {
        fn bin_count(&self) -> usize {
            128
        }

        fn fill_latest(&mut self, buf: &mut [u8]) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            buf.iter_mut().for_each(|b| *b = 200);
            true
        }
    }

    /// Bass-only snapshot of 9 bins with the given byte level
    fn bass(level: u8) -> Vec<u8> {
        vec![level, level, level, 0, 0, 0, 0, 0, 0]
    }

    fn started() -> Engine {
        let mut engine = Engine::new(&EngineConfig::default());
        engine.start();
        engine
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn silence_publishes_zeros() {
        let mut engine = started();
        let mut source = Fixed(vec![0; 128]);
        for i in 0..100 {
            let report = engine.tick(&mut source, ms(i * 16)).unwrap();
            assert_eq!(report.output, EngineOutput::default());
            assert!(!report.beat_fired);
        }
        assert_eq!(engine.output().load(), EngineOutput::default());
    }

    #[test]
    fn raw_bands_are_extracted_before_smoothing() {
        let mut engine = started();
        let mut source = Fixed(vec![0, 0, 0, 50, 50, 50, 100, 100, 100]);
        let report = engine.tick(&mut source, ms(0)).unwrap();

        assert_eq!(report.raw.bass, 0.0);
        assert!((report.raw.mid - 50.0 / 255.0).abs() < 1e-6);
        assert!((report.raw.treble - 100.0 / 255.0).abs() < 1e-6);
        assert!((report.output.mid - 0.15 * 50.0 / 255.0).abs() < 1e-6);
        assert!((report.output.treble - 0.15 * 100.0 / 255.0).abs() < 1e-6);
        assert_eq!(report.output.beat, 0.0);
    }

    #[test]
    fn constant_input_beats_once_then_settles() {
        let mut engine = started();
        let mut source = Fixed(bass(128));
        let mut beats = 0;
        let mut last = None;
        for i in 0..200 {
            let report = engine.tick(&mut source, ms(i * 16)).unwrap();
            if report.beat_fired {
                beats += 1;
            }
            last = Some(report);
        }
        assert_eq!(beats, 1);

        let last = last.unwrap();
        assert!((last.output.bass - 128.0 / 255.0).abs() < 1e-3);
        assert!(last.output.beat < 1e-6);
    }

    #[test]
    fn cooldown_applies_across_ticks() {
        let mut engine = started();
        let mut source = Scripted {
            len: 9,
            frames: VecDeque::from(vec![Some(bass(128)), Some(bass(0)), Some(bass(255))]),
        };
        assert!(engine.tick(&mut source, ms(1000)).unwrap().beat_fired);
        engine.tick(&mut source, ms(1016));
        let report = engine.tick(&mut source, ms(1032)).unwrap();
        assert!(!report.beat_fired);
        assert!((report.output.beat - 0.88f32.powi(3)).abs() < 1e-6);
    }

    #[test]
    fn missing_snapshot_skips_the_tick() {
        let mut engine = started();
        let mut source = Scripted {
            len: 9,
            frames: VecDeque::from(vec![Some(bass(128)), None, Some(bass(128))]),
        };
        let first = engine.tick(&mut source, ms(0)).unwrap();
        assert!(engine.tick(&mut source, ms(16)).is_none());
        assert_eq!(engine.output().load(), first.output);

        // Decay resumes from where it was, one step per real tick
        let third = engine.tick(&mut source, ms(32)).unwrap();
        assert!((third.output.beat - 0.88f32.powi(2)).abs() < 1e-6);
    }

    #[test]
    fn stopped_engine_does_not_tick() {
        let mut engine = Engine::new(&EngineConfig::default());
        let mut source = Fixed(bass(200));
        assert!(engine.tick(&mut source, ms(0)).is_none());
        assert!(!engine.is_active());
    }

    #[test]
    fn stop_resets_and_is_idempotent() {
        let mut engine = started();
        let mut source = Fixed(bass(200));
        let handle = engine.output();
        engine.tick(&mut source, ms(0));
        assert!(handle.load().beat > 0.0);

        engine.stop();
        engine.stop();
        assert_eq!(handle.load(), EngineOutput::default());
        assert!(engine.tick(&mut source, ms(16)).is_none());

        // New session starts cold: first loud tick beats again without any cooldown
        engine.start();
        let report = engine.tick(&mut source, ms(20)).unwrap();
        assert!(report.beat_fired);
        assert_eq!(
            report.raw,
            BandEnergies {
                bass: 200.0 / 255.0,
                mid: 0.0,
                treble: 0.0
            }
        );
    }

    #[test]
    fn ticker_runs_until_stopped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Counting {
            calls: Arc::clone(&calls),
        };
        let engine = Engine::new(&EngineConfig::default());
        let clock = Arc::new(ManualClock::new());

        let mut ticker = Ticker::spawn(engine, source, clock, ms(2)).unwrap();
        let output = ticker.output();
        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(ms(1));
        }
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(ticker.is_running());

        ticker.stop();
        assert!(!ticker.is_running());
        let after_stop = calls.load(Ordering::SeqCst);
        assert_eq!(output.load(), EngineOutput::default());

        ticker.stop();
        thread::sleep(ms(10));
        assert_eq!(calls.load(Ordering::SeqCst), after_stop);
    }
}
