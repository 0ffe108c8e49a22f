mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cli::Cli;
use pulsewave::audio::{analysis, decode};
use pulsewave::audio::source::{FileSource, SpectrumSource};
use pulsewave::clock::{Clock, MonotonicClock};
use pulsewave::config::{self, Config};
use pulsewave::engine::{Engine, Ticker};
use pulsewave::meter::render_meter;
use pulsewave::uniforms::UniformFeed;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let mut cfg = Config::default();
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Ok(loaded) => {
                log::info!("Loaded config from {}", path.display());
                cfg = loaded;
            }
            // An explicitly requested config must load
            Err(err) if cli.config.is_some() => return Err(err),
            Err(err) => log::warn!("{:#}", err),
        }
    }

    // Merge: config values apply only when CLI is at its default
    if cli.fps == 60 { cli.fps = cfg.playback.fps; }
    if cli.smoothing == 0.85 { cli.smoothing = cfg.engine.smoothing; }
    cfg.playback.fps = cli.fps.max(1);
    cfg.engine.smoothing = cli.smoothing;

    let start = Duration::from_secs_f32(cli.start.max(0.0));

    if cli.mic {
        return run_mic(&cli, &cfg);
    }

    let input = cli.input.as_ref().context("Input file is required (or pass --mic)")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("pulsewave - audio band and beat extraction");
    log::info!("Input: {}", input.display());
    log::info!(
        "Analyser: fft {} ({} bins), smoothing {:.2}",
        cfg.analyser.fft_size,
        cfg.analyser.bin_count(),
        cfg.engine.smoothing
    );

    let audio = decode::decode_audio(input)?;

    if cli.live {
        let clock = Arc::new(MonotonicClock::new());
        let mut source = FileSource::new(
            audio,
            &cfg.analyser,
            Arc::clone(&clock),
            cfg.playback.looping,
        );
        source.seek(start);
        return run_live(source, clock, &cli, &cfg);
    }

    log::info!("Output: {}", cli.output.display());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ticks ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let result = analysis::analyze(audio, &cfg, start, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    });
    pb.finish_with_message("Analysis complete");

    let file = std::fs::File::create(&cli.output)
        .with_context(|| format!("Failed to create output file: {}", cli.output.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &result)
        .context("Failed to write analysis")?;

    log::info!(
        "Done! {} ticks, {} beats, ~{:.1} BPM. Output: {}",
        result.summary.frames,
        result.summary.beat_times.len(),
        result.summary.tempo_bpm,
        cli.output.display()
    );
    Ok(())
}

#[cfg(feature = "mic")]
fn run_mic(cli: &Cli, cfg: &Config) -> Result<()> {
    let mic = pulsewave::audio::mic::MicInput::open(&cfg.analyser)?;
    let tap = mic.tap(&cfg.analyser);
    let clock = Arc::new(MonotonicClock::new());
    // `mic` keeps the input stream alive until the live loop returns
    let result = run_live(tap, clock, cli, cfg);
    drop(mic);
    result
}

#[cfg(not(feature = "mic"))]
fn run_mic(_cli: &Cli, _cfg: &Config) -> Result<()> {
    anyhow::bail!(
        "Microphone input requires the 'mic' feature. \
         Rebuild with: cargo build --features mic"
    );
}

/// Tick the engine in real time and render a meter line per frame until `--duration` elapses.
fn run_live<S>(source: S, clock: Arc<MonotonicClock>, cli: &Cli, cfg: &Config) -> Result<()>
where
    S: SpectrumSource + Send + 'static,
{
    let interval = Duration::from_secs_f64(1.0 / cfg.playback.fps as f64);
    let engine = Engine::new(&cfg.engine);
    let mut ticker = Ticker::spawn(engine, source, Arc::clone(&clock), interval)
        .context("Failed to start tick thread")?;

    // Shader feed and meter read the same published output
    let output = ticker.output();
    let mut feed = UniformFeed::new(ticker.output(), 1920, 1080);
    let deadline = cli.duration.map(|d| Instant::now() + Duration::from_secs_f32(d.max(0.0)));

    log::info!("Live at {} fps (Ctrl-C to quit)", cfg.playback.fps);

    let stdout = std::io::stdout();
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        let uniforms = feed.next_frame(clock.now().as_secs_f32());
        log::trace!("uniforms: {:?}", uniforms);

        let mut out = stdout.lock();
        write!(out, "\r{}", render_meter(&output.load(), cli.meter_width))?;
        out.flush()?;
        drop(out);

        std::thread::sleep(interval);
    }

    ticker.stop();
    println!();
    Ok(())
}
