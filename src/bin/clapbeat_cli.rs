use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use clapbeat::audio::{synth, CpalMicrophone, ScriptedMicrophone};
use clapbeat::debug::pipeline_tracer;
use clapbeat::engine::{ManualTimeSource, SystemTimeSource};
use clapbeat::{AppConfig, ClapRhythmEngine, EngineEvent, FrameDriver, Phase, RhythmPhaseScheduler};

#[derive(Parser, Debug)]
#[command(
    name = "clapbeat_cli",
    about = "Clap detection and rhythm phase harness"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/clapbeat_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable per-stage pipeline tracing
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect claps on the default microphone and stream events as JSON lines
    Listen {
        #[arg(long, default_value_t = 10)]
        seconds: u64,
        /// Also run the Red/Yellow/Green cycle
        #[arg(long)]
        rhythm: bool,
    },
    /// Run a WAV file through the detection pipeline on a simulated clock
    Replay {
        #[arg(long)]
        wav: PathBuf,
        #[arg(long)]
        rhythm: bool,
    },
    /// Feed a synthetic clap pattern through the detection pipeline
    Simulate {
        #[arg(long, default_value_t = 4)]
        claps: u32,
        #[arg(long, default_value_t = 600)]
        interval_ms: u64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long)]
        rhythm: bool,
    },
    /// Print the phase timeline of the rhythm scheduler
    Rhythm {
        #[arg(long, default_value_t = 7000)]
        duration_ms: u64,
        #[arg(long, default_value_t = 250)]
        step_ms: u64,
    },
    /// Print the effective configuration
    Config,
    /// List audio input devices
    Devices,
}

fn main() -> ExitCode {
    clapbeat::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.trace {
        pipeline_tracer::enable();
    }
    let config = match &cli.config {
        Some(path) => AppConfig::try_load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::load(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building tokio runtime")?;

    match cli.command {
        Commands::Listen { seconds, rhythm } => runtime.block_on(run_listen(&config, seconds, rhythm)),
        Commands::Replay { wav, rhythm } => {
            let mic = ScriptedMicrophone::from_wav(&wav, config.driver.tick_rate_hz)
                .with_context(|| format!("reading {}", wav.display()))?;
            runtime.block_on(run_scripted(&config, mic, rhythm))
        }
        Commands::Simulate {
            claps,
            interval_ms,
            seed,
            rhythm,
        } => {
            let mic = clap_pattern(&config, claps, interval_ms, seed);
            runtime.block_on(run_scripted(&config, mic, rhythm))
        }
        Commands::Rhythm {
            duration_ms,
            step_ms,
        } => run_rhythm(&config, duration_ms, step_ms),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
        Commands::Devices => {
            let devices = CpalMicrophone::list_input_devices().context("enumerating input devices")?;
            for name in devices {
                println!("{name}");
            }
            Ok(ExitCode::from(0))
        }
    }
}

async fn run_listen(config: &AppConfig, seconds: u64, rhythm: bool) -> Result<ExitCode> {
    let mut engine = ClapRhythmEngine::new(
        Box::new(CpalMicrophone::new()),
        Arc::new(SystemTimeSource::new()),
        &config.driver,
    );
    let rx = engine.subscribe();

    engine
        .start_detection(config.detection.clone())
        .await
        .context("starting clap detection")?;
    if rhythm {
        engine.start_rhythm(config.rhythm).context("starting rhythm")?;
    }

    let mut driver = FrameDriver::new(&config.driver);
    let ticks = seconds * u64::from(config.driver.tick_rate_hz.max(1));

    let drive = async move {
        let summary = driver.run_for(&mut engine, ticks).await;
        engine.stop_rhythm();
        engine.stop_detection();
        // Dropping the engine closes the event channel and ends the printer
        summary
    };
    let (summary, printed) = tokio::join!(drive, print_events(rx));
    printed?;

    eprintln!(
        "ticks={} claps={} beats={}",
        summary.ticks, summary.claps, summary.beats
    );
    match summary.last_failure {
        Some(err) => {
            eprintln!("Capture failed: {err}");
            Ok(ExitCode::from(2))
        }
        None => Ok(ExitCode::from(0)),
    }
}

async fn print_events(mut rx: broadcast::Receiver<EngineEvent>) -> Result<()> {
    loop {
        match rx.recv().await {
            Ok(event) => println!("{}", serde_json::to_string(&event)?),
            Err(RecvError::Lagged(skipped)) => log::warn!("[CLI] Skipped {} events", skipped),
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

/// Tick the engine once per scripted block on a simulated clock.
async fn run_scripted(config: &AppConfig, mic: ScriptedMicrophone, rhythm: bool) -> Result<ExitCode> {
    let steps = mic.steps() as u64;
    let clock = Arc::new(ManualTimeSource::new(0));
    let mut engine = ClapRhythmEngine::new(Box::new(mic), clock.clone(), &config.driver);
    let mut rx = engine.subscribe();

    engine
        .start_detection(config.detection.clone())
        .await
        .context("starting clap detection")?;
    if rhythm {
        engine.start_rhythm(config.rhythm).context("starting rhythm")?;
    }

    let period_us = config.driver.tick_interval().as_micros() as u64;
    let mut claps = 0u64;
    let mut failed = false;
    for step in 0..steps {
        clock.set(step * period_us / 1000);
        let report = engine.tick_now();
        claps += u64::from(report.clap.is_some());
        failed |= report.failure.is_some();
        while let Ok(event) = rx.try_recv() {
            println!("{}", serde_json::to_string(&event)?);
        }
    }
    engine.stop_detection();
    while let Ok(event) = rx.try_recv() {
        println!("{}", serde_json::to_string(&event)?);
    }

    eprintln!("ticks={} claps={}", steps, claps);
    Ok(ExitCode::from(if failed { 2 } else { 0 }))
}

/// Silence with a clap burst every `interval_ms`, one block per tick.
fn clap_pattern(config: &AppConfig, claps: u32, interval_ms: u64, seed: u64) -> ScriptedMicrophone {
    const SAMPLE_RATE: u32 = 48_000;
    let tick_hz = config.driver.tick_rate_hz.max(1);
    let block = (SAMPLE_RATE / tick_hz) as usize;
    let fft_size = config.detection.fft_size;
    let ticks_between = ((interval_ms * u64::from(tick_hz)) / 1000).max(1);

    let mut mic = ScriptedMicrophone::new(SAMPLE_RATE);
    for clap in 0..claps {
        for _ in 0..ticks_between {
            mic = mic.with_samples(synth::silence(block));
        }
        mic = mic.with_samples(synth::clap_burst(fft_size, SAMPLE_RATE, seed + u64::from(clap)));
    }
    for _ in 0..ticks_between {
        mic = mic.with_samples(synth::silence(block));
    }
    mic
}

#[derive(Serialize)]
struct TimelineRow {
    t_ms: u64,
    phase: Phase,
    progress: f32,
    beat: bool,
}

fn run_rhythm(config: &AppConfig, duration_ms: u64, step_ms: u64) -> Result<ExitCode> {
    let mut scheduler = RhythmPhaseScheduler::new();
    scheduler.start(config.rhythm, 0).context("starting rhythm")?;

    let mut t = 0;
    while t <= duration_ms {
        let beat = scheduler.tick(t).is_some();
        let snapshot = scheduler.current_phase();
        let row = TimelineRow {
            t_ms: t,
            phase: snapshot.phase,
            progress: snapshot.progress,
            beat,
        };
        println!("{}", serde_json::to_string(&row)?);
        t += step_ms.max(1);
    }
    Ok(ExitCode::from(0))
}
