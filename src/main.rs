//! Morphogen CLI - play generative sequences live or render them to WAV

use clap::{Parser, Subcommand};
use morphogen::clock::{ManualClock, MonotonicClock};
use morphogen::dispatch::AudioDispatch;
use morphogen::engine::{Engine, EngineEvent};
use morphogen::generators::{CellularParams, GeneratorKind};
use morphogen::midi_backend::HardwareMidi;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "morphogen")]
#[command(about = "Generative music engine with MIDI and software FM output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available MIDI output devices
    Devices,

    /// Play a generator live (hardware MIDI if available, FM otherwise)
    Play {
        /// Generator: fractal, euclidean, cellular-1d, cellular-2d,
        /// sequential, waveshaper, markov, harmony
        #[arg(short, long, default_value = "fractal")]
        generator: String,

        /// Generator parameters as a JSON file (overrides --generator)
        #[arg(long)]
        params: Option<PathBuf>,

        /// Tempo in BPM
        #[arg(short, long, default_value = "120")]
        bpm: f64,

        /// Preferred MIDI output device (substring match)
        #[arg(short, long)]
        device: Option<String>,

        /// Duration in seconds (default: play until interrupted)
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Render a generator offline through the FM engine to WAV
    Render {
        /// Generator name, as for play
        #[arg(short, long, default_value = "cellular-2d")]
        generator: String,

        /// Generator parameters as a JSON file (overrides --generator)
        #[arg(long)]
        params: Option<PathBuf>,

        /// Output WAV file path
        output: PathBuf,

        /// Tempo in BPM
        #[arg(short, long, default_value = "120")]
        bpm: f64,

        /// Duration in seconds
        #[arg(short, long, default_value = "16.0")]
        duration: f64,

        /// Sample rate in Hz
        #[arg(short, long, default_value = "44100")]
        sample_rate: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices => {
            let devices = HardwareMidi::list_devices()?;
            if devices.is_empty() {
                println!("No MIDI output devices found");
            } else {
                println!("Available MIDI outputs:");
                for name in devices {
                    println!("  - {name}");
                }
            }
            Ok(())
        }
        Commands::Play {
            generator,
            params,
            bpm,
            device,
            duration,
        } => {
            let kind = resolve_generator(&generator, params.as_deref())?;
            play(kind, bpm, device.as_deref(), duration)
        }
        Commands::Render {
            generator,
            params,
            output,
            bpm,
            duration,
            sample_rate,
        } => {
            let kind = resolve_generator(&generator, params.as_deref())?;
            render(kind, bpm, duration, sample_rate, &output)
        }
    }
}

fn resolve_generator(
    name: &str,
    params: Option<&std::path::Path>,
) -> Result<GeneratorKind, Box<dyn std::error::Error>> {
    if let Some(path) = params {
        let json = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&json)?);
    }

    use morphogen::generators::AutomatonType;
    let kind = match name {
        "fractal" => GeneratorKind::Fractal(Default::default()),
        "euclidean" => GeneratorKind::Euclidean(Default::default()),
        "cellular-1d" => GeneratorKind::Cellular(CellularParams {
            automaton: AutomatonType::Elementary,
            ..Default::default()
        }),
        "cellular-2d" => GeneratorKind::Cellular(Default::default()),
        "sequential" => GeneratorKind::Sequential(Default::default()),
        "waveshaper" => GeneratorKind::Waveshaper(Default::default()),
        "markov" => GeneratorKind::Markov(Default::default()),
        "harmony" => GeneratorKind::Harmony(Default::default()),
        other => return Err(format!("unknown generator '{other}'").into()),
    };
    Ok(kind)
}

/// Live playback: monotonic clock, cooperative tick at roughly 60 Hz
fn play(
    kind: GeneratorKind,
    bpm: f64,
    device: Option<&str>,
    duration: Option<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::new(MonotonicClock::new(), kind, bpm, AudioDispatch::new());
    let status = engine.initialize(device);
    if !status.success {
        return Err("no audio backend available".into());
    }
    println!("Playing via {:?} at {bpm} bpm (ctrl-c to stop)", status.mode);

    engine.handle(EngineEvent::Play);
    let started = std::time::Instant::now();
    loop {
        engine.tick();
        if let Some(limit) = duration {
            if started.elapsed().as_secs_f64() >= limit {
                break;
            }
        }
        thread::sleep(Duration::from_millis(16));
    }
    engine.handle(EngineEvent::Stop);
    Ok(())
}

/// Offline render: manual clock stepped in exact frame intervals while
/// the FM engine fills the sample buffer in between
fn render(
    kind: GeneratorKind,
    bpm: f64,
    duration: f64,
    sample_rate: u32,
    output: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::new(
        ManualClock::new(),
        kind,
        bpm,
        AudioDispatch::offline(sample_rate),
    );
    let status = engine.initialize(None);
    if !status.success {
        return Err("software FM engine unavailable".into());
    }

    engine.handle(EngineEvent::Play);

    let frame_ms = 1000.0 / 60.0;
    let samples_per_frame = (sample_rate as f64 * frame_ms / 1000.0) as usize;
    let total_frames = (duration * 1000.0 / frame_ms).ceil() as usize;

    let mut buffer = Vec::with_capacity(total_frames * samples_per_frame);
    for _ in 0..total_frames {
        engine.scheduler_mut().clock_mut().advance(frame_ms);
        engine.tick();
        if let Some(fm) = engine.dispatch().fm_engine() {
            buffer.extend(fm.render(samples_per_frame));
        }
    }

    engine.handle(EngineEvent::Stop);
    // Let release tails ring out
    if let Some(fm) = engine.dispatch().fm_engine() {
        buffer.extend(fm.render(sample_rate as usize / 2));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(output, spec)?;
    for sample in &buffer {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    println!(
        "Wrote {} ({:.1}s at {} Hz)",
        output.display(),
        buffer.len() as f64 / sample_rate as f64,
        sample_rate
    );
    Ok(())
}
