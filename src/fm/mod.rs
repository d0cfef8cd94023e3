//! Software FM synthesis fallback
//!
//! A 4-operator FM engine with eight fixed routing algorithms, per-operator
//! ADSR, and FIFO voice stealing. Used by the audio dispatch layer when no
//! hardware MIDI output is available. Live output runs through a cpal
//! stream; an offline mode renders into buffers for tests and WAV export.

pub mod algorithms;
pub mod envelope;
pub mod voice;

use algorithms::{algorithm_routing, ALGORITHM_COUNT};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use envelope::AdsrParams;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use voice::Voice;

/// Default polyphony before the oldest voice is stolen
pub const DEFAULT_MAX_POLYPHONY: usize = 12;

/// Per-sample smoothing coefficient for master volume moves
const VOLUME_SMOOTHING: f32 = 0.0015;

/// Static per-operator synthesis parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatorParams {
    /// Output gain in [0, 1]
    pub level: f32,
    /// Frequency offset in Hz
    pub detune: f32,
    /// Frequency ratio against the note's base frequency
    pub multiplier: f32,
    pub adsr: AdsrParams,
}

impl Default for OperatorParams {
    fn default() -> Self {
        Self {
            level: 0.8,
            detune: 0.0,
            multiplier: 1.0,
            adsr: AdsrParams::default(),
        }
    }
}

/// The complete voice-mode parameter set. Created once per engine and
/// mutated by control messages; per-note state lives in [`Voice`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FmParams {
    /// Routing algorithm id, 1-8
    pub algorithm: u8,
    /// Self-feedback depth on operator 4
    pub feedback: f32,
    pub operators: [OperatorParams; 4],
    /// Target master volume; actual output is smoothed toward it
    pub master_volume: f32,
}

impl Default for FmParams {
    fn default() -> Self {
        let mut operators = [OperatorParams::default(); 4];
        // A mild serial patch: modulators quieter than the carrier
        operators[1].level = 0.5;
        operators[2].level = 0.35;
        operators[3].level = 0.25;
        operators[3].multiplier = 2.0;
        Self {
            algorithm: 1,
            feedback: 0.0,
            operators,
            master_volume: 0.7,
        }
    }
}

/// Live parameter mutation, applied between samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FmParamUpdate {
    Algorithm(u8),
    Feedback(f32),
    MasterVolume(f32),
    OperatorLevel { op: usize, level: f32 },
    OperatorDetune { op: usize, detune: f32 },
    OperatorMultiplier { op: usize, multiplier: f32 },
    OperatorAttack { op: usize, seconds: f32 },
    OperatorDecay { op: usize, seconds: f32 },
    OperatorSustain { op: usize, level: f32 },
    OperatorRelease { op: usize, seconds: f32 },
}

/// Mixer state shared with the audio callback
struct FmShared {
    params: FmParams,
    voices: Vec<Voice>,
    max_polyphony: usize,
    next_age: u64,
    /// Smoothed master volume actually applied to the mix
    volume_current: f32,
    sample_rate: f32,
}

impl FmShared {
    fn new(sample_rate: f32) -> Self {
        let params = FmParams::default();
        Self {
            volume_current: params.master_volume,
            params,
            voices: Vec::new(),
            max_polyphony: DEFAULT_MAX_POLYPHONY,
            next_age: 0,
            sample_rate,
        }
    }

    fn note_on(&mut self, note: u8, velocity: f32) {
        // Monophonic-per-pitch retrigger: the same key restarts its voice
        self.voices.retain(|v| v.note != note);

        if self.voices.len() >= self.max_polyphony {
            // FIFO stealing: evict the voice triggered longest ago
            if let Some(oldest) = self
                .voices
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.age)
                .map(|(i, _)| i)
            {
                self.voices.remove(oldest);
            }
        }

        let voice = Voice::new(note, velocity, self.next_age, &self.params);
        self.next_age += 1;
        self.voices.push(voice);
    }

    fn note_off(&mut self, note: u8) {
        for voice in self.voices.iter_mut().filter(|v| v.note == note) {
            voice.release();
        }
    }

    fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            voice.release();
        }
    }

    fn apply(&mut self, update: FmParamUpdate) {
        let p = &mut self.params;
        match update {
            FmParamUpdate::Algorithm(id) => p.algorithm = id.clamp(1, ALGORITHM_COUNT),
            FmParamUpdate::Feedback(fb) => p.feedback = fb.clamp(0.0, 1.5),
            FmParamUpdate::MasterVolume(v) => p.master_volume = v.clamp(0.0, 1.0),
            FmParamUpdate::OperatorLevel { op, level } => {
                p.operators[op & 3].level = level.clamp(0.0, 1.0)
            }
            FmParamUpdate::OperatorDetune { op, detune } => {
                p.operators[op & 3].detune = detune.clamp(-64.0, 64.0)
            }
            FmParamUpdate::OperatorMultiplier { op, multiplier } => {
                p.operators[op & 3].multiplier = multiplier.clamp(0.25, 16.0)
            }
            FmParamUpdate::OperatorAttack { op, seconds } => {
                p.operators[op & 3].adsr.attack = seconds.max(0.001)
            }
            FmParamUpdate::OperatorDecay { op, seconds } => {
                p.operators[op & 3].adsr.decay = seconds.max(0.001)
            }
            FmParamUpdate::OperatorSustain { op, level } => {
                p.operators[op & 3].adsr.sustain = level.clamp(0.0, 1.0)
            }
            FmParamUpdate::OperatorRelease { op, seconds } => {
                p.operators[op & 3].adsr.release = seconds.max(0.001)
            }
        }
    }

    /// Render one mono sample: sum voices, reap finished ones, soft-clip
    fn process_sample(&mut self) -> f32 {
        // Smooth volume toward its target to avoid zipper clicks
        self.volume_current +=
            (self.params.master_volume - self.volume_current) * VOLUME_SMOOTHING;

        let routing = algorithm_routing(self.params.algorithm);
        let mut mix = 0.0f32;
        for voice in &mut self.voices {
            mix += voice.process(&self.params, routing, self.sample_rate);
        }
        self.voices.retain(|v| !v.is_finished());

        let out = mix * self.volume_current;
        if out.abs() > 1.0 {
            out.tanh()
        } else {
            out
        }
    }

    fn render(&mut self, samples: usize) -> Vec<f32> {
        (0..samples).map(|_| self.process_sample()).collect()
    }
}

/// The software FM synthesizer
pub struct FmVoiceEngine {
    shared: Arc<Mutex<FmShared>>,
    sample_rate: u32,
    _stream: Option<cpal::Stream>,
}

impl FmVoiceEngine {
    /// Open the default audio device and start a live output stream
    pub fn live() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or("no audio output device found")?;
        let config = device
            .default_output_config()
            .map_err(|e| format!("default output config: {e}"))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let shared = Arc::new(Mutex::new(FmShared::new(sample_rate as f32)));
        let shared_clone = shared.clone();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), shared_clone, channels)
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), shared_clone, channels)
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), shared_clone, channels)
            }
            other => return Err(format!("unsupported sample format {other:?}")),
        }?;

        stream.play().map_err(|e| format!("stream start: {e}"))?;
        info!("FM engine streaming at {} Hz", sample_rate);

        Ok(Self {
            shared,
            sample_rate,
            _stream: Some(stream),
        })
    }

    /// Engine without an audio device; callers pull samples via
    /// [`render`](Self::render)
    pub fn offline(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(Mutex::new(FmShared::new(sample_rate as f32))),
            sample_rate,
            _stream: None,
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        shared: Arc<Mutex<FmShared>>,
        channels: usize,
    ) -> Result<cpal::Stream, String>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let mut shared = shared.lock().unwrap();
                    for frame in data.chunks_mut(channels) {
                        let sample = shared.process_sample();
                        for out in frame.iter_mut() {
                            *out = T::from_sample(sample);
                        }
                    }
                },
                |err| error!("FM stream error: {}", err),
                None,
            )
            .map_err(|e| format!("build output stream: {e}"))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Trigger a note; velocity is normalized [0, 1]
    pub fn note_on(&self, note: u8, velocity: f32) {
        self.shared.lock().unwrap().note_on(note.min(127), velocity);
    }

    pub fn note_off(&self, note: u8) {
        self.shared.lock().unwrap().note_off(note.min(127));
    }

    pub fn all_notes_off(&self) {
        self.shared.lock().unwrap().all_notes_off();
    }

    pub fn update_params(&self, update: FmParamUpdate) {
        self.shared.lock().unwrap().apply(update);
    }

    pub fn set_max_polyphony(&self, max: usize) {
        self.shared.lock().unwrap().max_polyphony = max.max(1);
    }

    /// Snapshot of the current parameter set
    pub fn params(&self) -> FmParams {
        self.shared.lock().unwrap().params
    }

    /// Notes of currently-allocated voices, trigger order preserved
    pub fn active_notes(&self) -> Vec<u8> {
        self.shared.lock().unwrap().voices.iter().map(|v| v.note).collect()
    }

    /// Render a mono buffer (offline mode, or pre-rolling a live engine)
    pub fn render(&self, samples: usize) -> Vec<f32> {
        self.shared.lock().unwrap().render(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyphony_evicts_oldest_voice() {
        let engine = FmVoiceEngine::offline(44100);
        engine.set_max_polyphony(12);
        for note in 40..52 {
            engine.note_on(note, 0.8);
        }
        assert_eq!(engine.active_notes().len(), 12);

        // The 13th note steals the first-triggered voice (note 40)
        engine.note_on(60, 0.8);
        let notes = engine.active_notes();
        assert_eq!(notes.len(), 12);
        assert!(!notes.contains(&40), "oldest voice must be evicted");
        assert!(notes.contains(&60), "new voice must sound");
    }

    #[test]
    fn test_same_pitch_retriggers_instead_of_stacking() {
        let engine = FmVoiceEngine::offline(44100);
        engine.note_on(60, 0.8);
        engine.note_on(60, 0.8);
        assert_eq!(engine.active_notes(), vec![60]);
    }

    #[test]
    fn test_released_voices_are_reaped_after_tail() {
        let engine = FmVoiceEngine::offline(44100);
        engine.note_on(60, 1.0);
        engine.note_off(60);
        // Render past the longest release tail
        engine.render(44100 / 2);
        assert!(engine.active_notes().is_empty());
    }

    #[test]
    fn test_render_is_audible_then_silent() {
        let engine = FmVoiceEngine::offline(44100);
        engine.note_on(60, 1.0);
        let sounding = engine.render(4096);
        let rms = (sounding.iter().map(|s| s * s).sum::<f32>() / 4096.0).sqrt();
        assert!(rms > 0.01, "rms={rms}");

        engine.all_notes_off();
        engine.render(44100);
        let silent = engine.render(1024);
        assert!(silent.iter().all(|s| s.abs() < 1e-5));
    }

    #[test]
    fn test_update_params_clamps() {
        let engine = FmVoiceEngine::offline(44100);
        engine.update_params(FmParamUpdate::Algorithm(200));
        assert_eq!(engine.params().algorithm, 8);
        engine.update_params(FmParamUpdate::MasterVolume(7.0));
        assert_eq!(engine.params().master_volume, 1.0);
        engine.update_params(FmParamUpdate::OperatorLevel { op: 2, level: -4.0 });
        assert_eq!(engine.params().operators[2].level, 0.0);
    }

    #[test]
    fn test_output_is_soft_clipped() {
        let engine = FmVoiceEngine::offline(44100);
        engine.update_params(FmParamUpdate::Algorithm(8));
        engine.update_params(FmParamUpdate::MasterVolume(1.0));
        for op in 0..4 {
            engine.update_params(FmParamUpdate::OperatorLevel { op, level: 1.0 });
        }
        for note in [48, 52, 55, 60, 64, 67] {
            engine.note_on(note, 1.0);
        }
        let buf = engine.render(8192);
        assert!(buf.iter().all(|s| s.abs() <= 1.0));
    }
}
