//! A single sounding FM voice
//!
//! Four phase-accumulator sine operators wired per the active routing
//! algorithm, each gain-shaped by its own ADSR. Operators are evaluated
//! from op4 down to op1 so modulation inputs are already computed
//! (routings only ever point downward).

use super::algorithms::Routing;
use super::envelope::AdsrEnvelope;
use super::{FmParams, OperatorParams};
use std::f32::consts::TAU;

/// Depth scale applied to modulator outputs feeding another operator's
/// phase
const MOD_INDEX: f32 = 2.0;

#[derive(Debug, Clone)]
struct OperatorState {
    phase: f32,
    env: AdsrEnvelope,
    /// Previous output, consumed by self-feedback on op4
    last_output: f32,
}

/// One active note instance
#[derive(Debug, Clone)]
pub struct Voice {
    pub note: u8,
    /// Monotonic trigger counter, for oldest-voice stealing
    pub age: u64,
    base_frequency: f32,
    velocity: f32,
    ops: [OperatorState; 4],
}

impl Voice {
    pub fn new(note: u8, velocity: f32, age: u64, params: &FmParams) -> Self {
        let base_frequency = midi_to_hz(note);
        let ops = std::array::from_fn(|i| OperatorState {
            phase: 0.0,
            env: AdsrEnvelope::triggered(params.operators[i].adsr),
            last_output: 0.0,
        });
        Self {
            note,
            age,
            base_frequency,
            velocity: velocity.clamp(0.0, 1.0),
            ops,
        }
    }

    /// Gate off: every operator enters its release ramp. The voice keeps
    /// sounding until the longest tail ends.
    pub fn release(&mut self) {
        for op in &mut self.ops {
            op.env.release();
        }
    }

    /// Immediate silence for voice stealing
    pub fn kill(&mut self) {
        for op in &mut self.ops {
            op.env.kill();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ops.iter().all(|op| op.env.is_finished())
    }

    /// Render one sample
    pub fn process(&mut self, params: &FmParams, routing: &Routing, sample_rate: f32) -> f32 {
        let mut outputs = [0.0f32; 4];
        let mut mix = 0.0f32;

        // Top-down: op4 first, so lower operators see fresh modulation
        for i in (0..4).rev() {
            let op_params: &OperatorParams = &params.operators[i];

            let mut phase_mod = 0.0f32;
            for (src, &is_mod) in routing.modulators[i].iter().enumerate() {
                if is_mod {
                    phase_mod += outputs[src] * MOD_INDEX;
                }
            }
            // Self-feedback applies to the top operator only
            if i == 3 && params.feedback > 0.0 {
                phase_mod += self.ops[i].last_output * params.feedback;
            }

            let env = self.ops[i].env.process(sample_rate);
            let sample =
                ((self.ops[i].phase + phase_mod / TAU) * TAU).sin() * env * op_params.level;
            outputs[i] = sample;
            self.ops[i].last_output = sample;

            let freq = self.base_frequency * op_params.multiplier + op_params.detune;
            self.ops[i].phase += freq / sample_rate;
            while self.ops[i].phase >= 1.0 {
                self.ops[i].phase -= 1.0;
            }
            while self.ops[i].phase < 0.0 {
                self.ops[i].phase += 1.0;
            }

            if routing.carriers[i] {
                mix += sample;
            }
        }

        mix * self.velocity
    }
}

/// Equal-tempered MIDI note to frequency
pub fn midi_to_hz(note: u8) -> f32 {
    440.0 * 2.0f32.powf((note as f32 - 69.0) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::algorithms::algorithm_routing;

    const SR: f32 = 44100.0;

    fn render(voice: &mut Voice, params: &FmParams, samples: usize) -> Vec<f32> {
        let routing = algorithm_routing(params.algorithm);
        (0..samples).map(|_| voice.process(params, routing, SR)).collect()
    }

    #[test]
    fn test_midi_to_hz_reference_points() {
        assert!((midi_to_hz(69) - 440.0).abs() < 1e-3);
        assert!((midi_to_hz(57) - 220.0).abs() < 1e-3);
        assert!((midi_to_hz(60) - 261.63).abs() < 0.01);
    }

    #[test]
    fn test_voice_produces_sound() {
        let params = FmParams::default();
        let mut voice = Voice::new(60, 1.0, 0, &params);
        let buf = render(&mut voice, &params, 4096);
        let rms = (buf.iter().map(|s| s * s).sum::<f32>() / buf.len() as f32).sqrt();
        assert!(rms > 0.05, "voice should be audible, rms={rms}");
    }

    #[test]
    fn test_velocity_scales_output() {
        let params = FmParams::default();
        let mut loud = Voice::new(60, 1.0, 0, &params);
        let mut quiet = Voice::new(60, 0.2, 0, &params);
        let loud_peak = render(&mut loud, &params, 2048)
            .iter()
            .fold(0.0f32, |a, &s| a.max(s.abs()));
        let quiet_peak = render(&mut quiet, &params, 2048)
            .iter()
            .fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(loud_peak > quiet_peak * 2.0);
    }

    #[test]
    fn test_released_voice_decays_to_silence() {
        let params = FmParams::default();
        let mut voice = Voice::new(60, 1.0, 0, &params);
        render(&mut voice, &params, 1024);
        voice.release();
        // Longest default release is 0.25 s; render well past it
        let tail = render(&mut voice, &params, (SR * 0.5) as usize);
        assert!(voice.is_finished());
        let end = &tail[tail.len() - 64..];
        assert!(end.iter().all(|s| s.abs() < 1e-4));
    }

    #[test]
    fn test_algorithms_differ_in_spectrum() {
        // Same note through the serial and parallel topologies must not
        // produce the same waveform
        let mut serial_params = FmParams::default();
        serial_params.algorithm = 1;
        let mut parallel_params = FmParams::default();
        parallel_params.algorithm = 8;

        let mut a = Voice::new(60, 1.0, 0, &serial_params);
        let mut b = Voice::new(60, 1.0, 0, &parallel_params);
        let buf_a = render(&mut a, &serial_params, 2048);
        let buf_b = render(&mut b, &parallel_params, 2048);
        let same = buf_a
            .iter()
            .zip(&buf_b)
            .all(|(x, y)| (x - y).abs() < 1e-4);
        assert!(!same);
    }

    #[test]
    fn test_kill_silences_immediately() {
        let params = FmParams::default();
        let mut voice = Voice::new(60, 1.0, 0, &params);
        render(&mut voice, &params, 512);
        voice.kill();
        assert!(voice.is_finished());
        let buf = render(&mut voice, &params, 64);
        assert!(buf.iter().all(|s| s.abs() < 1e-6));
    }
}
