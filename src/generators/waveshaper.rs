//! Waveshaper generator
//!
//! Samples a periodic function over the sequence length and quantizes the
//! waveform value to a scale degree, so the melody traces the shape of the
//! wave. Deterministic for a given parameter set.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::{clamp_velocity, Scale};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

const MAX_LENGTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
    Square,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveshaperParams {
    pub waveform: Waveform,
    /// Wave cycles across the whole sequence
    pub cycles: f64,
    pub length: usize,
    pub scale: Scale,
    pub root: u8,
    pub octave_range: u8,
    pub base_velocity: u8,
    /// Second waveform layered a fifth up on wave peaks
    pub peak_harmonies: bool,
}

impl Default for WaveshaperParams {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            cycles: 2.0,
            length: 32,
            scale: Scale::Dorian,
            root: 52,
            octave_range: 2,
            base_velocity: 86,
            peak_harmonies: false,
        }
    }
}

/// Evaluate the waveform at phase in [0, 1), output normalized to [0, 1]
fn sample(waveform: Waveform, phase: f64) -> f64 {
    let phase = phase.rem_euclid(1.0);
    match waveform {
        Waveform::Sine => ((phase * TAU).sin() + 1.0) / 2.0,
        Waveform::Triangle => {
            if phase < 0.5 {
                phase * 2.0
            } else {
                2.0 - phase * 2.0
            }
        }
        Waveform::Saw => phase,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                0.0
            }
        }
    }
}

pub fn generate(params: &WaveshaperParams) -> Result<Sequence, GenerationError> {
    let length = params.length.clamp(2, MAX_LENGTH);
    let cycles = if params.cycles.is_finite() && params.cycles > 0.0 {
        params.cycles.min(length as f64)
    } else {
        1.0
    };
    let octave_range = params.octave_range.clamp(1, 4) as usize;
    let degree_span = params.scale.len() * octave_range;

    let mut steps = Vec::with_capacity(length);
    for i in 0..length {
        let phase = i as f64 / length as f64 * cycles;
        let value = sample(params.waveform, phase);
        let degree = ((value * degree_span as f64) as usize).min(degree_span);
        let pitch = params.scale.degree_to_pitch(params.root, degree);

        // Louder toward the wave's extremes
        let accent = ((value - 0.5).abs() * 30.0) as i32;
        let velocity = clamp_velocity(params.base_velocity as i32 + accent);

        let mut notes = vec![Note::new(
            pitch,
            velocity,
            i as u16,
            degree as u16,
            NoteState::Active,
        )];
        if params.peak_harmonies && value > 0.85 {
            notes.push(Note::new(
                crate::scales::clamp_pitch(pitch as i32 + 7),
                clamp_velocity(velocity as i32 - 20),
                i as u16,
                degree as u16,
                NoteState::Harmony,
            ));
        }
        steps.push(Step::new(i, notes));
    }

    if steps.is_empty() {
        return Err(GenerationError::EmptyOutput {
            generator: "waveshaper",
        });
    }
    Ok(Sequence::new(steps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let params = WaveshaperParams::default();
        assert_eq!(generate(&params).unwrap(), generate(&params).unwrap());
    }

    #[test]
    fn test_saw_rises_monotonically_within_a_cycle() {
        let seq = generate(&WaveshaperParams {
            waveform: Waveform::Saw,
            cycles: 1.0,
            length: 16,
            ..Default::default()
        })
        .unwrap();
        let pitches: Vec<u8> = seq.iter_notes().map(|n| n.pitch).collect();
        assert!(pitches.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_square_has_exactly_two_pitches() {
        let seq = generate(&WaveshaperParams {
            waveform: Waveform::Square,
            cycles: 2.0,
            length: 16,
            peak_harmonies: false,
            ..Default::default()
        })
        .unwrap();
        let mut pitches: Vec<u8> = seq.iter_notes().map(|n| n.pitch).collect();
        pitches.sort_unstable();
        pitches.dedup();
        assert_eq!(pitches.len(), 2);
    }

    #[test]
    fn test_sine_is_symmetric_around_midpoint() {
        assert!((sample(Waveform::Sine, 0.25) - 1.0).abs() < 1e-9);
        assert!((sample(Waveform::Sine, 0.75) - 0.0).abs() < 1e-9);
        assert!((sample(Waveform::Sine, 0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bad_cycles_fall_back() {
        for cycles in [f64::NAN, f64::INFINITY, -3.0, 0.0] {
            let seq = generate(&WaveshaperParams {
                cycles,
                ..Default::default()
            });
            assert!(seq.is_ok(), "cycles={cycles} must not fail");
        }
    }

    #[test]
    fn test_peak_harmonies_land_on_peaks() {
        let seq = generate(&WaveshaperParams {
            waveform: Waveform::Sine,
            cycles: 1.0,
            length: 32,
            peak_harmonies: true,
            ..Default::default()
        })
        .unwrap();
        let harmonies: Vec<&Step> = seq
            .steps()
            .iter()
            .filter(|s| s.notes.iter().any(|n| n.state == NoteState::Harmony))
            .collect();
        assert!(!harmonies.is_empty());
        // Sine peaks in the first half of the cycle
        for step in harmonies {
            assert!(step.index < 16);
        }
    }
}
