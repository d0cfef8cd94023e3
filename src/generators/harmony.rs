//! Chord-progression generator
//!
//! Walks a functional-harmony progression table, builds a stacked-third
//! triad on each chord degree, applies a voicing transform, and holds or
//! arpeggiates each chord across a configurable number of steps.
//! Deterministic for a given parameter set.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::{clamp_velocity, Scale};
use serde::{Deserialize, Serialize};

const MAX_STEPS_PER_CHORD: usize = 16;

/// Classic progressions as scale-degree roots (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progression {
    /// I-IV-V-I
    Authentic,
    /// I-V-vi-IV
    PopPunk,
    /// ii-V-I
    Jazz,
    /// I-vi-IV-V
    DooWop,
    /// i-VII-VI-VII (natural minor descent)
    Andalusian,
}

impl Progression {
    pub fn degrees(self) -> &'static [usize] {
        match self {
            Progression::Authentic => &[0, 3, 4, 0],
            Progression::PopPunk => &[0, 4, 5, 3],
            Progression::Jazz => &[1, 4, 0],
            Progression::DooWop => &[0, 5, 3, 4],
            Progression::Andalusian => &[0, 6, 5, 6],
        }
    }
}

/// How the triad's tones are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voicing {
    /// Root, third, fifth in one octave
    Close,
    /// Middle tone raised an octave
    Open,
    /// One chord tone per step, cycling
    Arpeggiated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonyParams {
    pub progression: Progression,
    pub voicing: Voicing,
    /// Steps each chord occupies; clamped to [1, 16]
    pub steps_per_chord: usize,
    pub scale: Scale,
    pub root: u8,
    pub base_velocity: u8,
    /// Repeat the progression this many times; clamped to [1, 8]
    pub repeats: usize,
}

impl Default for HarmonyParams {
    fn default() -> Self {
        Self {
            progression: Progression::Authentic,
            voicing: Voicing::Close,
            steps_per_chord: 4,
            scale: Scale::Major,
            root: 48,
            base_velocity: 78,
            repeats: 2,
        }
    }
}

/// Stacked-third triad on a scale degree, as scale degrees
fn triad(degree: usize) -> [usize; 3] {
    [degree, degree + 2, degree + 4]
}

pub fn generate(params: &HarmonyParams) -> Result<Sequence, GenerationError> {
    let steps_per_chord = params.steps_per_chord.clamp(1, MAX_STEPS_PER_CHORD);
    let repeats = params.repeats.clamp(1, 8);
    let degrees = params.progression.degrees();

    let mut steps = Vec::new();
    let mut index = 0usize;

    for _ in 0..repeats {
        for &chord_degree in degrees {
            let tones = triad(chord_degree);
            let mut pitches: Vec<u8> = tones
                .iter()
                .map(|&d| params.scale.degree_to_pitch(params.root, d))
                .collect();
            if params.voicing == Voicing::Open {
                pitches[1] = crate::scales::clamp_pitch(pitches[1] as i32 + 12);
            }

            for beat in 0..steps_per_chord {
                // First beat of each chord is the accented change
                let velocity = if beat == 0 {
                    clamp_velocity(params.base_velocity as i32 + 16)
                } else {
                    params.base_velocity.min(127)
                };

                let notes = match params.voicing {
                    Voicing::Arpeggiated => {
                        let tone = beat % pitches.len();
                        vec![Note::new(
                            pitches[tone],
                            velocity,
                            index as u16,
                            chord_degree as u16,
                            NoteState::Active,
                        )]
                    }
                    _ if beat == 0 => pitches
                        .iter()
                        .enumerate()
                        .map(|(v, &p)| {
                            Note::new(
                                p,
                                if v == 0 { velocity } else { clamp_velocity(velocity as i32 - 12) },
                                index as u16,
                                chord_degree as u16,
                                if v == 0 { NoteState::Active } else { NoteState::Harmony },
                            )
                        })
                        .collect(),
                    // Held chord: only the root re-sounds between changes
                    _ => vec![Note::new(
                        pitches[0],
                        clamp_velocity(velocity as i32 - 20),
                        index as u16,
                        chord_degree as u16,
                        NoteState::Active,
                    )],
                };
                steps.push(Step::new(index, notes));
                index += 1;
            }
        }
    }

    if steps.is_empty() {
        return Err(GenerationError::EmptyOutput {
            generator: "harmony",
        });
    }
    Ok(Sequence::new(steps))
}
