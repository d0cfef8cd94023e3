//! Number-sequence generator
//!
//! Walks a mathematical integer sequence (Fibonacci, primes, triangular
//! numbers, digits of pi) and folds each term through the scale into a
//! pitch. Fully deterministic: the same parameters always give the same
//! sequence.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::{clamp_velocity, Scale};
use serde::{Deserialize, Serialize};

const MAX_LENGTH: usize = 128;

/// First 64 decimal digits of pi, used as a quasi-random but fixed walk
const PI_DIGITS: [u8; 64] = [
    3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3, 2, 3, 8, 4, 6, 2, 6, 4, 3, 3, 8, 3, 2, 7, 9,
    5, 0, 2, 8, 8, 4, 1, 9, 7, 1, 6, 9, 3, 9, 9, 3, 7, 5, 1, 0, 5, 8, 2, 0, 9, 7, 4, 9, 4, 4, 5,
    9, 2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberSequence {
    Fibonacci,
    Primes,
    Triangular,
    PiDigits,
    Naturals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialParams {
    pub sequence: NumberSequence,
    pub length: usize,
    pub scale: Scale,
    pub root: u8,
    /// Octaves the folded degrees span; clamped to [1, 4]
    pub octave_range: u8,
    pub base_velocity: u8,
    /// Accent every Nth step (0 disables)
    pub accent_every: usize,
}

impl Default for SequentialParams {
    fn default() -> Self {
        Self {
            sequence: NumberSequence::Fibonacci,
            length: 16,
            scale: Scale::Major,
            root: 60,
            octave_range: 2,
            base_velocity: 84,
            accent_every: 4,
        }
    }
}

pub fn generate(params: &SequentialParams) -> Result<Sequence, GenerationError> {
    let length = params.length.clamp(1, MAX_LENGTH);
    let octave_range = params.octave_range.clamp(1, 4) as usize;
    let degree_span = params.scale.len() * octave_range;

    let terms = terms_for(params.sequence, length);
    let mut steps = Vec::with_capacity(length);
    for (i, term) in terms.into_iter().enumerate() {
        let degree = (term % degree_span as u64) as usize;
        let pitch = params.scale.degree_to_pitch(params.root, degree);
        let accented = params.accent_every != 0 && i % params.accent_every == 0;
        let velocity = if accented {
            clamp_velocity(params.base_velocity as i32 + 18)
        } else {
            params.base_velocity.min(127)
        };
        steps.push(Step::new(
            i,
            vec![Note::new(
                pitch,
                velocity,
                i as u16,
                degree as u16,
                NoteState::Active,
            )],
        ));
    }

    if steps.is_empty() {
        return Err(GenerationError::EmptyOutput {
            generator: "sequential",
        });
    }
    Ok(Sequence::new(steps))
}

fn terms_for(sequence: NumberSequence, length: usize) -> Vec<u64> {
    match sequence {
        NumberSequence::Fibonacci => {
            let mut terms = Vec::with_capacity(length);
            let (mut a, mut b) = (1u64, 1u64);
            for _ in 0..length {
                terms.push(a);
                let next = a.wrapping_add(b);
                a = b;
                b = next;
            }
            terms
        }
        NumberSequence::Primes => {
            let mut terms = Vec::with_capacity(length);
            let mut candidate = 2u64;
            while terms.len() < length {
                if is_prime(candidate) {
                    terms.push(candidate);
                }
                candidate += 1;
            }
            terms
        }
        NumberSequence::Triangular => (1..=length as u64).map(|n| n * (n + 1) / 2).collect(),
        NumberSequence::PiDigits => (0..length)
            .map(|i| PI_DIGITS[i % PI_DIGITS.len()] as u64)
            .collect(),
        NumberSequence::Naturals => (0..length as u64).collect(),
    }
}

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let params = SequentialParams::default();
        assert_eq!(generate(&params).unwrap(), generate(&params).unwrap());
    }

    #[test]
    fn test_fibonacci_terms() {
        assert_eq!(
            terms_for(NumberSequence::Fibonacci, 7),
            vec![1, 1, 2, 3, 5, 8, 13]
        );
    }

    #[test]
    fn test_prime_terms() {
        assert_eq!(
            terms_for(NumberSequence::Primes, 6),
            vec![2, 3, 5, 7, 11, 13]
        );
    }

    #[test]
    fn test_naturals_walk_the_scale() {
        let seq = generate(&SequentialParams {
            sequence: NumberSequence::Naturals,
            length: 8,
            scale: Scale::Major,
            root: 60,
            octave_range: 2,
            accent_every: 0,
            ..Default::default()
        })
        .unwrap();
        let pitches: Vec<u8> = seq.iter_notes().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64, 65, 67, 69, 71, 72]);
    }

    #[test]
    fn test_length_clamped() {
        let seq = generate(&SequentialParams {
            length: 10_000,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(seq.len(), MAX_LENGTH);
    }

    #[test]
    fn test_accent_pattern() {
        let seq = generate(&SequentialParams {
            accent_every: 4,
            base_velocity: 80,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(seq.steps()[0].notes[0].velocity, 98);
        assert_eq!(seq.steps()[1].notes[0].velocity, 80);
        assert_eq!(seq.steps()[4].notes[0].velocity, 98);
    }
}
