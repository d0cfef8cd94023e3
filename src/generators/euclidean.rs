//! Euclidean rhythm generator
//!
//! Distributes `pulses` onsets as evenly as possible across `steps` slots
//! using Bjorklund's algorithm, then walks the scale for pitch. Rests stay
//! in the sequence as empty steps so the rhythm survives the scheduler's
//! fixed-step playback.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::{clamp_velocity, Scale};
use serde::{Deserialize, Serialize};

const MAX_STEPS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EuclideanParams {
    pub pulses: usize,
    pub steps: usize,
    /// Rotate the onset pattern left by this many slots
    pub rotation: usize,
    pub scale: Scale,
    pub root: u8,
    /// Scale degrees to climb per onset before wrapping
    pub degree_span: usize,
    pub base_velocity: u8,
    /// Extra velocity on the first onset of the cycle
    pub downbeat_accent: u8,
}

impl Default for EuclideanParams {
    fn default() -> Self {
        Self {
            pulses: 5,
            steps: 16,
            rotation: 0,
            scale: Scale::PentatonicMinor,
            root: 48,
            degree_span: 10,
            base_velocity: 90,
            downbeat_accent: 20,
        }
    }
}

pub fn generate(params: &EuclideanParams) -> Result<Sequence, GenerationError> {
    let steps = params.steps.clamp(1, MAX_STEPS);
    let pulses = params.pulses.clamp(1, steps);

    let mut pattern = bjorklund(pulses, steps);
    pattern.rotate_left(params.rotation % steps);

    let degree_span = params.degree_span.clamp(1, params.scale.len() * 4);
    let mut onset = 0usize;
    let mut out = Vec::with_capacity(steps);
    for (i, &hit) in pattern.iter().enumerate() {
        if !hit {
            out.push(Step::rest(i));
            continue;
        }
        let degree = onset % degree_span;
        let pitch = params.scale.degree_to_pitch(params.root, degree);
        let velocity = if onset == 0 {
            clamp_velocity(params.base_velocity as i32 + params.downbeat_accent as i32)
        } else {
            params.base_velocity.min(127)
        };
        out.push(Step::new(
            i,
            vec![Note::new(pitch, velocity, i as u16, 0, NoteState::Active)],
        ));
        onset += 1;
    }

    if out.iter().all(|s| s.is_rest()) {
        return Err(GenerationError::SilentOutput {
            generator: "euclidean",
        });
    }
    Ok(Sequence::new(out))
}

/// Bjorklund's even-distribution algorithm. `pulses >= steps` saturates to
/// all onsets.
pub fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    if pulses == 0 {
        return vec![false; steps];
    }
    if pulses >= steps {
        return vec![true; steps];
    }

    let mut a: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut b: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];

    while b.len() > 1 {
        let n = a.len().min(b.len());
        let mut merged = Vec::with_capacity(n);
        for i in 0..n {
            let mut seq = a[i].clone();
            seq.extend_from_slice(&b[i]);
            merged.push(seq);
        }
        let remainder = if a.len() > n {
            a.split_off(n)
        } else {
            b.split_off(n)
        };
        a = merged;
        b = remainder;
    }

    a.into_iter().chain(b).flatten().collect()
}
