//! Fractal melody generator: recursive midpoint displacement
//!
//! Builds a 1D stochastic fractal contour, normalizes it to [0, 1], and
//! quantizes each point through the scale table into a MIDI pitch.
//! Deterministic: the same `(seed, params)` always yields the same
//! sequence, because displacement draws from the Park-Miller LCG.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::rng::ParkMiller;
use crate::scales::{clamp_velocity, Scale};
use serde::{Deserialize, Serialize};

/// Longest supported contour, independent of caller input
const MAX_POINTS: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalParams {
    pub seed: u32,
    /// Number of contour points (steps); clamped to [2, 128]
    pub length: usize,
    /// Displacement magnitude in [0, 1]
    pub complexity: f64,
    pub scale: Scale,
    pub root: u8,
    /// Octaves the contour spans; clamped to [1, 4]
    pub octave_range: u8,
    pub base_velocity: u8,
    /// Chance of a harmony note a fixed scale interval above
    pub harmony_probability: f64,
    /// Scale degrees the harmony sits above its primary note
    pub harmony_interval: usize,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            seed: 1,
            length: 32,
            complexity: 0.6,
            scale: Scale::Minor,
            root: 48,
            octave_range: 2,
            base_velocity: 88,
            harmony_probability: 0.2,
            harmony_interval: 2,
        }
    }
}

pub fn generate(params: &FractalParams) -> Result<Sequence, GenerationError> {
    let length = params.length.clamp(2, MAX_POINTS);
    let complexity = params.complexity.clamp(0.0, 1.0);
    let octave_range = params.octave_range.clamp(1, 4) as usize;
    let mut rng = ParkMiller::new(params.seed);

    let contour = midpoint_contour(&mut rng, length, complexity);

    let degree_span = params.scale.len() * octave_range;
    let mut steps = Vec::with_capacity(length);
    for (i, &value) in contour.iter().enumerate() {
        let degree = ((value * degree_span as f64) as usize).min(degree_span);
        let pitch = params.scale.degree_to_pitch(params.root, degree);

        // Points near the contour's extremes get a slight push
        let accent = ((value - 0.5).abs() * 24.0) as i32;
        let velocity = clamp_velocity(params.base_velocity as i32 + accent);

        let mut notes = vec![Note::new(
            pitch,
            velocity,
            i as u16,
            degree as u16,
            NoteState::Active,
        )];

        if rng.chance(params.harmony_probability.clamp(0.0, 1.0)) {
            let harmony_degree = degree + params.harmony_interval.min(params.scale.len());
            let harmony_pitch = params.scale.degree_to_pitch(params.root, harmony_degree);
            notes.push(Note::new(
                harmony_pitch,
                clamp_velocity(velocity as i32 - 20),
                i as u16,
                harmony_degree as u16,
                NoteState::Harmony,
            ));
        }

        steps.push(Step::new(i, notes));
    }

    if steps.is_empty() {
        return Err(GenerationError::EmptyOutput {
            generator: "fractal",
        });
    }
    Ok(Sequence::new(steps))
}

/// Recursive midpoint displacement over `length` points, normalized to
/// [0, 1]. Segments of length <= 1 keep their raw endpoints.
fn midpoint_contour(rng: &mut ParkMiller, length: usize, complexity: f64) -> Vec<f64> {
    let mut points = vec![0.0f64; length];
    points[0] = rng.next_f64();
    points[length - 1] = rng.next_f64();
    displace(rng, &mut points, 0, length - 1, complexity, length);
    normalize(&mut points);
    points
}

fn displace(
    rng: &mut ParkMiller,
    points: &mut [f64],
    lo: usize,
    hi: usize,
    complexity: f64,
    total: usize,
) {
    if hi - lo <= 1 {
        return;
    }
    let mid = (lo + hi) / 2;
    // Displacement shrinks with the segment so detail stays self-similar
    let segment_scale = (hi - lo) as f64 / total as f64;
    let displaced =
        (points[lo] + points[hi]) / 2.0 + rng.next_bipolar() * complexity * segment_scale;
    points[mid] = displaced.clamp(0.0, 1.0);
    displace(rng, points, lo, mid, complexity, total);
    displace(rng, points, mid, hi, complexity, total);
}

fn normalize(points: &mut [f64]) {
    let min = points.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = points.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span <= f64::EPSILON {
        // Flat contour: park everything mid-range
        points.iter_mut().for_each(|p| *p = 0.5);
        return;
    }
    points.iter_mut().for_each(|p| *p = (*p - min) / span);
}
