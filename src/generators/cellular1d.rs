//! Elementary (1D) cellular automaton generator
//!
//! Evolves a Wolfram rule for N generations; each generation becomes one
//! step, each live cell one note. Pitch follows the cell's position
//! through the scale, the octave rises as generations accumulate, and
//! newly-born cells get a velocity boost so the leading edge of the
//! automaton is audible.

use super::{cap_step_notes, CellularParams, GenerationError, MAX_NOTES_PER_STEP};
use crate::note::{Note, NoteState, Sequence, Step};
use crate::rules::{evolve_row, RuleTable};
use crate::scales::clamp_velocity;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Generation cap independent of caller input
const MAX_GENERATIONS: usize = 128;

/// Minimum random seeding density; lower requests are floored so random
/// seeds cannot start silent
const MIN_DENSITY: f64 = 0.05;

/// How the initial row/grid is seeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedCondition {
    /// One live cell in the center
    SingleCenter,
    /// Each cell live with probability `density`
    Random,
    /// Two live cells at the one-third points
    TwoCells,
    /// Every Nth cell live
    EveryNth(usize),
    /// Alternating live/dead
    Alternating,
    /// A named 2D library pattern (Game-of-Life mode only; 1D mode treats
    /// this as SingleCenter)
    Pattern(super::SeedPattern),
}

/// How cell position maps to velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityMapping {
    /// Quiet at the left edge, loud at the right
    Linear,
    /// Loud in the center, quiet at the edges
    CenterDistance,
    /// Uniform random per note
    Random,
}

pub fn generate(params: &CellularParams) -> Result<Sequence, GenerationError> {
    let width = params.width.clamp(4, 50);
    let generations = params.generations.clamp(1, MAX_GENERATIONS);
    let rule = RuleTable::from_rule_number(params.rule);
    let mut rng = rand::thread_rng();

    let mut row = seed_row(&params.seed, width, params.density, &mut rng);
    // Octave climbs in thirds of the run, capped at +2
    let octave_stride = (generations / 3).max(1);

    let mut steps = Vec::with_capacity(generations);
    let mut previous = vec![0u8; width];

    for gen in 0..generations {
        let octave_boost = (gen / octave_stride).min(2) as i32;
        let mut notes = Vec::new();

        for (x, &cell) in row.iter().enumerate() {
            if cell == 0 {
                continue;
            }
            let born = previous[x] == 0;
            let degree = x % params.scale.len();
            let base_pitch = params.scale.degree_to_pitch(params.root, degree);
            let pitch = crate::scales::fold_into_range(
                crate::scales::clamp_pitch(base_pitch as i32 + octave_boost * 12),
                params.note_min,
                params.note_max,
            );

            let mut velocity = map_velocity(params.velocity_mapping, x, width, &mut rng);
            if born && params.birth_emphasis {
                velocity = clamp_velocity(velocity as i32 + 15);
            }

            let state = if born { NoteState::Birth } else { NoteState::Active };
            notes.push(Note::new(pitch, velocity, x as u16, gen as u16, state));

            // Probabilistic harmony third on beat-aligned generations
            if params.harmonies && gen % 4 == 0 && rng.gen_bool(0.3) {
                let harmony = params.scale.third_above(params.root, degree);
                notes.push(Note::new(
                    crate::scales::fold_into_range(harmony, params.note_min, params.note_max),
                    clamp_velocity(velocity as i32 - 25),
                    x as u16,
                    gen as u16,
                    NoteState::Harmony,
                ));
            }
        }

        cap_step_notes(&mut notes, MAX_NOTES_PER_STEP);
        steps.push(Step::new(gen, notes));

        previous.copy_from_slice(&row);
        row = evolve_row(&rule, &row);
    }

    if steps.iter().all(|s| s.is_rest()) {
        return Err(GenerationError::SilentOutput {
            generator: "cellular-1d",
        });
    }
    Ok(Sequence::new(steps))
}

fn seed_row<R: Rng>(seed: &SeedCondition, width: usize, density: f64, rng: &mut R) -> Vec<u8> {
    let mut row = vec![0u8; width];
    match seed {
        SeedCondition::SingleCenter | SeedCondition::Pattern(_) => {
            row[width / 2] = 1;
        }
        SeedCondition::Random => {
            let density = density.clamp(MIN_DENSITY, 1.0);
            for cell in row.iter_mut() {
                *cell = rng.gen_bool(density) as u8;
            }
            // A random draw may still come up empty
            if row.iter().all(|&c| c == 0) {
                row[width / 2] = 1;
            }
        }
        SeedCondition::TwoCells => {
            row[width / 3] = 1;
            row[2 * width / 3] = 1;
        }
        SeedCondition::EveryNth(n) => {
            let n = (*n).max(1);
            for (x, cell) in row.iter_mut().enumerate() {
                if x % n == 0 {
                    *cell = 1;
                }
            }
        }
        SeedCondition::Alternating => {
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = (x % 2 == 0) as u8;
            }
        }
    }
    row
}

fn map_velocity<R: Rng>(mapping: VelocityMapping, x: usize, width: usize, rng: &mut R) -> u8 {
    match mapping {
        VelocityMapping::Linear => clamp_velocity(40 + (x * 80 / width.max(1)) as i32),
        VelocityMapping::CenterDistance => {
            let center = width as f64 / 2.0;
            let dist = ((x as f64 - center).abs() / center).min(1.0);
            clamp_velocity((120.0 - dist * 70.0) as i32)
        }
        VelocityMapping::Random => rng.gen_range(50..=110),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::AutomatonType;

    fn params(rule: u8, seed: SeedCondition) -> CellularParams {
        CellularParams {
            automaton: AutomatonType::Elementary,
            rule,
            width: 16,
            generations: 8,
            seed,
            harmonies: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_rule_zero_silences_after_first_generation() {
        // Every neighborhood maps to 0, so only generation 0 sounds
        let seq = generate(&params(0, SeedCondition::Alternating)).unwrap();
        assert!(!seq.steps()[0].is_rest());
        for step in &seq.steps()[1..] {
            assert!(step.is_rest(), "rule 0 must die out after one generation");
        }
    }

    #[test]
    fn test_rule_255_fills_every_generation() {
        let seq = generate(&params(255, SeedCondition::SingleCenter)).unwrap();
        for step in &seq.steps()[1..] {
            assert_eq!(
                step.notes.len(),
                16.min(MAX_NOTES_PER_STEP),
                "rule 255 evolves any seed to all-ones"
            );
        }
    }

    #[test]
    fn test_rule_90_from_center_grows_symmetrically() {
        let seq = generate(&params(90, SeedCondition::SingleCenter)).unwrap();
        // Generation 1 of rule 90 has exactly the two neighbors live
        assert_eq!(seq.steps()[1].notes.len(), 2);
    }

    #[test]
    fn test_all_pitches_respect_note_range() {
        let mut p = params(110, SeedCondition::Random);
        p.note_min = 40;
        p.note_max = 80;
        p.generations = 32;
        let seq = generate(&p).unwrap();
        for note in seq.iter_notes() {
            assert!((40..=80).contains(&note.pitch));
        }
    }

    #[test]
    fn test_birth_cells_are_tagged() {
        let seq = generate(&params(90, SeedCondition::SingleCenter)).unwrap();
        // In generation 1 both cells are new
        for note in &seq.steps()[1].notes {
            assert_eq!(note.state, NoteState::Birth);
        }
    }

    #[test]
    fn test_degenerate_dimensions_clamp() {
        let mut p = params(110, SeedCondition::SingleCenter);
        p.width = 0;
        p.generations = 0;
        assert!(generate(&p).is_ok());
    }
}
