//! Markov-chain melody generator
//!
//! Builds an order-N transition table over scale degrees from a built-in
//! training corpus (or a caller-supplied degree sequence) and walks it.
//! Seeded walks are deterministic; unseeded walks draw from the thread
//! RNG.

use super::GenerationError;
use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::{clamp_velocity, Scale};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_LENGTH: usize = 128;
const MAX_ORDER: usize = 3;

/// Built-in training melody as scale degrees: a loose folk contour with
/// enough repetition to give the chain real structure
const CORPUS: [usize; 48] = [
    0, 2, 4, 2, 0, 2, 4, 5, 4, 2, 0, 2, 4, 4, 5, 7, 5, 4, 2, 4, 5, 4, 2, 0, 0, 2, 4, 2, 0, 2, 4,
    5, 7, 5, 4, 2, 4, 2, 0, 2, 4, 5, 4, 2, 1, 2, 0, 0,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkovParams {
    /// Transition order; clamped to [1, 3]
    pub order: usize,
    pub length: usize,
    /// Deterministic walk when set
    pub seed: Option<u64>,
    pub scale: Scale,
    pub root: u8,
    pub base_velocity: u8,
    /// Degree sequence to train on instead of the built-in corpus
    pub training: Option<Vec<usize>>,
}

impl Default for MarkovParams {
    fn default() -> Self {
        Self {
            order: 2,
            length: 32,
            seed: Some(7),
            scale: Scale::Major,
            root: 60,
            base_velocity: 82,
            training: None,
        }
    }
}

/// N-gram transition table: context window -> possible next degrees
struct TransitionTable {
    order: usize,
    transitions: HashMap<Vec<usize>, Vec<usize>>,
}

impl TransitionTable {
    fn train(corpus: &[usize], order: usize) -> Self {
        let mut transitions: HashMap<Vec<usize>, Vec<usize>> = HashMap::new();
        if corpus.len() > order {
            for window in corpus.windows(order + 1) {
                transitions
                    .entry(window[..order].to_vec())
                    .or_default()
                    .push(window[order]);
            }
        }
        Self { order, transitions }
    }

    fn next<R: Rng>(&self, context: &[usize], rng: &mut R) -> Option<usize> {
        let key = &context[context.len().saturating_sub(self.order)..];
        let candidates = self.transitions.get(key)?;
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}

pub fn generate(params: &MarkovParams) -> Result<Sequence, GenerationError> {
    let length = params.length.clamp(1, MAX_LENGTH);
    let order = params.order.clamp(1, MAX_ORDER);

    let corpus: &[usize] = params
        .training
        .as_deref()
        .filter(|t| t.len() > order)
        .unwrap_or(&CORPUS);
    let table = TransitionTable::train(corpus, order);

    let mut rng: StdRng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut degrees: Vec<usize> = corpus[..order].to_vec();
    while degrees.len() < length {
        match table.next(&degrees, &mut rng) {
            Some(next) => degrees.push(next),
            // Dead-end context: restart the chain from the corpus head
            None => degrees.extend_from_slice(&corpus[..order]),
        }
    }
    degrees.truncate(length);

    let mut steps = Vec::with_capacity(length);
    let mut previous = usize::MAX;
    for (i, &degree) in degrees.iter().enumerate() {
        let pitch = params.scale.degree_to_pitch(params.root, degree);
        // Leaps get a little emphasis over steps
        let leap = previous != usize::MAX && degree.abs_diff(previous) > 2;
        let velocity = if leap {
            clamp_velocity(params.base_velocity as i32 + 14)
        } else {
            params.base_velocity.min(127)
        };
        previous = degree;
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
        return Err(GenerationError::EmptyOutput { generator: "markov" });
    }
    Ok(Sequence::new(steps))
}
