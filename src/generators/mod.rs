//! The generator family
//!
//! Every generator maps a parameter record to a finite [`Sequence`] in one
//! shot; playback loops the result. Dispatch is a closed enum, one
//! variant per algorithm carrying its own parameter record, so the
//! scheduler resolves the generator once per regeneration instead of
//! re-matching a string tag per frame.
//!
//! Generators clamp out-of-range parameters internally and never panic on
//! bad input. A generation that still comes out degenerate is replaced by
//! [`fallback_sequence`] rather than surfaced to the scheduler.

pub mod cellular1d;
pub mod cellular2d;
pub mod euclidean;
pub mod fractal;
pub mod harmony;
pub mod markov;
pub mod sequential;
pub mod waveshaper;

pub use cellular1d::{SeedCondition, VelocityMapping};
pub use cellular2d::{CellularTrace, SeedPattern};
pub use euclidean::EuclideanParams;
pub use fractal::FractalParams;
pub use harmony::HarmonyParams;
pub use markov::MarkovParams;
pub use sequential::SequentialParams;
pub use waveshaper::WaveshaperParams;

use crate::note::{Note, NoteState, Sequence, Step};
use crate::scales::Scale;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Why a generation attempt produced nothing usable
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{generator} produced an empty sequence")]
    EmptyOutput { generator: &'static str },
    #[error("{generator} produced no audible notes")]
    SilentOutput { generator: &'static str },
}

/// Which automaton family the cellular generator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomatonType {
    /// 1D elementary automaton (Wolfram rules 0-255)
    Elementary,
    /// 2D Game of Life
    GameOfLife,
}

/// Shared configuration record for both cellular modes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellularParams {
    pub automaton: AutomatonType,
    /// Wolfram rule number (Elementary mode only)
    pub rule: u8,
    pub width: usize,
    pub height: usize,
    pub generations: usize,
    pub seed: SeedCondition,
    /// Live-cell probability for random seeding, floored internally
    pub density: f64,
    pub velocity_mapping: VelocityMapping,
    pub scale: Scale,
    pub root: u8,
    pub note_min: u8,
    pub note_max: u8,
    /// Add interval notes above births/stable cells
    pub harmonies: bool,
    /// Velocity boost for newly-born cells
    pub birth_emphasis: bool,
    /// Buchla-style rhythmic shaping: structured-step pitch mapping and
    /// stronger accent contrast
    pub buchla_mode: bool,
}

impl Default for CellularParams {
    fn default() -> Self {
        Self {
            automaton: AutomatonType::GameOfLife,
            rule: 110,
            width: 16,
            height: 16,
            generations: 32,
            seed: SeedCondition::Random,
            density: 0.3,
            velocity_mapping: VelocityMapping::Linear,
            scale: Scale::Minor,
            root: 48,
            note_min: 36,
            note_max: 96,
            harmonies: true,
            birth_emphasis: true,
            buchla_mode: false,
        }
    }
}

/// Closed set of generator algorithms with their parameter records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "algorithm", content = "params")]
pub enum GeneratorKind {
    Fractal(fractal::FractalParams),
    Euclidean(euclidean::EuclideanParams),
    Cellular(CellularParams),
    Sequential(sequential::SequentialParams),
    Waveshaper(waveshaper::WaveshaperParams),
    Markov(markov::MarkovParams),
    Harmony(harmony::HarmonyParams),
}

impl GeneratorKind {
    /// Stable name for logging and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            GeneratorKind::Fractal(_) => "fractal",
            GeneratorKind::Euclidean(_) => "euclidean",
            GeneratorKind::Cellular(p) => match p.automaton {
                AutomatonType::Elementary => "cellular-1d",
                AutomatonType::GameOfLife => "cellular-2d",
            },
            GeneratorKind::Sequential(_) => "sequential",
            GeneratorKind::Waveshaper(_) => "waveshaper",
            GeneratorKind::Markov(_) => "markov",
            GeneratorKind::Harmony(_) => "harmony",
        }
    }

    /// Run the generator. Parameter problems are clamped away internally;
    /// an `Err` only means the output was degenerate.
    pub fn generate(&self) -> Result<Sequence, GenerationError> {
        let sequence = match self {
            GeneratorKind::Fractal(p) => fractal::generate(p),
            GeneratorKind::Euclidean(p) => euclidean::generate(p),
            GeneratorKind::Cellular(p) => match p.automaton {
                AutomatonType::Elementary => cellular1d::generate(p),
                AutomatonType::GameOfLife => cellular2d::generate(p).map(|(seq, _)| seq),
            },
            GeneratorKind::Sequential(p) => sequential::generate(p),
            GeneratorKind::Waveshaper(p) => waveshaper::generate(p),
            GeneratorKind::Markov(p) => markov::generate(p),
            GeneratorKind::Harmony(p) => harmony::generate(p),
        }?;
        debug_assert!(sequence.len() >= 1);
        Ok(sequence)
    }

    /// Like [`generate`](Self::generate), but degenerate output is replaced
    /// by the safe fallback pattern. This is the entry point the scheduler
    /// uses: it can never fail.
    pub fn generate_or_fallback(&self) -> Sequence {
        match self.generate() {
            Ok(sequence) => sequence,
            Err(err) => {
                warn!(generator = self.name(), %err, "generation degenerate, using fallback");
                let (scale, root) = self.tonality();
                fallback_sequence(scale, root)
            }
        }
    }

    /// The scale/root this generator is configured for, for fallback reuse
    fn tonality(&self) -> (Scale, u8) {
        match self {
            GeneratorKind::Fractal(p) => (p.scale, p.root),
            GeneratorKind::Euclidean(p) => (p.scale, p.root),
            GeneratorKind::Cellular(p) => (p.scale, p.root),
            GeneratorKind::Sequential(p) => (p.scale, p.root),
            GeneratorKind::Waveshaper(p) => (p.scale, p.root),
            GeneratorKind::Markov(p) => (p.scale, p.root),
            GeneratorKind::Harmony(p) => (p.scale, p.root),
        }
    }
}

/// Safe minimal sequence: one octave of the scale up and back down.
/// Always non-empty, always audible.
pub fn fallback_sequence(scale: Scale, root: u8) -> Sequence {
    let len = scale.len();
    let mut steps = Vec::with_capacity(len * 2);
    let degrees = (0..=len).chain((1..len).rev());
    for (i, degree) in degrees.enumerate() {
        let pitch = scale.degree_to_pitch(root, degree);
        let note = Note::new(pitch, 80, i as u16, 0, NoteState::Active);
        steps.push(Step::new(i, vec![note]));
    }
    Sequence::new(steps)
}

/// Cap notes in a step by musical priority: births first, then stable
/// cells, then louder notes. Bounds downstream dispatch load.
pub(crate) fn cap_step_notes(notes: &mut Vec<Note>, max: usize) {
    if notes.len() <= max {
        return;
    }
    notes.sort_by(|a, b| {
        let rank = |n: &Note| match n.state {
            NoteState::Birth => 0,
            NoteState::Stable => 1,
            _ => 2,
        };
        rank(a).cmp(&rank(b)).then(b.velocity.cmp(&a.velocity))
    });
    notes.truncate(max);
}

/// Per-step note cap shared by the cellular generators
pub(crate) const MAX_NOTES_PER_STEP: usize = 32;
