//! Core note/step/sequence data model
//!
//! A generator invocation produces one complete [`Sequence`]: an ordered
//! list of [`Step`]s, each holding zero or more simultaneous [`Note`]s.
//! Steps are played back in insertion order by the scheduler, looping the
//! cursor modulo the sequence length.

use serde::{Deserialize, Serialize};

/// Semantic tag attached to every generated note.
///
/// Drives velocity emphasis during playback and coloring in the
/// visualization feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    /// An ordinary sounding cell/point
    Active,
    /// A cell that became alive this generation
    Birth,
    /// A cell that died this generation (visualization only, silent)
    Death,
    /// A harmonization added above a primary note
    Harmony,
    /// A cell classified as part of a still life
    Stable,
    /// A cell classified as part of a period-2/3 oscillator
    Oscillator,
}

/// One generated note: pitch/velocity plus its grid origin and state tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub column: u16,
    pub row: u16,
    pub state: NoteState,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, column: u16, row: u16, state: NoteState) -> Self {
        Self {
            pitch: pitch.min(127),
            velocity: velocity.min(127),
            column,
            row,
            state,
        }
    }
}

/// A simultaneous chord-like event; `notes` may be empty (a rest)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub index: usize,
    pub time_offset_ms: f64,
    pub notes: Vec<Note>,
}

impl Step {
    pub fn new(index: usize, notes: Vec<Note>) -> Self {
        Self {
            index,
            time_offset_ms: 0.0,
            notes,
        }
    }

    pub fn rest(index: usize) -> Self {
        Self::new(index, Vec::new())
    }

    pub fn is_rest(&self) -> bool {
        self.notes.is_empty()
    }
}

/// An ordered, non-empty list of steps produced by one generator invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    /// Build a sequence from steps. An empty input yields a single rest
    /// step so the playback cursor always has something to advance over.
    pub fn new(mut steps: Vec<Step>) -> Self {
        if steps.is_empty() {
            steps.push(Step::rest(0));
        }
        for (i, step) in steps.iter_mut().enumerate() {
            step.index = i;
        }
        let mut seq = Self { steps };
        seq.retime(DEFAULT_STEP_INTERVAL_MS);
        seq
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        // Sequences are never structurally empty; a lone rest still counts
        false
    }

    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index % self.steps.len()]
    }

    /// Total number of notes across all steps
    pub fn note_count(&self) -> usize {
        self.steps.iter().map(|s| s.notes.len()).sum()
    }

    /// Recompute each step's time offset for a given step interval.
    /// Called by the scheduler whenever tempo changes.
    pub fn retime(&mut self, step_interval_ms: f64) {
        for (i, step) in self.steps.iter_mut().enumerate() {
            step.time_offset_ms = i as f64 * step_interval_ms;
        }
    }

    pub fn iter_notes(&self) -> impl Iterator<Item = &Note> {
        self.steps.iter().flat_map(|s| s.notes.iter())
    }
}

/// Step interval at 120 BPM sixteenths, used until the scheduler retimes
pub const DEFAULT_STEP_INTERVAL_MS: f64 = 125.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sequence_gets_a_rest() {
        let seq = Sequence::new(Vec::new());
        assert_eq!(seq.len(), 1);
        assert!(seq.steps()[0].is_rest());
    }

    #[test]
    fn test_sequence_reindexes_steps() {
        let steps = vec![Step::rest(9), Step::rest(9), Step::rest(9)];
        let seq = Sequence::new(steps);
        let indices: Vec<usize> = seq.steps().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_retime() {
        let mut seq = Sequence::new(vec![Step::rest(0), Step::rest(1)]);
        seq.retime(250.0);
        assert_eq!(seq.steps()[0].time_offset_ms, 0.0);
        assert_eq!(seq.steps()[1].time_offset_ms, 250.0);
    }

    #[test]
    fn test_step_lookup_wraps() {
        let seq = Sequence::new(vec![Step::rest(0), Step::rest(1)]);
        assert_eq!(seq.step(5).index, 1);
    }

    #[test]
    fn test_note_constructor_clamps() {
        let n = Note::new(200, 200, 0, 0, NoteState::Active);
        assert_eq!(n.pitch, 127);
        assert_eq!(n.velocity, 127);
    }
}
