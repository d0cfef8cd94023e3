//! Still-life and oscillator detection over a trailing grid window
//!
//! Classifies each cell from the last few generations of history: cells
//! constant across the window are still lifes, cells whose state sequence
//! exactly repeats with period 2 or 3 (and is non-constant) are
//! oscillators. An aggregate complexity score blends live density with the
//! oscillator/stable ratios and can drive adaptive behavior upstream.

use crate::grid::GridHistory;

/// Minimum history length before classification is attempted
pub const MIN_DETECTION_WINDOW: usize = 5;

/// Generations a cell must hold its state to count as a still life
const STILL_LIFE_WINDOW: usize = 4;

/// Per-cell classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    /// Not enough history, or no repeating structure found
    Chaotic,
    /// Constant state across the detection window
    Stable,
    /// Exact period-2 repetition, non-constant
    Oscillator2,
    /// Exact period-3 repetition, non-constant
    Oscillator3,
}

impl CellClass {
    pub fn is_oscillator(self) -> bool {
        matches!(self, CellClass::Oscillator2 | CellClass::Oscillator3)
    }
}

/// Summary of one detection pass
#[derive(Debug, Clone)]
pub struct DetectionReport {
    pub classes: Vec<CellClass>,
    pub stable_cells: usize,
    pub oscillator_cells: usize,
    pub complexity: f64,
}

/// Classify a single cell from its state sequence, oldest first
fn classify_states(states: &[u8]) -> CellClass {
    if states.len() < MIN_DETECTION_WINDOW {
        return CellClass::Chaotic;
    }

    // Still life: constant over the last STILL_LIFE_WINDOW generations.
    // Checked first so a constant cell is never also reported periodic
    // (a constant sequence trivially repeats at every period).
    let tail = &states[states.len() - STILL_LIFE_WINDOW..];
    if tail.iter().all(|&s| s == tail[0]) {
        return if tail[0] != 0 {
            CellClass::Stable
        } else {
            CellClass::Chaotic
        };
    }

    if has_exact_period(states, 2) {
        return CellClass::Oscillator2;
    }
    if has_exact_period(states, 3) {
        return CellClass::Oscillator3;
    }

    CellClass::Chaotic
}

/// True if the sequence repeats with exactly this period and is
/// non-constant
fn has_exact_period(states: &[u8], period: usize) -> bool {
    if states.len() < period * 2 {
        return false;
    }
    let repeats = states
        .iter()
        .zip(states.iter().skip(period))
        .all(|(a, b)| a == b);
    let constant = states.iter().all(|&s| s == states[0]);
    repeats && !constant
}

/// Run detection over the full history window
pub fn detect(history: &GridHistory, width: usize, height: usize) -> DetectionReport {
    let cell_count = width * height;
    let mut classes = vec![CellClass::Chaotic; cell_count];
    let mut stable_cells = 0;
    let mut oscillator_cells = 0;

    if history.len() >= MIN_DETECTION_WINDOW {
        for i in 0..cell_count {
            let states: Vec<u8> = history.cell_states(i).collect();
            let class = classify_states(&states);
            match class {
                CellClass::Stable => stable_cells += 1,
                CellClass::Oscillator2 | CellClass::Oscillator3 => oscillator_cells += 1,
                CellClass::Chaotic => {}
            }
            classes[i] = class;
        }
    }

    let complexity = complexity_score(history, cell_count, stable_cells, oscillator_cells);

    DetectionReport {
        classes,
        stable_cells,
        oscillator_cells,
        complexity,
    }
}

/// Aggregate complexity/entropy in [0, 1].
///
/// Peak density-interest is at 50% live cells (`1 - |0.5 - density| * 2`),
/// blended with the oscillator and stable ratios: oscillators add
/// structure, large still-life fractions indicate a frozen board.
fn complexity_score(
    history: &GridHistory,
    cell_count: usize,
    stable_cells: usize,
    oscillator_cells: usize,
) -> f64 {
    if history.is_empty() || cell_count == 0 {
        return 0.0;
    }
    let newest = history.frame(history.len() - 1);
    let live = newest.iter().filter(|&&c| c != 0).count();
    let density = live as f64 / cell_count as f64;
    let density_term = 1.0 - (0.5 - density).abs() * 2.0;

    let oscillator_ratio = oscillator_cells as f64 / cell_count as f64;
    let stable_ratio = stable_cells as f64 / cell_count as f64;

    (0.6 * density_term + 0.3 * oscillator_ratio + 0.1 * (1.0 - stable_ratio)).clamp(0.0, 1.0)
}
