//! Rule application for both automaton families
//!
//! Stateless: callers own the grids. The 1D path expands a Wolfram rule
//! number into an 8-entry lookup keyed by the 3-bit (left, center, right)
//! neighborhood; the 2D path applies the standard Conway birth/survival
//! rule. Both report what changed so the visualization feed can render
//! births and deaths incrementally.

use crate::grid::AutomatonGrid;
use serde::{Deserialize, Serialize};

/// What happened to a cell between two generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellChange {
    Birth,
    Death,
}

/// A single cell transition, for the visualization feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDelta {
    pub x: u16,
    pub y: u16,
    pub change: CellChange,
}

/// An elementary cellular automaton rule expanded to a neighborhood lookup
#[derive(Debug, Clone, Copy)]
pub struct RuleTable {
    table: [u8; 8],
}

impl RuleTable {
    /// Expand a Wolfram rule number (0-255). Bit `n` of the rule gives the
    /// next state for the neighborhood whose 3-bit value is `n`.
    pub fn from_rule_number(rule: u8) -> Self {
        let mut table = [0u8; 8];
        for (n, entry) in table.iter_mut().enumerate() {
            *entry = (rule >> n) & 1;
        }
        Self { table }
    }

    /// Next state for a (left, center, right) neighborhood
    pub fn apply(&self, left: u8, center: u8, right: u8) -> u8 {
        let key = ((left & 1) << 2) | ((center & 1) << 1) | (right & 1);
        self.table[key as usize]
    }
}

/// Evolve one row of an elementary automaton, wrapping at the edges
pub fn evolve_row(rule: &RuleTable, row: &[u8]) -> Vec<u8> {
    let n = row.len();
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|x| {
            let left = row[(x + n - 1) % n];
            let right = row[(x + 1) % n];
            rule.apply(left, row[x], right)
        })
        .collect()
}

/// Conway's rule: birth on exactly 3 neighbors, survival on 2 or 3
pub fn conway_next_state(alive: bool, neighbors: u8) -> bool {
    if alive {
        neighbors == 2 || neighbors == 3
    } else {
        neighbors == 3
    }
}

/// Full-grid Game-of-Life step. Returns the next grid plus birth/death
/// deltas. The frontier-based fast path lives in the 2D generator; this is
/// the dense fallback and the reference implementation it must agree with.
pub fn life_step(grid: &AutomatonGrid) -> (AutomatonGrid, Vec<CellDelta>) {
    let mut next = AutomatonGrid::new(grid.width(), grid.height());
    let mut deltas = Vec::new();

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let alive = grid.is_alive(x, y);
            let will_live = conway_next_state(alive, grid.neighbor_count(x, y));
            next.set(x, y, will_live);
            if will_live != alive {
                deltas.push(CellDelta {
                    x: x as u16,
                    y: y as u16,
                    change: if will_live {
                        CellChange::Birth
                    } else {
                        CellChange::Death
                    },
                });
            }
        }
    }

    (next, deltas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_zero_kills_everything() {
        let rule = RuleTable::from_rule_number(0);
        let row = vec![1, 0, 1, 1, 0, 1];
        assert_eq!(evolve_row(&rule, &row), vec![0; 6]);
    }

    #[test]
    fn test_rule_255_fills_everything() {
        let rule = RuleTable::from_rule_number(255);
        let row = vec![0, 0, 1, 0, 0];
        assert_eq!(evolve_row(&rule, &row), vec![1; 5]);
    }

    #[test]
    fn test_rule_90_single_cell() {
        // Rule 90 from a single cell produces the Sierpinski doubling:
        // the cell's two neighbors light up, the cell itself dies.
        let rule = RuleTable::from_rule_number(90);
        let row = vec![0, 0, 1, 0, 0];
        assert_eq!(evolve_row(&rule, &row), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_rule_table_neighborhood_keying() {
        // Rule 110: neighborhood 110 (=6) maps to bit 6 of 110 = 1
        let rule = RuleTable::from_rule_number(110);
        assert_eq!(rule.apply(1, 1, 0), 1);
        // Neighborhood 111 (=7) maps to bit 7 of 110 = 0
        assert_eq!(rule.apply(1, 1, 1), 0);
    }

    #[test]
    fn test_conway_block_is_still() {
        let mut g = AutomatonGrid::new(6, 6);
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            g.set(x, y, true);
        }
        let (next, deltas) = life_step(&g);
        assert_eq!(next, g);
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_conway_blinker_oscillates() {
        let mut g = AutomatonGrid::new(8, 8);
        for x in [2, 3, 4] {
            g.set(x, 3, true);
        }
        let (next, deltas) = life_step(&g);
        assert!(next.is_alive(3, 2));
        assert!(next.is_alive(3, 3));
        assert!(next.is_alive(3, 4));
        assert!(!next.is_alive(2, 3));
        assert!(!next.is_alive(4, 3));
        // Two births, two deaths
        assert_eq!(deltas.len(), 4);

        let (back, _) = life_step(&next);
        assert_eq!(back, g, "blinker must have period 2");
    }

    #[test]
    fn test_lonely_cell_dies_with_death_delta() {
        let mut g = AutomatonGrid::new(5, 5);
        g.set(2, 2, true);
        let (next, deltas) = life_step(&g);
        assert_eq!(next.live_count(), 0);
        assert_eq!(
            deltas,
            vec![CellDelta {
                x: 2,
                y: 2,
                change: CellChange::Death
            }]
        );
    }
}
