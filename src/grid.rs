//! Automaton grid and bounded generation history
//!
//! The 2D cellular generator evolves an [`AutomatonGrid`] generation by
//! generation. Neighbor lookups wrap toroidally. A bounded ring of
//! fixed-size generation buffers ([`GridHistory`]) retains the trailing
//! window needed for pattern detection without cloning grids per
//! generation.

/// Hard cap on grid dimensions; callers asking for more are clamped
pub const MAX_GRID_DIM: usize = 50;

/// Minimum useful grid dimension
pub const MIN_GRID_DIM: usize = 4;

/// Dense binary grid with toroidal wraparound
#[derive(Debug, Clone, PartialEq)]
pub struct AutomatonGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl AutomatonGrid {
    /// Create an all-dead grid, clamping dimensions into the supported range
    pub fn new(width: usize, height: usize) -> Self {
        let width = width.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        let height = height.clamp(MIN_GRID_DIM, MAX_GRID_DIM);
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    fn idx(&self, x: usize, y: usize) -> usize {
        (y % self.height) * self.width + (x % self.width)
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells[self.idx(x, y)]
    }

    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.get(x, y) != 0
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        let i = self.idx(x, y);
        self.cells[i] = alive as u8;
    }

    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Count live 8-neighbors with toroidal wraparound
    pub fn neighbor_count(&self, x: usize, y: usize) -> u8 {
        let mut count = 0;
        for dy in [self.height - 1, 0, 1] {
            for dx in [self.width - 1, 0, 1] {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if self.is_alive(x + dx, y + dy) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Iterate over coordinates of live cells, row-major
    pub fn iter_live(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(move |(i, _)| (i % w, i / w))
    }

    /// The cell plus its 8 neighbors, as wrapped coordinates
    pub fn neighborhood(&self, x: usize, y: usize) -> [(usize, usize); 9] {
        let mut out = [(0usize, 0usize); 9];
        let mut i = 0;
        for dy in [self.height - 1, 0, 1] {
            for dx in [self.width - 1, 0, 1] {
                out[i] = ((x + dx) % self.width, (y + dy) % self.height);
                i += 1;
            }
        }
        out
    }
}

/// Bounded ring buffer of grid generations.
///
/// Frames are fixed-size buffers reused in place; pushing the
/// (capacity+1)-th generation overwrites the oldest. This caps history
/// memory at `capacity * width * height` bytes regardless of how many
/// generations are evolved.
#[derive(Debug)]
pub struct GridHistory {
    capacity: usize,
    cell_count: usize,
    frames: Vec<Vec<u8>>,
    head: usize,
    len: usize,
}

impl GridHistory {
    pub fn new(capacity: usize, width: usize, height: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cell_count: width * height,
            frames: (0..capacity).map(|_| vec![0; width * height]).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Record a generation, overwriting the oldest frame when full
    pub fn push(&mut self, grid: &AutomatonGrid) {
        debug_assert_eq!(grid.cells().len(), self.cell_count);
        self.frames[self.head].copy_from_slice(grid.cells());
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Frame `i` with 0 = oldest retained, `len()-1` = newest
    pub fn frame(&self, i: usize) -> &[u8] {
        debug_assert!(i < self.len);
        let start = (self.head + self.capacity - self.len + i) % self.capacity;
        &self.frames[start]
    }

    /// The state of one cell across retained generations, oldest first
    pub fn cell_states(&self, cell_index: usize) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |i| self.frame(i)[cell_index])
    }
}
