use crate::cue::Cue;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: usize = 8;
pub const DEFAULT_HEIGHT: usize = 8;
pub const DEFAULT_DISTRACTORS: usize = 5;

/// Dimensions and distractor density of a stimulus grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    /// Placements of each distractor kind. Collisions overwrite, so the
    /// realised count can be lower.
    pub distractor_count: usize,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            distractor_count: DEFAULT_DISTRACTORS,
        }
    }
}

impl GridSpec {
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Fixed-size 2D array of cues, column-major like the original `[x][y]` layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cue>,
}

impl Grid {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cue::None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Cue> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[x * self.height + y])
    }

    /// Overwrites whatever was at `(x, y)`. Out-of-range writes are dropped.
    pub fn set(&mut self, x: usize, y: usize, cue: Cue) {
        if x < self.width && y < self.height {
            self.cells[x * self.height + y] = cue;
        }
    }

    /// All cells as `(x, y, cue)`
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Cue)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cue)| (i / self.height, i % self.height, *cue))
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.cells.iter().filter(|c| **c == cue).count()
    }

    pub fn target(&self) -> Option<(usize, usize)> {
        self.cells()
            .find(|(_, _, cue)| cue.is_target())
            .map(|(x, y, _)| (x, y))
    }

    pub fn has_target(&self) -> bool {
        self.target().is_some()
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> (usize, usize) {
        (
            rng.random_range(0..self.width),
            rng.random_range(0..self.height),
        )
    }
}

/// Builds a stimulus grid and its ground-truth answer.
///
/// Each round places one horizontal then one vertical distractor at
/// independent uniform cells; later writes overwrite earlier ones. The target,
/// when requested, goes last and overwrites whatever it lands on. The returned
/// answer is `place_target` itself, decided before any cell is drawn.
pub fn generate<R: Rng + ?Sized>(spec: &GridSpec, place_target: bool, rng: &mut R) -> (Grid, bool) {
    let mut grid = Grid::empty(spec.width, spec.height);
    if spec.cell_count() == 0 {
        return (grid, place_target);
    }

    for _ in 0..spec.distractor_count {
        let (x, y) = grid.pick(rng);
        grid.set(x, y, Cue::HorizontalDistractor);
        let (x, y) = grid.pick(rng);
        grid.set(x, y, Cue::VerticalDistractor);
    }

    if place_target {
        let (x, y) = grid.pick(rng);
        grid.set(x, y, Cue::VerticalTarget);
    }

    (grid, place_target)
}
