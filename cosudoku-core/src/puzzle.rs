use log::{debug, error, warn};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::board::{Board, Digit, Pos};
use crate::error::CoreError;
use crate::solver::{BacktrackingSolver, SolveOutcome, Solver};

pub const DEFAULT_CELLS_TO_REMOVE: usize = 45;

/// Where a puzzle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleOrigin {
    Generated,
    /// Author-supplied text taken as final; `solution == puzzle`.
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPuzzle {
    pub puzzle: Board,
    pub solution: Board,
    pub origin: PuzzleOrigin,
}

impl GeneratedPuzzle {
    /// Uses author text directly as both puzzle and solution. No solving and
    /// no legality checks are performed.
    pub fn from_author_text(text: &str) -> Result<Self, CoreError> {
        let board = Board::parse(text)?;
        Ok(Self { puzzle: board, solution: board, origin: PuzzleOrigin::Imported })
    }
}

pub struct PuzzleGenerator {
    rng: StdRng,
    cells_to_remove: usize,
}

impl PuzzleGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng, cells_to_remove: DEFAULT_CELLS_TO_REMOVE }
    }

    /// Sets how many cells are blanked. Values above 81 are clamped.
    pub fn with_cells_to_remove(mut self, n: usize) -> Self {
        if n > 81 { warn!("cannot remove {n} cells from an 81-cell grid; removing 81"); }
        self.cells_to_remove = n.min(81);
        self
    }

    pub fn cells_to_remove(&self) -> usize { self.cells_to_remove }

    /// Seeds the diagonal boxes, completes the grid with the backtracking
    /// solver, then blanks `cells_to_remove` random cells. The resulting
    /// puzzle is not checked for uniqueness.
    pub fn generate(&mut self) -> Result<GeneratedPuzzle, CoreError> {
        let mut seeded = Board::empty();
        self.seed_diagonal_boxes(&mut seeded);

        let mut solver = BacktrackingSolver::new();
        let solution = match solver.solve(&seeded) {
            SolveOutcome::Solved(b) => b,
            SolveOutcome::Exhausted => {
                error!("solver exhausted on a diagonal-seeded grid:\n{seeded}");
                return Err(CoreError::SolverExhausted);
            }
        };
        debug!("completed seeded grid after {} placements", solver.stats().placements);

        let puzzle = self.remove_cells(&solution);
        Ok(GeneratedPuzzle { puzzle, solution, origin: PuzzleOrigin::Generated })
    }

    // Boxes (0,0), (3,3) and (6,6) share no row, column or box, so each gets
    // an independent permutation with no legality check.
    fn seed_diagonal_boxes(&mut self, b: &mut Board) {
        for origin in [0, 3, 6] {
            let mut digits: Vec<Digit> = (1..=9).collect();
            digits.shuffle(&mut self.rng);
            for (i, d) in digits.into_iter().enumerate() {
                b.set(Pos::new(origin + i / 3, origin + i % 3), d);
            }
        }
    }

    fn remove_cells(&mut self, solution: &Board) -> Board {
        let mut puzzle = *solution;
        let mut removed = 0;
        while removed < self.cells_to_remove {
            let p = Pos::new(self.rng.gen_range(0..9), self.rng.gen_range(0..9));
            if puzzle.get(p) != 0 {
                puzzle.set(p, 0);
                removed += 1;
            }
        }
        puzzle
    }
}

/// Resolves the puzzle for a new session: non-blank author text that parses
/// is used as-is, anything else falls back to the generator.
pub fn puzzle_or_generate(text: Option<&str>, generator: &mut PuzzleGenerator) -> Result<GeneratedPuzzle, CoreError> {
    if let Some(text) = text.filter(|t| !t.trim().is_empty()) {
        match GeneratedPuzzle::from_author_text(text) {
            Ok(p) => return Ok(p),
            Err(e) => warn!("{e}; generating a puzzle instead"),
        }
    }
    generator.generate()
}
