use log::debug;

use crate::board::Board;
use crate::error::CoreError;

/// Result of running a [`Solver`] over a partial grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(Board),
    /// No digit admits a completion somewhere. Expected control flow for
    /// inconsistent input, not a fault.
    Exhausted,
}

impl SolveOutcome {
    pub fn into_result(self) -> Result<Board, CoreError> {
        match self {
            SolveOutcome::Solved(b) => Ok(b),
            SolveOutcome::Exhausted => Err(CoreError::SolverExhausted),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub placements: u64,
    pub backtracks: u64,
}

pub trait Solver {
    fn name(&self) -> &str;
    fn solve(&mut self, board: &Board) -> SolveOutcome;
}

/// Depth-first search over empty cells in row-major order, digits ascending.
/// Deterministic: the same input always yields the same solution.
#[derive(Debug, Default)]
pub struct BacktrackingSolver {
    stats: SearchStats,
}

impl BacktrackingSolver {
    pub fn new() -> Self { Self::default() }

    /// Counters from the most recent [`Solver::solve`] call.
    pub fn stats(&self) -> SearchStats { self.stats }
}

impl Solver for BacktrackingSolver {
    fn name(&self) -> &str { "Backtracking" }

    fn solve(&mut self, board: &Board) -> SolveOutcome {
        self.stats = SearchStats::default();
        if !board.is_valid() {
            debug!("refusing to search a grid that already has a conflict");
            return SolveOutcome::Exhausted;
        }
        let mut b = *board;
        let outcome = match search(&mut b, &mut self.stats) {
            Branch::Solved => SolveOutcome::Solved(b),
            Branch::Exhausted => SolveOutcome::Exhausted,
        };
        debug!("{} search: {} placements, {} backtracks", self.name(), self.stats.placements, self.stats.backtracks);
        outcome
    }
}

enum Branch { Solved, Exhausted }

// Place, recurse, and undo on `Exhausted`. The grid is owned by the caller
// and mutated exclusively here.
fn search(b: &mut Board, stats: &mut SearchStats) -> Branch {
    let Some(p) = b.first_empty() else { return Branch::Solved };
    for d in 1..=9 {
        if !b.is_legal(p, d) { continue; }
        b.set(p, d);
        stats.placements += 1;
        match search(b, stats) {
            Branch::Solved => return Branch::Solved,
            Branch::Exhausted => {
                b.set(p, 0);
                stats.backtracks += 1;
            }
        }
    }
    Branch::Exhausted
}

/// Counts completions of `board`, stopping once `limit` is reached.
/// Useful for checking whether a puzzle is unique (`limit = 2`).
pub fn count_solutions(board: &Board, limit: usize) -> usize {
    fn backtrack(b: &mut Board, count: &mut usize, limit: usize) {
        if *count >= limit { return; }
        let Some(p) = b.first_empty() else { *count += 1; return; };
        for d in 1..=9 {
            if b.is_legal(p, d) {
                b.set(p, d);
                backtrack(b, count, limit);
                b.set(p, 0);
                if *count >= limit { return; }
            }
        }
    }
    if !board.is_valid() { return 0; }
    let mut b = *board;
    let mut count = 0;
    backtrack(&mut b, &mut count, limit);
    count
}

/// Convenience wrapper: solve with a fresh [`BacktrackingSolver`].
pub fn solve(board: &Board) -> Result<Board, CoreError> {
    BacktrackingSolver::new().solve(board).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Pos;

    const EASY: &str = "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";

    #[test]
    fn empty_grid_is_filled_with_a_valid_solution() {
        let solved = solve(&Board::empty()).unwrap();
        assert!(solved.is_solved());
        // ascending digits on the first row of an empty grid
        assert_eq!(solved.cells[0], [1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn solution_keeps_the_givens() {
        let puzzle = Board::parse(EASY).unwrap();
        let solved = solve(&puzzle).unwrap();
        assert!(solved.is_solved());
        for p in Pos::all() {
            if puzzle.get(p) != 0 { assert_eq!(solved.get(p), puzzle.get(p)); }
        }
    }

    #[test]
    fn unsatisfiable_grid_is_exhausted() {
        // r0c8 needs a 9 but column 8 already holds one further down.
        let mut b = Board::empty();
        b.cells[0] = [1, 2, 3, 4, 5, 6, 7, 8, 0];
        b.cells[5][8] = 9;
        let mut solver = BacktrackingSolver::new();
        assert_eq!(solver.solve(&b), SolveOutcome::Exhausted);
        assert!(matches!(solve(&b), Err(CoreError::SolverExhausted)));
    }

    #[test]
    fn conflicting_grid_is_exhausted_without_search() {
        let mut b = Board::empty();
        b.cells[0][0] = 4;
        b.cells[0][1] = 4;
        let mut solver = BacktrackingSolver::new();
        assert_eq!(solver.solve(&b), SolveOutcome::Exhausted);
        assert_eq!(solver.stats().placements, 0);
    }

    #[test]
    fn stats_count_work() {
        let mut solver = BacktrackingSolver::new();
        let _ = solver.solve(&Board::parse(EASY).unwrap());
        assert!(solver.stats().placements >= 51);
    }

    #[test]
    fn classic_puzzle_is_unique() {
        let puzzle = Board::parse(EASY).unwrap();
        assert_eq!(count_solutions(&puzzle, 2), 1);
        assert_eq!(count_solutions(&Board::empty(), 2), 2);
    }
}
