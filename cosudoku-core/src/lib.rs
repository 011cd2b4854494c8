//! Puzzle engine and replica synchronization for shared Sudoku sessions.

pub mod board;
pub mod error;
pub mod puzzle;
pub mod session;
pub mod solver;
pub mod store;
pub mod sync;

pub use board::{Board, Digit, FixedMask, Pos};
pub use error::{CoreError, EditRejection};
pub use puzzle::{puzzle_or_generate, GeneratedPuzzle, PuzzleGenerator, PuzzleOrigin, DEFAULT_CELLS_TO_REMOVE};
pub use session::{CandidateGrid, CandidateSet, PaletteColor, Participant, ParticipantId, Session, SessionId, SessionStatus, PALETTE};
pub use solver::{BacktrackingSolver, SolveOutcome, Solver};
pub use store::{FileStore, MemoryStore, SessionRecord, SessionStore};
pub use sync::{Replica, Snapshot};
