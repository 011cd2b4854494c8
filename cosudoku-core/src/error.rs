use thiserror::Error;
use uuid::Uuid;

use crate::board::{Digit, Pos};

/// Failures surfaced to callers of the core library.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Author-supplied puzzle text did not hold exactly 81 cells after
    /// whitespace was stripped. The caller is expected to fall back to
    /// generation.
    #[error("puzzle text must have exactly 81 cells, got {len}")]
    MalformedPuzzleText { len: usize },

    /// The solver could not complete a grid it was handed. On a grid the
    /// generator seeded itself this means an internal invariant broke.
    #[error("solver exhausted every branch without completing the grid")]
    SolverExhausted,

    /// A board read from a record or a remote snapshot held a value that is
    /// neither empty nor a digit.
    #[error("cell r{}c{} holds {value}, expected 0-9", .pos.r + 1, .pos.c + 1)]
    DigitOutOfRange { pos: Pos, value: Digit },

    #[error("participant {0} is already part of the session")]
    DuplicateParticipant(Uuid),

    #[error("no session with id {0}")]
    UnknownSession(Uuid),

    #[error("a session with id {0} already exists")]
    SessionExists(Uuid),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Why a local edit was ignored. The session is never modified when one of
/// these is returned, so callers may drop it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditRejection {
    #[error("cell r{}c{} is a given and cannot be edited", .pos.r + 1, .pos.c + 1)]
    FixedCellViolation { pos: Pos },

    #[error("cell r{}c{} is filled or fixed and takes no candidates", .pos.r + 1, .pos.c + 1)]
    NotEditable { pos: Pos },

    #[error("cell r{}c{} is outside the grid", .pos.r + 1, .pos.c + 1)]
    OutOfBounds { pos: Pos },

    #[error("digit {0} is out of range")]
    InvalidDigit(Digit),
}
