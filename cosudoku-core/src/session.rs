//! Authoritative state of one shared puzzle.
//!
//! A [`Session`] owns the current board, the immutable solution, the mask of
//! given cells, the per-cell candidate annotations and the participant list.
//! Every mutation goes through one of the edit operations below; rule
//! violations come back as an [`EditRejection`] and leave the state untouched.

use std::fmt;

use log::{debug, info};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, Digit, FixedMask, Pos};
use crate::error::{CoreError, EditRejection};
use crate::puzzle::GeneratedPuzzle;

pub type SessionId = Uuid;
pub type ParticipantId = Uuid;

/// Digits a participant has marked as possible for one cell.
/// Bit `d` is set when digit `d` (1..=9) is present.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct CandidateSet(u16);

const CANDIDATE_BITS: u16 = 0b11_1111_1110;

impl CandidateSet {
    pub const EMPTY: Self = Self(0);

    /// Builds a set from raw bits, dropping anything outside 1..=9.
    pub fn from_bits(bits: u16) -> Self { Self(bits & CANDIDATE_BITS) }
    pub fn bits(self) -> u16 { self.0 }
    pub fn contains(self, d: Digit) -> bool { is_digit(d) && self.0 & (1 << d) != 0 }
    pub fn insert(&mut self, d: Digit) { if is_digit(d) { self.0 |= 1 << d; } }
    pub fn remove(&mut self, d: Digit) { if is_digit(d) { self.0 &= !(1 << d); } }
    pub fn toggle(&mut self, d: Digit) { if is_digit(d) { self.0 ^= 1 << d; } }
    pub fn clear(&mut self) { self.0 = 0; }
    pub fn is_empty(self) -> bool { self.0 == 0 }
    pub fn len(self) -> usize { self.0.count_ones() as usize }
    pub fn iter(self) -> impl Iterator<Item = Digit> { (1..=9).filter(move |&d| self.contains(d)) }
}

impl From<u16> for CandidateSet {
    fn from(bits: u16) -> Self { Self::from_bits(bits) }
}

impl From<CandidateSet> for u16 {
    fn from(s: CandidateSet) -> Self { s.0 }
}

impl fmt::Debug for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_set().entries(self.iter()).finish() }
}

impl FromIterator<Digit> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Digit>>(iter: I) -> Self {
        let mut s = Self::EMPTY;
        for d in iter { s.insert(d); }
        s
    }
}

pub type CandidateGrid = [[CandidateSet; 9]; 9];

fn is_digit(d: Digit) -> bool { (1..=9).contains(&d) }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub hex: &'static str,
}

/// Display colors offered to participants.
pub static PALETTE: [PaletteColor; 8] = [
    PaletteColor { name: "yellow", hex: "#FFD700" },
    PaletteColor { name: "blue", hex: "#4169E1" },
    PaletteColor { name: "red", hex: "#FF4136" },
    PaletteColor { name: "green", hex: "#2ECC40" },
    PaletteColor { name: "orange", hex: "#FF851B" },
    PaletteColor { name: "purple", hex: "#B10DC9" },
    PaletteColor { name: "pink", hex: "#FF69B4" },
    PaletteColor { name: "gold", hex: "#DAA520" },
];

impl PaletteColor {
    pub fn by_name(name: &str) -> Option<&'static PaletteColor> {
        PALETTE.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> &'static PaletteColor {
        PALETTE.choose(rng).unwrap_or(&PALETTE[0])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
    pub color: String,
    /// Cell this participant last touched. Presentational only.
    #[serde(rename = "selectedCell", default, skip_serializing_if = "Option::is_none")]
    pub selected_cell: Option<Pos>,
}

impl Participant {
    pub fn new(nickname: impl Into<String>, color: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), nickname: nickname.into(), color: color.into(), selected_cell: None }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created and open for joins; nobody has edited yet.
    #[default]
    Waiting,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) board: Board,
    pub(crate) solution: Board,
    pub(crate) fixed: FixedMask,
    pub(crate) candidates: CandidateGrid,
    pub(crate) players: Vec<Participant>,
    pub(crate) status: SessionStatus,
}

impl Session {
    /// Starts a session from a puzzle. Every nonzero puzzle cell becomes a
    /// given for the life of the session.
    pub fn create(id: SessionId, puzzle: &GeneratedPuzzle, host: Participant) -> Self {
        info!("session {id} created by {} ({:?} puzzle, {} givens)", host.nickname, puzzle.origin, puzzle.puzzle.filled_count());
        Self {
            id,
            board: puzzle.puzzle,
            solution: puzzle.solution,
            fixed: puzzle.puzzle.given_mask(),
            candidates: [[CandidateSet::EMPTY; 9]; 9],
            players: vec![host],
            status: SessionStatus::Waiting,
        }
    }

    pub fn id(&self) -> SessionId { self.id }
    pub fn board(&self) -> &Board { &self.board }
    pub fn solution(&self) -> &Board { &self.solution }
    pub fn fixed(&self) -> &FixedMask { &self.fixed }
    pub fn is_fixed(&self, p: Pos) -> bool { self.fixed[p.r][p.c] }
    pub fn candidates(&self, p: Pos) -> CandidateSet { self.candidates[p.r][p.c] }
    pub fn candidate_grid(&self) -> &CandidateGrid { &self.candidates }
    pub fn players(&self) -> &[Participant] { &self.players }
    pub fn status(&self) -> SessionStatus { self.status }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Board is full and free of duplicates. Any valid completion counts,
    /// not only the stored solution.
    pub fn is_solved(&self) -> bool { self.board.is_solved() }

    pub fn matches_solution(&self) -> bool { self.board == self.solution }

    /// Writes `value` into a non-given cell (`0` clears it). Writing a digit
    /// drops the cell's candidates. Conflicting digits are accepted; use
    /// [`Board::is_legal`] or [`Board::conflict_mask`] for feedback.
    pub fn apply_cell_edit(&mut self, who: ParticipantId, pos: Pos, value: Digit) -> Result<(), EditRejection> {
        if !pos.in_bounds() { return Err(EditRejection::OutOfBounds { pos }); }
        if value > 9 { return Err(EditRejection::InvalidDigit(value)); }
        if self.is_fixed(pos) {
            debug!("{who} tried to overwrite given r{}c{}", pos.r + 1, pos.c + 1);
            return Err(EditRejection::FixedCellViolation { pos });
        }
        self.board.set(pos, value);
        if value != 0 { self.candidates[pos.r][pos.c].clear(); }
        if let Some(p) = self.players.iter_mut().find(|p| p.id == who) { p.selected_cell = Some(pos); }
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Flips `digit` in the candidates of an empty, non-given cell.
    pub fn toggle_candidate(&mut self, who: ParticipantId, pos: Pos, digit: Digit) -> Result<(), EditRejection> {
        self.check_annotatable(who, pos)?;
        if !is_digit(digit) { return Err(EditRejection::InvalidDigit(digit)); }
        self.candidates[pos.r][pos.c].toggle(digit);
        self.status = SessionStatus::Active;
        Ok(())
    }

    /// Empties the candidates of an empty, non-given cell.
    pub fn clear_candidates(&mut self, who: ParticipantId, pos: Pos) -> Result<(), EditRejection> {
        self.check_annotatable(who, pos)?;
        self.candidates[pos.r][pos.c].clear();
        self.status = SessionStatus::Active;
        Ok(())
    }

    fn check_annotatable(&self, who: ParticipantId, pos: Pos) -> Result<(), EditRejection> {
        if !pos.in_bounds() { return Err(EditRejection::OutOfBounds { pos }); }
        if self.is_fixed(pos) || self.board.get(pos) != 0 {
            debug!("{who} cannot annotate r{}c{}", pos.r + 1, pos.c + 1);
            return Err(EditRejection::NotEditable { pos });
        }
        Ok(())
    }

    /// Moves a participant's cell pointer. Returns `false` for an unknown id.
    pub fn select_cell(&mut self, who: ParticipantId, pos: Option<Pos>) -> bool {
        let pos = pos.filter(|p| p.in_bounds());
        match self.players.iter_mut().find(|p| p.id == who) {
            Some(p) => { p.selected_cell = pos; true }
            None => false,
        }
    }

    /// Appends a participant. Nicknames and colors may repeat; ids may not.
    pub fn add_participant(&mut self, participant: Participant) -> Result<(), CoreError> {
        if self.participant(participant.id).is_some() {
            return Err(CoreError::DuplicateParticipant(participant.id));
        }
        info!("{} joined session {}", participant.nickname, self.id);
        self.players.push(participant);
        Ok(())
    }

    /// Puts local invariants back after fields were replaced from outside:
    /// givens hold their original digit and filled cells carry no
    /// candidates. Returns how many givens had to be restored.
    pub(crate) fn restore_invariants(&mut self) -> usize {
        let mut restored = 0;
        for p in Pos::all() {
            if self.is_fixed(p) && self.board.get(p) != self.solution.get(p) {
                self.board.set(p, self.solution.get(p));
                restored += 1;
            }
            if self.board.get(p) != 0 { self.candidates[p.r][p.c].clear(); }
        }
        restored
    }
}

/// Picks a palette color at random for a participant who did not choose one.
pub fn random_color_hex() -> &'static str {
    let mut rng = rand::thread_rng();
    PaletteColor::random(&mut rng).hex
}
