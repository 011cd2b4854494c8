//! Replica-side synchronization.
//!
//! Each participant owns a [`Replica`] of the session. A local edit is applied
//! to the replica right away and produces an outgoing [`Snapshot`] that the
//! caller writes to the shared record. Updates coming back from the record's
//! change feed are handed to [`Replica::absorb`], which replaces the carried
//! fields wholesale.
//!
//! Convergence is last-writer-wins per snapshot. Two replicas that edit
//! different cells inside the propagation window each ship their full board;
//! whichever write reaches the record last overwrites the other edit for
//! everyone. Nothing reports that loss. Replicas that absorb the same
//! updates in the same order end up identical.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, Digit, Pos};
use crate::error::{CoreError, EditRejection};
use crate::puzzle::GeneratedPuzzle;
use crate::session::{CandidateGrid, Participant, ParticipantId, Session, SessionId, SessionStatus};
use crate::store::{SessionRecord, SessionStore};

/// Mutable session fields as exchanged between replicas. Absent fields are
/// left alone by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<Board>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidates: Option<CandidateGrid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<Participant>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

impl Snapshot {
    pub fn empty(session_id: SessionId) -> Self {
        Self { session_id, board: None, candidates: None, players: None, status: None }
    }

    /// Every mutable field of `session`.
    pub fn full(session: &Session) -> Self {
        Self {
            board: Some(*session.board()),
            candidates: Some(*session.candidate_grid()),
            players: Some(session.players().to_vec()),
            status: Some(session.status()),
            ..Self::empty(session.id())
        }
    }

    fn players_of(session: &Session) -> Self {
        Self { players: Some(session.players().to_vec()), ..Self::empty(session.id()) }
    }

    fn candidates_of(session: &Session) -> Self {
        Self {
            candidates: Some(*session.candidate_grid()),
            status: Some(session.status()),
            ..Self::empty(session.id())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_none() && self.candidates.is_none() && self.players.is_none() && self.status.is_none()
    }
}

/// One participant's local copy of a session.
#[derive(Debug, Clone)]
pub struct Replica {
    me: ParticipantId,
    session: Session,
}

impl Replica {
    /// Creates a session with `host` as its first participant and stores it.
    pub fn create<S: SessionStore + ?Sized>(store: &mut S, puzzle: &GeneratedPuzzle, host: Participant) -> Result<Self, CoreError> {
        let me = host.id;
        let session = Session::create(Uuid::new_v4(), puzzle, host);
        store.insert(SessionRecord::from(&session))?;
        Ok(Self { me, session })
    }

    /// Reads the current record, appends `participant` to its player list
    /// and writes the list back.
    pub fn join<S: SessionStore + ?Sized>(store: &mut S, id: SessionId, participant: Participant) -> Result<Self, CoreError> {
        let me = participant.id;
        let mut session = Session::from(store.fetch(id)?);
        session.add_participant(participant)?;
        store.update(&Snapshot::players_of(&session))?;
        Ok(Self { me, session })
    }

    /// Reopens a session as an existing participant.
    pub fn load<S: SessionStore + ?Sized>(store: &S, id: SessionId, me: ParticipantId) -> Result<Self, CoreError> {
        Ok(Self { me, session: Session::from(store.fetch(id)?) })
    }

    pub fn me(&self) -> ParticipantId { self.me }
    pub fn session(&self) -> &Session { &self.session }

    /// Applies a cell write locally. The snapshot carries board, candidates,
    /// players and status, since the write may clear candidates and moves
    /// the writer's pointer.
    pub fn edit_cell(&mut self, pos: Pos, value: Digit) -> Result<Snapshot, EditRejection> {
        self.session.apply_cell_edit(self.me, pos, value)?;
        Ok(Snapshot::full(&self.session))
    }

    pub fn toggle_candidate(&mut self, pos: Pos, digit: Digit) -> Result<Snapshot, EditRejection> {
        self.session.toggle_candidate(self.me, pos, digit)?;
        Ok(Snapshot::candidates_of(&self.session))
    }

    pub fn clear_candidates(&mut self, pos: Pos) -> Result<Snapshot, EditRejection> {
        self.session.clear_candidates(self.me, pos)?;
        Ok(Snapshot::candidates_of(&self.session))
    }

    /// `None` when this replica's participant is not in the session.
    pub fn select_cell(&mut self, pos: Option<Pos>) -> Option<Snapshot> {
        self.session.select_cell(self.me, pos).then(|| Snapshot::players_of(&self.session))
    }

    /// Replaces local fields with the ones carried by `snapshot`. Snapshots
    /// for another session, or whose board holds a value above 9, are
    /// ignored and `false` is returned.
    pub fn absorb(&mut self, snapshot: &Snapshot) -> bool {
        if snapshot.session_id != self.session.id {
            warn!("replica of {} ignored a snapshot for {}", self.session.id, snapshot.session_id);
            return false;
        }
        if let Some(Err(e)) = snapshot.board.map(|b| b.check_digits()) {
            warn!("replica of {} dropped a snapshot: {e}", self.session.id);
            return false;
        }
        if let Some(b) = snapshot.board { self.session.board = b; }
        if let Some(c) = snapshot.candidates { self.session.candidates = c; }
        if let Some(p) = &snapshot.players { self.session.players = p.clone(); }
        if let Some(s) = snapshot.status { self.session.status = s; }
        let restored = self.session.restore_invariants();
        if restored > 0 {
            warn!("snapshot tried to change {restored} given cell(s) of {}; kept the givens", self.session.id);
        }
        debug!("{} absorbed snapshot ({} filled)", self.me, self.session.board.filled_count());
        true
    }
}
