//! The persisted session record and the stores that hold it.
//!
//! A store keeps one [`SessionRecord`] per session id. Updates arrive as
//! [`Snapshot`]s and overwrite every field they carry, whole, with no merging:
//! whichever write lands last wins. [`MemoryStore`] also fans every accepted
//! update out to its subscribers; [`FileStore`] keeps one JSON file per
//! session and has no change feed.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::board::{Board, FixedMask};
use crate::error::CoreError;
use crate::session::{CandidateGrid, Participant, Session, SessionId, SessionStatus};
use crate::sync::Snapshot;

/// One row of the shared record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub board: Board,
    pub solution: Board,
    /// Given-cell mask.
    pub initial_board: FixedMask,
    #[serde(default)]
    pub players: Vec<Participant>,
    #[serde(default)]
    pub candidates: CandidateGrid,
    #[serde(default)]
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Overwrites every field present in `snapshot`.
    pub fn apply(&mut self, snapshot: &Snapshot) {
        if let Some(b) = snapshot.board { self.board = b; }
        if let Some(c) = snapshot.candidates { self.candidates = c; }
        if let Some(p) = &snapshot.players { self.players = p.clone(); }
        if let Some(s) = snapshot.status { self.status = s; }
    }
}

impl From<&Session> for SessionRecord {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            board: s.board,
            solution: s.solution,
            initial_board: s.fixed,
            players: s.players.clone(),
            candidates: s.candidates,
            status: s.status,
        }
    }
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        let mut s = Session {
            id: r.id,
            board: r.board,
            solution: r.solution,
            fixed: r.initial_board,
            candidates: r.candidates,
            players: r.players,
            status: r.status,
        };
        s.restore_invariants();
        s
    }
}

/// The persisted record, keyed by session id.
pub trait SessionStore {
    fn insert(&mut self, record: SessionRecord) -> Result<(), CoreError>;
    fn fetch(&self, id: SessionId) -> Result<SessionRecord, CoreError>;
    /// Replaces the fields carried by `snapshot` on the matching row.
    fn update(&mut self, snapshot: &Snapshot) -> Result<(), CoreError>;
}

/// In-process record with a change feed.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: HashMap<SessionId, SessionRecord>,
    subscribers: HashMap<SessionId, Vec<Sender<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Every update accepted for `id` from now on is delivered on the
    /// returned receiver, in the order the store accepted them.
    pub fn subscribe(&mut self, id: SessionId) -> Receiver<Snapshot> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.entry(id).or_default().push(tx);
        rx
    }

    pub fn subscriber_count(&self, id: SessionId) -> usize {
        self.subscribers.get(&id).map_or(0, Vec::len)
    }

    fn notify(&mut self, snapshot: &Snapshot) {
        if let Some(subs) = self.subscribers.get_mut(&snapshot.session_id) {
            // dropped receivers go away here
            subs.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

impl SessionStore for MemoryStore {
    fn insert(&mut self, record: SessionRecord) -> Result<(), CoreError> {
        if self.rows.contains_key(&record.id) { return Err(CoreError::SessionExists(record.id)); }
        self.rows.insert(record.id, record);
        Ok(())
    }

    fn fetch(&self, id: SessionId) -> Result<SessionRecord, CoreError> {
        self.rows.get(&id).cloned().ok_or(CoreError::UnknownSession(id))
    }

    fn update(&mut self, snapshot: &Snapshot) -> Result<(), CoreError> {
        let row = self.rows.get_mut(&snapshot.session_id).ok_or(CoreError::UnknownSession(snapshot.session_id))?;
        row.apply(snapshot);
        self.notify(snapshot);
        Ok(())
    }
}

/// One pretty-printed JSON file per session under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, id: SessionId) -> PathBuf { self.dir.join(format!("{id}.json")) }

    fn save(&self, record: &SessionRecord) -> Result<(), CoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.path_for(record.id), json)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn insert(&mut self, record: SessionRecord) -> Result<(), CoreError> {
        if self.path_for(record.id).exists() { return Err(CoreError::SessionExists(record.id)); }
        self.save(&record)?;
        info!("stored session {} in {}", record.id, self.dir.display());
        Ok(())
    }

    fn fetch(&self, id: SessionId) -> Result<SessionRecord, CoreError> {
        let text = match fs::read_to_string(self.path_for(id)) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(CoreError::UnknownSession(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn update(&mut self, snapshot: &Snapshot) -> Result<(), CoreError> {
        let mut record = self.fetch(snapshot.session_id)?;
        record.apply(snapshot);
        self.save(&record)?;
        debug!("rewrote {}", self.path_for(snapshot.session_id).display());
        Ok(())
    }
}
