//! Several replicas of one session editing through an in-memory record.
//!
//! Every replica writes its outgoing snapshots to a shared [`MemoryStore`] and
//! reads the store's change feed, but only catches up now and then when `lag`
//! is nonzero. Once the edits are done every feed is drained and the replicas
//! are compared with each other and with the stored record. Writes whose value
//! did not survive are counted as overwritten.

use anyhow::Result;
use cosudoku_core::{
    Digit, MemoryStore, Participant, Pos, PuzzleGenerator, Replica, Session, SessionId, SessionStore,
    Snapshot, PALETTE,
};
use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{collections::HashMap, fmt, sync::mpsc::Receiver};

use crate::logger::DevLogger;
use crate::render::render_board;

#[derive(Clone, Copy, Debug)]
pub struct SimulationConfig {
    pub players: usize,
    pub edits: usize,
    /// 0 delivers every update to every replica immediately; `n` gives each
    /// replica a 1-in-(n+1) chance per step to catch up.
    pub lag: u32,
    pub seed: u64,
    pub cells_to_remove: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { players: 3, edits: 60, lag: 2, seed: 1, cells_to_remove: cosudoku_core::DEFAULT_CELLS_TO_REMOVE }
    }
}

#[derive(Debug)]
pub struct SimulationReport {
    pub session_id: SessionId,
    pub replicas: usize,
    pub writes: usize,
    pub notes: usize,
    pub rejected: usize,
    pub overwritten: usize,
    pub converged: bool,
    pub final_session: Session,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "session      {}", self.session_id)?;
        writeln!(f, "replicas     {}", self.replicas)?;
        writeln!(f, "cell writes  {}", self.writes)?;
        writeln!(f, "notes        {}", self.notes)?;
        writeln!(f, "rejected     {}", self.rejected)?;
        writeln!(f, "overwritten  {}", self.overwritten)?;
        write!(f, "converged    {}", if self.converged { "yes" } else { "NO" })
    }
}

struct Peer {
    replica: Replica,
    feed: Receiver<Snapshot>,
}

impl Peer {
    fn catch_up(&mut self) -> usize {
        let mut n = 0;
        while let Ok(s) = self.feed.try_recv() {
            self.replica.absorb(&s);
            n += 1;
        }
        n
    }
}

pub fn run(cfg: &SimulationConfig, mut journal: Option<&mut DevLogger>) -> Result<SimulationReport> {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut store = MemoryStore::new();
    let puzzle = PuzzleGenerator::new(Some(cfg.seed)).with_cells_to_remove(cfg.cells_to_remove).generate()?;

    let mut peers: Vec<Peer> = Vec::with_capacity(cfg.players.max(1));
    for i in 0..cfg.players.max(1) {
        let color = PALETTE[i % PALETTE.len()];
        let who = Participant::new(format!("{}-{}", color.name, i + 1), color.hex);
        let replica = match peers.first() {
            None => Replica::create(&mut store, &puzzle, who)?,
            Some(host) => Replica::join(&mut store, host.replica.session().id(), who)?,
        };
        let feed = store.subscribe(replica.session().id());
        peers.push(Peer { replica, feed });
    }
    let session_id = peers[0].replica.session().id();

    let open: Vec<Pos> = Pos::all().filter(|&p| puzzle.puzzle.get(p) == 0).collect();
    let mut intended: HashMap<Pos, Digit> = HashMap::new();
    let (mut writes, mut notes, mut rejected) = (0, 0, 0);

    for step in 0..cfg.edits {
        if open.is_empty() { break; }
        let i = rng.gen_range(0..peers.len());
        let pos = open[rng.gen_range(0..open.len())];
        let peer = &mut peers[i];
        let nickname = peer.replica.session().participant(peer.replica.me()).map(|p| p.nickname.clone()).unwrap_or_default();

        let (action, outcome) = if rng.gen_bool(0.25) {
            let d = rng.gen_range(1..=9);
            (format!("toggles candidate {d}"), peer.replica.toggle_candidate(pos, d))
        } else {
            let v = if rng.gen_bool(0.8) { puzzle.solution.get(pos) } else { rng.gen_range(0..=9) };
            (format!("writes {v}"), peer.replica.edit_cell(pos, v).map(|s| { intended.insert(pos, v); s }))
        };
        let title = format!("step {}: {nickname} {action} at r{}c{}", step + 1, pos.r + 1, pos.c + 1);
        match outcome {
            Ok(snap) => {
                if snap.board.is_some() { writes += 1 } else { notes += 1 }
                store.update(&snap)?;
            }
            Err(e) => {
                rejected += 1;
                debug!("{title}: {e}");
            }
        }
        if let Some(j) = journal.as_deref_mut() {
            j.log(&title, &render_board(peers[i].replica.session().board()))?;
        }

        for peer in &mut peers {
            if cfg.lag == 0 || rng.gen_ratio(1, cfg.lag + 1) { peer.catch_up(); }
        }
    }
    for peer in &mut peers { peer.catch_up(); }

    let stored = Session::from(store.fetch(session_id)?);
    let converged = peers.iter().all(|p| p.replica.session() == &stored);
    let overwritten = intended.iter().filter(|(&p, &v)| stored.board().get(p) != v).count();
    if let Some(j) = journal.as_deref_mut() {
        j.log("final record", &render_board(stored.board()))?;
    }

    Ok(SimulationReport {
        session_id,
        replicas: peers.len(),
        writes,
        notes,
        rejected,
        overwritten,
        converged,
        final_session: stored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_delivery_loses_nothing() {
        let cfg = SimulationConfig { lag: 0, edits: 80, ..SimulationConfig::default() };
        let report = run(&cfg, None).unwrap();
        assert!(report.converged);
        assert_eq!(report.overwritten, 0);
        assert_eq!(report.writes + report.notes + report.rejected, 80);
    }

    #[test]
    fn lagging_replicas_still_converge() {
        for seed in 0..5 {
            let cfg = SimulationConfig { lag: 4, seed, players: 4, ..SimulationConfig::default() };
            assert!(run(&cfg, None).unwrap().converged, "seed {seed}");
        }
    }

    #[test]
    fn single_player_is_fine() {
        let cfg = SimulationConfig { players: 1, lag: 3, ..SimulationConfig::default() };
        let report = run(&cfg, None).unwrap();
        assert_eq!(report.replicas, 1);
        assert!(report.converged);
        assert_eq!(report.overwritten, 0);
    }
}
