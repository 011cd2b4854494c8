use cosudoku_core::{
    board::{Board, Pos},
    puzzle::{GeneratedPuzzle, PuzzleGenerator},
    session::{Participant, Session},
    solver::{self, count_solutions},
    store::{MemoryStore, SessionStore},
    sync::{Replica, Snapshot},
    CoreError, EditRejection,
};
use pretty_assertions::assert_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

fn easy_puzzle() -> &'static str {
    // Known easy puzzle; zeros for blanks
    "530070000\n600195000\n098000060\n800060003\n400803001\n700020006\n060000280\n000419005\n000080079"
}

#[test]
fn validator_matches_brute_force_on_solutions() {
    for seed in 0..5 {
        let solution = PuzzleGenerator::new(Some(seed)).generate().unwrap().solution;
        for p in Pos::all() {
            let mut holed = solution;
            holed.set(p, 0);
            for d in 1..=9 {
                let dup = (0..9).any(|i| holed.get(Pos::new(p.r, i)) == d || holed.get(Pos::new(i, p.c)) == d)
                    || (0..9).any(|i| holed.get(Pos::new(p.box_origin().r + i / 3, p.box_origin().c + i % 3)) == d);
                assert_eq!(holed.is_legal(p, d), !dup, "seed {seed} cell {p:?} digit {d}");
            }
        }
    }
}

#[test]
fn solver_completes_partial_grids() {
    let puzzle = Board::parse(easy_puzzle()).unwrap();
    let solved = solver::solve(&puzzle).unwrap();
    assert!(solved.is_solved());
    assert_eq!(solved.to_compact(), "534678912672195348198342567859761423426853791713924856961537284287419635345286179");

    // strip a generated solution down to its first three rows and re-solve
    let full = PuzzleGenerator::new(Some(8)).generate().unwrap().solution;
    let mut partial = Board::empty();
    for r in 0..3 { partial.cells[r] = full.cells[r]; }
    let again = solver::solve(&partial).unwrap();
    assert!(again.is_solved());
    assert_eq!(again.cells[..3], full.cells[..3]);
}

#[test]
fn generator_shape_holds_for_many_seeds() {
    for seed in 0..20 {
        let out = PuzzleGenerator::new(Some(seed)).generate().unwrap();
        assert!(out.solution.is_solved());
        assert_eq!(out.puzzle.filled_count(), 81 - 45);
        for p in Pos::all() {
            let v = out.puzzle.get(p);
            assert!(v == 0 || v == out.solution.get(p));
        }
        // removal never checks uniqueness, but the stored solution always completes the puzzle
        assert!(count_solutions(&out.puzzle, 2) >= 1);
    }
}

#[test]
fn import_scenario_is_taken_verbatim() {
    let out = GeneratedPuzzle::from_author_text(easy_puzzle()).unwrap();
    assert_eq!(out.puzzle.cells[0][0], 5);
    assert_eq!(out.puzzle.cells[0][1], 3);
    assert_eq!(out.puzzle.cells[0][2], 0);
    assert_eq!(out.puzzle, out.solution);
}

#[test]
fn import_round_trip_substitutes_dots() {
    let text = "53..7....6..195....98....6.8...6...34..8.3..17...2...6.6....28....419..5....8..79";
    assert_eq!(Board::parse(text).unwrap().to_compact(), text);
    // three cells short
    let short = "530070000600195000098000060800060003400803001700020006060000280000419005000080";
    assert!(matches!(Board::parse(short), Err(CoreError::MalformedPuzzleText { len: 78 })));
}

#[test]
fn imported_grids_are_not_validated() {
    let nonsense = "11".repeat(40) + "1";
    let out = GeneratedPuzzle::from_author_text(&nonsense).unwrap();
    assert!(!out.puzzle.is_valid());
    assert_eq!(out.solution, out.puzzle);
}

#[test]
fn candidate_then_value_scenario() {
    let puzzle = GeneratedPuzzle::from_author_text(easy_puzzle()).unwrap();
    let a = Participant::new("A", "#FFD700");
    let b = Participant::new("B", "#4169E1");
    let (a_id, b_id) = (a.id, b.id);
    let mut s = Session::create(Uuid::new_v4(), &puzzle, a);
    s.add_participant(b).unwrap();
    s.toggle_candidate(a_id, Pos::new(0, 2), 7).unwrap();
    s.apply_cell_edit(b_id, Pos::new(0, 2), 4).unwrap();
    assert!(s.candidates(Pos::new(0, 2)).is_empty());
    assert_eq!(s.board().get(Pos::new(0, 2)), 4);
}

#[test]
fn random_operations_keep_givens_and_exclusivity() {
    let mut rng = StdRng::seed_from_u64(2024);
    let puzzle = PuzzleGenerator::new(Some(77)).generate().unwrap();
    let host = Participant::new("host", "#FFD700");
    let ids: Vec<Uuid> = std::iter::once(host.id).chain((0..3).map(|_| Uuid::new_v4())).collect();
    let mut s = Session::create(Uuid::new_v4(), &puzzle, host);
    for &id in &ids[1..] { s.add_participant(Participant { id, ..Participant::new("guest", "#FF4136") }).unwrap(); }

    for _ in 0..5_000 {
        let who = ids[rng.gen_range(0..ids.len())];
        let p = Pos::new(rng.gen_range(0..9), rng.gen_range(0..9));
        let d = rng.gen_range(0..=9);
        match rng.gen_range(0..3) {
            0 => match s.apply_cell_edit(who, p, d) {
                Err(EditRejection::FixedCellViolation { pos }) => assert!(s.is_fixed(pos)),
                other => other.unwrap(),
            },
            1 => { let _ = s.toggle_candidate(who, p, d); }
            _ => { let _ = s.clear_candidates(who, p); }
        }
        for q in Pos::all() {
            if s.is_fixed(q) { assert_eq!(s.board().get(q), puzzle.puzzle.get(q)); }
            if s.board().get(q) != 0 { assert!(s.candidates(q).is_empty()); }
        }
    }
}

#[test]
fn replicas_converge_after_draining_the_feed() {
    let mut store = MemoryStore::new();
    let puzzle = PuzzleGenerator::new(Some(4)).generate().unwrap();
    let mut a = Replica::create(&mut store, &puzzle, Participant::new("A", "#FFD700")).unwrap();
    let id = a.session().id();
    let rx_a = store.subscribe(id);
    let mut b = Replica::join(&mut store, id, Participant::new("B", "#4169E1")).unwrap();
    let rx_b = store.subscribe(id);

    let empties: Vec<Pos> = Pos::all().filter(|&p| puzzle.puzzle.get(p) == 0).collect();
    let mut rng = StdRng::seed_from_u64(9);
    for step in 0..40 {
        let p = empties[rng.gen_range(0..empties.len())];
        let replica = if step % 2 == 0 { &mut a } else { &mut b };
        let snap = if step % 3 == 0 {
            replica.toggle_candidate(p, rng.gen_range(1..=9))
        } else {
            replica.edit_cell(p, rng.gen_range(0..=9))
        };
        if let Ok(snap) = snap { store.update(&snap).unwrap(); }
        // B lags behind: it only catches up every fifth step
        while let Ok(s) = rx_a.try_recv() { a.absorb(&s); }
        if step % 5 == 4 { while let Ok(s) = rx_b.try_recv() { b.absorb(&s); } }
    }
    while let Ok(s) = rx_a.try_recv() { a.absorb(&s); }
    while let Ok(s) = rx_b.try_recv() { b.absorb(&s); }

    assert_eq!(a.session(), b.session());
    let stored = Session::from(store.fetch(id).unwrap());
    assert_eq!(&stored, a.session());
}

#[test]
fn stale_snapshot_silently_overwrites_a_concurrent_edit() {
    let mut store = MemoryStore::new();
    let puzzle = GeneratedPuzzle::from_author_text(easy_puzzle()).unwrap();
    let mut a = Replica::create(&mut store, &puzzle, Participant::new("A", "#FFD700")).unwrap();
    let id = a.session().id();
    let mut b = Replica::join(&mut store, id, Participant::new("B", "#4169E1")).unwrap();
    let feed = [store.subscribe(id), store.subscribe(id)];

    // both edit different cells before hearing from each other
    let from_a = a.edit_cell(Pos::new(0, 2), 4).unwrap();
    let from_b = b.edit_cell(Pos::new(0, 3), 6).unwrap();
    store.update(&from_a).unwrap();
    store.update(&from_b).unwrap();

    for (replica, rx) in [&mut a, &mut b].into_iter().zip(&feed) {
        while let Ok(s) = rx.try_recv() { replica.absorb(&s); }
    }
    assert_eq!(a.session(), b.session());
    assert_eq!(a.session().board().get(Pos::new(0, 3)), 6);
    // A's write is gone for everyone, including A
    assert_eq!(a.session().board().get(Pos::new(0, 2)), 0);
    assert_eq!(store.fetch(id).unwrap().board.get(Pos::new(0, 2)), 0);
}

#[test]
fn snapshots_survive_json() {
    let puzzle = GeneratedPuzzle::from_author_text(easy_puzzle()).unwrap();
    let mut store = MemoryStore::new();
    let mut a = Replica::create(&mut store, &puzzle, Participant::new("A", "#FFD700")).unwrap();
    a.toggle_candidate(Pos::new(0, 2), 1).unwrap();
    let snap = a.edit_cell(Pos::new(1, 1), 7).unwrap();
    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("\"selectedCell\":{\"row\":1,\"col\":1}"));
    let back: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
