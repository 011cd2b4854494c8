use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use cosudoku::{logger::DevLogger, render::{render_board, render_session, RenderOptions}, simulate::{self, SimulationConfig}};
use cosudoku_core::{
    puzzle_or_generate, solver::{count_solutions, BacktrackingSolver, SolveOutcome, Solver},
    Board, EditRejection, FileStore, Participant, PaletteColor, Pos, PuzzleGenerator, Replica, Session, SessionStore,
    Snapshot, DEFAULT_CELLS_TO_REMOVE,
};
use std::{fs, path::{Path, PathBuf}};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cosudoku", version, about = "Shared Sudoku sessions from the command line")]
struct Cli {
    /// Directory holding one JSON record per session
    #[arg(long, global = true, default_value = "sessions")]
    store: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a session from a puzzle file, or a generated puzzle if none (or a malformed one) is given
    New {
        #[arg(short, long)]
        nickname: String,
        /// Palette color name (yellow, blue, red, green, orange, purple, pink, gold); random if omitted
        #[arg(short, long)]
        color: Option<String>,
        /// Puzzle file: 81 cells, 1-9 filled, anything else empty. `-` reads stdin.
        #[arg(short, long)]
        puzzle: Option<PathBuf>,
        #[arg(long)]
        seed: Option<u64>,
        /// Cells to blank when generating
        #[arg(long, default_value_t = DEFAULT_CELLS_TO_REMOVE)]
        remove: usize,
    },
    /// Join an existing session
    Join {
        session: Uuid,
        #[arg(short, long)]
        nickname: String,
        #[arg(short, long)]
        color: Option<String>,
    },
    /// Write a value (0 clears) into a cell; rows and columns count from 1
    Set {
        session: Uuid,
        #[arg(long = "as")]
        participant: Uuid,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        row: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        col: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(0..=9))]
        value: u8,
    },
    /// Toggle a candidate digit, or clear the cell's candidates when no digit is given
    Note {
        session: Uuid,
        #[arg(long = "as")]
        participant: Uuid,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        row: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        col: u8,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=9))]
        digit: Option<u8>,
    },
    /// Print a session
    Show {
        session: Uuid,
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Solve a puzzle with the backtracking solver
    Solve {
        /// Puzzle file; reads stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Report givens, conflicts and whether a puzzle has a unique solution
    Inspect {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Run several in-memory replicas against one record and report convergence
    Simulate {
        #[arg(long, default_value_t = 3)]
        players: usize,
        #[arg(long, default_value_t = 60)]
        edits: usize,
        /// 0 = every replica sees every update at once
        #[arg(long, default_value_t = 2)]
        lag: u32,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Write one journal file per step into this directory
        #[arg(long)]
        journal: Option<PathBuf>,
    },
}

fn read_text(input: Option<&Path>) -> Result<String> {
    match input {
        Some(p) if p.as_os_str() != "-" => fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
        _ => {
            use std::io::{self, Read};
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn pick_color(name: Option<&str>) -> Result<&'static str> {
    match name {
        Some(n) => match PaletteColor::by_name(n) {
            Some(c) => Ok(c.hex),
            None => bail!("unknown color {n}"),
        },
        None => Ok(cosudoku_core::session::random_color_hex()),
    }
}

fn report_rejection(e: EditRejection, color: bool) {
    let msg = format!("ignored: {e}");
    if color { eprintln!("{}", msg.yellow()); } else { eprintln!("{msg}"); }
}

fn publish(store: &mut FileStore, replica: &Replica, outcome: Result<Snapshot, EditRejection>, color: bool) -> Result<()> {
    match outcome {
        Ok(snap) => store.update(&snap).context("writing session record")?,
        Err(e) => report_rejection(e, color),
    }
    println!("{}", render_session(replica.session(), RenderOptions { color, candidates: true }));
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let color = !cli.no_color;
    if !color { colored::control::set_override(false); }
    let mut store = FileStore::new(&cli.store);

    match cli.command {
        Command::New { nickname, color: color_name, puzzle, seed, remove } => {
            let text = puzzle.as_deref().map(|p| read_text(Some(p))).transpose()?;
            let mut generator = PuzzleGenerator::new(seed).with_cells_to_remove(remove);
            let puzzle = puzzle_or_generate(text.as_deref(), &mut generator)?;
            let host = Participant::new(nickname, pick_color(color_name.as_deref())?);
            let replica = Replica::create(&mut store, &puzzle, host)?;
            println!("{}", render_session(replica.session(), RenderOptions { color, candidates: false }));
            println!("session:     {}", replica.session().id());
            println!("participant: {}", replica.me());
        }
        Command::Join { session, nickname, color: color_name } => {
            let who = Participant::new(nickname, pick_color(color_name.as_deref())?);
            let replica = Replica::join(&mut store, session, who)?;
            println!("{}", render_session(replica.session(), RenderOptions { color, candidates: true }));
            println!("participant: {}", replica.me());
        }
        Command::Set { session, participant, row, col, value } => {
            let mut replica = Replica::load(&store, session, participant)?;
            let outcome = replica.edit_cell(Pos::new(row as usize - 1, col as usize - 1), value);
            publish(&mut store, &replica, outcome, color)?;
        }
        Command::Note { session, participant, row, col, digit } => {
            let mut replica = Replica::load(&store, session, participant)?;
            let pos = Pos::new(row as usize - 1, col as usize - 1);
            let outcome = match digit {
                Some(d) => replica.toggle_candidate(pos, d),
                None => replica.clear_candidates(pos),
            };
            publish(&mut store, &replica, outcome, color)?;
        }
        Command::Show { session, json } => {
            let record = store.fetch(session)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                println!("{}", render_session(&Session::from(record), RenderOptions { color, candidates: true }));
            }
        }
        Command::Solve { input } => {
            let board = Board::parse(&read_text(input.as_deref())?).context("parse puzzle")?;
            let mut solver = BacktrackingSolver::new();
            match solver.solve(&board) {
                SolveOutcome::Solved(solved) => {
                    let stats = solver.stats();
                    println!("Solved grid:\n{}", render_board(&solved));
                    println!("{} placements, {} backtracks", stats.placements, stats.backtracks);
                }
                SolveOutcome::Exhausted => bail!("puzzle has no solution"),
            }
        }
        Command::Inspect { input } => {
            let board = Board::parse(&read_text(input.as_deref())?).context("parse puzzle")?;
            println!("{}", render_board(&board));
            println!("givens:    {}", board.filled_count());
            let mask = board.conflict_mask();
            let conflicts: Vec<String> = Pos::all()
                .filter(|p| mask[p.r][p.c])
                .map(|p| format!("r{}c{}", p.r + 1, p.c + 1))
                .collect();
            println!("conflicts: {}", if conflicts.is_empty() { "none".to_string() } else { conflicts.join(" ") });
            let verdict = match count_solutions(&board, 2) {
                0 => "no solution",
                1 => "unique solution",
                _ => "multiple solutions",
            };
            println!("solutions: {verdict}");
        }
        Command::Simulate { players, edits, lag, seed, journal } => {
            let cfg = SimulationConfig { players, edits, lag, seed, ..SimulationConfig::default() };
            let mut logger = journal.map(|dir| DevLogger::new(dir, false, color, 0)).transpose()?;
            let report = simulate::run(&cfg, logger.as_mut())?;
            println!("{}", render_session(&report.final_session, RenderOptions { color, candidates: false }));
            println!("{report}");
            if let Some(l) = &logger { println!("journal: {} entries in {}", l.count(), l.dir().display()); }
        }
    }
    Ok(())
}
