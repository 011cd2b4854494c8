use colored::{ColoredString, Colorize};
use cosudoku_core::{Board, Participant, Pos, Session};
use itertools::Itertools;

#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    pub color: bool,
    pub candidates: bool,
}

impl Default for RenderOptions {
    fn default() -> Self { Self { color: true, candidates: true } }
}

const BAND: &str = "+-------+-------+-------+\n";

/// Plain boxed grid, `·` for empty cells.
pub fn render_board(board: &Board) -> String {
    grid_with(|p| {
        let d = board.get(p);
        (if d == 0 { '·' } else { char::from(b'0' + d) }).to_string()
    })
}

/// Boxed grid of a session: givens bold, conflicting digits red, cells that
/// a participant points at underlined. Followed by the participant list and,
/// optionally, the candidate annotations.
pub fn render_session(session: &Session, opts: RenderOptions) -> String {
    let board = session.board();
    let conflicts = board.conflict_mask();
    let pointed: Vec<Pos> = session.players().iter().filter_map(|p| p.selected_cell).collect();
    let mut s = grid_with(|p| {
        let d = board.get(p);
        let ch = if d == 0 { '·' } else { char::from(b'0' + d) };
        if !opts.color { return ch.to_string(); }
        let mut cell: ColoredString = ch.to_string().normal();
        if session.is_fixed(p) { cell = cell.bold().cyan(); }
        if conflicts[p.r][p.c] { cell = cell.red(); }
        if pointed.contains(&p) { cell = cell.underline(); }
        cell.to_string()
    });

    s.push_str(&format!("\nSession {} ({:?})\n", session.id(), session.status()));
    for p in session.players() { s.push_str(&render_participant(p, opts.color)); s.push('\n'); }

    if opts.candidates {
        let notes = render_candidates(session);
        if !notes.is_empty() { s.push_str("\nCandidates:\n"); s.push_str(&notes); }
    }
    if board.is_solved() { s.push_str(&if opts.color { "\nSolved!\n".green().bold().to_string() } else { "\nSolved!\n".into() }); }
    s
}

pub fn render_participant(p: &Participant, color: bool) -> String {
    let dot = match (color, parse_hex(&p.color)) {
        (true, Some((r, g, b))) => "●".truecolor(r, g, b).to_string(),
        _ => "●".to_string(),
    };
    let at = p.selected_cell.map(|c| format!(" @ r{}c{}", c.r + 1, c.c + 1)).unwrap_or_default();
    format!("{dot} {} [{}]{at}", p.nickname, p.id)
}

/// One line per annotated cell: `r1c3: 2 7`.
pub fn render_candidates(session: &Session) -> String {
    Pos::all()
        .filter(|&p| !session.candidates(p).is_empty())
        .map(|p| format!("r{}c{}: {}\n", p.r + 1, p.c + 1, session.candidates(p).iter().join(" ")))
        .collect()
}

fn grid_with(mut cell: impl FnMut(Pos) -> String) -> String {
    let mut s = String::new();
    for r in 0..9 {
        if r%3==0 { s.push_str(BAND); }
        for c in 0..9 {
            if c%3==0 { s.push('|'); s.push(' '); }
            s.push_str(&cell(Pos::new(r, c)));
            s.push(' ');
        }
        s.push('|'); s.push('\n');
    }
    s.push_str(BAND);
    s
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let h = hex.strip_prefix('#')?;
    if h.len() != 6 { return None; }
    let byte = |i: usize| u8::from_str_radix(h.get(i..i + 2)?, 16).ok();
    Some((byte(0)?, byte(2)?, byte(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex("#FFD700"), Some((255, 215, 0)));
        assert_eq!(parse_hex("FFD700"), None);
        assert_eq!(parse_hex("#FFD7"), None);
        assert_eq!(parse_hex("#GGGGGG"), None);
    }

    #[test]
    fn plain_board_has_bands_and_dots() {
        let out = render_board(&Board::empty());
        assert_eq!(out.lines().count(), 13);
        assert_eq!(out.matches('·').count(), 81);
    }
}
