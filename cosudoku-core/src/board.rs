use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

use crate::error::CoreError;

pub type Digit = u8; // 0 = empty; 1..=9 digits

/// Row/column coordinate of a cell. Serialized as `{ "row": .., "col": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    #[serde(rename = "row")]
    pub r: usize,
    #[serde(rename = "col")]
    pub c: usize,
}

impl Pos {
    pub const fn new(r: usize, c: usize) -> Self { Self { r, c } }
    pub fn idx(self) -> usize { self.r * 9 + self.c }
    pub fn from_idx(i: usize) -> Self { Self { r: i / 9, c: i % 9 } }
    pub fn in_bounds(self) -> bool { self.r < 9 && self.c < 9 }
    /// Top-left cell of the box holding `self`.
    pub fn box_origin(self) -> Self { Self { r: self.r - self.r % 3, c: self.c - self.c % 3 } }
    pub fn all() -> impl Iterator<Item = Pos> { (0..81).map(Pos::from_idx) }
}

/// 9×9 flags; `true` marks a given cell.
pub type FixedMask = [[bool; 9]; 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[[Digit; 9]; 9]", into = "[[Digit; 9]; 9]")]
pub struct Board {
    pub cells: [[Digit; 9]; 9],
}

impl Default for Board {
    fn default() -> Self { Self::empty() }
}

impl TryFrom<[[Digit; 9]; 9]> for Board {
    type Error = CoreError;

    fn try_from(cells: [[Digit; 9]; 9]) -> Result<Self, CoreError> {
        let b = Self { cells };
        b.check_digits()?;
        Ok(b)
    }
}

impl From<Board> for [[Digit; 9]; 9] {
    fn from(b: Board) -> Self { b.cells }
}

impl Board {
    pub const fn empty() -> Self { Self { cells: [[0; 9]; 9] } }

    pub fn from_rows(rows: [[Digit; 9]; 9]) -> Self { Self { cells: rows } }

    /// Reads the puzzle text import format: whitespace is stripped, exactly 81
    /// characters must remain, `1`-`9` fill a cell and anything else leaves it
    /// empty. Cells are taken in row-major order.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let chars: Vec<char> = text.chars().filter(|ch| !ch.is_whitespace()).collect();
        if chars.len() != 81 {
            return Err(CoreError::MalformedPuzzleText { len: chars.len() });
        }
        let mut b = Self::empty();
        for (i, ch) in chars.into_iter().enumerate() {
            let v = match ch { '1'..='9' => ch as u8 - b'0', _ => 0 };
            let p = Pos::from_idx(i);
            b.cells[p.r][p.c] = v;
        }
        Ok(b)
    }

    /// Row-major 81-char form with `.` for empty cells.
    pub fn to_compact(&self) -> String {
        self.cells.iter().flatten().map(|&d| if d == 0 { '.' } else { char::from(b'0' + d) }).collect()
    }

    /// Fails on the first cell (row-major) holding something above 9.
    pub fn check_digits(&self) -> Result<(), CoreError> {
        match Pos::all().find(|&p| self.get(p) > 9) {
            Some(pos) => Err(CoreError::DigitOutOfRange { pos, value: self.get(pos) }),
            None => Ok(()),
        }
    }

    pub fn get(&self, p: Pos) -> Digit { self.cells[p.r][p.c] }
    pub fn set(&mut self, p: Pos, d: Digit) { self.cells[p.r][p.c] = d; }

    /// Would `d` be legal at `p` given the rest of the grid? The cell's own
    /// content is scanned like any other, so a cell already holding `d`
    /// reports `false`.
    pub fn is_legal(&self, p: Pos, d: Digit) -> bool {
        for i in 0..9 {
            if self.cells[p.r][i] == d || self.cells[i][p.c] == d { return false; }
        }
        let o = p.box_origin();
        for r in o.r..o.r + 3 {
            for c in o.c..o.c + 3 {
                if self.cells[r][c] == d { return false; }
            }
        }
        true
    }

    /// First empty cell in row-major order.
    pub fn first_empty(&self) -> Option<Pos> { Pos::all().find(|&p| self.get(p) == 0) }

    pub fn filled_count(&self) -> usize { self.cells.iter().flatten().filter(|&&d| d != 0).count() }

    pub fn is_complete(&self) -> bool { self.cells.iter().all(|row| row.iter().all(|&d| d != 0)) }

    /// No row, column or box holds the same nonzero digit twice.
    pub fn is_valid(&self) -> bool {
        for r in 0..9 { if !no_dupes(self.row_values(r)) { return false; } }
        for c in 0..9 { if !no_dupes(self.col_values(c)) { return false; } }
        for br in 0..3 { for bc in 0..3 { if !no_dupes(self.box_values(br, bc)) { return false; } }}
        true
    }

    pub fn is_solved(&self) -> bool { self.is_complete() && self.is_valid() }

    /// Mask of nonzero cells, i.e. the givens when `self` is a fresh puzzle.
    pub fn given_mask(&self) -> FixedMask {
        let mut mask = [[false; 9]; 9];
        for p in Pos::all() { mask[p.r][p.c] = self.get(p) != 0; }
        mask
    }

    pub fn row_values(&self, r: usize) -> [Digit; 9] { self.cells[r] }
    pub fn col_values(&self, c: usize) -> [Digit; 9] { let mut a=[0;9]; for r in 0..9 { a[r]=self.cells[r][c]; } a }
    pub fn box_values(&self, br: usize, bc: usize) -> [Digit; 9] {
        let mut a=[0;9];
        let mut i=0;
        for r in br*3..br*3+3 { for c in bc*3..bc*3+3 { a[i]=self.cells[r][c]; i+=1; }}
        a
    }

    /// Cells whose digit is repeated somewhere in their row, column or box.
    /// Advisory only; writes are never blocked on it.
    pub fn conflict_mask(&self) -> [[bool; 9]; 9] {
        let mut mask = [[false; 9]; 9];
        let units = (0..9).map(|r| (0..9).map(|c| Pos::new(r, c)).collect::<Vec<_>>())
            .chain((0..9).map(|c| (0..9).map(|r| Pos::new(r, c)).collect()))
            .chain((0..9).map(|b| {
                let (br, bc) = (b / 3 * 3, b % 3 * 3);
                (0..9).map(|i| Pos::new(br + i / 3, bc + i % 3)).collect()
            }));
        for unit in units {
            let mut counts = [0u8; 10];
            for &p in &unit { counts[self.get(p) as usize] += 1; }
            for &p in &unit {
                let v = self.get(p) as usize;
                if v != 0 && counts[v] > 1 { mask[p.r][p.c] = true; }
            }
        }
        mask
    }
}

fn no_dupes(vals: [Digit; 9]) -> bool {
    let mut seen=[false;10];
    for v in vals { if v!=0 { if seen[v as usize] { return false; } seen[v as usize]=true; }}
    true
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for r in 0..9 {
            for c in 0..9 {
                let v = self.cells[r][c];
                write!(f, "{}", if v==0 {'.'} else { char::from(b'0'+v) })?;
                if c != 8 { write!(f, "{}", if c%3==2 { " | " } else { " " })?; }
            }
            writeln!(f)?;
            if r%3==2 && r!=8 { writeln!(f, "------+-------+------")?; }
        }
        Ok(())
    }
}
