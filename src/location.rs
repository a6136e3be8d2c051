//! Board locations as indices into a padded 1-D array.
//!
//! The array is sized for the largest supported board (19x19) plus a
//! border of off-board cells, so that moving to a neighboring point is a
//! constant offset with no bounds checks:
//!
//! ```text
//! 2 | 41 | 42 43 ... 60 | 61 |
//! 1 | 21 | 22 23 ... 40 | 41 |
//!   +----+--------------+----+
//!   |  0 |  1  2 ... 20 | 21 |
//!   +----+--------------+----+
//!        A  B  ...    T
//! ```
//!
//! Row 0, column 0, and the rows above the playable area are border
//! cells; the border column is shared between the right edge of one row
//! and the left edge of the next. `PASS` and `UNDEFINED` are reserved
//! negative sentinels that never index the array.

use anyhow::{Result, bail};

/// A point on the board (or a negative sentinel).
pub type Loc = i32;

pub const MIN_BOARD_SIZE: usize = 1;
pub const MAX_BOARD_SIZE: usize = 19;

/// Length of the padded board array.
pub const NUM_LOCS: usize = (MAX_BOARD_SIZE + 1) * (MAX_BOARD_SIZE + 2) + 1;

/// The pass move.
pub const PASS: Loc = -1;

/// No move at all (e.g. "last move" at the start of a game).
pub const UNDEFINED: Loc = -99;

/// Index delta for moving one row up the board.
pub const UP: i32 = MAX_BOARD_SIZE as i32 + 1;
pub const DOWN: i32 = -UP;
pub const LEFT: i32 = -1;
pub const RIGHT: i32 = 1;
pub const NORTH_EAST: i32 = UP + RIGHT;
pub const NORTH_WEST: i32 = UP + LEFT;
pub const SOUTH_EAST: i32 = DOWN + RIGHT;
pub const SOUTH_WEST: i32 = DOWN + LEFT;

/// Column letters used in coordinate strings; `I` is skipped by Go
/// convention to avoid confusion with `J`.
const COL_NAMES: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Convert 1-based (row, col) to a location index.
#[inline]
pub fn loc(row: i32, col: i32) -> Loc {
    row * UP + col
}

/// Convert a location index back to 1-based (row, col).
#[inline]
pub fn row_col(l: Loc) -> (i32, i32) {
    (l / UP, l % UP)
}

/// The four orthogonal neighbors (up, down, left, right).
#[inline]
pub fn neighbors(l: Loc) -> [Loc; 4] {
    [l + UP, l + DOWN, l + LEFT, l + RIGHT]
}

/// The four diagonal neighbors.
#[inline]
pub fn diagonals(l: Loc) -> [Loc; 4] {
    [l + NORTH_EAST, l + NORTH_WEST, l + SOUTH_EAST, l + SOUTH_WEST]
}

/// Parse a coordinate string ("D4", "pass") into a location.
pub fn parse(s: &str) -> Result<Loc> {
    if s.eq_ignore_ascii_case("pass") {
        return Ok(PASS);
    }
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        bail!("bad coordinate '{s}'");
    }
    let col_char = bytes[0].to_ascii_uppercase();
    let col = match COL_NAMES.iter().position(|&c| c == col_char) {
        Some(i) => i as i32 + 1,
        None => bail!("bad column in '{s}'"),
    };
    let row: i32 = s[1..].parse()?;
    if row < 1 || row > MAX_BOARD_SIZE as i32 || col > MAX_BOARD_SIZE as i32 {
        bail!("coordinate '{s}' off the board");
    }
    Ok(loc(row, col))
}

/// Render a location as a coordinate string.
pub fn to_string(l: Loc) -> String {
    match l {
        UNDEFINED => "undefined".to_string(),
        PASS => "pass".to_string(),
        _ => {
            let (row, col) = row_col(l);
            format!("{}{}", COL_NAMES[(col - 1) as usize] as char, row)
        }
    }
}
