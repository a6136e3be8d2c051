//! Immutable Go board: cell states, capture resolution, legality,
//! area scoring, and incremental Zobrist hashing.
//!
//! A `Board` is a value object: `play` and `put_stone` return a new
//! board and never mutate the receiver. The only temporary mutation is a
//! tightly scoped scratch copy used to test potential suicide moves.
//!
//! The board hash is the XOR of a pseudorandom 64-bit value per
//! (color, location) pair of every occupied cell. XOR is commutative, so
//! the hash is independent of placement order and can be updated in
//! O(1) per stone placed or removed.

use std::fmt;
use std::sync::OnceLock;

use anyhow::{Result, bail};

use crate::location::{self, Loc, MAX_BOARD_SIZE, MIN_BOARD_SIZE, NUM_LOCS};

/// Whether playing a stone with no liberties and no captures is legal.
pub const ALLOW_SUICIDE: bool = false;

/// Contents of one cell of the padded board array.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Square {
    Empty,
    Black,
    White,
    OffBoard,
}

impl Square {
    /// Swap black and white; empty and off-board map to themselves.
    pub fn opposite(self) -> Square {
        match self {
            Square::Black => Square::White,
            Square::White => Square::Black,
            other => other,
        }
    }

    pub fn print_form(self) -> char {
        match self {
            Square::Empty => '.',
            Square::Black => 'X',
            Square::White => 'O',
            Square::OffBoard => '%',
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Player {
    Black,
    White,
}

impl Player {
    pub fn other(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    pub fn square(self) -> Square {
        match self {
            Player::Black => Square::Black,
            Player::White => Square::White,
        }
    }

    pub fn parse(s: &str) -> Result<Player> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Player::Black),
            "w" | "white" => Ok(Player::White),
            _ => bail!("unknown player '{s}'"),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "B"),
            Player::White => write!(f, "W"),
        }
    }
}

// =============================================================================
// Zobrist table
// =============================================================================

static ZOBRIST: OnceLock<Vec<u64>> = OnceLock::new();

fn zobrist_table() -> &'static [u64] {
    ZOBRIST.get_or_init(|| {
        // splitmix64 from a fixed seed, so hashes are stable across runs.
        let mut state: u64 = 0x9e2b_7c4f_1d5a_3e81;
        let mut next = move || {
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^ (z >> 31)
        };
        (0..NUM_LOCS * 2).map(|_| next()).collect()
    })
}

/// The hash contribution of a stone of the given color at a location.
fn zobrist(sq: Square, l: Loc) -> u64 {
    debug_assert!(sq == Square::Black || sq == Square::White);
    let offset = if sq == Square::White { 0 } else { 1 };
    zobrist_table()[l as usize * 2 + offset]
}

// =============================================================================
// Board
// =============================================================================

/// One immutable board position.
#[derive(Clone)]
pub struct Board {
    /// Playable edge length, `MIN_BOARD_SIZE..=MAX_BOARD_SIZE`.
    pub size: usize,
    /// Padded cell array; everything outside the playable region is
    /// `OffBoard`.
    pub data: [Square; NUM_LOCS],
    /// XOR-accumulated Zobrist hash of the occupied cells.
    pub hash: u64,
}

/// Outcome of playing a stone: the successor board plus how many stones
/// of each color were taken off it.
pub struct PlayResult {
    pub board: Board,
    pub black_captured: u32,
    pub white_captured: u32,
}

impl Board {
    pub fn empty(size: usize) -> Board {
        assert!((MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size));
        let mut data = [Square::OffBoard; NUM_LOCS];
        for row in 1..=size as i32 {
            for col in 1..=size as i32 {
                data[location::loc(row, col) as usize] = Square::Empty;
            }
        }
        Board { size, data, hash: 0 }
    }

    #[inline]
    pub fn get(&self, l: Loc) -> Square {
        self.data[l as usize]
    }

    /// All playable locations, row by row.
    pub fn board_locs(&self) -> impl Iterator<Item = Loc> + '_ {
        let size = self.size as i32;
        (1..=size).flat_map(move |row| (1..=size).map(move |col| location::loc(row, col)))
    }

    /// Place a stone with no rules processing, for board setup.
    pub fn put_stone(&self, player: Player, l: Loc) -> Board {
        let mut board = self.clone();
        let sq = player.square();
        board.data[l as usize] = sq;
        board.hash ^= zobrist(sq, l);
        board
    }

    /// Play a stone, resolving captures and updating the hash
    /// incrementally. A pass (negative location) returns the board
    /// unchanged.
    ///
    /// The move is assumed legal; use `is_legal_move` first. If a
    /// zero-liberty group of the mover's own color remains (suicide,
    /// when configured legal) it is removed as self-capture.
    pub fn play(&self, player: Player, l: Loc) -> PlayResult {
        if l < 0 {
            return PlayResult {
                board: self.clone(),
                black_captured: 0,
                white_captured: 0,
            };
        }

        let sq = player.square();
        let enemy = sq.opposite();
        let mut board = self.clone();
        board.data[l as usize] = sq;
        board.hash ^= zobrist(sq, l);

        let mut captured = 0u32;
        for n in location::neighbors(l) {
            if board.data[n as usize] == enemy && is_group_surrounded(&board.data, n) {
                for member in flood_fill_data(&board.data, n, enemy) {
                    board.data[member as usize] = Square::Empty;
                    board.hash ^= zobrist(enemy, member);
                    captured += 1;
                }
            }
        }

        let mut self_captured = 0u32;
        if captured == 0 && is_group_surrounded(&board.data, l) {
            for member in flood_fill_data(&board.data, l, sq) {
                board.data[member as usize] = Square::Empty;
                board.hash ^= zobrist(sq, member);
                self_captured += 1;
            }
        }

        let (black_captured, white_captured) = match player {
            Player::Black => (self_captured, captured),
            Player::White => (captured, self_captured),
        };
        PlayResult {
            board,
            black_captured,
            white_captured,
        }
    }

    /// Rules-level legality for placing `sq` at `l`; never raises.
    ///
    /// The target must be empty. Any empty orthogonal neighbor rules out
    /// suicide immediately; otherwise the stone is placed tentatively
    /// and its group tested for liberties. A move that would die on the
    /// board is legal only if it captures at least one opposing stone
    /// (or suicide is configured legal).
    pub fn is_legal_move(&self, sq: Square, l: Loc) -> bool {
        if l < 0 {
            return true; // pass
        }
        if self.data[l as usize] != Square::Empty {
            return false;
        }
        let neighbors = location::neighbors(l);
        if neighbors.iter().any(|&n| self.data[n as usize] == Square::Empty) {
            return true;
        }

        // Potential suicide: place the stone on a scratch copy.
        let mut scratch = self.data;
        scratch[l as usize] = sq;
        if !is_group_surrounded(&scratch, l) {
            return true;
        }
        let enemy = sq.opposite();
        let captures = neighbors
            .iter()
            .any(|&n| scratch[n as usize] == enemy && is_group_surrounded(&scratch, n));
        captures || ALLOW_SUICIDE
    }

    pub fn legal_moves(&self, player: Player) -> Vec<Loc> {
        let sq = player.square();
        self.board_locs()
            .filter(|&l| self.is_legal_move(sq, l))
            .collect()
    }

    /// Tromp-Taylor area score: a cell counts for a color iff it is
    /// reachable from that color's stones through empty cells and not
    /// from the other color's. Returns (black area, white area).
    pub fn score(&self) -> (u32, u32) {
        let reach_black = self.reachable_from(Square::Black);
        let reach_white = self.reachable_from(Square::White);
        let mut black = 0;
        let mut white = 0;
        for l in self.board_locs() {
            match (reach_black[l as usize], reach_white[l as usize]) {
                (true, false) => black += 1,
                (false, true) => white += 1,
                _ => {}
            }
        }
        (black, white)
    }

    fn reachable_from(&self, sq: Square) -> [bool; NUM_LOCS] {
        let mut reach = [false; NUM_LOCS];
        let mut stack: Vec<Loc> = self
            .board_locs()
            .filter(|&l| self.data[l as usize] == sq)
            .collect();
        for &l in &stack {
            reach[l as usize] = true;
        }
        while let Some(l) = stack.pop() {
            for n in location::neighbors(l) {
                if !reach[n as usize] && self.data[n as usize] == Square::Empty {
                    reach[n as usize] = true;
                    stack.push(n);
                }
            }
        }
        reach
    }

    /// The maximal connected region around `start` whose cells satisfy
    /// `pred`; empty if `start` itself does not.
    pub fn flood_fill(&self, start: Loc, pred: impl Fn(Square) -> bool) -> Vec<Loc> {
        if !pred(self.data[start as usize]) {
            return Vec::new();
        }
        let mut visited = [false; NUM_LOCS];
        visited[start as usize] = true;
        let mut out = vec![start];
        let mut head = 0;
        while head < out.len() {
            let l = out[head];
            head += 1;
            for n in location::neighbors(l) {
                if !visited[n as usize] && pred(self.data[n as usize]) {
                    visited[n as usize] = true;
                    out.push(n);
                }
            }
        }
        out
    }

    /// Parse a board diagram of the form produced by `Display`: rows
    /// labelled with their 1-based number (any order), `X`/`x` black,
    /// `O`/`o` white, `.` empty. Lines without a leading row number and
    /// all-numeric lines (column headers or footers) are skipped.
    pub fn from_text(text: &str) -> Result<Board> {
        let mut rows: Vec<(i32, Vec<Square>)> = Vec::new();
        for line in text.lines() {
            let mut tokens = line.split_whitespace().peekable();
            let Some(first) = tokens.next() else { continue };
            let Ok(row) = first.parse::<i32>() else { continue };
            if tokens.peek().is_none()
                || line
                    .split_whitespace()
                    .all(|tok| tok.parse::<i32>().is_ok())
            {
                continue;
            }
            let mut cells = Vec::new();
            for tok in tokens {
                let sq = match tok {
                    "X" | "x" => Square::Black,
                    "O" | "o" => Square::White,
                    "." => Square::Empty,
                    _ => bail!("bad board cell '{tok}'"),
                };
                cells.push(sq);
            }
            rows.push((row, cells));
        }
        if rows.is_empty() {
            bail!("no board rows found");
        }
        let max_row = rows.iter().map(|(r, _)| *r).max().unwrap_or(0);
        let max_col = rows.iter().map(|(_, c)| c.len()).max().unwrap_or(0);
        let size = (max_row as usize).max(max_col);
        if size > MAX_BOARD_SIZE {
            bail!("board diagram larger than {MAX_BOARD_SIZE}x{MAX_BOARD_SIZE}");
        }

        let mut board = Board::empty(size);
        for (row, cells) in rows {
            for (i, sq) in cells.into_iter().enumerate() {
                let l = location::loc(row, i as i32 + 1);
                if sq != Square::Empty {
                    board.data[l as usize] = sq;
                    board.hash ^= zobrist(sq, l);
                }
            }
        }
        Ok(board)
    }
}

/// Liberty test via flood fill restricted to the group's own color:
/// true iff no empty cell borders the group containing `start`.
fn is_group_surrounded(data: &[Square; NUM_LOCS], start: Loc) -> bool {
    let color = data[start as usize];
    let mut visited = [false; NUM_LOCS];
    visited[start as usize] = true;
    let mut stack = vec![start];
    while let Some(l) = stack.pop() {
        for n in location::neighbors(l) {
            match data[n as usize] {
                Square::Empty => return false,
                c if c == color && !visited[n as usize] => {
                    visited[n as usize] = true;
                    stack.push(n);
                }
                _ => {}
            }
        }
    }
    true
}

/// Members of the same-color group containing `start`.
fn flood_fill_data(data: &[Square; NUM_LOCS], start: Loc, color: Square) -> Vec<Loc> {
    let mut visited = [false; NUM_LOCS];
    visited[start as usize] = true;
    let mut out = vec![start];
    let mut head = 0;
    while head < out.len() {
        let l = out[head];
        head += 1;
        for n in location::neighbors(l) {
            if !visited[n as usize] && data[n as usize] == color {
                visited[n as usize] = true;
                out.push(n);
            }
        }
    }
    out
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const COLS: &str = "ABCDEFGHJKLMNOPQRST";
        let header: String = COLS[..self.size]
            .chars()
            .map(|c| format!("{c} "))
            .collect();
        writeln!(f)?;
        writeln!(f, "   {header}")?;
        for row in (1..=self.size as i32).rev() {
            write!(f, "{row:2} ")?;
            for col in 1..=self.size as i32 {
                write!(f, "{} ", self.get(location::loc(row, col)).print_form())?;
            }
            writeln!(f, "{row:2}")?;
        }
        write!(f, "   {header}")
    }
}
