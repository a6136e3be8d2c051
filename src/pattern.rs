//! Local board patterns: canonicalized square neighborhoods, the
//! extractor that reads them off a board, the count-min sketch used to
//! curate a pattern vocabulary offline, and the vocabulary file reader.
//!
//! A pattern stores one bit plane per color over an NxN window
//! (N = 3, 5, or 7; off-board cells set both planes). Patterns are
//! always expressed as seen by Black to move — colors are flipped when
//! extracting for White — and canonicalized to the smallest of the
//! eight square symmetries, so two neighborhoods that are rotations or
//! reflections of each other compare equal.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::board::{Board, Player, Square};
use crate::location::{self, Loc};

/// Supported pattern edge lengths. 7x7 is the largest that fits one
/// u64 bit plane.
pub const PATTERN_SIZES: [usize; 3] = [3, 5, 7];

/// A canonicalized local pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pattern {
    pub size: usize,
    pub black_bits: u64,
    pub white_bits: u64,
}

impl Pattern {
    pub fn new(size: usize, black_bits: u64, white_bits: u64) -> Pattern {
        assert!(PATTERN_SIZES.contains(&size));
        Pattern {
            size,
            black_bits,
            white_bits,
        }
    }

    /// One multiplicative hash per sketch row. The constants are large
    /// primes; each row must hash the same pattern differently.
    pub fn sketch_hash(&self, row: usize) -> u64 {
        const PRIMES: [i64; 7] = [
            0x7f8e_fc50_ea33_2ff5,
            0x2f38_a776_dbfb_e1b3,
            0x3e12_b673_96ef_0df9,
            0x61bd_ec0b_c5d9_c7bf,
            0x1694_fd51_5cae_bf49,
            0x0293_1e7e_a6e5_59c7,
            0x1ee2_487e_8477_a303,
        ];
        let p = PRIMES[row];
        let mut h: i64 = 1;
        h = h.wrapping_mul(p).wrapping_add(self.size as i64);
        h = h.wrapping_mul(p).wrapping_add(self.black_bits as i64);
        h = h.wrapping_mul(p).wrapping_add(self.white_bits as i64);
        h.unsigned_abs()
    }
}

impl fmt::Display for Pattern {
    /// `size|row|row|...`, rows top-down, `.`/`X`/`O`/`#` cells.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.size)?;
        for cell in 0..self.size * self.size {
            let black = (self.black_bits >> cell) & 1;
            let white = (self.white_bits >> cell) & 1;
            let ch = match (black, white) {
                (0, 0) => '.',
                (1, 0) => 'X',
                (0, 1) => 'O',
                (1, 1) => '#',
                _ => unreachable!(),
            };
            write!(f, "{ch}")?;
            if cell % self.size == self.size - 1 {
                write!(f, "|")?;
            }
        }
        Ok(())
    }
}

/// Index permutations for the eight symmetries of an NxN window:
/// identity, the three further rotations, and the mirror of each.
/// `maps[s][cell]` is where the cell lands under symmetry `s`.
pub fn symmetry_maps(size: usize) -> [Vec<usize>; 8] {
    let n = size;
    let mut maps: [Vec<usize>; 8] = std::array::from_fn(|_| vec![0; n * n]);
    for row in 0..n {
        for col in 0..n {
            let cell = row * n + col;
            let nrow = n - 1 - row;
            let ncol = n - 1 - col;
            maps[0][cell] = cell; // identity
            maps[1][cell] = col * n + nrow; // rotate 90
            maps[2][cell] = nrow * n + ncol; // rotate 180
            maps[3][cell] = ncol * n + row; // rotate 270
            maps[4][cell] = nrow * n + col; // vertical mirror
            maps[5][cell] = ncol * n + nrow; // mirror + 90
            maps[6][cell] = row * n + ncol; // mirror + 180
            maps[7][cell] = col * n + row; // mirror + 270
        }
    }
    maps
}

/// Index deltas for reading an NxN window off the padded board array,
/// row-major from the top-left corner of the window.
/// `board_up` is the index increase when moving one row up the board.
pub fn board_offsets(size: usize, board_up: i32) -> Vec<i32> {
    let radius = (size as i32 - 1) / 2;
    let mut offsets = Vec::with_capacity(size * size);
    for row in (-radius..=radius).rev() {
        for col in -radius..=radius {
            offsets.push(row * board_up + col);
        }
    }
    offsets
}

/// Reads canonical patterns of one size off boards.
pub struct PatternExtractor {
    pub size: usize,
    maps: [Vec<usize>; 8],
}

impl PatternExtractor {
    pub fn new(size: usize) -> PatternExtractor {
        PatternExtractor {
            size,
            maps: symmetry_maps(size),
        }
    }

    /// Extract the canonical pattern centered at `l`, from `player`'s
    /// point of view (colors flipped for White so every pattern reads
    /// as Black to move).
    pub fn pattern_at(&self, board: &Board, l: Loc, player: Player) -> Pattern {
        let n = self.size;
        let radius = (n as i32 - 1) / 2;
        let (row, col) = location::row_col(l);

        let mut black = [0u64; 8];
        let mut white = [0u64; 8];
        let mut cell = 0;
        for drow in (-radius..=radius).rev() {
            for dcol in -radius..=radius {
                let r = row + drow;
                let c = col + dcol;
                let sq = if r < 1 || r > board.size as i32 || c < 1 || c > board.size as i32 {
                    Square::OffBoard
                } else {
                    board.get(location::loc(r, c))
                };
                let (own_bit, enemy_bit) = match (sq, player) {
                    (Square::OffBoard, _) => (true, true),
                    (Square::Empty, _) => (false, false),
                    (Square::Black, Player::Black) | (Square::White, Player::White) => {
                        (true, false)
                    }
                    _ => (false, true),
                };
                for (s, map) in self.maps.iter().enumerate() {
                    if own_bit {
                        black[s] |= 1 << map[cell];
                    }
                    if enemy_bit {
                        white[s] |= 1 << map[cell];
                    }
                }
                cell += 1;
            }
        }

        (0..8)
            .map(|s| Pattern::new(n, black[s], white[s]))
            .min()
            .expect("eight symmetry candidates")
    }
}

// =============================================================================
// Count-min sketch
// =============================================================================

const SKETCH_ROWS: usize = 5;
const SKETCH_WIDTH: usize = 200_003;

/// Approximate pattern frequency counter: several independent hashed
/// counter rows; the reported estimate is the minimum across rows, so
/// it may over-count on collisions but never under-counts.
pub struct CountMinSketch {
    rows: Vec<Vec<u32>>,
}

impl Default for CountMinSketch {
    fn default() -> Self {
        Self::new()
    }
}

impl CountMinSketch {
    pub fn new() -> CountMinSketch {
        CountMinSketch {
            rows: vec![vec![0; SKETCH_WIDTH]; SKETCH_ROWS],
        }
    }

    /// Record one occurrence and return the updated estimate.
    pub fn add(&mut self, pattern: &Pattern) -> u32 {
        let mut estimate = u32::MAX;
        for (i, row) in self.rows.iter_mut().enumerate() {
            let slot = (pattern.sketch_hash(i) % SKETCH_WIDTH as u64) as usize;
            row[slot] += 1;
            estimate = estimate.min(row[slot]);
        }
        estimate
    }

    /// Estimated occurrence count; always >= the true count.
    pub fn frequency(&self, pattern: &Pattern) -> u32 {
        let mut estimate = u32::MAX;
        for (i, row) in self.rows.iter().enumerate() {
            let slot = (pattern.sketch_hash(i) % SKETCH_WIDTH as u64) as usize;
            estimate = estimate.min(row[slot]);
        }
        estimate
    }
}

// =============================================================================
// Pattern vocabulary file
// =============================================================================

/// Load a pattern vocabulary: tab-separated lines of
/// `<id>\t<size>,<blackBits>,<whiteBits>`; `#` starts a comment.
pub fn read_pattern_file(path: &Path) -> Result<HashMap<Pattern, i32>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading pattern file {}", path.display()))?;
    parse_patterns(&text).with_context(|| format!("parsing pattern file {}", path.display()))
}

pub fn parse_patterns(text: &str) -> Result<HashMap<Pattern, i32>> {
    let mut table = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((id_str, pattern_str)) = line.split_once('\t') else {
            bail!("expected <id>\\t<pattern>, got '{line}'");
        };
        let id: i32 = id_str.trim().parse()?;
        let fields: Vec<&str> = pattern_str.trim().split(',').collect();
        if fields.len() != 3 {
            bail!("expected size,blackBits,whiteBits in '{pattern_str}'");
        }
        let size: usize = fields[0].parse()?;
        if !PATTERN_SIZES.contains(&size) {
            bail!("unsupported pattern size {size}");
        }
        let black_bits: u64 = fields[1].parse()?;
        let white_bits: u64 = fields[2].parse()?;
        table.insert(Pattern::new(size, black_bits, white_bits), id);
    }
    Ok(table)
}
