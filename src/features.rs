//! Per-move features for the linear move-scoring engine: tactical
//! signals (captures, atari, saves), positional signals (influence,
//! distance, corners, access), and local-pattern lookups.
//!
//! An extractor is built once per (state, player) pair. Whole-board
//! maps that every query shares (capture counts, influence, atari
//! saves, access distances) are computed eagerly in the constructor;
//! per-location features are computed on demand.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::board::{Player, Square};
use crate::chains::{self, Chain};
use crate::location::{self, Loc, NUM_LOCS};
use crate::pattern::{Pattern, PatternExtractor};
use crate::state::GameState;

/// Every feature name the extractor understands, as spelled in weight
/// files.
pub const FEATURE_NAMES: [&str; 11] = [
    "capture_count",
    "save_self_atari",
    "self_atari",
    "enemy_atari",
    "empty_edge",
    "influence",
    "dist_to_last_move",
    "pattern",
    "jumps",
    "near_corner",
    "self_access",
];

/// The weights learned for one named feature: a map from discrete
/// feature value to additive score. Value 0 is the implicit default
/// with weight 0 and is never stored.
#[derive(Debug, Clone)]
pub struct FeatureWeight {
    pub name: String,
    pub weights: HashMap<i32, f64>,
}

/// Load feature weights: tab-separated `<name>\t<value>\t<weight>`
/// lines grouped by name; `#` starts a comment.
pub fn read_weight_file(path: &Path) -> Result<Vec<FeatureWeight>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading weight file {}", path.display()))?;
    parse_weights(&text).with_context(|| format!("parsing weight file {}", path.display()))
}

pub fn parse_weights(text: &str) -> Result<Vec<FeatureWeight>> {
    let mut by_name: Vec<FeatureWeight> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            bail!("expected <name>\\t<value>\\t<weight>, got '{line}'");
        }
        let name = fields[0];
        let value: i32 = fields[1].trim().parse()?;
        let weight: f64 = fields[2].trim().parse()?;
        match by_name.iter_mut().find(|fw| fw.name == name) {
            Some(fw) => {
                fw.weights.insert(value, weight);
            }
            None => by_name.push(FeatureWeight {
                name: name.to_string(),
                weights: HashMap::from([(value, weight)]),
            }),
        }
    }
    Ok(by_name)
}

/// Distance past which a stone is not worth walking to.
const ACCESS_CAP: i32 = 10;

/// Feature values for every candidate move of one player in one state.
pub struct FeatureExtractor<'a> {
    state: &'a GameState,
    player: Player,
    patterns: &'a HashMap<Pattern, i32>,
    /// Pattern ids the caller has weights for; `None` accepts any id.
    known_pattern_ids: Option<&'a HashSet<i32>>,
    capture_counts: Vec<i32>,
    influence: Vec<i32>,
    save_self_atari: Vec<i32>,
    self_access: Vec<i32>,
    extractor3: PatternExtractor,
    extractor5: PatternExtractor,
    extractor7: PatternExtractor,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(
        state: &'a GameState,
        player: Player,
        patterns: &'a HashMap<Pattern, i32>,
        known_pattern_ids: Option<&'a HashSet<i32>>,
    ) -> FeatureExtractor<'a> {
        let mut extractor = FeatureExtractor {
            state,
            player,
            patterns,
            known_pattern_ids,
            capture_counts: vec![0; NUM_LOCS],
            influence: vec![0; NUM_LOCS],
            save_self_atari: vec![0; NUM_LOCS],
            self_access: vec![ACCESS_CAP; NUM_LOCS],
            extractor3: PatternExtractor::new(3),
            extractor5: PatternExtractor::new(5),
            extractor7: PatternExtractor::new(7),
        };
        extractor.compute_capture_counts();
        extractor.compute_influence();
        extractor.compute_save_self_atari();
        extractor.compute_self_access();
        extractor
    }

    /// For every enemy chain down to one liberty, credit the chain's
    /// size to that liberty: playing there captures those stones.
    fn compute_capture_counts(&mut self) {
        let enemy = self.player.other().square();
        let board = &self.state.board;
        for chain in chains::find_chains(board) {
            if board.get(chain.rep) != enemy {
                continue;
            }
            let libs = chains::liberties(board, &chain);
            if libs.len() == 1 {
                let lib = *libs.iter().next().expect("one liberty");
                self.capture_counts[lib as usize] += chain.elements.len() as i32;
            }
        }
    }

    fn compute_influence(&mut self) {
        const KERNEL: [[i32; 7]; 7] = [
            [0, 0, 0, 1, 0, 0, 0],
            [0, 1, 2, 5, 2, 1, 0],
            [0, 1, 6, 13, 6, 1, 0],
            [1, 5, 13, 60, 13, 5, 1],
            [0, 1, 6, 13, 6, 1, 0],
            [0, 1, 2, 5, 2, 1, 0],
            [0, 0, 0, 1, 0, 0, 0],
        ];
        let own = self.player.square();
        let enemy = self.player.other().square();
        let size = self.state.board.size as i32;
        for l in self.state.board.board_locs() {
            let (row, col) = location::row_col(l);
            let mut total = 0;
            for drow in -3..=3i32 {
                for dcol in -3..=3i32 {
                    let r = row + drow;
                    let c = col + dcol;
                    if r < 1 || r > size || c < 1 || c > size {
                        continue;
                    }
                    let sq = self.state.board.get(location::loc(r, c));
                    let weight = if sq == own {
                        1
                    } else if sq == enemy {
                        -1
                    } else {
                        0
                    };
                    total += weight * KERNEL[(drow + 3) as usize][(dcol + 3) as usize];
                }
            }
            self.influence[l as usize] = total;
        }
    }

    /// Mark the lone liberty of each of our atari chains when extending
    /// there actually escapes (the merged chain gains a second liberty).
    fn compute_save_self_atari(&mut self) {
        let own = self.player.square();
        let board = &self.state.board;
        for chain in chains::find_chains(board) {
            if board.get(chain.rep) != own {
                continue;
            }
            let libs = chains::liberties(board, &chain);
            if libs.len() != 1 {
                continue;
            }
            let lib = *libs.iter().next().expect("one liberty");
            let next = board.play(self.player, lib).board;
            let group = next.flood_fill(lib, |sq| sq == own);
            let merged = Chain {
                rep: lib,
                elements: group,
            };
            if chains::liberties(&next, &merged).len() > 1 {
                self.save_self_atari[lib as usize] = 1;
            }
        }
    }

    /// Multi-source BFS from our stones through empty points, capped.
    /// Enemy stones and unreachable points stay at the cap.
    fn compute_self_access(&mut self) {
        let own = self.player.square();
        let board = &self.state.board;
        let mut queue = VecDeque::new();
        for l in board.board_locs() {
            if board.get(l) == own {
                self.self_access[l as usize] = 0;
                queue.push_back(l);
            }
        }
        while let Some(l) = queue.pop_front() {
            let d = self.self_access[l as usize];
            if d + 1 >= ACCESS_CAP {
                continue;
            }
            for n in location::neighbors(l) {
                if board.get(n) == Square::Empty && self.self_access[n as usize] > d + 1 {
                    self.self_access[n as usize] = d + 1;
                    queue.push_back(n);
                }
            }
        }
    }

    /// Enemy stones captured by playing here, saturating at 7.
    pub fn capture_count(&self, l: Loc) -> i32 {
        self.capture_counts[l as usize].min(7)
    }

    pub fn save_self_atari(&self, l: Loc) -> i32 {
        self.save_self_atari[l as usize]
    }

    /// Whether playing here leaves our own new chain with one liberty.
    pub fn self_atari(&self, l: Loc) -> i32 {
        let own = self.player.square();
        let next = self.state.board.play(self.player, l).board;
        let group = next.flood_fill(l, |sq| sq == own);
        if group.is_empty() {
            return 0;
        }
        let chain = Chain {
            rep: l,
            elements: group,
        };
        if chains::liberties(&next, &chain).len() == 1 {
            1
        } else {
            0
        }
    }

    /// Whether playing here puts any adjacent enemy chain in atari.
    pub fn enemy_atari(&self, l: Loc) -> i32 {
        let enemy = self.player.other().square();
        let next = self.state.board.play(self.player, l).board;
        for n in location::neighbors(l) {
            if next.get(n) != enemy {
                continue;
            }
            let group = next.flood_fill(n, |sq| sq == enemy);
            let chain = Chain {
                rep: n,
                elements: group,
            };
            if chains::liberties(&next, &chain).len() == 1 {
                return 1;
            }
        }
        0
    }

    pub fn empty_edge(&self, l: Loc) -> i32 {
        if chains::is_empty_edge(l, &self.state.board) {
            1
        } else {
            0
        }
    }

    /// Bucketed convolution of friendly minus enemy stones.
    pub fn influence(&self, l: Loc) -> i32 {
        const BREAK_POINTS: [i32; 14] = [-64, -32, -16, -8, -4, -2, -1, 0, 1, 3, 7, 15, 31, 63];
        let raw = self.influence[l as usize];
        for (i, &bp) in BREAK_POINTS.iter().enumerate() {
            if raw <= bp {
                return i as i32 + 1;
            }
        }
        BREAK_POINTS.len() as i32 + 1
    }

    /// Dist(dx, dy) = |dx| + |dy| + max(|dx|, |dy|), in 2..=17;
    /// 17 when there is no last move to measure from.
    pub fn dist_to_last_move(&self, l: Loc) -> i32 {
        let prev = self.state.prev_move;
        if prev == location::PASS || prev == location::UNDEFINED {
            return 17;
        }
        let (prev_row, prev_col) = location::row_col(prev);
        let (row, col) = location::row_col(l);
        let dx = (prev_col - col).abs();
        let dy = (prev_row - row).abs();
        (dx + dy + dx.max(dy)).min(17)
    }

    /// Id of the largest matching pattern in the vocabulary, trying
    /// 7x7 first, then 5x5, then 3x3; 0 when nothing matches.
    pub fn pattern(&self, l: Loc) -> i32 {
        for extractor in [&self.extractor7, &self.extractor5, &self.extractor3] {
            let pat = extractor.pattern_at(&self.state.board, l, self.player);
            if let Some(&id) = self.patterns.get(&pat) {
                match self.known_pattern_ids {
                    Some(known) if !known.contains(&id) => continue,
                    _ => return id,
                }
            }
        }
        0
    }

    /// True when `num_spaces` empty points in direction `dir` are
    /// followed by a stone of `color`.
    pub fn is_jump(&self, l: Loc, color: Square, dir: i32, num_spaces: i32) -> bool {
        let mut curr = l;
        for _ in 0..num_spaces {
            curr += dir;
            if self.state.board.get(curr) != Square::Empty {
                return false;
            }
        }
        self.state.board.get(curr + dir) == color
    }

    /// A knight-shaped relation: a lane of empty points along
    /// `long_dir` (with the `short_dir` shoulder also empty) ending
    /// diagonally at a stone of `color`.
    pub fn is_knight_move(
        &self,
        l: Loc,
        color: Square,
        long_dir: i32,
        short_dir: i32,
        num_spaces: i32,
    ) -> bool {
        let board = &self.state.board;
        if board.get(l + short_dir) != Square::Empty {
            return false;
        }
        let mut curr = l;
        for _ in 0..num_spaces {
            curr += long_dir;
            if board.get(curr) != Square::Empty || board.get(curr + short_dir) != Square::Empty {
                return false;
            }
        }
        board.get(curr + long_dir) == Square::Empty
            && board.get(curr + long_dir + short_dir) == color
    }

    fn has_jump(&self, l: Loc, color: Square, num_spaces: i32) -> bool {
        const DIRS: [i32; 4] = [
            location::LEFT,
            location::RIGHT,
            location::UP,
            location::DOWN,
        ];
        DIRS.iter()
            .any(|&dir| self.is_jump(l, color, dir, num_spaces))
    }

    fn has_knight_move(&self, l: Loc, color: Square, num_spaces: i32) -> bool {
        const DIR_PAIRS: [(i32, i32); 8] = [
            (location::LEFT, location::UP),
            (location::RIGHT, location::UP),
            (location::LEFT, location::DOWN),
            (location::RIGHT, location::DOWN),
            (location::UP, location::LEFT),
            (location::DOWN, location::LEFT),
            (location::UP, location::RIGHT),
            (location::DOWN, location::RIGHT),
        ];
        DIR_PAIRS
            .iter()
            .any(|&(long, short)| self.is_knight_move(l, color, long, short, num_spaces))
    }

    /// Shortest jump or knight-move relation to a friendly stone,
    /// coded 1..=10 by increasing gap; 0 when none applies.
    /// Jumps and knight moves as described in
    /// https://econcs.seas.harvard.edu/files/econcs/files/harrisonthesis.pdf
    pub fn jumps(&self, l: Loc) -> i32 {
        if self.state.board.get(l) != Square::Empty {
            return 0;
        }
        let own = self.player.square();
        for num_spaces in 0..=4 {
            if self.has_jump(l, own, num_spaces) {
                return 2 * num_spaces + 1;
            }
            if self.has_knight_move(l, own, num_spaces) {
                return 2 * num_spaces + 2;
            }
        }
        0
    }

    /// One for points whose distance to the nearest edge is 3 or 4 in
    /// both directions, the band where corner openings live.
    pub fn near_corner(&self, l: Loc) -> i32 {
        let size = self.state.board.size as i32;
        let (row, col) = location::row_col(l);
        let row_dist = row.min(size + 1 - row);
        let col_dist = col.min(size + 1 - col);
        if (3..=4).contains(&row_dist) && (3..=4).contains(&col_dist) {
            1
        } else {
            0
        }
    }

    /// Walking distance from our nearest stone through empty points,
    /// capped; occupied or cut-off points report the cap.
    pub fn self_access(&self, l: Loc) -> i32 {
        self.self_access[l as usize]
    }

    /// Look a feature up by its name in the weight files.
    pub fn feature(&self, name: &str, l: Loc, fail_if_unknown: bool) -> Result<i32> {
        let value = match name {
            "capture_count" => self.capture_count(l),
            "save_self_atari" => self.save_self_atari(l),
            "self_atari" => self.self_atari(l),
            "enemy_atari" => self.enemy_atari(l),
            "empty_edge" => self.empty_edge(l),
            "influence" => self.influence(l),
            "dist_to_last_move" => self.dist_to_last_move(l),
            "pattern" => self.pattern(l),
            "jumps" => self.jumps(l),
            "near_corner" => self.near_corner(l),
            "self_access" => self.self_access(l),
            _ => {
                if fail_if_unknown {
                    bail!("unknown feature '{name}'");
                }
                0
            }
        };
        Ok(value)
    }
}
