//! Go Text Protocol (GTP) front end.
//!
//! Implements GTP version 2 over stdin/stdout so the engine can be
//! driven by graphical clients like GoGui or Sabaki. The protocol layer
//! is thin: it owns the current game and an engine, translates commands
//! into calls on them, and frames responses with `=`/`?` and the
//! optional command id.

use std::io::{self, BufRead, Write};

use crate::board::Player;
use crate::engine::Engine;
use crate::location::{self, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::state::Game;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "all_legal",
    "boardsize",
    "clear_board",
    "detail_score",
    "final_score",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "name",
    "play",
    "protocol_version",
    "quit",
    "showboard",
    "undo",
    "version",
];

/// GTP session state: the ongoing game plus the engine playing it.
pub struct GtpClient {
    size: usize,
    game: Game,
    engine: Box<dyn Engine>,
    engine_name: String,
}

impl GtpClient {
    pub fn new(engine: Box<dyn Engine>, engine_name: &str, size: usize, komi: f64) -> GtpClient {
        GtpClient {
            size,
            game: Game::new(size, komi),
            engine,
            engine_name: engine_name.to_string(),
        }
    }

    /// Run the GTP command loop, reading from stdin and writing to
    /// stdout until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            let command = parts[0].to_lowercase();
            let args = &parts[1..];

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(stdout, "{prefix}{id_str} {message}\n")?;
            stdout.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command id off the front of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let first = trimmed.split_whitespace().next().unwrap_or("");
        if let Ok(id) = first.parse::<u32>() {
            (Some(id), trimmed[first.len()..].trim())
        } else {
            (None, trimmed)
        }
    }

    /// Execute one GTP command and return (success, response body).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, format!("sente {}", self.engine_name)),

            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => (true, "2".to_string()),

            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                let known = KNOWN_COMMANDS.contains(&args[0].to_lowercase().as_str());
                (true, if known { "true" } else { "false" }.to_string())
            }

            "quit" => (true, String::new()),

            "boardsize" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                match args[0].parse::<usize>() {
                    Ok(size) if (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size) => {
                        self.size = size;
                        self.game = Game::new(self.size, self.game.komi);
                        (true, String::new())
                    }
                    Ok(_) => (false, "unacceptable size".to_string()),
                    Err(_) => (false, "invalid size".to_string()),
                }
            }

            "clear_board" => {
                self.game.reset();
                (true, String::new())
            }

            "komi" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                match args[0].parse::<f64>() {
                    Ok(komi) => {
                        self.game.komi = komi;
                        (true, String::new())
                    }
                    Err(_) => (false, "invalid komi".to_string()),
                }
            }

            "undo" => {
                self.game.undo_move();
                (true, String::new())
            }

            "play" => {
                if args.len() < 2 {
                    return (false, "expected play <player> <vertex>".to_string());
                }
                let player = match Player::parse(args[0]) {
                    Ok(p) => p,
                    Err(e) => return (false, e.to_string()),
                };
                let l = match location::parse(args[1]) {
                    Ok(l) => l,
                    Err(e) => return (false, e.to_string()),
                };
                if !self.game.current().is_legal_move(player, l) {
                    return (false, "illegal move".to_string());
                }
                self.game.play_move(player, l);
                (true, String::new())
            }

            "genmove" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                let player = match Player::parse(args[0]) {
                    Ok(p) => p,
                    Err(e) => return (false, e.to_string()),
                };
                let l = self
                    .engine
                    .suggest_move(player, self.game.current(), self.game.komi);
                self.game.play_move(player, l);
                (true, location::to_string(l))
            }

            "final_score" => {
                let (b, w) = self.game.current().board.score();
                let margin = b as f64 - (w as f64 + self.game.komi);
                let text = if margin > 0.0 {
                    format!("B+{margin}")
                } else if margin < 0.0 {
                    format!("W+{}", -margin)
                } else {
                    "0".to_string()
                };
                (true, text)
            }

            "showboard" => (true, self.game.current().board.to_string()),

            "all_legal" => {
                if args.is_empty() {
                    return (false, "missing argument".to_string());
                }
                let player = match Player::parse(args[0]) {
                    Ok(p) => p,
                    Err(e) => return (false, e.to_string()),
                };
                let moves: Vec<String> = self
                    .game
                    .current()
                    .legal_moves(player)
                    .into_iter()
                    .map(location::to_string)
                    .collect();
                (true, moves.join(" "))
            }

            "detail_score" => {
                if args.len() < 2 {
                    return (false, "expected detail_score <player> <vertex>".to_string());
                }
                let player = match Player::parse(args[0]) {
                    Ok(p) => p,
                    Err(e) => return (false, e.to_string()),
                };
                let l = match location::parse(args[1]) {
                    Ok(l) => l,
                    Err(e) => return (false, e.to_string()),
                };
                let why = self.engine.detail_score(player, l, self.game.current());
                (true, why)
            }

            _ => (false, "unknown command".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RandomEngine;

    fn client() -> GtpClient {
        GtpClient::new(Box::new(RandomEngine::new(Some(1))), "random", 9, 0.0)
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(GtpClient::parse_id("name"), (None, "name"));
        assert_eq!(GtpClient::parse_id("17 name"), (Some(17), "name"));
        assert_eq!(
            GtpClient::parse_id("3 play B D4"),
            (Some(3), "play B D4")
        );
    }

    #[test]
    fn test_protocol_basics() {
        let mut c = client();
        assert_eq!(c.execute("protocol_version", &[]), (true, "2".to_string()));
        assert_eq!(
            c.execute("known_command", &["genmove"]),
            (true, "true".to_string())
        );
        assert_eq!(
            c.execute("known_command", &["frobnicate"]),
            (true, "false".to_string())
        );
        let (ok, _) = c.execute("frobnicate", &[]);
        assert!(!ok);
    }

    #[test]
    fn test_play_and_undo() {
        let mut c = client();
        let (ok, _) = c.execute("play", &["B", "D4"]);
        assert!(ok);
        // The point is now occupied.
        let (ok, msg) = c.execute("play", &["W", "D4"]);
        assert!(!ok);
        assert_eq!(msg, "illegal move");
        let (ok, _) = c.execute("undo", &[]);
        assert!(ok);
        let (ok, _) = c.execute("play", &["W", "D4"]);
        assert!(ok);
    }

    #[test]
    fn test_boardsize_limits() {
        let mut c = client();
        assert!(c.execute("boardsize", &["13"]).0);
        assert!(!c.execute("boardsize", &["20"]).0);
        assert!(!c.execute("boardsize", &["0"]).0);
        assert!(!c.execute("boardsize", &["x"]).0);
    }

    #[test]
    fn test_final_score_empty_board() {
        let mut c = client();
        assert_eq!(c.execute("final_score", &[]), (true, "0".to_string()));
        assert!(c.execute("komi", &["6.5"]).0);
        assert_eq!(c.execute("final_score", &[]), (true, "W+6.5".to_string()));
        assert!(c.execute("play", &["B", "E5"]).0);
        // A lone black stone owns the whole board.
        assert_eq!(c.execute("final_score", &[]), (true, "B+74.5".to_string()));
    }

    #[test]
    fn test_genmove_plays_the_move() {
        let mut c = client();
        let (ok, vertex) = c.execute("genmove", &["b"]);
        assert!(ok);
        if vertex != "pass" {
            // The generated move must now be occupied.
            let (ok, _) = c.execute("play", &["w", &vertex]);
            assert!(!ok);
        }
    }

    #[test]
    fn test_all_legal_counts() {
        let mut c = client();
        let (ok, list) = c.execute("all_legal", &["B"]);
        assert!(ok);
        assert_eq!(list.split_whitespace().count(), 81);
    }
}
