// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A thin line-oriented front-end over `ishi_mcts::Engine`. Protocol framing
//! is explicitly out of scope for the core, so this binary speaks only a
//! handful of GTP-shaped commands — just enough to drive a game from a
//! terminal or a script. It exists so the workspace has a runnable entry
//! point, the same role the teacher's own binary plays over its search crate.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use ishi_board::{Board, Color, Coord};
use ishi_mcts::options::Config;
use ishi_mcts::time_control::{Dim, Period, TimeInfo};
use ishi_mcts::Engine;

const DEFAULT_SIZE: usize = 9;

fn parse_color(token: &str) -> Option<Color> {
    match token.to_ascii_lowercase().as_str() {
        "b" | "black" => Some(Color::Black),
        "w" | "white" => Some(Color::White),
        _ => None,
    }
}

/// GTP-style vertex: a column letter (skipping `I`) followed by a 1-based
/// row number, or the literal `pass`/`resign`.
fn parse_vertex(board: &Board, token: &str) -> Option<Coord> {
    match token.to_ascii_lowercase().as_str() {
        "pass" => return Some(Coord::Pass),
        "resign" => return Some(Coord::Resign),
        _ => {}
    }

    let mut chars = token.chars();
    let column = chars.next()?.to_ascii_uppercase();
    let row: usize = chars.as_str().parse().ok()?;
    if row == 0 || row > board.size() {
        return None;
    }

    let letters = "ABCDEFGHJKLMNOPQRSTUVWXYZ";
    let x = letters.find(column)?;
    if x >= board.size() {
        return None;
    }

    Some(Coord::Point(board.point_of(x, board.size() - row)))
}

fn format_vertex(board: &Board, coord: Coord) -> String {
    match coord {
        Coord::Pass => "pass".to_string(),
        Coord::Resign => "resign".to_string(),
        Coord::Point(p) => {
            let (x, y) = board.xy_of(p);
            let letters = "ABCDEFGHJKLMNOPQRSTUVWXYZ";
            let column = letters.chars().nth(x).unwrap_or('?');
            format!("{}{}", column, board.size() - y)
        }
    }
}

fn games_time_info(games: u32) -> TimeInfo {
    TimeInfo {
        period: Period::Move,
        dim: Dim::Games,
        budget: games,
        in_byoyomi: false,
        recommended: 0.0,
        max_time: 0.0,
        net_lag: Duration::ZERO,
    }
}

fn main() {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut board = Board::new(DEFAULT_SIZE);
    let mut engine = Engine::new(Config::default(), DEFAULT_SIZE);

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let mut tokens = line.split_whitespace();
        let command = match tokens.next() {
            Some(command) => command,
            None => continue,
        };

        match command {
            "quit" => {
                engine.done();
                break;
            }
            "clear_board" => {
                board = Board::new(board.size());
                engine = Engine::new(Config::default(), board.size());
                writeln!(out, "=").ok();
            }
            "boardsize" => {
                let size: usize = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(DEFAULT_SIZE);
                board = Board::new(size);
                engine = Engine::new(Config::default(), size);
                writeln!(out, "=").ok();
            }
            "play" => {
                let color = tokens.next().and_then(parse_color);
                let vertex = tokens.next().and_then(|t| parse_vertex(&board, t));

                match (color, vertex) {
                    (Some(color), Some(coord)) => {
                        if coord != Coord::Pass && coord != Coord::Resign {
                            if board.play(color, coord).is_err() {
                                writeln!(out, "? illegal move").ok();
                                continue;
                            }
                        }
                        engine.notify_play(color, coord);
                        writeln!(out, "=").ok();
                    }
                    _ => {
                        writeln!(out, "? invalid play command").ok();
                    }
                }
            }
            "genmove" => {
                let color = tokens.next().and_then(parse_color);
                match color {
                    Some(color) => {
                        let time_info = games_time_info(1000);
                        let coord = engine.genmove(&mut board, &time_info, color, false);
                        if coord != Coord::Resign {
                            let _ = board.play(color, coord);
                        }
                        writeln!(out, "= {}", format_vertex(&board, coord)).ok();
                    }
                    None => {
                        writeln!(out, "? invalid genmove command").ok();
                    }
                }
            }
            "showboard" => {
                let mut sink = String::new();
                let _ = engine.printhook(&board, &mut sink);
                writeln!(out, "= {}", sink).ok();
            }
            "final_status_list" => {
                let groups = engine.dead_group_list(&board);
                writeln!(out, "= {} dead group(s)", groups.len()).ok();
            }
            _ => {
                writeln!(out, "? unknown command").ok();
            }
        }

        out.flush().ok();
    }
}
