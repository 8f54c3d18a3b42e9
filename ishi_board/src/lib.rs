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

//! A minimal Go board. This crate plays the role of the opaque `Board`
//! collaborator that the search engine (`ishi_mcts`) is built against: move
//! legality, captures, eyes and scoring live here so that the tree search
//! never has to know a rule of Go. It is deliberately small — no superko
//! history, no bitboards — since the search core is what this workspace is
//! about.

use std::fmt;

/// The four states a point on the board (or off it) can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
    Empty,
    Off,
}

impl Color {
    /// The other player. `Empty` and `Off` are their own opposite since
    /// they never move.
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            other => other,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Color::Black => 'B',
            Color::White => 'W',
            Color::Empty => '.',
            Color::Off => ' ',
        };
        write!(f, "{}", c)
    }
}

/// A point on the board, stored as a padded 1-D index so that neighbor
/// lookups never need bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point(u16);

/// A move: either a point on the board, or one of the two sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coord {
    Point(Point),
    Pass,
    Resign,
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coord::Point(p) => write!(f, "{:?}", p),
            Coord::Pass => write!(f, "pass"),
            Coord::Resign => write!(f, "resign"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMove {
    Occupied,
    Suicide,
    Ko,
    NotToMove,
}

impl fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IllegalMove::Occupied => "point is not empty",
            IllegalMove::Suicide => "move is suicide",
            IllegalMove::Ko => "move retakes the ko",
            IllegalMove::NotToMove => "color is not to move",
        };
        write!(f, "illegal move: {}", msg)
    }
}

impl std::error::Error for IllegalMove {}

/// A connected group of same-colored stones, used by the ownership map (see
/// `ishi_mcts::ownership`) to classify territory by majority vote.
pub struct Group {
    pub color: Color,
    pub points: Vec<Point>,
}

/// A Go position. Interior points run `0..size*size` in row-major order;
/// `Point` indices into `grid` skip past a one-point border of `Color::Off`
/// on every side so that neighbor lookups are branch-free.
#[derive(Clone)]
pub struct Board {
    size: usize,
    stride: usize,
    grid: Vec<Color>,
    to_move: Color,
    move_count: u32,
    ko_point: Option<Point>,
    last_was_pass: bool,
    captures: [u32; 2],
    superko_flag: bool,
}

fn color_index(color: Color) -> usize {
    match color {
        Color::Black => 0,
        Color::White => 1,
        _ => unreachable!("captures are only tracked for Black and White"),
    }
}

impl Board {
    /// Create an empty board of the given side length (e.g. 9, 13, 19) with
    /// Black to move.
    pub fn new(size: usize) -> Self {
        let stride = size + 2;
        let grid = vec![Color::Off; stride * stride]
            .into_iter()
            .enumerate()
            .map(|(i, _)| {
                let x = i % stride;
                let y = i / stride;

                if x == 0 || y == 0 || x == stride - 1 || y == stride - 1 {
                    Color::Off
                } else {
                    Color::Empty
                }
            })
            .collect();

        Self {
            size,
            stride,
            grid,
            to_move: Color::Black,
            move_count: 0,
            ko_point: None,
            last_was_pass: false,
            captures: [0, 0],
            superko_flag: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn last_move_was_pass(&self) -> bool {
        self.last_was_pass
    }

    pub fn captures(&self, color: Color) -> u32 {
        self.captures[color_index(color)]
    }

    /// Difference in stones captured, from `color`'s perspective. Used by the
    /// playout driver's mercy rule (spec.md §4.3 step 3).
    pub fn capture_difference(&self, color: Color) -> i32 {
        self.captures[color_index(color)] as i32 - self.captures[color_index(color.opposite())] as i32
    }

    fn to_index(&self, p: Point) -> usize {
        p.0 as usize
    }

    pub fn point_of(&self, x: usize, y: usize) -> Point {
        debug_assert!(x < self.size && y < self.size);
        Point(((y + 1) * self.stride + (x + 1)) as u16)
    }

    pub fn xy_of(&self, p: Point) -> (usize, usize) {
        let idx = self.to_index(p);
        let x = idx % self.stride - 1;
        let y = idx / self.stride - 1;
        (x, y)
    }

    pub fn at(&self, p: Point) -> Color {
        self.grid[self.to_index(p)]
    }

    /// All interior points of the board, in row-major order.
    pub fn points(&self) -> Vec<Point> {
        (0..self.size * self.size)
            .map(|i| self.point_of(i % self.size, i / self.size))
            .collect()
    }

    fn neighbors(&self, p: Point) -> [Point; 4] {
        let idx = self.to_index(p);
        let stride = self.stride;

        [
            Point((idx - stride) as u16),
            Point((idx + stride) as u16),
            Point((idx - 1) as u16),
            Point((idx + 1) as u16),
        ]
    }

    /// Flood-fill the group containing `p` and its liberty count.
    fn group_and_liberties(&self, p: Point) -> (Vec<Point>, usize) {
        let color = self.at(p);
        let mut seen = vec![false; self.grid.len()];
        let mut liberties = std::collections::HashSet::new();
        let mut stack = vec![p];
        let mut group = Vec::new();

        seen[self.to_index(p)] = true;

        while let Some(cur) = stack.pop() {
            group.push(cur);

            for n in self.neighbors(cur) {
                match self.at(n) {
                    Color::Empty => {
                        liberties.insert(self.to_index(n));
                    }
                    c if c == color && !seen[self.to_index(n)] => {
                        seen[self.to_index(n)] = true;
                        stack.push(n);
                    }
                    _ => {}
                }
            }
        }

        (group, liberties.len())
    }

    /// Returns every legal move for `color` on the current position,
    /// excluding one-point eyes (a pass is always legal and is not
    /// included; callers add it explicitly, matching spec.md §4.1 `expand`).
    pub fn legal_moves(&self, color: Color) -> Vec<Point> {
        self.points()
            .into_iter()
            .filter(|&p| self.is_legal_point(color, p))
            .collect()
    }

    fn is_legal_point(&self, color: Color, p: Point) -> bool {
        if self.at(p) != Color::Empty {
            return false;
        }

        if self.ko_point == Some(p) {
            return false;
        }

        let mut probe = self.clone();
        probe.place_stone(color, p).is_ok()
    }

    pub fn is_valid(&self, color: Color, coord: Coord) -> bool {
        match coord {
            Coord::Pass | Coord::Resign => true,
            Coord::Point(p) => self.is_legal_point(color, p),
        }
    }

    /// Play `coord` as `color`. `color` must equal `self.to_move()` — callers
    /// (the engine's `notify_play`) are responsible for alternation and treat
    /// a mismatch as fatal per spec.md §7.
    pub fn play(&mut self, color: Color, coord: Coord) -> Result<(), IllegalMove> {
        if color != self.to_move {
            return Err(IllegalMove::NotToMove);
        }

        match coord {
            Coord::Pass => {
                self.last_was_pass = true;
                self.ko_point = None;
            }
            Coord::Resign => {
                self.last_was_pass = false;
            }
            Coord::Point(p) => {
                self.place_stone(color, p)?;
                self.last_was_pass = false;
            }
        }

        self.to_move = self.to_move.opposite();
        self.move_count += 1;
        Ok(())
    }

    fn place_stone(&mut self, color: Color, p: Point) -> Result<(), IllegalMove> {
        if self.at(p) != Color::Empty {
            return Err(IllegalMove::Occupied);
        }

        let idx = self.to_index(p);
        self.grid[idx] = color;

        let opponent = color.opposite();
        let mut captured = Vec::new();

        for n in self.neighbors(p) {
            if self.at(n) == opponent {
                let (group, liberties) = self.group_and_liberties(n);

                if liberties == 0 {
                    captured.extend(group);
                }
            }
        }

        for &c in &captured {
            self.grid[self.to_index(c)] = Color::Empty;
        }

        if !captured.is_empty() {
            self.captures[color_index(color)] += captured.len() as u32;
        }

        let (_, own_liberties) = self.group_and_liberties(p);

        if own_liberties == 0 {
            // undo: this move was suicide and is illegal.
            self.grid[idx] = Color::Empty;
            for &c in &captured {
                self.grid[self.to_index(c)] = opponent;
            }
            self.captures[color_index(color)] -= captured.len() as u32;
            return Err(IllegalMove::Suicide);
        }

        // simple (positional) ko: a single stone was captured and playing
        // back into it would immediately recapture a single stone.
        self.ko_point = if captured.len() == 1 && own_liberties == 1 {
            Some(captured[0])
        } else {
            None
        };

        Ok(())
    }

    /// True if `p` is a one-point eye for `color`: empty, surrounded on all
    /// four sides by `color`, and not a false eye at a board edge/corner
    /// (at least 3 of 4 diagonals, or all of them at an edge/corner, also
    /// belong to `color`).
    pub fn is_one_point_eye(&self, color: Color, p: Point) -> bool {
        if self.at(p) != Color::Empty {
            return false;
        }

        for n in self.neighbors(p) {
            let c = self.at(n);
            if c != color && c != Color::Off {
                return false;
            }
        }

        let idx = self.to_index(p);
        let stride = self.stride as isize;
        let diagonal_offsets = [-stride - 1, -stride + 1, stride - 1, stride + 1];
        let mut off_board_diagonals = 0;
        let mut friendly_diagonals = 0;

        for off in diagonal_offsets {
            let d = Point((idx as isize + off) as u16);
            match self.at(d) {
                Color::Off => off_board_diagonals += 1,
                c if c == color => friendly_diagonals += 1,
                _ => {}
            }
        }

        if off_board_diagonals > 0 {
            friendly_diagonals + off_board_diagonals == 4
        } else {
            friendly_diagonals >= 3
        }
    }

    /// Connected groups of stones, used by the ownership map to classify
    /// territory by majority vote (spec.md §4.8).
    pub fn groups(&self) -> Vec<Group> {
        let mut seen = vec![false; self.grid.len()];
        let mut groups = Vec::new();

        for p in self.points() {
            let idx = self.to_index(p);
            if seen[idx] || self.at(p) == Color::Empty {
                continue;
            }

            let color = self.at(p);
            let (points, _) = self.group_and_liberties(p);
            for &q in &points {
                seen[self.to_index(q)] = true;
            }

            groups.push(Group { color, points });
        }

        groups
    }

    /// Simple area (Chinese) scoring: stones plus territory that borders
    /// only one color, adjusted by `komi`. Returns the score difference
    /// from Black's perspective (positive means Black is ahead).
    pub fn score_area(&self, komi: f32) -> f32 {
        let mut black = 0i32;
        let mut white = 0i32;
        let mut seen = vec![false; self.grid.len()];

        for p in self.points() {
            let idx = self.to_index(p);
            match self.at(p) {
                Color::Black => black += 1,
                Color::White => white += 1,
                Color::Empty if !seen[idx] => {
                    let (territory, _) = self.group_and_liberties(p);
                    let mut borders = std::collections::HashSet::new();

                    for &t in &territory {
                        seen[self.to_index(t)] = true;
                        for n in self.neighbors(t) {
                            match self.at(n) {
                                Color::Black | Color::White => {
                                    borders.insert(color_index(self.at(n)));
                                }
                                _ => {}
                            }
                        }
                    }

                    if borders.len() == 1 {
                        if borders.contains(&0) {
                            black += territory.len() as i32;
                        } else {
                            white += territory.len() as i32;
                        }
                    }
                }
                _ => {}
            }
        }

        black as f32 - (white as f32 + komi)
    }

    /// Per-point ownership, in the same row-major order as `points()`:
    /// stones own themselves, and empty territory bordering exactly one
    /// color belongs to it; anything else (dame, contested regions) is
    /// `Color::Empty`. Shares its territory-flood-fill logic with
    /// `score_area` (spec.md §4.8).
    pub fn owner_map(&self) -> Vec<Color> {
        let mut owners = vec![Color::Empty; self.grid.len()];
        let mut seen = vec![false; self.grid.len()];

        for p in self.points() {
            let idx = self.to_index(p);
            match self.at(p) {
                Color::Black | Color::White => owners[idx] = self.at(p),
                Color::Empty if !seen[idx] => {
                    let (territory, _) = self.group_and_liberties(p);
                    let mut borders = std::collections::HashSet::new();

                    for &t in &territory {
                        seen[self.to_index(t)] = true;
                        for n in self.neighbors(t) {
                            match self.at(n) {
                                Color::Black | Color::White => {
                                    borders.insert(color_index(self.at(n)));
                                }
                                _ => {}
                            }
                        }
                    }

                    if borders.len() == 1 {
                        let owner = if borders.contains(&0) { Color::Black } else { Color::White };
                        for &t in &territory {
                            owners[self.to_index(t)] = owner;
                        }
                    }
                }
                _ => {}
            }
        }

        self.points().into_iter().map(|p| owners[self.to_index(p)]).collect()
    }

    /// Whether a diagnostic superko violation has been flagged on the
    /// incoming board (spec.md §7, "Diagnostic (never fatal)"). The core
    /// never sets this itself — the (out of scope) protocol front-end does,
    /// and the engine clears it after warning.
    pub fn superko_flag(&self) -> bool {
        self.superko_flag
    }

    pub fn set_superko_flag(&mut self, flag: bool) {
        self.superko_flag = flag;
    }

    pub fn clear_superko_flag(&mut self) {
        self.superko_flag = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_board_has_no_eyes() {
        let board = Board::new(9);
        let p = board.point_of(4, 4);
        assert!(!board.is_one_point_eye(Color::Black, p));
    }

    #[test]
    fn surrounded_point_is_an_eye() {
        let mut board = Board::new(9);
        let center = board.point_of(4, 4);

        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (x, y) = (4 + dx, 4 + dy);
            let p = board.point_of(x as usize, y as usize);
            board.play(Color::Black, Coord::Point(p)).unwrap();
            board.play(Color::White, Coord::Pass).unwrap();
        }

        assert!(board.is_one_point_eye(Color::Black, center));
        assert!(!board.is_one_point_eye(Color::White, center));
    }

    #[test]
    fn capturing_a_single_stone_sets_the_ko_point() {
        let mut board = Board::new(9);
        // surround a lone white stone at (1, 0) then capture it.
        let white_stone = board.point_of(1, 0);
        board.play(Color::Black, Coord::Pass).unwrap();
        board.play(Color::White, Coord::Point(white_stone)).unwrap();
        board.play(Color::Black, Coord::Point(board.point_of(0, 0))).unwrap();
        board.play(Color::White, Coord::Pass).unwrap();
        board.play(Color::Black, Coord::Point(board.point_of(2, 0))).unwrap();
        board.play(Color::White, Coord::Pass).unwrap();
        board.play(Color::Black, Coord::Point(board.point_of(1, 1))).unwrap();

        assert_eq!(board.at(white_stone), Color::Empty);
        assert_eq!(board.captures(Color::Black), 1);
        assert!(!board.is_legal_point(Color::White, white_stone));
    }

    #[test]
    fn suicide_is_illegal() {
        let mut board = Board::new(9);
        let corner = board.point_of(0, 0);

        board.play(Color::Black, Coord::Point(board.point_of(1, 0))).unwrap();
        board.play(Color::White, Coord::Pass).unwrap();
        board.play(Color::Black, Coord::Point(board.point_of(0, 1))).unwrap();
        board.play(Color::White, Coord::Pass).unwrap();

        assert!(!board.is_legal_point(Color::White, corner));
    }

    #[test]
    fn alternation_and_move_count() {
        let mut board = Board::new(9);
        assert_eq!(board.to_move(), Color::Black);
        board.play(Color::Black, Coord::Pass).unwrap();
        assert_eq!(board.to_move(), Color::White);
        assert_eq!(board.move_count(), 1);
    }

    #[test]
    fn playing_out_of_turn_is_rejected() {
        let mut board = Board::new(9);
        assert_eq!(board.play(Color::White, Coord::Pass), Err(IllegalMove::NotToMove));
    }

    #[test]
    fn owner_map_is_empty_on_an_empty_board() {
        let board = Board::new(9);
        assert!(board.owner_map().iter().all(|&c| c == Color::Empty));
    }

    #[test]
    fn owner_map_credits_a_surrounded_eye_to_its_owner() {
        let mut board = Board::new(9);
        let center = board.point_of(4, 4);

        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (x, y) = (4 + dx, 4 + dy);
            let p = board.point_of(x as usize, y as usize);
            board.play(Color::Black, Coord::Point(p)).unwrap();
            board.play(Color::White, Coord::Pass).unwrap();
        }

        let owners = board.owner_map();
        let idx = board.points().iter().position(|&p| p == center).unwrap();
        assert_eq!(owners[idx], Color::Black);
    }
}
