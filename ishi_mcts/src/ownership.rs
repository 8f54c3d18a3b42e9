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

//! The ownership map and pass-safety heuristic (spec.md §4.8): accumulates
//! per-point Black/White ownership counts across playouts, then classifies
//! groups as alive/dead so `uct_pass_is_safe` can gate early termination and
//! `dead_group_list` can tell a front-end which stones to remove at scoring.

use std::sync::atomic::{AtomicU32, Ordering};

use ishi_board::{Board, Color, Group, Point};

/// Minimum number of recorded playouts before the map is trusted enough to
/// call anything decided (spec.md §4.8).
pub const GJ_MINGAMES: u32 = 500;
/// Fraction of recorded playouts a color must own a point in for that point
/// to count towards it (spec.md §4.8).
pub const GJ_THRES: f32 = 0.8;

/// Four-way per-point ownership verdict used by `printhook` (spec.md §6:
/// "emits one of `:XO,` (dame/black/white/unclear)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointStatus {
    Dame,
    Black,
    White,
    Unclear,
}

/// Per-point Black/White ownership tallies, one slot per board point in
/// `Board::points()` order.
pub struct OwnerMap {
    size: usize,
    playouts: AtomicU32,
    black: Vec<AtomicU32>,
    white: Vec<AtomicU32>,
}

impl OwnerMap {
    pub fn new(size: usize) -> Self {
        let n = size * size;
        Self {
            size,
            playouts: AtomicU32::new(0),
            black: (0..n).map(|_| AtomicU32::new(0)).collect(),
            white: (0..n).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn playouts(&self) -> u32 {
        self.playouts.load(Ordering::Acquire)
    }

    /// Accumulate one playout's final-position ownership (spec.md §4.3 step
    /// 8, "update ownership map").
    pub fn record(&self, board: &Board) {
        for (idx, owner) in board.owner_map().into_iter().enumerate() {
            match owner {
                Color::Black => {
                    self.black[idx].fetch_add(1, Ordering::AcqRel);
                }
                Color::White => {
                    self.white[idx].fetch_add(1, Ordering::AcqRel);
                }
                _ => {}
            }
        }

        self.playouts.fetch_add(1, Ordering::AcqRel);
    }

    fn index(&self, p: Point, board: &Board) -> usize {
        let (x, y) = board.xy_of(p);
        y * self.size + x
    }

    fn shares(&self, idx: usize) -> (f32, f32) {
        let playouts = self.playouts().max(1) as f32;
        (
            self.black[idx].load(Ordering::Acquire) as f32 / playouts,
            self.white[idx].load(Ordering::Acquire) as f32 / playouts,
        )
    }

    /// The color that owns `p` once the map has enough data, `None` if
    /// undecided (too few playouts, or neither color clears `GJ_THRES`).
    fn point_owner(&self, idx: usize) -> Option<Color> {
        if self.playouts() < GJ_MINGAMES {
            return None;
        }

        let (black, white) = self.shares(idx);
        if black >= GJ_THRES {
            Some(Color::Black)
        } else if white >= GJ_THRES {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Full four-way classification for `printhook` (spec.md §6): `Dame`
    /// when neither color has ever held the point across enough playouts to
    /// be a contested-but-stable neutral point, `Unclear` when there simply
    /// isn't enough data or the shares are genuinely split.
    pub fn classify(&self, board: &Board, p: Point) -> PointStatus {
        if self.playouts() < GJ_MINGAMES {
            return PointStatus::Unclear;
        }

        let (black, white) = self.shares(self.index(p, board));

        if black >= GJ_THRES {
            PointStatus::Black
        } else if white >= GJ_THRES {
            PointStatus::White
        } else if black + white <= 1.0 - GJ_THRES {
            PointStatus::Dame
        } else {
            PointStatus::Unclear
        }
    }

    /// Whether every point on the board has a decided owner — nothing left
    /// worth playing out, so the controller may treat an opponent pass as
    /// safe to mirror (spec.md §4.8 `uct_pass_is_safe`).
    pub fn uct_pass_is_safe(&self, board: &Board) -> bool {
        if self.playouts() < GJ_MINGAMES {
            return false;
        }

        board.points().into_iter().all(|p| self.point_owner(self.index(p, board)).is_some())
    }

    /// Groups whose majority of points are owned by the opposing color,
    /// i.e. stones a scorer should remove before counting territory (spec.md
    /// §4.8 `dead_group_list`).
    pub fn dead_group_list(&self, board: &Board) -> Vec<Group> {
        board
            .groups()
            .into_iter()
            .filter(|group| {
                let opposing = group.color.opposite();
                let dead_votes = group
                    .points
                    .iter()
                    .filter(|&&p| self.point_owner(self.index(p, board)) == Some(opposing))
                    .count();
                dead_votes * 2 > group.points.len()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ishi_board::Coord;

    #[test]
    fn fresh_map_is_not_pass_safe() {
        let board = Board::new(9);
        let owner_map = OwnerMap::new(9);
        assert!(!owner_map.uct_pass_is_safe(&board));
    }

    #[test]
    fn an_empty_board_never_becomes_pass_safe() {
        let board = Board::new(9);
        let owner_map = OwnerMap::new(9);
        for _ in 0..GJ_MINGAMES {
            owner_map.record(&board);
        }
        // no single-color-bordered territory exists anywhere on an empty
        // board, so nothing is ever decided, however much data accrues.
        assert!(!owner_map.uct_pass_is_safe(&board));
    }

    #[test]
    fn dead_group_list_is_empty_with_no_data() {
        let mut board = Board::new(9);
        board.play(Color::Black, Coord::Point(board.point_of(4, 4))).unwrap();
        let owner_map = OwnerMap::new(9);
        assert!(owner_map.dead_group_list(&board).is_empty());
    }

    #[test]
    fn a_surrounded_eye_becomes_pass_safe_once_enough_playouts_agree() {
        let mut board = Board::new(9);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (x, y) = (4 + dx, 4 + dy);
            board
                .play(Color::Black, Coord::Point(board.point_of(x as usize, y as usize)))
                .unwrap();
            board.play(Color::White, Coord::Pass).unwrap();
        }

        let owner_map = OwnerMap::new(9);
        for _ in 0..GJ_MINGAMES {
            owner_map.record(&board);
        }

        // only the center eye and the four Black stones are decided; the
        // rest of the 9x9 board is still open, contested territory.
        assert!(!owner_map.uct_pass_is_safe(&board));

        let center = board.point_of(4, 4);
        assert_eq!(owner_map.point_owner(owner_map.index(center, &board)), Some(Color::Black));
    }
}
