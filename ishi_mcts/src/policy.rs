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

//! The two external collaborators spec.md §1 puts out of scope: the random
//! playout policy and the node-expansion prior. Both are traits so the
//! search core stays polymorphic over them (design note in spec.md §9); each
//! gets one concrete, intentionally simple default so the engine is usable
//! end to end without pattern tables, gamma tables, or a trained network.

use ishi_board::{Board, Color, Coord};
use rand::rngs::SmallRng;
use rand::Rng;

/// `choose(board, color) -> move` from spec.md §1, with an optional
/// `assess` hook a caller can use to post-process a prior map (e.g. a
/// policy that knows about capture tactics could sharpen the map it was
/// handed). Implementors own their own randomness source so that a fixed
/// `force_seed` (spec.md §6, §8 scenario 5) is reproducible per worker.
pub trait PlayoutPolicy: Send + Sync {
    fn choose(&self, board: &Board, color: Color, rng: &mut SmallRng) -> Coord;

    fn assess(&self, _board: &Board, _prior_map: &mut [f32]) {}
}

/// Uniform-random legal move, never filling its own one-point eyes. This is
/// the simplest policy that still plays out a finite game: it is the
/// opaque collaborator's minimal viable implementation, not a strength
/// attempt — pattern/gamma tables are explicitly out of scope (spec.md §1).
#[derive(Default)]
pub struct RandomPlayoutPolicy;

impl PlayoutPolicy for RandomPlayoutPolicy {
    fn choose(&self, board: &Board, color: Color, rng: &mut SmallRng) -> Coord {
        let candidates: Vec<_> = board
            .legal_moves(color)
            .into_iter()
            .filter(|&p| !board.is_one_point_eye(color, p))
            .collect();

        if candidates.is_empty() {
            Coord::Pass
        } else {
            let idx = rng.gen_range(0..candidates.len());
            Coord::Point(candidates[idx])
        }
    }
}

/// `priors computed at node expansion` (spec.md §1) are out of scope; this
/// is the trait boundary a real prior module would implement.
pub trait Prior: Send + Sync {
    /// One weight per entry of `legal`, any positive scale (the tree
    /// normalizes internally). Longer lists than `legal` or NaNs are a
    /// caller bug, not something the tree defends against.
    fn priors(&self, board: &Board, color: Color, legal: &[ishi_board::Point]) -> Vec<f32>;
}

/// Every candidate move starts with the same weight — the stand-in for a
/// trained policy network's prior distribution.
#[derive(Default)]
pub struct UniformPrior;

impl Prior for UniformPrior {
    fn priors(&self, _board: &Board, _color: Color, legal: &[ishi_board::Point]) -> Vec<f32> {
        vec![1.0; legal.len()]
    }
}
