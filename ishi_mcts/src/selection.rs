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

//! Node selection (spec.md §4.2): UCB1 and UCB1-AMAF (RAVE), both exposing
//! `choose`/`evaluate`/`winner` over a `Tree`.

use ordered_float::OrderedFloat;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::tree::{NodeId, Tree};

pub enum SelectionPolicy {
    Ucb1 { exploration: f64 },
    Rave { rave_equiv: u32 },
}

impl SelectionPolicy {
    pub fn ucb1(exploration: f64) -> Self {
        SelectionPolicy::Ucb1 { exploration }
    }

    pub fn rave(rave_equiv: u32) -> Self {
        SelectionPolicy::Rave { rave_equiv }
    }

    /// Urgency score for one child, used by both `choose` (max over
    /// children) and diagnostics.
    pub fn evaluate(&self, tree: &Tree, parent: NodeId, child: NodeId) -> f64 {
        let node = tree.node(child);
        let effective = node.stats.effective_playouts();

        if effective == 0 {
            // unvisited children must be sampled once before a UCB-style
            // estimate means anything; the prior breaks ties among them.
            // The offset comfortably dominates any finite urgency score
            // without saturating to infinity, so `prior` still orders ties.
            return 1e9 + node.prior as f64;
        }

        match self {
            SelectionPolicy::Ucb1 { exploration } => {
                let value = node.stats.value_with_virtual_loss() as f64;
                let parent_playouts = tree.node(parent).stats.effective_playouts().max(1) as f64;
                value + exploration * (parent_playouts.ln() / effective as f64).sqrt()
            }
            SelectionPolicy::Rave { rave_equiv } => {
                let value = node.stats.value_with_virtual_loss() as f64;
                let rave_playouts = node.rave.playouts();

                if rave_playouts == 0 {
                    value
                } else {
                    let rave_value = node.rave.value() as f64;
                    let v = effective as f64;
                    let beta = rave_playouts as f64 / (rave_playouts as f64 + v + v * rave_playouts as f64 / *rave_equiv as f64);
                    beta * rave_value + (1.0 - beta) * value
                }
            }
        }
    }

    /// Pick the highest-urgency child of `node`, or `None` if it has no
    /// children (spec.md §7: "no legal moves in selection — caller returns
    /// pass").
    pub fn choose(&self, tree: &Tree, node: NodeId) -> Option<NodeId> {
        tree.node(node)
            .children()
            .into_iter()
            .max_by_key(|&child| OrderedFloat(self.evaluate(tree, node, child)))
    }

    /// The most-played child, used as the "winner" gate of spec.md §4.5
    /// step 7.
    pub fn winner(&self, tree: &Tree, node: NodeId) -> Option<NodeId> {
        tree.node(node)
            .children()
            .into_iter()
            .max_by_key(|&child| tree.node(child).stats.playouts())
    }
}

/// An optional secondary random policy used on a configurable 1-in-N basis
/// to diversify exploration (spec.md §4.2).
pub fn maybe_randomize(every: Option<u32>, rng: &mut SmallRng, choices: &[NodeId]) -> Option<NodeId> {
    let every = every?;
    if choices.is_empty() {
        return None;
    }

    if rng.gen_range(0..every) == 0 {
        Some(choices[rng.gen_range(0..choices.len())])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::UniformPrior;
    use crate::tree::Tree;
    use ishi_board::{Board, Color};

    #[test]
    fn unvisited_children_are_chosen_first() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);

        let policy = SelectionPolicy::ucb1(1.0);
        let chosen = policy.choose(&tree, tree.root_id()).unwrap();
        assert_eq!(tree.node(chosen).stats.playouts(), 0);
    }

    #[test]
    fn ucb1_prefers_higher_value_once_visited() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);

        let children = tree.root().children();
        for &child in &children {
            tree.node(child).stats.add_result(0.1);
        }
        tree.node(children[0]).stats.add_result(0.9);

        let policy = SelectionPolicy::ucb1(0.0);
        let chosen = policy.choose(&tree, tree.root_id()).unwrap();
        assert_eq!(chosen, children[0]);
    }
}
