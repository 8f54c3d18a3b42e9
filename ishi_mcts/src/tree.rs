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

//! The in-memory search tree (spec.md §3, §4.1). Nodes live in a
//! `boxcar::Vec` — an append-only, lock-free arena with stable indices —
//! so that concurrent descenders can read a node while another thread
//! expands a different one without a global lock. `fast_alloc` reuses the
//! same arena but refuses to grow once `max_tree_size` worth of nodes have
//! been allocated, matching spec.md §5's "expansion fails silently when
//! exhausted".

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use ishi_board::{Board, Color, Coord};

use crate::policy::Prior;

pub type NodeId = u32;

const VALUE_SCALE: f64 = 1_000_000.0;

/// `{playouts, value}` under the atomic discipline of spec.md §4.1: readers
/// take a single atomic load of each counter and accept the occasional
/// inconsistency between them.
#[derive(Default)]
pub struct Stats {
    playouts: AtomicU32,
    value_scaled: AtomicU64,
    /// In-flight virtual-loss visits (spec.md §4.1 "Virtual loss").
    running: AtomicU32,
}

impl Stats {
    pub fn playouts(&self) -> u32 {
        self.playouts.load(Ordering::Acquire)
    }

    /// `value = sum / playouts`, from the mover's perspective stored at
    /// backup time. Returns `0.5` for a never-visited node.
    pub fn value(&self) -> f32 {
        let playouts = self.playouts.load(Ordering::Acquire);
        if playouts == 0 {
            return 0.5;
        }

        let sum = self.value_scaled.load(Ordering::Acquire) as f64;
        (sum / VALUE_SCALE / playouts as f64) as f32
    }

    /// Value as seen by a selector while virtual loss is in flight: every
    /// in-flight visit counts as a loss (value contribution zero) until it
    /// either resolves or is reversed.
    pub fn value_with_virtual_loss(&self) -> f32 {
        let running = self.running.load(Ordering::Acquire);
        if running == 0 {
            return self.value();
        }

        let playouts = self.playouts.load(Ordering::Acquire);
        let sum = self.value_scaled.load(Ordering::Acquire) as f64 / VALUE_SCALE;
        let total = playouts as f64 + running as f64;

        if total == 0.0 {
            0.5
        } else {
            (sum / total) as f32
        }
    }

    pub fn effective_playouts(&self) -> u32 {
        self.playouts.load(Ordering::Acquire) + self.running.load(Ordering::Acquire)
    }

    pub fn add_result(&self, result: f32) {
        self.value_scaled
            .fetch_add((result as f64 * VALUE_SCALE) as u64, Ordering::AcqRel);
        self.playouts.fetch_add(1, Ordering::AcqRel);
    }

    pub fn add_virtual_loss(&self) {
        self.running.fetch_add(1, Ordering::AcqRel);
    }

    pub fn remove_virtual_loss(&self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A node in the search tree (spec.md §3).
pub struct TreeNode {
    /// The move leading to this node from its parent.
    pub coord: Coord,
    /// The color that played `coord`.
    pub color: Color,
    /// Logical back-link, used only for ascent during backup.
    pub parent: Option<NodeId>,
    /// Initial prior weight installed at expansion (spec.md §4.1).
    pub prior: f32,
    pub stats: Stats,
    /// All-moves-as-first statistics for UCB1-AMAF (spec.md §4.2).
    pub rave: Stats,
    children: RwLock<Vec<NodeId>>,
    expanded: AtomicBool,
    expanding: AtomicBool,
}

impl TreeNode {
    fn new(coord: Coord, color: Color, parent: Option<NodeId>, prior: f32) -> Self {
        Self {
            coord,
            color,
            parent,
            prior,
            stats: Stats::default(),
            rave: Stats::default(),
            children: RwLock::new(Vec::new()),
            expanded: AtomicBool::new(false),
            expanding: AtomicBool::new(false),
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded.load(Ordering::Acquire)
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.children.read().expect("children lock poisoned").clone()
    }
}

/// Outcome of descending one step in `Tree::expand` contention (spec.md
/// §4.1: "losers either spin briefly or fall through to playout").
#[derive(Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
    Expanded,
    AlreadyExpanded,
    LostRace,
    ArenaExhausted,
}

/// The search tree plus the global metadata of spec.md §3.
pub struct Tree {
    nodes: boxcar::Vec<TreeNode>,
    root: AtomicU32,
    pub root_color: Color,
    pub extra_komi: f32,
    byte_count: AtomicUsize,
    fast_alloc: bool,
    node_cap: Option<usize>,
}

/// Rough per-node footprint used to translate `max_tree_size` (bytes) into
/// a node-count cap for `fast_alloc` mode.
const BYTES_PER_NODE: usize = std::mem::size_of::<TreeNode>() + 64;

impl Tree {
    /// `tree_init` from spec.md §4.1: root has `coord = pass`,
    /// `color = opposite(root_color)` so the root's own children are
    /// `root_color` to move.
    pub fn init(root_color: Color, max_tree_size: usize, fast_alloc: bool) -> Self {
        let nodes = boxcar::Vec::new();
        nodes.push(TreeNode::new(Coord::Pass, root_color.opposite(), None, 1.0));

        Self {
            nodes,
            root: AtomicU32::new(0),
            root_color,
            extra_komi: 0.0,
            byte_count: AtomicUsize::new(BYTES_PER_NODE),
            fast_alloc,
            node_cap: if fast_alloc { Some(max_tree_size / BYTES_PER_NODE) } else { None },
        }
    }

    pub fn root_id(&self) -> NodeId {
        self.root.load(Ordering::Acquire)
    }

    pub fn root(&self) -> &TreeNode {
        self.node(self.root_id())
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.count()
    }

    pub fn byte_count(&self) -> usize {
        self.byte_count.load(Ordering::Relaxed)
    }

    pub fn memory_exceeded(&self, max_tree_size: usize) -> bool {
        self.byte_count() >= max_tree_size
    }

    /// `expand(node, board)` from spec.md §4.1.
    pub fn expand(&self, id: NodeId, board: &Board, prior: &dyn Prior) -> ExpandOutcome {
        let node = self.node(id);

        if node.is_expanded() {
            return ExpandOutcome::AlreadyExpanded;
        }

        if node
            .expanding
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return ExpandOutcome::LostRace;
        }

        // double check after winning the race: another thread may have
        // finished expanding between our first check and the CAS.
        if node.is_expanded() {
            node.expanding.store(false, Ordering::Release);
            return ExpandOutcome::AlreadyExpanded;
        }

        if self.fast_alloc {
            if let Some(cap) = self.node_cap {
                if self.nodes.count() >= cap {
                    node.expanding.store(false, Ordering::Release);
                    return ExpandOutcome::ArenaExhausted;
                }
            }
        }

        let to_move = node.color.opposite();
        let legal: Vec<_> = board
            .legal_moves(to_move)
            .into_iter()
            .filter(|&p| !board.is_one_point_eye(to_move, p))
            .collect();
        let priors = prior.priors(board, to_move, &legal);

        let mut child_ids = Vec::with_capacity(legal.len().max(1));

        if legal.is_empty() {
            child_ids.push(self.push_child(Coord::Pass, to_move, id, 1.0));
        } else {
            for (point, weight) in legal.into_iter().zip(priors) {
                child_ids.push(self.push_child(Coord::Point(point), to_move, id, weight));
            }
        }

        *node.children.write().expect("children lock poisoned") = child_ids;
        node.expanded.store(true, Ordering::Release);
        node.expanding.store(false, Ordering::Release);

        ExpandOutcome::Expanded
    }

    fn push_child(&self, coord: Coord, color: Color, parent: NodeId, prior: f32) -> NodeId {
        self.byte_count.fetch_add(BYTES_PER_NODE, Ordering::Relaxed);
        self.nodes.push(TreeNode::new(coord, color, Some(parent), prior)) as NodeId
    }

    /// `promote(tree, coord)` from spec.md §4.1: makes the child matching
    /// `coord` the new root, reclaiming the rest of the tree by rebuilding a
    /// fresh arena (outside `fast_alloc`, where subtrees are simply
    /// unreferenced instead).
    pub fn promote(self, coord: Coord) -> Result<Tree, Tree> {
        if self.root().coord == coord {
            // Already promoted — `genmove` promotes its own chosen move
            // before returning, and a front-end that also calls
            // `notify_play` for that same move (spec.md §6 "called for each
            // move played by either side") should find this a harmless
            // no-op rather than searching for `coord` among the new root's
            // children, where it no longer appears.
            return Ok(self);
        }

        let root = self.root();
        let child_id = root.children().into_iter().find(|&id| self.node(id).coord == coord);

        let Some(child_id) = child_id else {
            return Err(self);
        };

        if self.fast_alloc {
            let new_root_color = self.node(child_id).color.opposite();
            let fast_alloc = self.fast_alloc;
            let node_cap = self.node_cap;
            let extra_komi = self.extra_komi;
            Ok(Tree {
                nodes: self.nodes,
                root: AtomicU32::new(child_id),
                root_color: new_root_color,
                extra_komi,
                byte_count: self.byte_count,
                fast_alloc,
                node_cap,
            })
        } else {
            let rebuilt = boxcar::Vec::new();
            let new_root_color = self.node(child_id).color.opposite();
            Self::copy_subtree(&self.nodes, child_id, None, &rebuilt);

            Ok(Tree {
                nodes: rebuilt,
                root: AtomicU32::new(0),
                root_color: new_root_color,
                extra_komi: self.extra_komi,
                byte_count: AtomicUsize::new(BYTES_PER_NODE),
                fast_alloc: false,
                node_cap: None,
            })
        }
    }

    /// A fresh, independently owned deep copy rooted at the current root,
    /// used to give each ROOT-mode worker its own private tree (spec.md
    /// §4.4).
    pub fn deep_clone(&self) -> Tree {
        let rebuilt = boxcar::Vec::new();
        Self::copy_subtree(&self.nodes, self.root_id(), None, &rebuilt);

        Tree {
            nodes: rebuilt,
            root: AtomicU32::new(0),
            root_color: self.root_color,
            extra_komi: self.extra_komi,
            byte_count: AtomicUsize::new(self.byte_count()),
            fast_alloc: false,
            node_cap: None,
        }
    }

    fn copy_subtree(src: &boxcar::Vec<TreeNode>, id: NodeId, new_parent: Option<NodeId>, dst: &boxcar::Vec<TreeNode>) -> NodeId {
        let old = &src[id as usize];
        let mut copy = TreeNode::new(old.coord, old.color, new_parent, old.prior);
        copy.stats = Stats {
            playouts: AtomicU32::new(old.stats.playouts()),
            value_scaled: AtomicU64::new((old.stats.value() as f64 * VALUE_SCALE * old.stats.playouts() as f64) as u64),
            running: AtomicU32::new(0),
        };
        let new_id = dst.push(copy) as NodeId;

        let child_ids: Vec<NodeId> = old
            .children()
            .into_iter()
            .map(|cid| Self::copy_subtree(src, cid, Some(new_id), dst))
            .collect();
        *dst[new_id as usize].children.write().expect("children lock poisoned") = child_ids;

        new_id
    }

    /// `merge(dst, src)` from spec.md §4.1: used only in ROOT mode, adds
    /// per-coordinate statistics of matching nodes. Open question (spec.md
    /// §9): AMAF statistics are not merged, only direct `stats`, matching
    /// the teacher-observed ambiguity the spec calls out — see DESIGN.md.
    pub fn merge(dst_id: NodeId, dst: &Tree, src_id: NodeId, src: &Tree) {
        let dst_node = dst.node(dst_id);
        let src_node = src.node(src_id);

        let playouts = src_node.stats.playouts();
        if playouts > 0 {
            dst_node.stats.playouts.fetch_add(playouts, Ordering::AcqRel);
            dst_node.stats.value_scaled.fetch_add(
                (src_node.stats.value() as f64 * VALUE_SCALE * playouts as f64) as u64,
                Ordering::AcqRel,
            );
        }

        if !dst_node.is_expanded() && src_node.is_expanded() {
            return;
        }

        for src_child in src_node.children() {
            let src_child_node = src.node(src_child);
            if let Some(dst_child) = dst_node
                .children()
                .into_iter()
                .find(|&id| dst.node(id).coord == src_child_node.coord)
            {
                Self::merge(dst_child, dst, src_child, src);
            }
        }
    }

    /// `normalize(tree, k)` from spec.md §4.1: divides all statistics by
    /// `k` (post-merge averaging).
    pub fn normalize(&self, id: NodeId, k: u32) {
        let node = self.node(id);
        let playouts = node.stats.playouts();

        if playouts > 0 && k > 1 {
            let value = node.stats.value();
            node.stats.playouts.store(playouts / k, Ordering::Release);
            node.stats
                .value_scaled
                .store((value as f64 * VALUE_SCALE * (playouts / k) as f64) as u64, Ordering::Release);
        }

        for child in node.children() {
            self.normalize(child, k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::UniformPrior;
    use ishi_board::Board;

    #[test]
    fn root_children_are_root_color() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);

        for child in tree.root().children() {
            assert_eq!(tree.node(child).color, Color::Black);
        }
    }

    #[test]
    fn stats_are_always_in_unit_range() {
        let stats = Stats::default();
        assert!((0.0..=1.0).contains(&stats.value()));
        stats.add_result(0.25);
        stats.add_result(0.75);
        assert_eq!(stats.playouts(), 2);
        assert!((0.0..=1.0).contains(&stats.value()));
    }

    #[test]
    fn virtual_loss_pulls_value_toward_zero() {
        let stats = Stats::default();
        stats.add_result(1.0);
        let before = stats.value_with_virtual_loss();
        stats.add_virtual_loss();
        let after = stats.value_with_virtual_loss();
        assert!(after < before);
        stats.remove_virtual_loss();
        assert_eq!(stats.value_with_virtual_loss(), before);
    }

    #[test]
    fn promote_fails_for_unplayed_coord() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);

        let result = tree.promote(Coord::Resign);
        assert!(result.is_err());
    }

    #[test]
    fn promote_preserves_child_playouts() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);

        let child_id = tree.root().children()[0];
        let child_coord = tree.node(child_id).coord;
        tree.node(child_id).stats.add_result(1.0);
        tree.node(child_id).stats.add_result(1.0);

        let promoted = tree.promote(child_coord).ok().unwrap();
        assert_eq!(promoted.root().stats.playouts(), 2);
    }

    #[test]
    fn promoting_to_the_coord_already_at_the_root_is_a_no_op() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        let board = Board::new(9);
        tree.expand(tree.root_id(), &board, &UniformPrior);
        tree.root().stats.add_result(1.0);

        let already_root_coord = tree.root().coord;
        let promoted = tree.promote(already_root_coord).ok().unwrap();
        assert_eq!(promoted.root().coord, already_root_coord);
        assert_eq!(promoted.root().stats.playouts(), 1);
    }

    #[test]
    fn normalize_divides_playouts() {
        let tree = Tree::init(Color::Black, 1 << 20, false);
        tree.root().stats.add_result(1.0);
        tree.root().stats.add_result(1.0);
        tree.root().stats.add_result(1.0);
        tree.root().stats.add_result(1.0);
        tree.normalize(tree.root_id(), 2);
        assert_eq!(tree.root().stats.playouts(), 2);
    }
}
