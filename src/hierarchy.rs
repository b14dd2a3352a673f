//! The hierarchy produced by folding: every level of clusters, the root
//! level, and the tools to read it back.
//!
//! # Structure
//!
//! ```text
//! root:     [c5]  [c6]          <- final level, owners empty
//!            /\     \
//! level 1: [c0] [c1] [c2]       <- overlapping: an item may have
//!            \  /  \  |            several owners
//! leaves:   n0  n1  n2 n3       <- initial nodes
//! ```
//!
//! Descendants point strictly down, owners strictly up; both are indices
//! into the arenas owned here, so no reference cycles exist. Clusters are
//! stored in allocation order and each folding iteration contributes one
//! contiguous level range.
//!
//! Overlap is resolved at query time: [`Hierarchy::unwrap`] descends
//! breadth-first and divides a parent's share evenly among each
//! descendant's owners, accumulating the fractions reaching each leaf.

use std::collections::HashMap;
use std::ops::Range;

use crate::graph::{Id, Share};
use crate::model::{Cluster, ItemRef, Node};

/// Hierarchy evaluation measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct Score {
    /// Total final modularity.
    pub modularity: f32,
}

/// A multi-level hierarchy of (possibly overlapping) clusters over the
/// initial nodes.
#[derive(Debug)]
pub struct Hierarchy {
    nodes: Vec<Node>,
    clusters: Vec<Cluster>,
    levels: Vec<Range<usize>>,
    root: Vec<usize>,
    score: Score,
    traverse_pos: usize,
}

impl Hierarchy {
    pub(crate) fn new(
        nodes: Vec<Node>,
        clusters: Vec<Cluster>,
        levels: Vec<Range<usize>>,
        root: Vec<usize>,
        score: Score,
    ) -> Self {
        Self {
            nodes,
            clusters,
            levels,
            root,
            score,
            traverse_pos: 0,
        }
    }

    /// The initial nodes (hierarchy leaves).
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every cluster ever allocated, in allocation order.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Cluster-arena indices of the topmost level.
    pub fn root(&self) -> &[usize] {
        &self.root
    }

    /// Root clusters themselves.
    pub fn root_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.root.iter().map(|&ci| &self.clusters[ci])
    }

    /// Final score of the hierarchy.
    pub fn score(&self) -> &Score {
        &self.score
    }

    /// Number of folded levels.
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Clusters of level `lv` (0 is just above the leaves).
    pub fn level(&self, lv: usize) -> &[Cluster] {
        &self.clusters[self.levels[lv].clone()]
    }

    /// Node by arena index.
    pub fn node(&self, ni: usize) -> &Node {
        &self.nodes[ni]
    }

    /// Cluster by arena index.
    pub fn cluster(&self, ci: usize) -> &Cluster {
        &self.clusters[ci]
    }

    /// Id of any item.
    pub fn item_id(&self, item: ItemRef) -> Id {
        match item {
            ItemRef::Leaf(ni) => self.nodes[ni].id,
            ItemRef::Inner(ci) => self.clusters[ci].id,
        }
    }

    /// Unwrap an item into its underlying nodes with membership shares.
    ///
    /// A descendant inherits its parent's share divided by the number of
    /// its owners; fractions reaching the same leaf over different paths
    /// accumulate. Unwrapping a leaf yields the trivial `{id -> 1}`.
    pub fn unwrap(&self, item: ItemRef) -> HashMap<Id, Share> {
        let mut shares: HashMap<Id, Share> = HashMap::new();
        let mut level: HashMap<ItemRef, f64> = HashMap::from([(item, 1.0)]);
        while !level.is_empty() {
            let mut next: HashMap<ItemRef, f64> = HashMap::new();
            for (it, share) in level {
                match it {
                    ItemRef::Inner(ci) => {
                        for &desc in &self.clusters[ci].descs {
                            let owners = match desc {
                                ItemRef::Leaf(ni) => self.nodes[ni].owners.len(),
                                ItemRef::Inner(di) => self.clusters[di].owners.len(),
                            };
                            *next.entry(desc).or_insert(0.0) += share / owners.max(1) as f64;
                        }
                    }
                    ItemRef::Leaf(ni) => {
                        *shares.entry(self.nodes[ni].id).or_insert(0.0) += share as Share;
                    }
                }
            }
            level = next;
        }
        shares
    }

    /// Visit the next hierarchy level from the bottom up, invoking `op`
    /// for every cluster in it with an initial-call marker.
    ///
    /// The traversal is cyclic and stateful: the first call visits the
    /// bottom level, each following call advances one level toward the
    /// root, and once every level was visited the call returns `false`
    /// and rewinds to the bottom.
    pub fn traverse_next_level<F>(&mut self, mut op: F) -> bool
    where
        F: FnMut(&Cluster, bool),
    {
        if self.traverse_pos >= self.levels.len() {
            self.traverse_pos = 0;
            return false;
        }
        let range = self.levels[self.traverse_pos].clone();
        for (i, cl) in self.clusters[range].iter().enumerate() {
            op(cl, i == 0);
        }
        self.traverse_pos += 1;
        true
    }

    /// Rewind the level traversal to the bottom level.
    pub fn reset_traversing(&mut self) {
        self.traverse_pos = 0;
    }
}
