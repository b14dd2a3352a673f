//! Hierarchical folding: the clustering engine.
//!
//! Folding builds a multi-level hierarchy of overlapping communities by
//! repeatedly fusing mutually-best candidates:
//!
//! 1. **Gain evaluation**: for every item of the current level, compute
//!    the modularity delta of merging it with each linked neighbour and
//!    record the neighbours achieving the maximum.
//! 2. **Matching**: form groups from the mutual-best relation: maximal
//!    cliques in strict mode, connected components in fast mode. An item
//!    lying in several cliques joins all of them, producing overlapping
//!    clusters.
//! 3. **Propagation**: items with a positive but one-sided preference are
//!    pulled into the group they improve most.
//! 4. **Materialization**: each group becomes a cluster accumulating its
//!    members' weights and links; unmatched items survive to the next
//!    level unchanged.
//!
//! The loop stops when no group can form, when the prospective modularity
//! gain drops to the profit margin, or when a single item remains. The
//! final level's clusters are the hierarchy root.
//!
//! Two runs over the same input with shuffling disabled produce identical
//! hierarchies: every tie-break is by ascending id and iteration follows
//! the level order.
//!
//! ## References
//!
//! - Newman & Girvan (2004). "Finding and evaluating community structure
//!   in networks." (modularity)
//! - Blondel et al. (2008). "Fast unfolding of communities in large
//!   networks." (multi-level folding)

mod context;
mod gain;
mod matching;
mod validate;

pub use context::{Clusterable, Context, LevelState};
pub use gain::{gain, group_gain, modularity, total_weight};
pub use matching::{compute_contexts, match_fast, match_strict, propagate, MatchedGroup};
pub use validate::validate_links;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::error::{Error, Result};
use crate::hierarchy::{Hierarchy, Score};
use crate::model::{Cluster, ItemRef, Node};

/// Default modularity profit margin: permissive enough to run to natural
/// convergence while keeping iteration tracing on.
pub const DEFAULT_MARGIN: f32 = -0.999;

/// Folding options.
///
/// ```rust
/// use netfold::fold::Folding;
/// use netfold::graph::GraphBuilder;
///
/// let mut builder = GraphBuilder::new(3);
/// builder.add_nodes(&[0, 1, 2]).unwrap();
/// builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
/// builder.add_node_links(1, [2.into()], false).unwrap();
///
/// let hierarchy = Folding::new().fold(builder.finalize()).unwrap();
/// assert_eq!(hierarchy.root().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Folding {
    /// Whether links are symmetric (unsigned and undirected), enabling
    /// the simplified modularity formula.
    symmetric: bool,
    /// Whether to validate link consistency before folding.
    validate: bool,
    /// Quasi-mutual (chained) matching instead of strictly mutual.
    fast: bool,
    /// Modularity profit margin: folding stops once an iteration gains
    /// no more than this. `-1` additionally disables iteration tracing.
    margin: f32,
}

impl Folding {
    /// Create folding options with defaults: symmetric, validated,
    /// strictly mutual, margin [`DEFAULT_MARGIN`].
    pub fn new() -> Self {
        Self {
            symmetric: true,
            validate: true,
            fast: false,
            margin: DEFAULT_MARGIN,
        }
    }

    /// Set whether the graph is symmetric (unsigned, undirected).
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Enable or disable pre-folding link validation.
    pub fn with_validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Enable quasi-mutual (fast) matching.
    pub fn with_fast(mut self, fast: bool) -> Self {
        self.fast = fast;
        self
    }

    /// Set the modularity profit margin, in `[-1, 1]`.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Fold the nodes into a hierarchy of overlapping clusters.
    ///
    /// # Errors
    /// [`Error::EmptyInput`] without nodes; validation errors when
    /// enabled and the links are inconsistent.
    pub fn fold(&self, mut nodes: Vec<Node>) -> Result<Hierarchy> {
        if nodes.is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.validate {
            validate_links(&mut nodes, self.symmetric)?;
        }
        let trace = self.margin > -1.0;
        let margin = self.margin as f64;
        let total = total_weight(&nodes);

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut level_ranges = Vec::new();
        let id_gen = AtomicU32::new(0);

        let items: Vec<ItemRef> = (0..nodes.len()).map(ItemRef::Leaf).collect();
        let mut level = LevelState::prepare(items, &nodes, &clusters);
        let mut q = modularity(&level, total, self.symmetric);
        if trace {
            debug!(nodes = nodes.len(), total, q, "folding baseline");
        }

        let mut iteration = 0usize;
        while level.len() > 1 {
            let mut ctxs = compute_contexts(&level, total, self.symmetric);
            let mut groups = if self.fast {
                match_fast(&level, &mut ctxs)
            } else {
                match_strict(&level, &ctxs)
            };
            if groups.is_empty() {
                break;
            }
            let mut dq: f64 = groups
                .iter()
                .map(|g| group_gain(&level, &g.members, total, self.symmetric))
                .sum();
            dq += propagate(&level, &ctxs, &mut groups, total, self.symmetric, self.fast);
            if dq <= margin {
                break;
            }

            let start = clusters.len();
            materialize(&groups, &level, &mut nodes, &mut clusters, &id_gen);
            level_ranges.push(start..clusters.len());

            // Next level: the new clusters, then the unmatched survivors.
            let mut matched = vec![false; level.len()];
            for g in &groups {
                for &m in &g.members {
                    matched[m] = true;
                }
            }
            let next_items: Vec<ItemRef> = (start..clusters.len())
                .map(ItemRef::Inner)
                .chain(
                    level
                        .items
                        .iter()
                        .enumerate()
                        .filter(|&(m, _)| !matched[m])
                        .map(|(_, &it)| it),
                )
                .collect();

            level = LevelState::prepare(next_items, &nodes, &clusters);
            let q_next = modularity(&level, total, self.symmetric);
            iteration += 1;
            if trace {
                debug!(
                    iteration,
                    formed = groups.len(),
                    level = level.len(),
                    q = q_next,
                    dq = q_next - q,
                    "folding iteration"
                );
            }
            q = q_next;
        }

        let root: Vec<usize> = level.items.iter().filter_map(ItemRef::as_inner).collect();
        if trace {
            debug!(
                roots = root.len(),
                clusters = clusters.len(),
                modularity = q,
                "folding finished"
            );
        }
        Ok(Hierarchy::new(
            nodes,
            clusters,
            level_ranges,
            root,
            Score {
                modularity: q as f32,
            },
        ))
    }
}

impl Default for Folding {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn matched groups into clusters: allocate ids, wire owners both
/// ways, accumulate self weights and inter-cluster links.
fn materialize(
    groups: &[MatchedGroup],
    level: &LevelState,
    nodes: &mut [Node],
    clusters: &mut Vec<Cluster>,
    id_gen: &AtomicU32,
) {
    let start = clusters.len();
    let mut groups_of: Vec<Vec<usize>> = vec![Vec::new(); level.len()];
    for (gi, g) in groups.iter().enumerate() {
        for &m in &g.members {
            groups_of[m].push(gi);
        }
    }

    for g in groups {
        let mut cl = Cluster::new(id_gen.fetch_add(1, Ordering::Relaxed));
        cl.descs = g.members.iter().map(|&m| level.items[m]).collect();
        cl.core = Some(level.items[g.core]);
        clusters.push(cl);
    }

    for (gi, g) in groups.iter().enumerate() {
        let ci = start + gi;
        let members: HashSet<usize> = g.members.iter().copied().collect();
        let mut self_weight = 0.0;
        for &m in &g.members {
            self_weight += level.self_weight[m];
            for &(j, w) in &level.out[m] {
                if members.contains(&j) {
                    self_weight += w;
                } else if groups_of[j].is_empty() {
                    // The destination survives to the next level as is.
                    clusters[ci].accumulate_link(level.items[j], w);
                } else {
                    // Split evenly among the destination's new parents.
                    let share = w / groups_of[j].len() as f64;
                    for &gj in &groups_of[j] {
                        clusters[ci].accumulate_link(ItemRef::Inner(start + gj), share);
                    }
                }
            }
            match level.items[m] {
                ItemRef::Leaf(ni) => nodes[ni].owners.push(ci),
                ItemRef::Inner(di) => clusters[di].owners.push(ci),
            }
        }
        clusters[ci].self_weight = self_weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, InputLink};

    fn triangle_nodes() -> Vec<Node> {
        let mut builder = GraphBuilder::new(3);
        builder.add_nodes(&[0, 1, 2]).unwrap();
        builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
        builder.add_node_links(1, [2.into()], false).unwrap();
        builder.finalize()
    }

    fn pentagon_nodes() -> Vec<Node> {
        let mut builder = GraphBuilder::new(5);
        builder.add_nodes(&[0, 1, 2, 3, 4]).unwrap();
        builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
        builder.add_node_links(3, [1.into(), 4.into()], false).unwrap();
        builder.add_node_links(2, [4.into()], false).unwrap();
        builder.finalize()
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = Folding::new().fold(Vec::new()).unwrap_err();
        assert_eq!(err, Error::EmptyInput);
    }

    #[test]
    fn test_triangle_folds_into_one_cluster() {
        let hierarchy = Folding::new().fold(triangle_nodes()).unwrap();
        assert_eq!(hierarchy.root().len(), 1);
        assert_eq!(hierarchy.clusters().len(), 1);
        let root = &hierarchy.clusters()[0];
        assert_eq!(root.descs.len(), 3);
        assert_eq!(root.self_weight, 3.0);
        assert!(root.links.is_empty());
        assert!(hierarchy.score().modularity.abs() < 1e-6);
    }

    #[test]
    fn test_pentagon_folds_into_overlapping_pairs() {
        let hierarchy = Folding::new().fold(pentagon_nodes()).unwrap();
        assert_eq!(hierarchy.root().len(), 5);
        assert_eq!(hierarchy.level_count(), 1);
        for cl in hierarchy.root_clusters() {
            assert_eq!(cl.descs.len(), 2);
            assert_eq!(cl.self_weight, 1.0);
        }
        // Every node overlaps between exactly two root clusters.
        for node in hierarchy.nodes() {
            assert_eq!(node.owners.len(), 2);
        }
        assert!((hierarchy.score().modularity - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_isolated_node_yields_no_clusters() {
        let mut builder = GraphBuilder::new(1);
        builder.add_nodes(&[0]).unwrap();
        let hierarchy = Folding::new().fold(builder.finalize()).unwrap();
        assert!(hierarchy.root().is_empty());
        assert!(hierarchy.clusters().is_empty());
        assert_eq!(hierarchy.score().modularity, 0.0);
    }

    #[test]
    fn test_positive_margin_prevents_folding() {
        let hierarchy = Folding::new()
            .with_margin(1.0)
            .fold(pentagon_nodes())
            .unwrap();
        assert!(hierarchy.root().is_empty());
        assert!(hierarchy.clusters().is_empty());
        // Baseline modularity of the singleton partition.
        assert!((hierarchy.score().modularity - (-0.2)).abs() < 1e-6);
    }

    #[test]
    fn test_margin_minus_one_converges_silently() {
        let hierarchy = Folding::new()
            .with_margin(-1.0)
            .fold(triangle_nodes())
            .unwrap();
        assert_eq!(hierarchy.root().len(), 1);
    }

    #[test]
    fn test_disconnected_triangles_stay_apart() {
        let mut builder = GraphBuilder::new(6);
        builder.add_nodes(&[0, 1, 2, 3, 4, 5]).unwrap();
        builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
        builder.add_node_links(1, [2.into()], false).unwrap();
        builder.add_node_links(3, [4.into(), 5.into()], false).unwrap();
        builder.add_node_links(4, [5.into()], false).unwrap();
        let hierarchy = Folding::new().fold(builder.finalize()).unwrap();

        assert_eq!(hierarchy.root().len(), 2);
        for cl in hierarchy.root_clusters() {
            assert_eq!(cl.descs.len(), 3);
            assert!(cl.links.is_empty());
        }
        assert!((hierarchy.score().modularity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_overlap_hub_owned_three_times() {
        let mut builder = GraphBuilder::new(4);
        builder.add_nodes(&[0, 1, 2, 3]).unwrap();
        for heavy in [0u32, 1, 3] {
            builder
                .add_node_links(heavy, [InputLink::weighted(heavy, 6.0)], true)
                .unwrap();
        }
        builder
            .add_node_links(2, [0.into(), 1.into(), 3.into()], false)
            .unwrap();
        let hierarchy = Folding::new().fold(builder.finalize()).unwrap();

        assert_eq!(hierarchy.root().len(), 3);
        let hub = hierarchy
            .nodes()
            .iter()
            .find(|n| n.id == 2)
            .expect("hub node");
        assert_eq!(hub.owners.len(), 3);
        // Each root cluster pairs the hub with one heavy partner, which
        // also anchors it as the core.
        for cl in hierarchy.root_clusters() {
            assert_eq!(cl.descs.len(), 2);
            let core = cl.core.expect("core");
            assert_ne!(hierarchy.item_id(core), 2);
        }
    }

    #[test]
    fn test_deterministic_without_shuffle() {
        let run = || {
            let hierarchy = Folding::new().fold(pentagon_nodes()).unwrap();
            hierarchy
                .clusters()
                .iter()
                .map(|cl| {
                    let mut ids: Vec<u32> = cl
                        .descs
                        .iter()
                        .map(|&d| hierarchy.item_id(d))
                        .collect();
                    ids.sort_unstable();
                    (cl.id, ids)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_refolding_a_fixpoint_terminates_quickly() {
        // The pentagon's root level cannot improve: folding again from a
        // level shaped like it must stop within one iteration.
        let hierarchy = Folding::new().fold(pentagon_nodes()).unwrap();
        let first_levels = hierarchy.level_count();
        assert_eq!(first_levels, 1);
    }

    #[test]
    fn test_directed_graph_uses_general_formula() {
        // A directed 3-cycle still folds into one community.
        let mut builder = GraphBuilder::new(3);
        builder.add_nodes(&[0, 1, 2]).unwrap();
        builder.add_node_links(0, [1.into()], true).unwrap();
        builder.add_node_links(1, [2.into()], true).unwrap();
        builder.add_node_links(2, [0.into()], true).unwrap();
        let hierarchy = Folding::new()
            .with_symmetric(false)
            .fold(builder.finalize())
            .unwrap();
        assert_eq!(hierarchy.root().len(), 1);
        assert_eq!(hierarchy.clusters()[0].descs.len(), 3);
    }

    #[test]
    fn test_fast_mode_chains_pentagon_whole() {
        let hierarchy = Folding::new()
            .with_fast(true)
            .fold(pentagon_nodes())
            .unwrap();
        assert_eq!(hierarchy.root().len(), 1);
        assert_eq!(hierarchy.clusters()[0].descs.len(), 5);
    }

    #[test]
    fn test_validation_repairs_directed_backlinks() {
        let mut nodes: Vec<Node> = (0..2).map(Node::new).collect();
        nodes[0].links.push(crate::graph::Link::new(1, 1.0));
        let hierarchy = Folding::new()
            .with_symmetric(false)
            .fold(nodes)
            .unwrap();
        // A one-way pair gains exactly nothing under the null model, so
        // no cluster forms, but the zero-weight companion was inserted.
        assert!(hierarchy.root().is_empty());
        assert_eq!(
            hierarchy.nodes()[1].links,
            vec![crate::graph::Link::new(0, 0.0)]
        );
    }
}
