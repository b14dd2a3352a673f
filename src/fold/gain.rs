//! Modularity and pairwise merge gain.
//!
//! Modularity compares the weight held inside communities to the weight a
//! random null model with the same strengths would place there:
//!
//! ```text
//! symmetric   Q = Σ_c [ w_c/W − (d_c / 2W)² ]
//! asymmetric  Q = Σ_c [ w_c/W − out_c·in_c / W² ]
//! ```
//!
//! where `w_c` is the community's internal weight, `d_c` its total weight
//! in both directions, and `W` the total graph weight. The symmetric form
//! is valid for unsigned undirected graphs where `out == in`; signed or
//! directed graphs use the general form. Both coincide when strengths are
//! equal, so the flag is purely a cheaper code path.
//!
//! The pairwise gain is exactly the modularity delta of fusing two
//! communities, and the sum of pairwise gains over a merge group is
//! exactly the group's delta, the identity the termination check relies
//! on.

use crate::fold::context::LevelState;
use crate::graph::AccWeight;
use crate::model::Node;

/// Total weight of the input graph: self weights plus all arc weights.
///
/// Computed once from the initial nodes and reused at every folded level.
pub fn total_weight(nodes: &[Node]) -> AccWeight {
    nodes
        .iter()
        .map(|n| {
            n.self_weight as AccWeight
                + n.links
                    .iter()
                    .map(|ln| ln.weight as AccWeight)
                    .sum::<AccWeight>()
        })
        .sum()
}

/// Modularity of the level, treating every item as one community.
///
/// Defined as 0 for a weightless graph.
pub fn modularity(level: &LevelState, total: AccWeight, symmetric: bool) -> AccWeight {
    if total == 0.0 {
        return 0.0;
    }
    let mut q = 0.0;
    for i in 0..level.len() {
        let internal = level.self_weight[i] / total;
        let expected = if symmetric {
            let d = level.weight(i) / (2.0 * total);
            d * d
        } else {
            level.out_strength[i] * level.in_strength[i] / (total * total)
        };
        q += internal - expected;
    }
    q
}

/// Modularity delta of merging items `a` and `b` in isolation.
///
/// Symmetric in its arguments (bitwise: only commutative float ops),
/// positive exactly when the merge improves modularity.
pub fn gain(level: &LevelState, a: usize, b: usize, total: AccWeight, symmetric: bool) -> AccWeight {
    if total == 0.0 {
        return 0.0;
    }
    let link = level.link_weight(a, b);
    let expected = if symmetric {
        level.weight(a) * level.weight(b) / (2.0 * total * total)
    } else {
        (level.out_strength[a] * level.in_strength[b]
            + level.out_strength[b] * level.in_strength[a])
            / (total * total)
    };
    link / total - expected
}

/// Modularity delta of materializing a whole group: the sum of its
/// pairwise member gains.
pub fn group_gain(
    level: &LevelState,
    members: &[usize],
    total: AccWeight,
    symmetric: bool,
) -> AccWeight {
    let mut dq = 0.0;
    for (k, &u) in members.iter().enumerate() {
        for &v in &members[k + 1..] {
            dq += gain(level, u, v, total, symmetric);
        }
    }
    dq
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Link;
    use crate::model::ItemRef;

    fn triangle() -> Vec<Node> {
        let mut nodes: Vec<Node> = (0..3).map(Node::new).collect();
        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            nodes[a].links.push(Link::new(b, 0.5));
            nodes[b].links.push(Link::new(a, 0.5));
        }
        nodes
    }

    fn level_of(nodes: &[Node]) -> LevelState {
        let items: Vec<ItemRef> = (0..nodes.len()).map(ItemRef::Leaf).collect();
        LevelState::prepare(items, nodes, &[])
    }

    #[test]
    fn test_total_weight_counts_arcs_and_self_loops() {
        let mut nodes = triangle();
        assert_eq!(total_weight(&nodes), 3.0);
        nodes[0].self_weight = 2.0;
        assert_eq!(total_weight(&nodes), 5.0);
    }

    #[test]
    fn test_singleton_modularity_is_negative() {
        let nodes = triangle();
        let level = level_of(&nodes);
        let q = modularity(&level, 3.0, true);
        // Three singleton communities, each of degree 2 out of 2W = 6.
        assert!((q - (-1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_and_general_forms_agree_when_balanced() {
        let nodes = triangle();
        let level = level_of(&nodes);
        let qs = modularity(&level, 3.0, true);
        let qa = modularity(&level, 3.0, false);
        assert!((qs - qa).abs() < 1e-12);
        let gs = gain(&level, 0, 1, 3.0, true);
        let ga = gain(&level, 0, 1, 3.0, false);
        assert!((gs - ga).abs() < 1e-12);
    }

    #[test]
    fn test_gain_is_symmetric_and_positive_for_tight_pair() {
        let nodes = triangle();
        let level = level_of(&nodes);
        let g01 = gain(&level, 0, 1, 3.0, true);
        let g10 = gain(&level, 1, 0, 3.0, true);
        assert_eq!(g01, g10);
        assert!((g01 - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_gain_negative_for_unlinked_pair() {
        // Two disjoint edges: merging across components can only lose.
        let mut nodes: Vec<Node> = (0..4).map(Node::new).collect();
        for (a, b) in [(0, 1), (2, 3)] {
            nodes[a].links.push(Link::new(b, 0.5));
            nodes[b].links.push(Link::new(a, 0.5));
        }
        let level = level_of(&nodes);
        assert!(gain(&level, 0, 2, 2.0, true) < 0.0);
    }

    #[test]
    fn test_group_gain_matches_merge_delta() {
        // Folding the whole triangle lifts Q from -1/3 to 0.
        let nodes = triangle();
        let level = level_of(&nodes);
        let dq = group_gain(&level, &[0, 1, 2], 3.0, true);
        assert!((dq - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_weight_graph() {
        let nodes: Vec<Node> = (0..2).map(Node::new).collect();
        let level = level_of(&nodes);
        assert_eq!(modularity(&level, 0.0, true), 0.0);
        assert_eq!(gain(&level, 0, 1, 0.0, true), 0.0);
    }
}
