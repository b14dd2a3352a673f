//! Pre-folding consistency checks on the input nodes.
//!
//! Folding assumes every arc has a companion in the opposite direction
//! and that node ids are unique. When validation is enabled the engine
//! checks both before the first iteration and repairs missing back links
//! by inserting zero-weight companions; with validation disabled,
//! violations are the caller's responsibility.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::graph::{AccWeight, Link};
use crate::model::Node;

/// Check id uniqueness and link symmetry, repairing missing back links.
///
/// In symmetric mode the two directions of every arc pair must also
/// carry equal aggregate weights.
///
/// # Errors
/// [`Error::InvalidInput`] on a duplicate node id,
/// [`Error::Internal`] on an out-of-range link,
/// [`Error::ConsistencyViolation`] on unequal arc pairs in symmetric mode.
pub fn validate_links(nodes: &mut [Node], symmetric: bool) -> Result<()> {
    let mut ids = HashSet::with_capacity(nodes.len());
    for node in nodes.iter() {
        if !ids.insert(node.id) {
            return Err(Error::InvalidInput {
                message: format!("duplicate node #{}", node.id),
            });
        }
        for ln in &node.links {
            if ln.dest >= nodes.len() {
                return Err(Error::Internal {
                    message: format!(
                        "node #{} links outside the arena: {}",
                        node.id, ln.dest
                    ),
                });
            }
        }
    }

    // Aggregate arc weights per direction.
    let mut arcs: HashMap<(usize, usize), AccWeight> = HashMap::new();
    for (src, node) in nodes.iter().enumerate() {
        for ln in &node.links {
            *arcs.entry((src, ln.dest)).or_insert(0.0) += ln.weight as AccWeight;
        }
    }

    let mut missing: Vec<(usize, usize)> = Vec::new();
    for (&(src, dst), &weight) in &arcs {
        match arcs.get(&(dst, src)) {
            Some(&back) => {
                if symmetric && back != weight {
                    return Err(Error::ConsistencyViolation {
                        src: nodes[src].id,
                        dst: nodes[dst].id,
                        message: format!(
                            "arc weights differ in a symmetric graph: {weight} vs {back}"
                        ),
                    });
                }
            }
            None => missing.push((dst, src)),
        }
    }

    missing.sort_unstable();
    for (src, dst) in missing {
        if symmetric {
            return Err(Error::ConsistencyViolation {
                src: nodes[src].id,
                dst: nodes[dst].id,
                message: "back link is missing in a symmetric graph".into(),
            });
        }
        nodes[src].links.push(Link::new(dst, 0.0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_consistent_graph() {
        let mut nodes: Vec<Node> = (0..2).map(Node::new).collect();
        nodes[0].links.push(Link::new(1, 0.5));
        nodes[1].links.push(Link::new(0, 0.5));
        assert!(validate_links(&mut nodes, true).is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut nodes = vec![Node::new(3), Node::new(3)];
        let err = validate_links(&mut nodes, true).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn test_repairs_missing_back_link() {
        let mut nodes: Vec<Node> = (0..2).map(Node::new).collect();
        nodes[0].links.push(Link::new(1, 2.0));
        validate_links(&mut nodes, false).unwrap();
        assert_eq!(nodes[1].links.len(), 1);
        assert_eq!(nodes[1].links[0], Link::new(0, 0.0));
    }

    #[test]
    fn test_symmetric_mismatch_rejected() {
        let mut nodes: Vec<Node> = (0..2).map(Node::new).collect();
        nodes[0].links.push(Link::new(1, 2.0));
        nodes[1].links.push(Link::new(0, 1.0));
        let err = validate_links(&mut nodes, true).unwrap_err();
        assert!(matches!(err, Error::ConsistencyViolation { .. }));
    }

    #[test]
    fn test_out_of_range_link_is_internal_error() {
        let mut nodes = vec![Node::new(0)];
        nodes[0].links.push(Link::new(5, 1.0));
        let err = validate_links(&mut nodes, false).unwrap_err();
        assert!(matches!(err, Error::Internal { .. }));
    }
}
