//! Graph construction from parser or caller input.
//!
//! The builder transforms external (id, weight) link records into the
//! node list the folding engine consumes. Undirected edges are stored as
//! two directed arcs carrying half the edge weight each; in the
//! unweighted case halving is impossible, so both arcs carry weight 1 and
//! self weights are doubled to compensate.
//!
//! Shuffling randomizes node and link scan order without altering graph
//! semantics; it exists to stress-test that folding is stable under
//! input-order permutations. The permutation is applied once in
//! [`GraphBuilder::finalize`] and is a pure function of the seed.

use std::collections::HashMap;

use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;
use rand::prelude::*;

use crate::error::{Error, Result};
use crate::graph::{Id, InputLink, Link, Weight};
use crate::model::Node;

/// A node under construction: links still reference destination ids,
/// resolved to arena indices on finalize.
#[derive(Debug, Clone)]
struct BuildNode {
    id: Id,
    self_weight: Option<Weight>,
    links: Vec<(Id, Weight)>,
}

impl BuildNode {
    fn new(id: Id) -> Self {
        Self {
            id,
            self_weight: None,
            links: Vec::new(),
        }
    }
}

/// Builder for the initial node list.
///
/// ```rust
/// use netfold::graph::GraphBuilder;
///
/// let mut builder = GraphBuilder::new(3);
/// builder.add_nodes(&[0, 1, 2]).unwrap();
/// builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
/// builder.add_node_links(1, [2.into()], false).unwrap();
/// let nodes = builder.finalize();
/// assert_eq!(nodes.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    nodes: Vec<BuildNode>,
    id_index: HashMap<Id, usize>,
    weighted: bool,
    directed: bool,
    shuffle: bool,
    seed: Option<u64>,
}

impl GraphBuilder {
    /// Create a builder expecting roughly `nodes_hint` nodes.
    ///
    /// The graph is weighted by default; see [`Self::with_weighted`].
    pub fn new(nodes_hint: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes_hint),
            id_index: HashMap::with_capacity(nodes_hint),
            weighted: true,
            directed: false,
            shuffle: false,
            seed: None,
        }
    }

    /// Set whether links carry weights. On an unweighted graph every arc
    /// has weight 1 and explicit input weights are ignored.
    pub fn with_weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Enable random reordering of nodes and links on finalize.
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set the shuffle seed for reproducible permutations.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether any link was added as directed.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether links carry weights.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Number of nodes added so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes were added yet.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Preallocate nodes with the given ids.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] on a duplicate id.
    pub fn add_nodes(&mut self, ids: &[Id]) -> Result<()> {
        for &id in ids {
            self.insert_node(id)?;
        }
        Ok(())
    }

    /// Preallocate the contiguous id range `[begin, end)`.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] when `end < begin` or an id already exists.
    pub fn add_node_range(&mut self, begin: Id, end: Id) -> Result<()> {
        if end < begin {
            return Err(Error::InvalidInput {
                message: format!("node range end {end} precedes begin {begin}"),
            });
        }
        for id in begin..end {
            self.insert_node(id)?;
        }
        Ok(())
    }

    /// Add links from `src` to already existing nodes.
    ///
    /// Undirected links are halved into two arcs; a self reference
    /// assigns the node's self weight exactly once.
    ///
    /// # Errors
    /// [`Error::UnknownNode`] when `src` or a destination does not exist;
    /// [`Error::InvalidInput`] on a repeated self reference.
    pub fn add_node_links<I>(&mut self, src: Id, links: I, directed: bool) -> Result<()>
    where
        I: IntoIterator<Item = InputLink>,
    {
        let si = *self
            .id_index
            .get(&src)
            .ok_or(Error::UnknownNode { id: src })?;
        self.directed |= directed;
        for ln in links {
            let di = *self
                .id_index
                .get(&ln.id)
                .ok_or(Error::UnknownNode { id: ln.id })?;
            self.insert_link(si, di, ln.weight, directed)?;
        }
        Ok(())
    }

    /// Add links from `src`, creating `src` and any missing destinations
    /// on demand.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] on a repeated self reference.
    pub fn add_node_and_links<I>(&mut self, src: Id, links: I, directed: bool) -> Result<()>
    where
        I: IntoIterator<Item = InputLink>,
    {
        let si = self.find_or_insert(src);
        self.directed |= directed;
        for ln in links {
            let di = self.find_or_insert(ln.id);
            self.insert_link(si, di, ln.weight, directed)?;
        }
        Ok(())
    }

    /// Build a graph from a petgraph undirected graph: node indices
    /// become ids, edge weights become link weights, self edges become
    /// self weights.
    ///
    /// # Errors
    /// [`Error::InvalidInput`] on repeated self edges.
    pub fn from_petgraph<N>(graph: &UnGraph<N, Weight>) -> Result<Self> {
        let mut builder = GraphBuilder::new(graph.node_count());
        let ids: Vec<Id> = (0..graph.node_count() as Id).collect();
        builder.add_nodes(&ids)?;
        for edge in graph.edge_references() {
            let src = edge.source().index() as Id;
            let dst = edge.target().index() as Id;
            builder.add_node_links(src, [InputLink::weighted(dst, *edge.weight())], false)?;
        }
        Ok(builder)
    }

    /// Complete construction: resolve link destinations, apply the
    /// shuffle permutation if enabled, and release the id map.
    pub fn finalize(mut self) -> Vec<Node> {
        if self.shuffle {
            let mut rng: StdRng = match self.seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            self.nodes.shuffle(&mut rng);
            for nd in &mut self.nodes {
                nd.links.shuffle(&mut rng);
            }
        }
        // Remap ids to post-permutation indices.
        let index: HashMap<Id, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, nd)| (nd.id, i))
            .collect();
        self.id_index = HashMap::new();

        self.nodes
            .into_iter()
            .map(|bn| {
                let mut node = Node::new(bn.id);
                node.self_weight = bn.self_weight.unwrap_or(0.0);
                node.links = bn
                    .links
                    .into_iter()
                    .map(|(id, w)| Link::new(index[&id], w))
                    .collect();
                node
            })
            .collect()
    }

    fn insert_node(&mut self, id: Id) -> Result<usize> {
        if self.id_index.contains_key(&id) {
            return Err(Error::InvalidInput {
                message: format!("duplicate node #{id}"),
            });
        }
        let idx = self.nodes.len();
        self.nodes.push(BuildNode::new(id));
        self.id_index.insert(id, idx);
        Ok(idx)
    }

    fn find_or_insert(&mut self, id: Id) -> usize {
        match self.id_index.get(&id) {
            Some(&idx) => idx,
            None => {
                let idx = self.nodes.len();
                self.nodes.push(BuildNode::new(id));
                self.id_index.insert(id, idx);
                idx
            }
        }
    }

    fn insert_link(&mut self, si: usize, di: usize, weight: Weight, directed: bool) -> Result<()> {
        let mut weight = if self.weighted { weight } else { 1.0 };
        if si == di {
            let node = &mut self.nodes[si];
            if node.self_weight.is_some() {
                return Err(Error::InvalidInput {
                    message: format!("self weight of node #{} assigned twice", node.id),
                });
            }
            // Doubled for unweighted undirected graphs to compensate the
            // edge-to-arc weight doubling that unit links cannot halve.
            if !self.weighted && !directed {
                weight *= 2.0;
            }
            node.self_weight = Some(weight);
            return Ok(());
        }
        if !directed {
            if self.weighted {
                weight /= 2.0;
            }
            let src_id = self.nodes[si].id;
            let dst_id = self.nodes[di].id;
            self.nodes[si].links.push((dst_id, weight));
            self.nodes[di].links.push((src_id, weight));
        } else {
            let dst_id = self.nodes[di].id;
            self.nodes[si].links.push((dst_id, weight));
        }
        Ok(())
    }
}
