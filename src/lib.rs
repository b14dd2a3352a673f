//! # netfold
//!
//! Hierarchical community detection for weighted or unweighted graphs by
//! mutual-best folding, producing multi-level hierarchies of
//! *overlapping* communities with explicit membership shares.
//!
//! ## How It Works
//!
//! Folding starts from the input nodes and repeatedly fuses the items
//! that prefer each other most:
//!
//! ```text
//! level 2:        [c5]    [c6]      <- root: owners empty
//!                  /\       |
//! level 1:  [c0] [c1] [c2] [c3]     <- one cluster per mutual-best group
//!             \  /  \  /\   |
//! leaves:     n0 n1  n2 n3  n4      <- an item may belong to several
//!                                      parents (overlap)
//! ```
//!
//! Every iteration evaluates the pairwise merge **gain** (the modularity
//! delta of fusing two items), matches mutually-best candidates (all of
//! them when several tie, which is where overlap comes from) and folds
//! each matched group into a cluster of the next level. The loop stops
//! when modularity cannot grow by more than the configured profit
//! margin.
//!
//! Membership of a leaf in an ancestor is fractional: a descendant's
//! share of its parent divides evenly among its owners, so overlapping
//! communities carry explicit weights that always total 1 per node.
//!
//! ## Usage
//!
//! ```rust
//! use netfold::fold::Folding;
//! use netfold::graph::GraphBuilder;
//!
//! // Two triangles bridged by one edge.
//! let mut builder = GraphBuilder::new(6);
//! builder.add_nodes(&[0, 1, 2, 3, 4, 5]).unwrap();
//! builder.add_node_links(0, [1.into(), 2.into()], false).unwrap();
//! builder.add_node_links(1, [2.into()], false).unwrap();
//! builder.add_node_links(3, [4.into(), 5.into()], false).unwrap();
//! builder.add_node_links(4, [5.into()], false).unwrap();
//! builder.add_node_links(2, [3.into()], false).unwrap();
//!
//! let hierarchy = Folding::new().fold(builder.finalize()).unwrap();
//! assert_eq!(hierarchy.root().len(), 2);
//! assert!(hierarchy.score().modularity > 0.0);
//! ```
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`graph`] | weight primitives, [`graph::GraphBuilder`] |
//! | [`model`] | [`model::Node`], [`model::Cluster`], [`model::ItemRef`] |
//! | [`fold`] | the clustering engine, [`fold::Folding`] options |
//! | [`hierarchy`] | the produced [`hierarchy::Hierarchy`] |
//! | [`io`] | `.hig` parsing, text/CSV/JSON writers |
//!
//! ## References
//!
//! - Newman & Girvan (2004). "Finding and evaluating community structure
//!   in networks."
//! - Blondel et al. (2008). "Fast unfolding of communities in large
//!   networks."

pub mod error;
pub mod fold;
pub mod graph;
pub mod hierarchy;
pub mod io;
pub mod model;

pub use error::{Error, Result};
pub use fold::Folding;
pub use graph::{GraphBuilder, InputLink};
pub use hierarchy::{Hierarchy, Score};
pub use model::{Cluster, ItemRef, Node};
