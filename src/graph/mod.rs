//! Graph input: weight primitives and the node-list builder.
//!
//! The graph is stored as directed arcs under the hood. An undirected
//! edge of weight `w` becomes two arcs of weight `w/2` (or two unit arcs
//! in the unweighted case), so that every formula downstream can treat
//! links uniformly as arcs. Back links exist for every link even when
//! their weight is zero.

mod builder;
mod weight;

pub use builder::GraphBuilder;
pub use weight::{
    AccWeight, Id, InputLink, Link, Share, Weight, ACC_WEIGHT_MAX, ACC_WEIGHT_NONE, ID_NONE,
};
