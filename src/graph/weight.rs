//! Identifier and weight primitives shared by the whole crate.

/// Id of nodes and clusters, up to 4G.
pub type Id = u32;

/// Reserved [`Id`] value for uninitialized instances.
pub const ID_NONE: Id = Id::MAX;

/// Scalar link weight.
pub type Weight = f32;

/// Total (accumulated) weight, always 64-bit signed.
pub type AccWeight = f64;

/// Reserved [`AccWeight`] value for uninitialized instances.
pub const ACC_WEIGHT_NONE: AccWeight = AccWeight::MIN;

/// Max value of [`AccWeight`], internally also used as a flag.
pub const ACC_WEIGHT_MAX: AccWeight = AccWeight::MAX;

/// Share of a descendant item in an owner, in `(0, 1]`.
pub type Share = f32;

/// A directed arc to another node, by node-arena index.
///
/// Back links always exist in a consistent graph, even with zero weight;
/// an undirected edge is stored as two arcs carrying half the edge weight
/// each (except in the unweighted case, where halving is impossible and
/// both arcs carry weight 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Destination node index.
    pub dest: usize,
    /// Outbound weight on this arc.
    pub weight: Weight,
}

impl Link {
    /// Create an arc to `dest` with the given weight.
    pub fn new(dest: usize, weight: Weight) -> Self {
        Self { dest, weight }
    }
}

/// An input link as supplied by a parser or caller: destination node id
/// plus weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputLink {
    /// Destination node id.
    pub id: Id,
    /// Link weight.
    pub weight: Weight,
}

impl InputLink {
    /// Default weight of an input link.
    pub const DEFAULT_WEIGHT: Weight = 1.0;

    /// Create a link with an explicit weight.
    pub fn weighted(id: Id, weight: Weight) -> Self {
        Self { id, weight }
    }

    /// Create a link with the default unit weight.
    pub fn unweighted(id: Id) -> Self {
        Self {
            id,
            weight: Self::DEFAULT_WEIGHT,
        }
    }
}

impl From<Id> for InputLink {
    fn from(id: Id) -> Self {
        InputLink::unweighted(id)
    }
}

impl From<(Id, Weight)> for InputLink {
    fn from((id, weight): (Id, Weight)) -> Self {
        InputLink::weighted(id, weight)
    }
}
