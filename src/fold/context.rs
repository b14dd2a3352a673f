//! Transient per-iteration state: clusterability flags, candidate
//! contexts, and the prepared view of one level.
//!
//! Contexts live in vectors parallel to the level items, allocated when
//! an iteration starts and dropped when it ends; nothing here survives
//! across iterations.

use std::collections::HashMap;

use crate::graph::{AccWeight, Id, ACC_WEIGHT_NONE};
use crate::model::{Cluster, ItemRef, Node};

/// Clusterability of one item within the current iteration.
///
/// Discriminants are bit flags: bit 0 marks passive (does not initiate
/// clustering), bit 1 a mutual candidate, bit 2 several candidates,
/// bit 3 fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Clusterable {
    /// Not clusterable: no positive gain; the item survives alone.
    None = 0,
    /// Too heavy to initiate clustering; joined only when absorbed.
    Passive = 0b0001,
    /// Positive gain but no mutual partner; propagation candidate.
    NonMutual = 0b0010,
    /// Exactly one mutual best candidate.
    Single = 0b0011,
    /// Passive that cannot be approved to become clusterable.
    PassiveFixed = 0b0101,
    /// Several mutual best candidates tie on the maximum gain.
    Multiple = 0b0111,
    /// Passive fixed by a quasi-mutual chain.
    PassiveCFixed = 0b1101,
    /// Not evaluated yet.
    Undefined = 0b1111,
}

impl Clusterable {
    /// Whether the item must not initiate clustering.
    pub fn is_passive(self) -> bool {
        matches!(
            self,
            Clusterable::Passive | Clusterable::PassiveFixed | Clusterable::PassiveCFixed
        )
    }

    /// Whether a mutual best candidate exists.
    pub fn has_mutual(self) -> bool {
        matches!(self, Clusterable::Single | Clusterable::Multiple)
    }

    /// Whether several candidates tie on the maximum gain.
    pub fn is_multi(self) -> bool {
        self == Clusterable::Multiple
    }

    /// Whether the flag is one of the fixed passive states.
    pub fn is_fixed(self) -> bool {
        matches!(self, Clusterable::PassiveFixed | Clusterable::PassiveCFixed)
    }
}

/// Clustering context of one level item during one iteration.
#[derive(Debug, Clone)]
pub struct Context {
    /// Clusterability flag.
    pub clusterable: Clusterable,
    /// Mutual best candidates (level indices), ascending by id order.
    pub cands: Vec<usize>,
    /// Unidirectional max-gain requests (level indices), ascending.
    pub reqs: Vec<usize>,
    /// Total weight of the item in both link directions.
    pub weight: AccWeight,
    /// Positive complemented gain, used only during the iteration.
    pub cpg: AccWeight,
    /// Max gain, shared by every current best candidate.
    pub gmax: AccWeight,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            clusterable: Clusterable::Undefined,
            cands: Vec::new(),
            reqs: Vec::new(),
            weight: ACC_WEIGHT_NONE,
            cpg: ACC_WEIGHT_NONE,
            gmax: ACC_WEIGHT_NONE,
        }
    }
}

impl Context {
    /// Whether no clustering requests (including candidates) exist.
    pub fn noreqs(&self) -> bool {
        self.cands.is_empty() && self.reqs.is_empty()
    }
}

/// Prepared view of one level: per-item link aggregates and strengths,
/// indexed by position within the level.
///
/// Link destinations are resolved to the current level: an arc toward an
/// item that was folded away is redirected to that item's owners, split
/// evenly among them when it overlaps between several.
#[derive(Debug)]
pub struct LevelState {
    /// The level items.
    pub items: Vec<ItemRef>,
    /// Item ids, for tie-breaking and diagnostics.
    pub ids: Vec<Id>,
    /// Self weights.
    pub self_weight: Vec<AccWeight>,
    /// Aggregated outbound links per item, sorted by destination index.
    pub out: Vec<Vec<(usize, AccWeight)>>,
    /// Aggregated inbound links per item (transpose of `out`).
    pub inb: Vec<Vec<(usize, AccWeight)>>,
    /// Out-strength: self weight plus total outbound link weight.
    pub out_strength: Vec<AccWeight>,
    /// In-strength: self weight plus total inbound link weight.
    pub in_strength: Vec<AccWeight>,
}

impl LevelState {
    /// Prepare a level over the given items.
    pub fn prepare(items: Vec<ItemRef>, nodes: &[Node], clusters: &[Cluster]) -> Self {
        let n = items.len();
        let pos: HashMap<ItemRef, usize> =
            items.iter().enumerate().map(|(i, &it)| (it, i)).collect();

        let ids: Vec<Id> = items
            .iter()
            .map(|it| match *it {
                ItemRef::Leaf(ni) => nodes[ni].id,
                ItemRef::Inner(ci) => clusters[ci].id,
            })
            .collect();

        let self_weight: Vec<AccWeight> = items
            .iter()
            .map(|it| match *it {
                ItemRef::Leaf(ni) => nodes[ni].self_weight as AccWeight,
                ItemRef::Inner(ci) => clusters[ci].self_weight,
            })
            .collect();

        // Redirect a link toward an item folded away on an earlier
        // iteration: ascend its owners (splitting evenly on overlap)
        // until the current level is reached.
        fn resolve(
            dest: ItemRef,
            weight: AccWeight,
            pos: &HashMap<ItemRef, usize>,
            nodes: &[Node],
            clusters: &[Cluster],
            acc: &mut HashMap<usize, AccWeight>,
        ) {
            if let Some(&j) = pos.get(&dest) {
                *acc.entry(j).or_insert(0.0) += weight;
                return;
            }
            let owners = match dest {
                ItemRef::Leaf(ni) => &nodes[ni].owners,
                ItemRef::Inner(ci) => &clusters[ci].owners,
            };
            if owners.is_empty() {
                return;
            }
            let share = weight / owners.len() as AccWeight;
            for &oc in owners {
                resolve(ItemRef::Inner(oc), share, pos, nodes, clusters, acc);
            }
        }

        let mut out: Vec<Vec<(usize, AccWeight)>> = vec![Vec::new(); n];
        for (i, it) in items.iter().enumerate() {
            let mut acc: HashMap<usize, AccWeight> = HashMap::new();
            match *it {
                ItemRef::Leaf(ni) => {
                    for ln in &nodes[ni].links {
                        resolve(
                            ItemRef::Leaf(ln.dest),
                            ln.weight as AccWeight,
                            &pos,
                            nodes,
                            clusters,
                            &mut acc,
                        );
                    }
                }
                ItemRef::Inner(ci) => {
                    for ln in &clusters[ci].links {
                        resolve(ln.dest, ln.weight, &pos, nodes, clusters, &mut acc);
                    }
                }
            }
            let mut links: Vec<(usize, AccWeight)> =
                acc.into_iter().filter(|&(j, _)| j != i).collect();
            links.sort_unstable_by_key(|&(j, _)| j);
            out[i] = links;
        }

        let mut inb: Vec<Vec<(usize, AccWeight)>> = vec![Vec::new(); n];
        for (i, links) in out.iter().enumerate() {
            for &(j, w) in links {
                inb[j].push((i, w));
            }
        }
        for links in &mut inb {
            links.sort_unstable_by_key(|&(j, _)| j);
        }

        let out_strength: Vec<AccWeight> = (0..n)
            .map(|i| self_weight[i] + out[i].iter().map(|&(_, w)| w).sum::<AccWeight>())
            .collect();
        let in_strength: Vec<AccWeight> = (0..n)
            .map(|i| self_weight[i] + inb[i].iter().map(|&(_, w)| w).sum::<AccWeight>())
            .collect();

        Self {
            items,
            ids,
            self_weight,
            out,
            inb,
            out_strength,
            in_strength,
        }
    }

    /// Number of items in the level.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the level holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total weight of item `i` in both link directions.
    pub fn weight(&self, i: usize) -> AccWeight {
        self.out_strength[i] + self.in_strength[i]
    }

    /// Outbound weight from `a` to `b`, zero when unlinked.
    pub fn out_weight(&self, a: usize, b: usize) -> AccWeight {
        match self.out[a].binary_search_by_key(&b, |&(j, _)| j) {
            Ok(p) => self.out[a][p].1,
            Err(_) => 0.0,
        }
    }

    /// Both-direction link weight between `a` and `b`.
    pub fn link_weight(&self, a: usize, b: usize) -> AccWeight {
        self.out_weight(a, b) + self.out_weight(b, a)
    }

    /// Level indices linked to `i` in either direction, ascending and
    /// deduplicated.
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        let mut nb: Vec<usize> = self.out[i]
            .iter()
            .chain(self.inb[i].iter())
            .map(|&(j, _)| j)
            .collect();
        nb.sort_unstable();
        nb.dedup();
        nb
    }
}
