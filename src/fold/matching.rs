//! Candidate evaluation and mutual-best matching.
//!
//! For every item of the level the engine records the neighbours reaching
//! its maximum gain, splits them into mutual candidates and one-way
//! requests, and assigns a clusterability flag. Matching then forms the
//! groups that materialize into clusters:
//!
//! - strict mode: a group is a maximal clique of the mutual-best
//!   relation, so every pair of members is mutual-best for every other.
//!   An item lying in several maximal cliques joins all of them; that is
//!   where overlap comes from.
//! - fast (quasi-mutual) mode: a group is a connected component of the
//!   mutual-best relation; chains are allowed, so `a~b` and `b~c` pull
//!   `c` into the cluster of `{a, b}` even when `a` and `c` are not
//!   mutual-best.
//!
//! Groups that consist of passive items only never form: passive items do
//! not initiate clustering, they are only absorbed.

use crate::fold::context::{Clusterable, Context, LevelState};
use crate::fold::gain::gain;
use crate::graph::AccWeight;

/// One matched group of level items, ready to materialize.
#[derive(Debug, Clone)]
pub struct MatchedGroup {
    /// Member level indices, ascending.
    pub members: Vec<usize>,
    /// The member the group forms around: the heaviest one.
    pub core: usize,
}

impl MatchedGroup {
    fn new(mut members: Vec<usize>, level: &LevelState) -> Self {
        members.sort_unstable();
        let core = members
            .iter()
            .copied()
            .max_by(|&a, &b| {
                level
                    .weight(a)
                    .partial_cmp(&level.weight(b))
                    .unwrap_or(core::cmp::Ordering::Equal)
                    // Equal weights resolve to the lower id.
                    .then_with(|| level.ids[b].cmp(&level.ids[a]))
            })
            .unwrap_or(0);
        Self { members, core }
    }
}

/// Evaluate gains and clusterability for every item of the level.
pub fn compute_contexts(level: &LevelState, total: AccWeight, symmetric: bool) -> Vec<Context> {
    let n = level.len();
    let mut gmax = vec![0.0f64; n];
    let mut maxset: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        let mut best = AccWeight::NEG_INFINITY;
        let mut set = Vec::new();
        for j in level.neighbors(i) {
            let g = gain(level, i, j, total, symmetric);
            if g > best {
                best = g;
                set.clear();
                set.push(j);
            } else if g == best {
                set.push(j);
            }
        }
        if set.is_empty() {
            best = 0.0;
        }
        gmax[i] = best;
        maxset[i] = set;
    }

    let mut ctxs: Vec<Context> = Vec::with_capacity(n);
    for i in 0..n {
        let mut ctx = Context {
            weight: level.weight(i),
            gmax: gmax[i],
            cpg: gmax[i].max(0.0),
            ..Context::default()
        };
        if gmax[i] > 0.0 {
            for &j in &maxset[i] {
                if maxset[j].contains(&i) {
                    ctx.cands.push(j);
                } else {
                    ctx.reqs.push(j);
                }
            }
            ctx.cands.sort_unstable_by_key(|&j| level.ids[j]);
            ctx.reqs.sort_unstable_by_key(|&j| level.ids[j]);
        }
        ctx.clusterable = if gmax[i] <= 0.0 {
            Clusterable::None
        } else if ctx.cands.is_empty() {
            Clusterable::NonMutual
        } else if ctx
            .cands
            .iter()
            .all(|&j| level.weight(i) > level.weight(j))
        {
            Clusterable::Passive
        } else if ctx.cands.len() == 1 {
            Clusterable::Single
        } else {
            Clusterable::Multiple
        };
        ctxs.push(ctx);
    }

    // A passive item surrounded exclusively by passive candidates can
    // never be activated.
    let passive: Vec<bool> = ctxs.iter().map(|c| c.clusterable.is_passive()).collect();
    for i in 0..n {
        if ctxs[i].clusterable == Clusterable::Passive
            && ctxs[i].cands.iter().all(|&j| passive[j])
        {
            ctxs[i].clusterable = Clusterable::PassiveFixed;
        }
    }
    ctxs
}

/// Strictly mutual matching: maximal cliques of the mutual-best relation.
///
/// Each clique is emitted exactly once, by its non-passive member with the
/// smallest id; cliques without a non-passive member do not form.
pub fn match_strict(level: &LevelState, ctxs: &[Context]) -> Vec<MatchedGroup> {
    let mut groups = Vec::new();
    let mutual = |a: usize, b: usize| ctxs[a].cands.contains(&b);

    for i in 0..level.len() {
        if ctxs[i].clusterable.is_passive() || !ctxs[i].clusterable.has_mutual() {
            continue;
        }
        for clique in maximal_cliques(&ctxs[i].cands, &mutual) {
            let initiator = clique
                .iter()
                .copied()
                .chain(core::iter::once(i))
                .filter(|&m| !ctxs[m].clusterable.is_passive())
                .min_by_key(|&m| level.ids[m]);
            if initiator != Some(i) {
                continue;
            }
            let mut members = clique;
            members.push(i);
            groups.push(MatchedGroup::new(members, level));
        }
    }
    groups
}

/// Quasi-mutual matching: connected components of the mutual-best
/// relation. Passive items absorbed through a chain are marked
/// [`Clusterable::PassiveCFixed`].
pub fn match_fast(level: &LevelState, ctxs: &mut [Context]) -> Vec<MatchedGroup> {
    let n = level.len();
    let mut seen = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if seen[i] || !ctxs[i].clusterable.has_mutual() {
            continue;
        }
        // Walk the component of mutual pairs reachable from i.
        let mut members = Vec::new();
        let mut queue = vec![i];
        seen[i] = true;
        while let Some(m) = queue.pop() {
            members.push(m);
            for &j in &ctxs[m].cands {
                if !seen[j] {
                    seen[j] = true;
                    queue.push(j);
                }
            }
        }
        if members.iter().all(|&m| ctxs[m].clusterable.is_passive()) {
            continue;
        }
        if members.len() < 2 {
            continue;
        }
        for &m in &members {
            if ctxs[m].clusterable.is_passive() {
                ctxs[m].clusterable = Clusterable::PassiveCFixed;
            }
        }
        groups.push(MatchedGroup::new(members, level));
    }
    groups
}

/// Assign remaining propagation candidates into matched groups.
///
/// A non-mutual item joins the group with the highest positive merge
/// gain against its accumulated members (ties: earliest group). In fast
/// mode unabsorbed passive items may be propagated as well. Returns the
/// gain realized by the assignments.
pub fn propagate(
    level: &LevelState,
    ctxs: &[Context],
    groups: &mut [MatchedGroup],
    total: AccWeight,
    symmetric: bool,
    fast: bool,
) -> AccWeight {
    let n = level.len();
    let mut grouped = vec![false; n];
    let mut group_of: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (gi, g) in groups.iter().enumerate() {
        for &m in &g.members {
            grouped[m] = true;
            group_of[m].push(gi);
        }
    }

    let mut realized = 0.0;
    for i in 0..n {
        if grouped[i] {
            continue;
        }
        let eligible = match ctxs[i].clusterable {
            Clusterable::NonMutual => true,
            Clusterable::Passive | Clusterable::PassiveCFixed => fast,
            _ => false,
        };
        if !eligible || ctxs[i].cpg <= 0.0 {
            continue;
        }

        // Candidate groups are those holding a linked neighbour.
        let mut cand_groups: Vec<usize> = level
            .neighbors(i)
            .into_iter()
            .flat_map(|j| group_of[j].iter().copied())
            .collect();
        cand_groups.sort_unstable();
        cand_groups.dedup();

        let mut best: Option<(usize, AccWeight)> = None;
        for gi in cand_groups {
            let dq: AccWeight = groups[gi]
                .members
                .iter()
                .map(|&m| gain(level, i, m, total, symmetric))
                .sum();
            if dq > 0.0 && best.map_or(true, |(_, b)| dq > b) {
                best = Some((gi, dq));
            }
        }
        if let Some((gi, dq)) = best {
            groups[gi].members.push(i);
            groups[gi].members.sort_unstable();
            group_of[i].push(gi);
            realized += dq;
        }
    }
    realized
}

/// Deterministic maximal-clique enumeration over `verts` under the given
/// symmetric adjacency, in lexicographic member order.
fn maximal_cliques<F>(verts: &[usize], adjacent: &F) -> Vec<Vec<usize>>
where
    F: Fn(usize, usize) -> bool,
{
    let mut found = Vec::new();
    let mut r = Vec::new();
    let p: Vec<usize> = verts.to_vec();
    bron_kerbosch(&mut r, p, Vec::new(), adjacent, &mut found);
    found
}

fn bron_kerbosch<F>(
    r: &mut Vec<usize>,
    mut p: Vec<usize>,
    mut x: Vec<usize>,
    adjacent: &F,
    found: &mut Vec<Vec<usize>>,
) where
    F: Fn(usize, usize) -> bool,
{
    if p.is_empty() && x.is_empty() {
        found.push(r.clone());
        return;
    }
    while let Some(&v) = p.first() {
        let np: Vec<usize> = p.iter().copied().filter(|&u| adjacent(v, u)).collect();
        let nx: Vec<usize> = x.iter().copied().filter(|&u| adjacent(v, u)).collect();
        r.push(v);
        bron_kerbosch(r, np, nx, adjacent, found);
        r.pop();
        p.remove(0);
        x.push(v);
    }
}
