//! Leiden community detection on the undirected call-graph projection
//!
//! Modularity-driven local moving plus two connectivity refinement passes
//! per iteration. Edge weight is call multiplicity; the resolution parameter
//! scales the null-model term. Converges when the modularity delta drops
//! under 1e-6 or after ten iterations.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::FxHashMap;

use crate::util::undirected_calls;

pub const DEFAULT_RESOLUTION: f64 = 1.0;
const MODULARITY_TOLERANCE: f64 = 1e-6;
const MAX_ITERATIONS: usize = 10;
const MAX_LOCAL_SWEEPS: usize = 100;
const REFINEMENT_PASSES: usize = 2;

#[derive(Debug, Clone)]
pub struct Community {
    /// Members in node insertion order.
    pub nodes: Vec<NodeIdx>,
    /// Directed `Calls` edges with both endpoints inside.
    pub internal_edges: usize,
    /// Directed `Calls` edges crossing the boundary, either direction.
    pub external_edges: usize,
}

impl Community {
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// internal / (internal + external); 1.0 for an isolated community.
    pub fn connectivity(&self) -> f64 {
        let total = self.internal_edges + self.external_edges;
        if total == 0 {
            1.0
        } else {
            self.internal_edges as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommunitySet {
    /// Ordered by size descending, ties by the lexicographically smallest
    /// member symbol id. A community's position is its id.
    pub communities: Vec<Community>,
    /// Node position -> community position.
    pub membership: Vec<usize>,
    pub modularity: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Run Leiden at the given resolution.
pub fn leiden(g: &CodeGraph, resolution: f64, cancel: &CancelToken) -> Result<CommunitySet, Error> {
    let n = g.node_count();
    if n == 0 {
        return Ok(CommunitySet {
            communities: Vec::new(),
            membership: Vec::new(),
            modularity: 0.0,
            iterations: 0,
            converged: true,
        });
    }

    let (adj, degrees, total_weight) = undirected_calls(g);
    let mut labels: Vec<u32> = (0..n as u32).collect();

    let mut iterations = 0usize;
    let mut converged = false;
    let mut modularity = 0.0;

    if total_weight > 0.0 {
        let mut previous = modularity_of(&labels, &adj, &degrees, total_weight, resolution);
        while iterations < MAX_ITERATIONS {
            iterations += 1;

            cancel.checkpoint()?;
            local_moving(&adj, &degrees, total_weight, resolution, &mut labels);
            for _ in 0..REFINEMENT_PASSES {
                cancel.checkpoint()?;
                refine(&adj, &mut labels);
            }

            modularity = modularity_of(&labels, &adj, &degrees, total_weight, resolution);
            if (modularity - previous).abs() < MODULARITY_TOLERANCE {
                converged = true;
                break;
            }
            previous = modularity;
        }
    } else {
        converged = true;
    }

    let (communities, membership) = finalize(g, &labels);
    tracing::debug!(
        communities = communities.len(),
        modularity,
        iterations,
        converged,
        "leiden complete"
    );
    Ok(CommunitySet {
        communities,
        membership,
        modularity,
        iterations,
        converged,
    })
}

/// Sweep nodes in index order, moving each to the neighboring community with
/// the highest modularity gain, until a sweep makes no move.
fn local_moving(
    adj: &[Vec<(u32, f64)>],
    degrees: &[f64],
    total_weight: f64,
    resolution: f64,
    labels: &mut [u32],
) {
    let n = labels.len();
    let mut community_weight: FxHashMap<u32, f64> = FxHashMap::default();
    for v in 0..n {
        *community_weight.entry(labels[v]).or_insert(0.0) += degrees[v];
    }

    let mut improved = true;
    let mut sweeps = 0usize;
    while improved && sweeps < MAX_LOCAL_SWEEPS {
        improved = false;
        sweeps += 1;

        for v in 0..n {
            if adj[v].is_empty() {
                continue;
            }
            let current = labels[v];
            let k_v = degrees[v];

            // Weight from v into each neighboring community.
            let mut into: FxHashMap<u32, f64> = FxHashMap::default();
            for &(w, weight) in &adj[v] {
                *into.entry(labels[w as usize]).or_insert(0.0) += weight;
            }

            // Evaluate moves with v taken out of its community.
            if let Some(w) = community_weight.get_mut(&current) {
                *w -= k_v;
            }

            let gain_for = |target: u32| {
                let k_in = into.get(&target).copied().unwrap_or(0.0);
                let sigma = community_weight.get(&target).copied().unwrap_or(0.0);
                k_in / total_weight
                    - resolution * (sigma * k_v) / (2.0 * total_weight * total_weight)
            };

            let mut best = current;
            let mut best_gain = gain_for(current);
            let mut targets: Vec<u32> = into.keys().copied().collect();
            targets.sort_unstable();
            for target in targets {
                let gain = gain_for(target);
                if gain > best_gain {
                    best_gain = gain;
                    best = target;
                }
            }

            *community_weight.entry(best).or_insert(0.0) += k_v;
            if best != current {
                labels[v] = best;
                improved = true;
            }
        }
    }
}

/// Connectivity refinement: a node with more weight leaving its community
/// than staying moves to its majority neighbor community.
fn refine(adj: &[Vec<(u32, f64)>], labels: &mut [u32]) {
    for v in 0..labels.len() {
        if adj[v].is_empty() {
            continue;
        }
        let current = labels[v];
        let mut internal = 0.0;
        let mut external = 0.0;
        let mut per_community: FxHashMap<u32, f64> = FxHashMap::default();
        for &(w, weight) in &adj[v] {
            let c = labels[w as usize];
            *per_community.entry(c).or_insert(0.0) += weight;
            if c == current {
                internal += weight;
            } else {
                external += weight;
            }
        }
        if external <= internal {
            continue;
        }
        let mut candidates: Vec<(u32, f64)> = per_community
            .into_iter()
            .filter(|&(c, _)| c != current)
            .collect();
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        if let Some(&(best, weight)) = candidates.first() {
            if weight > internal {
                labels[v] = best;
            }
        }
    }
}

fn modularity_of(
    labels: &[u32],
    adj: &[Vec<(u32, f64)>],
    degrees: &[f64],
    total_weight: f64,
    resolution: f64,
) -> f64 {
    let mut internal: FxHashMap<u32, f64> = FxHashMap::default();
    let mut community_degree: FxHashMap<u32, f64> = FxHashMap::default();

    for v in 0..labels.len() {
        *community_degree.entry(labels[v]).or_insert(0.0) += degrees[v];
        for &(w, weight) in &adj[v] {
            // Each undirected edge appears twice in the adjacency; count once.
            if (w as usize) > v && labels[w as usize] == labels[v] {
                *internal.entry(labels[v]).or_insert(0.0) += weight;
            }
        }
    }

    let mut q = 0.0;
    for (&c, &degree) in &community_degree {
        let inside = internal.get(&c).copied().unwrap_or(0.0);
        let share = degree / (2.0 * total_weight);
        q += inside / total_weight - resolution * share * share;
    }
    q
}

/// Group labels into communities ordered by size descending, ties by the
/// lexicographically smallest member symbol id, and count boundary edges.
fn finalize(g: &CodeGraph, labels: &[u32]) -> (Vec<Community>, Vec<usize>) {
    let mut groups: FxHashMap<u32, Vec<NodeIdx>> = FxHashMap::default();
    for (v, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(NodeIdx(v as u32));
    }

    let mut ordered: Vec<(u32, Vec<NodeIdx>)> = groups.into_iter().collect();
    ordered.sort_by(|a, b| {
        b.1.len().cmp(&a.1.len()).then_with(|| {
            let min_a = a.1.iter().map(|&v| &g.symbol(v).id).min();
            let min_b = b.1.iter().map(|&v| &g.symbol(v).id).min();
            min_a.cmp(&min_b)
        })
    });

    let mut position_of_label: FxHashMap<u32, usize> = FxHashMap::default();
    for (pos, (label, _)) in ordered.iter().enumerate() {
        position_of_label.insert(*label, pos);
    }
    let membership: Vec<usize> = labels.iter().map(|l| position_of_label[l]).collect();

    let mut communities: Vec<Community> = ordered
        .into_iter()
        .map(|(_, nodes)| Community {
            nodes,
            internal_edges: 0,
            external_edges: 0,
        })
        .collect();

    for (from, e) in g.edges() {
        if e.kind != arbor_core::EdgeKind::Calls {
            continue;
        }
        let a = membership[from.ix()];
        let b = membership[e.other.ix()];
        if a == b {
            communities[a].internal_edges += 1;
        } else {
            communities[a].external_edges += 1;
            communities[b].external_edges += 1;
        }
    }

    (communities, membership)
}
