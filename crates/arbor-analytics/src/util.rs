//! Call-graph adjacency scratch structures shared by the kernels
//!
//! Kernels never mutate the graph; they build per-invocation index-based
//! adjacency over the `Calls` edges they operate on.

use arbor_core::{CodeGraph, EdgeKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Outgoing `Calls` adjacency, per node, in edge insertion order.
pub(crate) fn calls_out(g: &CodeGraph) -> Vec<Vec<u32>> {
    let mut adj = vec![Vec::new(); g.node_count()];
    for (from, e) in g.edges() {
        if e.kind == EdgeKind::Calls {
            adj[from.ix()].push(e.other.0);
        }
    }
    adj
}

/// Incoming `Calls` adjacency, per node, in edge insertion order.
pub(crate) fn calls_in(g: &CodeGraph) -> Vec<Vec<u32>> {
    let mut adj = vec![Vec::new(); g.node_count()];
    for (from, e) in g.edges() {
        if e.kind == EdgeKind::Calls {
            adj[e.other.ix()].push(from.0);
        }
    }
    adj
}

/// Undirected projection of the `Calls` edges: neighbor lists with edge
/// multiplicity as weight, per-node weighted degrees, and the total weight
/// (each undirected edge counted once). Self-loops are dropped; adjacency
/// order follows the first occurrence of each pair in the frozen edge walk,
/// so it is deterministic for a fixed graph.
pub(crate) fn undirected_calls(g: &CodeGraph) -> (Vec<Vec<(u32, f64)>>, Vec<f64>, f64) {
    let n = g.node_count();
    let mut pair_weight: FxHashMap<(u32, u32), f64> = FxHashMap::default();
    for (from, e) in g.edges() {
        if e.kind != EdgeKind::Calls || from == e.other {
            continue;
        }
        let key = (from.0.min(e.other.0), from.0.max(e.other.0));
        *pair_weight.entry(key).or_insert(0.0) += 1.0;
    }

    let mut adj: Vec<Vec<(u32, f64)>> = vec![Vec::new(); n];
    let mut emitted: FxHashSet<(u32, u32)> = FxHashSet::default();
    let mut total = 0.0;
    for (from, e) in g.edges() {
        if e.kind != EdgeKind::Calls || from == e.other {
            continue;
        }
        let key = (from.0.min(e.other.0), from.0.max(e.other.0));
        if !emitted.insert(key) {
            continue;
        }
        let w = pair_weight[&key];
        adj[key.0 as usize].push((key.1, w));
        adj[key.1 as usize].push((key.0, w));
        total += w;
    }

    let degrees: Vec<f64> = adj
        .iter()
        .map(|nbrs| nbrs.iter().map(|(_, w)| w).sum())
        .collect();
    (adj, degrees, total)
}
