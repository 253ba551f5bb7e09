//! Dominance frontiers and merge points
//!
//! Cooper's frontier construction over a completed dominator tree: for each
//! join node, walk every predecessor up to the join's immediate dominator.
//! A node's merge-point degree counts how many distinct dominator subtrees
//! flow into it.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dominators::DominatorTree;
use crate::util::calls_in;

#[derive(Debug, Clone)]
pub struct DominanceFrontier {
    frontier: FxHashMap<NodeIdx, Vec<NodeIdx>>,
    degree: FxHashMap<NodeIdx, usize>,
}

/// Compute `frontier[n]` for every node in the dominator tree.
pub fn dominance_frontier(
    g: &CodeGraph,
    dom: &DominatorTree,
    cancel: &CancelToken,
) -> Result<DominanceFrontier, Error> {
    let pred = calls_in(g);
    let mut sets: FxHashMap<NodeIdx, FxHashSet<NodeIdx>> = FxHashMap::default();

    for b in dom.nodes() {
        cancel.checkpoint()?;
        let Some(idom_b) = dom.immediate_dominator(b) else {
            continue; // the entry has no frontier walk
        };
        let preds: Vec<NodeIdx> = pred[b.ix()]
            .iter()
            .map(|&p| NodeIdx(p))
            .filter(|&p| dom.contains(p))
            .collect();
        if preds.len() < 2 {
            continue;
        }
        for p in preds {
            let mut runner = p;
            while runner != idom_b {
                sets.entry(runner).or_default().insert(b);
                match dom.immediate_dominator(runner) {
                    Some(next) => runner = next,
                    None => break,
                }
            }
        }
    }

    let mut frontier: FxHashMap<NodeIdx, Vec<NodeIdx>> = FxHashMap::default();
    let mut degree: FxHashMap<NodeIdx, usize> = FxHashMap::default();
    for (node, set) in sets {
        let mut members: Vec<NodeIdx> = set.into_iter().collect();
        members.sort_unstable();
        for &m in &members {
            *degree.entry(m).or_insert(0) += 1;
        }
        frontier.insert(node, members);
    }

    Ok(DominanceFrontier { frontier, degree })
}

impl DominanceFrontier {
    /// The frontier of `n`, ordered by node index.
    pub fn of(&self, n: NodeIdx) -> &[NodeIdx] {
        self.frontier.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct nodes whose frontier contains `x`.
    pub fn merge_point_degree(&self, x: NodeIdx) -> usize {
        self.degree.get(&x).copied().unwrap_or(0)
    }

    /// Nodes with merge-point degree >= 2, ordered by degree descending and
    /// symbol id ascending.
    pub fn merge_points(&self, g: &CodeGraph) -> Vec<(NodeIdx, usize)> {
        let mut points: Vec<(NodeIdx, usize)> = self
            .degree
            .iter()
            .filter(|&(_, &d)| d >= 2)
            .map(|(&n, &d)| (n, d))
            .collect();
        points.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| g.symbol(a.0).id.cmp(&g.symbol(b.0).id))
        });
        points
    }
}
