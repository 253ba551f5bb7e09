//! Post-dominators: the dominator computation on the reversed call graph
//!
//! A synthetic exit is attached to every sink (node without outgoing `Calls`
//! edges) and the fix-point runs from there. When the graph has no sinks at
//! all (every node sits on a cycle) the exit is attached to every node,
//! which collapses the relation to reflexivity; such a tree reports itself
//! `degenerate` and region detection falls back to its approximation.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::dominators::immediate_dominators;
use crate::util::{calls_in, calls_out};

/// Post-dominator relation over the call graph.
#[derive(Debug, Clone)]
pub struct PostDominatorTree {
    /// Node -> immediate post-dominator. Nodes directly below the synthetic
    /// exit (the sinks) have no entry here but are still contained.
    ipdom: FxHashMap<NodeIdx, NodeIdx>,
    contained: FxHashSet<NodeIdx>,
    /// Distance from the synthetic exit, minus one: sinks sit at depth 0.
    depth: FxHashMap<NodeIdx, u32>,
    children: FxHashMap<NodeIdx, Vec<NodeIdx>>,
    roots: Vec<NodeIdx>,
    converged: bool,
    degenerate: bool,
}

/// Compute post-dominators of the call graph.
pub fn post_dominator_tree(
    g: &CodeGraph,
    cancel: &CancelToken,
) -> Result<PostDominatorTree, Error> {
    let out = calls_out(g);
    let inn = calls_in(g);
    let n = g.node_count();
    let exit = n as u32;

    let sinks: Vec<u32> = (0..n)
        .filter(|&v| out[v].is_empty())
        .map(|v| v as u32)
        .collect();
    let degenerate = sinks.is_empty();
    let attach: Vec<u32> = if degenerate {
        (0..n as u32).collect()
    } else {
        sinks
    };

    // Reversed graph with the synthetic exit as node `n`: successors of a
    // node are its original callers, and the exit leads to every attached
    // node.
    let mut succ: Vec<Vec<u32>> = inn;
    succ.push(attach.clone());
    let mut pred: Vec<Vec<u32>> = out;
    for &s in &attach {
        pred[s as usize].push(exit);
    }
    pred.push(Vec::new());

    let flow = immediate_dominators(&succ, &pred, exit, cancel)?;

    let mut ipdom = FxHashMap::default();
    let mut contained = FxHashSet::default();
    let mut depth = FxHashMap::default();
    let mut children: FxHashMap<NodeIdx, Vec<NodeIdx>> = FxHashMap::default();
    let mut roots = Vec::new();

    for &v in &flow.rpo {
        if v == exit {
            continue;
        }
        let node = NodeIdx(v);
        contained.insert(node);
        let parent = flow.idom[v as usize];
        if parent == exit {
            depth.insert(node, 0);
            roots.push(node);
        } else {
            let p = NodeIdx(parent);
            ipdom.insert(node, p);
            let d = depth.get(&p).copied().unwrap_or(0) + 1;
            depth.insert(node, d);
            children.entry(p).or_default().push(node);
        }
    }

    Ok(PostDominatorTree {
        ipdom,
        contained,
        depth,
        children,
        roots,
        converged: flow.converged,
        degenerate,
    })
}

impl PostDominatorTree {
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// True when the graph had no sinks and the relation is only reflexive.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn len(&self) -> usize {
        self.contained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contained.is_empty()
    }

    pub fn contains(&self, n: NodeIdx) -> bool {
        self.contained.contains(&n)
    }

    /// Immediate post-dominator; `None` for sinks and uncontained nodes.
    pub fn immediate_post_dominator(&self, n: NodeIdx) -> Option<NodeIdx> {
        self.ipdom.get(&n).copied()
    }

    pub fn depth_of(&self, n: NodeIdx) -> Option<u32> {
        self.depth.get(&n).copied()
    }

    pub fn children_of(&self, n: NodeIdx) -> &[NodeIdx] {
        self.children.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes whose only post-dominator is the synthetic exit (the sinks).
    pub fn roots(&self) -> &[NodeIdx] {
        &self.roots
    }

    /// The chain from `n` towards the synthetic exit, `n` included.
    pub fn post_dominators_of(&self, n: NodeIdx) -> Vec<NodeIdx> {
        if !self.contains(n) {
            return Vec::new();
        }
        let mut chain = vec![n];
        let mut cursor = n;
        while let Some(parent) = self.immediate_post_dominator(cursor) {
            chain.push(parent);
            cursor = parent;
        }
        chain
    }

    /// True when `x` post-dominates `n` (reflexively).
    pub fn post_dominates(&self, x: NodeIdx, n: NodeIdx) -> bool {
        if !self.contains(x) || !self.contains(n) {
            return false;
        }
        let mut cursor = n;
        loop {
            if cursor == x {
                return true;
            }
            match self.immediate_post_dominator(cursor) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }
}
