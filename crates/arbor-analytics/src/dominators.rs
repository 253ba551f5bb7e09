//! Dominator tree over the call graph
//!
//! Iterative Cooper-Harvey-Kennedy data-flow scheme over reverse postorder.
//! Correct on reducible and irreducible graphs; the fix-point loop is capped
//! and reports convergence, so termination is guaranteed either way. Nodes
//! unreachable from the entry have no entry in the tree.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::FxHashMap;

use crate::util::{calls_in, calls_out};

const UNDEFINED: u32 = u32::MAX;
const MAX_SWEEPS: usize = 1000;

/// Raw fix-point result shared by dominators and post-dominators.
pub(crate) struct FlowResult {
    /// Reverse postorder, entry first.
    pub rpo: Vec<u32>,
    /// Node -> immediate dominator; the entry maps to itself.
    pub idom: Vec<u32>,
    pub converged: bool,
}

/// Iterative immediate-dominator computation on explicit adjacency. The
/// caller decides what "edges" and "entry" mean (forward graph for
/// dominators, reversed graph with a synthetic exit for post-dominators).
pub(crate) fn immediate_dominators(
    succ: &[Vec<u32>],
    pred: &[Vec<u32>],
    entry: u32,
    cancel: &CancelToken,
) -> Result<FlowResult, Error> {
    let n = succ.len();
    let mut rpo_num = vec![UNDEFINED; n];
    let rpo = reverse_postorder(succ, entry);
    for (pos, &v) in rpo.iter().enumerate() {
        rpo_num[v as usize] = pos as u32;
    }

    let mut idom = vec![UNDEFINED; n];
    idom[entry as usize] = entry;

    let mut changed = true;
    let mut sweeps = 0usize;
    while changed && sweeps < MAX_SWEEPS {
        cancel.checkpoint()?;
        changed = false;
        sweeps += 1;
        for &b in &rpo[1..] {
            let mut new_idom = UNDEFINED;
            for &p in &pred[b as usize] {
                if rpo_num[p as usize] == UNDEFINED || idom[p as usize] == UNDEFINED {
                    continue;
                }
                new_idom = if new_idom == UNDEFINED {
                    p
                } else {
                    intersect(p, new_idom, &idom, &rpo_num)
                };
            }
            if new_idom != UNDEFINED && idom[b as usize] != new_idom {
                idom[b as usize] = new_idom;
                changed = true;
            }
        }
    }

    tracing::debug!(sweeps, converged = !changed, "dominator fix-point done");
    Ok(FlowResult {
        rpo,
        idom,
        converged: !changed,
    })
}

fn intersect(mut a: u32, mut b: u32, idom: &[u32], rpo_num: &[u32]) -> u32 {
    while a != b {
        while rpo_num[a as usize] > rpo_num[b as usize] {
            a = idom[a as usize];
        }
        while rpo_num[b as usize] > rpo_num[a as usize] {
            b = idom[b as usize];
        }
    }
    a
}

fn reverse_postorder(succ: &[Vec<u32>], entry: u32) -> Vec<u32> {
    let n = succ.len();
    let mut visited = vec![false; n];
    let mut postorder = Vec::new();
    let mut stack: Vec<(u32, usize)> = vec![(entry, 0)];
    visited[entry as usize] = true;

    while let Some(&mut (v, ref mut cursor)) = stack.last_mut() {
        if *cursor < succ[v as usize].len() {
            let w = succ[v as usize][*cursor];
            *cursor += 1;
            if !visited[w as usize] {
                visited[w as usize] = true;
                stack.push((w, 0));
            }
        } else {
            postorder.push(v);
            stack.pop();
        }
    }
    postorder.reverse();
    postorder
}

/// Dominator tree rooted at an explicit entry node.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeIdx,
    idom: FxHashMap<NodeIdx, NodeIdx>,
    depth: FxHashMap<NodeIdx, u32>,
    children: FxHashMap<NodeIdx, Vec<NodeIdx>>,
    order: Vec<NodeIdx>,
    converged: bool,
}

/// Compute the dominator tree of the call graph rooted at `entry`.
pub fn dominator_tree(
    g: &CodeGraph,
    entry: NodeIdx,
    cancel: &CancelToken,
) -> Result<DominatorTree, Error> {
    let succ = calls_out(g);
    let pred = calls_in(g);
    let flow = immediate_dominators(&succ, &pred, entry.0, cancel)?;
    Ok(DominatorTree::from_flow(entry, &flow))
}

impl DominatorTree {
    pub(crate) fn from_flow(entry: NodeIdx, flow: &FlowResult) -> Self {
        let mut idom = FxHashMap::default();
        let mut depth = FxHashMap::default();
        let mut children: FxHashMap<NodeIdx, Vec<NodeIdx>> = FxHashMap::default();
        let mut order = Vec::with_capacity(flow.rpo.len());

        depth.insert(entry, 0u32);
        for &v in &flow.rpo {
            let node = NodeIdx(v);
            order.push(node);
            if node == entry {
                continue;
            }
            let parent = NodeIdx(flow.idom[v as usize]);
            idom.insert(node, parent);
            let d = depth.get(&parent).copied().unwrap_or(0) + 1;
            depth.insert(node, d);
            children.entry(parent).or_default().push(node);
        }

        DominatorTree {
            entry,
            idom,
            depth,
            children,
            order,
            converged: flow.converged,
        }
    }

    pub fn entry(&self) -> NodeIdx {
        self.entry
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of nodes reachable from the entry.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, n: NodeIdx) -> bool {
        self.depth.contains_key(&n)
    }

    /// Reachable nodes in reverse postorder.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.order.iter().copied()
    }

    /// Immediate dominator; `None` for the entry and unreachable nodes.
    pub fn immediate_dominator(&self, n: NodeIdx) -> Option<NodeIdx> {
        self.idom.get(&n).copied()
    }

    pub fn depth_of(&self, n: NodeIdx) -> Option<u32> {
        self.depth.get(&n).copied()
    }

    pub fn children_of(&self, n: NodeIdx) -> &[NodeIdx] {
        self.children.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The chain from `n` up to the entry, both inclusive. Empty when `n` is
    /// not reachable from the entry.
    pub fn dominators_of(&self, n: NodeIdx) -> Vec<NodeIdx> {
        if !self.contains(n) {
            return Vec::new();
        }
        let mut chain = vec![n];
        let mut cursor = n;
        while let Some(parent) = self.immediate_dominator(cursor) {
            chain.push(parent);
            cursor = parent;
        }
        chain
    }

    /// The full subtree under `n` (itself included), breadth-first with
    /// children in reverse-postorder position, so the sequence is
    /// deterministic.
    pub fn dominated_by(&self, n: NodeIdx) -> Vec<NodeIdx> {
        if !self.contains(n) {
            return Vec::new();
        }
        let mut out = vec![n];
        let mut cursor = 0usize;
        while cursor < out.len() {
            let v = out[cursor];
            cursor += 1;
            out.extend_from_slice(self.children_of(v));
        }
        out
    }

    /// True when `a` dominates `b` (reflexively).
    pub fn dominates(&self, a: NodeIdx, b: NodeIdx) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let mut cursor = b;
        loop {
            if cursor == a {
                return true;
            }
            match self.immediate_dominator(cursor) {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }
}
