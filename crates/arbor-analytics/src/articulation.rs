//! Articulation points of the undirected call-graph projection
//!
//! Iterative Hopcroft-Tarjan: a non-root vertex is a cut vertex when some
//! DFS child subtree cannot reach above it; a root is one when it has two or
//! more DFS children.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::FxHashSet;

use crate::util::undirected_calls;

const UNVISITED: u32 = u32::MAX;

/// Cut vertices of the call graph, ordered by node index.
pub fn articulation_points(
    g: &CodeGraph,
    cancel: &CancelToken,
) -> Result<Vec<NodeIdx>, Error> {
    let (weighted, _, _) = undirected_calls(g);
    // Simple adjacency: parallel calls collapse to one undirected edge.
    let adj: Vec<Vec<u32>> = weighted
        .iter()
        .map(|nbrs| nbrs.iter().map(|&(w, _)| w).collect())
        .collect();

    let n = g.node_count();
    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0u32; n];
    let mut parent = vec![UNVISITED; n];
    let mut next = 0u32;
    let mut cut: FxHashSet<u32> = FxHashSet::default();

    for root in 0..n as u32 {
        if disc[root as usize] != UNVISITED {
            continue;
        }
        cancel.checkpoint()?;

        let mut root_children = 0usize;
        let mut stack: Vec<(u32, usize)> = vec![(root, 0)];
        disc[root as usize] = next;
        low[root as usize] = next;
        next += 1;

        while let Some(&mut (v, ref mut cursor)) = stack.last_mut() {
            if *cursor < adj[v as usize].len() {
                let w = adj[v as usize][*cursor];
                *cursor += 1;
                if disc[w as usize] == UNVISITED {
                    parent[w as usize] = v;
                    if v == root {
                        root_children += 1;
                    }
                    disc[w as usize] = next;
                    low[w as usize] = next;
                    next += 1;
                    stack.push((w, 0));
                } else if w != parent[v as usize] {
                    low[v as usize] = low[v as usize].min(disc[w as usize]);
                }
            } else {
                stack.pop();
                if let Some(&(p, _)) = stack.last() {
                    low[p as usize] = low[p as usize].min(low[v as usize]);
                    if p != root && low[v as usize] >= disc[p as usize] {
                        cut.insert(p);
                    }
                }
            }
        }

        if root_children >= 2 {
            cut.insert(root);
        }
    }

    let mut points: Vec<NodeIdx> = cut.into_iter().map(NodeIdx).collect();
    points.sort_unstable();
    Ok(points)
}
