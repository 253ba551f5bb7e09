//! Shortest path by breadth-first search
//!
//! Considers every edge type uniformly. Ties between equal-length paths are
//! broken by edge insertion order: the first predecessor discovered wins.

use std::collections::VecDeque;

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};

/// How many dequeued nodes between cancellation polls.
const CANCEL_STRIDE: usize = 100;

/// Result of a shortest-path search. `length == -1` with an empty `path`
/// means the target is unreachable from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPath {
    pub length: i64,
    pub path: Vec<NodeIdx>,
}

impl ShortestPath {
    pub fn found(&self) -> bool {
        self.length >= 0
    }

    fn unreachable() -> Self {
        ShortestPath {
            length: -1,
            path: Vec::new(),
        }
    }
}

/// BFS over all edge types from `from` to `to`. O(V+E).
pub fn shortest_path(
    g: &CodeGraph,
    from: NodeIdx,
    to: NodeIdx,
    cancel: &CancelToken,
) -> Result<ShortestPath, Error> {
    if from == to {
        return Ok(ShortestPath {
            length: 0,
            path: vec![from],
        });
    }

    let n = g.node_count();
    let mut parent: Vec<u32> = vec![u32::MAX; n];
    let mut visited = vec![false; n];
    visited[from.ix()] = true;

    let mut queue: VecDeque<u32> = VecDeque::new();
    queue.push_back(from.0);
    let mut dequeued = 0usize;

    while let Some(v) = queue.pop_front() {
        dequeued += 1;
        if dequeued % CANCEL_STRIDE == 0 {
            cancel.checkpoint()?;
        }
        for e in g.outgoing(NodeIdx(v)) {
            let w = e.other;
            if visited[w.ix()] {
                continue;
            }
            visited[w.ix()] = true;
            parent[w.ix()] = v;
            if w == to {
                return Ok(reconstruct(from, to, &parent));
            }
            queue.push_back(w.0);
        }
    }

    Ok(ShortestPath::unreachable())
}

fn reconstruct(from: NodeIdx, to: NodeIdx, parent: &[u32]) -> ShortestPath {
    let mut path = vec![to];
    let mut cursor = to;
    while cursor != from {
        cursor = NodeIdx(parent[cursor.ix()]);
        path.push(cursor);
    }
    path.reverse();
    ShortestPath {
        length: path.len() as i64 - 1,
        path,
    }
}

/// All nodes reachable from `seeds` over every edge type, in BFS order.
pub fn reachable_from(
    g: &CodeGraph,
    seeds: &[NodeIdx],
    cancel: &CancelToken,
) -> Result<Vec<NodeIdx>, Error> {
    let n = g.node_count();
    let mut visited = vec![false; n];
    let mut order = Vec::new();
    let mut queue: VecDeque<u32> = VecDeque::new();

    for &s in seeds {
        if !visited[s.ix()] {
            visited[s.ix()] = true;
            order.push(s);
            queue.push_back(s.0);
        }
    }

    let mut dequeued = 0usize;
    while let Some(v) = queue.pop_front() {
        dequeued += 1;
        if dequeued % CANCEL_STRIDE == 0 {
            cancel.checkpoint()?;
        }
        for e in g.outgoing(NodeIdx(v)) {
            if !visited[e.other.ix()] {
                visited[e.other.ix()] = true;
                order.push(e.other);
                queue.push_back(e.other.0);
            }
        }
    }
    Ok(order)
}
