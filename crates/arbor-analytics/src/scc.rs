//! Strongly connected components of the call graph
//!
//! Iterative Tarjan over `Calls` edges. Components come back in discovery
//! order of the outer DFS, and members within a component in discovery
//! order, so output is deterministic for a fixed graph.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};

use crate::util::calls_out;

const UNVISITED: u32 = u32::MAX;

/// A non-trivial strongly connected component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Members in discovery order.
    pub nodes: Vec<NodeIdx>,
    /// Distinct packages touched, in member order.
    pub packages: Vec<String>,
}

/// All strongly connected components, singletons included.
pub fn strongly_connected_components(
    g: &CodeGraph,
    cancel: &CancelToken,
) -> Result<Vec<Vec<NodeIdx>>, Error> {
    let adj = calls_out(g);
    let n = g.node_count();

    let mut disc = vec![UNVISITED; n];
    let mut low = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut call_stack: Vec<(u32, usize)> = Vec::new();
    let mut next = 0u32;
    let mut components: Vec<Vec<NodeIdx>> = Vec::new();

    for root in 0..n as u32 {
        if disc[root as usize] != UNVISITED {
            continue;
        }
        cancel.checkpoint()?;

        disc[root as usize] = next;
        low[root as usize] = next;
        next += 1;
        stack.push(root);
        on_stack[root as usize] = true;
        call_stack.push((root, 0));

        while let Some(&mut (v, ref mut cursor)) = call_stack.last_mut() {
            if *cursor < adj[v as usize].len() {
                let w = adj[v as usize][*cursor];
                *cursor += 1;
                if disc[w as usize] == UNVISITED {
                    disc[w as usize] = next;
                    low[w as usize] = next;
                    next += 1;
                    stack.push(w);
                    on_stack[w as usize] = true;
                    call_stack.push((w, 0));
                } else if on_stack[w as usize] {
                    low[v as usize] = low[v as usize].min(disc[w as usize]);
                }
            } else {
                call_stack.pop();
                if let Some(&(parent, _)) = call_stack.last() {
                    low[parent as usize] = low[parent as usize].min(low[v as usize]);
                }
                if low[v as usize] == disc[v as usize] {
                    let mut component = Vec::new();
                    loop {
                        let Some(w) = stack.pop() else {
                            return Err(Error::Internal("tarjan stack underflow".into()));
                        };
                        on_stack[w as usize] = false;
                        component.push(NodeIdx(w));
                        if w == v {
                            break;
                        }
                    }
                    component.sort_by_key(|idx| disc[idx.ix()]);
                    components.push(component);
                }
            }
        }
    }

    // Tarjan emits components in reverse topological order; re-rank them by
    // the discovery index of their first member.
    components.sort_by_key(|c| disc[c[0].ix()]);
    Ok(components)
}

/// Components of size >= `min_size`. Single nodes count only when
/// `min_size <= 1` and the node carries a `Calls` self-loop.
pub fn cycles(g: &CodeGraph, min_size: usize, cancel: &CancelToken) -> Result<Vec<Cycle>, Error> {
    let adj = calls_out(g);
    let min_size = min_size.max(1);
    let components = strongly_connected_components(g, cancel)?;

    let mut out = Vec::new();
    for component in components {
        if component.len() < min_size {
            continue;
        }
        if component.len() == 1 {
            let v = component[0];
            let has_self_loop = adj[v.ix()].iter().any(|&w| w == v.0);
            if !has_self_loop {
                continue;
            }
        }
        let mut packages: Vec<String> = Vec::new();
        for &idx in &component {
            let pkg = &g.symbol(idx).package;
            if !packages.iter().any(|p| p == pkg) {
                packages.push(pkg.clone());
            }
        }
        out.push(Cycle {
            nodes: component,
            packages,
        });
    }
    tracing::debug!(cycles = out.len(), "tarjan scc complete");
    Ok(out)
}
