//! Single-entry single-exit region decomposition
//!
//! A region pairs an entry that dominates its exit with an exit that
//! post-dominates the entry. For every entry the nearest such exit on its
//! post-dominator chain is taken, and the member set is everything the entry
//! dominates that the exit post-dominates. Regions are nested into a laminar
//! hierarchy; candidates that would partially overlap an already-placed
//! region are discarded.
//!
//! When post-dominators are unavailable (a graph with no sinks), region
//! boundaries cannot be proven and the dominator-subtree approximation is
//! returned instead, flagged `approximate`.

use arbor_core::{CancelToken, CodeGraph, Error, NodeIdx};
use rustc_hash::FxHashMap;

use crate::dominators::DominatorTree;
use crate::postdom::PostDominatorTree;

#[derive(Debug, Clone)]
pub struct Region {
    pub entry: NodeIdx,
    pub exit: NodeIdx,
    /// Entry plus interior nodes; the exit is excluded.
    pub nodes: Vec<NodeIdx>,
    /// Nesting depth within the region hierarchy, outermost at 0.
    pub depth: u32,
    /// Indices of directly nested regions.
    pub children: Vec<usize>,
}

impl Region {
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn has_nested_regions(&self) -> bool {
        !self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RegionTree {
    pub regions: Vec<Region>,
    /// True when boundaries come from the dominator-subtree fallback.
    pub approximate: bool,
}

/// Detect SESE regions from completed dominator and post-dominator trees.
/// Falls back to [`approximate_regions`] when the post-dominator relation is
/// degenerate.
pub fn sese_regions(
    g: &CodeGraph,
    dom: &DominatorTree,
    pdom: &PostDominatorTree,
    cancel: &CancelToken,
) -> Result<RegionTree, Error> {
    if pdom.is_degenerate() || pdom.is_empty() {
        return approximate_regions(g, dom, cancel);
    }

    // One candidate per entry: the nearest post-dominator that the entry
    // dominates.
    let mut candidates: Vec<(NodeIdx, NodeIdx, Vec<NodeIdx>)> = Vec::new();
    for entry in dom.nodes() {
        cancel.checkpoint()?;
        if !pdom.contains(entry) {
            continue;
        }
        let mut exit = None;
        let mut cursor = entry;
        while let Some(x) = pdom.immediate_post_dominator(cursor) {
            if dom.dominates(entry, x) {
                exit = Some(x);
                break;
            }
            cursor = x;
        }
        let Some(exit) = exit else {
            continue;
        };
        let nodes: Vec<NodeIdx> = dom
            .dominated_by(entry)
            .into_iter()
            .filter(|&n| n != exit && pdom.post_dominates(exit, n))
            .collect();
        if nodes.is_empty() {
            continue;
        }
        candidates.push((entry, exit, nodes));
    }

    // Largest first so every candidate's enclosing region is already placed
    // when it arrives.
    candidates.sort_by(|a, b| b.2.len().cmp(&a.2.len()));

    let mut regions: Vec<Region> = Vec::new();
    let mut owner: FxHashMap<NodeIdx, usize> = FxHashMap::default();
    for (entry, exit, nodes) in candidates {
        let first_owner = owner.get(&nodes[0]).copied();
        let laminar = nodes.iter().all(|n| owner.get(n).copied() == first_owner);
        if !laminar {
            tracing::debug!(%entry, %exit, "discarding partially overlapping region");
            continue;
        }
        let region_idx = regions.len();
        let depth = match first_owner {
            Some(parent) => {
                regions[parent].children.push(region_idx);
                regions[parent].depth + 1
            }
            None => 0,
        };
        for &n in &nodes {
            owner.insert(n, region_idx);
        }
        regions.push(Region {
            entry,
            exit,
            nodes,
            depth,
            children: Vec::new(),
        });
    }

    tracing::debug!(regions = regions.len(), nodes = g.node_count(), "sese regions built");
    Ok(RegionTree {
        regions,
        approximate: false,
    })
}

/// Dominator-subtree approximation: every non-leaf dominator-tree node spans
/// a pseudo-region over its subtree, with the exit unknown (set to the
/// entry). Hierarchy and depth follow dominator nesting.
pub fn approximate_regions(
    g: &CodeGraph,
    dom: &DominatorTree,
    cancel: &CancelToken,
) -> Result<RegionTree, Error> {
    tracing::debug!(nodes = g.node_count(), "post-dominators unavailable, approximating regions");
    let mut regions: Vec<Region> = Vec::new();
    let mut region_of: FxHashMap<NodeIdx, usize> = FxHashMap::default();

    // Reverse postorder means ancestors come before their descendants, so a
    // parent region always exists by the time a nested one is created.
    for entry in dom.nodes() {
        cancel.checkpoint()?;
        if dom.children_of(entry).is_empty() {
            continue;
        }
        let nodes = dom.dominated_by(entry);
        let parent = nearest_region_ancestor(dom, entry, &region_of);
        let region_idx = regions.len();
        let depth = match parent {
            Some(p) => {
                regions[p].children.push(region_idx);
                regions[p].depth + 1
            }
            None => 0,
        };
        region_of.insert(entry, region_idx);
        regions.push(Region {
            entry,
            exit: entry,
            nodes,
            depth,
            children: Vec::new(),
        });
    }

    Ok(RegionTree {
        regions,
        approximate: true,
    })
}

fn nearest_region_ancestor(
    dom: &DominatorTree,
    n: NodeIdx,
    region_of: &FxHashMap<NodeIdx, usize>,
) -> Option<usize> {
    let mut cursor = dom.immediate_dominator(n)?;
    loop {
        if let Some(&r) = region_of.get(&cursor) {
            return Some(r);
        }
        cursor = dom.immediate_dominator(cursor)?;
    }
}
