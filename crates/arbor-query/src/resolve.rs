//! Symbol and entry-point resolution
//!
//! Queries accept either an exact symbol id or a display name. Names
//! collide; the documented tie-break prefers Function/Method, then the first
//! match by index insertion. Composite queries record in trace metadata when
//! disambiguation happened.

use arbor_core::{CodeGraph, NodeIdx};

const ENTRY_NAMES: [&str; 4] = ["main", "Main", "init", "Init"];

/// Outcome of resolving one name or id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolution {
    pub idx: NodeIdx,
    pub ambiguous: bool,
    pub candidates: usize,
}

/// Resolve a target to a single node: exact id first, then by name with the
/// Function/Method preference.
pub(crate) fn resolve_target(g: &CodeGraph, raw: &str) -> Option<Resolution> {
    if let Some(idx) = g.resolve(raw) {
        return Some(Resolution {
            idx,
            ambiguous: false,
            candidates: 1,
        });
    }
    let matches = g.index().named(raw);
    if matches.is_empty() {
        return None;
    }
    let idx = matches
        .iter()
        .copied()
        .find(|&i| g.symbol(i).kind.is_callable())
        .unwrap_or(matches[0]);
    Some(Resolution {
        idx,
        ambiguous: matches.len() > 1,
        candidates: matches.len(),
    })
}

/// Resolve to every node a name maps to, in insertion order. An exact id
/// yields exactly one.
pub(crate) fn resolve_all(g: &CodeGraph, raw: &str) -> Vec<NodeIdx> {
    if let Some(idx) = g.resolve(raw) {
        return vec![idx];
    }
    g.index().named(raw).to_vec()
}

/// Entry points: conventional names first, then nodes without incoming
/// edges. Insertion order throughout.
pub(crate) fn detect_entries(g: &CodeGraph) -> Vec<NodeIdx> {
    let mut entries: Vec<NodeIdx> = Vec::new();
    for name in ENTRY_NAMES {
        for &idx in g.index().named(name) {
            if g.symbol(idx).kind.is_callable() && !entries.contains(&idx) {
                entries.push(idx);
            }
        }
    }
    if !entries.is_empty() {
        return entries;
    }
    g.nodes()
        .filter(|&(idx, _)| g.incoming(idx).is_empty())
        .map(|(idx, _)| idx)
        .collect()
}

/// First detected entry point, if any.
pub(crate) fn detect_entry(g: &CodeGraph) -> Option<NodeIdx> {
    detect_entries(g).into_iter().next()
}
