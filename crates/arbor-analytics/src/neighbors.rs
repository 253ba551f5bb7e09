//! Caller, callee, and reference scans
//!
//! Bounded adjacency scans in edge insertion order. A `limit` of 0 means
//! unlimited; the façade enforces its own lower bound before calling in.

use arbor_core::{CancelToken, CodeGraph, EdgeKind, Error, NodeIdx, SourceLocation};
use rustc_hash::FxHashSet;

const CANCEL_STRIDE: usize = 100;

/// An incoming edge of any type, with the site where it is expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub from: NodeIdx,
    pub kind: EdgeKind,
    pub site: SourceLocation,
}

/// Distinct predecessors of `of` across `Calls` edges, up to `limit`.
pub fn callers(
    g: &CodeGraph,
    of: NodeIdx,
    limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<NodeIdx>, Error> {
    distinct_calls_endpoints(g.incoming(of), limit, cancel)
}

/// Distinct successors of `of` across `Calls` edges, up to `limit`.
pub fn callees(
    g: &CodeGraph,
    of: NodeIdx,
    limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<NodeIdx>, Error> {
    distinct_calls_endpoints(g.outgoing(of), limit, cancel)
}

fn distinct_calls_endpoints(
    edges: &[arbor_core::EdgeRef],
    limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<NodeIdx>, Error> {
    let mut seen: FxHashSet<NodeIdx> = FxHashSet::default();
    let mut out = Vec::new();
    for (scanned, e) in edges.iter().enumerate() {
        if scanned > 0 && scanned % CANCEL_STRIDE == 0 {
            cancel.checkpoint()?;
        }
        if e.kind != EdgeKind::Calls {
            continue;
        }
        if seen.insert(e.other) {
            out.push(e.other);
            if limit > 0 && out.len() >= limit {
                break;
            }
        }
    }
    Ok(out)
}

/// Incoming edges of any type into `of`, with their sites, up to `limit`.
pub fn references(
    g: &CodeGraph,
    of: NodeIdx,
    limit: usize,
    cancel: &CancelToken,
) -> Result<Vec<Reference>, Error> {
    let mut out = Vec::new();
    for (scanned, e) in g.incoming(of).iter().enumerate() {
        if scanned > 0 && scanned % CANCEL_STRIDE == 0 {
            cancel.checkpoint()?;
        }
        out.push(Reference {
            from: e.other,
            kind: e.kind,
            site: e.site.clone(),
        });
        if limit > 0 && out.len() >= limit {
            break;
        }
    }
    Ok(out)
}
