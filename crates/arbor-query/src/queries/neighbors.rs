//! Caller, callee, reference, and search queries
//!
//! By-name variants resolve through the index and group results per resolved
//! id, so ambiguous names stay observable and the limit applies per id. The
//! total across ids can therefore exceed the limit.

use std::collections::BTreeMap;

use arbor_analytics::{callees, callers, references};
use arbor_core::{CancelToken, Error, GraphHandle, NodeIdx};

use super::acquire;
use crate::config::{LIMIT_RANGE, QueryConfig, clamp_usize};
use crate::report::{NeighborsReport, ReferenceSite, ReferencesReport, SearchReport, SymbolRef};
use crate::resolve::resolve_all;
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone)]
pub struct NeighborParams {
    /// Symbol id or display name.
    pub target: String,
    /// Per-resolved-id cap.
    pub limit: usize,
}

impl NeighborParams {
    pub fn new(target: impl Into<String>) -> Self {
        NeighborParams {
            target: target.into(),
            limit: QueryConfig::default().limit,
        }
    }
}

impl Default for NeighborParams {
    fn default() -> Self {
        Self::new("")
    }
}

enum Side {
    Callers,
    Callees,
}

/// Who calls the target.
pub fn find_callers(
    handle: &GraphHandle,
    params: NeighborParams,
    cancel: &CancelToken,
) -> Traced<NeighborsReport> {
    neighbor_query("find_callers", Side::Callers, handle, params, cancel)
}

/// What the target calls.
pub fn find_callees(
    handle: &GraphHandle,
    params: NeighborParams,
    cancel: &CancelToken,
) -> Traced<NeighborsReport> {
    neighbor_query("find_callees", Side::Callees, handle, params, cancel)
}

fn neighbor_query(
    action: &'static str,
    side: Side,
    handle: &GraphHandle,
    params: NeighborParams,
    cancel: &CancelToken,
) -> Traced<NeighborsReport> {
    let mut tb = TraceBuilder::new(action, "call_edge_scan").target(params.target.clone());
    if params.target.is_empty() {
        return tb.finish(Err(Error::InvalidArgument(
            "a `target` symbol is required".into(),
        )));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let limit = clamp_usize("limit", params.limit, LIMIT_RANGE);
    tb.meta("limit", limit);

    let resolved = resolve_all(&g, &params.target);
    tb.meta("resolved", resolved.len());

    let mut results: BTreeMap<String, Vec<SymbolRef>> = BTreeMap::new();
    let mut total = 0usize;
    for idx in resolved {
        let nodes = match side {
            Side::Callers => callers(&g, idx, limit, cancel),
            Side::Callees => callees(&g, idx, limit, cancel),
        };
        let nodes = match nodes {
            Ok(n) => n,
            Err(e) => return tb.finish(Err(e)),
        };
        total += nodes.len();
        results.insert(
            g.symbol(idx).id.0.clone(),
            nodes.iter().map(|&n| SymbolRef::of(&g, n)).collect(),
        );
    }

    tb.finish(Ok(NeighborsReport {
        target: params.target,
        total,
        results,
    }))
}

/// Every incoming edge of any type, with the site it is expressed at.
pub fn find_references(
    handle: &GraphHandle,
    params: NeighborParams,
    cancel: &CancelToken,
) -> Traced<ReferencesReport> {
    let mut tb = TraceBuilder::new("find_references", "reference_scan").target(params.target.clone());
    if params.target.is_empty() {
        return tb.finish(Err(Error::InvalidArgument(
            "a `target` symbol is required".into(),
        )));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let limit = clamp_usize("limit", params.limit, LIMIT_RANGE);
    tb.meta("limit", limit);

    let resolved = resolve_all(&g, &params.target);
    tb.meta("resolved", resolved.len());

    let mut results: BTreeMap<String, Vec<ReferenceSite>> = BTreeMap::new();
    let mut total = 0usize;
    for idx in resolved {
        let refs = match references(&g, idx, limit, cancel) {
            Ok(r) => r,
            Err(e) => return tb.finish(Err(e)),
        };
        total += refs.len();
        results.insert(
            g.symbol(idx).id.0.clone(),
            refs.iter()
                .map(|r| ReferenceSite {
                    from: g.symbol(r.from).id.0.clone(),
                    kind: r.kind.as_str().to_string(),
                    file: r.site.file.clone(),
                    line: r.site.line,
                })
                .collect(),
        );
    }

    tb.finish(Ok(ReferencesReport {
        target: params.target,
        total,
        results,
    }))
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub prefix: String,
    /// 0 means unlimited.
    pub limit: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            prefix: String::new(),
            limit: QueryConfig::default().limit,
        }
    }
}

/// Symbol search: exact name matches first, then case-insensitive prefix
/// matches, both in insertion order.
pub fn search_symbols(
    handle: &GraphHandle,
    params: SearchParams,
    cancel: &CancelToken,
) -> Traced<SearchReport> {
    let mut tb = TraceBuilder::new("search_symbols", "index_search").target(params.prefix.clone());
    if let Err(e) = cancel.checkpoint() {
        return tb.finish(Err(e));
    }
    if params.prefix.is_empty() {
        return tb.finish(Err(Error::InvalidArgument(
            "a search `prefix` is required".into(),
        )));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let limit = if params.limit == 0 {
        0
    } else {
        clamp_usize("limit", params.limit, LIMIT_RANGE)
    };
    tb.meta("limit", limit);

    let matches: Vec<SymbolRef> = g
        .search(&params.prefix, limit)
        .into_iter()
        .map(|idx: NodeIdx| SymbolRef::of(&g, idx))
        .collect();
    tb.meta("matches", matches.len());
    tb.finish(Ok(SearchReport { matches }))
}
