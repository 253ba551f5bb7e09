//! Dominator-based queries: dominators, merge points, critical path, LCD

use arbor_analytics::{dominance_frontier, dominator_tree};
use arbor_core::{CancelToken, CodeGraph, Error, GraphHandle, NodeIdx};

use super::acquire;
use crate::config::{QueryConfig, TOP_RANGE, clamp_usize};
use crate::report::{
    CriticalPathReport, DominatorHop, DominatorsReport, LcdReport, MergePointEntry,
    MergePointsReport, PathHop, SymbolRef,
};
use crate::resolve::{detect_entry, resolve_target};
use crate::trace::{TraceBuilder, Traced};

/// Resolve an explicit entry, or auto-detect one (`main`/`Main`/`init`/
/// `Init`, then nodes without incoming edges). The flag reports which.
fn resolve_entry(g: &CodeGraph, explicit: Option<&str>) -> Result<(NodeIdx, bool), Error> {
    match explicit {
        Some(name) => {
            let r = resolve_target(g, name).ok_or_else(|| Error::NotFound(name.to_string()))?;
            Ok((r.idx, false))
        }
        None => detect_entry(g)
            .map(|idx| (idx, true))
            .ok_or_else(|| Error::NotFound("entry point".into())),
    }
}

#[derive(Debug, Clone, Default)]
pub struct DominatorsParams {
    pub target: String,
    pub entry: Option<String>,
}

/// Dominator chain, immediate dominator, and dominated subtree of a target.
/// An unreachable target is a successful, empty result.
pub fn find_dominators(
    handle: &GraphHandle,
    params: DominatorsParams,
    cancel: &CancelToken,
) -> Traced<DominatorsReport> {
    let mut tb = TraceBuilder::new("find_dominators", "dominator_tree").target(params.target.clone());
    if params.target.is_empty() {
        return tb.finish(Err(Error::InvalidArgument("a `target` symbol is required".into())));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let Some(target) = resolve_target(&g, &params.target) else {
        return tb.finish(Err(Error::NotFound(params.target)));
    };
    if target.ambiguous {
        tb.meta("ambiguous", "true");
        tb.meta("candidates", target.candidates);
    }
    let (entry, auto) = match resolve_entry(&g, params.entry.as_deref()) {
        Ok(pair) => pair,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("entry_auto_detected", auto);

    let tree = match dominator_tree(&g, entry, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("converged", tree.converged());

    let chain = tree.dominators_of(target.idx);
    let dominators: Vec<DominatorHop> = chain
        .iter()
        .map(|&n| {
            let sym = g.symbol(n);
            DominatorHop {
                id: sym.id.0.clone(),
                name: sym.name.clone(),
                file: sym.file.clone(),
                line: sym.start_line,
                depth: tree.depth_of(n).unwrap_or(0),
            }
        })
        .collect();
    let subtree: Vec<String> = tree
        .dominated_by(target.idx)
        .iter()
        .map(|&n| g.symbol(n).id.0.clone())
        .collect();

    tb.meta("reachable", !chain.is_empty());
    tb.finish(Ok(DominatorsReport {
        target: g.symbol(target.idx).id.0.clone(),
        target_name: g.symbol(target.idx).name.clone(),
        entry: g.symbol(entry).id.0.clone(),
        entry_auto_detected: auto,
        depth: tree.depth_of(target.idx).unwrap_or(0),
        immediate_dominator: tree
            .immediate_dominator(target.idx)
            .map(|n| g.symbol(n).id.0.clone()),
        dominators,
        subtree,
    }))
}

#[derive(Debug, Clone)]
pub struct MergePointsParams {
    pub top: usize,
    pub entry: Option<String>,
}

impl Default for MergePointsParams {
    fn default() -> Self {
        MergePointsParams {
            top: QueryConfig::default().top,
            entry: None,
        }
    }
}

/// Nodes where two or more dominance frontiers converge, ordered by degree
/// descending then id ascending.
pub fn find_merge_points(
    handle: &GraphHandle,
    params: MergePointsParams,
    cancel: &CancelToken,
) -> Traced<MergePointsReport> {
    let mut tb = TraceBuilder::new("find_merge_points", "dominance_frontier");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let top = clamp_usize("top", params.top, TOP_RANGE);
    tb.meta("top", top);

    // A list query: no detectable entry means an empty result, not an error.
    let entry = match params.entry.as_deref() {
        Some(name) => match resolve_target(&g, name) {
            Some(r) => Some(r.idx),
            None => return tb.finish(Err(Error::NotFound(name.to_string()))),
        },
        None => detect_entry(&g),
    };
    let Some(entry) = entry else {
        return tb.finish(Ok(MergePointsReport {
            entry: String::new(),
            merge_points: Vec::new(),
        }));
    };

    let tree = match dominator_tree(&g, entry, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    let frontier = match dominance_frontier(&g, &tree, cancel) {
        Ok(f) => f,
        Err(e) => return tb.finish(Err(e)),
    };

    let mut merge_points: Vec<MergePointEntry> = frontier
        .merge_points(&g)
        .into_iter()
        .map(|(n, degree)| {
            let sym = g.symbol(n);
            MergePointEntry {
                id: sym.id.0.clone(),
                name: sym.name.clone(),
                file: sym.file.clone(),
                line: sym.start_line,
                degree,
            }
        })
        .collect();
    merge_points.truncate(top);
    tb.meta("merge_points", merge_points.len());

    tb.finish(Ok(MergePointsReport {
        entry: g.symbol(entry).id.0.clone(),
        merge_points,
    }))
}

#[derive(Debug, Clone, Default)]
pub struct CriticalPathParams {
    pub target: String,
    pub entry: Option<String>,
}

/// The dominator chain entry -> target: the sequence that must execute to
/// reach the target. Unreachable targets are a successful, empty result.
pub fn find_critical_path(
    handle: &GraphHandle,
    params: CriticalPathParams,
    cancel: &CancelToken,
) -> Traced<CriticalPathReport> {
    let mut tb =
        TraceBuilder::new("find_critical_path", "dominator_tree").target(params.target.clone());
    if params.target.is_empty() {
        return tb.finish(Err(Error::InvalidArgument("a `target` symbol is required".into())));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let Some(target) = resolve_target(&g, &params.target) else {
        return tb.finish(Err(Error::NotFound(params.target)));
    };
    if target.ambiguous {
        tb.meta("ambiguous", "true");
        tb.meta("candidates", target.candidates);
    }
    let (entry, auto) = match resolve_entry(&g, params.entry.as_deref()) {
        Ok(pair) => pair,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("entry_auto_detected", auto);

    let tree = match dominator_tree(&g, entry, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("converged", tree.converged());

    let target_name = g.symbol(target.idx).name.clone();
    let entry_name = g.symbol(entry).name.clone();

    let mut chain = tree.dominators_of(target.idx);
    chain.reverse(); // entry first
    let explanation = if chain.is_empty() {
        format!("`{target_name}` is not reachable from `{entry_name}`")
    } else {
        format!(
            "every path from `{entry_name}` to `{target_name}` passes through these {} functions",
            chain.len()
        )
    };

    let path: Vec<PathHop> = chain
        .iter()
        .enumerate()
        .map(|(i, &n)| PathHop::of(&g, i, n))
        .collect();
    tb.meta("length", path.len());

    tb.finish(Ok(CriticalPathReport {
        target: g.symbol(target.idx).id.0.clone(),
        entry: g.symbol(entry).id.0.clone(),
        entry_auto_detected: auto,
        length: path.len(),
        path,
        explanation,
    }))
}

#[derive(Debug, Clone, Default)]
pub struct LcdParams {
    /// Two or more symbol ids or names.
    pub targets: Vec<String>,
    pub entry: Option<String>,
}

/// Lowest common dominator: the deepest node on every target's dominator
/// chain.
pub fn lowest_common_dominator(
    handle: &GraphHandle,
    params: LcdParams,
    cancel: &CancelToken,
) -> Traced<LcdReport> {
    let mut tb = TraceBuilder::new("lowest_common_dominator", "dominator_tree")
        .target(params.targets.join(","));
    if params.targets.len() < 2 {
        return tb.finish(Err(Error::InvalidArgument(
            "lowest_common_dominator needs at least two targets".into(),
        )));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };

    let mut resolved: Vec<NodeIdx> = Vec::new();
    let mut ambiguous = false;
    for raw in &params.targets {
        let Some(r) = resolve_target(&g, raw) else {
            return tb.finish(Err(Error::NotFound(raw.clone())));
        };
        ambiguous |= r.ambiguous;
        resolved.push(r.idx);
    }
    if ambiguous {
        tb.meta("ambiguous", "true");
    }

    let (entry, auto) = match resolve_entry(&g, params.entry.as_deref()) {
        Ok(pair) => pair,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("entry_auto_detected", auto);

    let tree = match dominator_tree(&g, entry, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };

    let target_ids: Vec<String> = resolved.iter().map(|&n| g.symbol(n).id.0.clone()).collect();
    let chains: Vec<Vec<NodeIdx>> = resolved
        .iter()
        .map(|&n| {
            let mut chain = tree.dominators_of(n);
            chain.reverse(); // entry first
            chain
        })
        .filter(|chain| !chain.is_empty())
        .collect();

    if chains.len() < 2 {
        tb.meta("reachable_targets", chains.len());
        return tb.finish(Ok(LcdReport {
            targets: target_ids,
            entry: g.symbol(entry).id.0.clone(),
            lcd: None,
            depth: None,
            explanation: "fewer than two targets are reachable from the entry".into(),
        }));
    }

    let lcd = common_prefix_tail(&chains);
    let report = LcdReport {
        targets: target_ids,
        entry: g.symbol(entry).id.0.clone(),
        lcd: Some(SymbolRef::of(&g, lcd)),
        depth: tree.depth_of(lcd),
        explanation: format!(
            "`{}` is the deepest function dominating all {} targets",
            g.symbol(lcd).name,
            chains.len()
        ),
    };
    tb.meta("lcd", &report.explanation);
    tb.finish(Ok(report))
}

/// Deepest element shared by every chain prefix. Chains all start at the
/// entry, so at least one shared element exists.
fn common_prefix_tail(chains: &[Vec<NodeIdx>]) -> NodeIdx {
    let first = &chains[0];
    let mut last = first[0];
    for pos in 0..first.len() {
        let candidate = first[pos];
        if chains[1..]
            .iter()
            .all(|c| c.get(pos).copied() == Some(candidate))
        {
            last = candidate;
        } else {
            break;
        }
    }
    last
}
