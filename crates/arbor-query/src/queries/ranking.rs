//! Ranking and reachability queries: hot spots, articulation points, dead code

use arbor_analytics::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, articulation_points, pagerank, reachable_from,
};
use arbor_core::{CancelToken, GraphHandle, NodeIdx, SymbolKind};
use rustc_hash::FxHashSet;

use super::acquire;
use crate::config::{QueryConfig, TOP_RANGE, clamp_f64, clamp_usize};
use crate::report::{ArticulationReport, DeadCodeReport, HotSpotEntry, HotSpotsReport, SymbolRef};
use crate::resolve::detect_entries;
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone)]
pub struct HotSpotsParams {
    pub top: usize,
    pub damping: f64,
}

impl Default for HotSpotsParams {
    fn default() -> Self {
        HotSpotsParams {
            top: QueryConfig::default().top,
            damping: arbor_analytics::DEFAULT_DAMPING,
        }
    }
}

/// Most central functions by PageRank, with the plain degree score for
/// comparison.
pub fn find_hot_spots(
    handle: &GraphHandle,
    params: HotSpotsParams,
    cancel: &CancelToken,
) -> Traced<HotSpotsReport> {
    let mut tb = TraceBuilder::new("find_hot_spots", "pagerank");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let top = clamp_usize("top", params.top, TOP_RANGE);
    let damping = clamp_f64("damping", params.damping, (0.1, 0.99));
    tb.meta("top", top);
    tb.meta("damping", damping);

    let result = match pagerank(&g, damping, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, cancel) {
        Ok(r) => r,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("iterations", result.iterations);
    tb.meta("converged", result.converged);

    let hot_spots: Vec<HotSpotEntry> = result
        .ranked
        .iter()
        .take(top)
        .map(|r| {
            let sym = g.symbol(r.node);
            HotSpotEntry {
                id: sym.id.0.clone(),
                name: sym.name.clone(),
                file: sym.file.clone(),
                line: sym.start_line,
                score: r.score,
                degree_score: r.degree_score,
            }
        })
        .collect();

    tb.finish(Ok(HotSpotsReport {
        hot_spots,
        iterations: result.iterations,
        converged: result.converged,
    }))
}

/// Cut vertices of the call graph: single points whose removal disconnects
/// otherwise-connected code.
pub fn find_articulation_points(
    handle: &GraphHandle,
    cancel: &CancelToken,
) -> Traced<ArticulationReport> {
    let mut tb = TraceBuilder::new("find_articulation_points", "hopcroft_tarjan");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let points = match articulation_points(&g, cancel) {
        Ok(p) => p,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("count", points.len());
    tb.finish(Ok(ArticulationReport {
        count: points.len(),
        nodes: points.iter().map(|&n| SymbolRef::of(&g, n)).collect(),
    }))
}

#[derive(Debug, Clone, Default)]
pub struct DeadCodeParams {
    /// When false, exported symbols are assumed to have outside callers and
    /// are skipped.
    pub include_exported: bool,
}

/// Roots that no entry point reaches: symbols with no incoming edges that
/// are not entry points themselves.
pub fn find_dead_code(
    handle: &GraphHandle,
    params: DeadCodeParams,
    cancel: &CancelToken,
) -> Traced<DeadCodeReport> {
    let mut tb = TraceBuilder::new("find_dead_code", "reachability");
    tb.meta("include_exported", params.include_exported);
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };

    let entries = detect_entries(&g);
    tb.meta("entry_points", entries.len());
    if entries.is_empty() {
        return tb.finish(Ok(DeadCodeReport {
            entry_points: Vec::new(),
            include_exported: params.include_exported,
            dead: Vec::new(),
        }));
    }

    let reachable: FxHashSet<NodeIdx> = match reachable_from(&g, &entries, cancel) {
        Ok(r) => r.into_iter().collect(),
        Err(e) => return tb.finish(Err(e)),
    };
    let entry_set: FxHashSet<NodeIdx> = entries.iter().copied().collect();

    let dead: Vec<SymbolRef> = g
        .nodes()
        .filter(|&(idx, sym)| {
            !reachable.contains(&idx)
                && !entry_set.contains(&idx)
                && g.incoming(idx).is_empty()
                && !matches!(
                    sym.kind,
                    SymbolKind::External | SymbolKind::Import | SymbolKind::Package
                )
                && (params.include_exported || !sym.exported)
        })
        .map(|(idx, _)| SymbolRef::of(&g, idx))
        .collect();
    tb.meta("dead", dead.len());

    tb.finish(Ok(DeadCodeReport {
        entry_points: entries.iter().map(|&n| g.symbol(n).id.0.clone()).collect(),
        include_exported: params.include_exported,
        dead,
    }))
}
