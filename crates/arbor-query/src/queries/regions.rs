//! SESE region queries

use arbor_analytics::{RegionTree, dominator_tree, post_dominator_tree, sese_regions};
use arbor_core::{CancelToken, CodeGraph, Error, GraphHandle};

use super::acquire;
use crate::config::{MIN_SIZE_RANGE, QueryConfig, TOP_RANGE, clamp_usize};
use crate::report::{RegionEntry, RegionSummary, RegionsReport};
use crate::resolve::{detect_entry, resolve_target};
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone, Default)]
pub struct RegionListParams {
    pub entry: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RegionParams {
    pub min_size: usize,
    /// 0 means unbounded.
    pub max_size: usize,
    pub top: usize,
    pub entry: Option<String>,
}

impl Default for RegionParams {
    fn default() -> Self {
        let config = QueryConfig::default();
        RegionParams {
            min_size: config.region_min_size,
            max_size: config.region_max_size,
            top: config.top,
            entry: None,
        }
    }
}

/// All detected regions, largest first.
pub fn find_regions(
    handle: &GraphHandle,
    params: RegionListParams,
    cancel: &CancelToken,
) -> Traced<RegionsReport> {
    region_query(
        "find_regions",
        RegionParams {
            min_size: 1,
            max_size: 0,
            top: 0,
            entry: params.entry,
        },
        false,
        handle,
        cancel,
    )
}

/// Regions within `[min_size, max_size]`, largest first, capped at `top`:
/// the refactoring candidates.
pub fn find_extractable_regions(
    handle: &GraphHandle,
    params: RegionParams,
    cancel: &CancelToken,
) -> Traced<RegionsReport> {
    region_query("find_extractable_regions", params, true, handle, cancel)
}

fn region_query(
    action: &'static str,
    params: RegionParams,
    clamp: bool,
    handle: &GraphHandle,
    cancel: &CancelToken,
) -> Traced<RegionsReport> {
    let mut tb = TraceBuilder::new(action, "sese_regions");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };

    let (min_size, max_size, top) = if clamp {
        let min_size = clamp_usize("min_size", params.min_size, MIN_SIZE_RANGE);
        let max_size = if params.max_size == 0 {
            0
        } else {
            params.max_size.max(min_size)
        };
        (min_size, max_size, clamp_usize("top", params.top, TOP_RANGE))
    } else {
        (params.min_size, params.max_size, params.top)
    };
    tb.meta("min_size", min_size);
    tb.meta("max_size", max_size);

    // List query: no detectable entry means no regions.
    let entry = match params.entry.as_deref() {
        Some(name) => match resolve_target(&g, name) {
            Some(r) => Some(r.idx),
            None => return tb.finish(Err(Error::NotFound(name.to_string()))),
        },
        None => detect_entry(&g),
    };
    let Some(entry) = entry else {
        return tb.finish(Ok(empty_report(min_size, max_size)));
    };

    let dom = match dominator_tree(&g, entry, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    let pdom = match post_dominator_tree(&g, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    let tree = match sese_regions(&g, &dom, &pdom, cancel) {
        Ok(t) => t,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("approximate", tree.approximate);

    tb.finish(Ok(build_report(&g, &tree, min_size, max_size, top)))
}

fn empty_report(min_size: usize, max_size: usize) -> RegionsReport {
    RegionsReport {
        regions: Vec::new(),
        summary: RegionSummary {
            total_regions: 0,
            extractable_count: 0,
            returned: 0,
            max_depth: 0,
            avg_size: 0.0,
            min_size_used: min_size,
            max_size_used: max_size,
        },
    }
}

fn build_report(
    g: &CodeGraph,
    tree: &RegionTree,
    min_size: usize,
    max_size: usize,
    top: usize,
) -> RegionsReport {
    let total_regions = tree.regions.len();
    let max_depth = tree.regions.iter().map(|r| r.depth).max().unwrap_or(0);
    let avg_size = if total_regions == 0 {
        0.0
    } else {
        tree.regions.iter().map(|r| r.size()).sum::<usize>() as f64 / total_regions as f64
    };

    let mut extractable: Vec<&arbor_analytics::Region> = tree
        .regions
        .iter()
        .filter(|r| r.size() >= min_size && (max_size == 0 || r.size() <= max_size))
        .collect();
    let extractable_count = extractable.len();
    extractable.sort_by(|a, b| {
        b.size()
            .cmp(&a.size())
            .then_with(|| g.symbol(a.entry).id.cmp(&g.symbol(b.entry).id))
    });
    if top > 0 {
        extractable.truncate(top);
    }

    let regions: Vec<RegionEntry> = extractable
        .iter()
        .map(|r| RegionEntry {
            entry: g.symbol(r.entry).id.0.clone(),
            entry_name: g.symbol(r.entry).name.clone(),
            exit: g.symbol(r.exit).id.0.clone(),
            exit_name: g.symbol(r.exit).name.clone(),
            size: r.size(),
            depth: r.depth,
            nodes: r.nodes.iter().map(|&n| g.symbol(n).id.0.clone()).collect(),
            has_nested_regions: r.has_nested_regions(),
        })
        .collect();

    RegionsReport {
        summary: RegionSummary {
            total_regions,
            extractable_count,
            returned: regions.len(),
            max_depth,
            avg_size,
            min_size_used: min_size,
            max_size_used: max_size,
        },
        regions,
    }
}
