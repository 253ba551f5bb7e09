//! Arbor Query — stateless, cancellable query façade
//!
//! Wraps the analytics kernels into typed queries: name resolution, default
//! and clamped parameters, NotReady retries, composite analyses (critical
//! path, LCD, module API), and a trace record next to every result.
//! Unreachability and empty matches are successful results; only missing
//! arguments, unresolvable targets of target-specific queries, an
//! unpublished graph, and cancellation are errors.

pub mod config;
pub mod report;
pub mod trace;

mod cache;
mod queries;
mod resolve;

#[cfg(test)]
mod tests;

pub use config::QueryConfig;
pub use queries::{
    CommunitiesParams, CriticalPathParams, CyclesParams, DeadCodeParams, DominatorsParams,
    HotSpotsParams, LcdParams, MergePointsParams, NeighborParams, PathParams, RegionListParams,
    RegionParams, SearchParams, find_articulation_points, find_callees, find_callers,
    find_communities, find_critical_path, find_cycles, find_dead_code, find_dominators,
    find_extractable_regions, find_hot_spots, find_merge_points, find_path, find_references,
    find_regions, lowest_common_dominator, module_api, search_symbols,
};
pub use trace::{Trace, Traced};

pub use arbor_core::{CancelToken, CodeGraph, Error, GraphBuilder, GraphHandle};
