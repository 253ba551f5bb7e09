//! Query façade
//!
//! Every public query is a stateless function
//! `(GraphHandle, Params, CancelToken) -> Traced<Report>`: no hidden state,
//! equal inputs on the same frozen graph give equal outputs, and a trace
//! record rides along with every result.

mod communities;
mod cycles;
mod dominance;
mod neighbors;
mod paths;
mod ranking;
mod regions;

pub use communities::{CommunitiesParams, find_communities, module_api};
pub use cycles::{CyclesParams, find_cycles};
pub use dominance::{
    CriticalPathParams, DominatorsParams, LcdParams, MergePointsParams, find_critical_path,
    find_dominators, find_merge_points, lowest_common_dominator,
};
pub use neighbors::{
    NeighborParams, SearchParams, find_callees, find_callers, find_references, search_symbols,
};
pub use paths::{PathParams, find_path};
pub use ranking::{
    DeadCodeParams, HotSpotsParams, find_articulation_points, find_dead_code, find_hot_spots,
};
pub use regions::{RegionListParams, RegionParams, find_extractable_regions, find_regions};

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arbor_core::{CodeGraph, Error, GraphHandle};

use crate::config::{RETRY_ATTEMPTS, RETRY_DELAY_MS};

/// Snapshot the published graph. While the parser has not published yet the
/// façade retries with a fixed delay, then surfaces `NotReady` verbatim.
pub(crate) fn acquire(handle: &GraphHandle) -> Result<Arc<CodeGraph>, Error> {
    if let Some(g) = handle.snapshot() {
        return Ok(g);
    }
    for attempt in 0..RETRY_ATTEMPTS {
        tracing::debug!(attempt, "graph not ready, retrying");
        thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
        if let Some(g) = handle.snapshot() {
            return Ok(g);
        }
    }
    Err(Error::NotReady)
}
