//! Cycle detection query

use arbor_analytics::cycles;
use arbor_core::{CancelToken, GraphHandle};

use super::acquire;
use crate::config::{MIN_SIZE_RANGE, QueryConfig, clamp_usize};
use crate::report::{CycleEntry, CycleNode, CyclesReport};
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone)]
pub struct CyclesParams {
    /// Smallest component size to report. At 1, self-loops count.
    pub min_size: usize,
}

impl Default for CyclesParams {
    fn default() -> Self {
        CyclesParams {
            min_size: QueryConfig::default().cycle_min_size,
        }
    }
}

/// Strongly connected components of the call graph, in discovery order.
pub fn find_cycles(
    handle: &GraphHandle,
    params: CyclesParams,
    cancel: &CancelToken,
) -> Traced<CyclesReport> {
    let mut tb = TraceBuilder::new("find_cycles", "tarjan_scc");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let min_size = clamp_usize("min_size", params.min_size, MIN_SIZE_RANGE);
    tb.meta("min_size", min_size);

    let found = match cycles(&g, min_size, cancel) {
        Ok(c) => c,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("cycle_count", found.len());

    let cycles = found
        .into_iter()
        .enumerate()
        .map(|(i, cycle)| CycleEntry {
            cycle_number: i + 1,
            length: cycle.nodes.len(),
            packages: cycle.packages,
            nodes: cycle
                .nodes
                .iter()
                .map(|&n| {
                    let sym = g.symbol(n);
                    CycleNode {
                        id: sym.id.0.clone(),
                        name: sym.name.clone(),
                        file: sym.file.clone(),
                        line: sym.start_line,
                    }
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    tb.finish(Ok(CyclesReport {
        cycle_count: cycles.len(),
        cycles,
    }))
}
