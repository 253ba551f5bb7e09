//! Shortest-path query

use arbor_analytics::shortest_path;
use arbor_core::{CancelToken, Error, GraphHandle};

use super::acquire;
use crate::report::{PathHop, PathReport};
use crate::resolve::resolve_target;
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone, Default)]
pub struct PathParams {
    pub from: String,
    pub to: String,
}

/// Shortest call-or-reference chain between two symbols. Unreachability is a
/// successful result with `found = false`.
pub fn find_path(
    handle: &GraphHandle,
    params: PathParams,
    cancel: &CancelToken,
) -> Traced<PathReport> {
    let mut tb = TraceBuilder::new("find_path", "bfs_shortest_path").target(params.from.clone());
    tb.meta("to", &params.to);

    if params.from.is_empty() || params.to.is_empty() {
        return tb.finish(Err(Error::InvalidArgument(
            "find_path needs both `from` and `to`".into(),
        )));
    }
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let Some(from) = resolve_target(&g, &params.from) else {
        return tb.finish(Err(Error::NotFound(params.from)));
    };
    let Some(to) = resolve_target(&g, &params.to) else {
        return tb.finish(Err(Error::NotFound(params.to)));
    };
    if from.ambiguous || to.ambiguous {
        tracing::warn!(from = %params.from, to = %params.to, "ambiguous name resolved by kind preference");
        tb.meta("ambiguous", "true");
        tb.meta("candidates", from.candidates.max(to.candidates));
    }

    let found = match shortest_path(&g, from.idx, to.idx, cancel) {
        Ok(p) => p,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("length", found.length);

    let path = found
        .path
        .iter()
        .enumerate()
        .map(|(i, &n)| PathHop::of(&g, i, n))
        .collect();
    tb.finish(Ok(PathReport {
        from: g.symbol(from.idx).id.0.clone(),
        to: g.symbol(to.idx).id.0.clone(),
        length: found.length,
        found: found.found(),
        path,
    }))
}
