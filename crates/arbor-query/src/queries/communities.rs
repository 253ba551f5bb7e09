//! Community detection and module-API queries

use std::sync::Arc;

use arbor_analytics::{CommunitySet, dominator_tree, leiden};
use arbor_core::{CancelToken, CodeGraph, Error, GraphHandle, NodeIdx};
use rustc_hash::{FxHashMap, FxHashSet};

use super::acquire;
use crate::cache::{CacheKey, community_cache};
use crate::config::{MIN_SIZE_RANGE, QueryConfig, RESOLUTION_RANGE, clamp_f64, clamp_usize};
use crate::report::{
    ApiCandidate, CommunitiesReport, CommunityEntry, CrossCommunityEdge, ModuleApiCommunity,
    ModuleApiReport,
};
use crate::trace::{TraceBuilder, Traced};

#[derive(Debug, Clone)]
pub struct CommunitiesParams {
    pub resolution: f64,
    /// Communities smaller than this are dropped from the report.
    pub min_size: usize,
}

impl Default for CommunitiesParams {
    fn default() -> Self {
        let config = QueryConfig::default();
        CommunitiesParams {
            resolution: config.resolution,
            min_size: config.community_min_size,
        }
    }
}

/// Leiden communities of the call graph. Results are cached per graph
/// version and parameter set (LRU, capacity 10).
pub fn find_communities(
    handle: &GraphHandle,
    params: CommunitiesParams,
    cancel: &CancelToken,
) -> Traced<CommunitiesReport> {
    let mut tb = TraceBuilder::new("find_communities", "leiden");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let resolution = clamp_f64("resolution", params.resolution, RESOLUTION_RANGE);
    let min_size = clamp_usize("min_size", params.min_size, MIN_SIZE_RANGE);
    tb.meta("resolution", resolution);
    tb.meta("min_size", min_size);

    let (report, cached) = match detect(&g, resolution, min_size, cancel) {
        Ok(pair) => pair,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("cache", if cached { "hit" } else { "miss" });
    tb.meta("modularity", report.modularity);
    tb.meta("communities", report.community_count);
    tb.finish(Ok((*report).clone()))
}

/// Cached community detection shared by `find_communities` and `module_api`.
pub(crate) fn detect(
    g: &Arc<CodeGraph>,
    resolution: f64,
    min_size: usize,
    cancel: &CancelToken,
) -> Result<(Arc<CommunitiesReport>, bool), Error> {
    let key = CacheKey::new(g.built_at_milli(), resolution, min_size);
    if let Some(cached) = community_cache().get(&key) {
        return Ok((cached, true));
    }
    let set = leiden(g, resolution, cancel)?;
    let report = Arc::new(build_report(g, &set, min_size));
    community_cache().insert(key, Arc::clone(&report));
    Ok((report, false))
}

fn build_report(g: &CodeGraph, set: &CommunitySet, min_size: usize) -> CommunitiesReport {
    let hier = g.hierarchical();

    // Kernel communities arrive size-descending; keep the ones above the
    // size floor and let report ids be their positions in the kept list.
    let mut report_id: FxHashMap<usize, usize> = FxHashMap::default();
    let mut communities: Vec<CommunityEntry> = Vec::new();
    for (kernel_pos, community) in set.communities.iter().enumerate() {
        if community.size() < min_size {
            continue;
        }
        let id = communities.len();
        report_id.insert(kernel_pos, id);
        let packages = hier.packages_of(&community.nodes);
        communities.push(CommunityEntry {
            id,
            size: community.size(),
            dominant_package: hier.dominant_package(&community.nodes),
            is_cross_package: packages.len() > 1,
            connectivity: community.connectivity(),
            internal_edges: community.internal_edges,
            external_edges: community.external_edges,
            members: community
                .nodes
                .iter()
                .map(|&n| g.symbol(n).id.0.clone())
                .collect(),
        });
    }

    let cross_package_communities: Vec<usize> = communities
        .iter()
        .filter(|c| c.is_cross_package)
        .map(|c| c.id)
        .collect();

    // The set of cross edges matters more than exact multiplicity: parallel
    // call sites collapse to one entry.
    let mut seen: FxHashSet<(NodeIdx, NodeIdx)> = FxHashSet::default();
    let mut cross_community_edges: Vec<CrossCommunityEdge> = Vec::new();
    for (from, e) in g.edges() {
        if e.kind != arbor_core::EdgeKind::Calls {
            continue;
        }
        let (ka, kb) = (set.membership[from.ix()], set.membership[e.other.ix()]);
        if ka == kb {
            continue;
        }
        let (Some(&a), Some(&b)) = (report_id.get(&ka), report_id.get(&kb)) else {
            continue;
        };
        if !seen.insert((from, e.other)) {
            continue;
        }
        cross_community_edges.push(CrossCommunityEdge {
            source: g.symbol(from).id.0.clone(),
            target: g.symbol(e.other).id.0.clone(),
            source_community: a,
            target_community: b,
        });
    }

    CommunitiesReport {
        modularity: set.modularity,
        community_count: communities.len(),
        converged: set.converged,
        iterations: set.iterations,
        communities,
        cross_package_communities,
        cross_community_edges,
    }
}

/// Module-API analysis: for each community, the entry points the rest of the
/// codebase calls into, scored by how much of the community they dominate.
pub fn module_api(
    handle: &GraphHandle,
    params: CommunitiesParams,
    cancel: &CancelToken,
) -> Traced<ModuleApiReport> {
    let mut tb = TraceBuilder::new("module_api", "leiden+dominator_tree");
    let g = match acquire(handle) {
        Ok(g) => g,
        Err(e) => return tb.finish(Err(e)),
    };
    let resolution = clamp_f64("resolution", params.resolution, RESOLUTION_RANGE);
    let min_size = clamp_usize("min_size", params.min_size, MIN_SIZE_RANGE);
    tb.meta("resolution", resolution);
    tb.meta("min_size", min_size);

    let (communities, cached) = match detect(&g, resolution, min_size, cancel) {
        Ok(pair) => pair,
        Err(e) => return tb.finish(Err(e)),
    };
    tb.meta("cache", if cached { "hit" } else { "miss" });

    let mut out: Vec<ModuleApiCommunity> = Vec::new();
    for entry in &communities.communities {
        let members: Vec<NodeIdx> = entry
            .members
            .iter()
            .filter_map(|id| g.resolve(id))
            .collect();
        let member_set: FxHashSet<NodeIdx> = members.iter().copied().collect();

        let mut candidates: Vec<(NodeIdx, usize)> = Vec::new();
        for &m in &members {
            let mut external: FxHashSet<NodeIdx> = FxHashSet::default();
            for e in g.incoming(m) {
                if e.kind == arbor_core::EdgeKind::Calls && !member_set.contains(&e.other) {
                    external.insert(e.other);
                }
            }
            if !external.is_empty() {
                candidates.push((m, external.len()));
            }
        }
        // A community nothing calls into still has an API surface: its
        // internal roots.
        if candidates.is_empty() {
            for &m in &members {
                let internally_called = g
                    .incoming(m)
                    .iter()
                    .any(|e| e.kind == arbor_core::EdgeKind::Calls && member_set.contains(&e.other));
                if !internally_called {
                    candidates.push((m, 0));
                }
            }
        }

        let api = match coverage_of(&g, &members, &member_set, &candidates, cancel) {
            Ok(api) => api,
            Err(e) => return tb.finish(Err(e)),
        };
        out.push(ModuleApiCommunity {
            community: entry.id,
            size: entry.size,
            dominant_package: entry.dominant_package.clone(),
            api,
        });
    }

    tb.meta("communities", out.len());
    tb.finish(Ok(ModuleApiReport { communities: out }))
}

/// Coverage of each candidate inside the community, preferring dominators on
/// the community's induced subgraph and falling back to whole-graph
/// dominators restricted to the member set.
fn coverage_of(
    g: &CodeGraph,
    members: &[NodeIdx],
    member_set: &FxHashSet<NodeIdx>,
    candidates: &[(NodeIdx, usize)],
    cancel: &CancelToken,
) -> Result<Vec<ApiCandidate>, Error> {
    let size = members.len().max(1) as f64;
    let mut api: Vec<ApiCandidate> = Vec::new();

    match g.induced_subgraph(members) {
        Ok(sub) => {
            for &(candidate, external_callers) in candidates {
                let sym = g.symbol(candidate);
                let Some(sub_idx) = sub.resolve(sym.id.as_str()) else {
                    continue;
                };
                let tree = dominator_tree(&sub, sub_idx, cancel)?;
                api.push(ApiCandidate {
                    id: sym.id.0.clone(),
                    name: sym.name.clone(),
                    external_callers,
                    coverage: tree.len() as f64 / size,
                });
            }
        }
        Err(err) => {
            tracing::debug!(%err, "induced subgraph failed, using whole-graph dominators");
            for &(candidate, external_callers) in candidates {
                let sym = g.symbol(candidate);
                let tree = dominator_tree(g, candidate, cancel)?;
                let covered = tree
                    .dominated_by(candidate)
                    .iter()
                    .filter(|&n| member_set.contains(n))
                    .count();
                api.push(ApiCandidate {
                    id: sym.id.0.clone(),
                    name: sym.name.clone(),
                    external_callers,
                    coverage: covered as f64 / size,
                });
            }
        }
    }

    api.sort_by(|a, b| {
        b.coverage
            .partial_cmp(&a.coverage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.external_callers.cmp(&a.external_callers))
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(api)
}
