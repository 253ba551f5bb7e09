//! Typed query results
//!
//! These are the consumer-facing shapes; field names are part of the output
//! contract and must stay stable across releases.

use std::collections::BTreeMap;

use arbor_core::{CodeGraph, NodeIdx};
use serde::{Deserialize, Serialize};

/// Compact symbol reference used across reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub kind: String,
}

impl SymbolRef {
    pub(crate) fn of(g: &CodeGraph, idx: NodeIdx) -> Self {
        let sym = g.symbol(idx);
        SymbolRef {
            id: sym.id.0.clone(),
            name: sym.name.clone(),
            file: sym.file.clone(),
            line: sym.start_line,
            kind: sym.kind.as_str().to_string(),
        }
    }
}

// ── Paths ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathHop {
    pub hop: usize,
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub kind: String,
}

impl PathHop {
    pub(crate) fn of(g: &CodeGraph, hop: usize, idx: NodeIdx) -> Self {
        let sym = g.symbol(idx);
        PathHop {
            hop,
            id: sym.id.0.clone(),
            name: sym.name.clone(),
            file: sym.file.clone(),
            line: sym.start_line,
            kind: sym.kind.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathReport {
    pub from: String,
    pub to: String,
    pub length: i64,
    pub found: bool,
    pub path: Vec<PathHop>,
}

// ── Callers / callees / references / search ─────────────

/// By-name neighbor results keep per-resolved-id grouping, so ambiguous
/// names stay observable and the limit applies per id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborsReport {
    pub target: String,
    pub total: usize,
    pub results: BTreeMap<String, Vec<SymbolRef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSite {
    pub from: String,
    pub kind: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesReport {
    pub target: String,
    pub total: usize,
    pub results: BTreeMap<String, Vec<ReferenceSite>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub matches: Vec<SymbolRef>,
}

// ── Cycles ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleNode {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEntry {
    pub cycle_number: usize,
    pub length: usize,
    pub packages: Vec<String>,
    pub nodes: Vec<CycleNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclesReport {
    pub cycle_count: usize,
    pub cycles: Vec<CycleEntry>,
}

// ── Dominators ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominatorHop {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominatorsReport {
    pub target: String,
    pub target_name: String,
    pub entry: String,
    pub entry_auto_detected: bool,
    /// Chain from the target up to the entry, both inclusive.
    pub dominators: Vec<DominatorHop>,
    pub depth: u32,
    pub immediate_dominator: Option<String>,
    pub subtree: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePointEntry {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePointsReport {
    pub entry: String,
    pub merge_points: Vec<MergePointEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalPathReport {
    pub target: String,
    pub entry: String,
    pub entry_auto_detected: bool,
    pub length: usize,
    /// Chain entry -> target; empty when the target is unreachable.
    pub path: Vec<PathHop>,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcdReport {
    pub targets: Vec<String>,
    pub entry: String,
    pub lcd: Option<SymbolRef>,
    pub depth: Option<u32>,
    pub explanation: String,
}

// ── Regions ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEntry {
    pub entry: String,
    pub entry_name: String,
    pub exit: String,
    pub exit_name: String,
    pub size: usize,
    pub depth: u32,
    pub nodes: Vec<String>,
    pub has_nested_regions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSummary {
    pub total_regions: usize,
    pub extractable_count: usize,
    pub returned: usize,
    pub max_depth: u32,
    pub avg_size: f64,
    pub min_size_used: usize,
    pub max_size_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionsReport {
    pub regions: Vec<RegionEntry>,
    pub summary: RegionSummary,
}

// ── Ranking ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSpotEntry {
    pub id: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub score: f64,
    pub degree_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotSpotsReport {
    pub hot_spots: Vec<HotSpotEntry>,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticulationReport {
    pub count: usize,
    pub nodes: Vec<SymbolRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadCodeReport {
    pub entry_points: Vec<String>,
    pub include_exported: bool,
    pub dead: Vec<SymbolRef>,
}

// ── Communities ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityEntry {
    pub id: usize,
    pub size: usize,
    pub dominant_package: String,
    pub is_cross_package: bool,
    pub connectivity: f64,
    pub internal_edges: usize,
    pub external_edges: usize,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossCommunityEdge {
    pub source: String,
    pub target: String,
    pub source_community: usize,
    pub target_community: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitiesReport {
    pub modularity: f64,
    pub community_count: usize,
    pub converged: bool,
    pub iterations: usize,
    pub communities: Vec<CommunityEntry>,
    pub cross_package_communities: Vec<usize>,
    pub cross_community_edges: Vec<CrossCommunityEdge>,
}

// ── Module API ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCandidate {
    pub id: String,
    pub name: String,
    pub external_callers: usize,
    /// Fraction of the community dominated by this candidate inside the
    /// community's induced subgraph.
    pub coverage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleApiCommunity {
    pub community: usize,
    pub size: usize,
    pub dominant_package: String,
    pub api: Vec<ApiCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleApiReport {
    pub communities: Vec<ModuleApiCommunity>,
}
