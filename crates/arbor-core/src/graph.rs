//! Frozen, immutable code graph with compact adjacency
//!
//! [`CodeGraph`] is the published form of a [`crate::GraphBuilder`]: symbols
//! in insertion order, CSR-style outgoing and incoming adjacency, and the
//! symbol index. It has no mutating methods, so once published it may be
//! shared across threads without locks. Traversals from the same seed are
//! deterministic: per-node adjacency preserves global edge insertion order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use petgraph::stable_graph::StableDiGraph;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::builder::{EdgeData, GraphBuilder};
use crate::error::Error;
use crate::index::SymbolIndex;
use crate::model::{EdgeKind, NodeIdx, SourceLocation, Symbol};

/// One adjacency entry of a frozen graph: the far endpoint plus the edge
/// payload. In an outgoing list `other` is the target; in an incoming list it
/// is the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRef {
    pub other: NodeIdx,
    pub kind: EdgeKind,
    pub site: SourceLocation,
}

/// Node and edge tallies for overview output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub symbols_by_kind: BTreeMap<String, usize>,
    pub edges_by_kind: BTreeMap<String, usize>,
}

/// The immutable directed multigraph of symbols and typed edges.
pub struct CodeGraph {
    symbols: Vec<Symbol>,
    index: SymbolIndex,
    out_offsets: Vec<u32>,
    out_edges: Vec<EdgeRef>,
    in_offsets: Vec<u32>,
    in_edges: Vec<EdgeRef>,
    built_at_milli: i64,
}

impl std::fmt::Debug for CodeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGraph")
            .field("node_count", &self.symbols.len())
            .field("edge_count", &self.out_edges.len())
            .field("built_at_milli", &self.built_at_milli)
            .finish()
    }
}

impl CodeGraph {
    pub(crate) fn from_builder(graph: StableDiGraph<Symbol, EdgeData>) -> Self {
        let n = graph.node_count();
        let mut symbols = Vec::with_capacity(n);
        let mut index = SymbolIndex::default();

        // Node indices of a StableDiGraph without removals are dense and in
        // insertion order, so they double as our compact indices.
        for idx in graph.node_indices() {
            let pos = NodeIdx(symbols.len() as u32);
            let sym = graph[idx].clone();
            index.insert(&sym, pos);
            symbols.push(sym);
        }

        let mut edge_list: Vec<(u32, u32, EdgeData)> = Vec::with_capacity(graph.edge_count());
        let mut out_deg = vec![0u32; n];
        let mut in_deg = vec![0u32; n];
        for e in graph.edge_indices() {
            let Some((a, b)) = graph.edge_endpoints(e) else {
                continue;
            };
            out_deg[a.index()] += 1;
            in_deg[b.index()] += 1;
            edge_list.push((a.index() as u32, b.index() as u32, graph[e].clone()));
        }

        let mut out_offsets = vec![0u32; n + 1];
        let mut in_offsets = vec![0u32; n + 1];
        for i in 0..n {
            out_offsets[i + 1] = out_offsets[i] + out_deg[i];
            in_offsets[i + 1] = in_offsets[i] + in_deg[i];
        }

        let placeholder = EdgeRef {
            other: NodeIdx(0),
            kind: EdgeKind::Calls,
            site: SourceLocation::default(),
        };
        let mut out_edges = vec![placeholder.clone(); edge_list.len()];
        let mut in_edges = vec![placeholder; edge_list.len()];
        let mut out_cursor = out_offsets.clone();
        let mut in_cursor = in_offsets.clone();

        // Filling in global insertion order keeps every per-node slice in
        // edge insertion order, which traversal determinism relies on.
        for (from, to, data) in edge_list {
            let o = out_cursor[from as usize] as usize;
            out_edges[o] = EdgeRef {
                other: NodeIdx(to),
                kind: data.kind,
                site: data.site.clone(),
            };
            out_cursor[from as usize] += 1;

            let i = in_cursor[to as usize] as usize;
            in_edges[i] = EdgeRef {
                other: NodeIdx(from),
                kind: data.kind,
                site: data.site,
            };
            in_cursor[to as usize] += 1;
        }

        CodeGraph {
            symbols,
            index,
            out_offsets,
            out_edges,
            in_offsets,
            in_edges,
            built_at_milli: next_build_stamp(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Always true: this type only exists after `freeze`.
    pub fn is_frozen(&self) -> bool {
        true
    }

    /// Unix milliseconds recorded when the graph was frozen. Doubles as the
    /// graph version for caches: each rebuild gets a fresh value.
    pub fn built_at_milli(&self) -> i64 {
        self.built_at_milli
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// The symbol at a compact index issued by this graph.
    pub fn symbol(&self, idx: NodeIdx) -> &Symbol {
        &self.symbols[idx.ix()]
    }

    /// Compact index for a symbol id.
    pub fn resolve(&self, id: &str) -> Option<NodeIdx> {
        self.index.id(id)
    }

    /// Symbol lookup by id.
    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.resolve(id).map(|idx| self.symbol(idx))
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (NodeIdx(i as u32), s))
    }

    /// Outgoing adjacency of a node, in edge insertion order.
    pub fn outgoing(&self, idx: NodeIdx) -> &[EdgeRef] {
        let lo = self.out_offsets[idx.ix()] as usize;
        let hi = self.out_offsets[idx.ix() + 1] as usize;
        &self.out_edges[lo..hi]
    }

    /// Incoming adjacency of a node, in edge insertion order.
    pub fn incoming(&self, idx: NodeIdx) -> &[EdgeRef] {
        let lo = self.in_offsets[idx.ix()] as usize;
        let hi = self.in_offsets[idx.ix() + 1] as usize;
        &self.in_edges[lo..hi]
    }

    /// All edges as `(source, entry)` pairs, grouped by source node.
    pub fn edges(&self) -> impl Iterator<Item = (NodeIdx, &EdgeRef)> {
        (0..self.symbols.len()).flat_map(move |i| {
            let idx = NodeIdx(i as u32);
            self.outgoing(idx).iter().map(move |e| (idx, e))
        })
    }

    /// Symbols sharing a display name, in insertion order.
    pub fn symbols_named(&self, name: &str) -> impl Iterator<Item = (NodeIdx, &Symbol)> {
        self.index
            .named(name)
            .iter()
            .map(move |&idx| (idx, self.symbol(idx)))
    }

    /// Prefix search: exact name matches first, then case-insensitive prefix
    /// matches in symbol insertion order. `limit == 0` means unlimited.
    pub fn search(&self, prefix: &str, limit: usize) -> Vec<NodeIdx> {
        let mut out: Vec<NodeIdx> = Vec::new();
        let mut taken: FxHashSet<NodeIdx> = FxHashSet::default();
        let full = |out: &Vec<NodeIdx>| limit > 0 && out.len() >= limit;

        for &idx in self.index.named(prefix) {
            if full(&out) {
                return out;
            }
            if taken.insert(idx) {
                out.push(idx);
            }
        }

        let needle = prefix.to_lowercase();
        for (i, sym) in self.symbols.iter().enumerate() {
            if full(&out) {
                break;
            }
            let idx = NodeIdx(i as u32);
            if taken.contains(&idx) {
                continue;
            }
            if sym.name.to_lowercase().starts_with(&needle) {
                taken.insert(idx);
                out.push(idx);
            }
        }
        out
    }

    pub fn stats(&self) -> GraphStats {
        let mut symbols_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for sym in &self.symbols {
            *symbols_by_kind.entry(sym.kind.as_str().to_string()).or_insert(0) += 1;
        }
        let mut edges_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for e in &self.out_edges {
            *edges_by_kind.entry(e.kind.as_str().to_string()).or_insert(0) += 1;
        }
        GraphStats {
            nodes: self.symbols.len(),
            edges: self.out_edges.len(),
            symbols_by_kind,
            edges_by_kind,
        }
    }

    /// Build a fresh frozen graph from a node subset and the edges internal
    /// to it. Node and edge insertion order follow this graph's order, so
    /// traversal determinism carries over.
    pub fn induced_subgraph(&self, members: &[NodeIdx]) -> Result<CodeGraph, Error> {
        if members.is_empty() {
            return Err(Error::InvalidArgument(
                "induced subgraph needs at least one member".into(),
            ));
        }
        let member_set: FxHashSet<NodeIdx> = members.iter().copied().collect();
        let mut builder = GraphBuilder::with_capacity(members.len(), members.len() * 2);
        let mut ordered: Vec<NodeIdx> = member_set.iter().copied().collect();
        ordered.sort_unstable();
        for &idx in &ordered {
            builder.add_node(self.symbol(idx).clone())?;
        }
        for &idx in &ordered {
            let from = &self.symbol(idx).id;
            for e in self.outgoing(idx) {
                if member_set.contains(&e.other) {
                    let to = &self.symbol(e.other).id;
                    builder.add_edge(from, to, e.kind, e.site.clone())?;
                }
            }
        }
        Ok(builder.freeze())
    }

    /// Package-derived grouping view. Only obtainable from a frozen graph.
    pub fn hierarchical(&self) -> HierarchicalGraph<'_> {
        let mut packages: IndexMap<String, Vec<NodeIdx>> = IndexMap::new();
        for (idx, sym) in self.nodes() {
            packages.entry(sym.package.clone()).or_default().push(idx);
        }
        HierarchicalGraph {
            graph: self,
            packages,
        }
    }
}

/// Freeze timestamps double as graph versions in caches, so they must be
/// strictly increasing even when two graphs freeze in the same millisecond.
fn next_build_stamp() -> i64 {
    static LAST: AtomicI64 = AtomicI64::new(0);
    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}

/// Publish/snapshot slot for the current frozen graph.
///
/// The parser publishes a fresh graph after every rebuild; queries snapshot
/// whatever is current. A handle with nothing published yet surfaces
/// `NotReady` at the façade.
#[derive(Clone, Default)]
pub struct GraphHandle {
    slot: Arc<RwLock<Option<Arc<CodeGraph>>>>,
}

impl GraphHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-frozen graph in a ready handle.
    pub fn published(graph: CodeGraph) -> Self {
        let handle = Self::new();
        handle.publish(graph);
        handle
    }

    /// Replace the current graph. The previous one is dropped once the last
    /// in-flight query releases its snapshot.
    pub fn publish(&self, graph: CodeGraph) -> Arc<CodeGraph> {
        let shared = Arc::new(graph);
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(Arc::clone(&shared));
        }
        shared
    }

    /// The currently published graph, if any.
    pub fn snapshot(&self) -> Option<Arc<CodeGraph>> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }
}

impl std::fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ready = self.snapshot().is_some();
        f.debug_struct("GraphHandle").field("ready", &ready).finish()
    }
}

/// Convenience view grouping a frozen graph's nodes by package path. Adds no
/// data of its own.
pub struct HierarchicalGraph<'g> {
    graph: &'g CodeGraph,
    packages: IndexMap<String, Vec<NodeIdx>>,
}

impl<'g> HierarchicalGraph<'g> {
    pub fn graph(&self) -> &'g CodeGraph {
        self.graph
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Packages in first-seen order with their member nodes.
    pub fn packages(&self) -> impl Iterator<Item = (&str, &[NodeIdx])> {
        self.packages.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn members(&self, package: &str) -> &[NodeIdx] {
        self.packages.get(package).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Most frequent package among `nodes`; ties break to the
    /// lexicographically smallest. Empty input gives an empty package.
    pub fn dominant_package(&self, nodes: &[NodeIdx]) -> String {
        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for &idx in nodes {
            *counts.entry(self.graph.symbol(idx).package.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(pkg, _)| pkg.to_string())
            .unwrap_or_default()
    }

    /// Distinct packages touched by `nodes`, in first-touch order.
    pub fn packages_of(&self, nodes: &[NodeIdx]) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for &idx in nodes {
            let pkg = &self.graph.symbol(idx).package;
            if !seen.iter().any(|p| p == pkg) {
                seen.push(pkg.clone());
            }
        }
        seen
    }
}
