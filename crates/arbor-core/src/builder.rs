//! Append-only graph construction
//!
//! The builder wraps `petgraph::StableDiGraph` during the single-writer build
//! phase; `freeze` compacts it into the immutable [`CodeGraph`] with
//! CSR-style adjacency. The transition is one-way: freezing consumes the
//! builder, so mutation of a frozen graph does not typecheck.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Error;
use crate::graph::CodeGraph;
use crate::model::{Edge, EdgeKind, NodeIdx, SourceLocation, Symbol, SymbolId};

/// Edge payload during the build phase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct EdgeData {
    pub kind: EdgeKind,
    pub site: SourceLocation,
}

/// Single-writer builder for the code graph. Not safe for readers; publish
/// the result of [`GraphBuilder::freeze`] instead.
pub struct GraphBuilder {
    graph: StableDiGraph<Symbol, EdgeData>,
    ids: FxHashMap<String, NodeIndex>,
    seen_edges: FxHashSet<(NodeIndex, NodeIndex, EdgeKind, SourceLocation)>,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("node_count", &self.graph.node_count())
            .field("edge_count", &self.graph.edge_count())
            .finish()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        GraphBuilder {
            graph: StableDiGraph::new(),
            ids: FxHashMap::default(),
            seen_edges: FxHashSet::default(),
        }
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        GraphBuilder {
            graph: StableDiGraph::with_capacity(nodes, edges),
            ids: FxHashMap::default(),
            seen_edges: FxHashSet::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_frozen(&self) -> bool {
        false
    }

    /// Add a symbol, returning its interned node index.
    ///
    /// Idempotent for an identical record; a second record with the same id
    /// but different attributes fails with `DuplicateId`.
    pub fn add_node(&mut self, sym: Symbol) -> Result<NodeIdx, Error> {
        if let Some(&existing) = self.ids.get(sym.id.as_str()) {
            if self.graph[existing].same_attributes(&sym) {
                return Ok(NodeIdx(existing.index() as u32));
            }
            return Err(Error::DuplicateId(sym.id.0));
        }
        let id = sym.id.clone();
        let idx = self.graph.add_node(sym);
        self.ids.insert(id.0, idx);
        Ok(NodeIdx(idx.index() as u32))
    }

    /// Add a typed edge between two symbols already present in the graph.
    ///
    /// Records identical in `(from, to, kind, site)` are deduplicated;
    /// parallel edges with distinct sites are all kept.
    pub fn add_edge(
        &mut self,
        from: &SymbolId,
        to: &SymbolId,
        kind: EdgeKind,
        site: SourceLocation,
    ) -> Result<(), Error> {
        let src = *self
            .ids
            .get(from.as_str())
            .ok_or_else(|| Error::UnknownNode(from.0.clone()))?;
        let dst = *self
            .ids
            .get(to.as_str())
            .ok_or_else(|| Error::UnknownNode(to.0.clone()))?;
        if !self.seen_edges.insert((src, dst, kind, site.clone())) {
            return Ok(());
        }
        self.graph.add_edge(src, dst, EdgeData { kind, site });
        Ok(())
    }

    /// Add an edge record as produced by the parser.
    pub fn add_edge_record(&mut self, edge: Edge) -> Result<(), Error> {
        self.add_edge(&edge.from, &edge.to, edge.kind, edge.site)
    }

    /// True when an id has already been interned.
    pub fn contains(&self, id: &SymbolId) -> bool {
        self.ids.contains_key(id.as_str())
    }

    /// Freeze into an immutable graph with compact adjacency. One-way.
    pub fn freeze(self) -> CodeGraph {
        tracing::debug!(
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            "freezing graph"
        );
        CodeGraph::from_builder(self.graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
