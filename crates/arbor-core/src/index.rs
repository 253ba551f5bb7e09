//! Multi-key symbol index built alongside the graph

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::model::{NodeIdx, Symbol, SymbolKind};

/// Read-optimized lookup over the symbols of one graph.
///
/// Buckets hold compact node indices in insertion order; the owning graph
/// resolves them back to symbols. `id` is the unique key while `name` is
/// not; iteration over a name bucket is stable (insertion order). Safe for
/// concurrent reads once the owning graph is frozen.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    by_id: FxHashMap<String, NodeIdx>,
    by_name: IndexMap<String, Vec<NodeIdx>>,
    by_kind: IndexMap<SymbolKind, Vec<NodeIdx>>,
    by_file: IndexMap<String, Vec<NodeIdx>>,
}

impl SymbolIndex {
    pub(crate) fn insert(&mut self, sym: &Symbol, idx: NodeIdx) {
        self.by_id.insert(sym.id.0.clone(), idx);
        self.by_name.entry(sym.name.clone()).or_default().push(idx);
        self.by_kind.entry(sym.kind).or_default().push(idx);
        if !sym.file.is_empty() {
            self.by_file.entry(sym.file.clone()).or_default().push(idx);
        }
    }

    /// O(1) lookup of the unique node for an id.
    pub fn id(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    /// All nodes sharing a display name, in insertion order.
    pub fn named(&self, name: &str) -> &[NodeIdx] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes of one kind, in insertion order.
    pub fn of_kind(&self, kind: SymbolKind) -> &[NodeIdx] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All nodes declared in one file, in insertion order.
    pub fn in_file(&self, path: &str) -> &[NodeIdx] {
        self.by_file.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
