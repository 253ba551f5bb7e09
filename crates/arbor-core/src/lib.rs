//! Arbor Core — symbol model, symbol index, and the frozen code graph
//!
//! The external parser feeds a [`GraphBuilder`] in a single-threaded build
//! phase; `freeze()` produces an immutable [`CodeGraph`] that is published
//! through a [`GraphHandle`] and read concurrently by the analytics kernels.

pub mod builder;
pub mod cancel;
pub mod error;
pub mod graph;
pub mod index;
pub mod model;

#[cfg(test)]
mod tests;

pub use builder::GraphBuilder;
pub use cancel::CancelToken;
pub use error::Error;
pub use graph::{CodeGraph, EdgeRef, GraphHandle, GraphStats, HierarchicalGraph};
pub use index::SymbolIndex;
pub use model::{Edge, EdgeKind, NodeIdx, SourceLocation, Symbol, SymbolId, SymbolKind};
