//! Core data structures for the code graph

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Stable symbol identifier.
///
/// Ids are opaque strings, but parsers emit the canonical form
/// `<relative-file-path>:<line>:<name>` and the accessors below assume it.
/// On a non-canonical id they degrade to empty strings / zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub String);

impl SymbolId {
    pub fn new(file: &str, line: u32, name: &str) -> Self {
        SymbolId(format!("{file}:{line}:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Package path: the id's file component up to its last `/`.
    pub fn package(&self) -> &str {
        let file = self.0.split(':').next().unwrap_or("");
        match file.rfind('/') {
            Some(pos) => &file[..pos],
            None => "",
        }
    }

    /// Name component: everything after the second `:`.
    pub fn short_name(&self) -> &str {
        let mut parts = self.0.splitn(3, ':');
        parts.next();
        parts.next();
        parts.next().unwrap_or("")
    }

    /// Line component: between the first and second `:`.
    pub fn line(&self) -> u32 {
        self.0
            .split(':')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolId {
    fn from(s: &str) -> Self {
        SymbolId(s.to_string())
    }
}

impl From<String> for SymbolId {
    fn from(s: String) -> Self {
        SymbolId(s)
    }
}

/// Discriminates what kind of code entity a symbol represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Method,
    Struct,
    Class,
    Interface,
    Type,
    Enum,
    Package,
    Import,
    /// Unresolved target outside the analyzed codebase. Carries no file path.
    External,
    Unknown,
}

impl SymbolKind {
    /// Canonical lowercase tag used in public outputs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Package => "package",
            SymbolKind::Import => "import",
            SymbolKind::External => "external",
            SymbolKind::Unknown => "unknown",
        }
    }

    /// Callable kinds are preferred when an ambiguous name is resolved.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Calls,
    References,
    Imports,
    Implements,
    Extends,
    Contains,
    Overrides,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "calls",
            EdgeKind::References => "references",
            EdgeKind::Imports => "imports",
            EdgeKind::Implements => "implements",
            EdgeKind::Extends => "extends",
            EdgeKind::Contains => "contains",
            EdgeKind::Overrides => "overrides",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in source a symbol or reference lives. A zero column means the
/// extractor did not record one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column: 0,
        }
    }
}

/// A named program element. Immutable once added to a graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// Relative file path; empty for synthetic external symbols.
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_col: u32,
    pub end_col: u32,
    pub package: String,
    pub exported: bool,
    pub language: String,
    pub signature: Option<String>,
}

impl Symbol {
    /// Synthetic symbol for an unresolved target outside the codebase.
    pub fn external(id: impl Into<SymbolId>) -> Self {
        let id = id.into();
        let name = if id.short_name().is_empty() {
            id.0.clone()
        } else {
            id.short_name().to_string()
        };
        Symbol {
            id,
            name,
            kind: SymbolKind::External,
            file: String::new(),
            start_line: 0,
            end_line: 0,
            start_col: 0,
            end_col: 0,
            package: String::new(),
            exported: false,
            language: String::new(),
            signature: None,
        }
    }

    /// Full-record comparison, used for duplicate detection during builds.
    /// Symbol equality itself is by id (see the `PartialEq` impl).
    pub fn same_attributes(&self, other: &Symbol) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.kind == other.kind
            && self.file == other.file
            && self.start_line == other.start_line
            && self.end_line == other.end_line
            && self.start_col == other.start_col
            && self.end_col == other.end_col
            && self.package == other.package
            && self.exported == other.exported
            && self.language == other.language
            && self.signature == other.signature
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A typed directed relationship between two symbols, as recorded by the
/// parser. The frozen graph stores these as compact adjacency entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: SymbolId,
    pub to: SymbolId,
    pub kind: EdgeKind,
    /// Where the relationship is expressed (the call site, import line, ...).
    pub site: SourceLocation,
}

/// Compact node index into one frozen graph. Indices are dense, assigned in
/// insertion order, and are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    #[inline]
    pub fn ix(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
