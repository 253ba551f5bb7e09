//! Per-query trace records
//!
//! Every query returns a [`Trace`] next to its result, including empty
//! results and failures. Records are plain values; emitting one has no side
//! effects in the core.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use arbor_core::Error;
use serde::Serialize;

/// Structured record of one query invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    /// Stable identifier of the query, e.g. `find_path`.
    pub action: String,
    /// Name of the algorithm behind it, e.g. `bfs_shortest_path`.
    pub tool: String,
    /// Primary argument; may be empty for list queries.
    pub target: String,
    pub duration: Duration,
    /// Flat map of numeric and flag parameters, stringified.
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A query result paired with its trace.
#[derive(Debug)]
pub struct Traced<T> {
    pub result: Result<T, Error>,
    pub trace: Trace,
}

impl<T> Traced<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

pub(crate) struct TraceBuilder {
    action: &'static str,
    tool: &'static str,
    target: String,
    metadata: BTreeMap<String, String>,
    started: Instant,
}

impl TraceBuilder {
    pub fn new(action: &'static str, tool: &'static str) -> Self {
        TraceBuilder {
            action,
            tool,
            target: String::new(),
            metadata: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn meta(&mut self, key: &str, value: impl ToString) {
        self.metadata.insert(key.to_string(), value.to_string());
    }

    pub fn finish<T>(mut self, result: Result<T, Error>) -> Traced<T> {
        let error = match &result {
            Ok(_) => None,
            Err(e) => {
                self.metadata
                    .insert("error_kind".to_string(), e.kind().to_string());
                Some(e.to_string())
            }
        };
        Traced {
            trace: Trace {
                action: self.action.to_string(),
                tool: self.tool.to_string(),
                target: self.target,
                duration: self.started.elapsed(),
                metadata: self.metadata,
                error,
            },
            result,
        }
    }
}
