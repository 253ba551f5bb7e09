//! Error kinds shared by the graph store, kernels, and query façade

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A second symbol with the same id but different attributes was added.
    #[error("duplicate symbol id `{0}` with conflicting attributes")]
    DuplicateId(String),

    /// An edge endpoint does not name a symbol present in the graph.
    #[error("unknown node `{0}`")]
    UnknownNode(String),

    /// An operation that requires a frozen graph was attempted on a builder.
    #[error("graph is not frozen")]
    NotFrozen,

    /// A required argument is missing or ill-typed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A target-specific query named a symbol that does not resolve.
    #[error("symbol not found: `{0}`")]
    NotFound(String),

    /// No frozen graph has been published yet.
    #[error("graph not ready")]
    NotReady,

    /// Cancellation was observed; partial results are discarded.
    #[error("query cancelled")]
    Cancelled,

    /// An internal invariant was violated. Never retried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable lowercase tag for trace records and serialized errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DuplicateId(_) => "duplicate_id",
            Error::UnknownNode(_) => "unknown_node",
            Error::NotFrozen => "not_frozen",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::NotFound(_) => "not_found",
            Error::NotReady => "not_ready",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal",
        }
    }
}
