//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::arena::NodeId;

/// Domain errors represent violations of the disclosure tree's contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node is not rendered (stale or unknown handle): {0}")]
    UnknownNode(NodeId),

    #[error("classification not found: {0}")]
    ClassificationNotFound(String),

    #[error("node refers to data outside the taxonomy: {0}")]
    DanglingNode(NodeId),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
