use thiserror::Error;

pub type PlumeDBResult<T, E = PlumeDBError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum PlumeDBError {
    /// The chosen index cannot serve the predicate's operator.
    #[error("Unsupported predicate: {0}")]
    UnsupportedPredicate(String),

    /// A predicate value could not be parsed as the index's key type,
    /// or a key of the wrong type was handed to an index.
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// A predicate node is structurally invalid (missing operand/child).
    #[error("Malformed predicate: {0}")]
    MalformedPredicate(String),

    #[error("Not support: {0}")]
    NotSupport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
