use garage_traits::{Field, ValueKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown door: {0}")]
    UnknownDoor(String),
    #[error("door {door} has no field {field}")]
    UnknownField { door: String, field: Field },
    #[error("type mismatch on {field}: expected {expected:?}")]
    TypeMismatch { field: Field, expected: ValueKind },
    #[error("write rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
