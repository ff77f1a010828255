use thiserror::Error;
use uuid::Uuid;

use crate::serializer::DataError;
use crate::walker::ElementError;

/// Failure of a [`DataElementNode`](super::DataElementNode) operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("type {0} is not registered")]
    UnknownType(Uuid),
    #[error("node holds type {found}, expected {expected}")]
    TypeMismatch { expected: Uuid, found: Uuid },
    #[error("no child with name hash {0:#010x}")]
    MissingElement(u32),
    #[error("class {0} has no factory")]
    MissingFactory(Uuid),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Element(#[from] ElementError),
}
