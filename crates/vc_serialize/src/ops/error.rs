use alloc::string::String;

use thiserror::Error;
use uuid::Uuid;

use crate::walker::ElementError;

/// Failure of a whole clone.
///
/// Elements that cannot be cloned are reported and left out instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloneError {
    #[error("the cloned object is not a registered type")]
    Unregistered,
    #[error("clone of {found} cannot become {expected}")]
    Downcast { expected: Uuid, found: Uuid },
    #[error(transparent)]
    Element(#[from] ElementError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("patch applies to {expected}, got {found}")]
    TargetMismatch { expected: Uuid, found: Uuid },
    #[error("no element at `{address}`")]
    MissingAddress { address: String },
    #[error("malformed patch node: {0}")]
    Malformed(&'static str),
    #[error("patched object cannot become {expected}")]
    Downcast { expected: Uuid },
    #[error(transparent)]
    Element(#[from] ElementError),
}
