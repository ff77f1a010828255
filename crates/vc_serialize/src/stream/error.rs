use thiserror::Error;
use uuid::Uuid;

use crate::codec::CodecError;
use crate::walker::ElementError;

/// Failure of a top-level save.
#[derive(Error, Debug)]
pub enum SaveError {
    /// Streams receive exactly one save. Appending would produce a second,
    /// unreadable stream header.
    #[error("target stream already holds {length} bytes")]
    StreamNotEmpty { length: u64 },
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a top-level load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("stream holds no object")]
    NoRoot,
    #[error("stream holds {found}, expected {expected}")]
    RootTypeMismatch { expected: Uuid, found: Uuid },
    #[error("{issues} elements failed to load")]
    Strict { issues: usize },
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
