use alloc::string::String;

use thiserror::Error;
use uuid::Uuid;

use crate::serializer::DataError;

/// Failure to encode or decode a whole stream.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("stream format not recognized")]
    UnknownFormat,
    #[error("stream version {found} is newer than the supported version {max}")]
    UnsupportedVersion { found: u32, max: u32 },
    #[error("stream ends in the middle of a record")]
    UnexpectedEnd,
    #[error("malformed stream: {0}")]
    Malformed(String),
    #[error("elements nested deeper than {max} levels")]
    TooDeep { max: usize },
    #[error("`{0}` is not a type id")]
    BadUuid(String),
    #[error("leaf of unregistered type {type_id} has no text form")]
    UnknownLeaf { type_id: Uuid },
    #[error("leaf of type {type_id}: {source}")]
    Leaf { type_id: Uuid, source: DataError },
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
