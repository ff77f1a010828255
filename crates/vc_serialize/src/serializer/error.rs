use alloc::string::String;

use thiserror::Error;

/// Failure of a [`DataSerializer`](super::DataSerializer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("payload has {found} bytes, expected {expected}")]
    Size { expected: usize, found: usize },
    #[error("`{text}` is not a valid {type_name}")]
    Text {
        type_name: &'static str,
        text: String,
    },
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] core::str::Utf8Error),
    #[error("instance is not a {expected}")]
    InstanceType { expected: &'static str },
    #[error("{0}")]
    Custom(String),
}
