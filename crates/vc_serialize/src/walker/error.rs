use alloc::string::String;

use thiserror::Error;
use uuid::Uuid;

use crate::serializer::DataError;
use crate::walker::IssueKind;

/// Failure confined to one element of a walk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("instance type is not registered")]
    UnregisteredInstance,
    #[error("type {type_id} is not registered")]
    UnknownType { type_id: Uuid },
    #[error("element expects type {expected}, data holds {found}")]
    TypeMismatch { expected: Uuid, found: Uuid },
    #[error("cannot cast {from} to {to}")]
    CastFailed { from: Uuid, to: Uuid },
    #[error("data of {type_id} has version {found}, newest known is {max}")]
    FutureVersion { type_id: Uuid, found: u32, max: u32 },
    #[error("converter of {from} changed the type to {to} outside of a deprecation")]
    ConverterPolicyViolation { from: Uuid, to: Uuid },
    #[error("deprecation redirects of {type_id} do not terminate")]
    ConversionLoop { type_id: Uuid },
    #[error("class {type_id} has no factory")]
    MissingFactory { type_id: Uuid },
    #[error("leaf {type_id} has no payload")]
    MissingData { type_id: Uuid },
    #[error(transparent)]
    LeafData(#[from] DataError),
    #[error("field `{field}` is not accessible on this instance")]
    FieldAccess { field: String },
    #[error("map entry lacks its `{part}` element")]
    MissingEntryPart { part: &'static str },
    #[error("container rejected an element of type {type_id}")]
    StoreRejected { type_id: Uuid },
    /// Dropped by a converter or a deprecation. Never reported.
    #[error("element was discarded")]
    Discarded,
}

impl ElementError {
    pub fn kind(&self) -> IssueKind {
        match self {
            Self::UnregisteredInstance | Self::UnknownType { .. } => IssueKind::UnknownType,
            Self::TypeMismatch { .. } => IssueKind::TypeMismatch,
            Self::CastFailed { .. } => IssueKind::CastFailed,
            Self::FutureVersion { .. } => IssueKind::FutureVersion,
            Self::ConverterPolicyViolation { .. } => IssueKind::ConverterPolicyViolation,
            Self::ConversionLoop { .. } => IssueKind::ConversionLoop,
            Self::MissingFactory { .. } => IssueKind::MissingFactory,
            Self::MissingData { .. } | Self::LeafData(_) => IssueKind::LeafData,
            Self::FieldAccess { .. } | Self::MissingEntryPart { .. } => IssueKind::Structure,
            Self::StoreRejected { .. } => IssueKind::StoreRejected,
            Self::Discarded => IssueKind::Discarded,
        }
    }
}
