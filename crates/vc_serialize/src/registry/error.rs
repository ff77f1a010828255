use alloc::string::String;

use thiserror::Error;
use uuid::Uuid;

/// Failure to add a class to a [`TypeRegistry`](crate::TypeRegistry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A class with the same id but a different shape is already registered.
    #[error("class `{name}` ({type_id}) is already registered with a different shape")]
    IncompatibleShape { name: String, type_id: Uuid },
}
