//! The format-independent element tree.
//!
//! Codecs decode streams into [`DataElementNode`] trees, converters rewrite
//! them, and the walker materializes them into live instances. Saving goes
//! the opposite way.

// -----------------------------------------------------------------------------
// Modules

mod data;
mod error;
mod node;

// -----------------------------------------------------------------------------
// Exports

pub use data::{ConversionState, ElementData};
pub use error::NodeError;
pub use node::DataElementNode;
