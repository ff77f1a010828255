//! Re-exports [`fastvec`]'s stack container.
//!
//! `StackVec<T, N>` stores at most `N` elements inline and never allocates,
//! which makes it the fixed-capacity sequence of the workspace.

pub use fastvec::{StackVec, stack_vec};
