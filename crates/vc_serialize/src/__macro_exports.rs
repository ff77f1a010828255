//! Items referenced by generated code. Not part of the public API.

pub use alloc::borrow::Cow;
pub use alloc::boxed::Box;
pub use core::any::Any;
pub use uuid::Uuid;

#[cfg(feature = "auto_register")]
pub mod auto_register {
    pub use inventory;

    use crate::registry::TypeRegistry;

    /// A registration function submitted by `#[reflect(auto_register)]`.
    pub struct AutoRegistration(pub fn(&mut TypeRegistry));

    inventory::collect!(AutoRegistration);

    /// Runs every submitted registration function.
    pub fn register_all(registry: &mut TypeRegistry) -> usize {
        let mut count = 0;
        for entry in inventory::iter::<AutoRegistration> {
            (entry.0)(registry);
            count += 1;
        }
        count
    }
}
