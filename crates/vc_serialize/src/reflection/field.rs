use core::any::Any;

// -----------------------------------------------------------------------------
// FieldDesc

/// Typed description of one field of `T` with type `F`.
///
/// Built by the [`field!`](crate::field) macro, which fills in the byte offset
/// with [`core::mem::offset_of!`] and the two accessors.
pub struct FieldDesc<T, F> {
    offset: usize,
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
}

impl<T, F> FieldDesc<T, F> {
    /// Creates a descriptor from an offset and two accessors.
    #[inline]
    pub const fn new(offset: usize, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self {
            offset,
            get,
            get_mut,
        }
    }

    /// Byte offset of the field inside `T`.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

/// Type-erased field access stored in a [`ClassElement`](crate::ClassElement).
pub trait FieldAccessor: Send + Sync {
    /// Borrows the field out of `owner`, or `None` if `owner` has another type.
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any>;

    /// Mutably borrows the field out of `owner`.
    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any>;
}

impl<T: Any, F: Any> FieldAccessor for FieldDesc<T, F> {
    #[inline]
    fn get<'a>(&self, owner: &'a dyn Any) -> Option<&'a dyn Any> {
        let owner = owner.downcast_ref::<T>()?;
        Some((self.get)(owner))
    }

    #[inline]
    fn get_mut<'a>(&self, owner: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        let owner = owner.downcast_mut::<T>()?;
        Some((self.get_mut)(owner))
    }
}

// -----------------------------------------------------------------------------
// field!

/// Builds a [`FieldDesc`] for `$owner.$field`.
///
/// # Examples
///
/// ```
/// use vc_serialize::field;
///
/// struct Pair {
///     first: u8,
///     second: u32,
/// }
///
/// let desc = field!(Pair, second);
/// assert_eq!(desc.offset(), core::mem::offset_of!(Pair, second));
/// ```
#[macro_export]
macro_rules! field {
    ($owner:ty, $($field:tt).+) => {
        $crate::reflection::FieldDesc::<$owner, _>::new(
            ::core::mem::offset_of!($owner, $($field).+),
            |owner| &owner.$($field).+,
            |owner| &mut owner.$($field).+,
        )
    };
}

#[cfg(test)]
mod tests {
    use core::any::Any;

    use super::{FieldAccessor, FieldDesc};

    struct Outer {
        a: u16,
        inner: Inner,
    }

    struct Inner {
        b: u64,
    }

    #[test]
    fn accessor_reads_and_writes_nested_fields() {
        let desc: FieldDesc<Outer, u64> = crate::field!(Outer, inner.b);
        let mut outer = Outer {
            a: 1,
            inner: Inner { b: 5 },
        };

        let value = FieldAccessor::get(&desc, &outer as &dyn Any).unwrap();
        assert_eq!(value.downcast_ref::<u64>(), Some(&5));

        let value = FieldAccessor::get_mut(&desc, &mut outer as &mut dyn Any).unwrap();
        *value.downcast_mut::<u64>().unwrap() = 9;
        assert_eq!(outer.inner.b, 9);
        assert_eq!(outer.a, 1);
    }

    #[test]
    fn accessor_rejects_other_owner_types() {
        let desc: FieldDesc<Outer, u16> = crate::field!(Outer, a);
        let other = 3_u16;
        assert!(FieldAccessor::get(&desc, &other as &dyn Any).is_none());
    }
}
