use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use crate::serializer::{DataError, DataSerializer, LeafValue};

/// The [`DataSerializer`] of a [`LeafValue`] type.
pub struct PrimitiveSerializer<T>(PhantomData<fn() -> T>);

impl<T> PrimitiveSerializer<T> {
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for PrimitiveSerializer<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LeafValue> DataSerializer for PrimitiveSerializer<T> {
    fn save(&self, instance: &dyn Any, out: &mut Vec<u8>) -> Result<(), DataError> {
        let value = instance
            .downcast_ref::<T>()
            .ok_or(DataError::InstanceType { expected: T::NAME })?;
        value.write_bytes(out);
        Ok(())
    }

    fn load(&self, instance: &mut dyn Any, data: &[u8], _version: u32) -> Result<(), DataError> {
        let value = instance
            .downcast_mut::<T>()
            .ok_or(DataError::InstanceType { expected: T::NAME })?;
        *value = T::read_bytes(data)?;
        Ok(())
    }

    fn data_to_text(&self, data: &[u8]) -> Result<String, DataError> {
        T::read_bytes(data).map(|value| value.to_text())
    }

    fn text_to_data(&self, text: &str, out: &mut Vec<u8>) -> Result<(), DataError> {
        T::from_text(text)?.write_bytes(out);
        Ok(())
    }

    fn compare_value_data(&self, a: &dyn Any, b: &dyn Any) -> bool {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(a), Some(b)) => a.same_value(b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::PrimitiveSerializer;
    use crate::serializer::{DataError, DataSerializer};

    #[test]
    fn text_and_bytes_agree() {
        let serializer = PrimitiveSerializer::<i64>::new();
        let mut bytes = Vec::new();
        serializer.save(&-42_i64, &mut bytes).unwrap();
        assert_eq!(serializer.data_to_text(&bytes).unwrap(), "-42");

        let mut parsed = Vec::new();
        serializer.text_to_data("-42", &mut parsed).unwrap();
        assert_eq!(parsed, bytes);

        let mut value = 0_i64;
        serializer.load(&mut value, &parsed, 0).unwrap();
        assert_eq!(value, -42);
    }

    #[test]
    fn wrong_instance_type_is_rejected() {
        let serializer = PrimitiveSerializer::<String>::new();
        let mut out = Vec::new();
        assert_eq!(
            serializer.save(&1_u8, &mut out),
            Err(DataError::InstanceType { expected: "String" })
        );
        assert!(!serializer.compare_value_data(&String::new(), &0_u8));
    }
}
