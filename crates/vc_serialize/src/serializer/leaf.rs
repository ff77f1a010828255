use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::Any;

use uuid::Uuid;

use crate::reflection::uuid_to_string;
use crate::serializer::DataError;

// -----------------------------------------------------------------------------
// LeafValue

/// A value with a canonical byte form and a text form.
///
/// Numbers are stored little endian with their natural width. Text forms are
/// the usual Rust display forms, floats use the shortest representation that
/// parses back to the same bits.
///
/// # Examples
///
/// ```
/// use vc_serialize::serializer::LeafValue;
///
/// let mut bytes = Vec::new();
/// 0x0102_i16.write_bytes(&mut bytes);
/// assert_eq!(bytes, [0x02, 0x01]);
/// assert_eq!(i16::read_bytes(&bytes), Ok(0x0102));
///
/// assert_eq!(0.1_f32.to_text(), "0.1");
/// assert_eq!(bool::from_text("true"), Ok(true));
/// ```
pub trait LeafValue: Any + Clone + Send + Sync {
    /// Human readable type name used in error messages.
    const NAME: &'static str;

    fn write_bytes(&self, out: &mut Vec<u8>);

    fn read_bytes(data: &[u8]) -> Result<Self, DataError>;

    fn to_text(&self) -> String;

    fn from_text(text: &str) -> Result<Self, DataError>;

    /// Value equality used when diffing.
    fn same_value(&self, other: &Self) -> bool;
}

#[inline]
fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N], DataError> {
    data.try_into().map_err(|_| DataError::Size {
        expected: N,
        found: data.len(),
    })
}

#[inline]
fn text_error(type_name: &'static str, text: &str) -> DataError {
    DataError::Text {
        type_name,
        text: text.into(),
    }
}

macro_rules! impl_leaf_int {
    ($($ty:ty),*) => {$(
        impl LeafValue for $ty {
            const NAME: &'static str = stringify!($ty);

            #[inline]
            fn write_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
                fixed(data).map(<$ty>::from_le_bytes)
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> Result<Self, DataError> {
                text.trim().parse().map_err(|_| text_error(Self::NAME, text))
            }

            #[inline]
            fn same_value(&self, other: &Self) -> bool {
                self == other
            }
        }
    )*};
}

impl_leaf_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_leaf_float {
    ($($ty:ty),*) => {$(
        impl LeafValue for $ty {
            const NAME: &'static str = stringify!($ty);

            #[inline]
            fn write_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
                fixed(data).map(<$ty>::from_le_bytes)
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> Result<Self, DataError> {
                text.trim().parse().map_err(|_| text_error(Self::NAME, text))
            }

            // Bitwise, so NaN payloads compare equal to themselves.
            #[inline]
            fn same_value(&self, other: &Self) -> bool {
                self.to_bits() == other.to_bits()
            }
        }
    )*};
}

impl_leaf_float!(f32, f64);

impl LeafValue for bool {
    const NAME: &'static str = "bool";

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
        let [byte] = fixed::<1>(data)?;
        Ok(byte != 0)
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Result<Self, DataError> {
        match text.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(text_error(Self::NAME, text)),
        }
    }

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl LeafValue for char {
    const NAME: &'static str = "char";

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&u32::from(*self).to_le_bytes());
    }

    fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
        let code = u32::from_le_bytes(fixed(data)?);
        char::from_u32(code).ok_or_else(|| DataError::Custom(alloc::format!("{code:#x} is not a char")))
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Result<Self, DataError> {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(text_error(Self::NAME, text)),
        }
    }

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl LeafValue for String {
    const NAME: &'static str = "String";

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
        Ok(core::str::from_utf8(data)?.into())
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Result<Self, DataError> {
        Ok(text.into())
    }

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl LeafValue for Uuid {
    const NAME: &'static str = "Uuid";

    #[inline]
    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn read_bytes(data: &[u8]) -> Result<Self, DataError> {
        fixed(data).map(Uuid::from_bytes)
    }

    fn to_text(&self) -> String {
        uuid_to_string(self)
    }

    fn from_text(text: &str) -> Result<Self, DataError> {
        Uuid::parse_str(text.trim()).map_err(|_| text_error(Self::NAME, text))
    }

    #[inline]
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use uuid::Uuid;

    use super::LeafValue;
    use crate::serializer::DataError;

    fn bytes_of<T: LeafValue>(value: T) -> Vec<u8> {
        let mut out = Vec::new();
        value.write_bytes(&mut out);
        out
    }

    #[test]
    fn numbers_are_little_endian() {
        assert_eq!(bytes_of(5_i32), [5, 0, 0, 0]);
        assert_eq!(bytes_of(1.0_f32), 1.0_f32.to_le_bytes());
        assert_eq!(bytes_of('A'), [0x41, 0, 0, 0]);
    }

    #[test]
    fn wrong_payload_size_is_reported() {
        assert_eq!(
            u16::read_bytes(&[1, 2, 3]),
            Err(DataError::Size {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn float_text_keeps_bits() {
        for value in [0.1_f64, -3.25e-300, f64::MAX] {
            let text = value.to_text();
            assert!(f64::from_text(&text).unwrap().same_value(&value));
        }
        assert!(f32::NAN.same_value(&f32::NAN));
    }

    #[test]
    fn text_parse_errors_name_the_type() {
        let err = u8::from_text("300").unwrap_err();
        assert!(err.to_string().contains("u8"));
        assert!(char::from_text("ab").is_err());
        assert!(String::read_bytes(&[0xFF]).is_err());
    }

    #[test]
    fn uuid_text_is_braced() {
        let id = Uuid::from_u128(0xE152C105_A133_4D03_BBF8_3D4B2FBA3E2A);
        assert_eq!(id.to_text(), "{E152C105-A133-4D03-BBF8-3D4B2FBA3E2A}");
        assert_eq!(Uuid::from_text(&id.to_text()), Ok(id));
    }
}
