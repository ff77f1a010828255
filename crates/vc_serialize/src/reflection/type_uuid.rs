use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;

use uuid::Uuid;

// -----------------------------------------------------------------------------
// TypeUuid

/// A persistent identity for a type.
///
/// Unlike [`TypeId`](core::any::TypeId) the uuid is written into data files,
/// so it must never change for a type whose data has been saved.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
/// use uuid::Uuid;
/// use vc_serialize::TypeUuid;
///
/// struct Marker;
///
/// impl TypeUuid for Marker {
///     fn type_uuid() -> Uuid {
///         Uuid::from_u128(0x6D2A1E4C_0B6F_4E53_9C8B_1D2F3A4B5C6D)
///     }
///     fn type_name() -> Cow<'static, str> {
///         Cow::Borrowed("Marker")
///     }
/// }
///
/// assert_eq!(Marker::type_name(), "Marker");
/// ```
pub trait TypeUuid: 'static {
    /// The stable identifier of this type.
    fn type_uuid() -> Uuid;

    /// The name written next to the identifier in readable formats.
    fn type_name() -> Cow<'static, str>;
}

// -----------------------------------------------------------------------------
// Helpers

/// Derives the identifier of a generic instantiation.
///
/// The result is a v5 uuid in the `template` namespace whose name is the
/// concatenation of the argument uuids, so it is stable across processes.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use vc_serialize::reflection::generic_uuid;
///
/// let vec = Uuid::from_u128(1);
/// let int = Uuid::from_u128(2);
/// assert_eq!(generic_uuid(vec, &[int]), generic_uuid(vec, &[int]));
/// assert_ne!(generic_uuid(vec, &[int]), generic_uuid(vec, &[vec]));
/// ```
pub fn generic_uuid(template: Uuid, arguments: &[Uuid]) -> Uuid {
    let mut name = Vec::with_capacity(arguments.len() * 16);
    for argument in arguments {
        name.extend_from_slice(argument.as_bytes());
    }
    Uuid::new_v5(&template, &name)
}

/// CRC32 of the ASCII-lowercased `name`.
///
/// Element and class names are looked up by this hash, so lookups are
/// case-insensitive for ASCII names.
///
/// # Examples
///
/// ```
/// use vc_serialize::reflection::name_crc;
///
/// assert_eq!(name_crc("m_Value"), name_crc("m_value"));
/// assert_ne!(name_crc("m_value"), name_crc("m_data"));
/// ```
pub fn name_crc(name: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0_u8; 64];
    for chunk in name.as_bytes().chunks(buffer.len()) {
        for (dst, src) in buffer.iter_mut().zip(chunk) {
            *dst = src.to_ascii_lowercase();
        }
        hasher.update(&buffer[..chunk.len()]);
    }
    hasher.finalize()
}

/// Formats `id` the way object streams store it: braced and uppercase.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use vc_serialize::reflection::uuid_to_string;
///
/// let id = Uuid::from_u128(0x72039442_EB38_4D42_A1AD_CB68F7E0EEF6);
/// assert_eq!(uuid_to_string(&id), "{72039442-EB38-4D42-A1AD-CB68F7E0EEF6}");
/// ```
pub fn uuid_to_string(id: &Uuid) -> String {
    let mut buffer = Uuid::encode_buffer();
    String::from(&*id.braced().encode_upper(&mut buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_plain_crc32_of_lowercase() {
        assert_eq!(name_crc("element"), crc32fast::hash(b"element"));
        assert_eq!(name_crc("Element"), crc32fast::hash(b"element"));

        let long = "A".repeat(150);
        assert_eq!(name_crc(&long), crc32fast::hash("a".repeat(150).as_bytes()));
    }

    #[test]
    fn generic_uuid_depends_on_argument_order() {
        let a = Uuid::from_u128(10);
        let b = Uuid::from_u128(11);
        let template = Uuid::from_u128(12);
        assert_ne!(generic_uuid(template, &[a, b]), generic_uuid(template, &[b, a]));
    }

    #[test]
    fn uuid_text_round_trips() {
        let id = Uuid::from_u128(0x03AAAB3F_5C47_5A66_9EBC_D5FA4DB353C9);
        let text = uuid_to_string(&id);
        assert!(text.starts_with('{') && text.ends_with('}'));
        assert_eq!(Uuid::parse_str(&text).unwrap(), id);
    }
}
