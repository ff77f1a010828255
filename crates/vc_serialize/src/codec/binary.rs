//! Length-prefixed binary records.
//!
//! ```text
//! stream := 0x00 version:u32 record* 0x00
//! record := flags:u8 body_len:u32 body
//! body   := [name_len:u16 name] uuid:16 [version:u32] [value_len:u32 value] record*
//! ```
//!
//! Integers are big-endian. The body length lets a reader skip a record
//! without understanding its type.

use alloc::string::String;
use alloc::vec::Vec;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use uuid::Uuid;

use crate::codec::{
    CodecError, LeafBytes, LoadFilter, OBJECT_STREAM_VERSION, check_depth, check_version,
    leaf_bytes,
};
use crate::registry::TypeRegistry;
use crate::tree::{DataElementNode, ElementData};

pub(crate) const STREAM_TAG: u8 = 0x00;
const END_TAG: u8 = 0x00;

const ELEMENT: u8 = 0x80;
const HAS_NAME: u8 = 0x01;
const HAS_VERSION: u8 = 0x02;
const HAS_VALUE: u8 = 0x04;
const TEXT_VALUE: u8 = 0x08;

// -----------------------------------------------------------------------------
// Encoding

pub(super) fn encode(
    registry: &TypeRegistry,
    roots: &[DataElementNode],
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    out.write_u8(STREAM_TAG)?;
    out.write_u32::<BigEndian>(OBJECT_STREAM_VERSION)?;
    for root in roots {
        write_record(registry, root, out)?;
    }
    out.write_u8(END_TAG)?;
    Ok(())
}

fn write_record(
    registry: &TypeRegistry,
    node: &DataElementNode,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let value = leaf_bytes(registry, node)?;

    let mut flags = ELEMENT;
    if !node.name().is_empty() {
        flags |= HAS_NAME;
    }
    if node.version() != 0 {
        flags |= HAS_VERSION;
    }
    match value {
        Some(LeafBytes::Binary(_)) => flags |= HAS_VALUE,
        Some(LeafBytes::Text(_)) => flags |= HAS_VALUE | TEXT_VALUE,
        None => {}
    }

    out.write_u8(flags)?;
    let len_at = out.len();
    out.write_u32::<BigEndian>(0)?;
    let body_start = out.len();

    if flags & HAS_NAME != 0 {
        let name = node.name().as_bytes();
        let len = u16::try_from(name.len())
            .map_err(|_| CodecError::Malformed(String::from("element name longer than 65535 bytes")))?;
        out.write_u16::<BigEndian>(len)?;
        out.extend_from_slice(name);
    }
    out.extend_from_slice(node.type_id().as_bytes());
    if flags & HAS_VERSION != 0 {
        out.write_u32::<BigEndian>(node.version())?;
    }
    if let Some(value) = value {
        let bytes = match &value {
            LeafBytes::Binary(bytes) => bytes.as_ref(),
            LeafBytes::Text(text) => text.as_bytes(),
        };
        out.write_u32::<BigEndian>(length(bytes.len())?)?;
        out.extend_from_slice(bytes);
    }
    for child in node.children() {
        write_record(registry, child, out)?;
    }

    let body_len = length(out.len() - body_start)?;
    BigEndian::write_u32(&mut out[len_at..body_start], body_len);
    Ok(())
}

fn length(len: usize) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::Malformed(String::from("record larger than 4 GiB")))
}

// -----------------------------------------------------------------------------
// Decoding

struct Input<'a> {
    bytes: &'a [u8],
}

impl<'a> Input<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.bytes.len() < n {
            return Err(CodecError::UnexpectedEnd);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, CodecError> {
        self.take(2).map(BigEndian::read_u16)
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        self.take(4).map(BigEndian::read_u32)
    }

    fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub(super) fn decode(bytes: &[u8], filter: &LoadFilter) -> Result<Vec<DataElementNode>, CodecError> {
    let mut input = Input { bytes };
    if input.u8()? != STREAM_TAG {
        return Err(CodecError::UnknownFormat);
    }
    check_version(input.u32()?)?;

    let mut roots = Vec::new();
    loop {
        let flags = input.u8()?;
        if flags == END_TAG {
            break;
        }
        if let Some(root) = read_record(flags, &mut input, filter, 1)? {
            roots.push(root);
        }
    }
    Ok(roots)
}

/// Reads the record whose flags byte was just consumed, `depth` levels below
/// the stream.
///
/// Returns `None` for records the filter rejects.
fn read_record(
    flags: u8,
    input: &mut Input<'_>,
    filter: &LoadFilter,
    depth: usize,
) -> Result<Option<DataElementNode>, CodecError> {
    check_depth(depth)?;
    if flags & ELEMENT == 0 {
        return Err(CodecError::Malformed(alloc::format!("bad record flags {flags:#04x}")));
    }
    let body_len = input.u32()? as usize;
    let mut body = Input {
        bytes: input.take(body_len)?,
    };

    let name = if flags & HAS_NAME != 0 {
        let len = body.u16()? as usize;
        core::str::from_utf8(body.take(len)?)
            .map_err(|_| CodecError::Malformed(String::from("element name is not UTF-8")))?
    } else {
        ""
    };
    let type_id = Uuid::from_slice(body.take(16)?)
        .map_err(|_| CodecError::Malformed(String::from("truncated type id")))?;
    if !filter.accepts(&type_id) {
        log::trace!("skipped {body_len} bytes of type {type_id}");
        return Ok(None);
    }
    let version = if flags & HAS_VERSION != 0 {
        body.u32()?
    } else {
        0
    };

    let mut node = DataElementNode::new(name, type_id, version);
    if flags & HAS_VALUE != 0 {
        let len = body.u32()? as usize;
        let value = body.take(len)?;
        node.set_raw_data(if flags & TEXT_VALUE != 0 {
            let text = core::str::from_utf8(value)
                .map_err(|_| CodecError::Malformed(String::from("text value is not UTF-8")))?;
            ElementData::Text(text.into())
        } else {
            ElementData::Binary(value.to_vec())
        });
    }

    while !body.is_empty() {
        let child_flags = body.u8()?;
        if let Some(child) = read_record(child_flags, &mut body, filter, depth + 1)? {
            node.add_node(child);
        }
    }
    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{decode, encode};
    use crate::TypeUuid;
    use crate::codec::{CodecError, LoadFilter, MAX_ELEMENT_DEPTH};
    use crate::registry::TypeRegistry;
    use crate::tree::{DataElementNode, ElementData};

    #[test]
    fn byte_layout_is_stable() {
        let registry = TypeRegistry::new();
        let mut root = DataElementNode::new("", u8::type_uuid(), 0);
        root.set_raw_data(ElementData::Binary(vec![0x2A]));

        let mut bytes = Vec::new();
        encode(&registry, &[root], &mut bytes).unwrap();

        let mut expected = vec![0x00, 0, 0, 0, 3, 0x84, 0, 0, 0, 21];
        expected.extend_from_slice(u8::type_uuid().as_bytes());
        expected.extend_from_slice(&[0, 0, 0, 1, 0x2A, 0x00]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn hostile_nesting_fails_without_recursing() {
        // Each record holds a type id and the next record.
        const LEVELS: u32 = 100_000;
        let mut bytes = vec![0x00, 0, 0, 0, 3];
        for level in 0..LEVELS {
            let body_len = 16 + 21 * (LEVELS - 1 - level);
            bytes.push(0x80);
            bytes.extend_from_slice(&body_len.to_be_bytes());
            bytes.extend_from_slice(u8::type_uuid().as_bytes());
        }
        bytes.push(0x00);

        assert!(matches!(
            decode(&bytes, &LoadFilter::new()),
            Err(CodecError::TooDeep { max: MAX_ELEMENT_DEPTH })
        ));
    }

    #[test]
    fn future_stream_versions_are_rejected() {
        let bytes = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];
        assert!(matches!(
            decode(&bytes, &LoadFilter::new()),
            Err(CodecError::UnsupportedVersion { found: u32::MAX, .. })
        ));
    }

    #[test]
    fn truncated_records_fail() {
        let registry = TypeRegistry::new();
        let root = DataElementNode::leaf("x", &5_i64);
        let mut bytes = Vec::new();
        encode(&registry, &[root], &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(
            decode(&bytes, &LoadFilter::new()),
            Err(CodecError::UnexpectedEnd)
        ));
    }

    #[test]
    fn unregistered_text_stays_text() {
        let registry = TypeRegistry::empty();
        let mut root = DataElementNode::new("", uuid::Uuid::from_u128(9), 0);
        root.set_raw_data(ElementData::Text("opaque".into()));

        let mut bytes = Vec::new();
        encode(&registry, &[root.clone()], &mut bytes).unwrap();
        assert_eq!(decode(&bytes, &LoadFilter::new()).unwrap(), [root]);
    }
}
