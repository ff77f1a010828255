//! Wire formats for element trees.
//!
//! All three formats carry the same [`DataElementNode`] shape: name, type
//! id, version, payload and ordered children. Binary streams keep leaf
//! payloads as bytes, XML and JSON keep the text produced by the leaf
//! serializer.
//!
//! | format | first byte | framing |
//! |--------|------------|---------|
//! | [`Binary`](StreamFormat::Binary) | `0x00` | length-prefixed records, big-endian integers |
//! | [`Xml`](StreamFormat::Xml) | `<` | `<ObjectStream>` with nested `<Class>` elements |
//! | [`Json`](StreamFormat::Json) | `{` | `{"name": "ObjectStream", "Objects": [..]}` |
//!
//! Encoding needs the registry to translate payloads between bytes and text.
//! Decoding does not; text payloads stay text until the node is loaded.

// -----------------------------------------------------------------------------
// Modules

mod binary;
mod error;
mod filter;
mod json;
mod xml;

// -----------------------------------------------------------------------------
// Exports

pub use error::CodecError;
pub use filter::LoadFilter;

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::registry::TypeRegistry;
use crate::tree::{DataElementNode, ElementData};

/// Version written into every stream. Newer streams are rejected.
pub const OBJECT_STREAM_VERSION: u32 = 3;

/// Deepest element nesting a decoder accepts. Roots are at depth 1.
///
/// Every container level of a saved object adds a level for itself and one
/// for its element, so this allows well over a hundred nested objects.
pub const MAX_ELEMENT_DEPTH: usize = 256;

/// Name of the root element or object of readable streams.
pub(crate) const STREAM_TAG: &str = "ObjectStream";

// -----------------------------------------------------------------------------
// StreamFormat

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StreamFormat {
    #[default]
    Binary,
    Xml,
    Json,
}

impl StreamFormat {
    /// Guesses the format from the start of a stream.
    ///
    /// ```
    /// use vc_serialize::codec::StreamFormat;
    ///
    /// assert_eq!(StreamFormat::detect(b"\0\0\0\0\x03"), Some(StreamFormat::Binary));
    /// assert_eq!(StreamFormat::detect(b"  <?xml"), Some(StreamFormat::Xml));
    /// assert_eq!(StreamFormat::detect(b"{}"), Some(StreamFormat::Json));
    /// assert_eq!(StreamFormat::detect(b""), None);
    /// ```
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.first() == Some(&binary::STREAM_TAG) {
            return Some(Self::Binary);
        }
        let text = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match text.iter().find(|b| !b.is_ascii_whitespace())? {
            b'<' => Some(Self::Xml),
            b'{' => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Xml => "xml",
            Self::Json => "json",
        })
    }
}

// -----------------------------------------------------------------------------
// Entry points

/// Appends a stream holding `roots` to `out`.
pub fn encode(
    format: StreamFormat,
    registry: &TypeRegistry,
    roots: &[DataElementNode],
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    match format {
        StreamFormat::Binary => binary::encode(registry, roots, out),
        StreamFormat::Xml => xml::encode(registry, roots, out),
        StreamFormat::Json => json::encode(registry, roots, out),
    }
}

/// Decodes every root of a stream, detecting its format.
///
/// Fails as a whole when the framing is broken or the stream version is
/// newer than [`OBJECT_STREAM_VERSION`].
pub fn decode(bytes: &[u8], filter: &LoadFilter) -> Result<Vec<DataElementNode>, CodecError> {
    match StreamFormat::detect(bytes).ok_or(CodecError::UnknownFormat)? {
        StreamFormat::Binary => binary::decode(bytes, filter),
        StreamFormat::Xml => xml::decode(bytes, filter),
        StreamFormat::Json => json::decode(bytes, filter),
    }
}

pub(crate) fn check_version(found: u32) -> Result<(), CodecError> {
    if found > OBJECT_STREAM_VERSION {
        return Err(CodecError::UnsupportedVersion {
            found,
            max: OBJECT_STREAM_VERSION,
        });
    }
    Ok(())
}

pub(crate) fn check_depth(depth: usize) -> Result<(), CodecError> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(CodecError::TooDeep {
            max: MAX_ELEMENT_DEPTH,
        });
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Payload translation

/// The text form of a leaf payload, for readable formats.
pub(crate) fn leaf_text<'n>(
    registry: &TypeRegistry,
    node: &'n DataElementNode,
) -> Result<Option<Cow<'n, str>>, CodecError> {
    let type_id = node.type_id();
    match node.data() {
        ElementData::None => Ok(None),
        ElementData::Text(text) => Ok(Some(Cow::Borrowed(text))),
        ElementData::Binary(bytes) => {
            let serializer = registry
                .find_class_data(&type_id)
                .and_then(|class| class.serializer())
                .ok_or(CodecError::UnknownLeaf { type_id })?;
            let text = serializer
                .data_to_text(bytes)
                .map_err(|source| CodecError::Leaf { type_id, source })?;
            Ok(Some(Cow::Owned(text)))
        }
    }
}

/// The binary form of a leaf payload.
///
/// Text of an unregistered type cannot be translated and is kept as text.
pub(crate) enum LeafBytes<'n> {
    Binary(Cow<'n, [u8]>),
    Text(&'n str),
}

pub(crate) fn leaf_bytes<'n>(
    registry: &TypeRegistry,
    node: &'n DataElementNode,
) -> Result<Option<LeafBytes<'n>>, CodecError> {
    let type_id = node.type_id();
    match node.data() {
        ElementData::None => Ok(None),
        ElementData::Binary(bytes) => Ok(Some(LeafBytes::Binary(Cow::Borrowed(bytes)))),
        ElementData::Text(text) => {
            let Some(serializer) = registry
                .find_class_data(&type_id)
                .and_then(|class| class.serializer())
            else {
                return Ok(Some(LeafBytes::Text(text)));
            };
            let mut bytes = Vec::new();
            serializer
                .text_to_data(text, &mut bytes)
                .map_err(|source| CodecError::Leaf { type_id, source })?;
            Ok(Some(LeafBytes::Binary(Cow::Owned(bytes))))
        }
    }
}

/// The display name of a node type, empty when unregistered.
pub(crate) fn type_name<'r>(registry: &'r TypeRegistry, node: &DataElementNode) -> &'r str {
    registry
        .find_class_data(&node.type_id())
        .map_or("", |class| class.name())
}

pub(crate) fn parse_uuid(text: &str) -> Result<uuid::Uuid, CodecError> {
    uuid::Uuid::parse_str(text).map_err(|_| CodecError::BadUuid(String::from(text)))
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{CodecError, LoadFilter, MAX_ELEMENT_DEPTH, StreamFormat, decode, encode};
    use crate::TypeUuid;
    use crate::fixtures::{Circle, Foo, ShapeHolder, Square};
    use crate::registry::TypeRegistry;
    use crate::tree::DataElementNode;
    use crate::walker::{Diagnostics, save_to_node};

    const FORMATS: [StreamFormat; 3] = [StreamFormat::Binary, StreamFormat::Xml, StreamFormat::Json];

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.reflect::<ShapeHolder>().reflect::<Square>().reflect::<Foo>();
        registry
    }

    fn sample(registry: &TypeRegistry) -> Vec<DataElementNode> {
        let holder = ShapeHolder {
            shapes: vec![
                Box::new(Circle { radius: 0.1 }),
                Box::new(Square { side: -3.5 }),
            ],
        };
        let mut diagnostics = Diagnostics::new();
        vec![
            save_to_node(registry, &holder, "", &mut diagnostics).unwrap(),
            save_to_node(registry, &Foo { m_data: -7 }, "", &mut diagnostics).unwrap(),
        ]
    }

    #[test]
    fn every_format_keeps_the_tree() {
        let registry = registry();
        let roots = sample(&registry);
        for format in FORMATS {
            let mut bytes = Vec::new();
            encode(format, &registry, &roots, &mut bytes).unwrap();
            assert_eq!(StreamFormat::detect(&bytes), Some(format));

            let decoded = decode(&bytes, &LoadFilter::new()).unwrap();
            assert_eq!(decoded.len(), 2, "{format}");
            assert_eq!(decoded[1].type_id(), Foo::type_uuid(), "{format}");

            // Text payloads become identical bytes after one more binary pass.
            let mut binary = Vec::new();
            encode(StreamFormat::Binary, &registry, &decoded, &mut binary).unwrap();
            let normalized = decode(&binary, &LoadFilter::new()).unwrap();
            assert_eq!(normalized, roots, "{format}");
        }
    }

    #[test]
    fn filtered_types_are_skipped() {
        let registry = registry();
        let roots = sample(&registry);
        let filter = LoadFilter::new().skip_type(Square::type_uuid());
        for format in FORMATS {
            let mut bytes = Vec::new();
            encode(format, &registry, &roots, &mut bytes).unwrap();
            let decoded = decode(&bytes, &filter).unwrap();
            let shapes = &decoded[0].children()[0];
            assert_eq!(shapes.children().len(), 1, "{format}");
            assert_eq!(shapes.children()[0].type_id(), Circle::type_uuid(), "{format}");
        }
    }

    /// `depth` empty nodes, each the only child of the one above.
    fn chain(depth: usize) -> DataElementNode {
        let mut node = DataElementNode::new("link", u8::type_uuid(), 0);
        for _ in 1..depth {
            let mut parent = DataElementNode::new("link", u8::type_uuid(), 0);
            parent.add_node(node);
            node = parent;
        }
        node
    }

    fn depth(node: &DataElementNode) -> usize {
        1 + node.children().iter().map(depth).max().unwrap_or(0)
    }

    #[test]
    fn the_deepest_accepted_tree_survives_every_format() {
        let registry = registry();
        let roots = [chain(MAX_ELEMENT_DEPTH)];
        for format in FORMATS {
            let mut bytes = Vec::new();
            encode(format, &registry, &roots, &mut bytes).unwrap();
            let decoded = decode(&bytes, &LoadFilter::new()).unwrap();
            assert_eq!(depth(&decoded[0]), MAX_ELEMENT_DEPTH, "{format}");
        }
    }

    #[test]
    fn deeper_trees_are_rejected_by_every_format() {
        let registry = registry();
        let roots = [chain(MAX_ELEMENT_DEPTH + 1)];
        for format in FORMATS {
            let mut bytes = Vec::new();
            encode(format, &registry, &roots, &mut bytes).unwrap();
            assert!(
                matches!(
                    decode(&bytes, &LoadFilter::new()),
                    Err(CodecError::TooDeep { max: MAX_ELEMENT_DEPTH })
                ),
                "{format}"
            );
        }
    }

    #[test]
    fn garbage_is_not_a_stream() {
        assert!(matches!(
            decode(b"garbage", &LoadFilter::new()),
            Err(CodecError::UnknownFormat)
        ));
    }
}
