use alloc::string::String;
use alloc::vec::Vec;

/// The payload of a leaf node.
///
/// Binary streams produce [`Binary`](Self::Binary) payloads, readable formats
/// produce [`Text`](Self::Text). The leaf serializer converts text when the
/// node is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ElementData {
    #[default]
    None,
    Binary(Vec<u8>),
    Text(String),
}

impl ElementData {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Where a node stands in the conversion pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConversionState {
    /// Freshly decoded, not yet checked against the registry.
    #[default]
    NeedsConversion,
    /// A converter is running on the node.
    Converting,
    /// Matches the registered class and can be materialized.
    Done,
    /// Dropped by a converter or a deprecation.
    Discarded,
}
