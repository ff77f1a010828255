use uuid::Uuid;
use vc_utils::UuidMap;

use crate::walker::LoadFlags;

/// Decides which parts of a stream are read.
///
/// Subtrees of skipped types never reach the tree. The binary decoder jumps
/// over them using their length prefix.
#[derive(Debug, Clone, Default)]
pub struct LoadFilter {
    flags: LoadFlags,
    skipped: UuidMap<()>,
}

impl LoadFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: LoadFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Drops every element of type `type_id` while decoding.
    pub fn skip_type(mut self, type_id: Uuid) -> Self {
        self.skipped.insert(type_id, ());
        self
    }

    #[inline]
    pub fn flags(&self) -> LoadFlags {
        self.flags
    }

    #[inline]
    pub fn accepts(&self, type_id: &Uuid) -> bool {
        !self.skipped.contains(type_id)
    }
}
