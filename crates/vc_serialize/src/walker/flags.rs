bitflags::bitflags! {
    /// Options of a load.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LoadFlags: u8 {
        /// Any recoverable issue fails the whole load.
        const STRICT = 1 << 0;
        /// Unregistered types are skipped without reporting them.
        const IGNORE_UNKNOWN_CLASSES = 1 << 1;
    }
}
