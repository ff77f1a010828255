//! Hash builders with deterministic output.
//!
//! [`FixedHashState`] feeds `foldhash` with a constant seed, so two maps filled
//! with the same keys iterate in the same order on every run. [`NoOpHashState`]
//! passes integer keys straight through and is meant for keys that already are
//! hashes (CRC32 name hashes, for example).

use core::hash::{BuildHasher, Hasher};

use foldhash::fast::{FixedState, FoldHasher};

// -----------------------------------------------------------------------------
// FixedHasher

const FIXED_HASH_STATE: FixedState = FixedState::with_seed(0x3C6E_F372_FE94_F82B);

/// Hasher produced by [`FixedHashState`].
pub type FixedHasher = FoldHasher<'static>;

/// `foldhash` with a seed baked into the binary.
///
/// # Examples
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::FixedHashState;
///
/// assert_eq!(FixedHashState.hash_one(42_u32), FixedHashState.hash_one(42_u32));
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct FixedHashState;

impl BuildHasher for FixedHashState {
    type Hasher = FixedHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        FIXED_HASH_STATE.build_hasher()
    }
}

// -----------------------------------------------------------------------------
// NoOpHasher

/// Hasher that keeps the last integer written as the hash.
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHasher {
    hash: u64,
}

impl Hasher for NoOpHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes.iter().rev() {
            self.hash = self.hash.rotate_left(8).wrapping_add(*byte as u64);
        }
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        // CRC keys occupy the low half, spread them over the high half too.
        self.hash = (i as u64) | ((i as u64) << 32);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = i;
    }
}

/// Builder for [`NoOpHasher`].
///
/// # Examples
///
/// ```
/// use core::hash::BuildHasher;
/// use vc_utils::hash::NoOpHashState;
///
/// assert_eq!(NoOpHashState.hash_one(7_u64), 7);
/// ```
#[derive(Copy, Clone, Default, Debug)]
pub struct NoOpHashState;

impl BuildHasher for NoOpHashState {
    type Hasher = NoOpHasher;

    #[inline(always)]
    fn build_hasher(&self) -> Self::Hasher {
        NoOpHasher { hash: 0 }
    }
}

#[cfg(test)]
mod tests {
    use core::hash::BuildHasher;

    use super::{FixedHashState, NoOpHashState};

    #[test]
    fn fixed_state_is_deterministic() {
        let a = FixedHashState.hash_one("ObjectStream");
        let b = FixedHashState.hash_one("ObjectStream");
        assert_eq!(a, b);
        assert_ne!(a, FixedHashState.hash_one("objectstream"));
    }

    #[test]
    fn noop_state_keeps_integers() {
        assert_eq!(NoOpHashState.hash_one(0xDEAD_BEEF_u64), 0xDEAD_BEEF);
        let crc = NoOpHashState.hash_one(0x0102_0304_u32);
        assert_eq!(crc, 0x0102_0304_0102_0304);
    }
}
