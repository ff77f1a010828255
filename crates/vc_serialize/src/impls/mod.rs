//! [`Reflect`](crate::Reflect) for standard types.
//!
//! - leaves: `bool` `char` `i8`-`i64` `u8`-`u64` `f32` `f64` `String` `Uuid`
//! - sequences: `Vec` `VecDeque` `LinkedList` `StackVec<T, N>`
//! - fixed-size arrays: `[T; N]`
//! - sets: `BTreeSet` and `HashSet` (std and hashbrown)
//! - maps: `BTreeMap` and `HashMap` (std and hashbrown)
//! - `FixedBitSet`
//! - `Option<T>`, `Box<B>` for any [`RttiBase`](crate::RttiBase)
//! - tuples up to arity 6
//!
//! Generic instantiations derive their id from a template id and the ids of
//! their arguments, see [`generic_uuid`](crate::reflection::generic_uuid).

// -----------------------------------------------------------------------------
// Modules

mod array;
mod bitset;
mod map;
mod option;
mod pointer;
mod primitive;
mod sequence;
mod set;
mod tuple;

// -----------------------------------------------------------------------------
// Exports

pub use array::ArrayAdapter;
pub use bitset::BitSetAdapter;
pub use map::{MapAdapter, MapStorage};
pub use option::OptionAdapter;
pub use pointer::PointerAdapter;
pub use sequence::{SequenceAdapter, SequenceStorage};
pub use set::{SetAdapter, SetStorage};
pub use tuple::TupleAdapter;

pub(crate) use primitive::reflect_primitives;

/// Template ids of the generic containers.
pub mod template {
    use uuid::Uuid;

    pub const VEC: Uuid = Uuid::from_u128(0xA60E3E61_1FF6_4982_B6B8_9E4350C4C679);
    pub const VEC_DEQUE: Uuid = Uuid::from_u128(0x8C4E2A71_5D3B_4F09_A6C2_7E1D9B0F3A58);
    pub const LINKED_LIST: Uuid = Uuid::from_u128(0xC2B4E6A1_3F57_4D18_9E2A_5B7C0D1E4F63);
    pub const STACK_VEC: Uuid = Uuid::from_u128(0x5B2D8F14_AE63_47C9_8D01_3F6A9C2E7B45);
    pub const ARRAY: Uuid = Uuid::from_u128(0x911F3A6E_0B7D_4C25_B84E_2D5F1A9C6E07);
    pub const BTREE_SET: Uuid = Uuid::from_u128(0x4E7A1C93_62D8_4B0F_A315_C9E8D2B7F6A4);
    pub const HASH_SET: Uuid = Uuid::from_u128(0x7F3C5E2A_8D14_4A6B_9C07_E1B3D5F2A8C9);
    pub const FIXED_HASH_SET: Uuid = Uuid::from_u128(0x2A9E6C4B_D315_4F87_8B2C_60A7E9D1C4F5);
    pub const BTREE_MAP: Uuid = Uuid::from_u128(0xD6E1F4A8_27C9_4E3B_A05D_8B2F7C6E1A93);
    pub const HASH_MAP: Uuid = Uuid::from_u128(0x3B8D2F6E_A471_4C95_9E13_D7F0A2C5B8E6);
    pub const FIXED_HASH_MAP: Uuid = Uuid::from_u128(0x6C1A9F3D_5B28_4E7A_B6D4_19E3C8F0A275);
    pub const MAP_ENTRY: Uuid = Uuid::from_u128(0xB5F82C1E_9A64_4D37_8E0B_4C6A1F9D3E72);
    pub const OPTION: Uuid = Uuid::from_u128(0x1D4F7B2A_C8E5_4396_A2F1_6B9E0D3C7A58);
    pub const BOX: Uuid = Uuid::from_u128(0xF08C3E5B_7A21_4D69_9B4E_2C7F1A8D6E30);
    pub const TUPLE: Uuid = Uuid::from_u128(0x8E2B6D4F_13A9_4C7E_B5F0_7D1C3A9E2B64);

    /// The id of `FixedBitSet` itself.
    pub const FIXED_BIT_SET: Uuid = Uuid::from_u128(0x9A3E7C1F_4D62_4B8A_A0E5_3F8D6B2C9E17);
}
