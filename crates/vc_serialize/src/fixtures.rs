//! Types shared by the unit tests.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::marker::PhantomData;

use uuid::Uuid;

use crate::reflection::name_crc;
use crate::registry::{EventHandler, TypeRegistry, VersionConverter};
use crate::tree::DataElementNode;
use crate::{Reflect, TypeUuid, field, rtti_base};

// -----------------------------------------------------------------------------
// Foo and its later versions

const FOO_UUID: Uuid = Uuid::from_u128(0x3C5F_A1E2_0B7D_4F96_8E21_7D4C_9A0B_5E13);

/// Version 1, registered by hand.
#[derive(Default, Debug, PartialEq, Clone)]
pub struct Foo {
    pub m_data: i32,
}

impl TypeUuid for Foo {
    fn type_uuid() -> Uuid {
        FOO_UUID
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Foo")
    }
}

impl Reflect for Foo {
    fn reflect(registry: &mut TypeRegistry) {
        registry
            .class::<Foo>()
            .version(1)
            .attribute("category", "Test")
            .field("m_data", field!(Foo, m_data))
            .attribute("min", 0_i32);
    }
}

/// Version 2 renamed `m_data` to `m_value` and doubled it.
#[derive(Reflect, Default, Debug)]
#[reflect(
    uuid = "{3C5FA1E2-0B7D-4F96-8E21-7D4C9A0B5E13}",
    name = "Foo",
    version = 2,
    converter = upgrade_foo
)]
pub struct FooV2 {
    pub m_value: i32,
}

fn upgrade_foo(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
    if node.version() >= 2 {
        return true;
    }
    let Ok(old) = node.get_child_data::<i32>(registry, name_crc("m_data")) else {
        return false;
    };
    node.remove_element_by_name(name_crc("m_data"));
    node.add_element_with_data(registry, "m_value", &(old * 2)).is_ok()
}

/// Version 2 whose converter turns the node into an `i32`.
#[derive(Reflect, Default)]
#[reflect(
    uuid = "{3C5FA1E2-0B7D-4F96-8E21-7D4C9A0B5E13}",
    name = "Foo",
    version = 2,
    converter = retype_foo
)]
pub struct BadFoo {
    pub m_data: i32,
}

fn retype_foo(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
    node.convert::<i32>(registry).is_ok()
}

// -----------------------------------------------------------------------------
// Shapes

pub trait Shape: Any {
    fn area(&self) -> f32;
}

rtti_base!(dyn Shape, "{9D04E7B1-5C2A-4E83-B1F6-20A7C3D85E4F}");

#[derive(Reflect, Default, Debug, PartialEq)]
#[reflect(uuid = "{6E21B8C4-7A3F-4D05-9C1E-84F2A6B0D937}", polymorphic(dyn Shape))]
pub struct Circle {
    pub radius: f32,
}

impl Shape for Circle {
    fn area(&self) -> f32 {
        3.0 * self.radius * self.radius
    }
}

#[derive(Reflect, Default, Debug, PartialEq)]
#[reflect(uuid = "{A7F3C190-2E4B-4B68-8D5A-C1E09B7F3624}", polymorphic(dyn Shape))]
pub struct Square {
    pub side: f32,
}

impl Shape for Square {
    fn area(&self) -> f32 {
        self.side * self.side
    }
}

/// Knows circles but not squares.
#[derive(Default)]
pub struct ShapeHolder {
    pub shapes: Vec<Box<dyn Shape>>,
}

impl TypeUuid for ShapeHolder {
    fn type_uuid() -> Uuid {
        Uuid::from_u128(0x1B8E_5D27_C4A0_4F3B_9E62_D0A5_7C18_E4B9)
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("ShapeHolder")
    }
}

impl Reflect for ShapeHolder {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<Circle>();
        registry
            .class::<ShapeHolder>()
            .field("shapes", field!(ShapeHolder, shapes));
    }
}

/// Shapes in optional slots.
#[derive(Default)]
pub struct GapHolder {
    pub shapes: Vec<Option<Box<dyn Shape>>>,
}

impl TypeUuid for GapHolder {
    fn type_uuid() -> Uuid {
        Uuid::from_u128(0x52C9_0E3A_8B17_4D6F_A4E8_3F71_B2D0_96C5)
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("GapHolder")
    }
}

impl Reflect for GapHolder {
    fn reflect(registry: &mut TypeRegistry) {
        registry.reflect_dependency::<Circle>();
        registry
            .class::<GapHolder>()
            .field("shapes", field!(GapHolder, shapes));
    }
}

/// Registers `Square` as deprecated.
pub fn deprecate_square(registry: &mut TypeRegistry, converter: Option<VersionConverter>) {
    registry
        .class_deprecate("Square", Square::type_uuid(), converter)
        .unwrap();
}

/// Rewrites a square of side `s` into a circle of radius `s`.
pub fn redirect_square_to_circle(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
    let Ok(side) = node.get_child_data::<f32>(registry, name_crc("side")) else {
        return false;
    };
    node.convert::<Circle>(registry).is_ok()
        && node.add_element_with_data(registry, "radius", &side).is_ok()
}

// -----------------------------------------------------------------------------
// Redirect loop

pub const ALIAS_A: Uuid = Uuid::from_u128(0xA1);
const ALIAS_B: Uuid = Uuid::from_u128(0xB2);

fn alias_to_b(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
    node.convert_to(registry, ALIAS_B).is_ok()
}

fn alias_to_a(registry: &TypeRegistry, node: &mut DataElementNode) -> bool {
    node.convert_to(registry, ALIAS_A).is_ok()
}

/// Two deprecated classes redirecting to each other.
pub fn register_alias_loop(registry: &mut TypeRegistry) {
    registry.class_deprecate("AliasA", ALIAS_A, Some(alias_to_b)).unwrap();
    registry.class_deprecate("AliasB", ALIAS_B, Some(alias_to_a)).unwrap();
}

// -----------------------------------------------------------------------------
// Embedded bases

#[derive(Reflect, Default, Debug)]
#[reflect(uuid = "{0F6A2C83-91D4-4E57-B3A8-6C2E1D09F7B4}")]
pub struct BaseA {
    pub a: i32,
}

#[derive(Reflect, Default, Debug)]
#[reflect(uuid = "{C83D7E10-4B5A-4962-8F17-A0E53B6C2D98}")]
pub struct BaseB {
    pub b: f64,
}

#[derive(Reflect, Default, Debug)]
#[reflect(uuid = "{E4B1905C-3D72-4A8E-96F0-1C7B2A5D83E6}")]
pub struct MultiDerived {
    #[reflect(base)]
    pub base_a: BaseA,
    #[reflect(base)]
    pub base_b: BaseB,
    pub own: u8,
}

/// Read through the `BaseA` each implementor embeds.
pub trait Tagged: Any {
    fn tag(&self) -> i32;
}

rtti_base!(dyn Tagged, "{2A7D94E1-B03C-4F58-A6E2-5C19F0D83B47}");

/// Embeds its base first.
#[derive(Reflect, Default, Debug)]
#[reflect(uuid = "{D61C08F3-7E25-4B9A-8143-0AF5E2C7B96D}", polymorphic(dyn Tagged))]
#[repr(C)]
pub struct LeadingTag {
    #[reflect(base)]
    pub base_a: BaseA,
    pub weight: f64,
}

impl Tagged for LeadingTag {
    fn tag(&self) -> i32 {
        self.base_a.a
    }
}

/// Embeds its base after another field.
#[derive(Reflect, Default, Debug)]
#[reflect(uuid = "{84E3B7C0-1F6D-4A29-9D58-E7320B4AC1F6}", polymorphic(dyn Tagged))]
#[repr(C)]
pub struct TrailingTag {
    pub weight: f64,
    #[reflect(base)]
    pub base_a: BaseA,
}

impl Tagged for TrailingTag {
    fn tag(&self) -> i32 {
        self.base_a.a
    }
}

// -----------------------------------------------------------------------------
// Lifecycle hooks

/// Types with hook counters that are never serialized.
pub trait Counted: Any {
    fn counters(&mut self) -> (&mut u32, &mut u32);
}

struct CountingHooks<T>(PhantomData<fn() -> T>);

impl<T: Counted> EventHandler for CountingHooks<T> {
    fn on_loaded_from_object_stream(&self, instance: &mut dyn Any) {
        if let Some(value) = instance.downcast_mut::<T>() {
            *value.counters().0 += 1;
        }
    }

    fn on_object_cloned(&self, instance: &mut dyn Any) {
        if let Some(value) = instance.downcast_mut::<T>() {
            *value.counters().1 += 1;
        }
    }
}

#[derive(Default, Debug)]
pub struct Tracked {
    pub value: i32,
    pub loaded: u32,
    pub cloned: u32,
}

impl Counted for Tracked {
    fn counters(&mut self) -> (&mut u32, &mut u32) {
        (&mut self.loaded, &mut self.cloned)
    }
}

impl TypeUuid for Tracked {
    fn type_uuid() -> Uuid {
        Uuid::from_u128(0x7B02_C6E9_15F4_4A3D_8C90_E6D1_4B27_A85F)
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("Tracked")
    }
}

impl Reflect for Tracked {
    fn reflect(registry: &mut TypeRegistry) {
        registry
            .class::<Tracked>()
            .event_handler(CountingHooks::<Tracked>(PhantomData))
            .field("value", field!(Tracked, value));
    }
}

#[derive(Default, Debug)]
pub struct TrackedPair {
    pub first: Tracked,
    pub second: Tracked,
    pub loaded: u32,
    pub cloned: u32,
}

impl Counted for TrackedPair {
    fn counters(&mut self) -> (&mut u32, &mut u32) {
        (&mut self.loaded, &mut self.cloned)
    }
}

impl TypeUuid for TrackedPair {
    fn type_uuid() -> Uuid {
        Uuid::from_u128(0xD5A8_3F61_0C2E_47B9_A13D_59E0_C7F4_2B86)
    }

    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed("TrackedPair")
    }
}

impl Reflect for TrackedPair {
    fn reflect(registry: &mut TypeRegistry) {
        registry
            .class::<TrackedPair>()
            .event_handler(CountingHooks::<TrackedPair>(PhantomData))
            .field("first", field!(TrackedPair, first))
            .field("second", field!(TrackedPair, second));
    }
}

// -----------------------------------------------------------------------------
// Recursive tree

#[derive(Reflect, Default, Debug, PartialEq)]
#[reflect(uuid = "{5F0C8A3D-B271-4E96-8D4A-E13B69C207F5}")]
pub struct TreeNode {
    pub label: String,
    pub children: Vec<TreeNode>,
}

// -----------------------------------------------------------------------------
// Patch target

#[derive(Reflect, Default, Debug, PartialEq, Clone)]
#[reflect(uuid = "{2A7E9B04-C13F-4D86-9B5E-F08A36C1D72E}", auto_register)]
pub struct Catalog {
    pub title: String,
    pub counts: Vec<i32>,
    pub foo: Foo,
}
