use alloc::borrow::Cow;
use alloc::string::String;

use uuid::Uuid;

use crate::reflection::{Reflect, TypeUuid};
use crate::registry::TypeRegistry;
use crate::serializer::PrimitiveSerializer;

macro_rules! impl_primitive {
    ($($ty:ty => $name:literal, $uuid:literal;)*) => {$(
        impl TypeUuid for $ty {
            #[inline]
            fn type_uuid() -> Uuid {
                Uuid::from_u128($uuid)
            }

            #[inline]
            fn type_name() -> Cow<'static, str> {
                Cow::Borrowed($name)
            }
        }

        impl Reflect for $ty {
            fn reflect(registry: &mut TypeRegistry) {
                registry
                    .class::<$ty>()
                    .serializer(PrimitiveSerializer::<$ty>::new());
            }
        }
    )*};
}

impl_primitive! {
    bool => "bool", 0xA0CA880C_AFE4_43CB_926C_59AC48496112;
    char => "char", 0x3AB0037F_AF8D_48CE_BCA0_A170D18B2C03;
    i8 => "i8", 0x58422C0E_1E47_4854_98E6_34098F6FE12D;
    i16 => "i16", 0xB8A56D56_A10D_4DCE_9F63_405EE243DD3C;
    i32 => "i32", 0x72039442_EB38_4D42_A1AD_CB68F7E0EEF6;
    i64 => "i64", 0x70D8A282_A1EA_462D_9D04_51EDE81FAC2F;
    u8 => "u8", 0x72B9409A_7D1A_4831_9CFE_FCB3FADD3426;
    u16 => "u16", 0xECA0B403_C4F8_4B86_95FC_81688D046E40;
    u32 => "u32", 0x43DA906B_7DEF_4CA8_9790_854106D3F983;
    u64 => "u64", 0xD6597933_47CD_4FC8_B911_63F3E2B0993A;
    f32 => "f32", 0xEA2C3E90_AFBE_44D4_A90D_FAAF79BAF93D;
    f64 => "f64", 0x110C4B14_11A8_4E9D_8638_5051013A56AC;
    String => "String", 0x03AAAB3F_5C47_5A66_9EBC_D5FA4DB353C9;
    Uuid => "Uuid", 0xE152C105_A133_4D03_BBF8_3D4B2FBA3E2A;
}

/// Registers every leaf type above.
pub(crate) fn reflect_primitives(registry: &mut TypeRegistry) {
    registry
        .reflect::<bool>()
        .reflect::<char>()
        .reflect::<i8>()
        .reflect::<i16>()
        .reflect::<i32>()
        .reflect::<i64>()
        .reflect::<u8>()
        .reflect::<u16>()
        .reflect::<u32>()
        .reflect::<u64>()
        .reflect::<f32>()
        .reflect::<f64>()
        .reflect::<String>()
        .reflect::<Uuid>();
}
