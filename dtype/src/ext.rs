use num_complex::{Complex32, Complex64};

use super::*;

/// Host types that map one-to-one onto a device element type.
pub trait HasElemType: bytemuck::Pod {
    const ELEM_TYPE: ElemType;
}

macro_rules! impl_elem_type_ext {
    ($($ty:ty => $elem:expr),* $(,)?) => {
        $(impl HasElemType for $ty { const ELEM_TYPE: ElemType = $elem; })*
    };
}

impl_elem_type_ext! {
    u8 => ElemType::Byte,
    i16 => ElemType::Int16, i32 => ElemType::Int32, i64 => ElemType::Int64,
    u16 => ElemType::UInt16, u32 => ElemType::UInt32, u64 => ElemType::UInt64,
    f32 => ElemType::Float32, f64 => ElemType::Float64,
    Complex32 => ElemType::Complex64, Complex64 => ElemType::Complex128,
}
