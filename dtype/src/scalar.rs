use num_complex::{Complex32, Complex64};

use crate::ElemType;

/// A single host value of one of the supported element types.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Float32(f32),
    Float64(f64),
    Complex64(Complex32),
    Complex128(Complex64),
    UInt16(u16),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
}

impl Scalar {
    pub const fn elem_type(&self) -> ElemType {
        match self {
            Self::Byte(_) => ElemType::Byte,
            Self::Int16(_) => ElemType::Int16,
            Self::Int32(_) => ElemType::Int32,
            Self::Float32(_) => ElemType::Float32,
            Self::Float64(_) => ElemType::Float64,
            Self::Complex64(_) => ElemType::Complex64,
            Self::Complex128(_) => ElemType::Complex128,
            Self::UInt16(_) => ElemType::UInt16,
            Self::UInt32(_) => ElemType::UInt32,
            Self::Int64(_) => ElemType::Int64,
            Self::UInt64(_) => ElemType::UInt64,
        }
    }

    /// Native-endian bytes of the value, as a kernel argument expects them.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Byte(v) => bytemuck::bytes_of(v),
            Self::Int16(v) => bytemuck::bytes_of(v),
            Self::Int32(v) => bytemuck::bytes_of(v),
            Self::Float32(v) => bytemuck::bytes_of(v),
            Self::Float64(v) => bytemuck::bytes_of(v),
            Self::Complex64(v) => bytemuck::bytes_of(v),
            Self::Complex128(v) => bytemuck::bytes_of(v),
            Self::UInt16(v) => bytemuck::bytes_of(v),
            Self::UInt32(v) => bytemuck::bytes_of(v),
            Self::Int64(v) => bytemuck::bytes_of(v),
            Self::UInt64(v) => bytemuck::bytes_of(v),
        }
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for Scalar {
            fn from(value: $ty) -> Self { Scalar::$variant(value) }
        })*
    };
}

impl_scalar_from! {
    u8 => Byte, i16 => Int16, i32 => Int32, i64 => Int64,
    u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64,
    Complex32 => Complex64, Complex64 => Complex128,
}
