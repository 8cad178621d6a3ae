pub mod ext;
pub mod scalar;


pub use ext::HasElemType;
pub use scalar::Scalar;

/// Element types a device array can hold.
///
/// Discriminants are the host runtime's type codes. They appear verbatim in
/// custom kernel cache keys and in introspection output, so they are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray, strum::FromRepr)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum ElemType {
    Byte = 1,
    Int16 = 2,
    Int32 = 3,
    Float32 = 4,
    Float64 = 5,
    Complex64 = 6,
    Complex128 = 9,
    UInt16 = 12,
    UInt32 = 13,
    Int64 = 14,
    UInt64 = 15,
}

impl ElemType {
    /// Host type code.
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_repr(code)
    }

    /// Size of one element in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Complex64 => 8,
            Self::Complex128 => 16,
        }
    }

    /// OpenCL C spelling of the element type.
    pub const fn cl_name(self) -> &'static str {
        match self {
            Self::Byte => "uchar",
            Self::Int16 => "short",
            Self::Int32 => "int",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Complex64 => "float2",
            Self::Complex128 => "double2",
            Self::UInt16 => "ushort",
            Self::UInt32 => "uint",
            Self::Int64 => "long",
            Self::UInt64 => "ulong",
        }
    }

    /// Host runtime type name, as shown by introspection (`CL_FLOAT = ...`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "BYTE",
            Self::Int16 => "INT",
            Self::Int32 => "LONG",
            Self::Float32 => "FLOAT",
            Self::Float64 => "DOUBLE",
            Self::Complex64 => "COMPLEX",
            Self::Complex128 => "DCOMPLEX",
            Self::UInt16 => "UINT",
            Self::UInt32 => "ULONG",
            Self::Int64 => "LONG64",
            Self::UInt64 => "ULONG64",
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_int(self) -> bool {
        !self.is_float() && !self.is_complex()
    }

    /// Component type of a complex element, or the type itself.
    pub const fn base(self) -> Self {
        match self {
            Self::Complex64 => Self::Float32,
            Self::Complex128 => Self::Float64,
            other => other,
        }
    }

    /// Whether kernels over this type need the fp64 extension.
    pub const fn needs_fp64(self) -> bool {
        matches!(self, Self::Float64 | Self::Complex128)
    }
}

impl std::fmt::Display for ElemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
