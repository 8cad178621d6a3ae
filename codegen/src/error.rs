//! Error types for kernel source generation.

use clarray_dtype::ElemType;
use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while rendering kernel source.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Operation has no kernel form for the element type.
    #[snafu(display("operation '{op}' is not supported for {ty} operands"))]
    UnsupportedType { op: String, ty: ElemType },

    /// Custom kernel parameter names and types differ in length.
    #[snafu(display("{names} parameter names given for {types} parameter types"))]
    ParameterMismatch { names: usize, types: usize },

    /// Custom kernel parameter name is not a valid OpenCL identifier.
    #[snafu(display("invalid parameter name '{name}'"))]
    InvalidParameterName { name: String },

    /// Full-source custom kernel without an entry point.
    #[snafu(display("custom kernel source requires an entry point name"))]
    MissingEntryPoint,
}
