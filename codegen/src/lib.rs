//! OpenCL kernel source generation for clarray.
//!
//! Every kernel the engine dispatches is produced here by a pure function of
//! the operation and element type, so sources and cache keys can be checked
//! without a device.
//!
//! # Usage
//!
//! ```ignore
//! use clarray_codegen::{UnaryOp, render_unary};
//! use clarray_dtype::ElemType;
//!
//! let kernel = render_unary(UnaryOp::Sqrt, ElemType::Complex64)?;
//! assert_eq!(kernel.key, "unary_op_sqrt_float2");
//! ```

pub mod error;
pub mod ops;
pub mod render;
pub mod templates;


pub use error::*;
pub use ops::{BinaryOp, UnaryOp};
pub use render::*;
