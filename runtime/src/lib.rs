//! Device array engine for clarray.
//!
//! The [`Engine`] keeps device-resident arrays, compiles elementwise kernels
//! on first use and caches them per device session.
//!
//! # Usage
//!
//! ```ignore
//! use clarray_runtime::{Engine, HostArray, InitMode, UnaryOp};
//! use clarray_dtype::ElemType;
//!
//! let mut engine = Engine::host();
//! let x = engine.construct(ElemType::Float32, &[4, 5], InitMode::Index)?;
//! let y = engine.apply_unary(UnaryOp::Sqrt, &x, None)?;
//! let values = engine.download(&y)?.to_vec::<f32>()?;
//! ```

pub mod array;
pub mod catalog;
pub mod custom;
pub mod engine;
pub mod error;
pub mod host;
pub mod kernel_cache;
pub mod ops;

#[cfg(test)]
pub mod test;

pub use array::{ArrayInfo, DeviceArray, MAX_RANK, Shape};
pub use catalog::{CONSTRUCTORS, EntryPoint, resolve};
pub use clarray_codegen::{BinaryOp, UnaryOp};
pub use clarray_device::{DeviceInfo, DeviceKind, HostDriver, InitOptions, PlatformInfo, SessionConfig};
pub use custom::{KernelHandle, KernelParam};
pub use engine::{Engine, InitMode, global_engine};
pub use error::*;
pub use host::HostArray;
pub use kernel_cache::{CacheStats, CachedKernel, KernelCache};
