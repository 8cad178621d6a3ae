//! Device layer for clarray.
//!
//! A [`Session`] owns the single active [`Context`] opened through a
//! [`Driver`]. Two drivers ship with the crate:
//!
//! - [`HostDriver`]: host memory and a reference interpreter for generated
//!   kernels, always available.
//! - `OpenClDriver`: real devices through `opencl3`, behind the `opencl`
//!   feature.

pub mod buffer;
pub mod config;
pub mod driver;
pub mod drivers;
pub mod error;
pub mod session;


pub use buffer::{DeviceBuffer, RawBuffer};
pub use config::{InitOptions, SessionConfig};
pub use driver::{Context, DeviceInfo, DeviceKind, Driver, ExecParams, KernelArg, PlatformInfo, Program};
#[cfg(feature = "opencl")]
pub use drivers::OpenClDriver;
pub use drivers::{HostDriver, HostKernelFn, HostStats};
pub use error::{Error, Result};
pub use session::{ActiveSession, Session, SessionState};
