pub mod host;
mod interp;
#[cfg(feature = "opencl")]
pub mod opencl;

pub use host::{HostDriver, HostKernelFn, HostStats};
#[cfg(feature = "opencl")]
pub use opencl::OpenClDriver;
