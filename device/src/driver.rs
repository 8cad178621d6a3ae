//! Driver abstraction.
//!
//! A [`Driver`] enumerates platforms and devices and opens a [`Context`] on
//! one device. A context owns the command queue: it allocates and transfers
//! buffers and builds rendered kernels into [`Program`]s. Every call that
//! enqueues device work blocks until the queue drains.

use std::sync::Arc;

use clarray_codegen::RenderedKernel;
use clarray_dtype::Scalar;

use crate::buffer::DeviceBuffer;
use crate::error::Result;

/// Class of a compute device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum DeviceKind {
    #[strum(to_string = "CL_DEVICE_TYPE_CPU")]
    Cpu,
    #[strum(to_string = "CL_DEVICE_TYPE_GPU")]
    Gpu,
    #[strum(to_string = "CL_DEVICE_TYPE_ACCELERATOR")]
    Accelerator,
    #[strum(to_string = "CL_DEVICE_TYPE_DEFAULT")]
    Default,
    #[strum(to_string = "CL_DEVICE_TYPE_ALL")]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub profile: String,
    pub extensions: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub vendor_id: u32,
    pub kind: DeviceKind,
    pub extensions: String,
    pub profile: String,
    pub global_mem_size: u64,
    pub global_mem_cache_size: u64,
    pub address_bits: u32,
    pub available: bool,
    pub compiler_available: bool,
    pub endian_little: bool,
    pub error_correction_support: bool,
    pub device_version: String,
    pub driver_version: String,
}

/// Positional kernel argument.
#[derive(Debug, Clone, Copy)]
pub enum KernelArg<'a> {
    Buffer(&'a DeviceBuffer),
    Scalar(Scalar),
}

/// 1-D launch geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecParams {
    pub global_size: usize,
    pub local_size: usize,
}

impl ExecParams {
    pub const LOCAL_SIZE: usize = 64;

    /// Work-groups of [`Self::LOCAL_SIZE`] covering `n` items.
    pub fn new_1d(n: usize) -> Self {
        Self { global_size: n.div_ceil(Self::LOCAL_SIZE) * Self::LOCAL_SIZE, local_size: Self::LOCAL_SIZE }
    }
}

/// A built kernel, ready to launch.
pub trait Program: Send + Sync {
    /// Bind `args` in order, enqueue over `params` and wait for completion.
    fn launch(&self, args: &[KernelArg<'_>], params: &ExecParams) -> Result<()>;

    /// Entry point name.
    fn name(&self) -> &str;
}

/// An execution context and its command queue on one device.
pub trait Context: Send + Sync {
    fn device_info(&self) -> &DeviceInfo;

    /// Uninitialized allocation of `bytes`.
    fn alloc(&self, bytes: usize) -> Result<DeviceBuffer>;

    /// Allocation initialized from host memory.
    fn upload(&self, data: &[u8]) -> Result<DeviceBuffer>;

    /// Non-owning alias of `size` bytes at byte `offset` of `parent`.
    fn view(&self, parent: &DeviceBuffer, offset: usize, size: usize) -> Result<DeviceBuffer>;

    /// Blocking read of the whole buffer into `dst`.
    fn read(&self, src: &DeviceBuffer, dst: &mut [u8]) -> Result<()>;

    /// Blocking device-to-device copy of the whole of `src`.
    fn copy(&self, src: &DeviceBuffer, dst: &DeviceBuffer) -> Result<()>;

    /// Compile `kernel`, reporting the build log on failure.
    fn build(&self, kernel: &RenderedKernel) -> Result<Box<dyn Program>>;
}

/// Entry point to a compute backend.
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn platforms(&self) -> Result<Vec<PlatformInfo>>;

    /// Devices of `platform`, restricted to GPUs when `gpu_only`.
    fn devices(&self, platform: usize, gpu_only: bool) -> Result<Vec<DeviceInfo>>;

    /// Open a context on the `device`-th entry of `devices(platform, gpu_only)`.
    fn open(&self, platform: usize, device: usize, gpu_only: bool) -> Result<Arc<dyn Context>>;
}
