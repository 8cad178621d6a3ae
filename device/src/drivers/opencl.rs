//! OpenCL driver backed by `opencl3`.

use std::ffi::c_void;
use std::sync::Arc;

use clarray_codegen::RenderedKernel;
use clarray_dtype::Scalar;
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context as ClContext;
use opencl3::device::{
    CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_DEFAULT, CL_DEVICE_TYPE_GPU,
    Device as ClDevice,
};
use opencl3::error_codes::ClError;
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer as ClBuffer, CL_MEM_COPY_HOST_PTR, CL_MEM_READ_WRITE};
use opencl3::platform::{Platform, get_platforms};
use opencl3::program::Program as ClProgram;
use opencl3::types::{CL_BLOCKING, cl_device_id};
use parking_lot::{Mutex, RwLock};
use snafu::OptionExt;

use crate::buffer::{DeviceBuffer, RawBuffer};
use crate::driver::{Context, DeviceInfo, DeviceKind, Driver, ExecParams, KernelArg, PlatformInfo, Program};
use crate::error::{
    CompileFailedSnafu, Error, InvalidDeviceIndexSnafu, InvalidPlatformIndexSnafu, Result, SizeMismatchSnafu, status,
};

/// `CL_DEVICE_NOT_FOUND`
const DEVICE_NOT_FOUND: i32 = -1;

fn query<T>(what: &str, result: std::result::Result<T, ClError>) -> Result<T> {
    result.map_err(|e| Error::DeviceQueryFailed { what: what.to_string(), status: e.0 })
}

#[derive(Debug, Default)]
pub struct OpenClDriver;

impl OpenClDriver {
    pub fn new() -> Self {
        Self
    }

    fn platform(&self, index: usize) -> Result<Platform> {
        let platforms = query("platforms", get_platforms())?;
        let count = platforms.len();
        platforms.into_iter().nth(index).context(InvalidPlatformIndexSnafu { index, count })
    }

    fn device_ids(&self, platform: usize, gpu_only: bool) -> Result<Vec<cl_device_id>> {
        let kind = if gpu_only { CL_DEVICE_TYPE_GPU } else { CL_DEVICE_TYPE_ALL };
        match self.platform(platform)?.get_devices(kind) {
            Ok(ids) => Ok(ids),
            Err(e) if e.0 == DEVICE_NOT_FOUND => Ok(Vec::new()),
            Err(e) => query("devices", Err(e)),
        }
    }
}

fn device_kind(device: &ClDevice) -> Result<DeviceKind> {
    let kind = query("device type", device.dev_type())?;
    Ok(if kind & CL_DEVICE_TYPE_GPU != 0 {
        DeviceKind::Gpu
    } else if kind & CL_DEVICE_TYPE_CPU != 0 {
        DeviceKind::Cpu
    } else if kind & CL_DEVICE_TYPE_ACCELERATOR != 0 {
        DeviceKind::Accelerator
    } else if kind & CL_DEVICE_TYPE_DEFAULT != 0 {
        DeviceKind::Default
    } else {
        DeviceKind::Other
    })
}

fn describe(device: &ClDevice) -> Result<DeviceInfo> {
    Ok(DeviceInfo {
        name: query("device name", device.name())?,
        vendor: query("device vendor", device.vendor())?,
        vendor_id: query("device vendor id", device.vendor_id())?,
        kind: device_kind(device)?,
        extensions: query("device extensions", device.extensions())?,
        profile: query("device profile", device.profile())?,
        global_mem_size: query("global memory size", device.global_mem_size())?,
        global_mem_cache_size: query("global memory cache size", device.global_mem_cache_size())?,
        address_bits: query("address bits", device.address_bits())?,
        available: query("device availability", device.available())?,
        compiler_available: query("compiler availability", device.compiler_available())?,
        endian_little: query("device endianness", device.endian_little())?,
        error_correction_support: query("error correction support", device.error_correction_support())?,
        device_version: query("device version", device.version())?,
        driver_version: query("driver version", device.driver_version())?,
    })
}

impl Driver for OpenClDriver {
    fn name(&self) -> &str {
        "OPENCL"
    }

    fn platforms(&self) -> Result<Vec<PlatformInfo>> {
        let platforms = query("platforms", get_platforms())?;
        platforms
            .iter()
            .map(|p| {
                Ok(PlatformInfo {
                    name: query("platform name", p.name())?,
                    vendor: query("platform vendor", p.vendor())?,
                    version: query("platform version", p.version())?,
                    profile: query("platform profile", p.profile())?,
                    extensions: query("platform extensions", p.extensions())?,
                })
            })
            .collect()
    }

    fn devices(&self, platform: usize, gpu_only: bool) -> Result<Vec<DeviceInfo>> {
        self.device_ids(platform, gpu_only)?.into_iter().map(|id| describe(&ClDevice::new(id))).collect()
    }

    fn open(&self, platform: usize, device: usize, gpu_only: bool) -> Result<Arc<dyn Context>> {
        let ids = self.device_ids(platform, gpu_only)?;
        let count = ids.len();
        let id = *ids.get(device).context(InvalidDeviceIndexSnafu { index: device, count })?;
        let cl_device = ClDevice::new(id);
        let info = describe(&cl_device)?;

        let context = query("context", ClContext::from_device(&cl_device))?;
        let queue = query("command queue", CommandQueue::create_default(&context, 0))?;

        tracing::debug!(device.name = %info.name, platform, device, "OpenCL context created");
        Ok(Arc::new(OpenClContext { queue: Arc::new(queue), context, info }))
    }
}

struct OpenClContext {
    queue: Arc<CommandQueue>,
    context: ClContext,
    info: DeviceInfo,
}

// SAFETY: OpenCL contexts and command queues are thread-safe objects; the
// wrappers only hold their handles.
unsafe impl Send for OpenClContext {}
unsafe impl Sync for OpenClContext {}

fn cl_buffer<'a>(buffer: &'a RawBuffer, what: &'static str) -> Result<&'a RwLock<ClBuffer<u8>>> {
    match buffer {
        RawBuffer::OpenCl { buffer, .. } => Ok(buffer),
        RawBuffer::Host { .. } => Err(Error::Transfer { what, status: status::INVALID_MEM_OBJECT }),
    }
}

fn wrap(buffer: ClBuffer<u8>, origin: usize, parent: Option<Arc<RawBuffer>>) -> RawBuffer {
    RawBuffer::OpenCl { buffer: RwLock::new(buffer), origin, parent }
}

impl Context for OpenClContext {
    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&self, bytes: usize) -> Result<DeviceBuffer> {
        let buffer = unsafe { ClBuffer::<u8>::create(&self.context, CL_MEM_READ_WRITE, bytes, std::ptr::null_mut()) }
            .map_err(|e| Error::AllocationFailed { bytes, status: e.0 })?;
        Ok(DeviceBuffer::new(wrap(buffer, 0, None), bytes))
    }

    fn upload(&self, data: &[u8]) -> Result<DeviceBuffer> {
        let bytes = data.len();
        // COPY_HOST_PTR only reads through the pointer.
        let host = data.as_ptr() as *mut c_void;
        let buffer =
            unsafe { ClBuffer::<u8>::create(&self.context, CL_MEM_READ_WRITE | CL_MEM_COPY_HOST_PTR, bytes, host) }
                .map_err(|e| Error::AllocationFailed { bytes, status: e.0 })?;
        Ok(DeviceBuffer::new(wrap(buffer, 0, None), bytes))
    }

    fn view(&self, parent: &DeviceBuffer, offset: usize, size: usize) -> Result<DeviceBuffer> {
        parent.check_view(offset, size)?;
        // Sub-buffers cannot nest, so views of views alias the root.
        let (root, base) = match parent.raw() {
            RawBuffer::OpenCl { origin, parent: Some(root), .. } => (Arc::clone(root), *origin),
            _ => (Arc::clone(parent.storage()), 0),
        };
        let origin = base + offset;
        let sub = unsafe { cl_buffer(&root, "view")?.read().create_sub_buffer(CL_MEM_READ_WRITE, origin, size) }
            .map_err(|e| Error::AllocationFailed { bytes: size, status: e.0 })?;
        Ok(DeviceBuffer::new_view(wrap(sub, origin, Some(root)), size))
    }

    fn read(&self, src: &DeviceBuffer, dst: &mut [u8]) -> Result<()> {
        snafu::ensure!(dst.len() == src.size(), SizeMismatchSnafu { expected: src.size(), actual: dst.len() });
        let buffer = cl_buffer(src.raw(), "read")?.read();
        unsafe { self.queue.enqueue_read_buffer(&buffer, CL_BLOCKING, 0, dst, &[]) }
            .map_err(|e| Error::Transfer { what: "read", status: e.0 })?;
        Ok(())
    }

    fn copy(&self, src: &DeviceBuffer, dst: &DeviceBuffer) -> Result<()> {
        snafu::ensure!(dst.size() == src.size(), SizeMismatchSnafu { expected: src.size(), actual: dst.size() });
        let source = cl_buffer(src.raw(), "copy")?.read();
        let mut target = cl_buffer(dst.raw(), "copy")?.write();
        unsafe { self.queue.enqueue_copy_buffer(&source, &mut target, 0, 0, src.size(), &[]) }
            .map_err(|e| Error::Transfer { what: "copy", status: e.0 })?;
        self.queue.finish().map_err(|e| Error::Transfer { what: "copy", status: e.0 })
    }

    fn build(&self, kernel: &RenderedKernel) -> Result<Box<dyn Program>> {
        let name = kernel.entry_point.as_str();
        let program = match ClProgram::create_and_build_from_source(&self.context, &kernel.source, "") {
            Ok(program) => program,
            Err(log) => {
                tracing::error!(kernel.name = %name, kernel.key = %kernel.key, "kernel build failed:\n{log}");
                return CompileFailedSnafu { name, log }.fail();
            }
        };
        let cl_kernel = Kernel::create(&program, name)
            .map_err(|e| Error::CompileFailed { name: name.to_string(), log: format!("clCreateKernel failed: {e}") })?;

        tracing::debug!(kernel.name = %name, kernel.key = %kernel.key, "OpenCL kernel built");
        Ok(Box::new(OpenClProgram {
            name: name.to_string(),
            kernel: Mutex::new(cl_kernel),
            _program: program,
            queue: Arc::clone(&self.queue),
        }))
    }
}

struct OpenClProgram {
    name: String,
    /// Argument binding mutates the kernel object.
    kernel: Mutex<Kernel>,
    _program: ClProgram,
    queue: Arc<CommandQueue>,
}

// SAFETY: kernel argument state is guarded by the mutex; programs and queues
// are thread-safe OpenCL objects.
unsafe impl Send for OpenClProgram {}
unsafe impl Sync for OpenClProgram {}

impl Program for OpenClProgram {
    fn launch(&self, args: &[KernelArg<'_>], params: &ExecParams) -> Result<()> {
        let kernel = self.kernel.lock();
        // Arguments may alias, so buffers are only ever read-locked here.
        let guards = args
            .iter()
            .filter_map(|arg| match arg {
                KernelArg::Buffer(buffer) => Some(cl_buffer(buffer.raw(), "launch").map(|b| b.read_recursive())),
                KernelArg::Scalar(_) => None,
            })
            .collect::<Result<Vec<_>>>()?;

        let mut exec = ExecuteKernel::new(&kernel);
        let mut buffers = guards.iter();
        unsafe {
            for arg in args {
                match arg {
                    KernelArg::Buffer(_) => {
                        if let Some(guard) = buffers.next() {
                            exec.set_arg(&**guard);
                        }
                    }
                    KernelArg::Scalar(scalar) => {
                        match scalar {
                            Scalar::Byte(v) => exec.set_arg(v),
                            Scalar::Int16(v) => exec.set_arg(v),
                            Scalar::Int32(v) => exec.set_arg(v),
                            Scalar::Float32(v) => exec.set_arg(v),
                            Scalar::Float64(v) => exec.set_arg(v),
                            Scalar::Complex64(v) => exec.set_arg(v),
                            Scalar::Complex128(v) => exec.set_arg(v),
                            Scalar::UInt16(v) => exec.set_arg(v),
                            Scalar::UInt32(v) => exec.set_arg(v),
                            Scalar::Int64(v) => exec.set_arg(v),
                            Scalar::UInt64(v) => exec.set_arg(v),
                        };
                    }
                }
            }
            exec.set_global_work_sizes(&[params.global_size])
                .set_local_work_sizes(&[params.local_size])
                .enqueue_nd_range(&self.queue)
                .map_err(|e| Error::Launch { name: self.name.clone(), status: e.0 })?;
        }
        self.queue.finish().map_err(|e| Error::Launch { name: self.name.clone(), status: e.0 })?;

        tracing::trace!(kernel.name = %self.name, global = params.global_size, "kernel finished");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
