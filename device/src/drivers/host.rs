//! Host reference driver.
//!
//! Buffers live in host memory and generated kernels are executed from their
//! [`KernelSpec`]. Caller-written OpenCL C cannot run here: custom kernels must
//! be registered as native functions under their entry point name, otherwise
//! building them fails like a device compiler would.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clarray_codegen::{KernelSpec, RenderedKernel};
use parking_lot::RwLock;
use snafu::OptionExt;

use super::interp;
use crate::buffer::DeviceBuffer;
use crate::driver::{Context, DeviceInfo, DeviceKind, Driver, ExecParams, KernelArg, PlatformInfo, Program};
use crate::error::{
    AllocationFailedSnafu, ArgumentMismatchSnafu, CompileFailedSnafu, Error, InvalidDeviceIndexSnafu,
    InvalidPlatformIndexSnafu, Result, SizeMismatchSnafu, status,
};

/// Native stand-in for a caller-written kernel.
pub type HostKernelFn = Arc<dyn Fn(&[KernelArg<'_>], &ExecParams) -> Result<()> + Send + Sync>;

#[derive(Debug, Default)]
struct Counters {
    contexts: AtomicUsize,
    compiles: AtomicUsize,
    launches: AtomicUsize,
}

/// Snapshot of driver activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub contexts_opened: usize,
    pub compiles: usize,
    pub launches: usize,
}

pub struct HostDriver {
    /// Device kinds per platform.
    topology: Vec<Vec<DeviceKind>>,
    counters: Arc<Counters>,
    natives: Arc<RwLock<HashMap<String, HostKernelFn>>>,
}

impl Default for HostDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HostDriver {
    /// One platform with one CPU device.
    pub fn new() -> Self {
        Self::with_topology(vec![vec![DeviceKind::Cpu]])
    }

    /// Platforms exposing the given device kinds.
    pub fn with_topology(topology: Vec<Vec<DeviceKind>>) -> Self {
        Self { topology, counters: Arc::default(), natives: Arc::default() }
    }

    /// Make custom kernels with this entry point buildable.
    pub fn register_kernel(&self, entry_point: impl Into<String>, kernel: HostKernelFn) {
        self.natives.write().insert(entry_point.into(), kernel);
    }

    pub fn stats(&self) -> HostStats {
        HostStats {
            contexts_opened: self.counters.contexts.load(Ordering::Relaxed),
            compiles: self.counters.compiles.load(Ordering::Relaxed),
            launches: self.counters.launches.load(Ordering::Relaxed),
        }
    }

    fn platform(&self, index: usize) -> Result<&[DeviceKind]> {
        let count = self.topology.len();
        self.topology.get(index).map(Vec::as_slice).context(InvalidPlatformIndexSnafu { index, count })
    }

    /// `(index within platform, kind)` of the devices `gpu_only` selects.
    fn matching(&self, platform: usize, gpu_only: bool) -> Result<Vec<(usize, DeviceKind)>> {
        let kinds = self.platform(platform)?;
        Ok(kinds.iter().copied().enumerate().filter(|(_, kind)| !gpu_only || *kind == DeviceKind::Gpu).collect())
    }
}

fn platform_info(index: usize) -> PlatformInfo {
    PlatformInfo {
        name: format!("clarray host {index}"),
        vendor: "clarray".into(),
        version: "OpenCL 1.2 host".into(),
        profile: "FULL_PROFILE".into(),
        extensions: "cl_khr_fp64".into(),
    }
}

fn device_info(platform: usize, device: usize, kind: DeviceKind) -> DeviceInfo {
    DeviceInfo {
        name: format!("host device {platform}.{device}"),
        vendor: "clarray".into(),
        vendor_id: 0,
        kind,
        extensions: "cl_khr_fp64".into(),
        profile: "FULL_PROFILE".into(),
        global_mem_size: 1 << 30,
        global_mem_cache_size: 1 << 20,
        address_bits: usize::BITS,
        available: true,
        compiler_available: true,
        endian_little: cfg!(target_endian = "little"),
        error_correction_support: false,
        device_version: "OpenCL 1.2 host".into(),
        driver_version: env!("CARGO_PKG_VERSION").into(),
    }
}

impl Driver for HostDriver {
    fn name(&self) -> &str {
        "HOST"
    }

    fn platforms(&self) -> Result<Vec<PlatformInfo>> {
        Ok((0..self.topology.len()).map(platform_info).collect())
    }

    fn devices(&self, platform: usize, gpu_only: bool) -> Result<Vec<DeviceInfo>> {
        let devices = self.matching(platform, gpu_only)?;
        Ok(devices.into_iter().map(|(device, kind)| device_info(platform, device, kind)).collect())
    }

    fn open(&self, platform: usize, device: usize, gpu_only: bool) -> Result<Arc<dyn Context>> {
        let devices = self.matching(platform, gpu_only)?;
        let count = devices.len();
        let (index, kind) = *devices.get(device).context(InvalidDeviceIndexSnafu { index: device, count })?;

        self.counters.contexts.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(HostContext {
            info: device_info(platform, index, kind),
            counters: Arc::clone(&self.counters),
            natives: Arc::clone(&self.natives),
        }))
    }
}

struct HostContext {
    info: DeviceInfo,
    counters: Arc<Counters>,
    natives: Arc<RwLock<HashMap<String, HostKernelFn>>>,
}

impl HostContext {
    /// Allocations beyond the advertised global memory fail like a device would.
    fn check_capacity(&self, bytes: usize) -> Result<()> {
        snafu::ensure!(
            (bytes as u64) <= self.info.global_mem_size,
            AllocationFailedSnafu { bytes, status: status::INVALID_BUFFER_SIZE }
        );
        Ok(())
    }
}

fn not_host(what: &'static str) -> Error {
    Error::Transfer { what, status: status::INVALID_MEM_OBJECT }
}

impl Context for HostContext {
    fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    fn alloc(&self, bytes: usize) -> Result<DeviceBuffer> {
        self.check_capacity(bytes)?;
        Ok(DeviceBuffer::host(bytes))
    }

    fn upload(&self, data: &[u8]) -> Result<DeviceBuffer> {
        self.check_capacity(data.len())?;
        Ok(DeviceBuffer::host_from(data.to_vec()))
    }

    fn view(&self, parent: &DeviceBuffer, offset: usize, size: usize) -> Result<DeviceBuffer> {
        parent.host_view(offset, size)?.ok_or_else(|| not_host("view"))
    }

    fn read(&self, src: &DeviceBuffer, dst: &mut [u8]) -> Result<()> {
        snafu::ensure!(dst.len() == src.size(), SizeMismatchSnafu { expected: src.size(), actual: dst.len() });
        let bytes = src.host_read().ok_or_else(|| not_host("read"))?;
        dst.copy_from_slice(&bytes);
        Ok(())
    }

    fn copy(&self, src: &DeviceBuffer, dst: &DeviceBuffer) -> Result<()> {
        snafu::ensure!(dst.size() == src.size(), SizeMismatchSnafu { expected: src.size(), actual: dst.size() });
        let bytes = src.host_read().ok_or_else(|| not_host("copy"))?;
        if dst.host_write(&bytes)? { Ok(()) } else { Err(not_host("copy")) }
    }

    fn build(&self, kernel: &RenderedKernel) -> Result<Box<dyn Program>> {
        let name = kernel.entry_point.clone();
        let body = match kernel.spec {
            KernelSpec::Custom { .. } => {
                let native = self.natives.read().get(&name).cloned();
                let log = format!("host driver has no native kernel registered for '{name}'");
                HostBody::Native(native.context(CompileFailedSnafu { name: name.as_str(), log })?)
            }
            KernelSpec::Unary { op, ty } if !op.supports(ty) => {
                let log = format!("no overload of '{}' for {}", op.real_fn(), ty.cl_name());
                return CompileFailedSnafu { name, log }.fail();
            }
            KernelSpec::Binary { op, ty } if !op.supports(ty) => {
                let log = format!("invalid operands to '{}' of type {}", op.real_expr(), ty.cl_name());
                return CompileFailedSnafu { name, log }.fail();
            }
            ref spec => HostBody::Spec(spec.clone()),
        };

        self.counters.compiles.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(kernel.name = %name, kernel.key = %kernel.key, "host kernel built");
        Ok(Box::new(HostProgram { name, body, counters: Arc::clone(&self.counters) }))
    }
}

enum HostBody {
    Spec(KernelSpec),
    Native(HostKernelFn),
}

struct HostProgram {
    name: String,
    body: HostBody,
    counters: Arc<Counters>,
}

impl Program for HostProgram {
    fn launch(&self, args: &[KernelArg<'_>], params: &ExecParams) -> Result<()> {
        if params.local_size == 0 || params.global_size % params.local_size != 0 {
            let reason = format!("global size {} is not a multiple of {}", params.global_size, params.local_size);
            return ArgumentMismatchSnafu { name: self.name.as_str(), reason }.fail();
        }

        self.counters.launches.fetch_add(1, Ordering::Relaxed);
        match &self.body {
            HostBody::Spec(spec) => interp::run(&self.name, spec, args, params),
            HostBody::Native(kernel) => kernel(args, params),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
