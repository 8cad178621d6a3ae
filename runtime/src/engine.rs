//! Device array engine.
//!
//! An [`Engine`] owns one device [`Session`] and the [`KernelCache`] of its
//! current generation. Every operation lazily initializes the session,
//! checks its operands belong to the current generation, fetches or compiles
//! the kernel it needs and blocks until the device finishes.

use std::sync::Arc;

use clarray_codegen::{FillMode, RenderedKernel, fill_key, render_fill};
use clarray_device::{
    ActiveSession, DeviceBuffer, DeviceInfo, Driver, ExecParams, HostDriver, InitOptions, KernelArg, PlatformInfo,
    Session, SessionConfig,
};
use clarray_dtype::{ElemType, Scalar};
use snafu::ensure;

use crate::array::{ArrayInfo, DeviceArray, validate_layout, validate_shape};
use crate::error::{ArgumentSnafu, Error, Result, ShapeMismatchSnafu, StaleHandleSnafu};
use crate::host::HostArray;
use crate::kernel_cache::{CachedKernel, KernelCache};

/// Initial contents of a constructed array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum InitMode {
    #[default]
    Zero,
    /// Each element holds its linear index, real part only for complex types.
    Index,
    /// Indeterminate contents.
    Uninitialized,
}

pub struct Engine {
    session: Session,
    cache: KernelCache,
}

impl Engine {
    pub fn new(driver: Arc<dyn Driver>, config: SessionConfig) -> Self {
        Self { session: Session::new(driver, config), cache: KernelCache::new() }
    }

    /// Engine on the host reference driver.
    pub fn host() -> Self {
        Self::new(Arc::new(HostDriver::new()), SessionConfig::from_env())
    }

    /// Engine on the OpenCL driver when built with `opencl`, the host driver otherwise.
    pub fn from_env() -> Self {
        #[cfg(feature = "opencl")]
        let driver: Arc<dyn Driver> = Arc::new(clarray_device::OpenClDriver::new());
        #[cfg(not(feature = "opencl"))]
        let driver: Arc<dyn Driver> = Arc::new(HostDriver::new());
        Self::new(driver, SessionConfig::from_env())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Open the default device unless a session is active.
    pub fn ensure_initialized(&mut self) -> Result<ActiveSession> {
        let active = self.session.ensure_initialized()?;
        self.cache.sync_generation(active.generation());
        Ok(active)
    }

    /// Select a device explicitly. On success the previous context and every
    /// cached kernel are released; arrays from it become stale.
    pub fn initialize(&mut self, options: InitOptions) -> Result<ActiveSession> {
        let active = self.session.initialize(options)?;
        self.cache.clear(|key, _| tracing::trace!(kernel.key = %key, "releasing kernel"));
        self.cache.sync_generation(active.generation());
        Ok(active)
    }

    /// Release the context and all cached kernels.
    pub fn shutdown(&mut self) -> bool {
        self.cache.clear(|key, _| tracing::trace!(kernel.key = %key, "releasing kernel"));
        self.session.shutdown()
    }

    pub fn current_device_info(&self) -> Option<DeviceInfo> {
        self.session.current_device_info()
    }

    pub fn list_platforms(&self) -> Result<Vec<PlatformInfo>> {
        Ok(self.session.list_platforms()?)
    }

    pub fn list_devices(&self, platform: usize, gpu_only: bool) -> Result<Vec<DeviceInfo>> {
        Ok(self.session.list_devices(platform, gpu_only)?)
    }

    // ------------------------------------------------------------------
    // Shared plumbing
    // ------------------------------------------------------------------

    /// Element type and buffer of `array`, which must be live and current.
    pub(crate) fn operand<'a>(
        &self,
        active: &ActiveSession,
        array: &'a DeviceArray,
    ) -> Result<(ElemType, &'a DeviceBuffer)> {
        let parts = array.parts()?;
        ensure!(
            array.generation() == active.generation(),
            StaleHandleSnafu { handle: array.generation(), current: active.generation() }
        );
        Ok(parts)
    }

    pub(crate) fn allocate(&self, active: &ActiveSession, ty: ElemType, dims: &[usize]) -> Result<DeviceArray> {
        let (shape, bytes) = validate_layout(dims, ty)?;
        let buffer = active.context().alloc(bytes)?;
        Ok(DeviceArray::new(ty, shape, buffer, active.generation()))
    }

    /// Cached kernel under `key`, rendering and building it on a miss.
    pub(crate) fn kernel(
        &mut self,
        active: &ActiveSession,
        key: &str,
        expression: Option<&str>,
        render: impl FnOnce() -> Result<RenderedKernel>,
    ) -> Result<Arc<CachedKernel>> {
        self.cache.get_or_compile(key, || {
            let rendered = render()?;
            let program = active.context().build(&rendered)?;
            Ok::<_, Error>(CachedKernel {
                program,
                expression: expression.map_or_else(|| rendered.source.clone(), str::to_string),
                entry_point: rendered.entry_point,
                source: rendered.source,
            })
        })
    }

    /// Launch `kernel` over `n` work items with the element count appended.
    pub(crate) fn launch_counted(kernel: &CachedKernel, args: &[KernelArg<'_>], n: usize) -> Result<()> {
        let count = u32::try_from(n)
            .map_err(|_| ArgumentSnafu { reason: format!("{n} elements exceed the 32-bit element count") }.build())?;
        let mut args = args.to_vec();
        args.push(KernelArg::Scalar(Scalar::UInt32(count)));
        Self::launch(kernel, &args, n)
    }

    pub(crate) fn launch(kernel: &CachedKernel, args: &[KernelArg<'_>], n: usize) -> Result<()> {
        tracing::trace!(kernel.name = %kernel.entry_point, n, "enqueue");
        kernel.program.launch(args, &ExecParams::new_1d(n))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Allocate an array of `dims` and fill it according to `init`.
    pub fn construct(&mut self, ty: ElemType, dims: &[usize], init: InitMode) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let array = self.allocate(&active, ty, dims)?;

        let mode = match init {
            InitMode::Zero => FillMode::Zero,
            InitMode::Index => FillMode::Index,
            InitMode::Uninitialized => return Ok(array),
        };
        let kernel = self.kernel(&active, &fill_key(mode, ty), None, || Ok(render_fill(mode, ty)))?;
        let (_, buffer) = array.parts()?;
        Self::launch_counted(&kernel, &[KernelArg::Buffer(buffer)], array.element_count())?;
        Ok(array)
    }

    /// Copy a host array to a new device array.
    pub fn upload(&mut self, host: &HostArray) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let buffer = active.context().upload(host.as_bytes())?;
        let shape = validate_shape(host.shape())?;
        Ok(DeviceArray::new(host.elem_type(), shape, buffer, active.generation()))
    }

    /// Blocking read of the whole array.
    pub fn download(&mut self, array: &DeviceArray) -> Result<HostArray> {
        let active = self.ensure_initialized()?;
        let (ty, buffer) = self.operand(&active, array)?;
        let mut data = vec![0; buffer.size()];
        active.context().read(buffer, &mut data)?;
        HostArray::from_bytes(ty, array.shape(), data)
    }

    /// Give `array` a new shape with the same element count.
    ///
    /// With `overwrite` the handle itself is reshaped and a handle sharing its
    /// buffer is returned. Otherwise `array` is left untouched and the data is
    /// copied into a new array.
    pub fn reshape(&mut self, array: &mut DeviceArray, dims: &[usize], overwrite: bool) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let (ty, buffer) = self.operand(&active, array)?;
        let shape = validate_shape(dims)?;
        let actual = shape.iter().product::<usize>();
        ensure!(actual == array.element_count(), ShapeMismatchSnafu { expected: array.element_count(), actual });

        if overwrite {
            array.set_shape(shape);
            return Ok(array.clone());
        }

        let copy = self.allocate(&active, ty, &shape)?;
        let (_, target) = copy.parts()?;
        active.context().copy(buffer, target)?;
        Ok(copy)
    }

    /// One-dimensional view of `length` elements starting at element `offset`.
    pub fn view(&mut self, array: &DeviceArray, offset: usize, length: usize) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let (ty, buffer) = self.operand(&active, array)?;
        let shape = validate_shape(&[length])?;
        let count = array.element_count();
        if offset.checked_add(length).is_none_or(|end| end > count) {
            return Err(clarray_device::Error::InvalidView { offset, size: length, buffer_size: count }.into());
        }

        let size = ty.bytes();
        let alias = active.context().view(buffer, offset * size, length * size)?;
        Ok(DeviceArray::new(ty, shape, alias, active.generation()))
    }

    /// Release `array`. Returns whether it was live.
    ///
    /// Views drop only their own reference, so the parent stays readable.
    pub fn release(&mut self, array: &mut DeviceArray) -> bool {
        let view = array.is_view();
        let live = array.retire();
        if live {
            tracing::trace!(view, "array released");
        }
        live
    }

    /// Release every handle, returning how many were live.
    pub fn release_all(&mut self, arrays: &mut [DeviceArray]) -> usize {
        arrays.iter_mut().map(|array| self.release(array)).filter(|&live| live).count()
    }

    pub fn describe(&self, array: &DeviceArray) -> Result<ArrayInfo> {
        array.describe()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("session", &self.session).field("cache", &self.cache).finish()
    }
}

/// Global engine instance, created from the environment on first use.
static ENGINE: once_cell::sync::Lazy<parking_lot::Mutex<Engine>> =
    once_cell::sync::Lazy::new(|| parking_lot::Mutex::new(Engine::from_env()));

/// Get access to the global engine.
pub fn global_engine() -> parking_lot::MutexGuard<'static, Engine> {
    ENGINE.lock()
}
