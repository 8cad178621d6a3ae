//! Caller-written kernels.
//!
//! Simple kernels are an expression over `__global` array parameters, wrapped
//! into `custom_simple` with the element count `n` appended. Full kernels are
//! complete OpenCL C source with an explicit entry point.

use std::fmt;
use std::sync::Arc;

use clarray_codegen::{custom_full_key, custom_simple_key, render_custom_full, render_custom_simple};
use clarray_device::KernelArg;
use clarray_dtype::{ElemType, Scalar};
use snafu::ensure;

use crate::array::DeviceArray;
use crate::engine::Engine;
use crate::error::{
    ArgumentSnafu, IncorrectParamCountSnafu, IncorrectParamTypeSnafu, Result, StaleHandleSnafu,
};
use crate::kernel_cache::CachedKernel;

/// A compiled custom kernel.
#[derive(Debug, Clone)]
pub struct KernelHandle {
    kernel: Arc<CachedKernel>,
    simple: bool,
    /// Declared parameter types, checked on execution of simple kernels.
    param_types: Vec<ElemType>,
    generation: u64,
}

impl KernelHandle {
    pub fn is_simple(&self) -> bool {
        self.simple
    }

    /// Expression of a simple kernel, source of a full one.
    pub fn expression(&self) -> &str {
        &self.kernel.expression
    }

    pub fn entry_point(&self) -> &str {
        &self.kernel.entry_point
    }

    pub fn source(&self) -> &str {
        &self.kernel.source
    }

    pub fn param_types(&self) -> &[ElemType] {
        &self.param_types
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// One help line: the padded variable name followed by the expression.
    pub fn help_line(&self, name: &str) -> String {
        format!("{name:<16.16}{:<9.9} = '{}'", "CL_KERNEL", self.expression())
    }
}

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CL_KERNEL = '{}'", self.expression())
    }
}

/// Positional argument of [`Engine::execute`].
#[derive(Debug, Clone, Copy)]
pub enum KernelParam<'a> {
    Array(&'a DeviceArray),
    Scalar(Scalar),
}

impl<'a> From<&'a DeviceArray> for KernelParam<'a> {
    fn from(array: &'a DeviceArray) -> Self {
        Self::Array(array)
    }
}

impl From<Scalar> for KernelParam<'_> {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl Engine {
    /// Compile a custom kernel.
    ///
    /// With `simple`, `source` is an expression over the parameters named by
    /// `names` with element types `types`. Otherwise it is complete source and
    /// `entry_point` names the kernel function.
    pub fn compile(
        &mut self,
        source: &str,
        names: &[&str],
        types: &[ElemType],
        entry_point: Option<&str>,
        simple: bool,
    ) -> Result<KernelHandle> {
        if names.len() != types.len() {
            return Err(clarray_codegen::Error::ParameterMismatch { names: names.len(), types: types.len() }.into());
        }
        if simple {
            self.compile_simple(source, names, types)
        } else {
            let entry_point = entry_point.ok_or(clarray_codegen::Error::MissingEntryPoint)?;
            self.compile_full(source, entry_point)
        }
    }

    /// Compile `expression` as the body of a simple kernel.
    pub fn compile_simple(&mut self, expression: &str, names: &[&str], types: &[ElemType]) -> Result<KernelHandle> {
        let active = self.ensure_initialized()?;
        let key = custom_simple_key(expression, types);
        let kernel =
            self.kernel(&active, &key, Some(expression), || Ok(render_custom_simple(expression, names, types)?))?;
        Ok(KernelHandle { kernel, simple: true, param_types: types.to_vec(), generation: active.generation() })
    }

    /// Compile complete kernel source.
    pub fn compile_full(&mut self, source: &str, entry_point: &str) -> Result<KernelHandle> {
        let active = self.ensure_initialized()?;
        let key = custom_full_key(source);
        let kernel = self.kernel(&active, &key, Some(source), || Ok(render_custom_full(source, entry_point)?))?;
        Ok(KernelHandle { kernel, simple: false, param_types: Vec::new(), generation: active.generation() })
    }

    /// Bind `params` in order and run over the element count of the first
    /// array argument.
    pub fn execute(&mut self, kernel: &KernelHandle, params: &[KernelParam<'_>]) -> Result<()> {
        let active = self.ensure_initialized()?;
        ensure!(
            kernel.generation == active.generation(),
            StaleHandleSnafu { handle: kernel.generation, current: active.generation() }
        );
        if kernel.simple {
            ensure!(
                params.len() == kernel.param_types.len(),
                IncorrectParamCountSnafu { expected: kernel.param_types.len(), actual: params.len() }
            );
        }

        let mut args = Vec::with_capacity(params.len() + 1);
        let mut count = None;
        for (position, param) in params.iter().enumerate() {
            match *param {
                KernelParam::Array(array) => {
                    let (ty, buffer) = self.operand(&active, array)?;
                    if let Some(&declared) = kernel.param_types.get(position) {
                        ensure!(
                            declared == ty,
                            IncorrectParamTypeSnafu { position, reason: format!("declared {declared}, got {ty} array") }
                        );
                    }
                    count.get_or_insert(array.element_count());
                    args.push(KernelArg::Buffer(buffer));
                }
                KernelParam::Scalar(scalar) => {
                    ensure!(
                        !kernel.simple,
                        IncorrectParamTypeSnafu { position, reason: "simple kernels take only arrays" }
                    );
                    args.push(KernelArg::Scalar(scalar));
                }
            }
        }

        let Some(n) = count else {
            return ArgumentSnafu { reason: "kernel launch needs at least one array argument" }.fail();
        };
        if kernel.simple {
            Self::launch_counted(&kernel.kernel, &args, n)
        } else {
            Self::launch(&kernel.kernel, &args, n)
        }
    }
}
