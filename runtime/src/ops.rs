//! Elementwise unary and binary dispatch.

use clarray_codegen::{BinaryOp, UnaryOp, binary_key, render_binary, render_unary, unary_key};
use clarray_device::{ActiveSession, KernelArg};
use clarray_dtype::ElemType;
use snafu::ensure;

use crate::array::DeviceArray;
use crate::engine::Engine;
use crate::error::{Result, ShapeMismatchSnafu, TypeMismatchSnafu};

impl Engine {
    /// `output[i] = op(input[i])`.
    ///
    /// Without `output` a new array of the input's shape and type is allocated.
    pub fn apply_unary(
        &mut self,
        op: UnaryOp,
        input: &DeviceArray,
        output: Option<DeviceArray>,
    ) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let (ty, source) = self.operand(&active, input)?;
        let output = self.resolve_output(&active, output, ty, input)?;

        let kernel = self.kernel(&active, &unary_key(op, ty), None, || Ok(render_unary(op, ty)?))?;
        let (_, target) = output.parts()?;
        Self::launch_counted(&kernel, &[KernelArg::Buffer(source), KernelArg::Buffer(target)], input.element_count())?;
        Ok(output)
    }

    /// `output[i] = lhs[i] op rhs[i]`.
    ///
    /// Operands must have the same element type and count. Comparisons write
    /// byte arrays; every other operation keeps the operand type.
    pub fn apply_binary(
        &mut self,
        op: BinaryOp,
        lhs: &DeviceArray,
        rhs: &DeviceArray,
        output: Option<DeviceArray>,
    ) -> Result<DeviceArray> {
        let active = self.ensure_initialized()?;
        let (ty, x) = self.operand(&active, lhs)?;
        let (rhs_ty, y) = self.operand(&active, rhs)?;
        ensure!(ty == rhs_ty, TypeMismatchSnafu { lhs: ty, rhs: rhs_ty });
        ensure!(
            lhs.element_count() == rhs.element_count(),
            ShapeMismatchSnafu { expected: lhs.element_count(), actual: rhs.element_count() }
        );
        let output = self.resolve_output(&active, output, op.output_type(ty), lhs)?;

        let kernel = self.kernel(&active, &binary_key(op, ty), None, || Ok(render_binary(op, ty)?))?;
        let (_, z) = output.parts()?;
        let args = [KernelArg::Buffer(x), KernelArg::Buffer(y), KernelArg::Buffer(z)];
        Self::launch_counted(&kernel, &args, lhs.element_count())?;
        Ok(output)
    }

    /// Caller-supplied output checked against `ty` and the element count of
    /// `like`, or a new uninitialized array shaped like it.
    fn resolve_output(
        &self,
        active: &ActiveSession,
        output: Option<DeviceArray>,
        ty: ElemType,
        like: &DeviceArray,
    ) -> Result<DeviceArray> {
        let Some(output) = output else {
            return self.allocate(active, ty, like.shape());
        };
        let (out_ty, _) = self.operand(active, &output)?;
        ensure!(out_ty == ty, TypeMismatchSnafu { lhs: ty, rhs: out_ty });
        ensure!(
            output.element_count() == like.element_count(),
            ShapeMismatchSnafu { expected: like.element_count(), actual: output.element_count() }
        );
        Ok(output)
    }
}
