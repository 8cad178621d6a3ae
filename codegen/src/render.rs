//! Pure kernel renderers: `(operation, type, expressions) -> source`.

use clarray_dtype::ElemType;
use snafu::ensure;

use crate::error::{
    InvalidParameterNameSnafu, MissingEntryPointSnafu, ParameterMismatchSnafu, Result, UnsupportedTypeSnafu,
};
use crate::ops::{BinaryOp, UnaryOp};
use crate::templates::{self, substitute};

/// Fill pattern of a construction kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Zero,
    Index,
}

impl FillMode {
    fn key_prefix(self) -> &'static str {
        match self {
            Self::Zero => "array_zero",
            Self::Index => "array_index",
        }
    }

    fn command(self, ty: ElemType) -> &'static str {
        match (self, ty.is_complex()) {
            (Self::Zero, false) => "result[i] = 0;",
            (Self::Zero, true) => "result[i].x = 0.0f; result[i].y = 0.0f;",
            (Self::Index, false) => "result[i] = i;",
            (Self::Index, true) => "result[i].x = i; result[i].y = 0.0f;",
        }
    }
}

/// Structured description of what a rendered kernel computes.
///
/// Drivers that compile source ignore it; the host driver executes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelSpec {
    Fill { ty: ElemType, mode: FillMode },
    Unary { op: UnaryOp, ty: ElemType },
    Binary { op: BinaryOp, ty: ElemType },
    Custom { simple: bool },
}

/// Kernel source ready for compilation, with its cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedKernel {
    pub key: String,
    pub entry_point: String,
    pub source: String,
    pub spec: KernelSpec,
}

fn fp64(ty: ElemType) -> &'static str {
    if ty.needs_fp64() { templates::FP64_PRAGMA } else { "" }
}

/// Key shared by construction kernels of one fill mode and element type.
pub fn fill_key(mode: FillMode, ty: ElemType) -> String {
    format!("{}_{}", mode.key_prefix(), ty.cl_name())
}

pub fn unary_key(op: UnaryOp, ty: ElemType) -> String {
    format!("unary_op_{}_{}", op.name(), ty.cl_name())
}

pub fn binary_key(op: BinaryOp, ty: ElemType) -> String {
    format!("binary_op_{}_{}", op.name(), ty.cl_name())
}

/// Key of a simple-mode custom kernel: two-digit type codes, then the body.
pub fn custom_simple_key(expression: &str, types: &[ElemType]) -> String {
    let codes: String = types.iter().map(|ty| format!("{:02}", ty.code())).collect();
    format!("custom_simple_{codes}{expression}")
}

pub fn custom_full_key(source: &str) -> String {
    format!("custom_full_{source}")
}

pub fn render_fill(mode: FillMode, ty: ElemType) -> RenderedKernel {
    let source = substitute(
        templates::ARRAY_INIT,
        &[("$FP64", fp64(ty)), ("$TYPE", ty.cl_name()), ("$COMMAND", mode.command(ty))],
    );
    RenderedKernel {
        key: fill_key(mode, ty),
        entry_point: "array_init".into(),
        source,
        spec: KernelSpec::Fill { ty, mode },
    }
}

pub fn render_unary(op: UnaryOp, ty: ElemType) -> Result<RenderedKernel> {
    ensure!(op.supports(ty), UnsupportedTypeSnafu { op: op.name(), ty });

    let source = match op.complex_forms() {
        Some((re, im)) if ty.is_complex() => substitute(
            templates::UNARY_COMPLEX,
            &[("$FP64", fp64(ty)), ("$TYPE", ty.cl_name()), ("$RE_EXPR", re), ("$IM_EXPR", im)],
        ),
        _ => substitute(templates::UNARY, &[("$FP64", fp64(ty)), ("$TYPE", ty.cl_name()), ("$OP", op.real_fn())]),
    };

    Ok(RenderedKernel {
        key: unary_key(op, ty),
        entry_point: "unary_op".into(),
        source,
        spec: KernelSpec::Unary { op, ty },
    })
}

pub fn render_binary(op: BinaryOp, ty: ElemType) -> Result<RenderedKernel> {
    ensure!(op.supports(ty), UnsupportedTypeSnafu { op: op.name(), ty });

    let source = if ty.is_complex() && !op.is_comparison() {
        let Some((re, im)) = op.complex_forms() else {
            return UnsupportedTypeSnafu { op: op.name(), ty }.fail();
        };
        substitute(
            templates::BINARY_COMPLEX,
            &[("$FP64", fp64(ty)), ("$TYPE", ty.cl_name()), ("$RE_EXPR", re), ("$IM_EXPR", im)],
        )
    } else {
        let expr = match op.complex_comparison() {
            Some(expr) if ty.is_complex() => expr,
            _ => op.real_expr(),
        };
        substitute(
            templates::BINARY,
            &[
                ("$FP64", fp64(ty)),
                ("$RESULT_TYPE", op.output_type(ty).cl_name()),
                ("$TYPE", ty.cl_name()),
                ("$EXPR", expr),
            ],
        )
    };

    Ok(RenderedKernel {
        key: binary_key(op, ty),
        entry_point: "binary_op".into(),
        source,
        spec: KernelSpec::Binary { op, ty },
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Wrap a bare expression into a kernel over `__global` array parameters.
///
/// The element count `n` is appended as the last parameter.
pub fn render_custom_simple(expression: &str, names: &[&str], types: &[ElemType]) -> Result<RenderedKernel> {
    ensure!(names.len() == types.len(), ParameterMismatchSnafu { names: names.len(), types: types.len() });
    if let Some(name) = names.iter().find(|name| !is_identifier(name)) {
        return InvalidParameterNameSnafu { name: *name }.fail();
    }

    let params: String =
        names.iter().zip(types).map(|(name, ty)| format!("__global {} *{name}, ", ty.cl_name())).collect();
    let pragma = if types.iter().any(|ty| ty.needs_fp64()) { templates::FP64_PRAGMA } else { "" };
    let source =
        substitute(templates::CUSTOM_SIMPLE, &[("$FP64", pragma), ("$PARAMS", &params), ("$BODY", expression)]);

    Ok(RenderedKernel {
        key: custom_simple_key(expression, types),
        entry_point: "custom_simple".into(),
        source,
        spec: KernelSpec::Custom { simple: true },
    })
}

/// Take complete caller-written source with an explicit entry point.
pub fn render_custom_full(source: &str, entry_point: &str) -> Result<RenderedKernel> {
    ensure!(!entry_point.is_empty(), MissingEntryPointSnafu);

    Ok(RenderedKernel {
        key: custom_full_key(source),
        entry_point: entry_point.to_string(),
        source: source.to_string(),
        spec: KernelSpec::Custom { simple: false },
    })
}
