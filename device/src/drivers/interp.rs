//! Elementwise execution of rendered kernels on host memory.
//!
//! Each kernel is evaluated from its [`KernelSpec`] with the same formulas the
//! OpenCL templates carry. Values are widened to 64 bits, computed, then
//! narrowed on store with C conversion semantics.

use std::f64::consts::{LN_2, LN_10};

use clarray_codegen::{BinaryOp, FillMode, KernelSpec, UnaryOp};
use clarray_dtype::{ElemType, Scalar};
use num_complex::{Complex, Complex32, Complex64};

use crate::driver::{ExecParams, KernelArg};
use crate::error::{ArgumentMismatchSnafu, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
}

impl Value {
    fn as_i64(self) -> i64 {
        match self {
            Self::Int(v) => v,
            Self::UInt(v) => v as i64,
            Self::Float(v) => v as i64,
            Self::Complex(v) => v.re as i64,
        }
    }

    fn as_u64(self) -> u64 {
        match self {
            Self::Int(v) => v as u64,
            Self::UInt(v) => v,
            Self::Float(v) => v as u64,
            Self::Complex(v) => v.re as u64,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::UInt(v) => v as f64,
            Self::Float(v) => v,
            Self::Complex(v) => v.re,
        }
    }

    fn as_complex(self) -> Complex64 {
        match self {
            Self::Complex(v) => v,
            other => Complex::new(other.as_f64(), 0.0),
        }
    }

    fn from_bool(b: bool) -> Self {
        Self::UInt(b as u64)
    }
}

fn load(ty: ElemType, bytes: &[u8], index: usize) -> Value {
    let size = ty.bytes();
    let slot = &bytes[index * size..(index + 1) * size];
    match ty {
        ElemType::Byte => Value::UInt(slot[0] as u64),
        ElemType::Int16 => Value::Int(bytemuck::pod_read_unaligned::<i16>(slot) as i64),
        ElemType::Int32 => Value::Int(bytemuck::pod_read_unaligned::<i32>(slot) as i64),
        ElemType::Int64 => Value::Int(bytemuck::pod_read_unaligned::<i64>(slot)),
        ElemType::UInt16 => Value::UInt(bytemuck::pod_read_unaligned::<u16>(slot) as u64),
        ElemType::UInt32 => Value::UInt(bytemuck::pod_read_unaligned::<u32>(slot) as u64),
        ElemType::UInt64 => Value::UInt(bytemuck::pod_read_unaligned::<u64>(slot)),
        ElemType::Float32 => Value::Float(bytemuck::pod_read_unaligned::<f32>(slot) as f64),
        ElemType::Float64 => Value::Float(bytemuck::pod_read_unaligned::<f64>(slot)),
        ElemType::Complex64 => {
            let c = bytemuck::pod_read_unaligned::<Complex32>(slot);
            Value::Complex(Complex::new(c.re as f64, c.im as f64))
        }
        ElemType::Complex128 => Value::Complex(bytemuck::pod_read_unaligned::<Complex64>(slot)),
    }
}

fn store(ty: ElemType, bytes: &mut [u8], index: usize, value: Value) {
    let size = ty.bytes();
    let slot = &mut bytes[index * size..(index + 1) * size];
    match ty {
        ElemType::Byte => slot[0] = value.as_u64() as u8,
        ElemType::Int16 => slot.copy_from_slice(bytemuck::bytes_of(&(value.as_i64() as i16))),
        ElemType::Int32 => slot.copy_from_slice(bytemuck::bytes_of(&(value.as_i64() as i32))),
        ElemType::Int64 => slot.copy_from_slice(bytemuck::bytes_of(&value.as_i64())),
        ElemType::UInt16 => slot.copy_from_slice(bytemuck::bytes_of(&(value.as_u64() as u16))),
        ElemType::UInt32 => slot.copy_from_slice(bytemuck::bytes_of(&(value.as_u64() as u32))),
        ElemType::UInt64 => slot.copy_from_slice(bytemuck::bytes_of(&value.as_u64())),
        ElemType::Float32 => slot.copy_from_slice(bytemuck::bytes_of(&(value.as_f64() as f32))),
        ElemType::Float64 => slot.copy_from_slice(bytemuck::bytes_of(&value.as_f64())),
        ElemType::Complex64 => {
            let c = value.as_complex();
            slot.copy_from_slice(bytemuck::bytes_of(&Complex32::new(c.re as f32, c.im as f32)));
        }
        ElemType::Complex128 => slot.copy_from_slice(bytemuck::bytes_of(&value.as_complex())),
    }
}

fn log_exponent(x: f64) -> f64 {
    if x == 0.0 {
        f64::NEG_INFINITY
    } else if x.is_infinite() {
        f64::INFINITY
    } else if x.is_nan() {
        x
    } else {
        libm::ilogb(x) as f64
    }
}

fn real_unary(op: UnaryOp, x: f64) -> Option<f64> {
    use libm::*;
    Some(match op {
        UnaryOp::Not => return None,
        UnaryOp::Exp => exp(x),
        UnaryOp::Expm1 => expm1(x),
        UnaryOp::Exp2 => exp2(x),
        UnaryOp::Exp10 => exp10(x),
        UnaryOp::Sqrt => sqrt(x),
        UnaryOp::Cbrt => cbrt(x),
        UnaryOp::Rsqrt => 1.0 / sqrt(x),
        UnaryOp::Log => log(x),
        UnaryOp::Log1p => log1p(x),
        UnaryOp::Log2 => log2(x),
        UnaryOp::Log10 => log10(x),
        UnaryOp::Logb => log_exponent(x),
        UnaryOp::Erf => erf(x),
        UnaryOp::Erfc => erfc(x),
        UnaryOp::Tgamma => tgamma(x),
        UnaryOp::Lgamma => lgamma(x),
        UnaryOp::Sin => sin(x),
        UnaryOp::Cos => cos(x),
        UnaryOp::Tan => tan(x),
        UnaryOp::Asin => asin(x),
        UnaryOp::Acos => acos(x),
        UnaryOp::Atan => atan(x),
        UnaryOp::Sinh => sinh(x),
        UnaryOp::Cosh => cosh(x),
        UnaryOp::Tanh => tanh(x),
        UnaryOp::Asinh => asinh(x),
        UnaryOp::Acosh => acosh(x),
        UnaryOp::Atanh => atanh(x),
    })
}

/// `0.5*sqrt((a+1)^2+b^2)` and `0.5*sqrt((a-1)^2+b^2)`.
fn half_sums(a: f64, b: f64) -> (f64, f64) {
    (0.5 * libm::sqrt((a + 1.0) * (a + 1.0) + b * b), 0.5 * libm::sqrt((a - 1.0) * (a - 1.0) + b * b))
}

fn sum_log(p: f64, m: f64) -> f64 {
    libm::log(p + m + libm::sqrt((p + m) * (p + m) - 1.0))
}

fn complex_unary(op: UnaryOp, z: Complex64) -> Option<Complex64> {
    use libm::*;
    let (x, y) = (z.re, z.im);
    let norm_sq = x * x + y * y;
    let modulus = sqrt(norm_sq);
    let theta = atan2(y, x);
    let right_angle = acos(0.0);

    let (re, im) = match op {
        UnaryOp::Not | UnaryOp::Logb | UnaryOp::Erf | UnaryOp::Erfc | UnaryOp::Tgamma | UnaryOp::Lgamma => {
            return None;
        }
        UnaryOp::Exp => (exp(x) * cos(y), exp(x) * sin(y)),
        UnaryOp::Expm1 => (exp(x) * cos(y) - 1.0, exp(x) * sin(y)),
        UnaryOp::Exp2 => (exp2(x) * cos(LN_2 * y), exp2(x) * sin(LN_2 * y)),
        UnaryOp::Exp10 => (exp10(x) * cos(LN_10 * y), exp10(x) * sin(LN_10 * y)),
        UnaryOp::Sqrt => (sqrt(modulus) * cos(theta / 2.0), sqrt(modulus) * sin(theta / 2.0)),
        UnaryOp::Cbrt => (cbrt(modulus) * cos(theta / 3.0), cbrt(modulus) * sin(theta / 3.0)),
        UnaryOp::Rsqrt => {
            (sqrt(modulus) * cos(theta / 2.0) / modulus, -sqrt(modulus) * sin(theta / 2.0) / modulus)
        }
        UnaryOp::Log => (0.5 * log(norm_sq), if x != 0.0 { theta } else { right_angle }),
        UnaryOp::Log1p => (
            0.5 * log((x + 1.0) * (x + 1.0) + y * y),
            if x != -1.0 { atan2(y, x + 1.0) } else { right_angle },
        ),
        UnaryOp::Log2 => (0.5 * log2(norm_sq), if x != 0.0 { theta / LN_2 } else { right_angle }),
        UnaryOp::Log10 => (0.5 * log10(norm_sq), if x != 0.0 { theta / LN_10 } else { right_angle }),
        UnaryOp::Sin => (sin(x) * cosh(y), cos(x) * sinh(y)),
        UnaryOp::Cos => (cos(x) * cosh(y), -sin(x) * sinh(y)),
        UnaryOp::Tan => {
            let d = cos(2.0 * x) + cosh(2.0 * y);
            (sin(2.0 * x) / d, sinh(2.0 * y) / d)
        }
        UnaryOp::Asin => {
            let (p, m) = half_sums(x, y);
            (asin(p - m), -sum_log(p, m))
        }
        UnaryOp::Acos => {
            let (p, m) = half_sums(x, y);
            (acos(p - m), -sum_log(p, m))
        }
        UnaryOp::Atan => (
            0.5 * atan2(2.0 * x, 1.0 - x * x - y * y),
            0.25 * log((x * x + (y + 1.0) * (y + 1.0)) / (x * x + (y - 1.0) * (y - 1.0))),
        ),
        UnaryOp::Sinh => (sinh(x) * cos(y), cosh(x) * sin(y)),
        UnaryOp::Cosh => (cosh(x) * cos(y), sinh(x) * sin(y)),
        UnaryOp::Tanh => {
            let d = cosh(2.0 * x) + cos(2.0 * y);
            (sinh(2.0 * x) / d, sin(2.0 * y) / d)
        }
        UnaryOp::Asinh => {
            let (p, m) = half_sums(-y, x);
            (sum_log(p, m), -asin(p - m))
        }
        UnaryOp::Acosh => {
            let (p, m) = half_sums(x, y);
            (sum_log(p, m), acos(p - m))
        }
        UnaryOp::Atanh => (
            0.25 * log((y * y + (x + 1.0) * (x + 1.0)) / (y * y + (x - 1.0) * (x - 1.0))),
            0.5 * atan2(-2.0 * y, 1.0 - y * y - x * x),
        ),
    };
    Some(Complex::new(re, im))
}

fn unary(op: UnaryOp, value: Value) -> Option<Value> {
    match value {
        Value::Int(v) if op == UnaryOp::Not => Some(Value::Int(!v)),
        Value::UInt(v) if op == UnaryOp::Not => Some(Value::UInt(!v)),
        Value::Float(v) => real_unary(op, v).map(Value::Float),
        Value::Complex(z) => complex_unary(op, z).map(Value::Complex),
        _ => None,
    }
}

macro_rules! int_binary {
    ($op:expr, $x:expr, $y:expr, $wrap:path) => {{
        let (x, y) = ($x, $y);
        match $op {
            BinaryOp::Add => $wrap(x.wrapping_add(y)),
            BinaryOp::Sub => $wrap(x.wrapping_sub(y)),
            BinaryOp::Mult => $wrap(x.wrapping_mul(y)),
            // Division by zero is undefined on devices; the host yields zero.
            BinaryOp::Div => $wrap(x.checked_div(y).unwrap_or(0)),
            BinaryOp::And => $wrap(x & y),
            BinaryOp::Or => $wrap(x | y),
            BinaryOp::Xor => $wrap(x ^ y),
            BinaryOp::Mod => return None,
            BinaryOp::Eq => Value::from_bool(x == y),
            BinaryOp::Ne => Value::from_bool(x != y),
            BinaryOp::Gt => Value::from_bool(x > y),
            BinaryOp::Ge => Value::from_bool(x >= y),
            BinaryOp::Lt => Value::from_bool(x < y),
            BinaryOp::Le => Value::from_bool(x <= y),
        }
    }};
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Option<Value> {
    Some(match (lhs, rhs) {
        (Value::Int(x), Value::Int(y)) => int_binary!(op, x, y, Value::Int),
        (Value::UInt(x), Value::UInt(y)) => int_binary!(op, x, y, Value::UInt),
        (Value::Float(x), Value::Float(y)) => match op {
            BinaryOp::Add => Value::Float(x + y),
            BinaryOp::Sub => Value::Float(x - y),
            BinaryOp::Mult => Value::Float(x * y),
            BinaryOp::Div => Value::Float(x / y),
            BinaryOp::Mod => Value::Float(libm::fmod(x, y)),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => return None,
            BinaryOp::Eq => Value::from_bool(x == y),
            BinaryOp::Ne => Value::from_bool(x != y),
            BinaryOp::Gt => Value::from_bool(x > y),
            BinaryOp::Ge => Value::from_bool(x >= y),
            BinaryOp::Lt => Value::from_bool(x < y),
            BinaryOp::Le => Value::from_bool(x <= y),
        },
        (Value::Complex(z), Value::Complex(w)) => {
            let (zn, wn) = (z.re * z.re + z.im * z.im, w.re * w.re + w.im * w.im);
            match op {
                BinaryOp::Add => Value::Complex(Complex::new(z.re + w.re, z.im + w.im)),
                BinaryOp::Sub => Value::Complex(Complex::new(z.re - w.re, z.im - w.im)),
                BinaryOp::Mult => {
                    Value::Complex(Complex::new(z.re * w.re - z.im * w.im, z.im * w.re + z.re * w.im))
                }
                BinaryOp::Div => Value::Complex(Complex::new(
                    (z.re * w.re + z.im * w.im) / wn,
                    (z.im * w.re - z.re * w.im) / wn,
                )),
                BinaryOp::Mod => Value::Complex(Complex::new(libm::fmod(z.re, w.re), libm::fmod(z.im, w.im))),
                BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => return None,
                BinaryOp::Eq => Value::from_bool(z.re == w.re && z.im == w.im),
                BinaryOp::Ne => Value::from_bool(z.re != w.re || z.im != w.im),
                BinaryOp::Gt => Value::from_bool(zn > wn),
                BinaryOp::Ge => Value::from_bool(zn >= wn),
                BinaryOp::Lt => Value::from_bool(zn < wn),
                BinaryOp::Le => Value::from_bool(zn <= wn),
            }
        }
        _ => return None,
    })
}

/// Split `args` into buffer contents and the trailing element count.
fn unpack(name: &str, args: &[KernelArg<'_>], buffers: usize) -> Result<(Vec<Vec<u8>>, usize)> {
    let mismatch = |reason: String| ArgumentMismatchSnafu { name, reason }.fail();

    if args.len() != buffers + 1 {
        return mismatch(format!("expected {} arguments, got {}", buffers + 1, args.len()));
    }
    let Some(KernelArg::Scalar(Scalar::UInt32(n))) = args.last() else {
        return mismatch("last argument must be the uint element count".into());
    };

    let mut contents = Vec::with_capacity(buffers);
    for (position, arg) in args[..buffers].iter().enumerate() {
        let KernelArg::Buffer(buffer) = arg else {
            return mismatch(format!("argument {position} must be a buffer"));
        };
        let Some(bytes) = buffer.host_read() else {
            return mismatch(format!("argument {position} is not host memory"));
        };
        contents.push(bytes);
    }
    Ok((contents, *n as usize))
}

/// Execute `spec` over `args`, writing the result buffer in place.
pub(crate) fn run(name: &str, spec: &KernelSpec, args: &[KernelArg<'_>], params: &ExecParams) -> Result<()> {
    let (buffers, in_ty, out_ty) = match *spec {
        KernelSpec::Fill { ty, .. } => (1, ty, ty),
        KernelSpec::Unary { ty, .. } => (2, ty, ty),
        KernelSpec::Binary { op, ty } => (3, ty, op.output_type(ty)),
        KernelSpec::Custom { .. } => {
            return ArgumentMismatchSnafu { name, reason: "custom source cannot be interpreted" }.fail();
        }
    };
    let (mut contents, n) = unpack(name, args, buffers)?;
    let items = n.min(params.global_size);

    for (position, bytes) in contents.iter().enumerate() {
        let ty = if position + 1 == buffers { out_ty } else { in_ty };
        if bytes.len() < items * ty.bytes() {
            let reason = format!("argument {position} holds {} bytes, {} elements needed", bytes.len(), items);
            return ArgumentMismatchSnafu { name, reason }.fail();
        }
    }

    let Some(mut output) = contents.pop() else {
        return ArgumentMismatchSnafu { name, reason: "missing result buffer" }.fail();
    };
    let unsupported = || ArgumentMismatchSnafu { name, reason: format!("no host kernel for {spec:?}") }.fail();

    for i in 0..items {
        let value = match *spec {
            KernelSpec::Fill { mode: FillMode::Zero, .. } => Value::UInt(0),
            KernelSpec::Fill { mode: FillMode::Index, .. } => Value::UInt(i as u64),
            KernelSpec::Unary { op, ty } => match unary(op, load(ty, &contents[0], i)) {
                Some(value) => value,
                None => return unsupported(),
            },
            KernelSpec::Binary { op, ty } => match binary(op, load(ty, &contents[0], i), load(ty, &contents[1], i)) {
                Some(value) => value,
                None => return unsupported(),
            },
            KernelSpec::Custom { .. } => return unsupported(),
        };
        store(out_ty, &mut output, i, value);
    }

    let KernelArg::Buffer(result) = args[buffers - 1] else {
        return ArgumentMismatchSnafu { name, reason: "missing result buffer" }.fail();
    };
    result.host_write(&output)?;
    Ok(())
}
