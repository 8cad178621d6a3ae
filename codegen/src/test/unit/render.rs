use clarray_dtype::ElemType;
use proptest::prelude::*;

use crate::*;

#[test]
fn test_fill_kernels() {
    let zero = render_fill(FillMode::Zero, ElemType::Int32);
    assert_eq!(zero.key, "array_zero_int");
    assert_eq!(zero.entry_point, "array_init");
    assert!(zero.source.contains("__kernel void array_init(__global int *result, const unsigned int n)"));
    assert!(zero.source.contains("if (i < n) { result[i] = 0; }"));
    assert!(!zero.source.contains("cl_khr_fp64"));

    let index = render_fill(FillMode::Index, ElemType::Complex128);
    assert_eq!(index.key, "array_index_double2");
    assert!(index.source.contains("result[i].x = i; result[i].y = 0.0f;"));
    assert!(index.source.contains("#pragma OPENCL EXTENSION cl_khr_fp64 : enable"));
}

#[test]
fn test_real_unary_uses_builtin() {
    let kernel = render_unary(UnaryOp::Sqrt, ElemType::Float32).unwrap();
    assert_eq!(kernel.key, "unary_op_sqrt_float");
    assert_eq!(kernel.entry_point, "unary_op");
    assert!(kernel.source.contains("result[i] = sqrt(x[i]);"));
    assert_eq!(kernel.spec, KernelSpec::Unary { op: UnaryOp::Sqrt, ty: ElemType::Float32 });
}

#[test]
fn test_bitwise_not_renders_operator() {
    let kernel = render_unary(UnaryOp::Not, ElemType::Byte).unwrap();
    assert!(kernel.source.contains("result[i] = ~(x[i]);"));
}

#[test]
fn test_complex_unary_substitutes_both_parts() {
    let kernel = render_unary(UnaryOp::Exp, ElemType::Complex64).unwrap();
    assert_eq!(kernel.key, "unary_op_exp_float2");
    assert!(kernel.source.contains("__global const float2 *z"));
    assert!(kernel.source.contains("r.x = exp(z[i].x)*cos(z[i].y);"));
    assert!(kernel.source.contains("r.y = exp(z[i].x)*sin(z[i].y);"));
    assert!(!kernel.source.contains('$'));
}

#[test]
fn test_unsupported_unary_is_rejected() {
    assert!(matches!(render_unary(UnaryOp::Lgamma, ElemType::Complex64), Err(Error::UnsupportedType { .. })));
    assert!(matches!(render_unary(UnaryOp::Exp, ElemType::Int16), Err(Error::UnsupportedType { .. })));
}

#[test]
fn test_comparison_writes_uchar() {
    let kernel = render_binary(BinaryOp::Gt, ElemType::Float32).unwrap();
    assert_eq!(kernel.key, "binary_op_gt_float");
    assert!(kernel.source.contains("__global uchar *result"));
    assert!(kernel.source.contains("result[i] = x[i]>y[i];"));
}

#[test]
fn test_complex_comparison_uses_magnitude_in_real_template() {
    let kernel = render_binary(BinaryOp::Lt, ElemType::Complex128).unwrap();
    assert!(kernel.source.contains("__global const double2 *x"));
    assert!(kernel.source.contains("(x[i].x*x[i].x+x[i].y*x[i].y)<(y[i].x*y[i].x+y[i].y*y[i].y)"));
    assert!(kernel.source.contains("__global uchar *result"));
}

#[test]
fn test_complex_division() {
    let kernel = render_binary(BinaryOp::Div, ElemType::Complex64).unwrap();
    assert!(kernel.source.contains("r.x = (z[i].x*w[i].x+z[i].y*w[i].y)/(w[i].x*w[i].x+w[i].y*w[i].y);"));
    assert!(kernel.source.contains("__global const float2 *w"));
}

#[test]
fn test_custom_simple_kernel() {
    let kernel =
        render_custom_simple("z[i] = x[i] + y[i]", &["x", "y", "z"], &[ElemType::Float32; 3]).unwrap();
    assert_eq!(kernel.key, "custom_simple_040404z[i] = x[i] + y[i]");
    assert_eq!(kernel.entry_point, "custom_simple");
    assert!(kernel.source.contains(
        "__kernel void custom_simple(__global float *x, __global float *y, __global float *z, const unsigned int n)"
    ));
    assert!(kernel.source.contains("if (i < n) { z[i] = x[i] + y[i]; }"));
}

#[test]
fn test_custom_simple_checks_parameters() {
    let mismatch = render_custom_simple("x[i] = 0", &["x", "y"], &[ElemType::Int32]);
    assert!(matches!(mismatch, Err(Error::ParameterMismatch { names: 2, types: 1 })));

    let bad_name = render_custom_simple("x[i] = 0", &["x y"], &[ElemType::Int32]);
    assert!(matches!(bad_name, Err(Error::InvalidParameterName { .. })));
}

#[test]
fn test_custom_full_kernel() {
    let source = "__kernel void twice(__global int *a) { a[get_global_id(0)] *= 2; }";
    let kernel = render_custom_full(source, "twice").unwrap();
    assert_eq!(kernel.key, format!("custom_full_{source}"));
    assert_eq!(kernel.source, source);
    assert!(matches!(render_custom_full(source, ""), Err(Error::MissingEntryPoint)));
}

proptest! {
    #[test]
    fn test_fill_source_is_fully_substituted(ty: ElemType, index: bool) {
        let mode = if index { FillMode::Index } else { FillMode::Zero };
        let kernel = render_fill(mode, ty);
        prop_assert!(!kernel.source.contains('$'));
        prop_assert!(kernel.key.ends_with(ty.cl_name()));
        prop_assert_eq!(kernel.source.contains("cl_khr_fp64"), ty.needs_fp64());
    }

    #[test]
    fn test_binary_keys_distinguish_types(lhs: ElemType, rhs: ElemType) {
        prop_assume!(lhs != rhs);
        prop_assert_ne!(binary_key(BinaryOp::Add, lhs), binary_key(BinaryOp::Add, rhs));
    }
}
