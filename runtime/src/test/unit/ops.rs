use clarray_dtype::ElemType;
use num_complex::{Complex32, Complex64};
use test_case::test_case;

use crate::test::host_engine;
use crate::{BinaryOp, Error, HostArray, InitMode, UnaryOp};

#[test]
fn test_repeated_unary_compiles_once() {
    let (driver, mut engine) = host_engine();
    let a = engine.upload(&HostArray::from_vec(vec![1.0f32, 4.0, 9.0]).unwrap()).unwrap();

    let first = engine.apply_unary(UnaryOp::Sqrt, &a, None).unwrap();
    let second = engine.apply_unary(UnaryOp::Sqrt, &a, None).unwrap();

    assert_eq!(driver.stats().compiles, 1);
    assert_eq!(driver.stats().launches, 2);
    assert_eq!(engine.cache().stats().hits, 1);
    for result in [first, second] {
        assert_eq!(engine.download(&result).unwrap().to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);
    }
}

#[test]
fn test_unary_kernels_are_keyed_by_type() {
    let (driver, mut engine) = host_engine();
    let a = engine.upload(&HostArray::from_vec(vec![1.0f32]).unwrap()).unwrap();
    let b = engine.upload(&HostArray::from_vec(vec![1.0f64]).unwrap()).unwrap();

    engine.apply_unary(UnaryOp::Exp, &a, None).unwrap();
    engine.apply_unary(UnaryOp::Exp, &b, None).unwrap();

    assert_eq!(driver.stats().compiles, 2);
    assert!(engine.cache().contains("unary_op_exp_float"));
    assert!(engine.cache().contains("unary_op_exp_double"));
}

#[test]
fn test_unary_into_caller_output() {
    let (_, mut engine) = host_engine();
    let a = engine.upload(&HostArray::from_vec(vec![0.0f64, 1.0]).unwrap()).unwrap();
    let out = engine.construct(ElemType::Float64, &[2], InitMode::Uninitialized).unwrap();

    let result = engine.apply_unary(UnaryOp::Exp, &a, Some(out.clone())).unwrap();
    assert!(result.buffer().unwrap().shares_storage(out.buffer().unwrap()));

    let values = engine.download(&out).unwrap().to_vec::<f64>().unwrap();
    assert_eq!(values[0], 1.0);
    assert!((values[1] - std::f64::consts::E).abs() < 1e-12);
}

#[test]
fn test_unary_output_checks() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Float32, &[4], InitMode::Zero).unwrap();

    let wrong_type = engine.construct(ElemType::Float64, &[4], InitMode::Zero).unwrap();
    let result = engine.apply_unary(UnaryOp::Sin, &a, Some(wrong_type));
    assert!(matches!(result, Err(Error::TypeMismatch { .. })), "{result:?}");

    let wrong_count = engine.construct(ElemType::Float32, &[5], InitMode::Zero).unwrap();
    let result = engine.apply_unary(UnaryOp::Sin, &a, Some(wrong_count));
    assert!(matches!(result, Err(Error::ShapeMismatch { expected: 4, actual: 5 })), "{result:?}");
}

#[test]
fn test_unsupported_unary_type() {
    let (driver, mut engine) = host_engine();
    let a = engine.construct(ElemType::Int32, &[2], InitMode::Zero).unwrap();
    let compiles = driver.stats().compiles;

    let result = engine.apply_unary(UnaryOp::Sqrt, &a, None);
    assert!(matches!(result, Err(Error::Codegen { .. })), "{result:?}");
    assert_eq!(driver.stats().compiles, compiles);
}

#[test]
fn test_complex_sqrt() {
    let (_, mut engine) = host_engine();
    let z = engine.upload(&HostArray::from_vec(vec![Complex32::new(-4.0, 0.0)]).unwrap()).unwrap();

    let result = engine.apply_unary(UnaryOp::Sqrt, &z, None).unwrap();
    assert_eq!(result.elem_type(), Some(ElemType::Complex64));

    let root = engine.download(&result).unwrap().get::<Complex32>(0).unwrap();
    assert!(root.re.abs() < 1e-6, "{root}");
    assert!((root.im - 2.0).abs() < 1e-6, "{root}");
}

#[test]
fn test_binary_add() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Int32, &[2, 2], InitMode::Index).unwrap();
    let b = engine.construct(ElemType::Int32, &[4], InitMode::Index).unwrap();

    let sum = engine.apply_binary(BinaryOp::Add, &a, &b, None).unwrap();
    assert_eq!(sum.shape(), &[2, 2]);
    assert_eq!(engine.download(&sum).unwrap().to_vec::<i32>().unwrap(), vec![0, 2, 4, 6]);
}

#[test]
fn test_binary_type_mismatch() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Float32, &[4], InitMode::Zero).unwrap();
    let b = engine.construct(ElemType::Float64, &[4], InitMode::Zero).unwrap();

    let result = engine.apply_binary(BinaryOp::Add, &a, &b, None);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { lhs: ElemType::Float32, rhs: ElemType::Float64 }), "{err:?}");
    assert_eq!(err.status_code(), -6);
}

#[test]
fn test_binary_shape_mismatch() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Float32, &[4], InitMode::Zero).unwrap();
    let b = engine.construct(ElemType::Float32, &[5], InitMode::Zero).unwrap();

    let result = engine.apply_binary(BinaryOp::Mult, &a, &b, None);
    assert!(matches!(result, Err(Error::ShapeMismatch { expected: 4, actual: 5 })), "{result:?}");
}

#[test_case(BinaryOp::Gt, vec![0, 0, 1] ; "gt")]
#[test_case(BinaryOp::Le, vec![1, 1, 0] ; "le")]
#[test_case(BinaryOp::Eq, vec![0, 1, 0] ; "eq")]
fn test_comparisons_yield_bytes(op: BinaryOp, expected: Vec<u8>) {
    let (_, mut engine) = host_engine();
    let a = engine.upload(&HostArray::from_vec(vec![1.0f32, 2.0, 3.0]).unwrap()).unwrap();
    let b = engine.upload(&HostArray::from_vec(vec![2.0f32, 2.0, 2.0]).unwrap()).unwrap();

    let result = engine.apply_binary(op, &a, &b, None).unwrap();
    assert_eq!(result.elem_type(), Some(ElemType::Byte));
    assert_eq!(engine.download(&result).unwrap().as_bytes(), expected);
}

#[test]
fn test_comparison_rejects_float_output() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Float32, &[3], InitMode::Zero).unwrap();
    let out = engine.construct(ElemType::Float32, &[3], InitMode::Zero).unwrap();

    let result = engine.apply_binary(BinaryOp::Gt, &a, &a, Some(out));
    assert!(matches!(result, Err(Error::TypeMismatch { lhs: ElemType::Byte, .. })), "{result:?}");
}

#[test]
fn test_integer_division_by_zero_is_zero() {
    let (_, mut engine) = host_engine();
    let a = engine.upload(&HostArray::from_vec(vec![7i32, 8]).unwrap()).unwrap();
    let b = engine.upload(&HostArray::from_vec(vec![2i32, 0]).unwrap()).unwrap();

    let result = engine.apply_binary(BinaryOp::Div, &a, &b, None).unwrap();
    assert_eq!(engine.download(&result).unwrap().to_vec::<i32>().unwrap(), vec![3, 0]);
}

#[test]
fn test_released_operand_is_null() {
    let (_, mut engine) = host_engine();
    let a = engine.construct(ElemType::Byte, &[2], InitMode::Zero).unwrap();
    let mut b = a.clone();
    engine.release(&mut b);

    let result = engine.apply_binary(BinaryOp::Or, &a, &b, None);
    let err = result.unwrap_err();
    assert!(matches!(err, Error::NullHandle));
    assert_eq!(err.status_code(), -101);
}

fn complex_operands(engine: &mut crate::Engine) -> (crate::DeviceArray, crate::DeviceArray) {
    let z = vec![Complex32::new(1.0, 2.0), Complex32::new(3.0, 4.0)];
    let w = vec![Complex32::new(3.0, -1.0), Complex32::new(5.0, 0.0)];
    let z = engine.upload(&HostArray::from_vec(z).unwrap()).unwrap();
    let w = engine.upload(&HostArray::from_vec(w).unwrap()).unwrap();
    (z, w)
}

#[test_case(BinaryOp::Add, Complex32::new(4.0, 1.0) ; "add")]
#[test_case(BinaryOp::Sub, Complex32::new(-2.0, 3.0) ; "sub")]
#[test_case(BinaryOp::Mult, Complex32::new(1.0, 2.0) * Complex32::new(3.0, -1.0) ; "mult")]
#[test_case(BinaryOp::Div, Complex32::new(1.0, 2.0) / Complex32::new(3.0, -1.0) ; "div")]
fn test_complex_arithmetic(op: BinaryOp, expected: Complex32) {
    let (_, mut engine) = host_engine();
    let (z, w) = complex_operands(&mut engine);

    let result = engine.apply_binary(op, &z, &w, None).unwrap();
    assert_eq!(result.elem_type(), Some(ElemType::Complex64));

    let value = engine.download(&result).unwrap().get::<Complex32>(0).unwrap();
    assert!((value - expected).norm() < 1e-6, "{value} != {expected}");
}

#[test]
fn test_complex_mult_div_values() {
    let (_, mut engine) = host_engine();
    let (z, w) = complex_operands(&mut engine);

    let product = engine.apply_binary(BinaryOp::Mult, &z, &w, None).unwrap();
    let quotient = engine.apply_binary(BinaryOp::Div, &z, &w, None).unwrap();
    let product = engine.download(&product).unwrap().get::<Complex32>(0).unwrap();
    let quotient = engine.download(&quotient).unwrap().get::<Complex32>(0).unwrap();

    assert!((product - Complex32::new(5.0, 5.0)).norm() < 1e-6, "{product}");
    assert!((quotient - Complex32::new(0.1, 0.7)).norm() < 1e-6, "{quotient}");
}

// |1+2i|² = 5 < |3-i|² = 10 and |3+4i|² = |5|² = 25.
#[test_case(BinaryOp::Gt, vec![0, 0] ; "gt")]
#[test_case(BinaryOp::Ge, vec![0, 1] ; "ge")]
#[test_case(BinaryOp::Lt, vec![1, 0] ; "lt")]
#[test_case(BinaryOp::Le, vec![1, 1] ; "le")]
#[test_case(BinaryOp::Eq, vec![0, 0] ; "eq")]
#[test_case(BinaryOp::Ne, vec![1, 1] ; "ne")]
fn test_complex_comparisons(op: BinaryOp, expected: Vec<u8>) {
    let (_, mut engine) = host_engine();
    let (z, w) = complex_operands(&mut engine);

    let result = engine.apply_binary(op, &z, &w, None).unwrap();
    assert_eq!(result.elem_type(), Some(ElemType::Byte));
    assert_eq!(result.shape(), &[2]);
    assert_eq!(engine.download(&result).unwrap().as_bytes(), expected);
}

#[test]
fn test_complex_equality_is_componentwise() {
    let (_, mut engine) = host_engine();
    let z = engine.upload(&HostArray::from_vec(vec![Complex64::new(1.0, -2.0)]).unwrap()).unwrap();
    let w = engine.upload(&HostArray::from_vec(vec![Complex64::new(1.0, -2.0)]).unwrap()).unwrap();

    let eq = engine.apply_binary(BinaryOp::Eq, &z, &w, None).unwrap();
    assert_eq!(engine.download(&eq).unwrap().as_bytes(), vec![1]);
}

#[test_case(UnaryOp::Exp, Complex64::exp ; "exp")]
#[test_case(UnaryOp::Log, Complex64::ln ; "log")]
#[test_case(UnaryOp::Sin, Complex64::sin ; "sin")]
#[test_case(UnaryOp::Cos, Complex64::cos ; "cos")]
#[test_case(UnaryOp::Tan, Complex64::tan ; "tan")]
#[test_case(UnaryOp::Sinh, Complex64::sinh ; "sinh")]
#[test_case(UnaryOp::Cosh, Complex64::cosh ; "cosh")]
#[test_case(UnaryOp::Tanh, Complex64::tanh ; "tanh")]
#[test_case(UnaryOp::Atan, Complex64::atan ; "atan")]
#[test_case(UnaryOp::Sqrt, Complex64::sqrt ; "sqrt")]
fn test_complex_unary_matches_reference(op: UnaryOp, reference: fn(Complex64) -> Complex64) {
    let (_, mut engine) = host_engine();
    let inputs = vec![Complex64::new(0.5, 0.25), Complex64::new(1.5, 2.0)];
    let z = engine.upload(&HostArray::from_vec(inputs.clone()).unwrap()).unwrap();

    let result = engine.apply_unary(op, &z, None).unwrap();
    assert_eq!(result.elem_type(), Some(ElemType::Complex128));

    let values = engine.download(&result).unwrap().to_vec::<Complex64>().unwrap();
    for (input, value) in inputs.into_iter().zip(values) {
        let expected = reference(input);
        assert!((value - expected).norm() < 1e-10 * expected.norm().max(1.0), "{op}({input}) = {value}");
    }
}
