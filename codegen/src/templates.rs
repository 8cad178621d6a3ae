//! OpenCL program skeletons.
//!
//! Placeholders are `$NAME` tokens replaced textually by the renderer.

pub const FP64_PRAGMA: &str = "\
#ifdef cl_khr_fp64
  #pragma OPENCL EXTENSION cl_khr_fp64 : enable
#elif defined(cl_amd_fp64)
  #pragma OPENCL EXTENSION cl_amd_fp64 : enable
#endif
";

pub const ARRAY_INIT: &str = "\
$FP64
__kernel void array_init(__global $TYPE *result, const unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) { $COMMAND }
}
";

pub const UNARY: &str = "\
$FP64
__kernel void unary_op(__global const $TYPE *x, __global $TYPE *result, const unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) { result[i] = $OP(x[i]); }
}
";

pub const UNARY_COMPLEX: &str = "\
$FP64
__kernel void unary_op(__global const $TYPE *z, __global $TYPE *result, const unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) {
    $TYPE r;
    r.x = $RE_EXPR;
    r.y = $IM_EXPR;
    result[i] = r;
  }
}
";

pub const BINARY: &str = "\
$FP64
__kernel void binary_op(__global const $TYPE *x, __global const $TYPE *y, __global $RESULT_TYPE *result, const unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) { result[i] = $EXPR; }
}
";

pub const BINARY_COMPLEX: &str = "\
$FP64
__kernel void binary_op(__global const $TYPE *z, __global const $TYPE *w, __global $TYPE *result, const unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) {
    $TYPE r;
    r.x = $RE_EXPR;
    r.y = $IM_EXPR;
    result[i] = r;
  }
}
";

pub const CUSTOM_SIMPLE: &str = "\
$FP64
__kernel void custom_simple($PARAMSconst unsigned int n) {
  size_t i = get_global_id(0);
  if (i < n) { $BODY; }
}
";

/// Replace each `(placeholder, value)` pair in `template`.
pub fn substitute(template: &str, bindings: &[(&str, &str)]) -> String {
    bindings.iter().fold(template.to_string(), |source, (placeholder, value)| source.replace(placeholder, value))
}
