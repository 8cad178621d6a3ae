//! Elementwise operation tables.
//!
//! Complex forms are written over the kernel's input `z` (unary) or inputs
//! `z`, `w` (binary) and produce the real and imaginary parts of `result[i]`.
//! Complex comparisons are written over `x`, `y` because they render through
//! the real template.

use clarray_dtype::ElemType;

/// Unary elementwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumString, strum::IntoStaticStr, strum::EnumIter, strum::VariantArray, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UnaryOp {
    Not,
    Exp,
    Expm1,
    Exp2,
    Exp10,
    Sqrt,
    Cbrt,
    Rsqrt,
    Log,
    Log1p,
    Log2,
    Log10,
    Logb,
    Erf,
    Erfc,
    Tgamma,
    Lgamma,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
}

// Shared subexpressions of the inverse trigonometric forms.
macro_rules! half_sums {
    (plus) => {
        "0.5*sqrt((z[i].x+1)*(z[i].x+1)+z[i].y*z[i].y)"
    };
    (minus) => {
        "0.5*sqrt((z[i].x-1)*(z[i].x-1)+z[i].y*z[i].y)"
    };
    (iplus) => {
        "0.5*sqrt((-z[i].y+1)*(-z[i].y+1)+z[i].x*z[i].x)"
    };
    (iminus) => {
        "0.5*sqrt((-z[i].y-1)*(-z[i].y-1)+z[i].x*z[i].x)"
    };
}

macro_rules! acosh_log {
    ($a:tt, $b:tt) => {
        concat!(
            "log(", half_sums!($a), "+", half_sums!($b),
            "+sqrt((", half_sums!($a), "+", half_sums!($b), ")*(", half_sums!($a), "+", half_sums!($b), ")-1))"
        )
    };
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::Not)
    }

    /// OpenCL builtin applied to real operands (`~` for bitwise not).
    pub const fn real_fn(self) -> &'static str {
        match self {
            Self::Not => "~",
            Self::Exp => "exp",
            Self::Expm1 => "expm1",
            Self::Exp2 => "exp2",
            Self::Exp10 => "exp10",
            Self::Sqrt => "sqrt",
            Self::Cbrt => "cbrt",
            Self::Rsqrt => "rsqrt",
            Self::Log => "log",
            Self::Log1p => "log1p",
            Self::Log2 => "log2",
            Self::Log10 => "log10",
            Self::Logb => "logb",
            Self::Erf => "erf",
            Self::Erfc => "erfc",
            Self::Tgamma => "tgamma",
            Self::Lgamma => "lgamma",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Asinh => "asinh",
            Self::Acosh => "acosh",
            Self::Atanh => "atanh",
        }
    }

    /// Closed-form real and imaginary parts, when the operation has one.
    #[rustfmt::skip]
    pub const fn complex_forms(self) -> Option<(&'static str, &'static str)> {
        let forms = match self {
            Self::Not | Self::Logb | Self::Erf | Self::Erfc | Self::Tgamma | Self::Lgamma => return None,
            Self::Exp => ("exp(z[i].x)*cos(z[i].y)", "exp(z[i].x)*sin(z[i].y)"),
            Self::Expm1 => ("exp(z[i].x)*cos(z[i].y)-1", "exp(z[i].x)*sin(z[i].y)"),
            Self::Exp2 => ("exp2(z[i].x)*cos(log(2.0)*z[i].y)", "exp2(z[i].x)*sin(log(2.0)*z[i].y)"),
            Self::Exp10 => ("exp10(z[i].x)*cos(log(10.0)*z[i].y)", "exp10(z[i].x)*sin(log(10.0)*z[i].y)"),
            Self::Sqrt => (
                "sqrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*cos(atan2(z[i].y,z[i].x)/2)",
                "sqrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*sin(atan2(z[i].y,z[i].x)/2)",
            ),
            Self::Cbrt => (
                "cbrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*cos(atan2(z[i].y,z[i].x)/3)",
                "cbrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*sin(atan2(z[i].y,z[i].x)/3)",
            ),
            Self::Rsqrt => (
                "sqrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*cos(atan2(z[i].y,z[i].x)/2)/sqrt(z[i].x*z[i].x+z[i].y*z[i].y)",
                "-sqrt(sqrt(z[i].x*z[i].x+z[i].y*z[i].y))*sin(atan2(z[i].y,z[i].x)/2)/sqrt(z[i].x*z[i].x+z[i].y*z[i].y)",
            ),
            Self::Log => ("0.5*log(z[i].x*z[i].x+z[i].y*z[i].y)", "(z[i].x!=0.)?atan2(z[i].y,z[i].x):acos(0.)"),
            Self::Log1p => (
                "0.5*log((z[i].x+1.0)*(z[i].x+1.0)+z[i].y*z[i].y)",
                "(z[i].x!=-1.0)?atan2(z[i].y,z[i].x+1.0f):acos(0.)",
            ),
            Self::Log2 => ("0.5*log2(z[i].x*z[i].x+z[i].y*z[i].y)", "((z[i].x!=0.)?atan2(z[i].y,z[i].x)/log(2.0):acos(0.))"),
            Self::Log10 => ("0.5*log10(z[i].x*z[i].x+z[i].y*z[i].y)", "(z[i].x!=0.)?atan2(z[i].y,z[i].x)/log(10.):acos(0.)"),
            Self::Sin => ("sin(z[i].x)*cosh(z[i].y)", "cos(z[i].x)*sinh(z[i].y)"),
            Self::Cos => ("cos(z[i].x)*cosh(z[i].y)", "-sin(z[i].x)*sinh(z[i].y)"),
            Self::Tan => (
                "sin(2*z[i].x)/(cos(2*z[i].x)+cosh(2*z[i].y))",
                "sinh(2*z[i].y)/(cos(2*z[i].x)+cosh(2*z[i].y))",
            ),
            Self::Asin => (
                concat!("asin(", half_sums!(plus), "-", half_sums!(minus), ")"),
                concat!("-(", acosh_log!(plus, minus), ")"),
            ),
            Self::Acos => (
                concat!("acos(", half_sums!(plus), "-", half_sums!(minus), ")"),
                concat!("-", acosh_log!(plus, minus)),
            ),
            Self::Atan => (
                "0.5*atan2(2*z[i].x,(1-z[i].x*z[i].x-z[i].y*z[i].y))",
                "0.25*log((z[i].x*z[i].x+(z[i].y+1)*(z[i].y+1))/(z[i].x*z[i].x+(z[i].y-1)*(z[i].y-1)))",
            ),
            Self::Sinh => ("sinh(z[i].x)*cos(z[i].y)", "cosh(z[i].x)*sin(z[i].y)"),
            Self::Cosh => ("cosh(z[i].x)*cos(z[i].y)", "sinh(z[i].x)*sin(z[i].y)"),
            Self::Tanh => (
                "sinh(2*z[i].x)/(cosh(2*z[i].x)+cos(2*z[i].y))",
                "sin(2*z[i].y)/(cosh(2*z[i].x)+cos(2*z[i].y))",
            ),
            Self::Asinh => (
                acosh_log!(iplus, iminus),
                concat!("-asin(", half_sums!(iplus), "-", half_sums!(iminus), ")"),
            ),
            Self::Acosh => (
                acosh_log!(plus, minus),
                concat!("acos(", half_sums!(plus), "-", half_sums!(minus), ")"),
            ),
            Self::Atanh => (
                "0.25*log((z[i].y*z[i].y+(z[i].x+1)*(z[i].x+1))/(z[i].y*z[i].y+(z[i].x-1)*(z[i].x-1)))",
                "0.5*atan2(-2*z[i].y,(1-z[i].y*z[i].y-z[i].x*z[i].x))",
            ),
        };
        Some(forms)
    }

    /// Whether a kernel for this operation can be built over `ty`.
    pub const fn supports(self, ty: ElemType) -> bool {
        if self.is_bitwise() {
            ty.is_int()
        } else if ty.is_complex() {
            self.complex_forms().is_some()
        } else {
            ty.is_float()
        }
    }
}

/// Binary elementwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::EnumString, strum::IntoStaticStr, strum::EnumIter, strum::VariantArray, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    And,
    Or,
    Xor,
    Mod,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }

    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Xor)
    }

    /// Expression over real operands `x`, `y`.
    pub const fn real_expr(self) -> &'static str {
        match self {
            Self::Add => "x[i]+y[i]",
            Self::Sub => "x[i]-y[i]",
            Self::Mult => "x[i]*y[i]",
            Self::Div => "x[i]/y[i]",
            Self::And => "x[i]&y[i]",
            Self::Or => "x[i]|y[i]",
            Self::Xor => "x[i]^y[i]",
            Self::Mod => "fmod(x[i], y[i])",
            Self::Eq => "x[i]==y[i]",
            Self::Ne => "x[i]!=y[i]",
            Self::Gt => "x[i]>y[i]",
            Self::Ge => "x[i]>=y[i]",
            Self::Lt => "x[i]<y[i]",
            Self::Le => "x[i]<=y[i]",
        }
    }

    /// Comparison over complex operands `x`, `y`: component equality for
    /// `eq`/`ne`, squared magnitude for the orderings.
    pub const fn complex_comparison(self) -> Option<&'static str> {
        Some(match self {
            Self::Eq => "(x[i].x==y[i].x)&&(x[i].y==y[i].y)",
            Self::Ne => "(x[i].x!=y[i].x)||(x[i].y!=y[i].y)",
            Self::Gt => "(x[i].x*x[i].x+x[i].y*x[i].y)>(y[i].x*y[i].x+y[i].y*y[i].y)",
            Self::Ge => "(x[i].x*x[i].x+x[i].y*x[i].y)>=(y[i].x*y[i].x+y[i].y*y[i].y)",
            Self::Lt => "(x[i].x*x[i].x+x[i].y*x[i].y)<(y[i].x*y[i].x+y[i].y*y[i].y)",
            Self::Le => "(x[i].x*x[i].x+x[i].y*x[i].y)<=(y[i].x*y[i].x+y[i].y*y[i].y)",
            _ => return None,
        })
    }

    /// Real and imaginary parts over complex operands `z`, `w`.
    #[rustfmt::skip]
    pub const fn complex_forms(self) -> Option<(&'static str, &'static str)> {
        Some(match self {
            Self::Add => ("z[i].x+w[i].x", "z[i].y+w[i].y"),
            Self::Sub => ("z[i].x-w[i].x", "z[i].y-w[i].y"),
            Self::Mult => ("z[i].x*w[i].x-z[i].y*w[i].y", "z[i].y*w[i].x+z[i].x*w[i].y"),
            Self::Div => (
                "(z[i].x*w[i].x+z[i].y*w[i].y)/(w[i].x*w[i].x+w[i].y*w[i].y)",
                "(z[i].y*w[i].x-z[i].x*w[i].y)/(w[i].x*w[i].x+w[i].y*w[i].y)",
            ),
            Self::Mod => ("fmod(z[i].x, w[i].x)", "fmod(z[i].y, w[i].y)"),
            _ => return None,
        })
    }

    /// Element type of the result for operands of type `ty`.
    pub const fn output_type(self, ty: ElemType) -> ElemType {
        if self.is_comparison() { ElemType::Byte } else { ty }
    }

    /// Whether a kernel for this operation can be built over `ty`.
    pub const fn supports(self, ty: ElemType) -> bool {
        match self {
            Self::And | Self::Or | Self::Xor => ty.is_int(),
            Self::Mod => !ty.is_int(),
            _ => true,
        }
    }
}
