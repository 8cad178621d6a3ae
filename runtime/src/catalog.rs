//! Named entry points of the host binding.
//!
//! Every constructor family is one row per element type instead of one
//! function per type. Names are matched case-insensitively, with or without
//! the `mg_cl_` prefix.

use std::str::FromStr;

use bon::bon;
use clarray_codegen::{BinaryOp, UnaryOp};
use clarray_dtype::ElemType;
use snafu::OptionExt;

use crate::array::DeviceArray;
use crate::engine::{Engine, InitMode};
use crate::error::{Result, UnknownEntryPointSnafu};

/// `(zero-filled constructor, index generator, element type)`.
pub const CONSTRUCTORS: [(&str, &str, ElemType); 11] = [
    ("bytarr", "bindgen", ElemType::Byte),
    ("intarr", "indgen", ElemType::Int16),
    ("lonarr", "lindgen", ElemType::Int32),
    ("fltarr", "findgen", ElemType::Float32),
    ("dblarr", "dindgen", ElemType::Float64),
    ("complexarr", "cindgen", ElemType::Complex64),
    ("dcomplexarr", "dcindgen", ElemType::Complex128),
    ("uintarr", "uindgen", ElemType::UInt16),
    ("ulonarr", "ulindgen", ElemType::UInt32),
    ("lon64arr", "l64indgen", ElemType::Int64),
    ("ulon64arr", "ul64indgen", ElemType::UInt64),
];

/// What a named entry point does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `*arr`: zero-filled unless `nozero` is requested.
    Array(ElemType),
    /// `*indgen`: index-filled.
    IndexGen(ElemType),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// Look up an entry point by name.
pub fn resolve(name: &str) -> Result<EntryPoint> {
    let lower = name.to_ascii_lowercase();
    let bare = lower.strip_prefix("mg_cl_").unwrap_or(&lower);

    CONSTRUCTORS
        .iter()
        .find_map(|&(array, indgen, ty)| {
            if bare == array {
                Some(EntryPoint::Array(ty))
            } else if bare == indgen {
                Some(EntryPoint::IndexGen(ty))
            } else {
                None
            }
        })
        .or_else(|| UnaryOp::from_str(bare).ok().map(EntryPoint::Unary))
        .or_else(|| BinaryOp::from_str(bare).ok().map(EntryPoint::Binary))
        .context(UnknownEntryPointSnafu { name })
}

fn unknown<T>(name: &str) -> Result<T> {
    UnknownEntryPointSnafu { name }.fail()
}

impl Engine {
    /// Call a named constructor such as `fltarr` or `lindgen`.
    pub fn construct_named(&mut self, name: &str, dims: &[usize], nozero: bool) -> Result<DeviceArray> {
        match resolve(name)? {
            EntryPoint::Array(ty) => {
                let init = if nozero { InitMode::Uninitialized } else { InitMode::Zero };
                self.construct(ty, dims, init)
            }
            EntryPoint::IndexGen(ty) => self.construct(ty, dims, InitMode::Index),
            EntryPoint::Unary(_) | EntryPoint::Binary(_) => unknown(name),
        }
    }

    /// Call a named unary operation such as `sqrt`.
    pub fn unary_named(&mut self, name: &str, input: &DeviceArray, output: Option<DeviceArray>) -> Result<DeviceArray> {
        match resolve(name)? {
            EntryPoint::Unary(op) => self.apply_unary(op, input, output),
            _ => unknown(name),
        }
    }

    /// Call a named binary operation such as `add` or `gt`.
    pub fn binary_named(
        &mut self,
        name: &str,
        lhs: &DeviceArray,
        rhs: &DeviceArray,
        output: Option<DeviceArray>,
    ) -> Result<DeviceArray> {
        match resolve(name)? {
            EntryPoint::Binary(op) => self.apply_binary(op, lhs, rhs, output),
            _ => unknown(name),
        }
    }
}

#[bon]
impl Engine {
    /// Generic constructor: float32 and zero-filled unless told otherwise.
    /// `index` takes precedence over `nozero`.
    #[builder]
    pub fn make_array(
        &mut self,
        #[builder(start_fn)] dims: &[usize],
        #[builder(default = ElemType::Float32)] ty: ElemType,
        #[builder(default)] index: bool,
        #[builder(default)] nozero: bool,
    ) -> Result<DeviceArray> {
        let init = match (index, nozero) {
            (true, _) => InitMode::Index,
            (false, true) => InitMode::Uninitialized,
            (false, false) => InitMode::Zero,
        };
        self.construct(ty, dims, init)
    }
}
