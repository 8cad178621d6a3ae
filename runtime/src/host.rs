//! Host-side array values exchanged with [`crate::Engine::upload`] and
//! [`crate::Engine::download`].

use clarray_dtype::{ElemType, HasElemType};
use snafu::ensure;

use crate::array::{Shape, validate_layout};
use crate::error::{ArgumentSnafu, Result, TypeMismatchSnafu};

/// Typed array in host memory, stored as little-endian element bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    ty: ElemType,
    shape: Shape,
    data: Vec<u8>,
}

impl HostArray {
    /// Wrap raw element bytes.
    pub fn from_bytes(ty: ElemType, dims: &[usize], data: Vec<u8>) -> Result<Self> {
        let (shape, expected) = validate_layout(dims, ty)?;
        ensure!(
            data.len() == expected,
            ArgumentSnafu { reason: format!("{} bytes given for a {ty} array of {expected} bytes", data.len()) }
        );
        Ok(Self { ty, shape, data })
    }

    pub fn from_slice<T: HasElemType>(dims: &[usize], values: &[T]) -> Result<Self> {
        Self::from_bytes(T::ELEM_TYPE, dims, bytemuck::cast_slice(values).to_vec())
    }

    /// One-dimensional array of `values`.
    pub fn from_vec<T: HasElemType>(values: Vec<T>) -> Result<Self> {
        Self::from_slice(&[values.len()], &values)
    }

    pub fn elem_type(&self) -> ElemType {
        self.ty
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy the elements out as `T`, which must match the element type.
    pub fn to_vec<T: HasElemType>(&self) -> Result<Vec<T>> {
        ensure!(T::ELEM_TYPE == self.ty, TypeMismatchSnafu { lhs: self.ty, rhs: T::ELEM_TYPE });
        Ok(bytemuck::pod_collect_to_vec(&self.data))
    }

    /// Element at linear `index`, `None` when out of range or of another type.
    pub fn get<T: HasElemType>(&self, index: usize) -> Option<T> {
        if T::ELEM_TYPE != self.ty {
            return None;
        }
        let size = self.ty.bytes();
        let slot = self.data.get(index * size..(index + 1) * size)?;
        Some(bytemuck::pod_read_unaligned(slot))
    }
}
