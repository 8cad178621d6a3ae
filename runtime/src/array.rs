//! Device array handles.

use std::fmt;

use clarray_device::DeviceBuffer;
use clarray_dtype::ElemType;
use smallvec::SmallVec;
use snafu::{OptionExt, ensure};

use crate::error::{InvalidShapeSnafu, NullHandleSnafu, RankTooLargeSnafu, Result};

/// Maximum number of dimensions of an array.
pub const MAX_RANK: usize = 8;

pub type Shape = SmallVec<[usize; MAX_RANK]>;

/// Check that `dims` describes a non-empty array of at most [`MAX_RANK`]
/// dimensions whose element count fits in `usize`.
pub fn validate_shape(dims: &[usize]) -> Result<Shape> {
    ensure!(dims.len() <= MAX_RANK, RankTooLargeSnafu { rank: dims.len() });
    let shape = Shape::from_slice(dims);
    let count = shape.iter().try_fold(1usize, |acc, &d| if d == 0 { None } else { acc.checked_mul(d) });
    ensure!(!shape.is_empty() && count.is_some(), InvalidShapeSnafu { shape });
    Ok(shape)
}

/// Validated shape of `dims` and the byte size of a `ty` array of that shape.
pub fn validate_layout(dims: &[usize], ty: ElemType) -> Result<(Shape, usize)> {
    let shape = validate_shape(dims)?;
    let bytes = shape.iter().product::<usize>().checked_mul(ty.bytes());
    let Some(bytes) = bytes else {
        return InvalidShapeSnafu { shape }.fail();
    };
    Ok((shape, bytes))
}

/// Handle to an array resident on the session's device.
///
/// Clones share the buffer. Views hold their own reference to the storage
/// they alias, so releasing a view never affects its parent and releasing the
/// parent never invalidates the view.
#[derive(Debug, Clone)]
pub struct DeviceArray {
    /// `None` once released.
    ty: Option<ElemType>,
    shape: Shape,
    buffer: Option<DeviceBuffer>,
    view: bool,
    /// Session generation that allocated the buffer.
    generation: u64,
}

impl DeviceArray {
    pub(crate) fn new(ty: ElemType, shape: Shape, buffer: DeviceBuffer, generation: u64) -> Self {
        let view = buffer.is_view();
        Self { ty: Some(ty), shape, buffer: Some(buffer), view, generation }
    }

    pub fn elem_type(&self) -> Option<ElemType> {
        self.ty
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Product of the shape, 0 once released.
    pub fn element_count(&self) -> usize {
        if self.shape.is_empty() { 0 } else { self.shape.iter().product() }
    }

    pub fn byte_size(&self) -> usize {
        self.ty.map_or(0, |ty| ty.bytes() * self.element_count())
    }

    pub fn is_view(&self) -> bool {
        self.view
    }

    pub fn is_released(&self) -> bool {
        self.buffer.is_none()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn buffer(&self) -> Option<&DeviceBuffer> {
        self.buffer.as_ref()
    }

    /// Element type and buffer of a live handle.
    pub(crate) fn parts(&self) -> Result<(ElemType, &DeviceBuffer)> {
        let ty = self.ty.context(NullHandleSnafu)?;
        let buffer = self.buffer.as_ref().context(NullHandleSnafu)?;
        Ok((ty, buffer))
    }

    pub(crate) fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Drop the buffer reference and clear the metadata.
    ///
    /// Returns whether the handle was live.
    pub(crate) fn retire(&mut self) -> bool {
        let live = self.buffer.take().is_some();
        self.ty = None;
        self.shape.clear();
        live
    }

    /// Shape, type and size summary.
    pub fn describe(&self) -> Result<ArrayInfo> {
        let (ty, _) = self.parts()?;
        Ok(ArrayInfo {
            shape: self.shape.clone(),
            rank: self.rank(),
            elem_type: ty,
            type_code: ty.code(),
            type_name: ty.name(),
            element_count: self.element_count(),
            is_view: self.view,
        })
    }

    /// `[rank, dims..., type code, element count]`.
    pub fn size_vector(&self) -> Result<Vec<usize>> {
        let info = self.describe()?;
        let mut out = Vec::with_capacity(info.rank + 3);
        out.push(info.rank);
        out.extend_from_slice(&info.shape);
        out.push(info.type_code as usize);
        out.push(info.element_count);
        Ok(out)
    }

    /// One help line: the padded variable name followed by the type and dimensions.
    pub fn help_line(&self, name: &str) -> String {
        let type_name = self.ty.map_or("UNDEFINED", ElemType::name);
        format!("{name:<16.16}CL_{type_name:<6.6} = {}", Dims(&self.shape))
    }
}

struct Dims<'a>(&'a [usize]);

impl fmt::Display for Dims<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for DeviceArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            Some(ty) => write!(f, "CL_{} = {}", ty.name(), Dims(&self.shape)),
            None => write!(f, "CL_UNDEFINED = <released>"),
        }
    }
}

/// Introspection record of a live array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInfo {
    pub shape: Shape,
    pub rank: usize,
    pub elem_type: ElemType,
    pub type_code: u8,
    pub type_name: &'static str,
    pub element_count: usize,
    pub is_view: bool,
}
