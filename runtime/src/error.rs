//! Error types for the array engine.

use clarray_dtype::ElemType;
use smallvec::SmallVec;
use snafu::Snafu;

/// Result type for engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the array engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Driver or device failure.
    #[snafu(display("Device error: {source}"))]
    Device { source: clarray_device::Error },

    /// Kernel rendering rejected the request.
    #[snafu(display("Codegen error: {source}"))]
    Codegen { source: clarray_codegen::Error },

    /// A kernel parameter has the wrong kind.
    #[snafu(display("Incorrect type for parameter {position}: {reason}"))]
    IncorrectParamType { position: usize, reason: String },

    #[snafu(display("Incorrect number of parameters: expected {expected}, got {actual}"))]
    IncorrectParamCount { expected: usize, actual: usize },

    /// Element counts disagree.
    #[snafu(display("Shape mismatch: expected {expected} elements, got {actual}"))]
    ShapeMismatch { expected: usize, actual: usize },

    #[snafu(display("Type mismatch: {lhs} and {rhs}"))]
    TypeMismatch { lhs: ElemType, rhs: ElemType },

    /// The handle was released or never allocated.
    #[snafu(display("Operation on a released array"))]
    NullHandle,

    /// The handle was created by an earlier device session.
    #[snafu(display("Array from session generation {handle} used in generation {current}"))]
    StaleHandle { handle: u64, current: u64 },

    #[snafu(display("Rank {rank} exceeds the maximum of {}", crate::array::MAX_RANK))]
    RankTooLarge { rank: usize },

    /// Empty or zero-sized shape.
    #[snafu(display("Invalid shape {shape:?}"))]
    InvalidShape { shape: SmallVec<[usize; 8]> },

    #[snafu(display("Unknown entry point '{name}'"))]
    UnknownEntryPoint { name: String },

    /// Invalid argument value.
    #[snafu(display("Invalid argument: {reason}"))]
    ArgumentError { reason: String },
}

impl Error {
    /// Numeric status for callers that report failures as codes.
    ///
    /// Device failures keep the driver status; everything else maps to the
    /// codes of the host binding.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::Device { source } => source.status_code(),
            Self::Codegen { source: clarray_codegen::Error::ParameterMismatch { .. } } => -102,
            Self::Codegen { .. } | Self::UnknownEntryPoint { .. } | Self::ArgumentError { .. } => -1,
            Self::IncorrectParamCount { .. } => -4,
            Self::IncorrectParamType { .. } => -5,
            Self::ShapeMismatch { .. } | Self::TypeMismatch { .. } => -6,
            Self::RankTooLarge { .. } | Self::InvalidShape { .. } => -6,
            Self::NullHandle | Self::StaleHandle { .. } => -101,
        }
    }
}

impl From<clarray_device::Error> for Error {
    fn from(source: clarray_device::Error) -> Self {
        Self::Device { source }
    }
}

impl From<clarray_codegen::Error> for Error {
    fn from(source: clarray_codegen::Error) -> Self {
        Self::Codegen { source }
    }
}
