use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// OpenCL status codes reported for failures detected on the host side.
pub mod status {
    pub const BUILD_PROGRAM_FAILURE: i32 = -11;
    pub const INVALID_VALUE: i32 = -30;
    pub const INVALID_DEVICE: i32 = -33;
    pub const INVALID_MEM_OBJECT: i32 = -38;
    pub const INVALID_ARG_VALUE: i32 = -50;
    pub const INVALID_BUFFER_SIZE: i32 = -61;
    pub const INVALID_KERNEL_ARGS: i32 = -52;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("no OpenCL platforms found"))]
    NoPlatformsFound,

    /// Selected platform (or, when scanning for a GPU, every platform) has no matching device.
    #[snafu(display("no matching devices found on platform {platform:?}"))]
    NoDevicesFound { platform: Option<usize> },

    #[snafu(display("invalid platform index {index}, {count} platforms available"))]
    InvalidPlatformIndex { index: usize, count: usize },

    #[snafu(display("invalid device index {index}, {count} devices available"))]
    InvalidDeviceIndex { index: usize, count: usize },

    /// Platform or device information query failed.
    #[snafu(display("failed to query {what}: status {status}"))]
    DeviceQueryFailed { what: String, status: i32 },

    /// Kernel build failed; `log` holds the device build log.
    #[snafu(display("failed to build kernel '{name}':\n{log}"))]
    CompileFailed { name: String, log: String },

    #[snafu(display("failed to allocate {bytes} bytes: status {status}"))]
    AllocationFailed { bytes: usize, status: i32 },

    /// Invalid buffer view parameters.
    #[snafu(display("invalid view: offset {offset} + size {size} exceeds buffer size {buffer_size}"))]
    InvalidView { offset: usize, size: usize, buffer_size: usize },

    #[snafu(display("size mismatch: expected {expected}, got {actual}"))]
    SizeMismatch { expected: usize, actual: usize },

    /// Host/device transfer failed.
    #[snafu(display("{what} failed: status {status}"))]
    Transfer { what: &'static str, status: i32 },

    /// Enqueueing or waiting on a kernel failed.
    #[snafu(display("launch of kernel '{name}' failed: status {status}"))]
    Launch { name: String, status: i32 },

    /// Kernel arguments do not fit the program.
    #[snafu(display("invalid arguments for kernel '{name}': {reason}"))]
    ArgumentMismatch { name: String, reason: String },
}

impl Error {
    /// Numeric status for callers that report failures as codes.
    pub fn status_code(&self) -> i32 {
        match self {
            Self::NoPlatformsFound => -1,
            Self::NoDevicesFound { .. } => -2,
            Self::InvalidPlatformIndex { .. } => -7,
            Self::InvalidDeviceIndex { .. } => status::INVALID_DEVICE,
            Self::CompileFailed { .. } => status::BUILD_PROGRAM_FAILURE,
            Self::InvalidView { .. } | Self::SizeMismatch { .. } => status::INVALID_VALUE,
            Self::ArgumentMismatch { .. } => status::INVALID_KERNEL_ARGS,
            Self::DeviceQueryFailed { status, .. }
            | Self::AllocationFailed { status, .. }
            | Self::Transfer { status, .. }
            | Self::Launch { status, .. } => *status,
        }
    }
}
