use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{InvalidViewSnafu, Result, SizeMismatchSnafu};

/// Backend storage behind a [`DeviceBuffer`].
///
/// Views hold their own `RawBuffer` that keeps the parent storage alive, so
/// releasing either side never frees memory the other still references.
pub enum RawBuffer {
    Host {
        data: Arc<RwLock<Box<[u8]>>>,
        /// Byte offset into `data`.
        offset: usize,
    },
    #[cfg(feature = "opencl")]
    OpenCl {
        /// Writers take the lock exclusively, kernel launches share it.
        buffer: RwLock<opencl3::memory::Buffer<u8>>,
        /// Byte offset into the root allocation.
        origin: usize,
        /// Root allocation of a sub-buffer.
        parent: Option<Arc<RawBuffer>>,
    },
}

impl std::fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host { offset, .. } => f.debug_struct("Host").field("offset", offset).finish_non_exhaustive(),
            #[cfg(feature = "opencl")]
            Self::OpenCl { origin, parent, .. } => {
                f.debug_struct("OpenCl").field("origin", origin).field("view", &parent.is_some()).finish_non_exhaustive()
            }
        }
    }
}

// SAFETY: OpenCL memory objects are reference-counted handles that the
// runtime allows to be used from any host thread.
#[cfg(feature = "opencl")]
unsafe impl Send for RawBuffer {}
#[cfg(feature = "opencl")]
unsafe impl Sync for RawBuffer {}

/// A device allocation or a view into one.
#[derive(Debug, Clone)]
pub struct DeviceBuffer {
    raw: Arc<RawBuffer>,
    /// Size in bytes.
    size: usize,
    view: bool,
}

impl DeviceBuffer {
    pub fn new(raw: RawBuffer, size: usize) -> Self {
        Self { raw: Arc::new(raw), size, view: false }
    }

    /// Wrap backend storage that aliases part of another buffer.
    pub fn new_view(raw: RawBuffer, size: usize) -> Self {
        Self { raw: Arc::new(raw), size, view: true }
    }

    /// Zero-filled host memory of `size` bytes.
    pub fn host(size: usize) -> Self {
        Self::host_from(vec![0; size])
    }

    pub fn host_from(data: Vec<u8>) -> Self {
        let size = data.len();
        Self::new(RawBuffer::Host { data: Arc::new(RwLock::new(data.into_boxed_slice())), offset: 0 }, size)
    }

    /// Host view of `size` bytes at byte `offset`.
    pub fn host_view(&self, offset: usize, size: usize) -> Result<Option<Self>> {
        self.check_view(offset, size)?;
        match &*self.raw {
            RawBuffer::Host { data, offset: base } => {
                let raw = RawBuffer::Host { data: Arc::clone(data), offset: base + offset };
                Ok(Some(Self::new_view(raw, size)))
            }
            #[cfg(feature = "opencl")]
            _ => Ok(None),
        }
    }

    pub fn check_view(&self, offset: usize, size: usize) -> Result<()> {
        if offset.checked_add(size).is_none_or(|end| end > self.size) {
            return InvalidViewSnafu { offset, size, buffer_size: self.size }.fail();
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_view(&self) -> bool {
        self.view
    }

    pub fn raw(&self) -> &RawBuffer {
        &self.raw
    }

    /// Shared handle to the backing storage.
    pub fn storage(&self) -> &Arc<RawBuffer> {
        &self.raw
    }

    /// Root allocation this buffer aliases, itself when it is not a view.
    #[cfg(feature = "opencl")]
    pub fn root(&self) -> &Arc<RawBuffer> {
        match &*self.raw {
            RawBuffer::OpenCl { parent: Some(parent), .. } => parent,
            _ => &self.raw,
        }
    }

    /// Snapshot of host-resident contents, or `None` for device memory.
    pub fn host_read(&self) -> Option<Vec<u8>> {
        match &*self.raw {
            RawBuffer::Host { data, offset } => Some(data.read()[*offset..*offset + self.size].to_vec()),
            #[cfg(feature = "opencl")]
            _ => None,
        }
    }

    /// Overwrite host-resident contents. Returns `Ok(false)` for device memory.
    pub fn host_write(&self, src: &[u8]) -> Result<bool> {
        snafu::ensure!(src.len() == self.size, SizeMismatchSnafu { expected: self.size, actual: src.len() });
        match &*self.raw {
            RawBuffer::Host { data, offset } => {
                data.write()[*offset..*offset + self.size].copy_from_slice(src);
                Ok(true)
            }
            #[cfg(feature = "opencl")]
            _ => Ok(false),
        }
    }

    /// Whether both handles share backing storage.
    pub fn shares_storage(&self, other: &Self) -> bool {
        match (&*self.raw, &*other.raw) {
            (RawBuffer::Host { data: a, .. }, RawBuffer::Host { data: b, .. }) => Arc::ptr_eq(a, b),
            #[cfg(feature = "opencl")]
            _ => Arc::ptr_eq(self.root(), other.root()),
        }
    }
}
