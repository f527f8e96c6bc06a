//! Buffer trait and buffer descriptor

use bitflags::bitflags;

use crate::error::Result;
use crate::graphics_device::ResourceState;

bitflags! {
    /// How a buffer may be used by the GPU
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Bound as a vertex buffer
        const VERTEX = 1 << 0;
        /// Bound as an index buffer
        const INDEX = 1 << 1;
        /// Source of a GPU copy
        const COPY_SRC = 1 << 2;
        /// Destination of a GPU copy
        const COPY_DST = 1 << 3;
    }
}

/// Memory class a buffer lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryResidency {
    /// CPU-writable, GPU-readable (staging)
    UploadVisible,
    /// GPU-only, fastest for the GPU, not CPU-accessible
    DeviceLocal,
    /// GPU-writable, CPU-readable
    Readback,
}

impl MemoryResidency {
    /// Whether the CPU may map this memory
    pub fn is_cpu_visible(self) -> bool {
        !matches!(self, MemoryResidency::DeviceLocal)
    }
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    /// Memory class
    pub residency: MemoryResidency,
    /// Usage state the buffer is created in
    pub initial_state: ResourceState,
    /// Allowed usages
    pub usage: BufferUsage,
    /// Debug name
    pub name: String,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g., the Vulkan `Buffer`).
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Size in bytes
    fn size(&self) -> u64;

    /// Memory class the buffer was created in
    fn residency(&self) -> MemoryResidency;

    /// Write CPU data into a CPU-visible buffer
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read `len` bytes back from a CPU-visible buffer
    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>>;
}
