/// Buffer - Vulkan implementation of the engine Buffer trait

use ash::vk;
use flipchain_engine::engine_error;
use flipchain_engine::flipchain::device::{Buffer as EngineBuffer, BufferDesc, MemoryResidency};
use flipchain_engine::flipchain::{Error, Result};
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, SOURCE};
use crate::vulkan_format::{buffer_usage_to_vk, memory_location};

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    size: u64,
    residency: MemoryResidency,
}

impl Buffer {
    /// Create a buffer and bind it to freshly allocated memory of the
    /// requested residency
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("buffer '{}' has zero size", desc.name)));
        }

        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx
                .device
                .create_buffer(&buffer_create_info, None)
                .map_err(|e| ctx.vk_error("vkCreateBuffer", e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: &desc.name,
                        requirements,
                        location: memory_location(desc.residency),
                        linear: true,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!(ctx.log, SOURCE, "Out of GPU memory for buffer '{}' (required: {:.2} MB)", desc.name, size_mb);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            // From here on Drop releases both the buffer and its memory
            let created = Self {
                ctx: Arc::clone(ctx),
                buffer,
                allocation: Some(allocation),
                size: desc.size,
                residency: desc.residency,
            };

            if let Some(allocation) = &created.allocation {
                ctx.device
                    .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                    .map_err(|e| ctx.vk_error("vkBindBufferMemory", e))?;
            }

            Ok(created)
        }
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::InvalidResource(format!(
                "range {}..{} is outside of a {} byte buffer",
                offset,
                offset.saturating_add(len),
                self.size
            ))),
        }
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        let allocation = self
            .allocation
            .as_ref()
            .ok_or_else(|| Error::BackendError("Buffer has no allocation".to_string()))?;
        allocation
            .mapped_ptr()
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| Error::InvalidResource("buffer is not CPU-accessible".to_string()))
    }
}

impl EngineBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn residency(&self) -> MemoryResidency {
        self.residency
    }

    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.residency.is_cpu_visible() {
            return Err(Error::InvalidResource("cannot write into a device-local buffer".to_string()));
        }
        self.check_range(offset, data.len() as u64)?;
        let mapped = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        if !self.residency.is_cpu_visible() {
            return Err(Error::InvalidResource("cannot read from a device-local buffer".to_string()));
        }
        self.check_range(offset, len)?;
        let mapped = self.mapped_ptr()?;
        let mut data = vec![0u8; len as usize];
        unsafe {
            std::ptr::copy_nonoverlapping(mapped.add(offset as usize), data.as_mut_ptr(), data.len());
        }
        Ok(data)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
