/// Conversions between engine descriptors and Vulkan enums

use ash::vk;
use flipchain_engine::flipchain::device::{
    BufferUsage, CullMode, FrontFace, GraphicsFormat, MemoryResidency, PrimitiveTopology,
    ResourceState, TextureFormat,
};
use gpu_allocator::MemoryLocation;

pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
    }
}

/// Reverse mapping for formats reported by the surface
pub(crate) fn texture_format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        _ => None,
    }
}

/// Same channels in the other byte order (RGBA <-> BGRA)
pub(crate) fn swapped_channel_format(format: TextureFormat) -> Option<TextureFormat> {
    match format {
        TextureFormat::R8G8B8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        TextureFormat::R8G8B8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        TextureFormat::B8G8R8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        TextureFormat::B8G8R8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        _ => None,
    }
}

pub(crate) fn texture_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    match format {
        TextureFormat::D32_FLOAT => vk::ImageAspectFlags::DEPTH,
        TextureFormat::D24_UNORM_S8_UINT => vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

pub(crate) fn vertex_format_to_vk(format: GraphicsFormat) -> vk::Format {
    match format {
        GraphicsFormat::R32_FLOAT => vk::Format::R32_SFLOAT,
        GraphicsFormat::R32G32_FLOAT => vk::Format::R32G32_SFLOAT,
        GraphicsFormat::R32G32B32_FLOAT => vk::Format::R32G32B32_SFLOAT,
        GraphicsFormat::R32G32B32A32_FLOAT => vk::Format::R32G32B32A32_SFLOAT,
        GraphicsFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        GraphicsFormat::R8G8B8A8_UNORM_SRGB => vk::Format::R8G8B8A8_SRGB,
        GraphicsFormat::R16_UINT => vk::Format::R16_UINT,
        GraphicsFormat::R32_UINT => vk::Format::R32_UINT,
    }
}

/// Index type for an index buffer format, `None` if the format cannot index
pub(crate) fn index_type_to_vk(format: GraphicsFormat) -> Option<vk::IndexType> {
    match format {
        GraphicsFormat::R16_UINT => Some(vk::IndexType::UINT16),
        GraphicsFormat::R32_UINT => Some(vk::IndexType::UINT32),
        _ => None,
    }
}

pub(crate) fn memory_location(residency: MemoryResidency) -> MemoryLocation {
    match residency {
        MemoryResidency::UploadVisible => MemoryLocation::CpuToGpu,
        MemoryResidency::DeviceLocal => MemoryLocation::GpuOnly,
        MemoryResidency::Readback => MemoryLocation::GpuToCpu,
    }
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::COPY_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::COPY_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    flags
}

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

/// Synchronization scope of a resource state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StateScope {
    pub access: vk::AccessFlags,
    pub stage: vk::PipelineStageFlags,
    pub layout: vk::ImageLayout,
}

/// Scope of `state` on one side of a barrier
///
/// `Present` has no access of its own: as a source it waits on the stage the
/// acquire semaphore unblocks, as a destination it releases at the end of the
/// pipe. Leaving `Present` discards the previous contents.
pub(crate) fn state_scope(state: ResourceState, as_source: bool) -> StateScope {
    match state {
        ResourceState::CopyDestination => StateScope {
            access: vk::AccessFlags::TRANSFER_WRITE,
            stage: vk::PipelineStageFlags::TRANSFER,
            layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        },
        ResourceState::CopySource => StateScope {
            access: vk::AccessFlags::TRANSFER_READ,
            stage: vk::PipelineStageFlags::TRANSFER,
            layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        },
        ResourceState::VertexBuffer => StateScope {
            access: vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            stage: vk::PipelineStageFlags::VERTEX_INPUT,
            layout: vk::ImageLayout::GENERAL,
        },
        ResourceState::IndexBuffer => StateScope {
            access: vk::AccessFlags::INDEX_READ,
            stage: vk::PipelineStageFlags::VERTEX_INPUT,
            layout: vk::ImageLayout::GENERAL,
        },
        ResourceState::RenderTarget => StateScope {
            access: vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        },
        ResourceState::DepthWrite => StateScope {
            access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
            layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        },
        ResourceState::Present if as_source => StateScope {
            access: vk::AccessFlags::empty(),
            stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            layout: vk::ImageLayout::UNDEFINED,
        },
        ResourceState::Present => StateScope {
            access: vk::AccessFlags::empty(),
            stage: vk::PipelineStageFlags::BOTTOM_OF_PIPE,
            layout: vk::ImageLayout::PRESENT_SRC_KHR,
        },
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
