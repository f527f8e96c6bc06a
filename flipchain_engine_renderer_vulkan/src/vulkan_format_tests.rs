//! Unit tests for Vulkan format conversion functions
//!
//! Pure mappings, no GPU required.

use super::*;

// ============================================================================
// TEXTURE FORMATS
// ============================================================================

#[test]
fn test_texture_formats_round_trip_through_vk() {
    for format in [
        TextureFormat::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB,
        TextureFormat::D32_FLOAT,
        TextureFormat::D24_UNORM_S8_UINT,
    ] {
        assert_eq!(texture_format_from_vk(texture_format_to_vk(format)), Some(format));
    }
}

#[test]
fn test_unknown_surface_format_is_none() {
    assert_eq!(texture_format_from_vk(vk::Format::A2B10G10R10_UNORM_PACK32), None);
}

#[test]
fn test_swapped_channel_formats() {
    assert_eq!(swapped_channel_format(TextureFormat::R8G8B8A8_UNORM), Some(TextureFormat::B8G8R8A8_UNORM));
    assert_eq!(swapped_channel_format(TextureFormat::B8G8R8A8_SRGB), Some(TextureFormat::R8G8B8A8_SRGB));
    assert_eq!(swapped_channel_format(TextureFormat::D32_FLOAT), None);
}

#[test]
fn test_texture_aspects() {
    assert_eq!(texture_aspect(TextureFormat::R8G8B8A8_UNORM), vk::ImageAspectFlags::COLOR);
    assert_eq!(texture_aspect(TextureFormat::D32_FLOAT), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        texture_aspect(TextureFormat::D24_UNORM_S8_UINT),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

// ============================================================================
// VERTEX AND INDEX FORMATS
// ============================================================================

#[test]
fn test_vertex_formats() {
    assert_eq!(vertex_format_to_vk(GraphicsFormat::R32G32B32_FLOAT), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(vertex_format_to_vk(GraphicsFormat::R32G32B32A32_FLOAT), vk::Format::R32G32B32A32_SFLOAT);
    assert_eq!(vertex_format_to_vk(GraphicsFormat::R32G32_FLOAT), vk::Format::R32G32_SFLOAT);
    assert_eq!(vertex_format_to_vk(GraphicsFormat::R8G8B8A8_UNORM_SRGB), vk::Format::R8G8B8A8_SRGB);
}

#[test]
fn test_index_types() {
    assert_eq!(index_type_to_vk(GraphicsFormat::R16_UINT), Some(vk::IndexType::UINT16));
    assert_eq!(index_type_to_vk(GraphicsFormat::R32_UINT), Some(vk::IndexType::UINT32));
    assert_eq!(index_type_to_vk(GraphicsFormat::R32_FLOAT), None);
}

// ============================================================================
// BUFFERS
// ============================================================================

#[test]
fn test_memory_locations() {
    assert_eq!(memory_location(MemoryResidency::UploadVisible), MemoryLocation::CpuToGpu);
    assert_eq!(memory_location(MemoryResidency::DeviceLocal), MemoryLocation::GpuOnly);
    assert_eq!(memory_location(MemoryResidency::Readback), MemoryLocation::GpuToCpu);
}

#[test]
fn test_buffer_usage_flags() {
    assert_eq!(
        buffer_usage_to_vk(BufferUsage::VERTEX | BufferUsage::COPY_DST),
        vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST
    );
    assert_eq!(buffer_usage_to_vk(BufferUsage::COPY_SRC), vk::BufferUsageFlags::TRANSFER_SRC);
    assert_eq!(buffer_usage_to_vk(BufferUsage::empty()), vk::BufferUsageFlags::empty());
}

// ============================================================================
// PIPELINE STATE
// ============================================================================

#[test]
fn test_pipeline_state_mappings() {
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleList), vk::PrimitiveTopology::TRIANGLE_LIST);
    assert_eq!(topology_to_vk(PrimitiveTopology::LineList), vk::PrimitiveTopology::LINE_LIST);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
    assert_eq!(cull_mode_to_vk(CullMode::None), vk::CullModeFlags::NONE);
    assert_eq!(front_face_to_vk(FrontFace::Clockwise), vk::FrontFace::CLOCKWISE);
}

// ============================================================================
// RESOURCE STATES
// ============================================================================

#[test]
fn test_leaving_present_discards_contents() {
    let scope = state_scope(ResourceState::Present, true);
    assert_eq!(scope.layout, vk::ImageLayout::UNDEFINED);
    assert_eq!(scope.stage, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT);
    assert!(scope.access.is_empty());
}

#[test]
fn test_entering_present_uses_present_layout() {
    let scope = state_scope(ResourceState::Present, false);
    assert_eq!(scope.layout, vk::ImageLayout::PRESENT_SRC_KHR);
    assert_eq!(scope.stage, vk::PipelineStageFlags::BOTTOM_OF_PIPE);
}

#[test]
fn test_attachment_states() {
    let color = state_scope(ResourceState::RenderTarget, false);
    assert_eq!(color.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert!(color.access.contains(vk::AccessFlags::COLOR_ATTACHMENT_WRITE));

    let depth = state_scope(ResourceState::DepthWrite, false);
    assert_eq!(depth.layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    assert!(depth.stage.contains(vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS));
}

#[test]
fn test_copy_states_do_not_depend_on_side() {
    for state in [ResourceState::CopyDestination, ResourceState::CopySource, ResourceState::IndexBuffer] {
        assert_eq!(state_scope(state, true), state_scope(state, false));
    }
}
