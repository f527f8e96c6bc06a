//! Resource usage states and transition barriers

use crate::graphics_device::{Buffer, Texture};

/// Usage state of a GPU resource
///
/// A resource may only be used in the way its current state allows. Moving
/// between states requires a recorded [`ResourceBarrier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Target of a GPU copy
    CopyDestination,
    /// Source of a GPU copy
    CopySource,
    /// Bound as vertex buffer
    VertexBuffer,
    /// Bound as index buffer
    IndexBuffer,
    /// Written as color attachment
    RenderTarget,
    /// Written as depth attachment
    DepthWrite,
    /// Handed to the presentation engine
    Present,
}

/// Resource affected by a barrier
#[derive(Clone, Copy)]
pub enum BarrierResource<'a> {
    Buffer(&'a dyn Buffer),
    Texture(&'a dyn Texture),
}

/// State transition of a single resource
#[derive(Clone, Copy)]
pub struct ResourceBarrier<'a> {
    pub resource: BarrierResource<'a>,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl<'a> ResourceBarrier<'a> {
    pub fn buffer(buffer: &'a dyn Buffer, before: ResourceState, after: ResourceState) -> Self {
        Self { resource: BarrierResource::Buffer(buffer), before, after }
    }

    pub fn texture(texture: &'a dyn Texture, before: ResourceState, after: ResourceState) -> Self {
        Self { resource: BarrierResource::Texture(texture), before, after }
    }
}
