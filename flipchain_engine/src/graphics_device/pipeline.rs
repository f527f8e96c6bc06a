//! Graphics pipeline trait and descriptor

use crate::graphics_device::{TextureFormat, VertexLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
        }
    }
}

/// Single-target blend state (straight alpha blending when enabled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendState {
    pub blend_enable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
        }
    }
}

/// Everything needed to build an immutable graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// Precompiled vertex shader bytecode
    pub vertex_shader: Vec<u8>,
    /// Precompiled fragment shader bytecode
    pub fragment_shader: Vec<u8>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterizer: RasterizerState,
    pub blend: BlendState,
    pub depth_stencil: DepthStencilState,
    /// Format of the single color target
    pub color_format: TextureFormat,
    /// Format of the depth target, if any
    pub depth_format: Option<TextureFormat>,
}

/// Graphics pipeline trait
///
/// Immutable once created.
pub trait Pipeline: Send + Sync {
    /// Vertex stride baked into the input layout
    fn vertex_stride(&self) -> u32;
}
