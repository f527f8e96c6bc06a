//! Command list trait and the structures recorded into it

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    Buffer, DepthStencilView, GraphicsFormat, Pipeline, RenderTargetView, ResourceBarrier,
};

/// Viewport transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering a full `width` x `height` target
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer rectangle (scissor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Binding description of a vertex buffer
#[derive(Clone)]
pub struct VertexBufferView {
    pub buffer: Arc<dyn Buffer>,
    /// Bytes visible through the view
    pub size: u64,
    /// Bytes between consecutive vertices
    pub stride: u32,
}

/// Binding description of an index buffer
#[derive(Clone)]
pub struct IndexBufferView {
    pub buffer: Arc<dyn Buffer>,
    /// Bytes visible through the view
    pub size: u64,
    /// R16_UINT or R32_UINT
    pub format: GraphicsFormat,
}

/// Attachments and clear values for a rendering scope
pub struct RenderingDesc<'a> {
    pub color: &'a dyn RenderTargetView,
    pub depth: Option<&'a dyn DepthStencilView>,
    pub clear_color: [f32; 4],
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// Command list for recording GPU commands
///
/// A command list is created closed. `reset` reopens it for recording,
/// `close` ends recording so it can be submitted. Recording into a closed
/// list is an error.
pub trait CommandList: Send {
    /// Reopen the list for recording, optionally with an initial pipeline bound
    fn reset(&mut self, pipeline: Option<&dyn Pipeline>) -> Result<()>;

    /// Finish recording
    fn close(&mut self) -> Result<()>;

    /// Whether the list is open for recording
    fn is_recording(&self) -> bool;

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: &Rect2D) -> Result<()>;

    /// Record state transitions, all in one batch
    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()>;

    /// Bind color (and depth) attachments and clear them
    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()>;

    fn end_rendering(&mut self) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &dyn Pipeline) -> Result<()>;

    fn bind_vertex_buffer(&mut self, view: &VertexBufferView) -> Result<()>;

    fn bind_index_buffer(&mut self, view: &IndexBufferView) -> Result<()>;

    /// Non-indexed draw
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()>;

    /// Indexed draw
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;

    /// Copy `size` bytes from the start of `src` to the start of `dst`
    fn copy_buffer(&mut self, src: &dyn Buffer, dst: &dyn Buffer, size: u64) -> Result<()>;
}
