//! Mesh description, GPU-resident mesh buffers and ready-made vertex types

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::Result;
use crate::graphics_device::{
    Buffer, CommandList, GraphicsFormat, IndexBufferView, VertexBufferView, VertexLayout,
};

/// Position + RGBA color (28 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPC {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Position + normal + texture coordinates (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPNUV {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side geometry handed to the upload
///
/// `index_count == 0` means the mesh is drawn without an index buffer and
/// `index_data`/`index_format` are ignored.
#[derive(Debug, Clone)]
pub struct MeshDesc<'a> {
    pub vertex_data: &'a [u8],
    pub vertex_count: u32,
    pub vertex_stride: u32,
    pub input_layout: VertexLayout,
    pub index_data: Option<&'a [u8]>,
    pub index_count: u32,
    pub index_format: GraphicsFormat,
}

impl<'a> MeshDesc<'a> {
    /// Describe a non-indexed mesh from typed vertices
    pub fn from_vertices<V: Pod>(vertices: &'a [V], input_layout: VertexLayout) -> Self {
        Self {
            vertex_data: bytemuck::cast_slice(vertices),
            vertex_count: vertices.len() as u32,
            vertex_stride: std::mem::size_of::<V>() as u32,
            input_layout,
            index_data: None,
            index_count: 0,
            index_format: GraphicsFormat::R16_UINT,
        }
    }

    /// Attach 16-bit indices
    pub fn with_indices_u16(mut self, indices: &'a [u16]) -> Self {
        self.index_data = Some(bytemuck::cast_slice(indices));
        self.index_count = indices.len() as u32;
        self.index_format = GraphicsFormat::R16_UINT;
        self
    }

    /// Attach 32-bit indices
    pub fn with_indices_u32(mut self, indices: &'a [u32]) -> Self {
        self.index_data = Some(bytemuck::cast_slice(indices));
        self.index_count = indices.len() as u32;
        self.index_format = GraphicsFormat::R32_UINT;
        self
    }

    /// Exact byte size of the vertex data
    pub fn vertex_bytes(&self) -> u64 {
        self.vertex_count as u64 * self.vertex_stride as u64
    }

    /// Exact byte size of the index data (0 when non-indexed)
    pub fn index_bytes(&self) -> u64 {
        self.index_count as u64 * self.index_format.size_bytes() as u64
    }
}

/// Device-local vertex buffer, optional index buffer and their binding views
///
/// Buffers are in `VertexBuffer` / `IndexBuffer` state once the upload that
/// produced them has executed.
pub struct MeshBufferPair {
    vertex_view: VertexBufferView,
    index_view: Option<IndexBufferView>,
    vertex_count: u32,
    index_count: u32,
    input_layout: VertexLayout,
}

/// Shared handle to an uploaded mesh
pub type MeshHandle = Arc<MeshBufferPair>;

impl MeshBufferPair {
    pub(crate) fn new(
        vertex_view: VertexBufferView,
        index_view: Option<IndexBufferView>,
        vertex_count: u32,
        index_count: u32,
        input_layout: VertexLayout,
    ) -> Self {
        Self {
            vertex_view,
            index_view,
            vertex_count,
            index_count,
            input_layout,
        }
    }

    pub fn vertex_buffer(&self) -> &Arc<dyn Buffer> {
        &self.vertex_view.buffer
    }

    pub fn index_buffer(&self) -> Option<&Arc<dyn Buffer>> {
        self.index_view.as_ref().map(|v| &v.buffer)
    }

    pub fn vertex_view(&self) -> &VertexBufferView {
        &self.vertex_view
    }

    pub fn index_view(&self) -> Option<&IndexBufferView> {
        self.index_view.as_ref()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn input_layout(&self) -> &VertexLayout {
        &self.input_layout
    }

    pub fn is_indexed(&self) -> bool {
        self.index_view.is_some()
    }

    /// Bind the views and record one draw: indexed when an index buffer
    /// exists, plain vertex draw otherwise
    pub fn draw(&self, cmd: &mut dyn CommandList) -> Result<()> {
        cmd.bind_vertex_buffer(&self.vertex_view)?;
        match &self.index_view {
            Some(index_view) => {
                cmd.bind_index_buffer(index_view)?;
                cmd.draw_indexed(self.index_count, 0, 0)
            }
            None => cmd.draw(self.vertex_count, 0),
        }
    }
}

/// Upload-visible buffers backing an in-flight upload
///
/// Must outlive the GPU copy that reads them.
pub struct StagingBuffers {
    buffers: Vec<Arc<dyn Buffer>>,
}

impl StagingBuffers {
    pub(crate) fn new(buffers: Vec<Arc<dyn Buffer>>) -> Self {
        Self { buffers }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn into_buffers(self) -> Vec<Arc<dyn Buffer>> {
        self.buffers
    }
}

/// Result of [`GeometryUpload::upload`](crate::geometry::GeometryUpload::upload)
pub struct UploadedMesh {
    pub mesh: MeshBufferPair,
    pub staging: StagingBuffers,
}
