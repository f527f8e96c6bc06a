//! Vertex/index element formats and vertex input layouts

/// Element format used by vertex attributes and index buffers
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsFormat {
    R32_FLOAT,
    R32G32_FLOAT,
    R32G32B32_FLOAT,
    R32G32B32A32_FLOAT,
    R8G8B8A8_UNORM,
    R8G8B8A8_UNORM_SRGB,
    R16_UINT,
    R32_UINT,
}

impl GraphicsFormat {
    /// Size of one element in bytes
    pub fn size_bytes(self) -> u32 {
        match self {
            GraphicsFormat::R32_FLOAT => 4,
            GraphicsFormat::R32G32_FLOAT => 8,
            GraphicsFormat::R32G32B32_FLOAT => 12,
            GraphicsFormat::R32G32B32A32_FLOAT => 16,
            GraphicsFormat::R8G8B8A8_UNORM | GraphicsFormat::R8G8B8A8_UNORM_SRGB => 4,
            GraphicsFormat::R16_UINT => 2,
            GraphicsFormat::R32_UINT => 4,
        }
    }

    /// Whether this format can describe an index buffer
    pub fn is_index_format(self) -> bool {
        matches!(self, GraphicsFormat::R16_UINT | GraphicsFormat::R32_UINT)
    }
}

/// One vertex attribute of an input layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    /// Semantic name ("POSITION", "COLOR", "TEXCOORD", ...)
    pub semantic: String,
    /// Semantic index (TEXCOORD0, TEXCOORD1, ...), also the shader location
    /// offset within the same semantic
    pub semantic_index: u32,
    /// Attribute format
    pub format: GraphicsFormat,
    /// Vertex buffer slot
    pub input_slot: u32,
    /// Byte offset inside the vertex
    pub offset: u32,
}

impl InputElement {
    pub fn new(semantic: &str, semantic_index: u32, format: GraphicsFormat, offset: u32) -> Self {
        Self {
            semantic: semantic.to_string(),
            semantic_index,
            format,
            input_slot: 0,
            offset,
        }
    }
}

/// Vertex input layout: ordered attributes plus the vertex stride
///
/// Attribute `i` is bound to shader location `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub elements: Vec<InputElement>,
    pub stride: u32,
}

impl VertexLayout {
    /// POSITION float3 + COLOR float4 (matches `VertexPC`, 28 bytes)
    pub fn position_color() -> Self {
        Self {
            elements: vec![
                InputElement::new("POSITION", 0, GraphicsFormat::R32G32B32_FLOAT, 0),
                InputElement::new("COLOR", 0, GraphicsFormat::R32G32B32A32_FLOAT, 12),
            ],
            stride: 28,
        }
    }

    /// POSITION float3 + NORMAL float3 + TEXCOORD float2 (matches `VertexPNUV`, 32 bytes)
    pub fn position_normal_uv() -> Self {
        Self {
            elements: vec![
                InputElement::new("POSITION", 0, GraphicsFormat::R32G32B32_FLOAT, 0),
                InputElement::new("NORMAL", 0, GraphicsFormat::R32G32B32_FLOAT, 12),
                InputElement::new("TEXCOORD", 0, GraphicsFormat::R32G32_FLOAT, 24),
            ],
            stride: 32,
        }
    }

    /// Smallest stride that holds every attribute
    pub fn packed_size(&self) -> u32 {
        self.elements
            .iter()
            .map(|e| e.offset + e.format.size_bytes())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
