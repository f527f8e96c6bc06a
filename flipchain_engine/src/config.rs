//! Renderer configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::graphics_device::{TextureFormat, VertexLayout};

/// Renderer configuration
///
/// Plain data with sensible defaults: a double-buffered surface, vsync on,
/// validation in debug builds and the two SPIR-V shaders loaded from
/// `shaders/` relative to the working directory.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name reported to the backend
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Enable backend validation layers (if compiled in)
    pub enable_validation: bool,
    /// Number of swapchain backbuffers
    pub buffer_count: u32,
    /// Present with vertical sync (sync interval 1) or immediately (0)
    pub vsync: bool,
    /// Backbuffer clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Depth buffer format
    pub depth_format: TextureFormat,
    /// Precompiled vertex shader
    pub vertex_shader_path: PathBuf,
    /// Precompiled fragment shader
    pub fragment_shader_path: PathBuf,
    /// Vertex input layout baked into the pipeline
    pub vertex_layout: VertexLayout,
    /// Upper bound for any CPU wait on the frame fence
    pub fence_timeout: Duration,
}

impl RendererConfig {
    /// Present sync interval derived from `vsync`
    pub fn sync_interval(&self) -> u32 {
        if self.vsync { 1 } else { 0 }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Flipchain Application".to_string(),
            app_version: (1, 0, 0),
            enable_validation: cfg!(debug_assertions),
            buffer_count: 2,
            vsync: true,
            clear_color: [0.0, 0.2, 0.4, 1.0],
            depth_format: TextureFormat::D32_FLOAT,
            vertex_shader_path: PathBuf::from("shaders/vertex.spv"),
            fragment_shader_path: PathBuf::from("shaders/fragment.spv"),
            vertex_layout: VertexLayout::position_color(),
            fence_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
