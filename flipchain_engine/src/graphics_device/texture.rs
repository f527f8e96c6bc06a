//! Texture trait, render-target and depth-stencil views

use crate::graphics_device::ResourceState;

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Whether the format holds depth data
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }
}

/// Descriptor for creating a 2D texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    /// State the texture is in once creation returns
    pub initial_state: ResourceState,
    /// Debug name
    pub name: String,
}

/// Texture resource trait
pub trait Texture: Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> TextureFormat;
}

/// View that lets a texture be bound as color attachment
pub trait RenderTargetView: Send + Sync {
    /// Texture the view was created for
    fn texture(&self) -> &dyn Texture;
}

/// View that lets a depth texture be bound as depth attachment
pub trait DepthStencilView: Send + Sync {
    /// Texture the view was created for
    fn texture(&self) -> &dyn Texture;
}
