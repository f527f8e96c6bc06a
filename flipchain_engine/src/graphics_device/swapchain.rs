//! Swapchain trait - for window presentation

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{Texture, TextureFormat};

/// Swapchain creation parameters
#[derive(Debug, Clone)]
pub struct SwapchainDesc {
    pub width: u32,
    pub height: u32,
    /// Number of backbuffers
    pub buffer_count: u32,
    /// Preferred backbuffer format
    pub format: TextureFormat,
    /// Wait for vertical blank on present
    pub vsync: bool,
}

/// Ring of backbuffers presented to a window
///
/// The presentation engine decides which image is handed out next; callers
/// must not assume round-robin order.
pub trait Swapchain: Send + Sync {
    /// Ask the presentation engine for the next writable image index
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Present the image at `image_index`
    fn present(&mut self, image_index: u32) -> Result<()>;

    /// Number of images in the swapchain
    fn image_count(&self) -> u32;

    /// Backbuffer texture at `index`
    fn image(&self, index: u32) -> Option<Arc<dyn Texture>>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;
}
