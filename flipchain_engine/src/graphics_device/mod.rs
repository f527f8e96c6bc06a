//! Graphics device module - backend abstraction traits and descriptors

pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod format;
pub mod resource_state;
pub mod command_list;
pub mod queue;
pub mod swapchain;
pub mod pipeline;

#[cfg(test)]
pub mod mock_graphics_device;

pub use graphics_device::*;
pub use buffer::*;
pub use texture::*;
pub use format::*;
pub use resource_state::*;
pub use command_list::*;
pub use queue::*;
pub use swapchain::*;
pub use pipeline::*;
