/*!
# Flipchain Engine - Vulkan Backend

Vulkan 1.3 implementation of the flipchain_engine graphics device traits,
using Ash for the Vulkan bindings and gpu-allocator for memory management.

Fences are timeline semaphores and rendering uses `VK_KHR_dynamic_rendering`
(core in 1.3), so no render pass or framebuffer objects exist.

```no_run
use flipchain_engine::flipchain::device::{GraphicsBackend, SurfaceHandle};
use flipchain_engine::flipchain::{log::LogRegistry, RendererConfig};
use flipchain_engine_renderer_vulkan::VulkanBackend;
# fn run(surface: SurfaceHandle) -> flipchain_engine::flipchain::Result<()> {
let log = LogRegistry::init();
let device = VulkanBackend::new().create_device(&surface, &RendererConfig::default(), &log)?;
println!("Rendering on {}", device.info().adapter_name);
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_format;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_command_list;
mod vulkan_queue;
mod vulkan_swapchain;
mod vulkan_pipeline;
#[cfg(feature = "vulkan-validation")]
mod debug;

pub use vulkan::{VulkanBackend, VulkanGraphicsDevice};

// Re-export debug utilities
#[cfg(feature = "vulkan-validation")]
pub use debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
