/*!
# Flipchain Engine

Core traits and types for the Flipchain frame renderer.

This crate drives a single-window, single-frame-in-flight rendering loop on top
of an explicit graphics API. The API itself is abstracted behind trait objects
(similar to C++ virtual inheritance); backend crates (Vulkan) provide the
concrete device, queue, command list, swapchain and resource types.

## Architecture

- **FrameRenderer**: Bootstraps the GPU objects and renders/presents frames
- **FrameSync**: Monotonic fence counter for CPU/GPU synchronization
- **PresentationSurface**: Swapchain backbuffers and the current index
- **GeometryUpload**: Staged upload of vertex/index data into device-local memory
- **GraphicsDevice**: Factory trait implemented by backends
- **LogRegistry**: Injectable log sink registry shared by the renderer and its backend
*/

// Internal modules
mod error;
mod config;
pub mod log;
pub mod graphics_device;
pub mod frame;
pub mod geometry;

// Main flipchain namespace module
pub mod flipchain {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::RendererConfig;

    // Frame renderer and its building blocks
    pub use crate::frame::*;

    // Meshes and upload
    pub use crate::geometry::*;

    // Logging sub-module (types only; the engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{DefaultLogger, FileLogger, LogEntry, LogRegistry, LogSeverity, Logger};
    }

    // Backend abstraction sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }
}
