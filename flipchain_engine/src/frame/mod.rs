//! Frame lifecycle: synchronization, presentation and the top-level renderer

pub mod frame_sync;
pub mod presentation_surface;
pub mod deferred_release;
pub mod frame_renderer;

pub use frame_sync::FrameSync;
pub use presentation_surface::PresentationSurface;
pub use deferred_release::DeferredReleaseQueue;
pub use frame_renderer::{FrameRenderer, FrameStats, RendererState};
