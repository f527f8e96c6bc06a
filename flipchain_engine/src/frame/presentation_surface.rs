//! Ring of backbuffers bound to a window surface
//!
//! The live backbuffer index is always the one reported by the backend
//! swapchain. It changes only in [`PresentationSurface::advance`], which runs
//! strictly after present.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, RenderTargetView, SurfaceHandle, Swapchain, SwapchainDesc, Texture,
};
use crate::log::LogRegistry;
use crate::{engine_debug, engine_warn};

const SOURCE: &str = "flipchain::PresentationSurface";

struct Backbuffer {
    texture: Arc<dyn Texture>,
    view: Option<Arc<dyn RenderTargetView>>,
}

pub struct PresentationSurface {
    // Views are declared before the swapchain so they are released first
    backbuffers: Vec<Backbuffer>,
    swapchain: Box<dyn Swapchain>,
    current_index: u32,
    log: LogRegistry,
}

impl PresentationSurface {
    /// Create the swapchain for `surface` and acquire the first backbuffer
    ///
    /// Fails if the backend cannot bind to the surface or does not support
    /// `desc.buffer_count` backbuffers.
    pub fn new(
        device: &dyn GraphicsDevice,
        surface: &SurfaceHandle,
        desc: &SwapchainDesc,
        log: LogRegistry,
    ) -> Result<Self> {
        let mut swapchain = device.create_swapchain(surface, desc)?;

        let image_count = swapchain.image_count();
        let mut backbuffers = Vec::with_capacity(image_count as usize);
        for index in 0..image_count {
            let texture = swapchain.image(index).ok_or_else(|| {
                Error::BackendError(format!("swapchain reports {} images but image {} is missing", image_count, index))
            })?;
            backbuffers.push(Backbuffer { texture, view: None });
        }

        let current_index = swapchain.acquire_next_image()?;
        engine_debug!(
            log,
            SOURCE,
            "Swapchain created: {} backbuffers {}x{}, first index {}",
            image_count,
            swapchain.width(),
            swapchain.height(),
            current_index
        );

        Ok(Self {
            backbuffers,
            swapchain,
            current_index,
            log,
        })
    }

    /// Create one render-target view per backbuffer
    pub fn create_render_target_views(&mut self, device: &dyn GraphicsDevice) -> Result<()> {
        for backbuffer in &mut self.backbuffers {
            backbuffer.view = Some(device.create_render_target_view(&backbuffer.texture)?);
        }
        Ok(())
    }

    /// Live backbuffer index, always in `[0, image_count)`
    pub fn current_index(&self) -> u32 {
        self.current_index
    }

    pub fn image_count(&self) -> u32 {
        self.backbuffers.len() as u32
    }

    pub fn width(&self) -> u32 {
        self.swapchain.width()
    }

    pub fn height(&self) -> u32 {
        self.swapchain.height()
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    /// Texture of the live backbuffer
    pub fn current_backbuffer(&self) -> Result<&Arc<dyn Texture>> {
        self.backbuffers
            .get(self.current_index as usize)
            .map(|b| &b.texture)
            .ok_or_else(|| Error::BackendError(format!("backbuffer index {} out of range", self.current_index)))
    }

    /// Render-target view of the live backbuffer
    pub fn current_view(&self) -> Result<&Arc<dyn RenderTargetView>> {
        self.backbuffers
            .get(self.current_index as usize)
            .and_then(|b| b.view.as_ref())
            .ok_or_else(|| {
                Error::InvalidState(format!("no render-target view for backbuffer {}", self.current_index))
            })
    }

    /// Present the live backbuffer
    pub fn present(&mut self) -> Result<()> {
        self.swapchain.present(self.current_index)
    }

    /// Ask the backend which backbuffer is next. Call only after `present`.
    pub fn advance(&mut self) -> Result<u32> {
        let previous = self.current_index;
        let next = self.swapchain.acquire_next_image()?;
        if next >= self.image_count() {
            return Err(Error::BackendError(format!(
                "backend returned backbuffer index {} for {} images",
                next,
                self.image_count()
            )));
        }
        if next == previous && self.image_count() > 1 {
            engine_warn!(self.log, SOURCE, "Backend repeated backbuffer index {} after present", next);
        }
        self.current_index = next;
        Ok(next)
    }
}

#[cfg(test)]
#[path = "presentation_surface_tests.rs"]
mod tests;
