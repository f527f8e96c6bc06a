/// Swapchain - Vulkan implementation of the engine Swapchain trait

use ash::vk;
use flipchain_engine::flipchain::device::{
    SurfaceHandle, Swapchain as EngineSwapchain, SwapchainDesc, Texture as EngineTexture, TextureFormat,
};
use flipchain_engine::flipchain::{Error, Result};
use flipchain_engine::{engine_debug, engine_err, engine_report, engine_warn};
use std::sync::Arc;

use crate::vulkan_context::{vk_result_to_error, GpuContext, SOURCE};
use crate::vulkan_format::{swapped_channel_format, texture_format_from_vk, texture_format_to_vk};
use crate::vulkan_texture::Texture;

/// Number of acquire semaphores rotated between frames
const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Vulkan swapchain implementation
///
/// Owns the window surface it presents to.
pub struct Swapchain {
    ctx: Arc<GpuContext>,

    surface: vk::SurfaceKHR,
    swapchain: vk::SwapchainKHR,
    images: Vec<Arc<dyn EngineTexture>>,
    format: TextureFormat,
    extent: vk::Extent2D,

    /// One semaphore per frame in flight (for acquire)
    image_available_semaphores: Vec<vk::Semaphore>,
    /// One semaphore per swapchain image (for present)
    render_finished_semaphores: Vec<vk::Semaphore>,

    current_frame: usize,
    /// Image handed out by the last acquire and not presented yet
    acquired: Option<u32>,
}

impl Swapchain {
    pub(crate) fn new(ctx: &Arc<GpuContext>, surface_handle: &SurfaceHandle, desc: &SwapchainDesc) -> Result<Self> {
        let surface = unsafe {
            ash_window::create_surface(
                &ctx.entry,
                &ctx.instance,
                surface_handle.display,
                surface_handle.window,
                None,
            )
            .map_err(|e| ctx.vk_error("vkCreateSurfaceKHR", e))?
        };

        // Fill the struct early so that Drop cleans up after a partial failure
        let mut swapchain = Self {
            ctx: Arc::clone(ctx),
            surface,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            format: desc.format,
            extent: vk::Extent2D { width: desc.width, height: desc.height },
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            current_frame: 0,
            acquired: None,
        };
        swapchain.create_swapchain(desc)?;
        swapchain.create_semaphores()?;

        engine_debug!(
            ctx.log,
            SOURCE,
            "Swapchain created: {} images, {}x{}, {:?}",
            swapchain.images.len(),
            swapchain.extent.width,
            swapchain.extent.height,
            swapchain.format
        );
        Ok(swapchain)
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<()> {
        let ctx = Arc::clone(&self.ctx);
        let loader = &ctx.surface_loader;

        unsafe {
            let supported = loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.queue_family, self.surface)
                .map_err(|e| ctx.vk_error("vkGetPhysicalDeviceSurfaceSupportKHR", e))?;
            if !supported {
                return Err(engine_report!(
                    ctx.log,
                    SOURCE,
                    Error::OperationFailed {
                        operation: "create_swapchain",
                        code: vk::Result::ERROR_INCOMPATIBLE_DISPLAY_KHR.as_raw(),
                    }
                ));
            }

            let capabilities = loader
                .get_physical_device_surface_capabilities(ctx.physical_device, self.surface)
                .map_err(|e| ctx.vk_error("vkGetPhysicalDeviceSurfaceCapabilitiesKHR", e))?;

            // max_image_count == 0 means no upper bound
            let too_many = capabilities.max_image_count != 0 && desc.buffer_count > capabilities.max_image_count;
            if desc.buffer_count < capabilities.min_image_count || too_many {
                engine_warn!(
                    ctx.log,
                    SOURCE,
                    "{} backbuffers requested, surface supports {}..={}",
                    desc.buffer_count,
                    capabilities.min_image_count,
                    capabilities.max_image_count
                );
                return Err(engine_report!(
                    ctx.log,
                    SOURCE,
                    Error::OperationFailed {
                        operation: "create_swapchain",
                        code: vk::Result::ERROR_INITIALIZATION_FAILED.as_raw(),
                    }
                ));
            }

            let surface_formats = loader
                .get_physical_device_surface_formats(ctx.physical_device, self.surface)
                .map_err(|e| ctx.vk_error("vkGetPhysicalDeviceSurfaceFormatsKHR", e))?;
            let surface_format = self.choose_surface_format(&surface_formats, desc.format)?;

            let present_modes = loader
                .get_physical_device_surface_present_modes(ctx.physical_device, self.surface)
                .map_err(|e| ctx.vk_error("vkGetPhysicalDeviceSurfacePresentModesKHR", e))?;
            let present_mode = choose_present_mode(&present_modes, desc.vsync);

            self.extent = if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: desc.width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
                    height: desc.height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
                }
            };

            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(desc.buffer_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(self.extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true);

            self.swapchain = ctx
                .swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| ctx.vk_error("vkCreateSwapchainKHR", e))?;

            let images = ctx
                .swapchain_loader
                .get_swapchain_images(self.swapchain)
                .map_err(|e| ctx.vk_error("vkGetSwapchainImagesKHR", e))?;

            if images.len() as u32 != desc.buffer_count {
                engine_warn!(
                    ctx.log,
                    SOURCE,
                    "Presentation engine created {} images for {} requested backbuffers",
                    images.len(),
                    desc.buffer_count
                );
            }

            self.images = images
                .into_iter()
                .map(|image| {
                    Arc::new(Texture::from_swapchain_image(
                        &ctx,
                        image,
                        self.extent.width,
                        self.extent.height,
                        self.format,
                    )) as Arc<dyn EngineTexture>
                })
                .collect();
        }
        Ok(())
    }

    /// Prefer the requested format, then the same channels in the other byte
    /// order, then whatever the surface lists first
    fn choose_surface_format(
        &mut self,
        available: &[vk::SurfaceFormatKHR],
        requested: TextureFormat,
    ) -> Result<vk::SurfaceFormatKHR> {
        let find = |format: TextureFormat| {
            let vk_format = texture_format_to_vk(format);
            available.iter().find(|f| f.format == vk_format).copied()
        };

        if let Some(found) = find(requested) {
            self.format = requested;
            return Ok(found);
        }
        if let Some(swapped) = swapped_channel_format(requested) {
            if let Some(found) = find(swapped) {
                engine_warn!(self.ctx.log, SOURCE, "Surface has no {:?}, using {:?}", requested, swapped);
                self.format = swapped;
                return Ok(found);
            }
        }

        let fallback = available
            .iter()
            .find_map(|f| texture_format_from_vk(f.format).map(|format| (*f, format)))
            .ok_or_else(|| engine_err!(self.ctx.log, SOURCE, "Surface exposes no usable color format"))?;
        engine_warn!(self.ctx.log, SOURCE, "Surface has no {:?}, using {:?}", requested, fallback.1);
        self.format = fallback.1;
        Ok(fallback.0)
    }

    fn create_semaphores(&mut self) -> Result<()> {
        let semaphore_create_info = vk::SemaphoreCreateInfo::default();
        let image_count = self.images.len();
        unsafe {
            for _ in 0..MAX_FRAMES_IN_FLIGHT {
                let semaphore = self
                    .ctx
                    .device
                    .create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| self.ctx.vk_error("vkCreateSemaphore", e))?;
                self.image_available_semaphores.push(semaphore);
            }
            for _ in 0..image_count {
                let semaphore = self
                    .ctx
                    .device
                    .create_semaphore(&semaphore_create_info, None)
                    .map_err(|e| self.ctx.vk_error("vkCreateSemaphore", e))?;
                self.render_finished_semaphores.push(semaphore);
            }
        }
        Ok(())
    }

    /// Semaphores for the submission that renders into the acquired image
    ///
    /// Returns (wait_semaphore, signal_semaphore).
    pub(crate) fn sync_info(&self) -> Result<(vk::Semaphore, vk::Semaphore)> {
        let image_index = self
            .acquired
            .ok_or_else(|| Error::InvalidState("no swapchain image is acquired".to_string()))?;
        Ok((
            self.image_available_semaphores[self.current_frame],
            self.render_finished_semaphores[image_index as usize],
        ))
    }
}

/// FIFO is the only mode every driver must support and is always vsynced
fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

impl EngineSwapchain for Swapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        if let Some(image_index) = self.acquired {
            return Ok(image_index);
        }

        let (image_index, suboptimal) = unsafe {
            self.ctx
                .swapchain_loader
                .acquire_next_image(
                    self.swapchain,
                    u64::MAX,
                    self.image_available_semaphores[self.current_frame],
                    vk::Fence::null(),
                )
                .map_err(|e| self.ctx.vk_error("vkAcquireNextImageKHR", e))?
        };
        if suboptimal {
            engine_debug!(self.ctx.log, SOURCE, "Swapchain is suboptimal for the surface");
        }

        self.acquired = Some(image_index);
        Ok(image_index)
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        if self.acquired != Some(image_index) {
            return Err(Error::InvalidState(format!(
                "presenting image {} but the acquired image is {:?}",
                image_index, self.acquired
            )));
        }

        let wait_semaphores = [self.render_finished_semaphores[image_index as usize]];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = self.ctx.queue()?;
        let result = unsafe { self.ctx.swapchain_loader.queue_present(*queue, &present_info) };
        drop(queue);

        // The image is gone either way
        self.acquired = None;
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;

        match result {
            // SUBOPTIMAL is still a successful present
            Ok(_) => Ok(()),
            Err(e) => Err(engine_report!(self.ctx.log, SOURCE, vk_result_to_error("vkQueuePresentKHR", e))),
        }
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn image(&self, index: u32) -> Option<Arc<dyn EngineTexture>> {
        self.images.get(index as usize).cloned()
    }

    fn width(&self) -> u32 {
        self.extent.width
    }

    fn height(&self) -> u32 {
        self.extent.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            // Semaphores and images may still be referenced by queued work
            self.ctx.device.device_wait_idle().ok();

            for &semaphore in &self.image_available_semaphores {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            for &semaphore in &self.render_finished_semaphores {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }

            self.images.clear();
            if self.swapchain != vk::SwapchainKHR::null() {
                self.ctx.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.ctx.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
