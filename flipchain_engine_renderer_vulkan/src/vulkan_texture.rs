/// Texture - Vulkan implementation of the engine Texture trait, plus the
/// attachment views created over it

use ash::vk;
use flipchain_engine::flipchain::device::{
    DepthStencilView, RenderTargetView, ResourceState, Texture as EngineTexture, TextureDesc,
    TextureFormat,
};
use flipchain_engine::flipchain::{Error, Result};
use flipchain_engine::engine_error;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, SOURCE};
use crate::vulkan_format::{state_scope, texture_aspect, texture_format_to_vk};

/// Vulkan texture implementation
///
/// Swapchain images are wrapped without an allocation and are not destroyed
/// on drop; the swapchain owns them.
pub struct Texture {
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// GPU memory allocation (None for swapchain images)
    allocation: Option<Allocation>,
    owns_image: bool,
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl Texture {
    /// Create a 2D texture and move it into `desc.initial_state`
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &TextureDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "texture '{}' has empty extent {}x{}",
                desc.name, desc.width, desc.height
            )));
        }

        let usage = if desc.format.is_depth() {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
        };

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(texture_format_to_vk(desc.format))
            .extent(vk::Extent3D { width: desc.width, height: desc.height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx
                .device
                .create_image(&image_info, None)
                .map_err(|e| ctx.vk_error("vkCreateImage", e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx.allocator().and_then(|mut allocator| {
                allocator
                    .allocate(&AllocationCreateDesc {
                        name: &desc.name,
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_| {
                        engine_error!(ctx.log, SOURCE, "Out of GPU memory for texture '{}' ({}x{})", desc.name, desc.width, desc.height);
                        Error::OutOfMemory
                    })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let texture = Self {
                ctx: Arc::clone(ctx),
                image,
                allocation: Some(allocation),
                owns_image: true,
                width: desc.width,
                height: desc.height,
                format: desc.format,
            };

            if let Some(allocation) = &texture.allocation {
                ctx.device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| ctx.vk_error("vkBindImageMemory", e))?;
            }

            texture.transition_from_undefined(desc.initial_state)?;
            Ok(texture)
        }
    }

    /// Wrap an image owned by a swapchain
    pub(crate) fn from_swapchain_image(
        ctx: &Arc<GpuContext>,
        image: vk::Image,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self {
            ctx: Arc::clone(ctx),
            image,
            allocation: None,
            owns_image: false,
            width,
            height,
            format,
        }
    }

    pub(crate) fn aspect(&self) -> vk::ImageAspectFlags {
        texture_aspect(self.format)
    }

    pub(crate) fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange::default()
            .aspect_mask(self.aspect())
            .base_mip_level(0)
            .level_count(1)
            .base_array_layer(0)
            .layer_count(1)
    }

    /// One-shot layout transition right after creation
    fn transition_from_undefined(&self, state: ResourceState) -> Result<()> {
        let target = state_scope(state, false);
        if target.layout == vk::ImageLayout::UNDEFINED {
            return Ok(());
        }

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(vk::ImageLayout::UNDEFINED)
            .new_layout(target.layout)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_access_mask(target.access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(self.subresource_range());

        self.ctx.immediate_submit(|device, command_buffer| unsafe {
            device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                target.stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        })
    }
}

impl EngineTexture for Texture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if !self.owns_image {
            return;
        }
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}

/// Image view binding a texture as color or depth attachment
///
/// Keeps its texture alive for as long as the view exists.
pub struct AttachmentView {
    ctx: Arc<GpuContext>,
    pub(crate) view: vk::ImageView,
    texture: Arc<dyn EngineTexture>,
}

impl AttachmentView {
    pub(crate) fn create(ctx: &Arc<GpuContext>, texture: &Arc<dyn EngineTexture>, expect_depth: bool) -> Result<Self> {
        let format = texture.format();
        if format.is_depth() != expect_depth {
            let kind = if expect_depth { "depth-stencil" } else { "render-target" };
            return Err(Error::InvalidResource(format!("{:?} cannot back a {} view", format, kind)));
        }

        // Every texture handed out by this backend is a Vulkan Texture
        let vk_texture = unsafe { &*(texture.as_ref() as *const dyn EngineTexture as *const Texture) };

        let view_info = vk::ImageViewCreateInfo::default()
            .image(vk_texture.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(texture_format_to_vk(format))
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk_texture.subresource_range());

        let view = unsafe {
            ctx.device
                .create_image_view(&view_info, None)
                .map_err(|e| ctx.vk_error("vkCreateImageView", e))?
        };

        Ok(Self { ctx: Arc::clone(ctx), view, texture: Arc::clone(texture) })
    }

    pub(crate) fn vk_texture(&self) -> &Texture {
        unsafe { &*(self.texture.as_ref() as *const dyn EngineTexture as *const Texture) }
    }
}

impl RenderTargetView for AttachmentView {
    fn texture(&self) -> &dyn EngineTexture {
        self.texture.as_ref()
    }
}

impl DepthStencilView for AttachmentView {
    fn texture(&self) -> &dyn EngineTexture {
        self.texture.as_ref()
    }
}

impl Drop for AttachmentView {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_image_view(self.view, None);
        }
    }
}
