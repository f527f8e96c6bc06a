/// CommandList - Vulkan implementation of the engine CommandList trait

use ash::vk;
use flipchain_engine::flipchain::device::{
    BarrierResource, Buffer as EngineBuffer, CommandList as EngineCommandList, DepthStencilView,
    IndexBufferView, MemoryResidency, Pipeline as EnginePipeline, Rect2D, RenderTargetView,
    RenderingDesc, ResourceBarrier, Texture as EngineTexture, VertexBufferView, Viewport,
};
use flipchain_engine::flipchain::{Error, Result};
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{index_type_to_vk, state_scope};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_texture::{AttachmentView, Texture};

/// Vulkan command list implementation
///
/// Owns its command pool and a single primary command buffer. Created closed;
/// `reset` opens it for recording and `close` ends it.
pub struct CommandList {
    ctx: Arc<GpuContext>,
    /// Command pool for allocating command buffers
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    pub(crate) command_buffer: vk::CommandBuffer,
    is_recording: bool,
    /// Whether we're inside a dynamic rendering scope
    in_rendering: bool,
}

unsafe fn as_vk_buffer(buffer: &dyn EngineBuffer) -> &Buffer {
    &*(buffer as *const dyn EngineBuffer as *const Buffer)
}

impl CommandList {
    pub(crate) fn new(ctx: &Arc<GpuContext>) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx
                .device
                .create_command_pool(&command_pool_create_info, None)
                .map_err(|e| ctx.vk_error("vkCreateCommandPool", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(ctx.vk_error("vkAllocateCommandBuffers", e));
                }
            };

            Ok(Self {
                ctx: Arc::clone(ctx),
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                in_rendering: false,
            })
        }
    }

    fn ensure_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::InvalidState("command list is not recording".to_string()));
        }
        Ok(())
    }

    fn ensure_rendering(&self) -> Result<()> {
        self.ensure_recording()?;
        if !self.in_rendering {
            return Err(Error::InvalidState("draw recorded outside of begin_rendering".to_string()));
        }
        Ok(())
    }
}

impl EngineCommandList for CommandList {
    fn reset(&mut self, pipeline: Option<&dyn EnginePipeline>) -> Result<()> {
        if self.is_recording {
            return Err(Error::InvalidState("command list is already recording".to_string()));
        }

        unsafe {
            self.ctx
                .device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| self.ctx.vk_error("vkResetCommandBuffer", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx
                .device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| self.ctx.vk_error("vkBeginCommandBuffer", e))?;
        }

        self.is_recording = true;
        self.in_rendering = false;

        if let Some(pipeline) = pipeline {
            self.bind_pipeline(pipeline)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_recording()?;
        if self.in_rendering {
            return Err(Error::InvalidState("closing a command list inside begin_rendering".to_string()));
        }

        unsafe {
            self.ctx
                .device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| self.ctx.vk_error("vkEndCommandBuffer", e))?;
        }
        self.is_recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<()> {
        self.ensure_recording()?;

        // Negative height flips Y so that clip space is Y-up
        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y + viewport.height)
            .width(viewport.width)
            .height(-viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: &Rect2D) -> Result<()> {
        self.ensure_recording()?;

        let vk_scissor = vk::Rect2D {
            offset: vk::Offset2D { x: scissor.x, y: scissor.y },
            extent: vk::Extent2D { width: scissor.width, height: scissor.height },
        };

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        self.ensure_recording()?;
        if barriers.is_empty() {
            return Ok(());
        }

        let mut src_stage = vk::PipelineStageFlags::empty();
        let mut dst_stage = vk::PipelineStageFlags::empty();
        let mut buffer_barriers = Vec::new();
        let mut image_barriers = Vec::new();

        for barrier in barriers {
            let before = state_scope(barrier.before, true);
            let after = state_scope(barrier.after, false);
            src_stage |= before.stage;
            dst_stage |= after.stage;

            match barrier.resource {
                BarrierResource::Buffer(buffer) => {
                    let vk_buffer = unsafe { as_vk_buffer(buffer) };
                    buffer_barriers.push(
                        vk::BufferMemoryBarrier::default()
                            .src_access_mask(before.access)
                            .dst_access_mask(after.access)
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .buffer(vk_buffer.buffer)
                            .offset(0)
                            .size(vk::WHOLE_SIZE),
                    );
                }
                BarrierResource::Texture(texture) => {
                    let vk_texture = unsafe { &*(texture as *const dyn EngineTexture as *const Texture) };
                    image_barriers.push(
                        vk::ImageMemoryBarrier::default()
                            .old_layout(before.layout)
                            .new_layout(after.layout)
                            .src_access_mask(before.access)
                            .dst_access_mask(after.access)
                            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                            .image(vk_texture.image)
                            .subresource_range(vk_texture.subresource_range()),
                    );
                }
            }
        }

        unsafe {
            self.ctx.device.cmd_pipeline_barrier(
                self.command_buffer,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &buffer_barriers,
                &image_barriers,
            );
        }
        Ok(())
    }

    fn begin_rendering(&mut self, desc: &RenderingDesc) -> Result<()> {
        self.ensure_recording()?;
        if self.in_rendering {
            return Err(Error::InvalidState("begin_rendering called twice".to_string()));
        }

        let color = unsafe { &*(desc.color as *const dyn RenderTargetView as *const AttachmentView) };
        let color_texture = color.vk_texture();
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: vk::Extent2D { width: color_texture.width(), height: color_texture.height() },
        };

        let color_attachments = [vk::RenderingAttachmentInfo::default()
            .image_view(color.view)
            .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue { float32: desc.clear_color },
            })];

        let depth_attachment = desc.depth.map(|depth| {
            let depth = unsafe { &*(depth as *const dyn DepthStencilView as *const AttachmentView) };
            vk::RenderingAttachmentInfo::default()
                .image_view(depth.view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(vk::AttachmentLoadOp::CLEAR)
                .store_op(vk::AttachmentStoreOp::DONT_CARE)
                .clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: desc.clear_depth,
                        stencil: desc.clear_stencil,
                    },
                })
        });

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth_attachment) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth_attachment);
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.ensure_rendering()?;
        unsafe {
            self.ctx.device.cmd_end_rendering(self.command_buffer);
        }
        self.in_rendering = false;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &dyn EnginePipeline) -> Result<()> {
        self.ensure_recording()?;

        let vk_pipeline = unsafe { &*(pipeline as *const dyn EnginePipeline as *const Pipeline) };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, view: &VertexBufferView) -> Result<()> {
        self.ensure_recording()?;

        // Stride is baked into the pipeline; the renderer only schedules
        // meshes whose view stride matches it
        let vk_buffer = unsafe { as_vk_buffer(view.buffer.as_ref()) };
        unsafe {
            self.ctx
                .device
                .cmd_bind_vertex_buffers(self.command_buffer, 0, &[vk_buffer.buffer], &[0]);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, view: &IndexBufferView) -> Result<()> {
        self.ensure_recording()?;

        let index_type = index_type_to_vk(view.format)
            .ok_or_else(|| Error::InvalidResource(format!("{:?} is not an index format", view.format)))?;
        let vk_buffer = unsafe { as_vk_buffer(view.buffer.as_ref()) };
        unsafe {
            self.ctx
                .device
                .cmd_bind_index_buffer(self.command_buffer, vk_buffer.buffer, 0, index_type);
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, first_vertex: u32) -> Result<()> {
        self.ensure_rendering()?;
        unsafe {
            self.ctx.device.cmd_draw(
                self.command_buffer,
                vertex_count,
                1, // instance_count
                first_vertex,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_rendering()?;
        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1, // instance_count
                first_index,
                vertex_offset,
                0, // first_instance
            );
        }
        Ok(())
    }

    fn copy_buffer(&mut self, src: &dyn EngineBuffer, dst: &dyn EngineBuffer, size: u64) -> Result<()> {
        self.ensure_recording()?;
        if self.in_rendering {
            return Err(Error::InvalidState("copy recorded inside begin_rendering".to_string()));
        }
        if size > src.size() || size > dst.size() {
            return Err(Error::InvalidResource(format!(
                "copy of {} bytes exceeds source ({}) or destination ({})",
                size,
                src.size(),
                dst.size()
            )));
        }

        let vk_src = unsafe { as_vk_buffer(src) };
        let vk_dst = unsafe { as_vk_buffer(dst) };
        let region = vk::BufferCopy { src_offset: 0, dst_offset: 0, size };

        unsafe {
            self.ctx
                .device
                .cmd_copy_buffer(self.command_buffer, vk_src.buffer, vk_dst.buffer, &[region]);

            // Host reads of readback memory need the copy made visible to the host
            if dst.residency() == MemoryResidency::Readback {
                let barrier = vk::BufferMemoryBarrier::default()
                    .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                    .dst_access_mask(vk::AccessFlags::HOST_READ)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(vk_dst.buffer)
                    .offset(0)
                    .size(size);
                self.ctx.device.cmd_pipeline_barrier(
                    self.command_buffer,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::HOST,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[barrier],
                    &[],
                );
            }
        }
        Ok(())
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Destroying the pool frees its command buffers
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
