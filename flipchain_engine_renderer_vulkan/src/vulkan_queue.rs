/// Direct queue and timeline-semaphore fence

use ash::vk;
use flipchain_engine::flipchain::device::{
    CommandList as EngineCommandList, CommandQueue, Fence as EngineFence, Swapchain as EngineSwapchain,
};
use flipchain_engine::flipchain::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_swapchain::Swapchain;

/// Monotonic fence backed by a Vulkan timeline semaphore
pub struct Fence {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Fence {
    pub(crate) fn new(ctx: &Arc<GpuContext>, initial_value: u64) -> Result<Self> {
        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);

        let semaphore = unsafe {
            ctx.device
                .create_semaphore(&create_info, None)
                .map_err(|e| ctx.vk_error("vkCreateSemaphore", e))?
        };
        Ok(Self { ctx: Arc::clone(ctx), semaphore })
    }
}

impl EngineFence for Fence {
    fn completed_value(&self) -> Result<u64> {
        unsafe {
            self.ctx
                .device
                .get_semaphore_counter_value(self.semaphore)
                .map_err(|e| self.ctx.vk_error("vkGetSemaphoreCounterValue", e))
        }
    }

    fn wait(&self, value: u64, timeout: Duration) -> Result<bool> {
        let semaphores = [self.semaphore];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);

        match unsafe { self.ctx.device.wait_semaphores(&wait_info, timeout_ns) } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(self.ctx.vk_error("vkWaitSemaphores", e)),
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// The single graphics + present queue
pub struct Queue {
    ctx: Arc<GpuContext>,
}

impl Queue {
    pub(crate) fn new(ctx: &Arc<GpuContext>) -> Self {
        Self { ctx: Arc::clone(ctx) }
    }

    fn command_buffers(lists: &[&dyn EngineCommandList]) -> Result<Vec<vk::CommandBuffer>> {
        lists
            .iter()
            .map(|list| {
                if list.is_recording() {
                    return Err(Error::InvalidState("submitting a command list that is still open".to_string()));
                }
                let vk_list = unsafe { &*(*list as *const dyn EngineCommandList as *const CommandList) };
                Ok(vk_list.command_buffer)
            })
            .collect()
    }

    fn queue_submit(&self, submit_info: vk::SubmitInfo) -> Result<()> {
        let queue = self.ctx.queue()?;
        unsafe {
            self.ctx
                .device
                .queue_submit(*queue, &[submit_info], vk::Fence::null())
                .map_err(|e| self.ctx.vk_error("vkQueueSubmit", e))
        }
    }
}

impl CommandQueue for Queue {
    fn submit(&self, lists: &[&dyn EngineCommandList]) -> Result<()> {
        let command_buffers = Self::command_buffers(lists)?;
        self.queue_submit(vk::SubmitInfo::default().command_buffers(&command_buffers))
    }

    fn submit_for_present(&self, lists: &[&dyn EngineCommandList], swapchain: &dyn EngineSwapchain) -> Result<()> {
        let command_buffers = Self::command_buffers(lists)?;

        let vk_swapchain = unsafe { &*(swapchain as *const dyn EngineSwapchain as *const Swapchain) };
        let (image_available, render_finished) = vk_swapchain.sync_info()?;

        let wait_semaphores = [image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [render_finished];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        self.queue_submit(submit_info)
    }

    fn signal(&self, fence: &dyn EngineFence, value: u64) -> Result<()> {
        let vk_fence = unsafe { &*(fence as *const dyn EngineFence as *const Fence) };

        let signal_semaphores = [vk_fence.semaphore];
        let signal_values = [value];
        let mut timeline_info = vk::TimelineSemaphoreSubmitInfo::default()
            .signal_semaphore_values(&signal_values);
        let submit_info = vk::SubmitInfo::default()
            .signal_semaphores(&signal_semaphores)
            .push_next(&mut timeline_info);

        self.queue_submit(submit_info)
    }
}
