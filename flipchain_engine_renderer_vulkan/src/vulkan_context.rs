/// GpuContext - Shared Vulkan state for every backend object
///
/// Contains everything needed for GPU operations:
/// - Instance and logical device
/// - Allocator for memory management
/// - The direct queue (externally synchronized)
/// - Command pool for one-shot operations

use ash::vk;
use flipchain_engine::flipchain::log::LogRegistry;
use flipchain_engine::flipchain::{Error, Result};
use flipchain_engine::engine_report;
#[cfg(not(feature = "vulkan-validation"))]
use flipchain_engine::engine_debug;
#[cfg(feature = "vulkan-validation")]
use flipchain_engine::engine_info;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

pub(crate) const SOURCE: &str = "flipchain::vulkan";

/// Shared GPU context.
///
/// Every resource holds an `Arc<GpuContext>`, so the device and instance are
/// destroyed only once the last resource is gone.
pub struct GpuContext {
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Direct queue (graphics + present)
    queue: Mutex<vk::Queue>,
    pub(crate) queue_family: u32,

    /// Command pool for one-shot operations (TRANSIENT + RESET_COMMAND_BUFFER)
    upload_command_pool: Mutex<vk::CommandPool>,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    #[cfg(feature = "vulkan-validation")]
    pub(crate) debug: Option<crate::debug::DebugMessenger>,

    pub(crate) log: LogRegistry,
}

impl GpuContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        queue: vk::Queue,
        queue_family: u32,
        upload_command_pool: vk::CommandPool,
        #[cfg(feature = "vulkan-validation")] debug: Option<crate::debug::DebugMessenger>,
        log: LogRegistry,
    ) -> Self {
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);
        Self {
            entry,
            instance,
            physical_device,
            device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            queue: Mutex::new(queue),
            queue_family,
            upload_command_pool: Mutex::new(upload_command_pool),
            surface_loader,
            swapchain_loader,
            #[cfg(feature = "vulkan-validation")]
            debug,
            log,
        }
    }

    /// Lock the direct queue for a submission or a present
    pub(crate) fn queue(&self) -> Result<MutexGuard<'_, vk::Queue>> {
        self.queue
            .lock()
            .map_err(|_| Error::BackendError("Queue mutex poisoned".to_string()))
    }

    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("Allocator mutex poisoned".to_string()))
    }

    /// Log and convert a failed Vulkan call
    pub(crate) fn vk_error(&self, operation: &'static str, result: vk::Result) -> Error {
        engine_report!(self.log, SOURCE, vk_result_to_error(operation, result))
    }

    /// Record commands into a transient command buffer, submit them and wait
    /// for completion
    pub(crate) fn immediate_submit<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self
            .upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool mutex poisoned".to_string()))?;

        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self
                .device
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| self.vk_error("vkAllocateCommandBuffers", e))?[0];

            let result = self.run_one_shot(command_buffer, record);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    unsafe fn run_one_shot<F>(&self, command_buffer: vk::CommandBuffer, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        self.device
            .begin_command_buffer(command_buffer, &begin_info)
            .map_err(|e| self.vk_error("vkBeginCommandBuffer", e))?;

        record(&self.device, command_buffer);

        self.device
            .end_command_buffer(command_buffer)
            .map_err(|e| self.vk_error("vkEndCommandBuffer", e))?;

        let fence = self
            .device
            .create_fence(&vk::FenceCreateInfo::default(), None)
            .map_err(|e| self.vk_error("vkCreateFence", e))?;

        let command_buffers = [command_buffer];
        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let result = self
            .queue()
            .and_then(|queue| {
                self.device
                    .queue_submit(*queue, &[submit_info], fence)
                    .map_err(|e| self.vk_error("vkQueueSubmit", e))
            })
            .and_then(|_| {
                self.device
                    .wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| self.vk_error("vkWaitForFences", e))
            });

        self.device.destroy_fence(fence, None);
        result
    }
}

/// Map a Vulkan result code onto the engine error kinds
pub(crate) fn vk_result_to_error(operation: &'static str, result: vk::Result) -> Error {
    match result {
        vk::Result::ERROR_DEVICE_LOST => Error::DeviceLost { operation },
        vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => Error::OutOfMemory,
        other => Error::OperationFailed { operation, code: other.as_raw() },
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                self.device.destroy_command_pool(*pool, None);
            }

            // Allocator pages must be freed while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);

            #[cfg(feature = "vulkan-validation")]
            if self.debug.is_some() {
                let stats = crate::debug::get_validation_stats();
                engine_info!(
                    self.log,
                    SOURCE,
                    "Vulkan device released ({} validation errors, {} warnings)",
                    stats.errors,
                    stats.warnings
                );
            }
            #[cfg(not(feature = "vulkan-validation"))]
            engine_debug!(self.log, SOURCE, "Vulkan device released");

            // Messenger goes last so that teardown messages are still reported
            #[cfg(feature = "vulkan-validation")]
            if let Some(debug) = self.debug.take() {
                debug.destroy();
            }

            self.instance.destroy_instance(None);
        }
    }
}
