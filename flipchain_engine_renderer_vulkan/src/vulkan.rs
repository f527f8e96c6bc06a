/// Vulkan backend - instance, adapter and device creation, plus the device
/// object factory

use ash::vk;
use flipchain_engine::flipchain::device::{
    Buffer as EngineBuffer, BufferDesc, CommandList as EngineCommandList, CommandQueue,
    DepthStencilView, DeviceInfo, Fence as EngineFence, GraphicsBackend, GraphicsDevice,
    Pipeline as EnginePipeline, PipelineDesc, RenderTargetView, SurfaceHandle,
    Swapchain as EngineSwapchain, SwapchainDesc, Texture as EngineTexture, TextureDesc,
};
use flipchain_engine::flipchain::log::LogRegistry;
use flipchain_engine::flipchain::{Error, RendererConfig, Result};
use flipchain_engine::{engine_err, engine_info, engine_report};
#[cfg(not(feature = "vulkan-validation"))]
use flipchain_engine::engine_warn;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use std::ffi::{CStr, CString};
use std::sync::Arc;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{vk_result_to_error, GpuContext, SOURCE};
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_queue::{Fence, Queue};
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::{AttachmentView, Texture};

/// Entry point of the Vulkan backend
///
/// Requires a Vulkan 1.3 driver with timeline semaphores and dynamic
/// rendering.
#[derive(Debug, Default, Clone, Copy)]
pub struct VulkanBackend;

impl VulkanBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Adapter picked for rendering
struct SelectedAdapter {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    name: String,
}

impl GraphicsBackend for VulkanBackend {
    fn create_device(
        &self,
        surface: &SurfaceHandle,
        config: &RendererConfig,
        log: &LogRegistry,
    ) -> Result<Arc<dyn GraphicsDevice>> {
        let entry = unsafe {
            ash::Entry::load().map_err(|e| engine_err!(log, SOURCE, "Failed to load Vulkan library: {}", e))?
        };

        let validation = validation_enabled(config, log);
        let instance = create_instance(&entry, surface, config, validation, log)?;

        #[cfg(feature = "vulkan-validation")]
        let debug = if validation {
            match crate::debug::DebugMessenger::new(&entry, &instance, log) {
                Ok(messenger) => Some(messenger),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(engine_report!(log, SOURCE, e));
                }
            }
        } else {
            None
        };

        // Unwind everything created so far if the device cannot be built
        let destroy_instance = |instance: &ash::Instance| unsafe {
            #[cfg(feature = "vulkan-validation")]
            if let Some(debug) = debug.as_ref() {
                debug.destroy();
            }
            instance.destroy_instance(None);
        };

        let adapter = match select_adapter(&entry, &instance, surface, log) {
            Ok(adapter) => adapter,
            Err(e) => {
                destroy_instance(&instance);
                return Err(e);
            }
        };

        let device = match create_logical_device(&instance, &adapter) {
            Ok(device) => device,
            Err(e) => {
                destroy_instance(&instance);
                return Err(engine_report!(log, SOURCE, e));
            }
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: adapter.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        });
        let allocator = match allocator {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                destroy_instance(&instance);
                return Err(engine_err!(log, SOURCE, "Failed to create GPU allocator: {}", e));
            }
        };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(adapter.queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let upload_command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                unsafe { device.destroy_device(None) };
                destroy_instance(&instance);
                return Err(engine_report!(log, SOURCE, vk_result_to_error("vkCreateCommandPool", e)));
            }
        };

        let queue = unsafe { device.get_device_queue(adapter.queue_family, 0) };

        let ctx = Arc::new(GpuContext::new(
            entry,
            instance,
            adapter.physical_device,
            device,
            allocator,
            queue,
            adapter.queue_family,
            upload_command_pool,
            #[cfg(feature = "vulkan-validation")]
            debug,
            log.clone(),
        ));

        engine_info!(
            log,
            SOURCE,
            "Vulkan device created on '{}' (queue family {}, validation {})",
            adapter.name,
            adapter.queue_family,
            if validation { "on" } else { "off" }
        );

        Ok(Arc::new(VulkanGraphicsDevice {
            queue: Arc::new(Queue::new(&ctx)),
            adapter_name: adapter.name,
            ctx,
        }))
    }
}

/// Validation needs both the cargo feature and the runtime flag
fn validation_enabled(config: &RendererConfig, log: &LogRegistry) -> bool {
    #[cfg(feature = "vulkan-validation")]
    {
        let _ = log;
        config.enable_validation
    }
    #[cfg(not(feature = "vulkan-validation"))]
    {
        if config.enable_validation {
            engine_warn!(
                log,
                SOURCE,
                "Validation requested but the backend was built without the 'vulkan-validation' feature"
            );
        }
        false
    }
}

fn create_instance(
    entry: &ash::Entry,
    surface: &SurfaceHandle,
    config: &RendererConfig,
    validation: bool,
    log: &LogRegistry,
) -> Result<ash::Instance> {
    let app_name = CString::new(config.app_name.as_str())
        .map_err(|_| Error::InvalidResource("application name contains a NUL byte".to_string()))?;
    let (major, minor, patch) = config.app_version;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, major, minor, patch))
        .engine_name(c"Flipchain")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_3);

    let mut extension_names = ash_window::enumerate_required_extensions(surface.display)
        .map_err(|e| engine_report!(log, SOURCE, vk_result_to_error("vkEnumerateInstanceExtensionProperties", e)))?
        .to_vec();

    let mut layer_names = Vec::new();
    #[cfg(feature = "vulkan-validation")]
    if validation {
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        layer_names.push(crate::debug::VALIDATION_LAYER.as_ptr());
    }
    #[cfg(not(feature = "vulkan-validation"))]
    let _ = validation;

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_names)
        .enabled_extension_names(&extension_names);

    unsafe {
        entry
            .create_instance(&create_info, None)
            .map_err(|e| engine_report!(log, SOURCE, vk_result_to_error("vkCreateInstance", e)))
    }
}

/// Pick the adapter: Vulkan 1.3, timeline semaphores, dynamic rendering and
/// a graphics queue that can present to the window. Discrete GPUs win.
fn select_adapter(
    entry: &ash::Entry,
    instance: &ash::Instance,
    surface: &SurfaceHandle,
    log: &LogRegistry,
) -> Result<SelectedAdapter> {
    let surface_loader = ash::khr::surface::Instance::new(entry, instance);

    unsafe {
        // Temporary surface, only used to test present support
        let probe_surface = ash_window::create_surface(entry, instance, surface.display, surface.window, None)
            .map_err(|e| engine_report!(log, SOURCE, vk_result_to_error("vkCreateSurfaceKHR", e)))?;

        let physical_devices = match instance.enumerate_physical_devices() {
            Ok(devices) => devices,
            Err(e) => {
                surface_loader.destroy_surface(probe_surface, None);
                return Err(engine_report!(log, SOURCE, vk_result_to_error("vkEnumeratePhysicalDevices", e)));
            }
        };

        let mut best: Option<(u32, SelectedAdapter)> = None;
        for physical_device in physical_devices {
            let properties = instance.get_physical_device_properties(physical_device);
            let name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned();

            if properties.api_version < vk::API_VERSION_1_3 {
                engine_info!(log, SOURCE, "Skipping '{}': Vulkan 1.3 not supported", name);
                continue;
            }

            let mut features12 = vk::PhysicalDeviceVulkan12Features::default();
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
            let mut features = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut features12)
                .push_next(&mut features13);
            instance.get_physical_device_features2(physical_device, &mut features);
            let supported = features12.timeline_semaphore == vk::TRUE && features13.dynamic_rendering == vk::TRUE;
            if !supported {
                engine_info!(log, SOURCE, "Skipping '{}': missing timeline semaphores or dynamic rendering", name);
                continue;
            }

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let queue_family = queue_families.iter().enumerate().find_map(|(index, family)| {
                let index = index as u32;
                let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
                let present = surface_loader
                    .get_physical_device_surface_support(physical_device, index, probe_surface)
                    .unwrap_or(false);
                (graphics && present).then_some(index)
            });
            let Some(queue_family) = queue_family else {
                engine_info!(log, SOURCE, "Skipping '{}': no queue can both draw and present", name);
                continue;
            };

            let score = match properties.device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 3,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
                vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
                _ => 0,
            };
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                best = Some((score, SelectedAdapter { physical_device, queue_family, name }));
            }
        }

        surface_loader.destroy_surface(probe_surface, None);

        best.map(|(_, adapter)| adapter)
            .ok_or_else(|| engine_err!(log, SOURCE, "No Vulkan 1.3 adapter can render to this window"))
    }
}

fn create_logical_device(instance: &ash::Instance, adapter: &SelectedAdapter) -> Result<ash::Device> {
    let queue_priorities = [1.0];
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(adapter.queue_family)
        .queue_priorities(&queue_priorities)];

    let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

    let mut features12 = vk::PhysicalDeviceVulkan12Features::default().timeline_semaphore(true);
    let mut features13 = vk::PhysicalDeviceVulkan13Features::default().dynamic_rendering(true);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&device_extension_names)
        .push_next(&mut features12)
        .push_next(&mut features13);

    unsafe {
        instance
            .create_device(adapter.physical_device, &device_create_info, None)
            .map_err(|e| vk_result_to_error("vkCreateDevice", e))
    }
}

/// Vulkan implementation of the engine GraphicsDevice
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    queue: Arc<Queue>,
    adapter_name: String,
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo { backend: "vulkan", adapter_name: self.adapter_name.clone() }
    }

    fn direct_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }

    fn create_command_list(&self) -> Result<Box<dyn EngineCommandList>> {
        Ok(Box::new(CommandList::new(&self.ctx)?))
    }

    fn create_fence(&self, initial_value: u64) -> Result<Arc<dyn EngineFence>> {
        Ok(Arc::new(Fence::new(&self.ctx, initial_value)?))
    }

    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn EngineBuffer>> {
        Ok(Arc::new(Buffer::create(&self.ctx, desc)?))
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<Arc<dyn EngineTexture>> {
        Ok(Arc::new(Texture::create(&self.ctx, desc)?))
    }

    fn create_swapchain(&self, surface: &SurfaceHandle, desc: &SwapchainDesc) -> Result<Box<dyn EngineSwapchain>> {
        Ok(Box::new(Swapchain::new(&self.ctx, surface, desc)?))
    }

    fn create_render_target_view(&self, texture: &Arc<dyn EngineTexture>) -> Result<Arc<dyn RenderTargetView>> {
        Ok(Arc::new(AttachmentView::create(&self.ctx, texture, false)?))
    }

    fn create_depth_stencil_view(&self, texture: &Arc<dyn EngineTexture>) -> Result<Arc<dyn DepthStencilView>> {
        Ok(Arc::new(AttachmentView::create(&self.ctx, texture, true)?))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn EnginePipeline>> {
        Ok(Arc::new(Pipeline::create(&self.ctx, desc)?))
    }

    fn wait_idle(&self) -> Result<()> {
        // Queue access must be externally synchronized with submissions
        let _queue = self.ctx.queue()?;
        unsafe {
            self.ctx
                .device
                .device_wait_idle()
                .map_err(|e| self.ctx.vk_error("vkDeviceWaitIdle", e))
        }
    }
}
