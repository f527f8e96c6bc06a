/// Pipeline - Vulkan graphics pipeline built for dynamic rendering

use ash::vk;
use flipchain_engine::flipchain::device::{Pipeline as EnginePipeline, PipelineDesc};
use flipchain_engine::flipchain::{Error, Result};
use flipchain_engine::engine_err;
use std::io::Cursor;
use std::sync::Arc;

use crate::vulkan_context::{GpuContext, SOURCE};
use crate::vulkan_format::{
    cull_mode_to_vk, front_face_to_vk, texture_format_to_vk, topology_to_vk, vertex_format_to_vk,
};

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Empty layout: the pipeline has no root parameters
    pipeline_layout: vk::PipelineLayout,
    vertex_stride: u32,
}

impl Pipeline {
    pub(crate) fn create(ctx: &Arc<GpuContext>, desc: &PipelineDesc) -> Result<Self> {
        let vertex_module = create_shader_module(ctx, &desc.vertex_shader, "vertex")?;
        let fragment_module = match create_shader_module(ctx, &desc.fragment_shader, "fragment") {
            Ok(module) => module,
            Err(e) => {
                unsafe { ctx.device.destroy_shader_module(vertex_module, None) };
                return Err(e);
            }
        };

        let result = Self::create_with_modules(ctx, desc, vertex_module, fragment_module);

        // Modules are only needed while the pipeline is being compiled
        unsafe {
            ctx.device.destroy_shader_module(vertex_module, None);
            ctx.device.destroy_shader_module(fragment_module, None);
        }
        result
    }

    fn create_with_modules(
        ctx: &Arc<GpuContext>,
        desc: &PipelineDesc,
        vertex_module: vk::ShaderModule,
        fragment_module: vk::ShaderModule,
    ) -> Result<Self> {
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main"),
        ];

        // One binding per distinct input slot, attribute location = element index
        let mut slots: Vec<u32> = desc.vertex_layout.elements.iter().map(|e| e.input_slot).collect();
        slots.sort_unstable();
        slots.dedup();
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = slots
            .iter()
            .map(|&slot| vk::VertexInputBindingDescription {
                binding: slot,
                stride: desc.vertex_layout.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            })
            .collect();
        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc
            .vertex_layout
            .elements
            .iter()
            .enumerate()
            .map(|(location, element)| vk::VertexInputAttributeDescription {
                location: location as u32,
                binding: element.input_slot,
                format: vertex_format_to_vk(element.format),
                offset: element.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(desc.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are set per frame
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(desc.rasterizer.cull_mode))
            .front_face(front_face_to_vk(desc.rasterizer.front_face))
            .depth_bias_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(desc.depth_stencil.depth_test_enable)
            .depth_write_enable(desc.depth_stencil.depth_write_enable)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(desc.blend.blend_enable)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let color_formats = [texture_format_to_vk(desc.color_format)];
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(desc.depth_format.map(texture_format_to_vk).unwrap_or(vk::Format::UNDEFINED));

        unsafe {
            let pipeline_layout = ctx
                .device
                .create_pipeline_layout(&vk::PipelineLayoutCreateInfo::default(), None)
                .map_err(|e| ctx.vk_error("vkCreatePipelineLayout", e))?;

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .push_next(&mut rendering_info)
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(pipeline_layout);

            let pipelines = match ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            ) {
                Ok(pipelines) => pipelines,
                Err((_, e)) => {
                    ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                    return Err(ctx.vk_error("vkCreateGraphicsPipelines", e));
                }
            };

            Ok(Self {
                ctx: Arc::clone(ctx),
                pipeline: pipelines[0],
                pipeline_layout,
                vertex_stride: desc.vertex_layout.stride,
            })
        }
    }
}

fn create_shader_module(ctx: &GpuContext, bytecode: &[u8], stage: &str) -> Result<vk::ShaderModule> {
    let code = ash::util::read_spv(&mut Cursor::new(bytecode))
        .map_err(|e| engine_err!(ctx.log, SOURCE, "Malformed SPIR-V for {} shader: {}", stage, e))?;
    if code.is_empty() {
        return Err(Error::InvalidResource(format!("{} shader bytecode is empty", stage)));
    }

    let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
    unsafe {
        ctx.device
            .create_shader_module(&create_info, None)
            .map_err(|e| ctx.vk_error("vkCreateShaderModule", e))
    }
}

impl EnginePipeline for Pipeline {
    fn vertex_stride(&self) -> u32 {
        self.vertex_stride
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}
