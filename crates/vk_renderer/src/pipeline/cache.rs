
use crate::pipeline::{attribute_format, primitive_topology, stage_flags};
use error::EngineError;
use resource::{PrimitiveTopology, ShaderStage, VertexLayout};
use ash::{Device, vk};
use std::collections::HashMap;
use std::ffi::CStr;

/// PipelineKey struct
/// Everything that decides which graphics pipeline a draw needs: the program bound to each
/// stage (by shader ID), the topology and the vertex layout
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PipelineKey {
    pub shaders: [Option<u64>; 5],
    pub topology: PrimitiveTopology,
    pub layout: VertexLayout
}

impl PipelineKey {

    /// Check that the combination can be built into a pipeline at all
    pub fn validate(&self) -> Result<(), EngineError> {
        let bound = |stage: ShaderStage| self.shaders[stage.index()].is_some();
        if !bound(ShaderStage::Vertex) || !bound(ShaderStage::Pixel) {
            return Err(EngineError::OpFailed(String::from(
                "Draw without vertex and pixel stages bound")));
        }
        let tessellating = bound(ShaderStage::Hull);
        if tessellating != bound(ShaderStage::Domain) {
            return Err(EngineError::OpFailed(String::from(
                "Hull and domain stages must be bound together")));
        }
        let patches = self.topology == PrimitiveTopology::ThreeControlPointPatchList;
        if tessellating != patches {
            return Err(EngineError::OpFailed(format!(
                "Topology {:?} does not match tessellation state", self.topology)));
        }
        Ok(())
    }
}

/// PipelineCache struct
/// Graphics pipelines built on first use for each PipelineKey, all targeting one subpass of one
/// renderpass. Viewport and scissor are dynamic so that pipelines survive a resize.
pub struct PipelineCache {
    render_pass: vk::RenderPass,
    subpass: u32,
    pipelines: HashMap<PipelineKey, vk::Pipeline>
}

impl PipelineCache {

    pub fn new(render_pass: vk::RenderPass, subpass: u32) -> PipelineCache {
        PipelineCache {
            render_pass,
            subpass,
            pipelines: HashMap::new()
        }
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Return the pipeline for a key, creating it from the given modules if this is the first
    /// time the key is seen
    pub unsafe fn get_or_create(
        &mut self,
        device: &Device,
        pipeline_layout: vk::PipelineLayout,
        key: &PipelineKey,
        modules: &[Option<vk::ShaderModule>; 5]
    ) -> Result<vk::Pipeline, EngineError> {
        if let Some(pipeline) = self.pipelines.get(key) {
            return Ok(*pipeline);
        }
        key.validate()?;
        let pipeline = self.create_pipeline(device, pipeline_layout, key, modules)?;
        log::debug!("Created pipeline for {:?}", key);
        self.pipelines.insert(key.clone(), pipeline);
        Ok(pipeline)
    }

    unsafe fn create_pipeline(
        &self,
        device: &Device,
        pipeline_layout: vk::PipelineLayout,
        key: &PipelineKey,
        modules: &[Option<vk::ShaderModule>; 5]
    ) -> Result<vk::Pipeline, EngineError> {

        // Shader stages
        let main_function_name = CStr::from_bytes_with_nul(b"main\0")
            .map_err(|e| EngineError::OpFailed(format!("{:?}", e)))?;
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = ShaderStage::ALL.iter()
            .filter_map(|stage| modules[stage.index()].map(|module| (*stage, module)))
            .map(|(stage, module)| vk::PipelineShaderStageCreateInfo::builder()
                .stage(stage_flags(stage))
                .module(module)
                .name(main_function_name)
                .build())
            .collect();

        // Vertex input configuration
        let vertex_attrib_descriptions: Vec<vk::VertexInputAttributeDescription> = key.layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                binding: 0,
                location: attribute.location,
                offset: attribute.offset,
                format: attribute_format(attribute.format)
            })
            .collect();
        let vertex_binding_descriptions = [
            vk::VertexInputBindingDescription {
                binding: 0,
                stride: key.layout.stride,
                input_rate: vk::VertexInputRate::VERTEX
            }
        ];
        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_attribute_descriptions(&vertex_attrib_descriptions)
            .vertex_binding_descriptions(&vertex_binding_descriptions);
        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(primitive_topology(key.topology));
        let tessellation_info = vk::PipelineTessellationStateCreateInfo::builder()
            .patch_control_points(3);

        // Viewport, set per draw
        let viewport_info = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);
        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state_info = vk::PipelineDynamicStateCreateInfo::builder()
            .dynamic_states(&dynamic_states);

        // Random pipeline configurations
        let rasterizer_info = vk::PipelineRasterizationStateCreateInfo::builder()
            .line_width(1.0)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .cull_mode(vk::CullModeFlags::BACK)
            .polygon_mode(vk::PolygonMode::FILL);
        let multisampler_info = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);
        let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(true)
            .depth_write_enable(true)
            .depth_compare_op(vk::CompareOp::LESS_OR_EQUAL);
        let colour_blend_attachments = [
            vk::PipelineColorBlendAttachmentState::builder()
                .blend_enable(true)
                .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .color_blend_op(vk::BlendOp::ADD)
                .src_alpha_blend_factor(vk::BlendFactor::SRC_ALPHA)
                .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                .alpha_blend_op(vk::BlendOp::ADD)
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .build()
        ];
        let colour_blend_info = vk::PipelineColorBlendStateCreateInfo::builder()
            .attachments(&colour_blend_attachments);

        // Make pipeline
        let mut pipeline_create_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&rasterizer_info)
            .multisample_state(&multisampler_info)
            .depth_stencil_state(&depth_stencil_info)
            .color_blend_state(&colour_blend_info)
            .dynamic_state(&dynamic_state_info)
            .layout(pipeline_layout)
            .render_pass(self.render_pass)
            .subpass(self.subpass);
        if key.topology == PrimitiveTopology::ThreeControlPointPatchList {
            pipeline_create_info = pipeline_create_info.tessellation_state(&tessellation_info);
        }
        let graphics_pipelines = device
            .create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info.build()],
                None)
            .map_err(|(_, e)|
                EngineError::OpFailed(format!("Error creating graphics pipeline: {:?}", e))
            )?;
        graphics_pipelines.first()
            .copied()
            .ok_or_else(|| EngineError::OpFailed(String::from("No graphics pipeline was created")))
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        for (_, pipeline) in self.pipelines.drain() {
            device.destroy_pipeline(pipeline, None);
        }
    }
}
