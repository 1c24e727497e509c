pub mod bindings;
pub mod cache;
pub mod descriptors;

use error::EngineError;
use resource::{
    AttributeFormat, PrimitiveTopology, ShaderStage, MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS
};
use ash::{Device, vk};

/// Bindings reserved for each stage: its constant buffer slots followed by its texture slots.
/// Binding numbers do not depend on how many texture slots a device offers.
pub const BINDINGS_PER_STAGE: u32 = MAX_CONSTANT_BUFFER_SLOTS + MAX_TEXTURE_SLOTS;

/// Descriptor binding used for a stage's constant buffer slot
pub fn constant_buffer_binding(stage: ShaderStage, slot: u32) -> u32 {
    stage.index() as u32 * BINDINGS_PER_STAGE + slot
}

/// Descriptor binding used for a stage's texture slot
pub fn texture_binding(stage: ShaderStage, slot: u32) -> u32 {
    stage.index() as u32 * BINDINGS_PER_STAGE + MAX_CONSTANT_BUFFER_SLOTS + slot
}

/// Index of the stage a binding belongs to
pub fn binding_stage_index(binding: u32) -> usize {
    (binding / BINDINGS_PER_STAGE) as usize
}

/// Texture slots per stage that fit the device limits when every stage uses all of them
pub fn device_texture_slots(limits: &vk::PhysicalDeviceLimits) -> u32 {
    let stages = ShaderStage::ALL.len() as u32;
    MAX_TEXTURE_SLOTS
        .min(limits.max_per_stage_descriptor_samplers)
        .min(limits.max_per_stage_descriptor_sampled_images)
        .min(limits.max_per_stage_resources.saturating_sub(MAX_CONSTANT_BUFFER_SLOTS))
        .min(limits.max_descriptor_set_samplers / stages)
        .min(limits.max_descriptor_set_sampled_images / stages)
}

pub fn stage_flags(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Hull => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderStage::Domain => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderStage::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderStage::Pixel => vk::ShaderStageFlags::FRAGMENT
    }
}

pub fn primitive_topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::ThreeControlPointPatchList => vk::PrimitiveTopology::PATCH_LIST
    }
}

pub fn attribute_format(format: AttributeFormat) -> vk::Format {
    match format {
        AttributeFormat::Float2 => vk::Format::R32G32_SFLOAT,
        AttributeFormat::Float3 => vk::Format::R32G32B32_SFLOAT
    }
}

/// Layout bindings for every slot of every stage, in binding order
pub fn slot_layout_bindings(texture_slots: u32) -> Vec<vk::DescriptorSetLayoutBinding> {
    let mut bindings = vec![];
    for stage in ShaderStage::ALL.iter() {
        for slot in 0..MAX_CONSTANT_BUFFER_SLOTS {
            bindings.push(vk::DescriptorSetLayoutBinding::builder()
                .binding(constant_buffer_binding(*stage, slot))
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .descriptor_count(1)
                .stage_flags(stage_flags(*stage))
                .build());
        }
        for slot in 0..texture_slots.min(MAX_TEXTURE_SLOTS) {
            bindings.push(vk::DescriptorSetLayoutBinding::builder()
                .binding(texture_binding(*stage, slot))
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(stage_flags(*stage))
                .build());
        }
    }
    bindings
}

/// SlotLayout struct
/// The single descriptor set layout shared by every pipeline, and the pipeline layout built
/// from it. Each draw fills a fresh set of this layout.
pub struct SlotLayout {
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub pipeline_layout: vk::PipelineLayout,
    pub texture_slots: u32
}

impl SlotLayout {

    pub unsafe fn new(device: &Device, texture_slots: u32) -> Result<SlotLayout, EngineError> {
        let bindings = slot_layout_bindings(texture_slots);
        let set_layout_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&bindings);
        let descriptor_set_layout = device
            .create_descriptor_set_layout(&set_layout_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating descriptor set layout: {:?}", e))
            })?;

        let set_layouts = [descriptor_set_layout];
        let pipeline_layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&set_layouts);
        let pipeline_layout = match device.create_pipeline_layout(&pipeline_layout_info, None) {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_descriptor_set_layout(descriptor_set_layout, None);
                return Err(EngineError::OpFailed(format!("Error creating pipeline layout: {:?}", e)));
            }
        };

        Ok(SlotLayout { descriptor_set_layout, pipeline_layout, texture_slots })
    }

    pub unsafe fn destroy(&self, device: &Device) {
        device.destroy_pipeline_layout(self.pipeline_layout, None);
        device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
    }
}
