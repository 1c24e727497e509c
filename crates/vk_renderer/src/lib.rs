mod device;
mod mem;
mod pipeline;
mod resource;


pub use crate::device::{VkDevice, VkDeviceCreateInfo};
pub use crate::mem::{align_up, find_memory_type, MemoryTypes};
pub use crate::pipeline::{
    attribute_format, binding_stage_index, constant_buffer_binding, device_texture_slots,
    primitive_topology, slot_layout_bindings, stage_flags, texture_binding, BINDINGS_PER_STAGE,
    bindings::BindingTable,
    cache::PipelineKey,
    descriptors::{pool_sizes, SETS_PER_POOL}
};
pub use crate::resource::{
    buffer::{VersionRing, VkBuffer, INITIAL_UNIFORM_VERSIONS, MAX_UNIFORM_VERSIONS},
    image::{DecodedTexture, VkTexture},
    shader::{spirv_words, VkShader}
};
