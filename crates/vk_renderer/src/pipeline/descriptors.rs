
use error::EngineError;
use resource::{ShaderStage, MAX_CONSTANT_BUFFER_SLOTS};
use ash::{Device, vk};

/// Descriptor sets allocated from each pool before another pool is created
pub const SETS_PER_POOL: u32 = 32;

/// Pool sizes that hold SETS_PER_POOL full sets of the slot layout
pub fn pool_sizes(texture_slots: u32) -> [vk::DescriptorPoolSize; 2] {
    let stages = ShaderStage::ALL.len() as u32;
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: SETS_PER_POOL * stages * MAX_CONSTANT_BUFFER_SLOTS
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: SETS_PER_POOL * stages * texture_slots.max(1)
        }
    ]
}

/// DescriptorArena struct
/// Descriptor sets for the draws of one frame in flight. Pools are added as the frame needs
/// them and all reset together once the GPU is done with the frame.
pub struct DescriptorArena {
    texture_slots: u32,
    pools: Vec<vk::DescriptorPool>,
    current: usize
}

impl DescriptorArena {

    pub fn new(texture_slots: u32) -> DescriptorArena {
        DescriptorArena {
            texture_slots,
            pools: vec![],
            current: 0
        }
    }

    pub unsafe fn allocate(
        &mut self,
        device: &Device,
        layout: vk::DescriptorSetLayout
    ) -> Result<vk::DescriptorSet, EngineError> {
        let layouts = [layout];
        loop {
            if self.current == self.pools.len() {
                self.add_pool(device)?;
            }
            let allocate_info = vk::DescriptorSetAllocateInfo::builder()
                .descriptor_pool(self.pools[self.current])
                .set_layouts(&layouts);
            match device.allocate_descriptor_sets(&allocate_info) {
                Ok(sets) if !sets.is_empty() => return Ok(sets[0]),
                Ok(_) => return Err(EngineError::OpFailed(String::from("No descriptor set was allocated"))),
                Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                    self.current += 1;
                },
                Err(e) => {
                    return Err(EngineError::OpFailed(format!("Error allocating descriptor set: {:?}", e)));
                }
            }
        }
    }

    unsafe fn add_pool(&mut self, device: &Device) -> Result<(), EngineError> {
        let sizes = pool_sizes(self.texture_slots);
        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(SETS_PER_POOL)
            .pool_sizes(&sizes);
        let pool = device.create_descriptor_pool(&pool_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating descriptor pool: {:?}", e))
            })?;
        self.pools.push(pool);
        log::debug!("Descriptor arena now has {} pools", self.pools.len());
        Ok(())
    }

    /// Return every set to its pool; only valid once the GPU has finished the frame
    pub unsafe fn reset(&mut self, device: &Device) -> Result<(), EngineError> {
        for pool in self.pools.iter() {
            device.reset_descriptor_pool(*pool, vk::DescriptorPoolResetFlags::empty())
                .map_err(|e| {
                    EngineError::OpFailed(format!("Error resetting descriptor pool: {:?}", e))
                })?;
        }
        self.current = 0;
        Ok(())
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        for pool in self.pools.drain(..) {
            device.destroy_descriptor_pool(pool, None);
        }
        self.current = 0;
    }
}
