mod transfer;

pub(crate) use transfer::upload_texture_pixels;

use error::EngineError;
use ash::{Device, vk};

/// MemoryTypes struct
/// The memory types chosen for the two kinds of allocation the backend makes: buffers the CPU
/// writes directly, and images only the GPU reads
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryTypes {
    pub host_visible: u32,
    pub device_local: u32
}

impl MemoryTypes {

    /// Pick memory types for a device. Host-visible memory must also be host-coherent so that
    /// writes need no explicit flush.
    pub fn select(properties: &vk::PhysicalDeviceMemoryProperties) -> Result<MemoryTypes, EngineError> {
        let host_visible = find_memory_type(
            properties,
            u32::MAX,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
            .ok_or_else(|| EngineError::Compatibility(String::from("No host-accessible memory found")))?;
        let device_local = find_memory_type(properties, u32::MAX, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            .ok_or_else(|| EngineError::Compatibility(String::from("No device-local memory found")))?;
        Ok(MemoryTypes { host_visible, device_local })
    }
}

/// Find the memory type with all the required flags, among those allowed by a resource's
/// requirements, that lives in the largest heap
pub fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    allowed_type_bits: u32,
    required_flags: vk::MemoryPropertyFlags
) -> Option<u32> {
    let mut best: Option<(u32, vk::DeviceSize)> = None;
    for memory_type in 0..properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32) {
        if allowed_type_bits & (1 << memory_type) == 0 {
            continue;
        }
        let type_info = properties.memory_types[memory_type as usize];
        if !type_info.property_flags.contains(required_flags) {
            continue;
        }
        let heap_size = properties.memory_heaps[type_info.heap_index as usize].size;
        match best {
            Some((_, best_size)) if best_size >= heap_size => {},
            _ => best = Some((memory_type, heap_size))
        }
    }
    best.map(|(memory_type, _)| memory_type)
}

/// Round a size up to a multiple of a power-of-two alignment
pub fn align_up(size: vk::DeviceSize, alignment: vk::DeviceSize) -> vk::DeviceSize {
    if alignment <= 1 {
        return size;
    }
    (size + alignment - 1) & !(alignment - 1)
}

/// MemoryAllocation struct
/// A block of device memory backing exactly one buffer or image
pub struct MemoryAllocation {
    pub memory: vk::DeviceMemory,
    pub size: vk::DeviceSize
}

impl MemoryAllocation {

    /// Allocate memory of a preferred type for the given requirements, falling back to any
    /// allowed type with the same flags
    pub unsafe fn new(
        device: &Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        requirements: vk::MemoryRequirements,
        preferred_type: u32,
        required_flags: vk::MemoryPropertyFlags
    ) -> Result<MemoryAllocation, EngineError> {
        let memory_type = if requirements.memory_type_bits & (1 << preferred_type) != 0 {
            preferred_type
        } else {
            find_memory_type(memory_properties, requirements.memory_type_bits, required_flags)
                .ok_or_else(|| EngineError::Compatibility(format!(
                    "No memory type with {:?} allowed by type bits {:#x}",
                    required_flags,
                    requirements.memory_type_bits)))?
        };
        let allocate_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);
        let memory = device.allocate_memory(&allocate_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error allocating memory: {:?}", e))
            })?;
        Ok(MemoryAllocation {
            memory,
            size: requirements.size
        })
    }

    /// Map a range of host-visible memory, copy data in, zero whatever is left of the range, and
    /// unmap again
    pub unsafe fn write(
        &self,
        device: &Device,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
        data: &[u8]
    ) -> Result<(), EngineError> {
        if data.len() as vk::DeviceSize > range || offset + range > self.size {
            return Err(EngineError::OpFailed(format!(
                "Writing {} bytes at offset {} outside of allocation of {} bytes",
                data.len(),
                offset,
                self.size)));
        }
        let dst_ptr = device
            .map_memory(self.memory, offset, range, vk::MemoryMapFlags::empty())
            .map_err(|e| {
                EngineError::OpFailed(format!("Error mapping memory: {:?}", e))
            })? as *mut u8;
        dst_ptr.copy_from_nonoverlapping(data.as_ptr(), data.len());
        dst_ptr.add(data.len()).write_bytes(0, range as usize - data.len());
        device.unmap_memory(self.memory);
        Ok(())
    }

    pub unsafe fn free(&self, device: &Device) {
        device.free_memory(self.memory, None);
    }
}
