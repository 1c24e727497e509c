
use crate::device::DeviceShared;
use crate::mem::MemoryAllocation;
use error::EngineError;
use ash::vk;

/// Copy RGBA8 pixels into a freshly created image through a temporary staging buffer, leaving
/// the image in the shader-read layout. Blocks until the copy has completed.
pub(crate) unsafe fn upload_texture_pixels(
    shared: &DeviceShared,
    image: vk::Image,
    width: u32,
    height: u32,
    pixels: &[u8]
) -> Result<(), EngineError> {
    let device = &shared.device;

    // Staging buffer holding a copy of the pixels
    let buffer_create_info = vk::BufferCreateInfo::builder()
        .size(pixels.len() as u64)
        .usage(vk::BufferUsageFlags::TRANSFER_SRC)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let staging_buffer = device.create_buffer(&buffer_create_info, None)
        .map_err(|e| {
            EngineError::OpFailed(format!("Failed to create staging buffer: {:?}", e))
        })?;
    let staging_allocation = match stage_pixels(shared, staging_buffer, pixels) {
        Ok(allocation) => allocation,
        Err(e) => {
            device.destroy_buffer(staging_buffer, None);
            return Err(e);
        }
    };

    let result = record_and_submit_copy(shared, staging_buffer, image, width, height);

    device.destroy_buffer(staging_buffer, None);
    staging_allocation.free(device);
    result
}

unsafe fn stage_pixels(
    shared: &DeviceShared,
    staging_buffer: vk::Buffer,
    pixels: &[u8]
) -> Result<MemoryAllocation, EngineError> {
    let device = &shared.device;
    let requirements = device.get_buffer_memory_requirements(staging_buffer);
    let allocation = MemoryAllocation::new(
        device,
        &shared.memory_properties,
        requirements,
        shared.memory_types.host_visible,
        vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)?;
    let bound = device.bind_buffer_memory(staging_buffer, allocation.memory, 0)
        .map_err(|e| {
            EngineError::OpFailed(format!("Error binding staging buffer memory: {:?}", e))
        })
        .and_then(|_| allocation.write(device, 0, pixels.len() as u64, pixels));
    if let Err(e) = bound {
        allocation.free(device);
        return Err(e);
    }
    Ok(allocation)
}

unsafe fn record_and_submit_copy(
    shared: &DeviceShared,
    staging_buffer: vk::Buffer,
    image: vk::Image,
    width: u32,
    height: u32
) -> Result<(), EngineError> {
    let device = &shared.device;
    let command_buffer = shared.transfer_command_buffer;
    let subresource_range = vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1
    };

    let command_begin_info = vk::CommandBufferBeginInfo::builder()
        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    device.begin_command_buffer(command_buffer, &command_begin_info)
        .map_err(|e| {
            EngineError::OpFailed(format!("Error starting copy command buffer: {:?}", e))
        })?;

    // Initial memory dependency
    let barrier = vk::ImageMemoryBarrier::builder()
        .image(image)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .old_layout(vk::ImageLayout::UNDEFINED)
        .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .subresource_range(subresource_range)
        .build();
    device.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::TOP_OF_PIPE,
        vk::PipelineStageFlags::TRANSFER,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier]
    );

    // Copy command
    let region = vk::BufferImageCopy::builder()
        .buffer_offset(0)
        .buffer_row_length(0)
        .buffer_image_height(0)
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1
        })
        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
        .image_extent(vk::Extent3D { width, height, depth: 1 })
        .build();
    device.cmd_copy_buffer_to_image(
        command_buffer,
        staging_buffer,
        image,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        &[region]
    );

    // Final memory dependency
    let barrier = vk::ImageMemoryBarrier::builder()
        .image(image)
        .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
        .dst_access_mask(vk::AccessFlags::SHADER_READ)
        .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
        .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .subresource_range(subresource_range)
        .build();
    device.cmd_pipeline_barrier(
        command_buffer,
        vk::PipelineStageFlags::TRANSFER,
        vk::PipelineStageFlags::ALL_GRAPHICS,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier]
    );

    // Finish recording commands, create a fence, run the command, wait for fence, clean up
    device.end_command_buffer(command_buffer)
        .map_err(|e| {
            EngineError::OpFailed(format!("Error ending command buffer: {:?}", e))
        })?;
    let fence = device
        .create_fence(&vk::FenceCreateInfo::default(), None)
        .map_err(|e| {
            EngineError::OpFailed(format!("Error creating fence: {:?}", e))
        })?;
    let command_buffers = [command_buffer];
    let submit_infos = [
        vk::SubmitInfo::builder()
            .command_buffers(&command_buffers)
            .build()
    ];
    let result = device
        .queue_submit(shared.queue, &submit_infos, fence)
        .map_err(|e| {
            EngineError::OpFailed(format!("Error submitting to queue: {:?}", e))
        })
        .and_then(|_| device
            .wait_for_fences(&[fence], true, u64::MAX)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error waiting for fence: {:?}", e))
            }));
    device.destroy_fence(fence, None);
    result
}
