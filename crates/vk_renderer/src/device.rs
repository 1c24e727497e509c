
use crate::mem::MemoryTypes;
use crate::pipeline::{
    constant_buffer_binding, device_texture_slots, texture_binding, SlotLayout,
    bindings::BindingTable,
    cache::{PipelineCache, PipelineKey},
    descriptors::DescriptorArena
};
use crate::resource::{buffer::VkBuffer, image::VkTexture, shader::VkShader};
use error::EngineError;
use resource::{
    BufferUsage, GraphicsDevice, PrimitiveTopology, ShaderStage, VertexLayout,
    MAX_CONSTANT_BUFFER_SLOTS, STATIC_VERTEX_LAYOUT
};
use ash::{Device, Instance, vk};
use std::cell::Cell;
use std::path::Path;
use std::rc::{Rc, Weak};

/// DeviceShared struct
/// Device state needed by resource handles to create and destroy themselves. Every handle keeps
/// a reference, so this outlives all of them.
pub(crate) struct DeviceShared {
    pub device: Device,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub memory_types: MemoryTypes,
    pub uniform_alignment: vk::DeviceSize,
    pub queue: vk::Queue,
    pub command_pool: vk::CommandPool,
    pub transfer_command_buffer: vk::CommandBuffer,
    pub frames_in_flight: u64,
    pass_serial: Cell<u64>,
    next_shader_id: Cell<u64>
}

impl DeviceShared {

    /// Serial of the most recently begun pass, zero before the first
    pub fn pass_serial(&self) -> u64 {
        self.pass_serial.get()
    }

    pub fn next_shader_id(&self) -> u64 {
        let id = self.next_shader_id.get() + 1;
        self.next_shader_id.set(id);
        id
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            self.device.free_command_buffers(self.command_pool, &[self.transfer_command_buffer]);
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// VkDeviceCreateInfo struct
/// What the backend needs from the application that owns the Vulkan instance and device. The
/// device must have been created with the tessellation and geometry shader features enabled.
/// Draws target the given subpass of the render pass.
///
/// `frames_in_flight` is how many passes the application lets the GPU work on at once: when a
/// pass begins, the GPU must have finished the pass begun that many passes earlier.
pub struct VkDeviceCreateInfo<'a> {
    pub instance: &'a Instance,
    pub physical_device: vk::PhysicalDevice,
    pub device: Device,
    pub queue_family_index: u32,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
    pub frames_in_flight: u32
}

/// BoundBuffer struct
/// A uniform buffer binding captured at bind time
#[derive(Copy, Clone, Debug, PartialEq)]
struct BoundBuffer {
    buffer: vk::Buffer,
    offset: vk::DeviceSize,
    range: vk::DeviceSize
}

/// Recording struct
/// The command buffer of the pass being recorded, inside an already begun render pass
#[derive(Copy, Clone, Debug)]
struct Recording {
    command_buffer: vk::CommandBuffer,
    extent: vk::Extent2D,
    arena: usize
}

/// VkDevice struct
/// Vulkan implementation of the engine's graphics device. Resource handles release their Vulkan
/// objects when dropped. Binding commands only update state; a draw resolves that state into a
/// pipeline and a descriptor set and records them into the current pass.
pub struct VkDevice {
    shared: Rc<DeviceShared>,
    sampler: vk::Sampler,
    slot_layout: SlotLayout,
    pipelines: PipelineCache,
    arenas: Vec<DescriptorArena>,
    recording: Option<Recording>,
    bound_shaders: [Option<(u64, vk::ShaderModule)>; 5],
    vertex_layout: VertexLayout,
    topology: PrimitiveTopology,
    bound_buffers: BindingTable<BoundBuffer>,
    bound_textures: BindingTable<vk::ImageView>,
    bound_vertex_buffer: Option<(vk::Buffer, Weak<()>)>
}

impl VkDevice {

    pub unsafe fn new(create_info: VkDeviceCreateInfo) -> Result<VkDevice, EngineError> {
        let instance = create_info.instance;
        let physical_device = create_info.physical_device;
        let device = create_info.device;

        Self::check_device_support(instance, physical_device)?;

        let memory_properties = instance.get_physical_device_memory_properties(physical_device);
        let memory_types = MemoryTypes::select(&memory_properties)?;
        let limits = instance.get_physical_device_properties(physical_device).limits;
        let texture_slots = device_texture_slots(&limits);
        let frames_in_flight = create_info.frames_in_flight.max(1);

        // Command pool for one-off transfers; graphics commands go into the caller's buffers
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .queue_family_index(create_info.queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = device
            .create_command_pool(&pool_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating command pool: {:?}", e))
            })?;
        let command_buffer_alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let transfer_command_buffer = match device.allocate_command_buffers(&command_buffer_alloc_info) {
            Ok(buffers) if !buffers.is_empty() => buffers[0],
            Ok(_) => {
                device.destroy_command_pool(command_pool, None);
                return Err(EngineError::OpFailed(String::from("No command buffer was allocated")));
            },
            Err(e) => {
                device.destroy_command_pool(command_pool, None);
                return Err(EngineError::OpFailed(format!("Error allocating command buffer: {:?}", e)));
            }
        };

        let shared = Rc::new(DeviceShared {
            device: device.clone(),
            memory_properties,
            memory_types,
            uniform_alignment: limits.min_uniform_buffer_offset_alignment,
            queue: device.get_device_queue(create_info.queue_family_index, 0),
            command_pool,
            transfer_command_buffer,
            frames_in_flight: frames_in_flight as u64,
            pass_serial: Cell::new(0),
            next_shader_id: Cell::new(0)
        });

        let sampler_info = vk::SamplerCreateInfo::builder()
            .min_filter(vk::Filter::LINEAR)
            .mag_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT);
        let sampler = device
            .create_sampler(&sampler_info, None)
            .map_err(|e| EngineError::OpFailed(format!("Error creating sampler: {:?}", e)))?;
        let slot_layout = match SlotLayout::new(&device, texture_slots) {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_sampler(sampler, None);
                return Err(e);
            }
        };

        log::info!(
            "Vulkan device ready: host-visible memory type {}, device-local memory type {}, {} texture slots per stage",
            memory_types.host_visible,
            memory_types.device_local,
            texture_slots);
        Ok(VkDevice {
            shared,
            sampler,
            slot_layout,
            pipelines: PipelineCache::new(create_info.render_pass, create_info.subpass),
            arenas: (0..frames_in_flight).map(|_| DescriptorArena::new(texture_slots)).collect(),
            recording: None,
            bound_shaders: [None; 5],
            vertex_layout: STATIC_VERTEX_LAYOUT,
            topology: PrimitiveTopology::TriangleList,
            bound_buffers: BindingTable::default(),
            bound_textures: BindingTable::default(),
            bound_vertex_buffer: None
        })
    }

    /// Fail with a compatibility error if the physical device lacks anything the engine uses
    unsafe fn check_device_support(
        instance: &Instance,
        physical_device: vk::PhysicalDevice
    ) -> Result<(), EngineError> {
        let features = instance.get_physical_device_features(physical_device);
        if features.tessellation_shader != vk::TRUE {
            return Err(EngineError::Compatibility(String::from("Tessellation shaders not supported")));
        }
        if features.geometry_shader != vk::TRUE {
            return Err(EngineError::Compatibility(String::from("Geometry shaders not supported")));
        }
        Ok(())
    }

    /// Start recording into a command buffer that is already inside the target render pass.
    /// The GPU must have finished the pass begun `frames_in_flight` passes before this one, so
    /// that its descriptor sets and uniform buffer versions can be reused.
    pub fn begin_pass(
        &mut self,
        command_buffer: vk::CommandBuffer,
        extent: vk::Extent2D
    ) -> Result<(), EngineError> {
        let serial = self.shared.pass_serial.get() + 1;
        self.shared.pass_serial.set(serial);
        let arena = (serial % self.shared.frames_in_flight) as usize;
        unsafe { self.arenas[arena].reset(&self.shared.device)?; }
        self.recording = Some(Recording { command_buffer, extent, arena });
        Ok(())
    }

    /// Stop recording; all bindings are forgotten
    pub fn end_pass(&mut self) {
        self.recording = None;
        self.bound_shaders = [None; 5];
        self.bound_buffers.clear();
        self.bound_textures.clear();
        self.bound_vertex_buffer = None;
    }

    /// Number of distinct pipelines built so far
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn check_slot(stage: ShaderStage, slot: u32, limit: u32, kind: &str) -> Result<(), EngineError> {
        if slot >= limit {
            return Err(EngineError::OpFailed(format!(
                "{} slot {} out of range for {} stage (limit {})", kind, slot, stage, limit)));
        }
        Ok(())
    }

    /// Fill a fresh descriptor set from the current bindings
    unsafe fn write_descriptor_set(&self, descriptor_set: vk::DescriptorSet) {
        let buffer_infos: Vec<(u32, vk::DescriptorBufferInfo)> = self.bound_buffers.iter()
            .map(|(binding, bound)| (binding, vk::DescriptorBufferInfo {
                buffer: bound.buffer,
                offset: bound.offset,
                range: bound.range
            }))
            .collect();
        let image_infos: Vec<(u32, vk::DescriptorImageInfo)> = self.bound_textures.iter()
            .map(|(binding, image_view)| (binding, vk::DescriptorImageInfo {
                sampler: self.sampler,
                image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
            }))
            .collect();

        let mut writes: Vec<vk::WriteDescriptorSet> = vec![];
        for (binding, info) in buffer_infos.iter() {
            writes.push(vk::WriteDescriptorSet::builder()
                .dst_set(descriptor_set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                .buffer_info(std::slice::from_ref(info))
                .build());
        }
        for (binding, info) in image_infos.iter() {
            writes.push(vk::WriteDescriptorSet::builder()
                .dst_set(descriptor_set)
                .dst_binding(*binding)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .image_info(std::slice::from_ref(info))
                .build());
        }
        if !writes.is_empty() {
            self.shared.device.update_descriptor_sets(&writes, &[]);
        }
    }
}

impl Drop for VkDevice {
    fn drop(&mut self) {
        unsafe {
            let device = &self.shared.device;
            for arena in self.arenas.iter_mut() {
                arena.destroy(device);
            }
            self.pipelines.destroy(device);
            self.slot_layout.destroy(device);
            device.destroy_sampler(self.sampler, None);
        }
    }
}

impl GraphicsDevice for VkDevice {

    type Buffer = VkBuffer;
    type Shader = VkShader;
    type Texture = VkTexture;

    fn max_texture_slots(&self) -> u32 {
        self.slot_layout.texture_slots
    }

    fn create_buffer(
        &self,
        usage: BufferUsage,
        size_bytes: usize,
        init_data: Option<&[u8]>
    ) -> Result<VkBuffer, EngineError> {
        unsafe { VkBuffer::new(&self.shared, usage, size_bytes, init_data) }
    }

    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<VkShader, EngineError> {
        unsafe { VkShader::new(&self.shared, stage, bytecode) }
    }

    fn load_texture(&self, path: &Path) -> Result<VkTexture, EngineError> {
        unsafe { VkTexture::from_file(&self.shared, path) }
    }

    fn write_buffer(&mut self, buffer: &VkBuffer, data: &[u8]) -> Result<(), EngineError> {
        unsafe { buffer.write_discard(data) }
    }

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<&VkShader>) -> Result<(), EngineError> {
        if let Some(shader) = shader {
            if shader.stage() != stage {
                return Err(EngineError::OpFailed(format!(
                    "Binding a {} shader to the {} stage", shader.stage(), stage)));
            }
        }
        if shader.is_none() {
            self.bound_buffers.clear_stage(stage);
            self.bound_textures.clear_stage(stage);
        }
        self.bound_shaders[stage.index()] = shader.map(|s| (s.id(), s.module()));
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: &VertexLayout) {
        self.vertex_layout = *layout;
    }

    fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
    }

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: &VkBuffer
    ) -> Result<(), EngineError> {
        Self::check_slot(stage, slot, MAX_CONSTANT_BUFFER_SLOTS, "Constant buffer")?;
        if buffer.usage() != BufferUsage::UniformBuffer {
            return Err(EngineError::OpFailed(String::from("Binding a vertex buffer as constant buffer")));
        }
        let (vk_buffer, offset) = buffer.current_binding();
        let bound = BoundBuffer {
            buffer: vk_buffer,
            offset,
            range: buffer.size_bytes() as vk::DeviceSize
        };
        self.bound_buffers.insert(constant_buffer_binding(stage, slot), bound, buffer.liveness());
        Ok(())
    }

    fn bind_texture(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        texture: &VkTexture
    ) -> Result<(), EngineError> {
        Self::check_slot(stage, slot, self.slot_layout.texture_slots, "Texture")?;
        self.bound_textures.insert(texture_binding(stage, slot), texture.image_view(), texture.liveness());
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &VkBuffer, stride: u32) -> Result<(), EngineError> {
        if buffer.usage() != BufferUsage::InitialiseOnceVertexBuffer {
            return Err(EngineError::OpFailed(String::from("Binding a constant buffer as vertex buffer")));
        }
        if stride != self.vertex_layout.stride {
            return Err(EngineError::OpFailed(format!(
                "Vertex buffer stride {} does not match layout stride {}", stride, self.vertex_layout.stride)));
        }
        self.bound_vertex_buffer = Some((buffer.buffer(), buffer.liveness()));
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32) -> Result<(), EngineError> {
        let Some(recording) = self.recording else {
            return Err(EngineError::NotReady(String::from("Draw outside of a pass")));
        };
        let vertex_buffer = match &self.bound_vertex_buffer {
            Some((buffer, alive)) if alive.upgrade().is_some() => *buffer,
            Some(_) => {
                return Err(EngineError::OpFailed(String::from("Vertex buffer was dropped while bound")));
            },
            None => {
                return Err(EngineError::OpFailed(String::from("Draw without a vertex buffer")));
            }
        };

        let key = PipelineKey {
            shaders: self.bound_shaders.map(|bound| bound.map(|(id, _)| id)),
            topology: self.topology,
            layout: self.vertex_layout
        };
        let modules = self.bound_shaders.map(|bound| bound.map(|(_, module)| module));
        self.bound_buffers.prune_dropped();
        self.bound_textures.prune_dropped();
        unsafe {
            let device = &self.shared.device;
            let pipeline = self.pipelines.get_or_create(
                device,
                self.slot_layout.pipeline_layout,
                &key,
                &modules)?;
            let descriptor_set = self.arenas[recording.arena]
                .allocate(device, self.slot_layout.descriptor_set_layout)?;
            self.write_descriptor_set(descriptor_set);

            let command_buffer = recording.command_buffer;
            device.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);
            let viewports = [vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: recording.extent.width as f32,
                height: recording.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0
            }];
            let scissors = [vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: recording.extent
            }];
            device.cmd_set_viewport(command_buffer, 0, &viewports);
            device.cmd_set_scissor(command_buffer, 0, &scissors);
            device.cmd_bind_descriptor_sets(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                self.slot_layout.pipeline_layout,
                0,
                &[descriptor_set],
                &[]);
            device.cmd_bind_vertex_buffers(command_buffer, 0, &[vertex_buffer], &[0]);
            device.cmd_draw(command_buffer, vertex_count, 1, 0, 0);
        }
        Ok(())
    }
}
