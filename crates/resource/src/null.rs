
use crate::{
    BufferUsage, GraphicsDevice, PrimitiveTopology, ShaderStage, VertexLayout,
    MAX_CONSTANT_BUFFER_SLOTS, MAX_TEXTURE_SLOTS
};
use error::EngineError;
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// DeviceCommand enum
/// A command recorded by the NullDevice, with resources identified by their handle IDs
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCommand {
    WriteBuffer { buffer: u32, size_bytes: usize },
    SetShader { stage: ShaderStage, shader: Option<u32> },
    SetVertexLayout { stride: u32 },
    SetTopology(PrimitiveTopology),
    BindConstantBuffer { stage: ShaderStage, slot: u32, buffer: u32 },
    BindTexture { stage: ShaderStage, slot: u32, texture: u32 },
    BindVertexBuffer { buffer: u32, stride: u32 },
    Draw { vertex_count: u32 }
}

#[derive(Default)]
struct NullDeviceState {
    next_id: u32,
    live: HashSet<u32>,
    released: Vec<u32>,
    buffer_successes_left: Option<usize>,
    rejected_stages: Vec<ShaderStage>
}

impl NullDeviceState {

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.live.insert(self.next_id);
        self.next_id
    }

    fn release(&mut self, id: u32) {
        if !self.live.remove(&id) {
            log::error!("Null resource {} released twice", id);
        }
        self.released.push(id);
    }
}

/// NullBuffer struct
/// Buffer handle of the NullDevice; keeps a CPU copy of its contents
pub struct NullBuffer {
    id: u32,
    usage: BufferUsage,
    contents: RefCell<Vec<u8>>,
    state: Rc<RefCell<NullDeviceState>>
}

impl NullBuffer {

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn size_bytes(&self) -> usize {
        self.contents.borrow().len()
    }

    pub fn contents(&self) -> Ref<'_, Vec<u8>> {
        self.contents.borrow()
    }
}

impl Drop for NullBuffer {
    fn drop(&mut self) {
        self.state.borrow_mut().release(self.id);
    }
}

/// NullShader struct
/// Stage program handle of the NullDevice
pub struct NullShader {
    id: u32,
    stage: ShaderStage,
    state: Rc<RefCell<NullDeviceState>>
}

impl NullShader {

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for NullShader {
    fn drop(&mut self) {
        self.state.borrow_mut().release(self.id);
    }
}

/// NullTexture struct
/// Texture handle of the NullDevice; remembers the path it was requested with
pub struct NullTexture {
    id: u32,
    path: PathBuf,
    state: Rc<RefCell<NullDeviceState>>
}

impl NullTexture {

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for NullTexture {
    fn drop(&mut self) {
        self.state.borrow_mut().release(self.id);
    }
}

/// NullDevice struct
/// A device with no GPU behind it. Resource creation hands out numbered handles, commands are
/// recorded in order, and the binding state is tracked so that tests can check what a pass did
/// and that every resource was released exactly once. Draws and buffer writes are validated the
/// way a real API would reject them.
pub struct NullDevice {
    state: Rc<RefCell<NullDeviceState>>,
    commands: Vec<DeviceCommand>,
    bound_shaders: [Option<u32>; 5],
    bound_vertex_buffer: Option<u32>,
    texture_slots: u32,
    fail_texture_binds: bool
}

impl NullDevice {

    pub fn new() -> NullDevice {
        NullDevice {
            state: Rc::new(RefCell::new(NullDeviceState::default())),
            commands: vec![],
            bound_shaders: [None; 5],
            bound_vertex_buffer: None,
            texture_slots: MAX_TEXTURE_SLOTS,
            fail_texture_binds: false
        }
    }

    /// Offer fewer texture slots per stage, the way a smaller device would
    pub fn limit_texture_slots(&mut self, slots: u32) {
        self.texture_slots = slots.min(MAX_TEXTURE_SLOTS);
    }

    /// Make every later texture bind fail
    pub fn fail_texture_binds(&mut self) {
        self.fail_texture_binds = true;
    }

    /// Allow only this many more buffers to be created; later creations fail
    pub fn fail_buffers_after(&self, successes: usize) {
        self.state.borrow_mut().buffer_successes_left = Some(successes);
    }

    /// Make creation of programs for the given stage fail
    pub fn reject_stage(&self, stage: ShaderStage) {
        self.state.borrow_mut().rejected_stages.push(stage);
    }

    /// Commands recorded so far
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the log empty
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    /// ID of the program currently bound to a stage
    pub fn bound_shader(&self, stage: ShaderStage) -> Option<u32> {
        self.bound_shaders[stage.index()]
    }

    /// Number of handles created and not yet released
    pub fn live_resource_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// IDs of released handles, in release order
    pub fn released(&self) -> Vec<u32> {
        self.state.borrow().released.clone()
    }

    fn check_slot(stage: ShaderStage, slot: u32, limit: u32, kind: &str) -> Result<(), EngineError> {
        if slot >= limit {
            return Err(EngineError::OpFailed(format!(
                "{} slot {} out of range for {} stage (limit {})", kind, slot, stage, limit)));
        }
        Ok(())
    }
}

impl Default for NullDevice {
    fn default() -> Self {
        NullDevice::new()
    }
}

impl GraphicsDevice for NullDevice {

    type Buffer = NullBuffer;
    type Shader = NullShader;
    type Texture = NullTexture;

    fn max_texture_slots(&self) -> u32 {
        self.texture_slots
    }

    fn create_buffer(
        &self,
        usage: BufferUsage,
        size_bytes: usize,
        init_data: Option<&[u8]>
    ) -> Result<NullBuffer, EngineError> {
        let mut state = self.state.borrow_mut();
        if let Some(successes_left) = state.buffer_successes_left.as_mut() {
            if *successes_left == 0 {
                return Err(EngineError::OpFailed(String::from("Error creating buffer: out of memory")));
            }
            *successes_left -= 1;
        }
        let mut contents = vec![0; size_bytes];
        if let Some(data) = init_data {
            if data.len() > size_bytes {
                return Err(EngineError::OpFailed(format!(
                    "Initial data of {} bytes does not fit buffer of {} bytes",
                    data.len(),
                    size_bytes)));
            }
            contents[..data.len()].copy_from_slice(data);
        }
        let id = state.allocate_id();
        Ok(NullBuffer {
            id,
            usage,
            contents: RefCell::new(contents),
            state: self.state.clone()
        })
    }

    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> Result<NullShader, EngineError> {
        let mut state = self.state.borrow_mut();
        if state.rejected_stages.contains(&stage) || bytecode.is_empty() {
            return Err(EngineError::OpFailed(format!("Error creating {} shader", stage)));
        }
        let id = state.allocate_id();
        Ok(NullShader {
            id,
            stage,
            state: self.state.clone()
        })
    }

    fn load_texture(&self, path: &Path) -> Result<NullTexture, EngineError> {
        let id = self.state.borrow_mut().allocate_id();
        Ok(NullTexture {
            id,
            path: path.to_path_buf(),
            state: self.state.clone()
        })
    }

    fn write_buffer(&mut self, buffer: &NullBuffer, data: &[u8]) -> Result<(), EngineError> {
        if buffer.usage != BufferUsage::UniformBuffer {
            return Err(EngineError::OpFailed(format!(
                "Buffer {} is not writable after creation", buffer.id)));
        }
        let mut contents = buffer.contents.borrow_mut();
        if data.len() > contents.len() {
            return Err(EngineError::OpFailed(format!(
                "Writing {} bytes to buffer {} of {} bytes", data.len(), buffer.id, contents.len())));
        }

        // Discard semantics: nothing of the previous contents survives
        contents.fill(0);
        contents[..data.len()].copy_from_slice(data);
        self.commands.push(DeviceCommand::WriteBuffer { buffer: buffer.id, size_bytes: data.len() });
        Ok(())
    }

    fn set_shader(
        &mut self,
        stage: ShaderStage,
        shader: Option<&NullShader>
    ) -> Result<(), EngineError> {
        if let Some(shader) = shader {
            if shader.stage != stage {
                return Err(EngineError::OpFailed(format!(
                    "Binding a {} shader to the {} stage", shader.stage, stage)));
            }
        }
        let id = shader.map(|s| s.id);
        self.bound_shaders[stage.index()] = id;
        self.commands.push(DeviceCommand::SetShader { stage, shader: id });
        Ok(())
    }

    fn set_vertex_layout(&mut self, layout: &VertexLayout) {
        self.commands.push(DeviceCommand::SetVertexLayout { stride: layout.stride });
    }

    fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.commands.push(DeviceCommand::SetTopology(topology));
    }

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: &NullBuffer
    ) -> Result<(), EngineError> {
        Self::check_slot(stage, slot, MAX_CONSTANT_BUFFER_SLOTS, "Constant buffer")?;
        self.commands.push(DeviceCommand::BindConstantBuffer { stage, slot, buffer: buffer.id });
        Ok(())
    }

    fn bind_texture(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        texture: &NullTexture
    ) -> Result<(), EngineError> {
        Self::check_slot(stage, slot, self.texture_slots, "Texture")?;
        if self.fail_texture_binds {
            return Err(EngineError::OpFailed(format!("Error binding texture {}", texture.id)));
        }
        self.commands.push(DeviceCommand::BindTexture { stage, slot, texture: texture.id });
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &NullBuffer, stride: u32) -> Result<(), EngineError> {
        if buffer.usage != BufferUsage::InitialiseOnceVertexBuffer {
            return Err(EngineError::OpFailed(format!(
                "Buffer {} is not a vertex buffer", buffer.id)));
        }
        self.bound_vertex_buffer = Some(buffer.id);
        self.commands.push(DeviceCommand::BindVertexBuffer { buffer: buffer.id, stride });
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32) -> Result<(), EngineError> {
        if self.bound_shader(ShaderStage::Vertex).is_none()
            || self.bound_shader(ShaderStage::Pixel).is_none() {
            return Err(EngineError::OpFailed(String::from(
                "Draw without vertex and pixel stages bound")));
        }
        if self.bound_vertex_buffer.is_none() {
            return Err(EngineError::OpFailed(String::from("Draw without a vertex buffer")));
        }
        self.commands.push(DeviceCommand::Draw { vertex_count });
        Ok(())
    }
}
