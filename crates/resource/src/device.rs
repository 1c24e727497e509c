
use crate::{BufferUsage, PrimitiveTopology, ShaderStage, VertexLayout};
use error::EngineError;
use std::path::Path;

/// GraphicsDevice trait
/// The capabilities the engine needs from a graphics API: creating buffers, stage programs and
/// textures, and recording the binding and draw commands of a pass.
///
/// Handles returned by the create functions own the underlying GPU object and release it when
/// dropped, so whoever holds a handle is responsible for its lifetime and nothing is released
/// twice.
///
/// Slot numbers are per stage. Constant buffer slots run up to MAX_CONSTANT_BUFFER_SLOTS and
/// texture slots up to max_texture_slots(); binding beyond those is an error.
pub trait GraphicsDevice {

    type Buffer;
    type Shader;
    type Texture;

    /// Number of texture slots each stage offers on this device, never above MAX_TEXTURE_SLOTS
    fn max_texture_slots(&self) -> u32;

    /// Create a buffer of the given size, optionally filled with initial data
    fn create_buffer(
        &self,
        usage: BufferUsage,
        size_bytes: usize,
        init_data: Option<&[u8]>
    ) -> Result<Self::Buffer, EngineError>;

    /// Create a program for one stage from compiled bytecode
    fn create_shader(
        &self,
        stage: ShaderStage,
        bytecode: &[u8]
    ) -> Result<Self::Shader, EngineError>;

    /// Load an image file into a texture that can be sampled by any stage
    fn load_texture(&self, path: &Path) -> Result<Self::Texture, EngineError>;

    /// Replace the whole contents of a uniform buffer. The buffer's memory is mapped with its
    /// previous contents discarded, the data copied in, and the memory unmapped again before
    /// this returns.
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]) -> Result<(), EngineError>;

    /// Bind a program to a stage, or unbind the stage with None
    fn set_shader(
        &mut self,
        stage: ShaderStage,
        shader: Option<&Self::Shader>
    ) -> Result<(), EngineError>;

    fn set_vertex_layout(&mut self, layout: &VertexLayout);

    fn set_topology(&mut self, topology: PrimitiveTopology);

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: &Self::Buffer
    ) -> Result<(), EngineError>;

    fn bind_texture(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        texture: &Self::Texture
    ) -> Result<(), EngineError>;

    fn bind_vertex_buffer(&mut self, buffer: &Self::Buffer, stride: u32) -> Result<(), EngineError>;

    /// Draw non-indexed primitives from the bound vertex buffer using the current state
    fn draw(&mut self, vertex_count: u32) -> Result<(), EngineError>;
}
