
use crate::renderable::WaterUniforms;
use crate::scene::{mesh::Mesh, transform::{Transform, WaterScroll}};
use cgmath::{Matrix4, Vector2, Vector3};
use error::EngineError;
use model::{AssetConfig, MaterialData};
use resource::{BufferUsage, GraphicsDevice, ShaderStage};
use std::path::Path;

/// Model struct
/// A mesh placed in the world. Vertex data is uploaded once at construction into two static
/// buffers: the full interleaved vertices, and the bare corner positions for passes that only
/// need depth. The world matrix is kept in step with the transform by every setter. Models used
/// as water also own a constant buffer for their scroll state, created by enable_water.
pub struct Model<D: GraphicsDevice> {
    name: String,
    mesh: Mesh<D>,
    transform: Transform,
    world_matrix: Matrix4<f32>,
    water: WaterScroll,
    water_buffer: Option<D::Buffer>,
    vertex_buffer: D::Buffer,
    position_buffer: D::Buffer
}

impl<D: GraphicsDevice> Model<D> {

    pub fn new(
        device: &D,
        config: &AssetConfig,
        name: &str,
        transform: Transform
    ) -> Result<Model<D>, EngineError> {
        let mesh = Mesh::load(device, config, name)?;
        if mesh.vertex_count() == 0 {
            return Err(EngineError::Malformed(format!("Model {} has no faces", name)));
        }

        let vertices = mesh.vertices();
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let vertex_buffer = device.create_buffer(
            BufferUsage::InitialiseOnceVertexBuffer,
            vertex_bytes.len(),
            Some(vertex_bytes))?;

        let position_bytes: &[u8] = bytemuck::cast_slice(mesh.positions());
        let position_buffer = device.create_buffer(
            BufferUsage::InitialiseOnceVertexBuffer,
            position_bytes.len(),
            Some(position_bytes))?;

        log::info!("Created model {} with {} vertices", name, mesh.vertex_count());
        Ok(Model {
            name: name.to_owned(),
            mesh,
            transform,
            world_matrix: transform.world_matrix(),
            water: WaterScroll::default(),
            water_buffer: None,
            vertex_buffer,
            position_buffer
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mesh(&self) -> &Mesh<D> {
        &self.mesh
    }

    pub fn world_matrix(&self) -> Matrix4<f32> {
        self.world_matrix
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn material_data(&self) -> &MaterialData {
        self.mesh.material_data()
    }

    pub fn vertex_buffer(&self) -> &D::Buffer {
        &self.vertex_buffer
    }

    pub fn position_buffer(&self) -> &D::Buffer {
        &self.position_buffer
    }

    pub fn material_buffer(&self) -> &D::Buffer {
        self.mesh.material_buffer()
    }

    pub fn displacement_texture(&self) -> Option<&D::Texture> {
        self.mesh.displacement_texture()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.transform.translation
    }

    pub fn rotation(&self) -> Vector3<f32> {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.transform.scale
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.world_matrix = transform.world_matrix();
    }

    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.set_transform(Transform { translation, ..self.transform });
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.set_transform(Transform { rotation, ..self.transform });
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.set_transform(Transform { scale, ..self.transform });
    }

    /// Advance the water texture scroll by one frame
    pub fn update_water(&mut self, speed: Vector2<f32>, delta_seconds: f32) {
        self.water.advance(speed, delta_seconds);
    }

    pub fn water_speed(&self) -> Vector2<f32> {
        self.water.speed()
    }

    pub fn uv_offset(&self) -> Vector2<f32> {
        self.water.offset()
    }

    /// Create the water constant buffer if the model does not have one yet
    pub fn enable_water(&mut self, device: &D) -> Result<(), EngineError> {
        if self.water_buffer.is_none() {
            let buffer = device.create_buffer(
                BufferUsage::UniformBuffer,
                std::mem::size_of::<WaterUniforms>(),
                None)?;
            log::debug!("Enabled water scrolling for model {}", self.name);
            self.water_buffer = Some(buffer);
        }
        Ok(())
    }

    pub fn water_buffer(&self) -> Option<&D::Buffer> {
        self.water_buffer.as_ref()
    }

    /// Upload the current scroll offset and speed to the water buffer
    pub fn write_water_buffer(&self, device: &mut D) -> Result<(), EngineError> {
        let buffer = self.water_buffer.as_ref()
            .ok_or_else(|| EngineError::MissingResource(format!(
                "Model {} has no water buffer", self.name)))?;
        let record = WaterUniforms::new(&self.water);
        device.write_buffer(buffer, bytemuck::bytes_of(&record))
    }

    /// Bind every diffuse texture to consecutive slots of a stage, starting at `start_slot`
    pub fn bind_textures(
        &self,
        device: &mut D,
        stage: ShaderStage,
        start_slot: u32
    ) -> Result<(), EngineError> {
        for (slot, texture) in (start_slot..).zip(self.mesh.diffuse_textures().iter()) {
            device.bind_texture(stage, slot, texture)?;
        }
        Ok(())
    }

    pub fn bind_displacement_texture(
        &self,
        device: &mut D,
        stage: ShaderStage,
        slot: u32
    ) -> Result<(), EngineError> {
        let texture = self.mesh.displacement_texture()
            .ok_or_else(|| EngineError::MissingResource(format!(
                "Model {} has no displacement texture", self.name)))?;
        device.bind_texture(stage, slot, texture)
    }

    /// Load another diffuse texture, bound after the ones from the material file
    pub fn add_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        self.mesh.add_diffuse_texture(device, path)
    }

    pub fn set_displacement_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        self.mesh.set_displacement_texture(device, path)
    }
}
