
use error::EngineError;
use model::{AssetConfig, MaterialData, MaterialDescription, MaterialParser};
use resource::{BufferUsage, GraphicsDevice};
use std::path::Path;

/// Material struct
/// The GPU side of a material file: its colour record, the textures it names, and the constant
/// buffer the colour record is uploaded into before each draw
pub struct Material<D: GraphicsDevice> {
    data: MaterialData,
    diffuse_textures: Vec<D::Texture>,
    displacement_texture: Option<D::Texture>,
    buffer: D::Buffer
}

impl<D: GraphicsDevice> Material<D> {

    pub fn load(device: &D, config: &AssetConfig, name: &str) -> Result<Material<D>, EngineError> {
        let description = MaterialParser::load(config, name)?;
        Self::from_description(device, &description)
    }

    /// Create the textures and the constant buffer for an already parsed material. Anything
    /// created before a failure is released on the way out.
    pub fn from_description(
        device: &D,
        description: &MaterialDescription
    ) -> Result<Material<D>, EngineError> {
        let diffuse_textures = description.diffuse_maps.iter()
            .map(|path| device.load_texture(path))
            .collect::<Result<Vec<_>, _>>()?;
        let displacement_texture = match &description.displacement_map {
            Some(path) => Some(device.load_texture(path)?),
            None => None
        };
        let buffer = device.create_buffer(
            BufferUsage::UniformBuffer,
            std::mem::size_of::<MaterialData>(),
            None)?;
        Ok(Material {
            data: description.data,
            diffuse_textures,
            displacement_texture,
            buffer
        })
    }

    pub fn data(&self) -> &MaterialData {
        &self.data
    }

    pub fn diffuse_textures(&self) -> &[D::Texture] {
        &self.diffuse_textures
    }

    pub fn displacement_texture(&self) -> Option<&D::Texture> {
        self.displacement_texture.as_ref()
    }

    pub fn buffer(&self) -> &D::Buffer {
        &self.buffer
    }

    pub fn add_diffuse_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        let texture = device.load_texture(path)?;
        self.diffuse_textures.push(texture);
        Ok(())
    }

    /// Replace the displacement map; the previous one, if any, is released
    pub fn set_displacement_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        let texture = device.load_texture(path)?;
        self.displacement_texture = Some(texture);
        Ok(())
    }
}
