
use crate::scene::material::Material;
use error::EngineError;
use model::{AssetConfig, Face, Geometry, GeometryParser, MaterialData, StaticVertex};
use resource::GraphicsDevice;
use std::path::Path;

/// Mesh struct
/// A model asset loaded from its geometry and material files
pub struct Mesh<D: GraphicsDevice> {
    geometry: Geometry,
    material: Material<D>
}

impl<D: GraphicsDevice> Mesh<D> {

    /// Load both files of the named asset. Geometry is parsed before any GPU resource is created.
    pub fn load(device: &D, config: &AssetConfig, name: &str) -> Result<Mesh<D>, EngineError> {
        let geometry = GeometryParser::load(config, name)?;
        let material = Material::load(device, config, name)?;
        Ok(Mesh { geometry, material })
    }

    pub fn faces(&self) -> &[Face] {
        &self.geometry.faces
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.geometry.positions
    }

    pub fn vertices(&self) -> Vec<StaticVertex> {
        self.geometry.vertices()
    }

    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn material(&self) -> &Material<D> {
        &self.material
    }

    pub fn material_data(&self) -> &MaterialData {
        self.material.data()
    }

    pub fn diffuse_textures(&self) -> &[D::Texture] {
        self.material.diffuse_textures()
    }

    pub fn displacement_texture(&self) -> Option<&D::Texture> {
        self.material.displacement_texture()
    }

    pub fn material_buffer(&self) -> &D::Buffer {
        self.material.buffer()
    }

    pub fn add_diffuse_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        self.material.add_diffuse_texture(device, path)
    }

    pub fn set_displacement_texture(&mut self, device: &D, path: &Path) -> Result<(), EngineError> {
        self.material.set_displacement_texture(device, path)
    }
}
