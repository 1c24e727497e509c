mod config;
mod renderable;
mod scene;

#[cfg(test)]
mod tests;

pub use config::{StageDescriptor, TerrainPassConfig};
pub use renderable::{FrameUniforms, LightUniforms, TransformUniforms, WaterUniforms};
pub use renderable::terrain::{PassResources, RendererState, TerrainRenderer};
pub use scene::{material::Material, mesh::Mesh, model::Model, transform::{Transform, WaterScroll}};
