
use crate::config::{StageDescriptor, TerrainPassConfig};
use crate::renderable::{FrameUniforms, LightUniforms, TransformUniforms};
use crate::scene::model::Model;
use error::EngineError;
use resource::{BufferUsage, GraphicsDevice, PrimitiveTopology, ShaderStage, STATIC_VERTEX_LAYOUT};

const TRANSFORM_SLOT_DOMAIN: u32 = 0;
const LIGHT_SLOT_PIXEL: u32 = 0;
const MATERIAL_SLOT_PIXEL: u32 = 1;
const DIFFUSE_START_SLOT_PIXEL: u32 = 0;
const DISPLACEMENT_SLOT_PIXEL: u32 = 2;
const DISPLACEMENT_SLOT_DOMAIN: u32 = 0;

/// PassResources struct
/// Everything a terrain pass owns once it has loaded: one program per stage in pipeline order,
/// and the two per-pass constant buffers
pub struct PassResources<D: GraphicsDevice> {
    shaders: Vec<(ShaderStage, D::Shader)>,
    transform_buffer: D::Buffer,
    light_buffer: D::Buffer
}

impl<D: GraphicsDevice> PassResources<D> {

    pub fn shaders(&self) -> impl Iterator<Item = (ShaderStage, &D::Shader)> {
        self.shaders.iter().map(|(stage, shader)| (*stage, shader))
    }

    pub fn transform_buffer(&self) -> &D::Buffer {
        &self.transform_buffer
    }

    pub fn light_buffer(&self) -> &D::Buffer {
        &self.light_buffer
    }
}

/// RendererState enum
/// Whether a pass loaded everything it needs. Decided once, at construction.
pub enum RendererState<D: GraphicsDevice> {

    // Loading failed; nothing is held except the reason
    Uninitialized { reason: EngineError },

    Ready(PassResources<D>)
}

/// TerrainRenderer struct
/// The tessellated terrain pass. Draws a model through all five stages with its displacement
/// map sampled by both the domain stage (height) and the pixel stage (blending), then leaves
/// the tessellation and geometry stages unbound so that later passes start from a clean state.
pub struct TerrainRenderer<D: GraphicsDevice> {
    state: RendererState<D>
}

impl<D: GraphicsDevice> TerrainRenderer<D> {

    /// Load the pass. A failure is logged and leaves the renderer Uninitialized, in which state
    /// every render call is refused.
    pub fn new(device: &D, config: &TerrainPassConfig) -> TerrainRenderer<D> {
        let state = match Self::load_resources(device, config) {
            Ok(resources) => {
                log::info!("Terrain pass ready with {} stages", resources.shaders.len());
                RendererState::Ready(resources)
            },
            Err(reason) => {
                log::error!("Terrain pass unavailable: {}", reason);
                RendererState::Uninitialized { reason }
            }
        };
        TerrainRenderer { state }
    }

    /// Load the pass, returning the failure instead of holding on to it
    pub fn try_new(device: &D, config: &TerrainPassConfig) -> Result<TerrainRenderer<D>, EngineError> {
        let resources = Self::load_resources(device, config)?;
        Ok(TerrainRenderer { state: RendererState::Ready(resources) })
    }

    pub fn state(&self) -> &RendererState<D> {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn failure_reason(&self) -> Option<&EngineError> {
        match &self.state {
            RendererState::Uninitialized { reason } => Some(reason),
            RendererState::Ready(_) => None
        }
    }

    fn load_resources(device: &D, config: &TerrainPassConfig) -> Result<PassResources<D>, EngineError> {
        config.validate()?;

        // Programs created before a failure are dropped, and so released, on the way out
        let mut shaders = Vec::with_capacity(ShaderStage::ALL.len());
        for descriptor in config.ordered_stages() {
            let shader = Self::load_stage(device, descriptor)
                .map_err(|e| e.with_context(&format!(
                    "{} stage ({})", descriptor.stage, descriptor.path.display())))?;
            shaders.push((descriptor.stage, shader));
        }

        let transform_buffer = device.create_buffer(
            BufferUsage::UniformBuffer,
            std::mem::size_of::<TransformUniforms>(),
            None)?;
        let light_buffer = device.create_buffer(
            BufferUsage::UniformBuffer,
            std::mem::size_of::<LightUniforms>(),
            None)?;

        Ok(PassResources { shaders, transform_buffer, light_buffer })
    }

    fn load_stage(device: &D, descriptor: &StageDescriptor) -> Result<D::Shader, EngineError> {
        let bytecode = std::fs::read(&descriptor.path)
            .map_err(|e| EngineError::from_io(&descriptor.path, e))?;
        log::debug!("Creating {} program from {} bytes", descriptor.stage, bytecode.len());
        device.create_shader(descriptor.stage, &bytecode)
    }

    /// Draw one model. Nothing is recorded unless the pass is Ready, the model has a
    /// displacement map and its textures fit the device's slots. The optional stages are
    /// unbound afterwards even if a step failed.
    pub fn render(
        &self,
        device: &mut D,
        model: &Model<D>,
        frame: &FrameUniforms
    ) -> Result<(), EngineError> {
        let resources = match &self.state {
            RendererState::Ready(resources) => resources,
            RendererState::Uninitialized { reason } => {
                return Err(EngineError::NotReady(format!("Terrain pass did not load: {}", reason)));
            }
        };
        if model.displacement_texture().is_none() {
            return Err(EngineError::MissingResource(format!(
                "Terrain model {} has no displacement texture", model.name())));
        }
        let vertex_count = u32::try_from(model.vertex_count())
            .map_err(|_| EngineError::OpFailed(format!(
                "Model {} has too many vertices to draw", model.name())))?;
        Self::check_texture_slots(device, model)?;

        let result = Self::record_draw(device, resources, model, frame, vertex_count);
        let reset = Self::unbind_optional_stages(device);
        result.and(reset)
    }

    /// Every texture the pass binds must fit the slots the device offers
    fn check_texture_slots(device: &D, model: &Model<D>) -> Result<(), EngineError> {
        let diffuse_count = model.mesh().diffuse_textures().len();
        let pixel_slots = u32::try_from(diffuse_count)
            .ok()
            .and_then(|count| count.checked_add(DIFFUSE_START_SLOT_PIXEL))
            .map(|end| end.max(DISPLACEMENT_SLOT_PIXEL + 1));
        let available = device.max_texture_slots();
        match pixel_slots {
            Some(needed) if needed <= available && DISPLACEMENT_SLOT_DOMAIN < available => Ok(()),
            _ => Err(EngineError::OpFailed(format!(
                "Model {} has {} diffuse textures but the device offers {} texture slots per stage",
                model.name(),
                diffuse_count,
                available)))
        }
    }

    fn record_draw(
        device: &mut D,
        resources: &PassResources<D>,
        model: &Model<D>,
        frame: &FrameUniforms,
        vertex_count: u32
    ) -> Result<(), EngineError> {

        // Programs and input assembly
        for (stage, shader) in resources.shaders() {
            device.set_shader(stage, Some(shader))?;
        }
        device.set_vertex_layout(&STATIC_VERTEX_LAYOUT);
        device.set_topology(PrimitiveTopology::ThreeControlPointPatchList);

        // Constant buffers
        let transform = TransformUniforms::new(frame, model.world_matrix());
        device.write_buffer(&resources.transform_buffer, bytemuck::bytes_of(&transform))?;
        device.bind_constant_buffer(ShaderStage::Domain, TRANSFORM_SLOT_DOMAIN, &resources.transform_buffer)?;

        device.write_buffer(model.material_buffer(), bytemuck::bytes_of(model.material_data()))?;
        device.bind_constant_buffer(ShaderStage::Pixel, MATERIAL_SLOT_PIXEL, model.material_buffer())?;

        let light = LightUniforms::new(frame);
        device.write_buffer(&resources.light_buffer, bytemuck::bytes_of(&light))?;
        device.bind_constant_buffer(ShaderStage::Pixel, LIGHT_SLOT_PIXEL, &resources.light_buffer)?;

        // Textures
        model.bind_textures(device, ShaderStage::Pixel, DIFFUSE_START_SLOT_PIXEL)?;
        model.bind_displacement_texture(device, ShaderStage::Pixel, DISPLACEMENT_SLOT_PIXEL)?;
        model.bind_displacement_texture(device, ShaderStage::Domain, DISPLACEMENT_SLOT_DOMAIN)?;

        device.bind_vertex_buffer(model.vertex_buffer(), STATIC_VERTEX_LAYOUT.stride)?;
        device.draw(vertex_count)
    }

    fn unbind_optional_stages(device: &mut D) -> Result<(), EngineError> {
        for stage in ShaderStage::OPTIONAL.iter() {
            device.set_shader(*stage, None)?;
        }
        Ok(())
    }
}
