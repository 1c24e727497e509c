
use crate::device::DeviceShared;
use error::EngineError;
use resource::ShaderStage;
use ash::vk;
use std::rc::Rc;

/// Check compiled SPIR-V and convert it to the word stream Vulkan consumes
pub fn spirv_words(bytecode: &[u8]) -> Result<Vec<u32>, EngineError> {
    let mut cursor = std::io::Cursor::new(bytecode);
    ash::util::read_spv(&mut cursor)
        .map_err(|e| EngineError::Malformed(format!("Invalid SPIR-V: {}", e)))
}

/// VkShader struct
/// A shader module compiled for one stage
pub struct VkShader {
    shared: Rc<DeviceShared>,
    id: u64,
    module: vk::ShaderModule,
    stage: ShaderStage
}

impl VkShader {

    pub(crate) unsafe fn new(
        shared: &Rc<DeviceShared>,
        stage: ShaderStage,
        bytecode: &[u8]
    ) -> Result<VkShader, EngineError> {
        let words = spirv_words(bytecode)?;
        let create_info = vk::ShaderModuleCreateInfo::builder()
            .code(&words);
        let module = shared.device.create_shader_module(&create_info, None)
            .map_err(|e| {
                EngineError::OpFailed(format!("Error creating {} shader module: {:?}", stage, e))
            })?;
        Ok(VkShader {
            shared: shared.clone(),
            id: shared.next_shader_id(),
            module,
            stage
        })
    }

    /// Identifier unique among all shaders of a device, unlike module handles which may be reused
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn module(&self) -> vk::ShaderModule {
        self.module
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl Drop for VkShader {
    fn drop(&mut self) {
        unsafe {
            self.shared.device.destroy_shader_module(self.module, None);
        }
    }
}
