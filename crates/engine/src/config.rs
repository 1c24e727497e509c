
use error::EngineError;
use resource::ShaderStage;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// StageDescriptor struct
/// One entry of a pass's program list: which stage, and where its compiled binary lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StageDescriptor {
    pub stage: ShaderStage,
    pub path: PathBuf
}

impl StageDescriptor {
    pub fn new<P: Into<PathBuf>>(stage: ShaderStage, path: P) -> StageDescriptor {
        StageDescriptor { stage, path: path.into() }
    }
}

/// TerrainPassConfig struct
/// The stage programs making up the terrain pass. A TOML file may override the list:
///
/// ```toml
/// [[stages]]
/// stage = "vertex"
/// path = "shaders/terrain.vert.spv"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainPassConfig {
    pub stages: Vec<StageDescriptor>
}

impl Default for TerrainPassConfig {
    fn default() -> Self {
        TerrainPassConfig {
            stages: vec![
                StageDescriptor::new(ShaderStage::Vertex, "shaders/terrain.vert.spv"),
                StageDescriptor::new(ShaderStage::Hull, "shaders/terrain.tesc.spv"),
                StageDescriptor::new(ShaderStage::Domain, "shaders/terrain.tese.spv"),
                StageDescriptor::new(ShaderStage::Geometry, "shaders/terrain.geom.spv"),
                StageDescriptor::new(ShaderStage::Pixel, "shaders/terrain.frag.spv")
            ]
        }
    }
}

impl TerrainPassConfig {

    /// Default program list with every path placed under a different directory
    pub fn in_directory(dir: &Path) -> TerrainPassConfig {
        let mut config = TerrainPassConfig::default();
        for descriptor in config.stages.iter_mut() {
            let file_name = descriptor.path.file_name()
                .map(PathBuf::from)
                .unwrap_or_default();
            descriptor.path = dir.join(file_name);
        }
        config
    }

    pub fn from_toml_file(path: &Path) -> Result<TerrainPassConfig, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::from_io(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| e.with_context(&path.display().to_string()))
    }

    /// Parse and validate a TOML program list
    pub fn from_toml_str(text: &str) -> Result<TerrainPassConfig, EngineError> {
        let config: TerrainPassConfig = toml::from_str(text)
            .map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Every stage must appear exactly once
    pub fn validate(&self) -> Result<(), EngineError> {
        for stage in ShaderStage::ALL.iter() {
            let count = self.stages.iter()
                .filter(|descriptor| descriptor.stage == *stage)
                .count();
            if count != 1 {
                return Err(EngineError::Config(format!(
                    "{} stage listed {} times, expected once", stage, count)));
            }
        }
        Ok(())
    }

    /// Descriptors sorted into pipeline order
    pub(crate) fn ordered_stages(&self) -> Vec<&StageDescriptor> {
        let mut stages: Vec<&StageDescriptor> = self.stages.iter().collect();
        stages.sort_by_key(|descriptor| descriptor.stage.index());
        stages
    }
}
