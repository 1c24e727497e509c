
use error::EngineError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// AssetConfig struct
/// Configuration for where model assets live on disk. Each model named `name` lives in its own
/// directory, `<models_root>/<name>/`, holding `<name>.<geometry_extension>` and
/// `<name>.<material_extension>` along with any textures the material refers to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub models_root: PathBuf,
    pub geometry_extension: String,
    pub material_extension: String
}

impl Default for AssetConfig {
    fn default() -> Self {
        AssetConfig {
            models_root: PathBuf::from("Models"),
            geometry_extension: String::from("obj"),
            material_extension: String::from("mtl")
        }
    }
}

impl AssetConfig {

    /// Configuration rooted at a different models directory, otherwise default
    pub fn with_models_root<P: Into<PathBuf>>(models_root: P) -> AssetConfig {
        AssetConfig {
            models_root: models_root.into(),
            ..AssetConfig::default()
        }
    }

    /// Parse configuration options from a TOML file. Keys left out take their default values.
    pub fn from_toml_file(path: &Path) -> Result<AssetConfig, EngineError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::from_io(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<AssetConfig, toml::de::Error> {
        toml::from_str(text)
    }

    /// Directory holding everything belonging to the named model
    pub fn asset_dir(&self, name: &str) -> PathBuf {
        self.models_root.join(name)
    }

    pub fn geometry_path(&self, name: &str) -> PathBuf {
        self.asset_dir(name).join(format!("{}.{}", name, self.geometry_extension))
    }

    pub fn material_path(&self, name: &str) -> PathBuf {
        self.asset_dir(name).join(format!("{}.{}", name, self.material_extension))
    }

    /// Resolve a file referenced from within a model's files, relative to that model's directory
    pub fn resolve_in_asset_dir(&self, name: &str, file: &str) -> PathBuf {
        self.asset_dir(name).join(file)
    }
}
