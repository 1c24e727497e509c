
use crate::config::AssetConfig;
use crate::tokens::{in_file, TokenStream};
use crate::types::MaterialData;
use error::EngineError;
use std::path::PathBuf;

/// MaterialDescription struct
/// Everything read from a material file: the colour record that gets uploaded to the GPU, and
/// the texture files it refers to, resolved against the model's own directory.
#[derive(Debug, Default)]
pub struct MaterialDescription {
    pub data: MaterialData,
    pub diffuse_maps: Vec<PathBuf>,
    pub displacement_map: Option<PathBuf>
}

/// MaterialParser struct
/// Reader for the subset of the Wavefront MTL format used by model assets: `Ka`, `Kd`, `Ks`,
/// `map_Kd` and `disp`. Every `map_Kd` adds another diffuse map, in file order.
pub struct MaterialParser;

impl MaterialParser {

    /// Locate the material file for the named model and parse it
    pub fn load(config: &AssetConfig, name: &str) -> Result<MaterialDescription, EngineError> {
        let path = config.material_path(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::from_io(&path, e))?;
        let description = Self::parse(&source, |file| config.resolve_in_asset_dir(name, file))
            .map_err(|e| in_file(&path, e))?;
        log::info!(
            "Loaded material {}: {} diffuse maps",
            path.display(),
            description.diffuse_maps.len());
        Ok(description)
    }

    /// Parse material file contents. Texture file names are passed through `resolve` to turn
    /// them into paths.
    pub fn parse<F>(source: &str, resolve: F) -> Result<MaterialDescription, EngineError>
        where F: Fn(&str) -> PathBuf
    {
        let mut tokens = TokenStream::new(source);
        let mut description = MaterialDescription::default();

        while let Some(directive) = tokens.next() {
            match directive.text {
                "Ka" => {
                    let colour = tokens.f32_fields::<3>(&directive)?;
                    description.data.ambient = MaterialData::pad_colour(colour);
                },
                "Kd" => {
                    let colour = tokens.f32_fields::<3>(&directive)?;
                    description.data.diffuse = MaterialData::pad_colour(colour);
                },
                "Ks" => {
                    let colour = tokens.f32_fields::<3>(&directive)?;
                    description.data.specular = MaterialData::pad_colour(colour);
                },
                "map_Kd" => {
                    let file = tokens.field(&directive)?;
                    description.diffuse_maps.push(resolve(file.text));
                },
                "disp" => {
                    let file = tokens.field(&directive)?;
                    if description.displacement_map.is_some() {
                        log::warn!("Line {}: replacing earlier displacement map", directive.line);
                    }
                    description.displacement_map = Some(resolve(file.text));
                },
                other => {
                    if !other.starts_with('#') {
                        log::debug!("Skipping material directive '{}' on line {}", other, directive.line);
                    }
                }
            }
            tokens.skip_rest_of_line();
        }

        Ok(description)
    }
}
