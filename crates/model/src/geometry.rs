
use crate::config::AssetConfig;
use crate::pools::{AttributePools, PoolIndex};
use crate::tokens::{in_file, Token, TokenStream};
use crate::types::{Face, StaticVertex};
use error::EngineError;

/// Geometry struct
/// Triangles read from a geometry file, each corner resolved into a full vertex, along with the
/// position of every corner in the same order for consumers that only need positions.
#[derive(Debug, Default)]
pub struct Geometry {
    pub faces: Vec<Face>,
    pub positions: Vec<[f32; 3]>
}

impl Geometry {

    /// Number of vertices making up the triangles; always three per face
    pub fn vertex_count(&self) -> usize {
        self.faces.len() * 3
    }

    /// All corners, flattened in draw order
    pub fn vertices(&self) -> Vec<StaticVertex> {
        self.faces.iter()
            .flat_map(|face| face.corners)
            .collect()
    }
}

/// CornerIndices struct
/// The three pool indices named by one face corner (`p/t/n`)
#[derive(Copy, Clone, Debug)]
struct CornerIndices {
    position: PoolIndex,
    tex_coord: PoolIndex,
    normal: PoolIndex
}

/// GeometryParser struct
/// Reader for the subset of the Wavefront OBJ format used by model assets: `v`, `vt`, `vn` and
/// triangulated `f` records with `p/t/n` corners. Other directives and comments are skipped.
pub struct GeometryParser;

impl GeometryParser {

    /// Locate the geometry file for the named model and parse it
    pub fn load(config: &AssetConfig, name: &str) -> Result<Geometry, EngineError> {
        let path = config.geometry_path(name);
        let source = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::from_io(&path, e))?;
        let geometry = Self::parse(&source)
            .map_err(|e| in_file(&path, e))?;
        log::info!(
            "Loaded geometry {}: {} faces, {} vertices",
            path.display(),
            geometry.faces.len(),
            geometry.vertex_count());
        Ok(geometry)
    }

    /// Parse geometry file contents
    pub fn parse(source: &str) -> Result<Geometry, EngineError> {
        let mut tokens = TokenStream::new(source);
        let mut pools = AttributePools::default();
        let mut face_records: Vec<(usize, [CornerIndices; 3])> = vec![];

        while let Some(directive) = tokens.next() {
            match directive.text {
                "v" => {
                    let position = tokens.f32_fields::<3>(&directive)?;
                    pools.push_position(position);
                },
                "vt" => {
                    let [u, v] = tokens.f32_fields::<2>(&directive)?;

                    // Texture space in the files has V pointing up; sampling has it pointing down
                    pools.push_tex_coord([u, 1.0 - v]);
                },
                "vn" => {
                    let normal = tokens.f32_fields::<3>(&directive)?;
                    pools.push_normal(normal);
                },
                "f" => {
                    let corners = [
                        Self::parse_corner(tokens.field(&directive)?)?,
                        Self::parse_corner(tokens.field(&directive)?)?,
                        Self::parse_corner(tokens.field(&directive)?)?
                    ];
                    if let Some(extra) = tokens.peek_same_line() {
                        if !extra.text.starts_with('#') {
                            return Err(EngineError::Malformed(format!(
                                "line {}: face has more than three corners",
                                extra.line)));
                        }
                    }
                    face_records.push((directive.line, corners));
                    continue;
                },
                other => {
                    if !other.starts_with('#') {
                        log::debug!("Skipping geometry directive '{}' on line {}", other, directive.line);
                    }
                }
            }
            tokens.skip_rest_of_line();
        }

        let mut geometry = Geometry {
            faces: Vec::with_capacity(face_records.len()),
            positions: Vec::with_capacity(face_records.len() * 3)
        };
        for (line, corners) in face_records.iter() {
            let mut vertices = [StaticVertex::default(); 3];
            for (vertex, indices) in vertices.iter_mut().zip(corners.iter()) {
                *vertex = Self::resolve_corner(&pools, indices)
                    .map_err(|e| match e {
                        EngineError::Malformed(message) => EngineError::Malformed(
                            format!("line {}: {}", line, message)),
                        other => other
                    })?;
                geometry.positions.push(vertex.position());
            }
            geometry.faces.push(Face::new(vertices[0], vertices[1], vertices[2]));
        }

        Ok(geometry)
    }

    /// Split a `p/t/n` corner on its first and second slashes into three one-based indices
    fn parse_corner(token: Token) -> Result<CornerIndices, EngineError> {
        let malformed = |reason: &str| EngineError::Malformed(format!(
            "line {}: bad face corner '{}' ({})", token.line, token.text, reason));

        let (position, rest) = token.text.split_once('/')
            .ok_or_else(|| malformed("expected p/t/n"))?;
        let (tex_coord, normal) = rest.split_once('/')
            .ok_or_else(|| malformed("expected p/t/n"))?;

        let parse_index = |text: &str| -> Result<PoolIndex, EngineError> {
            let value = text.parse::<i64>()
                .map_err(|_| malformed("index is not an integer"))?;
            PoolIndex::from_one_based(value)
                .ok_or_else(|| malformed("indices must be positive"))
        };

        Ok(CornerIndices {
            position: parse_index(position)?,
            tex_coord: parse_index(tex_coord)?,
            normal: parse_index(normal)?
        })
    }

    fn resolve_corner(
        pools: &AttributePools,
        indices: &CornerIndices
    ) -> Result<StaticVertex, EngineError> {
        Ok(StaticVertex::from_components(
            pools.position(indices.position)?,
            pools.tex_coord(indices.tex_coord)?,
            pools.normal(indices.normal)?))
    }
}
