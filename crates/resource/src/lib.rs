mod device;
mod null;


pub use device::GraphicsDevice;
pub use null::{DeviceCommand, NullBuffer, NullDevice, NullShader, NullTexture};

use model::StaticVertex;
use serde::Deserialize;

/// Number of constant buffer slots available to each shader stage
pub const MAX_CONSTANT_BUFFER_SLOTS: u32 = 2;

/// Upper bound on texture slots per shader stage, matching the 128 shader resource slots of a
/// D3D11 stage. A device may offer fewer; see GraphicsDevice::max_texture_slots.
pub const MAX_TEXTURE_SLOTS: u32 = 128;

/// BufferUsage enum
/// An enumeration of what purpose buffer resources can be used for
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BufferUsage {

    // Filled once at creation, read by the vertex input stage, never written again
    InitialiseOnceVertexBuffer,

    // Small constant record read by shader stages, rewritten by the CPU every frame it is used
    UniformBuffer
}

/// ShaderStage enum
/// The fixed set of programmable stages, in pipeline order
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel
}

impl ShaderStage {

    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel
    ];

    /// Stages that a pass may leave unbound; vertex and pixel stages are always needed to draw
    pub const OPTIONAL: [ShaderStage; 3] = [
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry
    ];

    /// Position of this stage in pipeline order
    pub fn index(&self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Hull => 1,
            ShaderStage::Domain => 2,
            ShaderStage::Geometry => 3,
            ShaderStage::Pixel => 4
        }
    }

    pub fn is_optional(&self) -> bool {
        Self::OPTIONAL.contains(self)
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Hull => "hull",
            ShaderStage::Domain => "domain",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Pixel => "pixel"
        };
        f.write_str(name)
    }
}

/// PrimitiveTopology enum
/// How the vertex stream is assembled into primitives
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PrimitiveTopology {
    TriangleList,

    // Patches of three control points, consumed by the tessellation stages
    ThreeControlPointPatchList
}

/// AttributeFormat enum
/// Formats a vertex attribute can take
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AttributeFormat {
    Float2,
    Float3
}

/// VertexAttribute struct
/// One attribute within an interleaved vertex
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u32,
    pub format: AttributeFormat
}

/// VertexLayout struct
/// Description of an interleaved vertex as seen by the input assembler
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: &'static [VertexAttribute]
}

/// Layout of model::StaticVertex: position, texture coordinate, normal
pub const STATIC_VERTEX_LAYOUT: VertexLayout = VertexLayout {
    stride: std::mem::size_of::<StaticVertex>() as u32,
    attributes: &[
        VertexAttribute { location: 0, offset: 0, format: AttributeFormat::Float3 },
        VertexAttribute { location: 1, offset: 12, format: AttributeFormat::Float2 },
        VertexAttribute { location: 2, offset: 20, format: AttributeFormat::Float3 }
    ]
};
