
use bytemuck::{Pod, Zeroable};

/// StaticVertex struct
/// Vertex definition for a three-dimensional vertex with a position, two-dimensional texture
/// coordinate and normal, in that order. This is the layout the vertex stage reads.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct StaticVertex {
    pub px: f32,
    pub py: f32,
    pub pz: f32,
    pub tu: f32,
    pub tv: f32,
    pub nx: f32,
    pub ny: f32,
    pub nz: f32
}

impl StaticVertex {

    /// Construct a new instance from individual components
    pub fn from_components(
        p: [f32; 3],
        t: [f32; 2],
        n: [f32; 3]
    ) -> StaticVertex {
        StaticVertex { px: p[0], py: p[1], pz: p[2], tu: t[0], tv: t[1], nx: n[0], ny: n[1], nz: n[2] }
    }

    pub fn position(&self) -> [f32; 3] {
        [self.px, self.py, self.pz]
    }

    pub fn tex_coord(&self) -> [f32; 2] {
        [self.tu, self.tv]
    }

    pub fn normal(&self) -> [f32; 3] {
        [self.nx, self.ny, self.nz]
    }
}

impl Default for StaticVertex {

    /// Construct a new instance with position at the origin, texture coordinates at the origin,
    /// and a normal vector pointing in the positive Z direction.
    fn default() -> Self {
        StaticVertex { px: 0.0, py: 0.0, pz: 0.0, tu: 0.0, tv: 0.0, nx: 0.0, ny: 0.0, nz: 1.0 }
    }
}

/// Face struct
/// One triangle, holding its three corners fully materialised
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Face {
    pub corners: [StaticVertex; 3]
}

impl Face {
    pub fn new(v0: StaticVertex, v1: StaticVertex, v2: StaticVertex) -> Face {
        Face { corners: [v0, v1, v2] }
    }
}

/// MaterialData struct
/// Colours of a material as uploaded to the pixel stage. Each colour is padded out to four
/// components; the fourth is unused and always zero.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialData {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4]
}

impl MaterialData {

    /// Pad an RGB colour into the four-component form used by the GPU record
    pub fn pad_colour(rgb: [f32; 3]) -> [f32; 4] {
        [rgb[0], rgb[1], rgb[2], 0.0]
    }
}
