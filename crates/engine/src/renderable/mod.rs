pub mod terrain;

use crate::scene::transform::WaterScroll;
use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, SquareMatrix};

/// FrameUniforms struct
/// Per-frame camera and light state shared by every model drawn in a pass
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameUniforms {
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,

    // Light-space clip transform used for shadow lookups
    pub light: Matrix4<f32>
}

impl Default for FrameUniforms {
    fn default() -> Self {
        FrameUniforms {
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            light: Matrix4::identity()
        }
    }
}

impl FrameUniforms {

    pub fn view_perspective(&self) -> Matrix4<f32> {
        self.projection * self.view
    }
}

/// TransformUniforms struct
/// Constant buffer record read by the domain stage; both matrices column-major
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TransformUniforms {
    pub view_perspective: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4]
}

impl TransformUniforms {
    pub fn new(frame: &FrameUniforms, world: Matrix4<f32>) -> TransformUniforms {
        TransformUniforms {
            view_perspective: frame.view_perspective().into(),
            world: world.into()
        }
    }
}

/// LightUniforms struct
/// Constant buffer record read by the pixel stage
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct LightUniforms {
    pub light: [[f32; 4]; 4]
}

impl LightUniforms {
    pub fn new(frame: &FrameUniforms) -> LightUniforms {
        LightUniforms { light: frame.light.into() }
    }
}

/// WaterUniforms struct
/// Constant buffer record for scrolling water surfaces, read by the pixel stage
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaterUniforms {
    pub uv_offset: [f32; 2],
    pub speed: [f32; 2]
}

impl WaterUniforms {
    pub fn new(water: &WaterScroll) -> WaterUniforms {
        WaterUniforms {
            uv_offset: water.offset().into(),
            speed: water.speed().into()
        }
    }
}
