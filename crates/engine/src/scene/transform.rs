
use cgmath::{Matrix4, Rad, Vector2, Vector3};

/// Transform struct
/// Placement of a model in the world. Rotation holds Euler angles in radians about the x, y and
/// z axes (pitch, yaw, roll).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0)
        }
    }
}

impl Transform {

    pub fn new(translation: Vector3<f32>, rotation: Vector3<f32>, scale: Vector3<f32>) -> Transform {
        Transform { translation, rotation, scale }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Transform {
        Transform {
            translation,
            ..Transform::default()
        }
    }

    /// Scale first, then roll about z, pitch about x, yaw about y, and finally translate
    pub fn world_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_z(Rad(self.rotation.z))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// WaterScroll struct
/// Texture coordinate animation for water surfaces. The offset accumulates speed over time and
/// wraps so that it stays within [0, 1) on both axes however long it runs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct WaterScroll {
    speed: Vector2<f32>,
    offset: Vector2<f32>
}

impl Default for WaterScroll {
    fn default() -> Self {
        WaterScroll {
            speed: Vector2::new(0.0, 0.0),
            offset: Vector2::new(0.0, 0.0)
        }
    }
}

impl WaterScroll {

    /// Set the scroll speed in texture units per second and advance by the elapsed time
    pub fn advance(&mut self, speed: Vector2<f32>, delta_seconds: f32) {
        self.speed = speed;
        self.offset.x = Self::wrap(self.offset.x + speed.x * delta_seconds);
        self.offset.y = Self::wrap(self.offset.y + speed.y * delta_seconds);
    }

    pub fn speed(&self) -> Vector2<f32> {
        self.speed
    }

    pub fn offset(&self) -> Vector2<f32> {
        self.offset
    }

    fn wrap(value: f32) -> f32 {
        let wrapped = value.rem_euclid(1.0);

        // rem_euclid may round up to exactly 1.0 for tiny negative inputs
        if wrapped >= 1.0 || !wrapped.is_finite() {
            0.0
        } else {
            wrapped
        }
    }
}
