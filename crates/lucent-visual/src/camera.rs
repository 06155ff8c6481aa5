//! The world camera: an eye position looking at a target.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A look-at camera. Moving the camera in x/y pans every sprite the other way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
}

impl Default for Camera {
    /// Looks toward +z from `z = -1` at the origin, so screen x grows right.
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -1.0),
            target: Vec3::ZERO,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    pub fn set(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    /// Move eye and target together.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        self.target += delta;
    }

    /// Left-handed view matrix with y up.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_lh(self.position, self.target, Vec3::Y)
    }
}
