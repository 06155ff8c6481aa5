//! Matrices fed to the vertex shaders.

use glam::{Mat4, Quat, Vec2, Vec3};

/// Sprite layers (`pos.z`) in `-LAYER_RANGE..=LAYER_RANGE` land inside the
/// device depth range.
pub const LAYER_RANGE: f32 = 1024.0;

/// Orthographic projection centered on the origin, `width` x `height` pixels.
///
/// Left-handed like [`Camera::view_matrix`](lucent_visual::camera::Camera::view_matrix).
/// The default camera sits one unit in front of layer 0, so view depth is
/// `layer + 1`.
pub fn ortho_projection(width: f32, height: f32) -> Mat4 {
    let (hw, hh) = (width / 2.0, height / 2.0);
    Mat4::orthographic_lh(-hw, hw, -hh, hh, 1.0 - LAYER_RANGE, 1.0 + LAYER_RANGE)
}

/// Translation x rotation about z x scale.
///
/// `flip_y` negates the vertical scale, which quads need because their
/// vertex `y` grows downward in texture space.
pub fn transform_matrix(pos: Vec3, scale: Vec2, rot_z: f32, flip_y: bool) -> Mat4 {
    let sy = if flip_y { -scale.y } else { scale.y };
    Mat4::from_scale_rotation_translation(Vec3::new(scale.x, sy, 1.0), Quat::from_rotation_z(rot_z), pos)
}

/// World-scale adjusted transform of a quad sprite.
pub fn quad_transform(pos: Vec3, size: Vec2, rot_z: f32, world_scale: Vec2) -> Mat4 {
    transform_matrix(scaled_pos(pos, world_scale), size * world_scale, rot_z, true)
}

/// `pos` with x/y multiplied by the world scale; depth is untouched.
pub fn scaled_pos(pos: Vec3, world_scale: Vec2) -> Vec3 {
    pos * world_scale.extend(1.0)
}

/// Column-major bytes layout expected by the constant buffers.
pub fn to_columns(m: Mat4) -> [[f32; 4]; 4] {
    m.to_cols_array_2d()
}
