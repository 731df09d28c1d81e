//! 3D Transform (position, rotation, scale)
//!
//! A Transform holds the position, rotation, and scale of an entity and a
//! lazily recomputed world matrix. Every mutator marks the cached matrix stale;
//! [`Transform::world_matrix`] recomputes it at most once per batch of changes.

use std::cell::Cell;

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale with a cached world matrix
///
/// The cached matrix is `translate(position) * rotate(rotation) * scale(scale)`
/// whenever the transform is not dirty.
#[derive(Clone, Debug)]
pub struct Transform {
    position: Vec3,
    /// Always kept normalized
    rotation: Quat,
    scale: Vec3,
    world_matrix: Cell<Mat4>,
    dirty: Cell<bool>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.rotation == other.rotation
            && self.scale == other.scale
    }
}

impl Transform {
    /// Create an identity transform (origin, no rotation, unit scale)
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(true),
        }
    }

    /// Create a transform with just a position
    pub fn from_position(position: Vec3) -> Self {
        let mut t = Self::identity();
        t.position = position;
        t
    }

    /// Create a transform from all three components
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
            world_matrix: Cell::new(Mat4::IDENTITY),
            dirty: Cell::new(true),
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Whether the cached world matrix is stale
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.dirty.set(true);
    }

    // --- Absolute setters ---

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.mark_dirty();
    }

    /// Set the rotation from a quaternion (normalized on the way in)
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.mark_dirty();
    }

    /// Overwrite the rotation from Euler angles in radians
    ///
    /// Rotates about X, then Y, then Z in the local frame. This replaces the
    /// current rotation; it does not accumulate.
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation =
            (Quat::from_rotation_x(x) * Quat::from_rotation_y(y) * Quat::from_rotation_z(z))
                .normalize();
        self.mark_dirty();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.mark_dirty();
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.set_scale(Vec3::splat(scale));
    }

    // --- Relative mutators ---

    /// Translate the transform by an offset
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
        self.mark_dirty();
    }

    /// Rotate by `angle` radians about a local `axis`
    ///
    /// A zero-length axis leaves the rotation unchanged but still marks the
    /// transform dirty.
    pub fn rotate(&mut self, angle: f32, axis: Vec3) {
        if let Some(axis) = axis.try_normalize() {
            self.rotation = (self.rotation * Quat::from_axis_angle(axis, angle)).normalize();
        }
        self.mark_dirty();
    }

    /// Compose a quaternion onto the current rotation (local frame)
    pub fn rotate_by(&mut self, rotation: Quat) {
        self.rotation = (self.rotation * rotation).normalize();
        self.mark_dirty();
    }

    /// Multiply the current scale by a uniform factor
    pub fn scale_by(&mut self, factor: f32) {
        self.scale *= factor;
        self.mark_dirty();
    }

    // --- Derived state ---

    /// Get the up-to-date world matrix
    ///
    /// Recomputes only when a mutator has run since the last call.
    pub fn world_matrix(&self) -> Mat4 {
        if self.dirty.get() {
            let matrix =
                Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
            self.world_matrix.set(matrix);
            self.dirty.set(false);
        }
        self.world_matrix.get()
    }

    /// Transform a point from local space to world space
    ///
    /// Applies scale, then rotation, then translation.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * (p * self.scale) + self.position
    }

    /// Transform a direction (ignores translation)
    pub fn transform_direction(&self, d: Vec3) -> Vec3 {
        self.rotation * (d * self.scale)
    }
}
