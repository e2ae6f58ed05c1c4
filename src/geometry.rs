//! Geometry utilities for path-relative calculations.

use bevy::prelude::*;

/// A local coordinate frame at a point on a path.
///
/// Path-local offsets map as: X → right (lateral), Y → up (vertical),
/// Z → tangent (forward along the direction of travel).
/// The frame is constructed from a tangent direction with automatic handling
/// of degenerate cases (e.g., when tangent is parallel to the preferred up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathFrame {
    /// The tangent (direction of travel).
    pub tangent: Vec3,
    /// The right direction (perpendicular to tangent and up).
    pub right: Vec3,
    /// The corrected up direction (perpendicular to tangent and right).
    pub up: Vec3,
}

impl PathFrame {
    /// Build a frame from a tangent using Y-up convention.
    pub fn from_tangent(tangent: Vec3) -> Self {
        Self::new(tangent, Vec3::Y)
    }

    /// Build a frame from a tangent and preferred up direction.
    ///
    /// The actual up vector may differ from `preferred_up` to maintain
    /// orthogonality with the tangent.
    pub fn new(tangent: Vec3, preferred_up: Vec3) -> Self {
        let tangent = tangent.normalize_or_zero();

        // Tangent parallel to preferred_up: X becomes the reference axis
        let right = tangent
            .cross(preferred_up)
            .try_normalize()
            .unwrap_or_else(|| tangent.cross(Vec3::X).normalize_or_zero());
        let up = right.cross(tangent).normalize_or_zero();

        Self { tangent, right, up }
    }

    /// Check if this frame is valid (non-degenerate).
    pub fn is_valid(&self) -> bool {
        self.right.length_squared() > 0.001 && self.up.length_squared() > 0.001
    }

    /// Rotation for an entity travelling along the path.
    ///
    /// The entity's local -Z (forward) points along `tangent`, +Y along `up`.
    pub fn travel_rotation(&self) -> Quat {
        if !self.is_valid() {
            return Quat::IDENTITY;
        }
        Quat::from_mat3(&Mat3::from_cols(self.right, self.up, -self.tangent))
    }

    /// Rotation for an entity facing back against the direction of travel.
    ///
    /// The entity's local -Z points along `-tangent`, toward anything
    /// approaching on the path. `up` is kept so there is no roll ambiguity.
    pub fn facing_rotation(&self) -> Quat {
        if !self.is_valid() {
            return Quat::IDENTITY;
        }
        Quat::from_mat3(&Mat3::from_cols(-self.right, self.up, self.tangent))
    }

    /// Transform a path-local offset to world space relative to an origin.
    pub fn transform_point(&self, origin: Vec3, local: Vec3) -> Vec3 {
        origin + self.right * local.x + self.up * local.y + self.tangent * local.z
    }
}
