//! Head tracking abstraction
//!
//! The compositing pipeline only needs four things from a tracking
//! runtime: a blocking head pose per frame, a projection matrix and an
//! eye-to-head offset per eye, and the recommended eye target size.
//! [`PoseSource`] captures that surface; the simulated HMD in
//! [`crate::sim`] is the in-tree implementation.

use thiserror::Error;

use crate::foundation::math::Mat4;
use crate::render::compositor::Eye;

/// Errors raised by a tracking runtime
#[derive(Error, Debug)]
pub enum TrackingError {
    /// The runtime or headset is not available
    #[error("tracking runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// The per-frame pose wait failed; the last pose should be reused
    #[error("pose wait failed: {0}")]
    PoseWait(String),
}

/// A rigid head transform in the tracking space
///
/// Wraps the device-to-world matrix reported by the runtime. The view
/// matrix is its inverse; a singular report falls back to identity so a
/// degenerate pose never poisons the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    matrix: Mat4,
}

impl Pose {
    /// Pose from a device-to-world matrix
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// The identity pose: head at the origin, looking down -Z
    pub fn identity() -> Self {
        Self::from_matrix(Mat4::identity())
    }

    /// Device-to-world transform
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// World-to-device (view) transform
    pub fn view_matrix(&self) -> Mat4 {
        self.matrix.try_inverse().unwrap_or_else(Mat4::identity)
    }

    /// Head position in tracking space
    pub fn position(&self) -> crate::foundation::math::Vec3 {
        crate::foundation::math::Vec3::new(
            self.matrix[(0, 3)],
            self.matrix[(1, 3)],
            self.matrix[(2, 3)],
        )
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tracking runtime surface consumed by the frame loop
pub trait PoseSource {
    /// Block until the runtime's frame timing point and return the
    /// predicted head pose for the upcoming frame.
    fn wait_head_pose(&mut self) -> Result<Pose, TrackingError>;

    /// Projection matrix for one eye over the given clip range
    fn eye_projection(&self, eye: Eye, near: f32, far: f32) -> Mat4;

    /// Eye-to-head offset for one eye, already inverted for view-matrix
    /// composition (head space to eye space).
    fn eye_offset(&self, eye: Eye) -> Mat4;

    /// Recommended per-eye render target size in pixels
    fn recommended_target_size(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use approx::assert_relative_eq;

    #[test]
    fn test_view_matrix_inverts_pose() {
        let pose = Pose::from_matrix(Mat4::translation(1.0, 2.0, -3.0));
        let round_trip = pose.matrix() * pose.view_matrix();
        assert_relative_eq!(round_trip, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_position_reads_translation_column() {
        let pose = Pose::from_matrix(Mat4::translation(0.5, 1.6, -0.25));
        assert_relative_eq!(pose.position(), Vec3::new(0.5, 1.6, -0.25));
    }

    #[test]
    fn test_singular_pose_falls_back_to_identity_view() {
        let pose = Pose::from_matrix(Mat4::zeros());
        assert_eq!(pose.view_matrix(), Mat4::identity());
    }
}
