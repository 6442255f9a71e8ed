//! Simulated devices for headless runs and tests
//!
//! In-tree implementations of the three hardware seams: a simulated HMD
//! with a gently swaying head pose, a synthetic stereo camera producing
//! tinted gradient frames, and a display sink that counts submissions
//! instead of presenting. Together with the headless render backend they
//! let the whole session run on a machine with no headset, camera, or
//! GPU attached.

use crate::capture::{CameraFrame, CaptureError, StereoFrameSource};
use crate::display::{DisplayError, DisplaySink};
use crate::foundation::math::{deg_to_rad, Mat4, Mat4Ext};
use crate::render::compositor::Eye;
use crate::render::device::TextureKey;
use crate::tracking::{Pose, PoseSource, TrackingError};

/// Half the simulated interpupillary distance in meters (6cm total)
const HALF_IPD: f32 = 0.03;

/// Simulated eye target size, in the ballpark of a desktop HMD panel
const EYE_TARGET_SIZE: (u32, u32) = (1080, 1200);

/// A tracking runtime without hardware behind it
///
/// Reports a head pose that sways slowly around a standing position so
/// downstream matrices change every frame the way a worn headset's would.
pub struct SimulatedHmd {
    frame: u64,
}

impl SimulatedHmd {
    /// Connect to the simulated runtime.
    ///
    /// Kept fallible to match the startup contract of a real runtime,
    /// where initialization is the one place tracking errors are fatal.
    pub fn connect() -> Result<Self, TrackingError> {
        log::info!("simulated HMD connected");
        Ok(Self { frame: 0 })
    }
}

impl PoseSource for SimulatedHmd {
    fn wait_head_pose(&mut self) -> Result<Pose, TrackingError> {
        self.frame += 1;
        let t = self.frame as f32 / 90.0;
        // Standing eye height with a slow sway and a slight head turn
        let matrix = Mat4::translation(0.05 * t.sin(), 1.6, 0.02 * (t * 0.7).cos())
            * Mat4::rotation_y(0.1 * t.sin());
        Ok(Pose::from_matrix(matrix))
    }

    fn eye_projection(&self, _eye: Eye, near: f32, far: f32) -> Mat4 {
        let (width, height) = EYE_TARGET_SIZE;
        Mat4::perspective_gl(deg_to_rad(60.0), width as f32 / height as f32, near, far)
    }

    fn eye_offset(&self, eye: Eye) -> Mat4 {
        // Head-to-eye: the eye-to-head translation, already inverted
        match eye {
            Eye::Left => Mat4::translation(HALF_IPD, 0.0, 0.0),
            Eye::Right => Mat4::translation(-HALF_IPD, 0.0, 0.0),
        }
    }

    fn recommended_target_size(&self) -> (u32, u32) {
        EYE_TARGET_SIZE
    }
}

/// A stereo camera producing synthetic gradient frames
///
/// Each grab refreshes the fixed frame pair in place: a horizontal
/// gradient that scrolls over time, tinted differently per eye so left
/// and right are distinguishable in a mirror view.
pub struct SyntheticStereoCamera {
    left: CameraFrame,
    right: CameraFrame,
    width: u32,
    height: u32,
    frame: u64,
}

impl SyntheticStereoCamera {
    /// Open the synthetic camera at a fixed resolution
    pub fn open(width: u32, height: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::DeviceUnavailable(format!(
                "invalid resolution {width}x{height}"
            )));
        }
        log::info!("synthetic stereo camera opened at {width}x{height}");
        Ok(Self {
            left: CameraFrame::new(width, height),
            right: CameraFrame::new(width, height),
            width,
            height,
            frame: 0,
        })
    }

    fn fill(frame: &mut CameraFrame, width: u32, tick: u64, tint: [u8; 3]) {
        for (i, px) in frame.rgba.chunks_exact_mut(4).enumerate() {
            let x = (i as u32 % width) as u64;
            let ramp = ((x + tick * 4) % 256) as u16;
            px[0] = (ramp * u16::from(tint[0]) / 255) as u8;
            px[1] = (ramp * u16::from(tint[1]) / 255) as u8;
            px[2] = (ramp * u16::from(tint[2]) / 255) as u8;
            px[3] = 255;
        }
    }
}

impl StereoFrameSource for SyntheticStereoCamera {
    fn grab(&mut self) -> Result<(), CaptureError> {
        self.frame += 1;
        Self::fill(&mut self.left, self.width, self.frame, [255, 200, 200]);
        Self::fill(&mut self.right, self.width, self.frame, [200, 200, 255]);
        Ok(())
    }

    fn retrieve_left(&self) -> &CameraFrame {
        &self.left
    }

    fn retrieve_right(&self) -> &CameraFrame {
        &self.right
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// A display sink that counts submissions instead of presenting
///
/// Requests exit after a fixed frame budget so a headless session
/// terminates on its own.
pub struct NullDisplay {
    frame_budget: u64,
    handoffs: u64,
    submissions: [u64; 2],
}

impl NullDisplay {
    /// Sink that requests exit after `frame_budget` presented frames
    pub fn new(frame_budget: u64) -> Self {
        Self {
            frame_budget,
            handoffs: 0,
            submissions: [0, 0],
        }
    }

    /// Frames fully presented (one handoff each)
    pub fn frames_presented(&self) -> u64 {
        self.handoffs
    }

    /// Submissions seen for one eye
    pub fn submissions(&self, eye: Eye) -> u64 {
        self.submissions[eye.index()]
    }
}

impl DisplaySink for NullDisplay {
    fn submit(&mut self, eye: Eye, _texture: TextureKey) -> Result<(), DisplayError> {
        self.submissions[eye.index()] += 1;
        Ok(())
    }

    fn post_present_handoff(&mut self) {
        self.handoffs += 1;
    }

    fn exit_requested(&self) -> bool {
        self.handoffs >= self.frame_budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pose_changes_between_frames() {
        let mut hmd = SimulatedHmd::connect().unwrap();
        let a = hmd.wait_head_pose().unwrap();
        let b = hmd.wait_head_pose().unwrap();
        assert_ne!(a, b);
        // Eye height stays near standing
        assert_relative_eq!(a.position().y, 1.6);
    }

    #[test]
    fn test_eye_offsets_are_mirrored() {
        let hmd = SimulatedHmd::connect().unwrap();
        let left = hmd.eye_offset(Eye::Left);
        let right = hmd.eye_offset(Eye::Right);
        assert_relative_eq!(left[(0, 3)], -right[(0, 3)]);
        assert_relative_eq!(left[(0, 3)] - right[(0, 3)], 2.0 * HALF_IPD);
    }

    #[test]
    fn test_camera_eyes_differ_and_frames_advance() {
        let mut camera = SyntheticStereoCamera::open(64, 32).unwrap();
        camera.grab().unwrap();
        assert_ne!(camera.retrieve_left().rgba, camera.retrieve_right().rgba);

        let before = camera.retrieve_left().rgba.clone();
        camera.grab().unwrap();
        assert_ne!(camera.retrieve_left().rgba, before);
    }

    #[test]
    fn test_camera_rejects_zero_resolution() {
        assert!(SyntheticStereoCamera::open(0, 720).is_err());
    }

    #[test]
    fn test_null_display_exits_after_budget() {
        let mut display = NullDisplay::new(2);
        assert!(!display.exit_requested());
        display.post_present_handoff();
        assert!(!display.exit_requested());
        display.post_present_handoff();
        assert!(display.exit_requested());
        assert_eq!(display.frames_presented(), 2);
    }
}
