//! Session orchestration
//!
//! Wires the four hardware seams (render device, pose source, stereo
//! camera, display sink) into the per-frame pipeline and runs the loop.
//! Startup is the only place errors abort: once the loop is running, a
//! failed pose wait or frame grab is logged and the previous data shown
//! again, so a transient hiccup costs one stale frame instead of the
//! session.

use thiserror::Error;

use crate::assets::{ModelError, ModelLoader};
use crate::capture::{CaptureError, StereoFrameSource};
use crate::config::SessionConfig;
use crate::display::{DisplayError, DisplaySink};
use crate::foundation::math::{deg_to_rad, Mat4, Mat4Ext};
use crate::foundation::time::Timer;
use crate::render::compositor::{Eye, EyeCompositor, EyeTransforms, FrameContext, OverlayItem};
use crate::render::device::RenderDevice;
use crate::render::shader::ShaderHandle;
use crate::render::RenderError;
use crate::tracking::{Pose, PoseSource, TrackingError};

/// Errors that abort session startup
#[derive(Error, Debug)]
pub enum SessionError {
    /// Tracking runtime failed to initialize
    #[error("tracking init failed: {0}")]
    Tracking(#[from] TrackingError),

    /// Stereo camera failed to open
    #[error("camera init failed: {0}")]
    Capture(#[from] CaptureError),

    /// Eye render targets could not be created
    #[error("render init failed: {0}")]
    Render(#[from] RenderError),

    /// Display runtime failed during startup
    #[error("display init failed: {0}")]
    Display(#[from] DisplayError),
}

/// What happened during one frame of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// False when the pose wait failed and the previous pose was reused
    pub pose_fresh: bool,
    /// False when the grab failed and the previous images were reshown
    pub grab_ok: bool,
    /// Eye textures accepted by the display this frame
    pub eyes_submitted: u32,
}

/// A running compositing session over injected device seams
pub struct Session {
    device: Box<dyn RenderDevice>,
    pose_source: Box<dyn PoseSource>,
    camera: Box<dyn StereoFrameSource>,
    sink: Box<dyn DisplaySink>,
    ctx: FrameContext,
    overlays: Vec<OverlayItem>,
    last_pose: Pose,
    timer: Timer,
}

impl Session {
    /// Initialize a session: create eye targets, load shaders, and load
    /// every configured overlay model.
    ///
    /// Device construction errors are fatal here. Shader and model load
    /// failures are not: they degrade to skipped layers and empty
    /// drawables, logged as they happen.
    pub fn new(
        mut device: Box<dyn RenderDevice>,
        pose_source: Box<dyn PoseSource>,
        camera: Box<dyn StereoFrameSource>,
        sink: Box<dyn DisplaySink>,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let transforms =
            EyeTransforms::from_source(pose_source.as_ref(), config.clip.near, config.clip.far);
        let target_size = pose_source.recommended_target_size();
        log::info!(
            "session targets {}x{} per eye, camera {}x{}",
            target_size.0,
            target_size.1,
            config.camera.width,
            config.camera.height
        );

        let background_shader = ShaderHandle::load(
            device.as_mut(),
            &config.shaders.background_vertex,
            &config.shaders.background_fragment,
        );
        let model_shader = ShaderHandle::load(
            device.as_mut(),
            &config.shaders.model_vertex,
            &config.shaders.model_fragment,
        );

        let model_matrix = Mat4::rotation_x(deg_to_rad(config.model_rotation_x_deg))
            * Mat4::scaling(config.model_scale);

        let ctx = FrameContext::new(
            device.as_mut(),
            target_size,
            camera.resolution(),
            transforms,
            background_shader,
            model_shader,
            model_matrix,
        )?;

        let mut overlays = Vec::with_capacity(config.overlays.len());
        for overlay in &config.overlays {
            let drawable = match ModelLoader::load(device.as_mut(), &overlay.model_path) {
                Ok(drawable) => {
                    log::info!(
                        "loaded {} ({} batches)",
                        overlay.model_path,
                        drawable.batches.len()
                    );
                    drawable
                }
                // GPU upload failures are device problems, not asset
                // problems; treat them like any other startup error.
                Err(ModelError::Render(e)) => return Err(SessionError::Render(e)),
                Err(e) => {
                    log::error!("model {} unusable, overlay skipped: {e}", overlay.model_path);
                    crate::render::Drawable::empty()
                }
            };
            let mut item = OverlayItem::new(drawable);
            item.tint = overlay.tint;
            item.material_override = overlay.material_override;
            overlays.push(item);
        }

        Ok(Self {
            device,
            pose_source,
            camera,
            sink,
            ctx,
            overlays,
            last_pose: Pose::identity(),
            timer: Timer::new(),
        })
    }

    /// Run one iteration of the pipeline: pose, grab, composite both
    /// eyes, submit, hand off.
    pub fn run_frame(&mut self) -> Result<FrameOutcome, SessionError> {
        let pose_fresh = match self.pose_source.wait_head_pose() {
            Ok(pose) => {
                self.last_pose = pose;
                true
            }
            Err(e) => {
                log::warn!("pose wait failed, reusing previous pose: {e}");
                false
            }
        };

        let grab_ok = match self.camera.grab() {
            Ok(()) => true,
            Err(e) => {
                // Retrieve still hands back the previous frame pair
                log::warn!("frame grab failed, reshowing previous images: {e}");
                false
            }
        };

        let textures = EyeCompositor::composite(
            self.device.as_mut(),
            &mut self.ctx,
            self.camera.as_ref(),
            &self.last_pose,
            &self.overlays,
        )?;

        let mut eyes_submitted = 0;
        for eye in Eye::BOTH {
            match self.sink.submit(eye, textures[eye.index()]) {
                Ok(()) => eyes_submitted += 1,
                Err(e) => log::warn!("{eye:?} eye submission failed: {e}"),
            }
        }
        self.sink.post_present_handoff();
        self.sink
            .mirror_to_window(self.device.as_mut(), textures[Eye::Left.index()]);

        self.timer.update();
        if self.timer.frame_count() % 300 == 0 {
            log::debug!(
                "frame {}: {:.1} fps average",
                self.timer.frame_count(),
                self.timer.average_fps()
            );
        }

        Ok(FrameOutcome {
            pose_fresh,
            grab_ok,
            eyes_submitted,
        })
    }

    /// Run the loop until the display requests exit
    pub fn run(&mut self) -> Result<(), SessionError> {
        log::info!("starting frame loop");
        while !self.sink.exit_requested() {
            self.run_frame()?;
        }
        log::info!(
            "frame loop ended after {} frames ({:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
        Ok(())
    }

    /// Frames presented so far
    pub fn frame_count(&self) -> u64 {
        self.timer.frame_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CameraFrame;
    use crate::render::backends::HeadlessDevice;
    use crate::sim::{NullDisplay, SimulatedHmd, SyntheticStereoCamera};

    fn test_config() -> SessionConfig {
        let mut config = SessionConfig::default();
        // No assets on disk in unit tests; shaders and models degrade
        config.overlays.clear();
        config
    }

    fn new_session(frame_budget: u64) -> Session {
        let config = test_config();
        Session::new(
            Box::new(HeadlessDevice::new()),
            Box::new(SimulatedHmd::connect().unwrap()),
            Box::new(SyntheticStereoCamera::open(64, 32).unwrap()),
            Box::new(NullDisplay::new(frame_budget)),
            &config,
        )
        .unwrap()
    }

    #[test]
    fn test_frame_submits_both_eyes() {
        let mut session = new_session(10);
        let outcome = session.run_frame().unwrap();
        assert!(outcome.pose_fresh);
        assert!(outcome.grab_ok);
        assert_eq!(outcome.eyes_submitted, 2);
    }

    #[test]
    fn test_loop_honors_display_exit() {
        let mut session = new_session(5);
        session.run().unwrap();
        assert_eq!(session.frame_count(), 5);
    }

    struct FlakyCamera {
        inner: SyntheticStereoCamera,
        fail_next: bool,
    }

    impl StereoFrameSource for FlakyCamera {
        fn grab(&mut self) -> Result<(), CaptureError> {
            if self.fail_next {
                self.fail_next = false;
                return Err(CaptureError::GrabFailed("timeout".to_string()));
            }
            self.inner.grab()
        }
        fn retrieve_left(&self) -> &CameraFrame {
            self.inner.retrieve_left()
        }
        fn retrieve_right(&self) -> &CameraFrame {
            self.inner.retrieve_right()
        }
        fn resolution(&self) -> (u32, u32) {
            self.inner.resolution()
        }
    }

    #[test]
    fn test_failed_grab_reshows_previous_frame() {
        let config = test_config();
        let mut session = Session::new(
            Box::new(HeadlessDevice::new()),
            Box::new(SimulatedHmd::connect().unwrap()),
            Box::new(FlakyCamera {
                inner: SyntheticStereoCamera::open(64, 32).unwrap(),
                fail_next: true,
            }),
            Box::new(NullDisplay::new(10)),
            &config,
        )
        .unwrap();

        let outcome = session.run_frame().unwrap();
        assert!(!outcome.grab_ok);
        // The frame still composites and submits
        assert_eq!(outcome.eyes_submitted, 2);

        let outcome = session.run_frame().unwrap();
        assert!(outcome.grab_ok);
    }
}
