//! # AR Engine
//!
//! Stereo AR compositing: live camera passthrough with a head-tracked 3D
//! model overlay, rendered into one offscreen target per eye and handed
//! to a display runtime.
//!
//! The per-frame pipeline is: wait for the head pose, grab a stereo
//! camera frame pair, composite each eye (camera background, then posed
//! model overlays with depth testing and alpha blending), submit both
//! eye textures, hand off. Hardware sits behind four trait seams —
//! [`render::RenderDevice`], [`tracking::PoseSource`],
//! [`capture::StereoFrameSource`], and [`display::DisplaySink`] — with
//! simulated implementations in [`sim`] so the whole pipeline runs and
//! tests without a headset, camera, or GPU.
//!
//! ## Example
//!
//! ```no_run
//! use ar_engine::config::SessionConfig;
//! use ar_engine::render::backends::HeadlessDevice;
//! use ar_engine::session::Session;
//! use ar_engine::sim::{NullDisplay, SimulatedHmd, SyntheticStereoCamera};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::default();
//! let hmd = SimulatedHmd::connect()?;
//! let camera = SyntheticStereoCamera::open(config.camera.width, config.camera.height)?;
//!
//! let mut session = Session::new(
//!     Box::new(HeadlessDevice::new()),
//!     Box::new(hmd),
//!     Box::new(camera),
//!     Box::new(NullDisplay::new(60)),
//!     &config,
//! )?;
//! session.run()?;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod capture;
pub mod config;
pub mod display;
pub mod foundation;
pub mod render;
pub mod session;
pub mod sim;
pub mod tracking;

pub use foundation::logging;

/// Commonly used types for building on the engine
pub mod prelude {
    pub use crate::capture::{CameraFrame, RgbFrame, StereoFrameSource};
    pub use crate::config::SessionConfig;
    pub use crate::display::DisplaySink;
    pub use crate::foundation::math::{Mat4, Mat4Ext, Vec3, Vec4};
    pub use crate::render::{
        Drawable, DrawOutcome, Eye, EyeCompositor, EyeTransforms, FrameContext, Material,
        OverlayItem, RenderDevice,
    };
    pub use crate::session::{FrameOutcome, Session};
    pub use crate::tracking::{Pose, PoseSource};
}
