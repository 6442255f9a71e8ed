//! Display submission seam
//!
//! After composition, both eye textures go to a [`DisplaySink`]: the
//! compositor side of an HMD runtime, or the in-tree [`crate::sim::NullDisplay`]
//! when running headless. Submission order is fixed (left, then right,
//! then the handoff) and enforced by the frame loop, not the sink.

use thiserror::Error;

use crate::render::compositor::Eye;
use crate::render::device::{RenderDevice, TextureKey};

/// Errors raised by a display runtime
#[derive(Error, Debug)]
pub enum DisplayError {
    /// The display runtime rejected a submitted texture
    #[error("eye texture submission failed: {0}")]
    Submit(String),

    /// The runtime connection dropped mid-session
    #[error("display runtime lost: {0}")]
    RuntimeLost(String),
}

/// Where composited eye textures go each frame
pub trait DisplaySink {
    /// Hand one eye's color texture to the display runtime
    fn submit(&mut self, eye: Eye, texture: TextureKey) -> Result<(), DisplayError>;

    /// Signal that both eyes of the frame were submitted
    fn post_present_handoff(&mut self);

    /// Optionally blit one eye to a desktop mirror window; sinks without
    /// a mirror surface ignore the call.
    fn mirror_to_window(&mut self, _device: &mut dyn RenderDevice, _texture: TextureKey) {}

    /// True once the runtime (or the user) asked the session to end
    fn exit_requested(&self) -> bool;
}
