//! # Stereo compositing renderer
//!
//! High-level rendering layer for the per-frame stereo pipeline: a camera
//! passthrough background pass plus a posed model overlay pass, composited
//! into one offscreen target per eye.
//!
//! The GPU itself sits behind the [`device::RenderDevice`] trait; the
//! windowless reference implementation lives in [`backends::headless`].

pub mod background;
pub mod backends;
pub mod compositor;
pub mod device;
pub mod materials;
pub mod mesh;
pub mod model;
pub mod shader;
pub mod texture;

pub use background::BackgroundLayerRenderer;
pub use compositor::{Eye, EyeCompositor, EyeTransforms, FrameContext, OverlayItem};
pub use device::{
    ClearFlags, DeviceResult, DeviceStats, GeometryKey, ProgramKey, RenderDevice, RenderTarget,
    TargetKey, TextureKey, UniformLocation,
};
pub use materials::Material;
pub use mesh::{Drawable, TextureBinding, TextureSemantic, TriangleBatch, Vertex};
pub use model::{ModelRenderer, OverlayMatrices};
pub use shader::ShaderHandle;

use thiserror::Error;

/// Errors raised by the rendering layer
#[derive(Error, Debug)]
pub enum RenderError {
    /// Shader compilation or program linking failed
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// A resource handle refers to a freed or foreign resource
    #[error("invalid resource handle: {0}")]
    InvalidHandle(String),

    /// Pixel data did not match the declared dimensions
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    PixelSizeMismatch {
        /// Byte count implied by width*height*channels
        expected: usize,
        /// Byte count actually supplied
        actual: usize,
    },

    /// Render target creation failed
    #[error("render target creation failed: {0}")]
    TargetCreation(String),

    /// Backend-specific failure
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Result of a draw entry point that may degrade instead of drawing.
///
/// A shader that failed to compile leaves its layer out of the frame rather
/// than aborting the loop; the outcome makes that policy visible to the
/// orchestrator instead of burying it in a silent early return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The layer was drawn
    Drawn,
    /// The layer was skipped because its shader never linked
    SkippedShaderNotReady,
}

impl DrawOutcome {
    /// True when the layer actually reached the device
    pub fn was_drawn(self) -> bool {
        matches!(self, Self::Drawn)
    }
}
