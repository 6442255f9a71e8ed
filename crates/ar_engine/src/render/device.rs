//! Backend abstraction for the rendering system
//!
//! Defines the trait a GPU backend must implement for the compositing
//! pipeline. The pipeline mutates bound state (target, program, texture
//! units) freely; callers must not assume device state is preserved across
//! a compositing call.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::mesh::Vertex;
use crate::render::RenderError;

use bitflags::bitflags;
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a 2D texture owned by the device
    pub struct TextureKey;

    /// Handle to an uploaded vertex/index buffer pair
    pub struct GeometryKey;

    /// Handle to an offscreen framebuffer
    pub struct TargetKey;

    /// Handle to a linked shader program
    pub struct ProgramKey;
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color attachment
        const COLOR = 0b01;
        /// Depth attachment
        const DEPTH = 0b10;
    }
}

/// Location of a named uniform within a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// Offscreen render target: a framebuffer plus its color texture.
///
/// Eye targets are created once at startup at the display's recommended
/// resolution and never resized.
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    /// Framebuffer to bind for rendering into this target
    pub framebuffer: TargetKey,
    /// Color texture sampled by the display runtime after compositing
    pub color: TextureKey,
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
}

/// Live resource counts, used to catch per-frame leaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Live texture objects (including render target attachments)
    pub textures: usize,
    /// Live geometry buffer pairs
    pub geometries: usize,
    /// Indexed draws issued since device creation
    pub draw_calls: u64,
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, RenderError>;

/// Rendering device trait
///
/// Modeled on a GL-style state machine: bind, set state, draw. All
/// resources are created through the device and referenced by opaque keys.
pub trait RenderDevice {
    /// Create an offscreen render target of the given size
    fn create_render_target(&mut self, width: u32, height: u32) -> DeviceResult<RenderTarget>;

    /// Bind a render target, or the default (window) target with `None`
    fn bind_render_target(&mut self, target: Option<TargetKey>);

    /// Set the viewport for subsequent draws
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clear the selected buffers of the bound target
    fn clear(&mut self, color: [f32; 4], flags: ClearFlags);

    /// Enable or disable depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Enable or disable src-alpha / one-minus-src-alpha blending
    fn set_alpha_blend(&mut self, enabled: bool);

    /// Upload a 3-channel 8-bit row-major pixel buffer as a new texture
    fn create_texture_rgb(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> DeviceResult<TextureKey>;

    /// Free a texture; freeing an already-freed key is a no-op
    fn delete_texture(&mut self, texture: TextureKey);

    /// Upload an immutable vertex/index buffer pair
    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u32])
        -> DeviceResult<GeometryKey>;

    /// Free a geometry buffer pair
    fn delete_geometry(&mut self, geometry: GeometryKey);

    /// Compile and link a program from vertex and fragment sources
    fn compile_program(&mut self, vertex_src: &str, fragment_src: &str)
        -> DeviceResult<ProgramKey>;

    /// Bind a program, or unbind with `None`
    fn use_program(&mut self, program: Option<ProgramKey>);

    /// Query the location of a named uniform in a linked program
    fn uniform_location(&mut self, program: ProgramKey, name: &str) -> Option<UniformLocation>;

    /// Upload a 4x4 matrix uniform
    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Upload a vec3 uniform
    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3);

    /// Upload a vec4 uniform
    fn set_uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]);

    /// Upload an integer uniform (sampler unit indices)
    fn set_uniform_int(&mut self, location: UniformLocation, value: i32);

    /// Bind a texture to a sampler unit, or unbind with `None`
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureKey>);

    /// Issue one indexed triangle draw over the bound state
    fn draw_indexed(&mut self, geometry: GeometryKey, index_count: u32) -> DeviceResult<()>;

    /// Read back one pixel of a target's color attachment (debug/test path)
    fn read_target_pixel(&self, target: TargetKey, x: u32, y: u32) -> DeviceResult<[u8; 3]>;

    /// Current live-resource statistics
    fn stats(&self) -> DeviceStats;
}
