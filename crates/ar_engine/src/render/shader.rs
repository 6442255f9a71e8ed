//! Shader program handles with cached uniform locations
//!
//! A [`ShaderHandle`] wraps a linked program key plus a lazily filled cache
//! of named-uniform locations. A handle whose sources failed to read,
//! compile, or link is "not ready": binding it fails cleanly and every
//! draw entry point that receives it degrades to a no-op instead of
//! crashing, so one bad shader cannot take down the frame loop.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::render::device::{ProgramKey, RenderDevice, UniformLocation};

/// Compiled-program handle, or the not-ready degrade state
#[derive(Debug)]
pub struct ShaderHandle {
    program: Option<ProgramKey>,
    uniforms: HashMap<String, UniformLocation>,
    label: String,
}

impl ShaderHandle {
    /// Load and link a program from two GLSL source files.
    ///
    /// Any failure (missing file, compile error) is logged and produces a
    /// not-ready handle; the session keeps running without that layer.
    pub fn load(
        device: &mut dyn RenderDevice,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Self {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let label = format!(
            "{} + {}",
            vertex_path.display(),
            fragment_path.display()
        );

        let vertex_src = match fs::read_to_string(vertex_path) {
            Ok(src) => src,
            Err(e) => {
                log::error!("failed to read vertex shader {}: {e}", vertex_path.display());
                return Self::not_ready(label);
            }
        };
        let fragment_src = match fs::read_to_string(fragment_path) {
            Ok(src) => src,
            Err(e) => {
                log::error!(
                    "failed to read fragment shader {}: {e}",
                    fragment_path.display()
                );
                return Self::not_ready(label);
            }
        };

        Self::from_sources(device, &vertex_src, &fragment_src, label)
    }

    /// Link a program from in-memory sources
    pub fn from_sources(
        device: &mut dyn RenderDevice,
        vertex_src: &str,
        fragment_src: &str,
        label: impl Into<String>,
    ) -> Self {
        let label = label.into();
        match device.compile_program(vertex_src, fragment_src) {
            Ok(program) => {
                log::info!("shader program linked: {label}");
                Self {
                    program: Some(program),
                    uniforms: HashMap::new(),
                    label,
                }
            }
            Err(e) => {
                log::error!("shader program failed to link ({label}): {e}");
                Self::not_ready(label)
            }
        }
    }

    /// A handle in the permanent degrade state
    pub fn not_ready(label: impl Into<String>) -> Self {
        Self {
            program: None,
            uniforms: HashMap::new(),
            label: label.into(),
        }
    }

    /// True when the program linked and draws through it will execute
    pub fn is_ready(&self) -> bool {
        self.program.is_some()
    }

    /// The underlying program key, if ready
    pub fn program(&self) -> Option<ProgramKey> {
        self.program
    }

    /// Identifying label for log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bind the program for drawing. Returns false (and binds nothing)
    /// when the handle is not ready.
    pub fn bind(&self, device: &mut dyn RenderDevice) -> bool {
        match self.program {
            Some(program) => {
                device.use_program(Some(program));
                true
            }
            None => false,
        }
    }

    /// Location of a named uniform, cached after the first query.
    ///
    /// Returns None for a not-ready handle or a name the linker stripped.
    pub fn uniform(&mut self, device: &mut dyn RenderDevice, name: &str) -> Option<UniformLocation> {
        let program = self.program?;
        if let Some(loc) = self.uniforms.get(name) {
            return Some(*loc);
        }
        let loc = device.uniform_location(program, name)?;
        self.uniforms.insert(name.to_string(), loc);
        Some(loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;

    const VALID: &str = "void main() {}";

    #[test]
    fn test_link_and_bind() {
        let mut device = HeadlessDevice::new();
        let shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "test");
        assert!(shader.is_ready());
        assert!(shader.bind(&mut device));
    }

    #[test]
    fn test_bad_source_degrades_to_not_ready() {
        let mut device = HeadlessDevice::new();
        let shader = ShaderHandle::from_sources(&mut device, VALID, "garbage", "test");
        assert!(!shader.is_ready());
        assert!(!shader.bind(&mut device));
        assert_eq!(shader.program(), None);
    }

    #[test]
    fn test_missing_file_degrades_to_not_ready() {
        let mut device = HeadlessDevice::new();
        let shader = ShaderHandle::load(&mut device, "/no/such.vert", "/no/such.frag");
        assert!(!shader.is_ready());
    }

    #[test]
    fn test_uniform_cache() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "test");
        let a = shader.uniform(&mut device, "matrix").unwrap();
        let b = shader.uniform(&mut device, "matrix").unwrap();
        assert_eq!(a, b);

        let mut broken = ShaderHandle::not_ready("broken");
        assert_eq!(broken.uniform(&mut device, "matrix"), None);
    }
}
