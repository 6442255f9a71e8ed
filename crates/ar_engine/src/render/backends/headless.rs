//! Windowless software rendering device
//!
//! Implements [`RenderDevice`] without a GPU or a window. Resources live in
//! slotmaps, every state change and draw is recorded into a command trace,
//! and textured draws are resolved with a nearest-sample blit into the
//! bound target so the upload -> draw -> sample path can be validated end
//! to end.
//!
//! The demo binary runs on this device; a hardware backend would replace it
//! behind the same trait.

use std::collections::HashMap;

use slotmap::SlotMap;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::device::{
    ClearFlags, DeviceResult, DeviceStats, GeometryKey, ProgramKey, RenderDevice, RenderTarget,
    TargetKey, TextureKey, UniformLocation,
};
use crate::render::mesh::Vertex;
use crate::render::RenderError;

/// Number of sampler units the device exposes
pub const MAX_TEXTURE_UNITS: usize = 8;

struct TextureData {
    width: u32,
    height: u32,
    /// RGB8, row-major, row 0 first
    pixels: Vec<u8>,
}

struct TargetData {
    width: u32,
    height: u32,
    color: TextureKey,
}

struct GeometryData {
    vertex_count: usize,
    index_count: usize,
}

struct ProgramData {
    uniforms: HashMap<String, UniformLocation>,
}

/// One recorded device command
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// A clear of the bound target
    Clear {
        /// Buffers cleared
        flags: ClearFlags,
    },
    /// A mat4 uniform upload
    UniformMat4 {
        /// Destination location
        location: UniformLocation,
        /// Uploaded value
        value: Mat4,
    },
    /// A vec3 uniform upload
    UniformVec3 {
        /// Destination location
        location: UniformLocation,
        /// Uploaded value
        value: Vec3,
    },
    /// A vec4 uniform upload
    UniformVec4 {
        /// Destination location
        location: UniformLocation,
        /// Uploaded value
        value: [f32; 4],
    },
    /// An integer uniform upload
    UniformInt {
        /// Destination location
        location: UniformLocation,
        /// Uploaded value
        value: i32,
    },
    /// An indexed draw with the state bound at issue time
    DrawIndexed {
        /// Geometry drawn
        geometry: GeometryKey,
        /// Indices consumed
        index_count: u32,
        /// Program bound at draw time, if any
        program: Option<ProgramKey>,
        /// Depth-test state at draw time
        depth_test: bool,
        /// Blend state at draw time
        alpha_blend: bool,
        /// Textures bound at draw time as (unit, texture), unit-ordered
        textures: Vec<(u32, TextureKey)>,
    },
}

/// Software reference device
pub struct HeadlessDevice {
    textures: SlotMap<TextureKey, TextureData>,
    geometries: SlotMap<GeometryKey, GeometryData>,
    targets: SlotMap<TargetKey, TargetData>,
    programs: SlotMap<ProgramKey, ProgramData>,

    bound_target: Option<TargetKey>,
    bound_program: Option<ProgramKey>,
    bound_textures: [Option<TextureKey>; MAX_TEXTURE_UNITS],
    viewport: (u32, u32),
    depth_test: bool,
    alpha_blend: bool,

    next_uniform: u32,
    draw_calls: u64,
    trace: Vec<DeviceEvent>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self {
            textures: SlotMap::with_key(),
            geometries: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            programs: SlotMap::with_key(),
            bound_target: None,
            bound_program: None,
            bound_textures: [None; MAX_TEXTURE_UNITS],
            viewport: (0, 0),
            depth_test: false,
            alpha_blend: false,
            next_uniform: 0,
            draw_calls: 0,
            trace: Vec::new(),
        }
    }

    /// Recorded commands since creation or the last [`Self::clear_trace`]
    pub fn trace(&self) -> &[DeviceEvent] {
        &self.trace
    }

    /// Drop the recorded command trace
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Recorded draw events only
    pub fn draws(&self) -> impl Iterator<Item = &DeviceEvent> {
        self.trace
            .iter()
            .filter(|e| matches!(e, DeviceEvent::DrawIndexed { .. }))
    }

    /// Lowest-unit bound texture, the one a textured draw samples from
    fn sampled_texture(&self) -> Option<TextureKey> {
        self.bound_textures.iter().flatten().next().copied()
    }

    /// Nearest-sample the bound texture into the bound target's color
    /// attachment across the viewport. Texture v=0 maps to the top target
    /// row, mirroring the GL orientation round trip: frames are flipped
    /// before upload and come back out upright.
    fn blit_bound_texture(&mut self) {
        let (Some(target_key), Some(texture_key)) = (self.bound_target, self.sampled_texture())
        else {
            return;
        };
        let Some(target) = self.targets.get(target_key) else {
            return;
        };
        let color_key = target.color;
        let (tw, th) = (target.width, target.height);

        let (vw, vh) = self.viewport;
        let (vw, vh) = (vw.min(tw), vh.min(th));
        if vw == 0 || vh == 0 {
            return;
        }

        let Some(src) = self.textures.get(texture_key) else {
            return;
        };
        if src.width == 0 || src.height == 0 {
            return;
        }
        let mut sampled = vec![0u8; (vw * vh * 3) as usize];
        for y in 0..vh {
            let v = (vh - 1 - y) as f32 / vh.max(1) as f32;
            let sy = ((v * src.height as f32) as u32).min(src.height - 1);
            for x in 0..vw {
                let u = x as f32 / vw.max(1) as f32;
                let sx = ((u * src.width as f32) as u32).min(src.width - 1);
                let s = ((sy * src.width + sx) * 3) as usize;
                let d = ((y * vw + x) * 3) as usize;
                sampled[d..d + 3].copy_from_slice(&src.pixels[s..s + 3]);
            }
        }

        if let Some(dst) = self.textures.get_mut(color_key) {
            for y in 0..vh {
                let d = ((y * tw) * 3) as usize;
                let s = ((y * vw) * 3) as usize;
                dst.pixels[d..d + (vw * 3) as usize]
                    .copy_from_slice(&sampled[s..s + (vw * 3) as usize]);
            }
        }
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_render_target(&mut self, width: u32, height: u32) -> DeviceResult<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(RenderError::TargetCreation(format!(
                "zero-sized target {width}x{height}"
            )));
        }
        let color = self.textures.insert(TextureData {
            width,
            height,
            pixels: vec![0u8; (width * height * 3) as usize],
        });
        let framebuffer = self.targets.insert(TargetData {
            width,
            height,
            color,
        });
        Ok(RenderTarget {
            framebuffer,
            color,
            width,
            height,
        })
    }

    fn bind_render_target(&mut self, target: Option<TargetKey>) {
        self.bound_target = target;
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn clear(&mut self, color: [f32; 4], flags: ClearFlags) {
        self.trace.push(DeviceEvent::Clear { flags });
        if !flags.contains(ClearFlags::COLOR) {
            return;
        }
        let Some(target) = self.bound_target.and_then(|k| self.targets.get(k)) else {
            return;
        };
        let color_key = target.color;
        let rgb = [
            (color[0].clamp(0.0, 1.0) * 255.0) as u8,
            (color[1].clamp(0.0, 1.0) * 255.0) as u8,
            (color[2].clamp(0.0, 1.0) * 255.0) as u8,
        ];
        if let Some(dst) = self.textures.get_mut(color_key) {
            for px in dst.pixels.chunks_exact_mut(3) {
                px.copy_from_slice(&rgb);
            }
        }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_alpha_blend(&mut self, enabled: bool) {
        self.alpha_blend = enabled;
    }

    fn create_texture_rgb(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> DeviceResult<TextureKey> {
        let expected = (width * height * 3) as usize;
        if pixels.len() != expected {
            return Err(RenderError::PixelSizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(self.textures.insert(TextureData {
            width,
            height,
            pixels: pixels.to_vec(),
        }))
    }

    fn delete_texture(&mut self, texture: TextureKey) {
        self.textures.remove(texture);
        for slot in &mut self.bound_textures {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
    }

    fn create_geometry(
        &mut self,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> DeviceResult<GeometryKey> {
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(RenderError::InvalidHandle(format!(
                "index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        Ok(self.geometries.insert(GeometryData {
            vertex_count: vertices.len(),
            index_count: indices.len(),
        }))
    }

    fn delete_geometry(&mut self, geometry: GeometryKey) {
        self.geometries.remove(geometry);
    }

    fn compile_program(
        &mut self,
        vertex_src: &str,
        fragment_src: &str,
    ) -> DeviceResult<ProgramKey> {
        for (stage, src) in [("vertex", vertex_src), ("fragment", fragment_src)] {
            if !src.contains("void main") {
                return Err(RenderError::ShaderCompile(format!(
                    "{stage} stage has no main entry point"
                )));
            }
        }
        Ok(self.programs.insert(ProgramData {
            uniforms: HashMap::new(),
        }))
    }

    fn use_program(&mut self, program: Option<ProgramKey>) {
        self.bound_program = program;
    }

    fn uniform_location(&mut self, program: ProgramKey, name: &str) -> Option<UniformLocation> {
        let data = self.programs.get_mut(program)?;
        if let Some(loc) = data.uniforms.get(name) {
            return Some(*loc);
        }
        // The reference device treats every queried name as an active
        // uniform; a GL backend would return None for names the linker
        // stripped.
        let loc = UniformLocation(self.next_uniform);
        self.next_uniform += 1;
        data.uniforms.insert(name.to_string(), loc);
        Some(loc)
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.trace.push(DeviceEvent::UniformMat4 {
            location,
            value: *value,
        });
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3) {
        self.trace.push(DeviceEvent::UniformVec3 {
            location,
            value: *value,
        });
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.trace.push(DeviceEvent::UniformVec4 { location, value });
    }

    fn set_uniform_int(&mut self, location: UniformLocation, value: i32) {
        self.trace.push(DeviceEvent::UniformInt { location, value });
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureKey>) {
        if let Some(slot) = self.bound_textures.get_mut(unit as usize) {
            *slot = texture;
        }
    }

    fn draw_indexed(&mut self, geometry: GeometryKey, index_count: u32) -> DeviceResult<()> {
        let Some(geo) = self.geometries.get(geometry) else {
            return Err(RenderError::InvalidHandle("geometry freed or foreign".into()));
        };
        if index_count as usize > geo.index_count {
            return Err(RenderError::InvalidHandle(format!(
                "draw of {index_count} indices exceeds buffer of {}",
                geo.index_count
            )));
        }
        let _ = geo.vertex_count;

        let mut textures: Vec<(u32, TextureKey)> = self
            .bound_textures
            .iter()
            .enumerate()
            .filter_map(|(unit, t)| t.map(|t| (unit as u32, t)))
            .collect();
        textures.sort_by_key(|&(unit, _)| unit);

        self.trace.push(DeviceEvent::DrawIndexed {
            geometry,
            index_count,
            program: self.bound_program,
            depth_test: self.depth_test,
            alpha_blend: self.alpha_blend,
            textures,
        });
        self.draw_calls += 1;

        self.blit_bound_texture();
        Ok(())
    }

    fn read_target_pixel(&self, target: TargetKey, x: u32, y: u32) -> DeviceResult<[u8; 3]> {
        let data = self
            .targets
            .get(target)
            .ok_or_else(|| RenderError::InvalidHandle("target freed or foreign".into()))?;
        if x >= data.width || y >= data.height {
            return Err(RenderError::InvalidHandle(format!(
                "pixel ({x}, {y}) outside {}x{} target",
                data.width, data.height
            )));
        }
        let color = self
            .textures
            .get(data.color)
            .ok_or_else(|| RenderError::InvalidHandle("target color texture freed".into()))?;
        let i = ((y * data.width + x) * 3) as usize;
        Ok([color.pixels[i], color.pixels[i + 1], color.pixels[i + 2]])
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            textures: self.textures.len(),
            geometries: self.geometries.len(),
            draw_calls: self.draw_calls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_vertices() -> Vec<Vertex> {
        vec![
            Vertex::new([-1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
            Vertex::new([1.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex::new([1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([-1.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
        ]
    }

    #[test]
    fn test_texture_size_validation() {
        let mut device = HeadlessDevice::new();
        let err = device.create_texture_rgb(4, 4, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, RenderError::PixelSizeMismatch { .. }));
    }

    #[test]
    fn test_geometry_index_validation() {
        let mut device = HeadlessDevice::new();
        let err = device
            .create_geometry(&quad_vertices(), &[0, 1, 9])
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidHandle(_)));
    }

    #[test]
    fn test_draw_records_bound_state() {
        let mut device = HeadlessDevice::new();
        let geo = device
            .create_geometry(&quad_vertices(), &[0, 1, 3, 1, 2, 3])
            .unwrap();
        let tex = device.create_texture_rgb(2, 2, &[128u8; 12]).unwrap();
        let program = device
            .compile_program("void main() {}", "void main() {}")
            .unwrap();

        device.use_program(Some(program));
        device.bind_texture(0, Some(tex));
        device.set_depth_test(true);
        device.draw_indexed(geo, 6).unwrap();

        let draw = device.draws().next().unwrap();
        match draw {
            DeviceEvent::DrawIndexed {
                index_count,
                program: p,
                depth_test,
                textures,
                ..
            } => {
                assert_eq!(*index_count, 6);
                assert_eq!(*p, Some(program));
                assert!(*depth_test);
                assert_eq!(textures, &[(0, tex)]);
            }
            _ => unreachable!(),
        }
        assert_eq!(device.stats().draw_calls, 1);
    }

    #[test]
    fn test_clear_fills_bound_target() {
        let mut device = HeadlessDevice::new();
        let target = device.create_render_target(8, 8).unwrap();
        device.bind_render_target(Some(target.framebuffer));
        device.clear([1.0, 0.0, 0.0, 1.0], ClearFlags::COLOR | ClearFlags::DEPTH);
        assert_eq!(
            device.read_target_pixel(target.framebuffer, 4, 4).unwrap(),
            [255, 0, 0]
        );
    }

    #[test]
    fn test_textured_draw_blits_into_target() {
        let mut device = HeadlessDevice::new();
        let target = device.create_render_target(4, 4).unwrap();
        let tex = device
            .create_texture_rgb(2, 2, &[10u8; 12])
            .unwrap();
        let geo = device
            .create_geometry(&quad_vertices(), &[0, 1, 3, 1, 2, 3])
            .unwrap();

        device.bind_render_target(Some(target.framebuffer));
        device.set_viewport(4, 4);
        device.bind_texture(0, Some(tex));
        device.draw_indexed(geo, 6).unwrap();

        assert_eq!(
            device.read_target_pixel(target.framebuffer, 2, 2).unwrap(),
            [10, 10, 10]
        );
    }

    #[test]
    fn test_bad_shader_fails_compile() {
        let mut device = HeadlessDevice::new();
        let err = device.compile_program("void main() {}", "not a shader");
        assert!(matches!(err, Err(RenderError::ShaderCompile(_))));
    }

    #[test]
    fn test_uniform_locations_stable_per_name() {
        let mut device = HeadlessDevice::new();
        let program = device
            .compile_program("void main() {}", "void main() {}")
            .unwrap();
        let a = device.uniform_location(program, "matrix").unwrap();
        let b = device.uniform_location(program, "CamPos").unwrap();
        assert_ne!(a, b);
        assert_eq!(device.uniform_location(program, "matrix"), Some(a));
    }
}
