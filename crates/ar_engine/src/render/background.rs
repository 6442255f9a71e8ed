//! Camera passthrough background pass
//!
//! Draws one camera frame as an unlit full-viewport quad into the bound
//! target. The texture and the quad buffers are created for the call and
//! freed before it returns; nothing from the pass survives into the next
//! frame.

use crate::capture::RgbFrame;
use crate::render::device::{DeviceResult, RenderDevice};
use crate::render::mesh::Vertex;
use crate::render::shader::ShaderHandle;
use crate::render::texture::TextureUploader;
use crate::render::DrawOutcome;

/// Full-viewport quad in clip space. UVs put v=0 at the top so the
/// pre-flipped camera frame comes out upright.
const QUAD_VERTICES: [Vertex; 4] = [
    Vertex {
        position: [1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coord: [1.0, 0.0],
    },
    Vertex {
        position: [1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coord: [1.0, 1.0],
    },
    Vertex {
        position: [-1.0, -1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coord: [0.0, 1.0],
    },
    Vertex {
        position: [-1.0, 1.0, 0.0],
        normal: [0.0, 0.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
];

const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// Renders the unlit camera background layer
pub struct BackgroundLayerRenderer;

impl BackgroundLayerRenderer {
    /// Draw `frame` as the background of the bound target.
    ///
    /// Depth testing is disabled for the pass so the quad never occludes
    /// the overlay. A not-ready shader skips the pass without touching the
    /// device.
    pub fn draw(
        device: &mut dyn RenderDevice,
        shader: &ShaderHandle,
        frame: &RgbFrame,
    ) -> DeviceResult<DrawOutcome> {
        if !shader.is_ready() {
            return Ok(DrawOutcome::SkippedShaderNotReady);
        }

        let geometry = device.create_geometry(&QUAD_VERTICES, &QUAD_INDICES)?;
        let texture = match TextureUploader::upload(device, frame) {
            Ok(texture) => texture,
            Err(e) => {
                device.delete_geometry(geometry);
                return Err(e);
            }
        };

        device.set_depth_test(false);
        shader.bind(device);
        device.bind_texture(0, Some(texture));
        let draw_result = device.draw_indexed(geometry, QUAD_INDICES.len() as u32);
        device.bind_texture(0, None);

        // Per-call resources are freed even when the draw itself failed.
        device.delete_texture(texture);
        device.delete_geometry(geometry);

        draw_result.map(|()| DrawOutcome::Drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::HeadlessDevice;
    use crate::render::device::ClearFlags;

    const VALID: &str = "void main() {}";

    fn ready_shader(device: &mut HeadlessDevice) -> ShaderHandle {
        ShaderHandle::from_sources(device, VALID, VALID, "bg-test")
    }

    #[test]
    fn test_not_ready_shader_skips_without_drawing() {
        let mut device = HeadlessDevice::new();
        let shader = ShaderHandle::not_ready("broken");
        let frame = RgbFrame::new(8, 8);

        let outcome = BackgroundLayerRenderer::draw(&mut device, &shader, &frame).unwrap();
        assert_eq!(outcome, DrawOutcome::SkippedShaderNotReady);
        assert_eq!(device.stats().draw_calls, 0);
        assert_eq!(device.stats().textures, 0);
    }

    #[test]
    fn test_no_texture_leak_across_frames() {
        let mut device = HeadlessDevice::new();
        let shader = ready_shader(&mut device);
        let target = device.create_render_target(8, 8).unwrap();
        device.bind_render_target(Some(target.framebuffer));
        device.set_viewport(8, 8);

        let baseline = device.stats();
        let frame = RgbFrame::new(8, 8);
        for _ in 0..50 {
            let outcome = BackgroundLayerRenderer::draw(&mut device, &shader, &frame).unwrap();
            assert_eq!(outcome, DrawOutcome::Drawn);
        }

        let after = device.stats();
        assert_eq!(after.textures, baseline.textures);
        assert_eq!(after.geometries, baseline.geometries);
        assert_eq!(after.draw_calls, baseline.draw_calls + 50);
    }

    #[test]
    fn test_black_frame_renders_black_center_pixel() {
        let mut device = HeadlessDevice::new();
        let shader = ready_shader(&mut device);
        let target = device.create_render_target(1280, 720).unwrap();
        device.bind_render_target(Some(target.framebuffer));
        device.set_viewport(1280, 720);
        device.clear([1.0, 1.0, 1.0, 1.0], ClearFlags::COLOR);

        let black = RgbFrame::new(1280, 720);
        BackgroundLayerRenderer::draw(&mut device, &shader, &black).unwrap();

        let center = device.read_target_pixel(target.framebuffer, 640, 360).unwrap();
        assert_eq!(center, [0, 0, 0]);
    }
}
