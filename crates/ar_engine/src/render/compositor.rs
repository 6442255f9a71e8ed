//! Per-eye frame composition
//!
//! Owns the two offscreen eye targets and runs the full per-eye pass:
//! clear, camera background, then every overlay in order with depth
//! testing and alpha blending. All per-frame state flows through an
//! explicit [`FrameContext`] handed to the compositor each call.

use crate::capture::{RgbFrame, StereoFrameSource};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::background::BackgroundLayerRenderer;
use crate::render::device::{
    ClearFlags, DeviceResult, RenderDevice, RenderTarget, TextureKey,
};
use crate::render::materials::Material;
use crate::render::mesh::Drawable;
use crate::render::model::{ModelRenderer, OverlayMatrices};
use crate::render::shader::ShaderHandle;
use crate::tracking::Pose;

/// Left or right eye, also the index into per-eye arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Left eye, index 0
    Left = 0,
    /// Right eye, index 1
    Right = 1,
}

impl Eye {
    /// Both eyes in submission order
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// Array index for this eye
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-eye projection and offset matrices, fetched once at startup
///
/// The offsets are eye-to-head transforms already inverted for view
/// composition, so the per-eye view-projection is a plain product:
/// `projection * offset * inverse(head pose)`.
#[derive(Debug, Clone, Copy)]
pub struct EyeTransforms {
    projections: [Mat4; 2],
    offsets: [Mat4; 2],
}

impl EyeTransforms {
    /// Build from explicit per-eye matrices
    pub fn new(projections: [Mat4; 2], offsets: [Mat4; 2]) -> Self {
        Self {
            projections,
            offsets,
        }
    }

    /// Query a tracking runtime for both eyes over the given clip range
    pub fn from_source(
        source: &dyn crate::tracking::PoseSource,
        near: f32,
        far: f32,
    ) -> Self {
        Self::new(
            [
                source.eye_projection(Eye::Left, near, far),
                source.eye_projection(Eye::Right, near, far),
            ],
            [source.eye_offset(Eye::Left), source.eye_offset(Eye::Right)],
        )
    }

    /// Projection matrix for one eye
    pub fn projection(&self, eye: Eye) -> &Mat4 {
        &self.projections[eye.index()]
    }

    /// Inverted eye-to-head offset for one eye
    pub fn offset(&self, eye: Eye) -> &Mat4 {
        &self.offsets[eye.index()]
    }

    /// Eye-space view matrix for one eye and head pose
    pub fn view(&self, eye: Eye, pose: &Pose) -> Mat4 {
        self.offsets[eye.index()] * pose.view_matrix()
    }

    /// Full model-view-projection for one eye (model transform excluded,
    /// applied separately in the shader).
    pub fn mvp(&self, eye: Eye, pose: &Pose) -> Mat4 {
        self.projections[eye.index()] * self.view(eye, pose)
    }
}

/// One model overlay: geometry plus its per-frame draw parameters
pub struct OverlayItem {
    /// Uploaded model
    pub drawable: Drawable,
    /// RGBA tint multiplied over the shaded color
    pub tint: [f32; 4],
    /// When set, replaces every stored material of the drawable
    pub material_override: Option<Material>,
}

impl OverlayItem {
    /// An overlay drawn with its own materials and no tint
    pub fn new(drawable: Drawable) -> Self {
        Self {
            drawable,
            tint: [1.0, 1.0, 1.0, 1.0],
            material_override: None,
        }
    }
}

/// Everything the compositor needs across frames, passed explicitly
///
/// Created once at startup; the scratch frames are reused every frame so
/// the steady-state loop does no pixel-buffer allocation.
pub struct FrameContext {
    /// Offscreen eye targets at the runtime's recommended size
    pub targets: [RenderTarget; 2],
    /// Per-eye projection and offset matrices
    pub transforms: EyeTransforms,
    /// Unlit passthrough shader
    pub background_shader: ShaderHandle,
    /// Phong overlay shader
    pub model_shader: ShaderHandle,
    /// Shared model-to-world transform applied to every overlay
    pub model_matrix: Mat4,
    scratch: [RgbFrame; 2],
    degrade_logged: bool,
}

impl FrameContext {
    /// Create the per-eye targets and scratch buffers
    pub fn new(
        device: &mut dyn RenderDevice,
        target_size: (u32, u32),
        camera_size: (u32, u32),
        transforms: EyeTransforms,
        background_shader: ShaderHandle,
        model_shader: ShaderHandle,
        model_matrix: Mat4,
    ) -> DeviceResult<Self> {
        let (width, height) = target_size;
        let targets = [
            device.create_render_target(width, height)?,
            device.create_render_target(width, height)?,
        ];
        let (cam_w, cam_h) = camera_size;
        Ok(Self {
            targets,
            transforms,
            background_shader,
            model_shader,
            model_matrix,
            scratch: [RgbFrame::new(cam_w, cam_h), RgbFrame::new(cam_w, cam_h)],
            degrade_logged: false,
        })
    }

    /// Color texture the display runtime samples for one eye
    pub fn eye_texture(&self, eye: Eye) -> TextureKey {
        self.targets[eye.index()].color
    }
}

/// Runs the two-pass per-eye composition
pub struct EyeCompositor;

impl EyeCompositor {
    /// Composite one stereo frame into the context's eye targets.
    ///
    /// Renders both eyes and returns their color textures in left/right
    /// order, ready for submission. The camera source must have a grabbed
    /// frame pair available.
    pub fn composite(
        device: &mut dyn RenderDevice,
        ctx: &mut FrameContext,
        camera: &dyn StereoFrameSource,
        pose: &Pose,
        overlays: &[OverlayItem],
    ) -> DeviceResult<[TextureKey; 2]> {
        if !ctx.degrade_logged
            && (!ctx.background_shader.is_ready() || !ctx.model_shader.is_ready())
        {
            log::warn!(
                "compositing with skipped layers (background ready: {}, model ready: {})",
                ctx.background_shader.is_ready(),
                ctx.model_shader.is_ready()
            );
            ctx.degrade_logged = true;
        }
        for eye in Eye::BOTH {
            Self::composite_eye(device, ctx, camera, pose, overlays, eye)?;
        }
        Ok([ctx.eye_texture(Eye::Left), ctx.eye_texture(Eye::Right)])
    }

    fn composite_eye(
        device: &mut dyn RenderDevice,
        ctx: &mut FrameContext,
        camera: &dyn StereoFrameSource,
        pose: &Pose,
        overlays: &[OverlayItem],
        eye: Eye,
    ) -> DeviceResult<()> {
        let target = ctx.targets[eye.index()];
        device.bind_render_target(Some(target.framebuffer));
        device.set_viewport(target.width, target.height);
        device.clear([0.0, 0.0, 0.0, 1.0], ClearFlags::COLOR | ClearFlags::DEPTH);

        let source_frame = match eye {
            Eye::Left => camera.retrieve_left(),
            Eye::Right => camera.retrieve_right(),
        };
        source_frame.to_rgb_flipped(&mut ctx.scratch[eye.index()]);
        BackgroundLayerRenderer::draw(device, &ctx.background_shader, &ctx.scratch[eye.index()])?;

        device.set_depth_test(true);
        device.set_alpha_blend(true);

        let matrices = OverlayMatrices {
            mvp: ctx.transforms.mvp(eye, pose),
            projection: *ctx.transforms.projection(eye),
            view: ctx.transforms.view(eye, pose),
            model: ctx.model_matrix,
            camera_position: Self::camera_position(pose),
        };
        for overlay in overlays {
            ModelRenderer::draw(
                device,
                &mut ctx.model_shader,
                &overlay.drawable,
                &matrices,
                overlay.tint,
                overlay.material_override.as_ref(),
            )?;
        }

        device.set_depth_test(false);
        device.use_program(None);
        device.bind_render_target(None);
        Ok(())
    }

    fn camera_position(pose: &Pose) -> Vec3 {
        pose.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraFrame, CaptureError};
    use crate::foundation::math::Mat4Ext;
    use crate::render::backends::HeadlessDevice;
    use approx::assert_relative_eq;

    const VALID: &str = "void main() {}";

    struct BlackCamera {
        left: CameraFrame,
        right: CameraFrame,
    }

    impl BlackCamera {
        fn new(width: u32, height: u32) -> Self {
            Self {
                left: CameraFrame::new(width, height),
                right: CameraFrame::new(width, height),
            }
        }
    }

    impl StereoFrameSource for BlackCamera {
        fn grab(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
        fn retrieve_left(&self) -> &CameraFrame {
            &self.left
        }
        fn retrieve_right(&self) -> &CameraFrame {
            &self.right
        }
        fn resolution(&self) -> (u32, u32) {
            (self.left.width(), self.left.height())
        }
    }

    fn test_transforms() -> EyeTransforms {
        let projection = Mat4::perspective_gl(60f32.to_radians(), 16.0 / 9.0, 0.1, 5000.0);
        EyeTransforms::new(
            [projection, projection],
            [
                Mat4::translation(0.03, 0.0, 0.0),
                Mat4::translation(-0.03, 0.0, 0.0),
            ],
        )
    }

    fn test_context(device: &mut HeadlessDevice) -> FrameContext {
        let background_shader = ShaderHandle::from_sources(device, VALID, VALID, "bg");
        let model_shader = ShaderHandle::from_sources(device, VALID, VALID, "model");
        FrameContext::new(
            device,
            (64, 64),
            (64, 64),
            test_transforms(),
            background_shader,
            model_shader,
            Mat4::identity(),
        )
        .unwrap()
    }

    #[test]
    fn test_mvp_composition() {
        let transforms = test_transforms();
        let pose = Pose::from_matrix(Mat4::translation(0.0, 1.6, 0.5));
        for eye in Eye::BOTH {
            let expected =
                transforms.projection(eye) * transforms.offset(eye) * pose.view_matrix();
            assert_relative_eq!(transforms.mvp(eye, &pose), expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_identity_pose_reduces_to_projection_times_offset() {
        let transforms = test_transforms();
        let pose = Pose::identity();
        let mvp = transforms.mvp(Eye::Left, &pose);
        let expected = transforms.projection(Eye::Left) * transforms.offset(Eye::Left);
        assert_relative_eq!(mvp, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_eye_views_differ_by_interpupillary_offset() {
        let transforms = test_transforms();
        let pose = Pose::identity();
        let left = transforms.view(Eye::Left, &pose);
        let right = transforms.view(Eye::Right, &pose);
        // 6cm total separation along X
        assert_relative_eq!(left[(0, 3)] - right[(0, 3)], 0.06, epsilon = 1e-6);
    }

    #[test]
    fn test_composite_renders_both_eyes() {
        let mut device = HeadlessDevice::new();
        let mut ctx = test_context(&mut device);
        let camera = BlackCamera::new(64, 64);

        let textures =
            EyeCompositor::composite(&mut device, &mut ctx, &camera, &Pose::identity(), &[])
                .unwrap();

        assert_ne!(textures[0], textures[1]);
        assert_eq!(textures[0], ctx.eye_texture(Eye::Left));
        // One background draw per eye, no overlays
        assert_eq!(device.stats().draw_calls, 2);
    }

    #[test]
    fn test_composite_black_camera_gives_black_eye_centers() {
        let mut device = HeadlessDevice::new();
        let mut ctx = test_context(&mut device);
        let camera = BlackCamera::new(64, 64);

        EyeCompositor::composite(&mut device, &mut ctx, &camera, &Pose::identity(), &[]).unwrap();

        for eye in Eye::BOTH {
            let target = ctx.targets[eye.index()];
            let pixel = device.read_target_pixel(target.framebuffer, 32, 32).unwrap();
            assert_eq!(pixel, [0, 0, 0]);
        }
    }

    #[test]
    fn test_composite_is_steady_state_on_resources() {
        let mut device = HeadlessDevice::new();
        let mut ctx = test_context(&mut device);
        let camera = BlackCamera::new(64, 64);

        EyeCompositor::composite(&mut device, &mut ctx, &camera, &Pose::identity(), &[]).unwrap();
        let baseline = device.stats();

        for _ in 0..20 {
            EyeCompositor::composite(&mut device, &mut ctx, &camera, &Pose::identity(), &[])
                .unwrap();
        }
        let after = device.stats();
        assert_eq!(after.textures, baseline.textures);
        assert_eq!(after.geometries, baseline.geometries);
    }
}
