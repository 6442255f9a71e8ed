//! Posed model overlay pass
//!
//! Draws a [`Drawable`] on top of the background layer using the per-eye
//! MVP. One entry point covers both material paths: a `Some` override
//! tints the whole model, `None` uses each batch's stored material.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::device::{DeviceResult, RenderDevice, UniformLocation};
use crate::render::materials::Material;
use crate::render::mesh::Drawable;
use crate::render::shader::ShaderHandle;
use crate::render::DrawOutcome;

/// Per-eye matrix set and camera position for one overlay draw
#[derive(Debug, Clone, Copy)]
pub struct OverlayMatrices {
    /// Combined projection * eye offset * inverse head pose * (applied in shader to ModelMat)
    pub mvp: Mat4,
    /// Projection component, exposed to the shader separately
    pub projection: Mat4,
    /// View component, exposed to the shader separately
    pub view: Mat4,
    /// Model-to-world transform of the overlay
    pub model: Mat4,
    /// World-space head position, feeds specular shading
    pub camera_position: Vec3,
}

impl OverlayMatrices {
    /// Matrices for an overlay with identity view/projection split,
    /// everything carried by `mvp` (the original shader contract).
    pub fn from_mvp(mvp: Mat4, model: Mat4, camera_position: Vec3) -> Self {
        Self {
            mvp,
            projection: Mat4::identity(),
            view: Mat4::identity(),
            model,
            camera_position,
        }
    }
}

/// Renders drawables with depth testing and alpha blending
pub struct ModelRenderer;

impl ModelRenderer {
    /// Draw `drawable` with the supplied eye matrices and RGBA tint.
    ///
    /// Issues exactly one indexed draw per batch, with the material color
    /// uniforms set once per batch beforehand. A not-ready shader skips
    /// the whole drawable without touching the device.
    pub fn draw(
        device: &mut dyn RenderDevice,
        shader: &mut ShaderHandle,
        drawable: &Drawable,
        matrices: &OverlayMatrices,
        tint: [f32; 4],
        override_material: Option<&Material>,
    ) -> DeviceResult<DrawOutcome> {
        if !shader.is_ready() {
            return Ok(DrawOutcome::SkippedShaderNotReady);
        }
        shader.bind(device);

        if let Some(loc) = shader.uniform(device, "matrix") {
            device.set_uniform_mat4(loc, &matrices.mvp);
        }
        if let Some(loc) = shader.uniform(device, "ProjMat") {
            device.set_uniform_mat4(loc, &matrices.projection);
        }
        if let Some(loc) = shader.uniform(device, "ViewMat") {
            device.set_uniform_mat4(loc, &matrices.view);
        }
        if let Some(loc) = shader.uniform(device, "ModelMat") {
            device.set_uniform_mat4(loc, &matrices.model);
        }
        if let Some(loc) = shader.uniform(device, "CamPos") {
            device.set_uniform_vec3(loc, &matrices.camera_position);
        }
        if let Some(loc) = shader.uniform(device, "ObjColor") {
            device.set_uniform_vec4(loc, tint);
        }

        for batch in &drawable.batches {
            let material = override_material
                .copied()
                .unwrap_or_else(|| drawable.batch_material(batch));
            Self::set_material(device, shader, &material);

            for binding in &batch.textures {
                if let Some(loc) = shader.uniform(device, &binding.sampler) {
                    device.set_uniform_int(loc, binding.unit as i32);
                }
                device.bind_texture(binding.unit, Some(binding.texture));
            }

            device.draw_indexed(batch.geometry, batch.index_count)?;

            for binding in &batch.textures {
                device.bind_texture(binding.unit, None);
            }
        }

        Ok(DrawOutcome::Drawn)
    }

    fn set_material(device: &mut dyn RenderDevice, shader: &mut ShaderHandle, material: &Material) {
        let locations: [(Option<UniformLocation>, &Vec3); 3] = [
            (shader.uniform(device, "material.ambient"), &material.ambient),
            (shader.uniform(device, "material.diffuse"), &material.diffuse),
            (
                shader.uniform(device, "material.specular"),
                &material.specular,
            ),
        ];
        for (loc, value) in locations {
            if let Some(loc) = loc {
                device.set_uniform_vec3(loc, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{DeviceEvent, HeadlessDevice};
    use crate::render::mesh::{TriangleBatch, Vertex};

    const VALID: &str = "void main() {}";

    fn tri() -> (Vec<Vertex>, Vec<u32>) {
        let v = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        (v, vec![0, 1, 2])
    }

    fn drawable_with_batches(device: &mut HeadlessDevice, n: usize) -> Drawable {
        let (vertices, indices) = tri();
        let mut drawable = Drawable::empty();
        for i in 0..n {
            let geometry = device.create_geometry(&vertices, &indices).unwrap();
            drawable.batches.push(TriangleBatch {
                geometry,
                index_count: 3,
                material_index: i,
                textures: Vec::new(),
            });
            drawable.materials.push(Material::new(
                Vec3::new(0.1 * i as f32, 0.0, 0.0),
                Vec3::new(0.0, 0.1 * i as f32, 0.0),
                Vec3::new(0.0, 0.0, 0.1 * i as f32),
            ));
        }
        drawable
    }

    fn matrices() -> OverlayMatrices {
        OverlayMatrices::from_mvp(Mat4::identity(), Mat4::identity(), Vec3::zeros())
    }

    #[test]
    fn test_one_draw_per_batch() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "model-test");
        let drawable = drawable_with_batches(&mut device, 4);

        device.clear_trace();
        let outcome = ModelRenderer::draw(
            &mut device,
            &mut shader,
            &drawable,
            &matrices(),
            [1.0; 4],
            None,
        )
        .unwrap();

        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(device.draws().count(), 4);
    }

    #[test]
    fn test_material_uniform_once_per_batch_override_path() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "model-test");
        let drawable = drawable_with_batches(&mut device, 3);
        let override_mat = Material::neutral();

        device.clear_trace();
        ModelRenderer::draw(
            &mut device,
            &mut shader,
            &drawable,
            &matrices(),
            [1.0; 4],
            Some(&override_mat),
        )
        .unwrap();

        let diffuse_loc = shader.uniform(&mut device, "material.diffuse").unwrap();
        let diffuse_sets: Vec<_> = device
            .trace()
            .iter()
            .filter_map(|e| match e {
                DeviceEvent::UniformVec3 { location, value } if *location == diffuse_loc => {
                    Some(*value)
                }
                _ => None,
            })
            .collect();

        // Once per batch, always the override color
        assert_eq!(diffuse_sets.len(), 3);
        assert!(diffuse_sets.iter().all(|v| *v == override_mat.diffuse));
    }

    #[test]
    fn test_stored_materials_used_without_override() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "model-test");
        let drawable = drawable_with_batches(&mut device, 2);

        device.clear_trace();
        ModelRenderer::draw(
            &mut device,
            &mut shader,
            &drawable,
            &matrices(),
            [1.0; 4],
            None,
        )
        .unwrap();

        let diffuse_loc = shader.uniform(&mut device, "material.diffuse").unwrap();
        let diffuse_sets: Vec<_> = device
            .trace()
            .iter()
            .filter_map(|e| match e {
                DeviceEvent::UniformVec3 { location, value } if *location == diffuse_loc => {
                    Some(*value)
                }
                _ => None,
            })
            .collect();

        assert_eq!(diffuse_sets.len(), 2);
        assert_eq!(diffuse_sets[0], drawable.materials[0].diffuse);
        assert_eq!(diffuse_sets[1], drawable.materials[1].diffuse);
    }

    #[test]
    fn test_not_ready_shader_issues_zero_draws() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::not_ready("broken");
        let drawable = drawable_with_batches(&mut device, 4);

        device.clear_trace();
        let outcome = ModelRenderer::draw(
            &mut device,
            &mut shader,
            &drawable,
            &matrices(),
            [1.0; 4],
            None,
        )
        .unwrap();

        assert_eq!(outcome, DrawOutcome::SkippedShaderNotReady);
        assert_eq!(device.draws().count(), 0);
    }

    #[test]
    fn test_empty_drawable_draws_nothing() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderHandle::from_sources(&mut device, VALID, VALID, "model-test");
        device.clear_trace();
        let outcome = ModelRenderer::draw(
            &mut device,
            &mut shader,
            &Drawable::empty(),
            &matrices(),
            [1.0; 4],
            None,
        )
        .unwrap();
        assert_eq!(outcome, DrawOutcome::Drawn);
        assert_eq!(device.draws().count(), 0);
    }
}
