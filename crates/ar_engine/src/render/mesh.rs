//! Drawable geometry: vertices, triangle batches, and the uploaded model
//!
//! A [`Drawable`] is the GPU-side form of an imported model: an ordered
//! sequence of triangle batches, each referencing one of the model's
//! materials and carrying its own texture bindings. Drawables are built
//! once at load time and never mutated afterwards.

use crate::render::device::{GeometryKey, TextureKey};
use crate::render::materials::Material;

/// Vertex layout shared by model geometry and the background quad
///
/// `#[repr(C)]` keeps the layout stable for GPU buffer uploads.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Construct a vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// What a texture map contributes to shading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSemantic {
    /// Diffuse color map
    Diffuse,
    /// Specular intensity map
    Specular,
}

/// A texture bound to an explicit sampler unit for one batch
///
/// Units and sampler uniform names are assigned once at load time, so
/// draw-time binding is a lookup instead of a running counter over the
/// texture list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    /// Device texture
    pub texture: TextureKey,
    /// Shading role of the map
    pub semantic: TextureSemantic,
    /// Sampler unit the batch binds this texture to
    pub unit: u32,
    /// Sampler uniform fed with `unit` (e.g. `texture_diffuse1`)
    pub sampler: String,
}

/// One indexed triangle batch with its material reference
#[derive(Debug, Clone)]
pub struct TriangleBatch {
    /// Uploaded vertex/index buffers
    pub geometry: GeometryKey,
    /// Number of indices to draw
    pub index_count: u32,
    /// Index into the drawable's material list
    pub material_index: usize,
    /// Texture bindings for this batch, unit-explicit
    pub textures: Vec<TextureBinding>,
}

/// GPU-side model: ordered batches plus the materials they reference
#[derive(Debug, Clone, Default)]
pub struct Drawable {
    /// Triangle batches in draw order
    pub batches: Vec<TriangleBatch>,
    /// Materials referenced by `material_index`
    pub materials: Vec<Material>,
}

impl Drawable {
    /// A drawable with nothing to draw; rendering it is a no-op.
    ///
    /// Used as the degrade path when a model file fails to load.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when the drawable contains no geometry
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The stored material for a batch, falling back to the default
    /// material when the model carried none.
    pub fn batch_material(&self, batch: &TriangleBatch) -> Material {
        self.materials
            .get(batch.material_index)
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        // position + normal + tex_coord, no padding
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * 4);
    }

    #[test]
    fn test_empty_drawable() {
        let d = Drawable::empty();
        assert!(d.is_empty());
        assert_eq!(d.batches.len(), 0);
    }
}
