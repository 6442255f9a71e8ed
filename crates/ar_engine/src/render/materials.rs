//! Phong-style material colors
//!
//! The overlay shader only consumes ambient/diffuse/specular triples;
//! everything else a model format may carry is dropped at load time.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;

/// Ambient/diffuse/specular color triple for one batch group
///
/// Immutable after load. At draw time a caller-supplied override material
/// takes precedence over the drawable's stored materials, which is how the
/// overlay tints a whole model in one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Ambient reflectance
    pub ambient: Vec3,
    /// Diffuse reflectance
    pub diffuse: Vec3,
    /// Specular reflectance
    pub specular: Vec3,
}

impl Material {
    /// Construct a material from three RGB triples
    pub fn new(ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
        }
    }

    /// Neutral gray override used for monochrome overlay rendering
    pub fn neutral() -> Self {
        Self::new(
            Vec3::new(0.3, 0.3, 0.3),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.3, 0.3, 0.3),
        )
    }
}

impl Default for Material {
    fn default() -> Self {
        // Wavefront defaults: white ambient, light gray diffuse/specular
        Self::new(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.8, 0.8, 0.8),
            Vec3::new(0.5, 0.5, 0.5),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_material() {
        let m = Material::neutral();
        assert_eq!(m.diffuse, Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(m.ambient, m.specular);
    }
}
