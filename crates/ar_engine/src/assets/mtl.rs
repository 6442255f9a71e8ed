//! Wavefront MTL parser
//!
//! Parses .mtl files into the Phong subset the overlay shader consumes:
//! ambient/diffuse/specular colors plus the diffuse and specular texture
//! maps. Everything else a material library may carry is ignored.

use std::collections::HashMap;

use crate::assets::ModelError;
use crate::foundation::math::Vec3;
use crate::render::materials::Material;

/// Parsed material entry from a .mtl library
#[derive(Debug, Clone)]
pub struct MtlData {
    /// Material name
    pub name: String,
    /// Ambient color (Ka)
    pub ambient: Vec3,
    /// Diffuse color (Kd)
    pub diffuse: Vec3,
    /// Specular color (Ks)
    pub specular: Vec3,
    /// Dissolve/opacity (d), 1.0 = opaque
    pub dissolve: f32,
    /// Diffuse texture map path (map_Kd), relative to the library file
    pub diffuse_map: Option<String>,
    /// Specular texture map path (map_Ks), relative to the library file
    pub specular_map: Option<String>,
}

impl Default for MtlData {
    fn default() -> Self {
        let colors = Material::default();
        Self {
            name: String::new(),
            ambient: colors.ambient,
            diffuse: colors.diffuse,
            specular: colors.specular,
            dissolve: 1.0,
            diffuse_map: None,
            specular_map: None,
        }
    }
}

impl MtlData {
    /// The shading colors as a draw-time material
    pub fn material(&self) -> Material {
        Material::new(self.ambient, self.diffuse, self.specular)
    }
}

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into a map of material name -> data
    pub fn parse(contents: &str) -> Result<HashMap<String, MtlData>, ModelError> {
        let mut materials = HashMap::new();
        let mut current: Option<MtlData> = None;

        for (line_num, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let command = match tokens.next() {
                Some(cmd) => cmd,
                None => continue,
            };

            match command {
                "newmtl" => {
                    if let Some(mat) = current.take() {
                        materials.insert(mat.name.clone(), mat);
                    }
                    let name = tokens
                        .next()
                        .ok_or_else(|| {
                            ModelError::Parse(format!(
                                "line {}: newmtl missing material name",
                                line_num + 1
                            ))
                        })?
                        .to_string();
                    current = Some(MtlData {
                        name,
                        ..Default::default()
                    });
                }
                "Ka" => {
                    if let Some(ref mut mat) = current {
                        mat.ambient = Self::parse_vec3(&mut tokens, line_num, "Ka")?;
                    }
                }
                "Kd" => {
                    if let Some(ref mut mat) = current {
                        mat.diffuse = Self::parse_vec3(&mut tokens, line_num, "Kd")?;
                    }
                }
                "Ks" => {
                    if let Some(ref mut mat) = current {
                        mat.specular = Self::parse_vec3(&mut tokens, line_num, "Ks")?;
                    }
                }
                "d" => {
                    if let Some(ref mut mat) = current {
                        mat.dissolve = Self::parse_f32(&mut tokens, line_num, "d")?;
                    }
                }
                "Tr" => {
                    // Inverted dissolve: Tr = 1.0 - d
                    if let Some(ref mut mat) = current {
                        let transparency = Self::parse_f32(&mut tokens, line_num, "Tr")?;
                        mat.dissolve = 1.0 - transparency;
                    }
                }
                "map_Kd" => {
                    if let Some(ref mut mat) = current {
                        mat.diffuse_map =
                            Some(Self::parse_texture_path(&mut tokens, line_num, "map_Kd")?);
                    }
                }
                "map_Ks" => {
                    if let Some(ref mut mat) = current {
                        mat.specular_map =
                            Some(Self::parse_texture_path(&mut tokens, line_num, "map_Ks")?);
                    }
                }
                // Ignore unknown commands silently
                _ => {}
            }
        }

        if let Some(mat) = current {
            materials.insert(mat.name.clone(), mat);
        }

        Ok(materials)
    }

    fn parse_vec3<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<Vec3, ModelError>
    where
        I: Iterator<Item = &'a str>,
    {
        let r = Self::parse_f32(tokens, line_num, command)?;
        let g = Self::parse_f32(tokens, line_num, command)?;
        let b = Self::parse_f32(tokens, line_num, command)?;
        Ok(Vec3::new(r, g, b))
    }

    fn parse_f32<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<f32, ModelError>
    where
        I: Iterator<Item = &'a str>,
    {
        let token = tokens.next().ok_or_else(|| {
            ModelError::Parse(format!("line {}: {} missing value", line_num + 1, command))
        })?;
        token.parse::<f32>().map_err(|_| {
            ModelError::Parse(format!(
                "line {}: {} invalid float value '{}'",
                line_num + 1,
                command,
                token
            ))
        })
    }

    /// Texture paths may contain spaces; take the rest of the line.
    fn parse_texture_path<'a, I>(
        tokens: &mut I,
        line_num: usize,
        command: &str,
    ) -> Result<String, ModelError>
    where
        I: Iterator<Item = &'a str>,
    {
        let path: Vec<&str> = tokens.collect();
        if path.is_empty() {
            return Err(ModelError::Parse(format!(
                "line {}: {} missing texture path",
                line_num + 1,
                command
            )));
        }
        Ok(path.join(" "))
    }
}
