//! OBJ model loader
//!
//! Parses a Wavefront OBJ file (plus any `mtllib` libraries it names)
//! into a node arena, then walks the arena with an explicit worklist and
//! uploads one [`TriangleBatch`] per mesh. Texture units and sampler
//! uniform names are assigned here, at load time; draw code only reads
//! the stored bindings.
//!
//! Loading degrades rather than fails where the original asset is partly
//! usable: a missing material library or an undecodable texture map is
//! logged and skipped, and the affected batches fall back to default
//! colors.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::assets::mtl::{MtlData, MtlParser};
use crate::assets::ModelError;
use crate::render::device::{RenderDevice, TextureKey};
use crate::render::mesh::{Drawable, TextureBinding, TextureSemantic, TriangleBatch, Vertex};

/// One node of the parsed scene graph, addressed by arena index
#[derive(Debug, Default)]
struct SceneNode {
    meshes: Vec<usize>,
    children: Vec<usize>,
}

/// One mesh before upload: deduplicated-per-face vertices plus indices
#[derive(Debug, Default)]
struct MeshData {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    material: Option<String>,
}

/// Parsed OBJ content: a node arena (index 0 is the root), the meshes
/// the nodes reference, and the accumulated material libraries.
#[derive(Debug, Default)]
pub struct ObjScene {
    nodes: Vec<SceneNode>,
    meshes: Vec<MeshData>,
    /// Materials collected from every `mtllib` statement
    pub materials: HashMap<String, MtlData>,
}

/// OBJ file loader
pub struct ModelLoader;

impl ModelLoader {
    /// Load an OBJ file and upload it as a drawable
    pub fn load<P: AsRef<Path>>(
        device: &mut dyn RenderDevice,
        path: P,
    ) -> Result<Drawable, ModelError> {
        let path = path.as_ref();
        let base_dir = path.parent();
        let file = File::open(path)?;
        let scene = Self::parse(BufReader::new(file), base_dir)?;
        Self::upload(device, &scene, base_dir)
    }

    /// Parse OBJ content into a scene arena.
    ///
    /// `base_dir` resolves `mtllib` paths; with `None`, or when a library
    /// file cannot be read, the statement is logged and skipped.
    pub fn parse<R: BufRead>(reader: R, base_dir: Option<&Path>) -> Result<ObjScene, ModelError> {
        let mut scene = ObjScene::default();
        scene.nodes.push(SceneNode::default()); // root

        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();

        let mut current_node = 0usize;
        let mut current_mesh: Option<usize> = None;

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => {
                    if parts.len() >= 4 {
                        positions.push(Self::parse_triple(&parts, "vertex")?);
                    }
                }
                "vn" => {
                    if parts.len() >= 4 {
                        normals.push(Self::parse_triple(&parts, "normal")?);
                    }
                }
                "vt" => {
                    if parts.len() >= 3 {
                        let u: f32 = Self::parse_component(parts[1], "tex coord u")?;
                        let v: f32 = Self::parse_component(parts[2], "tex coord v")?;
                        tex_coords.push([u, v]);
                    }
                }
                "o" | "g" => {
                    // New scene node under the root; following meshes
                    // attach to it.
                    let idx = scene.nodes.len();
                    scene.nodes.push(SceneNode::default());
                    scene.nodes[0].children.push(idx);
                    current_node = idx;
                    current_mesh = None;
                }
                "usemtl" => {
                    // Material change starts a new batch
                    let material = parts.get(1).map(|s| (*s).to_string());
                    let idx = Self::start_mesh(&mut scene, current_node, material);
                    current_mesh = Some(idx);
                }
                "mtllib" => {
                    if parts.len() >= 2 {
                        Self::load_material_library(&mut scene, base_dir, &parts[1..].join(" "));
                    }
                }
                "f" => {
                    if parts.len() >= 4 {
                        let mesh_idx = match current_mesh {
                            Some(idx) => idx,
                            None => {
                                let idx = Self::start_mesh(&mut scene, current_node, None);
                                current_mesh = Some(idx);
                                idx
                            }
                        };
                        Self::parse_face(
                            &mut scene.meshes[mesh_idx],
                            &parts[1..],
                            &positions,
                            &normals,
                            &tex_coords,
                        )?;
                    }
                }
                // Ignore other statements
                _ => {}
            }
        }

        if scene.meshes.iter().all(|m| m.vertices.is_empty()) {
            return Err(ModelError::InvalidFormat(
                "no geometry found in OBJ file".to_string(),
            ));
        }

        Ok(scene)
    }

    /// Upload a parsed scene as a drawable.
    ///
    /// Traverses the node arena with an explicit worklist in depth-first
    /// preorder; batch order in the drawable follows traversal order.
    /// `base_dir` resolves texture map paths.
    pub fn upload(
        device: &mut dyn RenderDevice,
        scene: &ObjScene,
        base_dir: Option<&Path>,
    ) -> Result<Drawable, ModelError> {
        let mut drawable = Drawable::empty();
        let mut material_indices: HashMap<&str, usize> = HashMap::new();
        let mut texture_cache: HashMap<&str, Option<TextureKey>> = HashMap::new();
        let mut default_material: Option<usize> = None;

        let mut worklist = vec![0usize];
        while let Some(node_idx) = worklist.pop() {
            let node = &scene.nodes[node_idx];
            for &mesh_idx in &node.meshes {
                let mesh = &scene.meshes[mesh_idx];
                if mesh.indices.is_empty() {
                    continue;
                }

                let geometry = device.create_geometry(&mesh.vertices, &mesh.indices)?;
                let entry = mesh
                    .material
                    .as_deref()
                    .and_then(|name| match scene.materials.get(name) {
                        Some(mtl) => Some((name, mtl)),
                        None => {
                            log::warn!("material '{name}' not found in any library, using defaults");
                            None
                        }
                    });

                let material_index = match entry {
                    Some((name, mtl)) => *material_indices.entry(name).or_insert_with(|| {
                        drawable.materials.push(mtl.material());
                        drawable.materials.len() - 1
                    }),
                    None => *default_material.get_or_insert_with(|| {
                        drawable.materials.push(Default::default());
                        drawable.materials.len() - 1
                    }),
                };

                let textures = match entry {
                    Some((_, mtl)) => {
                        Self::batch_textures(device, mtl, base_dir, &mut texture_cache)
                    }
                    None => Vec::new(),
                };

                drawable.batches.push(TriangleBatch {
                    geometry,
                    index_count: mesh.indices.len() as u32,
                    material_index,
                    textures,
                });
            }
            // Reverse push keeps the first child on top of the worklist
            for &child in node.children.iter().rev() {
                worklist.push(child);
            }
        }

        Ok(drawable)
    }

    fn start_mesh(scene: &mut ObjScene, node: usize, material: Option<String>) -> usize {
        let idx = scene.meshes.len();
        scene.meshes.push(MeshData {
            material,
            ..Default::default()
        });
        scene.nodes[node].meshes.push(idx);
        idx
    }

    fn load_material_library(scene: &mut ObjScene, base_dir: Option<&Path>, name: &str) {
        let Some(dir) = base_dir else {
            log::warn!("mtllib {name} skipped: no base directory to resolve it against");
            return;
        };
        let path = dir.join(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("material library {} unreadable, skipping: {e}", path.display());
                return;
            }
        };
        match MtlParser::parse(&contents) {
            Ok(materials) => {
                log::debug!("loaded {} materials from {}", materials.len(), path.display());
                scene.materials.extend(materials);
            }
            Err(e) => {
                log::warn!("material library {} invalid, skipping: {e}", path.display());
            }
        }
    }

    /// Resolve one material's texture maps into explicit unit bindings.
    ///
    /// Units count up from 0 in binding order; sampler names follow the
    /// `texture_<semantic>N` convention with N starting at 1 per semantic.
    fn batch_textures<'a>(
        device: &mut dyn RenderDevice,
        mtl: &'a MtlData,
        base_dir: Option<&Path>,
        cache: &mut HashMap<&'a str, Option<TextureKey>>,
    ) -> Vec<TextureBinding> {
        let maps = [
            (TextureSemantic::Diffuse, "texture_diffuse1", &mtl.diffuse_map),
            (
                TextureSemantic::Specular,
                "texture_specular1",
                &mtl.specular_map,
            ),
        ];

        let mut bindings = Vec::new();
        for (semantic, sampler, map) in maps {
            let Some(map) = map.as_deref() else { continue };
            let texture = *cache
                .entry(map)
                .or_insert_with(|| Self::load_texture(device, base_dir, map));
            if let Some(texture) = texture {
                bindings.push(TextureBinding {
                    texture,
                    semantic,
                    unit: bindings.len() as u32,
                    sampler: sampler.to_string(),
                });
            }
        }
        bindings
    }

    fn load_texture(
        device: &mut dyn RenderDevice,
        base_dir: Option<&Path>,
        map: &str,
    ) -> Option<TextureKey> {
        let path = match base_dir {
            Some(dir) => dir.join(map),
            None => Path::new(map).to_path_buf(),
        };
        let image = match image::open(&path) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                log::warn!("texture map {} unusable, skipping: {e}", path.display());
                return None;
            }
        };
        match device.create_texture_rgb(image.width(), image.height(), image.as_raw()) {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::warn!("texture map {} upload failed, skipping: {e}", path.display());
                None
            }
        }
    }

    fn parse_face(
        mesh: &mut MeshData,
        corners: &[&str],
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
    ) -> Result<(), ModelError> {
        let mut face_indices = Vec::with_capacity(corners.len());

        for corner in corners {
            let refs: Vec<&str> = corner.split('/').collect();

            // OBJ indices are 1-based; 0 is malformed, not an offset
            let position = refs[0]
                .parse::<usize>()
                .ok()
                .and_then(|i| i.checked_sub(1))
                .ok_or_else(|| {
                    ModelError::Parse(format!("invalid position index '{}'", refs[0]))
                })
                .and_then(|i| {
                    positions.get(i).ok_or_else(|| {
                        ModelError::InvalidFormat("position index out of bounds".to_string())
                    })
                })?;

            let tex_coord = refs
                .get(1)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| tex_coords.get(i))
                .unwrap_or(&[0.0, 0.0]);

            let normal = refs
                .get(2)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<usize>().ok())
                .and_then(|i| i.checked_sub(1))
                .and_then(|i| normals.get(i))
                .unwrap_or(&[0.0, 1.0, 0.0]);

            mesh.vertices
                .push(Vertex::new(*position, *normal, *tex_coord));
            face_indices.push((mesh.vertices.len() - 1) as u32);
        }

        // Fan triangulation for quads and n-gons
        for i in 1..(face_indices.len() - 1) {
            mesh.indices.push(face_indices[0]);
            mesh.indices.push(face_indices[i]);
            mesh.indices.push(face_indices[i + 1]);
        }
        Ok(())
    }

    fn parse_triple(parts: &[&str], what: &str) -> Result<[f32; 3], ModelError> {
        Ok([
            Self::parse_component(parts[1], what)?,
            Self::parse_component(parts[2], what)?,
            Self::parse_component(parts[3], what)?,
        ])
    }

    fn parse_component(token: &str, what: &str) -> Result<f32, ModelError> {
        token
            .parse()
            .map_err(|_| ModelError::Parse(format!("invalid {what} value '{token}'")))
    }
}
