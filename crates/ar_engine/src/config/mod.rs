//! Session configuration
//!
//! RON-serialized settings for a compositing session. Every field has a
//! default matching the demo setup, so a missing or broken config file
//! degrades to a runnable session instead of refusing to start.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{DEFAULT_CAMERA_HEIGHT, DEFAULT_CAMERA_WIDTH};
use crate::render::materials::Material;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("config file unreadable: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid RON
    #[error("config file invalid: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Stereo camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Capture width in pixels
    pub width: u32,
    /// Capture height in pixels
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
        }
    }
}

/// Projection clip planes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipConfig {
    /// Near clip distance in meters
    pub near: f32,
    /// Far clip distance in meters
    pub far: f32,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 5000.0,
        }
    }
}

/// Shader source file paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Background pass vertex shader
    pub background_vertex: String,
    /// Background pass fragment shader
    pub background_fragment: String,
    /// Overlay pass vertex shader
    pub model_vertex: String,
    /// Overlay pass fragment shader
    pub model_fragment: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            background_vertex: "resources/shaders/background.vert".to_string(),
            background_fragment: "resources/shaders/background.frag".to_string(),
            model_vertex: "resources/shaders/model.vert".to_string(),
            model_fragment: "resources/shaders/model.frag".to_string(),
        }
    }
}

/// One model overlay to load and draw every frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// OBJ file to load
    pub model_path: String,
    /// RGBA tint multiplied over the shaded color
    pub tint: [f32; 4],
    /// When set, replaces every material of the model
    pub material_override: Option<Material>,
}

/// Complete session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stereo camera settings
    pub camera: CameraConfig,
    /// Projection clip planes
    pub clip: ClipConfig,
    /// Shader source paths
    pub shaders: ShaderConfig,
    /// Overlays in back-to-front draw order
    pub overlays: Vec<OverlayConfig>,
    /// Uniform scale applied to every overlay (model units to meters)
    pub model_scale: f32,
    /// Rotation about X applied to every overlay, in degrees
    pub model_rotation_x_deg: f32,
    /// Frames to present before a headless session exits; None runs until
    /// the display requests exit.
    pub frame_budget: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            clip: ClipConfig::default(),
            shaders: ShaderConfig::default(),
            overlays: vec![
                OverlayConfig {
                    model_path: "resources/models/skeleton.obj".to_string(),
                    tint: [1.0, 1.0, 1.0, 1.0],
                    material_override: Some(Material::neutral()),
                },
                OverlayConfig {
                    model_path: "resources/models/face.obj".to_string(),
                    // Semi-transparent skin tone drawn after the skeleton
                    tint: [0.745, 0.447, 0.235, 0.5],
                    material_override: None,
                },
            ],
            model_scale: 0.001,
            model_rotation_x_deg: -90.0,
            frame_budget: Some(600),
        }
    }
}

impl SessionConfig {
    /// Load settings from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }

    /// Load settings, falling back to defaults when the file is missing
    /// or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("using default config ({}: {e})", path.display());
                Self::default()
            }
        }
    }
}
