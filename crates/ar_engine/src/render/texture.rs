//! CPU pixel buffer to GPU texture upload
//!
//! Camera frames are uploaded fresh every frame. Each upload is a new
//! device texture the caller must delete.

use crate::capture::RgbFrame;
use crate::render::device::{DeviceResult, RenderDevice, TextureKey};

/// Uploads 2D pixel buffers as sampleable textures
pub struct TextureUploader;

impl TextureUploader {
    /// Upload a 3-channel frame as a new texture. Caller owns the key and
    /// is responsible for deleting it.
    pub fn upload(device: &mut dyn RenderDevice, frame: &RgbFrame) -> DeviceResult<TextureKey> {
        device.create_texture_rgb(frame.width(), frame.height(), &frame.pixels)
    }
}
