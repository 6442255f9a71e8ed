//! Stereo camera capture seam
//!
//! The physical depth camera sits behind [`StereoFrameSource`]: one
//! `grab()` per displayed frame refreshes a fixed pair of CPU-side RGBA
//! buffers in place, and the retrieve calls borrow them. There is no
//! double buffering; the single-threaded frame loop finishes consuming a
//! frame before the next grab overwrites it.

use thiserror::Error;

/// Default capture width in pixels (HD720)
pub const DEFAULT_CAMERA_WIDTH: u32 = 1280;
/// Default capture height in pixels (HD720)
pub const DEFAULT_CAMERA_HEIGHT: u32 = 720;

/// Capture subsystem errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The camera could not be opened at startup
    #[error("stereo camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// A per-frame grab did not return an image pair
    #[error("frame grab failed: {0}")]
    GrabFailed(String),
}

/// One camera image: fixed-resolution RGBA8 pixels, refreshed in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    width: u32,
    height: u32,
    /// 4-channel 8-bit pixels, row-major, row 0 first
    pub rgba: Vec<u8>,
}

impl CameraFrame {
    /// Allocate a zeroed frame
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0u8; (width * height * 4) as usize],
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Drop the alpha channel and mirror rows vertically into `out`,
    /// matching the texture-coordinate convention of the GL-style upload
    /// path (image row 0 becomes the last texture row).
    ///
    /// `out` is resized once and then reused frame over frame.
    pub fn to_rgb_flipped(&self, out: &mut RgbFrame) {
        out.reset(self.width, self.height);
        let w = self.width as usize;
        for (y, src_row) in self.rgba.chunks_exact(w * 4).enumerate() {
            let dst_y = self.height as usize - 1 - y;
            let dst_row = &mut out.pixels[dst_y * w * 3..(dst_y + 1) * w * 3];
            for (src_px, dst_px) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(3)) {
                dst_px.copy_from_slice(&src_px[..3]);
            }
        }
    }
}

/// A 3-channel 8-bit pixel buffer ready for texture upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RgbFrame {
    width: u32,
    height: u32,
    /// 3-channel 8-bit pixels, row-major
    pub pixels: Vec<u8>,
}

impl RgbFrame {
    /// Allocate a zeroed buffer
    pub fn new(width: u32, height: u32) -> Self {
        let mut frame = Self::default();
        frame.reset(width, height);
        frame
    }

    /// Resize (if needed) without reallocating when dimensions match
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.resize((width * height * 3) as usize, 0);
    }

    /// Buffer width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Synchronized stereo capture source
///
/// Contract: `grab()` refreshes both eye buffers in place; the retrieve
/// methods borrow the most recent successful grab. After a failed grab the
/// buffers keep the previous frame's contents, which the pipeline shows
/// again rather than dropping the iteration.
pub trait StereoFrameSource {
    /// Acquire the next synchronized image pair into the internal buffers
    fn grab(&mut self) -> Result<(), CaptureError>;

    /// The left-eye image from the last successful grab
    fn retrieve_left(&self) -> &CameraFrame;

    /// The right-eye image from the last successful grab
    fn retrieve_right(&self) -> &CameraFrame;

    /// Fixed capture resolution
    fn resolution(&self) -> (u32, u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_to_rgb_drops_alpha_and_flips() {
        // 2x2 frame with distinct corner colors
        let mut frame = CameraFrame::new(2, 2);
        frame.rgba = vec![
            255, 0, 0, 255, /* top-left red */
            0, 255, 0, 255, /* top-right green */
            0, 0, 255, 255, /* bottom-left blue */
            9, 9, 9, 128, /* bottom-right gray, alpha ignored */
        ];

        let mut rgb = RgbFrame::default();
        frame.to_rgb_flipped(&mut rgb);

        assert_eq!(rgb.width(), 2);
        assert_eq!(rgb.height(), 2);
        // Rows swapped, alpha gone
        assert_eq!(&rgb.pixels[0..6], &[0, 0, 255, 9, 9, 9]);
        assert_eq!(&rgb.pixels[6..12], &[255, 0, 0, 0, 255, 0]);
    }

    #[test]
    fn test_rgb_reset_reuses_allocation() {
        let mut rgb = RgbFrame::new(4, 4);
        let cap_before = rgb.pixels.capacity();
        rgb.reset(4, 4);
        assert_eq!(rgb.pixels.capacity(), cap_before);
        assert_eq!(rgb.pixels.len(), 4 * 4 * 3);
    }
}
