use image::RgbaImage;

use crate::ops::crop;
use crate::types::error::{BoothError, BoothResult};
use crate::types::frame::Frame;

/// One raw RGBA frame pulled from a live video source.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CameraFrame {
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

/// A live video source the booth can preview and snapshot from.
///
/// The production implementation is the GStreamer webcam; tests drive the
/// session with a scripted source instead.
pub trait CaptureSource {
    /// Source resolution, once known.
    fn resolution(&self) -> Option<(u32, u32)>;

    /// Drain pending frames and return the newest one, if any.
    fn poll_frame(&mut self) -> Option<&CameraFrame>;

    /// Produce one still matching what the preview shows: center-cropped to
    /// cover `container`, then JPEG-encoded.
    fn snapshot(&mut self, container: (u32, u32)) -> BoothResult<Frame>;
}

/// Shared snapshot path: cover-crop a live frame to the preview container
/// and encode it as a [`Frame`].
pub fn snapshot_from(frame: &CameraFrame, container: (u32, u32)) -> BoothResult<Frame> {
    let img = frame
        .to_image()
        .ok_or_else(|| BoothError::capture("camera frame has inconsistent dimensions"))?;
    let cropped = crop::crop_to_cover(&img, container.0, container.1)?;
    crop::encode_frame(&cropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_frame(width: u32, height: u32) -> CameraFrame {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([90, 140, 190, 255]));
        CameraFrame {
            data: img.into_raw(),
            width,
            height,
        }
    }

    #[test]
    fn snapshot_matches_the_container_dimensions() {
        let frame = live_frame(1280, 720);
        let shot = snapshot_from(&frame, (480, 640)).unwrap();
        assert_eq!((shot.width, shot.height), (480, 640));
        assert!(!shot.jpeg.is_empty());
    }

    #[test]
    fn snapshot_of_inconsistent_frame_fails() {
        let frame = CameraFrame {
            data: vec![0; 16],
            width: 1280,
            height: 720,
        };
        let err = snapshot_from(&frame, (480, 640)).unwrap_err();
        assert!(matches!(err, BoothError::Capture(_)));
    }

    #[test]
    fn snapshot_into_empty_container_fails() {
        let frame = live_frame(64, 64);
        assert!(snapshot_from(&frame, (0, 0)).is_err());
    }
}
