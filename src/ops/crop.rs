use image::imageops::{self, FilterType};
use image::RgbaImage;
use image::buffer::ConvertBuffer;

use crate::types::error::{BoothError, BoothResult};
use crate::types::frame::Frame;

const JPEG_QUALITY: u8 = 92;

/// Placement of a source image over a destination region with cover
/// semantics: scaled up until both axes are filled, centered, overflow
/// cropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Compute the cover placement of a `src_w` x `src_h` image inside a
/// `dst_w` x `dst_h` region. Offsets are zero or negative: they shift the
/// scaled image so the overflow hangs evenly off both edges.
pub fn cover_fit(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> CoverFit {
    let scale = f64::max(
        dst_w as f64 / src_w.max(1) as f64,
        dst_h as f64 / src_h.max(1) as f64,
    );
    let scaled_w = src_w as f64 * scale;
    let scaled_h = src_h as f64 * scale;
    CoverFit {
        scale,
        offset_x: (dst_w as f64 - scaled_w) / 2.0,
        offset_y: (dst_h as f64 - scaled_h) / 2.0,
    }
}

/// Crop and scale `src` so the result is exactly `dst_w` x `dst_h` and shows
/// what cover placement would show: the center of the source, edges cropped.
pub fn crop_to_cover(src: &RgbaImage, dst_w: u32, dst_h: u32) -> BoothResult<RgbaImage> {
    if src.width() == 0 || src.height() == 0 || dst_w == 0 || dst_h == 0 {
        return Err(BoothError::capture("cannot crop a zero-sized image"));
    }
    let fit = cover_fit(src.width(), src.height(), dst_w, dst_h);
    let scaled_w = (src.width() as f64 * fit.scale).ceil().max(dst_w as f64) as u32;
    let scaled_h = (src.height() as f64 * fit.scale).ceil().max(dst_h as f64) as u32;
    let scaled = imageops::resize(src, scaled_w, scaled_h, FilterType::Triangle);
    let x = (scaled_w - dst_w) / 2;
    let y = (scaled_h - dst_h) / 2;
    Ok(imageops::crop_imm(&scaled, x, y, dst_w, dst_h).to_image())
}

/// JPEG-encode a captured still into an immutable [`Frame`].
pub fn encode_frame(img: &RgbaImage) -> BoothResult<Frame> {
    let rgb: image::RgbImage = img.convert();
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| BoothError::capture(format!("jpeg encode failed: {e}")))?;
    Ok(Frame::new(jpeg, img.width(), img.height()))
}

/// Decode a [`Frame`] back into pixels for compositing.
pub fn decode_frame(frame: &Frame) -> BoothResult<RgbaImage> {
    let img = image::load_from_memory(&frame.jpeg)
        .map_err(|e| BoothError::compose(format!("frame decode failed: {e}")))?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_fit_scales_to_the_tighter_axis() {
        // Wide source into a portrait region: height is the binding axis.
        let fit = cover_fit(1280, 720, 600, 800);
        assert!((fit.scale - 800.0 / 720.0).abs() < 1e-9);
        assert!(fit.offset_x < 0.0);
        assert!(fit.offset_y.abs() < 1e-9);

        // Tall source into a landscape region: width binds.
        let fit = cover_fit(600, 800, 720, 300);
        assert!((fit.scale - 720.0 / 600.0).abs() < 1e-9);
        assert!(fit.offset_y < 0.0);
    }

    #[test]
    fn cover_fit_of_matching_aspect_is_exact() {
        let fit = cover_fit(640, 480, 320, 240);
        assert!((fit.scale - 0.5).abs() < 1e-9);
        assert_eq!(fit.offset_x, 0.0);
        assert_eq!(fit.offset_y, 0.0);
    }

    #[test]
    fn crop_to_cover_yields_requested_dimensions() {
        let src = RgbaImage::from_pixel(1280, 720, image::Rgba([10, 20, 30, 255]));
        let out = crop_to_cover(&src, 600, 800).unwrap();
        assert_eq!((out.width(), out.height()), (600, 800));
    }

    #[test]
    fn crop_to_cover_rejects_degenerate_sizes() {
        let src = RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
        assert!(crop_to_cover(&src, 0, 10).is_err());
    }

    #[test]
    fn crop_keeps_the_center() {
        // Left half red, right half blue; a centered square crop must keep
        // both halves.
        let mut src = RgbaImage::new(200, 100);
        for (x, _, px) in src.enumerate_pixels_mut() {
            *px = if x < 100 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            };
        }
        let out = crop_to_cover(&src, 100, 100).unwrap();
        let left = out.get_pixel(10, 50);
        let right = out.get_pixel(90, 50);
        assert!(left[0] > left[2], "left side should stay red");
        assert!(right[2] > right[0], "right side should stay blue");
    }

    #[test]
    fn frames_survive_the_jpeg_round_trip() {
        let src = RgbaImage::from_pixel(64, 48, image::Rgba([200, 120, 40, 255]));
        let frame = encode_frame(&src).unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
        // JPEG is lossy; just check we are in the neighbourhood.
        let px = decoded.get_pixel(32, 24);
        assert!((px[0] as i32 - 200).abs() < 16);
        assert!((px[1] as i32 - 120).abs() < 16);
        assert!((px[2] as i32 - 40).abs() < 16);
    }
}
