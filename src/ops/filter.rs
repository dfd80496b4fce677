use image::RgbaImage;

// Analog film look: slight desaturation, a touch more light and contrast,
// and a warm sepia cast. Values match the strip's canonical look.
pub const SATURATION: f32 = 0.8;
pub const BRIGHTNESS: f32 = 1.05;
pub const CONTRAST: f32 = 1.1;
pub const SEPIA: f32 = 0.12;

/// Apply the combined polaroid color filter to a decoded frame, in place.
/// Alpha is untouched.
pub fn apply_polaroid(img: &mut RgbaImage) {
    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut **img);
    for px in pixels {
        *px = filter_pixel(*px);
    }
}

fn filter_pixel([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let mut r = r as f32 / 255.0;
    let mut g = g as f32 / 255.0;
    let mut b = b as f32 / 255.0;

    // Desaturate toward luminance.
    let lum = 0.213 * r + 0.715 * g + 0.072 * b;
    r = lum + (r - lum) * SATURATION;
    g = lum + (g - lum) * SATURATION;
    b = lum + (b - lum) * SATURATION;

    r *= BRIGHTNESS;
    g *= BRIGHTNESS;
    b *= BRIGHTNESS;

    r = (r - 0.5) * CONTRAST + 0.5;
    g = (g - 0.5) * CONTRAST + 0.5;
    b = (b - 0.5) * CONTRAST + 0.5;

    // Partial sepia: blend toward the full sepia matrix.
    let sr = 0.393 * r + 0.769 * g + 0.189 * b;
    let sg = 0.349 * r + 0.686 * g + 0.168 * b;
    let sb = 0.272 * r + 0.534 * g + 0.131 * b;
    r += (sr - r) * SEPIA;
    g += (sg - g) * SEPIA;
    b += (sb - b) * SEPIA;

    [to_u8(r), to_u8(g), to_u8(b), a]
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_is_preserved() {
        let out = filter_pixel([120, 90, 60, 137]);
        assert_eq!(out[3], 137);
    }

    #[test]
    fn mid_gray_gets_a_warm_lift() {
        let [r, g, b, _] = filter_pixel([128, 128, 128, 255]);
        // Sepia warms: red up, blue down.
        assert!(r > g, "expected warm cast, got {r},{g},{b}");
        assert!(g > b, "expected warm cast, got {r},{g},{b}");
        // Brightness and contrast both lift a mid gray.
        assert!(g >= 128);
    }

    #[test]
    fn pure_red_is_desaturated() {
        let [_, g, b, _] = filter_pixel([255, 0, 0, 255]);
        // Some luminance leaks into the other channels.
        assert!(g > 0);
        assert!(b > 0);
    }

    #[test]
    fn extremes_stay_in_range() {
        let white = filter_pixel([255, 255, 255, 255]);
        let black = filter_pixel([0, 0, 0, 255]);
        assert_eq!(white[3], 255);
        assert_eq!(black[3], 255);
        // Contrast pushes black below zero before clamping.
        assert_eq!(black[0], 0);
        assert_eq!(white[0], 255);
    }

    #[test]
    fn filter_applies_to_every_pixel() {
        let mut img = RgbaImage::from_pixel(4, 4, image::Rgba([128, 128, 128, 255]));
        apply_polaroid(&mut img);
        let expected = filter_pixel([128, 128, 128, 255]);
        for px in img.pixels() {
            assert_eq!(px.0, expected);
        }
    }
}
