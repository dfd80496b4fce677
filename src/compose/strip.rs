use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use lru::LruCache;
use vello_cpu::kurbo::{Affine, BezPath, Rect, RoundedRect, Shape, Stroke};

use crate::compose::layout::{
    Band, CAPTION_FONT_PX, CORNER_RADIUS, PHOTO_RADIUS, StripLayout,
};
use crate::compose::noise;
use crate::compose::text::{CaptionLayoutEngine, TextBrushRgba8};
use crate::ops::{crop, filter};
use crate::types::error::{BoothError, BoothResult};
use crate::types::frame::{Frame, Strip};
use crate::types::session::PHOTOS_PER_STRIP;

// Warm off-white ground with a slightly lighter panel on top.
const GROUND_COLOR: [u8; 4] = [0xFF, 0xF8, 0xF0, 0xFF];
const PANEL_COLOR: [u8; 4] = [0xFF, 0xFC, 0xF7, 0xFF];
const CAPTION_PANEL_COLOR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const CAPTION_TEXT_COLOR: [u8; 4] = [0x11, 0x11, 0x11, 0xFF];
// ~5% black hairline around each photo, inset to read as depth.
const PHOTO_STROKE_ALPHA: u8 = 13;
const PHOTO_STROKE_INSET: f64 = 2.0;
// ~10% black separator at the top of the caption panel.
const SEPARATOR_ALPHA: u8 = 26;
const SEPARATOR_MARGIN: f64 = 5.0;

const GRAIN_BASE_OPACITY: f32 = 0.03;
const GRAIN_FINISH_OPACITY: f32 = 0.01;
const VIGNETTE_INTENSITY: f32 = 0.04;

/// Decoded, filtered photo kept as a ready-to-draw paint. Cached so caption
/// preview keystrokes do not re-decode the same three JPEGs.
#[derive(Clone)]
struct PhotoPaint {
    paint: vello_cpu::Image,
    width: u32,
    height: u32,
}

/// Renders the strip: three filtered photo bands, optional caption band,
/// grain and vignette, exported as PNG.
pub struct StripComposer {
    text_engine: CaptionLayoutEngine,
    photo_cache: LruCache<u64, PhotoPaint>,
}

impl Default for StripComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl StripComposer {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(PHOTOS_PER_STRIP + 1).expect("cache capacity is nonzero");
        Self {
            text_engine: CaptionLayoutEngine::new(),
            photo_cache: LruCache::new(capacity),
        }
    }

    /// Best-effort load of the handwriting caption font; see
    /// [`CaptionLayoutEngine::load_font_file`].
    pub fn load_caption_font(&mut self, path: &Path) -> bool {
        self.text_engine.load_font_file(path)
    }

    /// Composite exactly three frames (and an optional caption) into the
    /// final strip. `seed` drives the grain texture and is the only
    /// non-deterministic input; a fixed seed reproduces the image exactly.
    pub fn compose(&mut self, frames: &[Frame], caption: &str, seed: u64) -> BoothResult<Strip> {
        if frames.len() != PHOTOS_PER_STRIP {
            return Err(BoothError::compose(format!(
                "strip needs exactly {PHOTOS_PER_STRIP} frames, got {}",
                frames.len()
            )));
        }

        let layout = StripLayout::new(!caption.is_empty());
        let width = layout.width();
        let height = layout.height();
        let (w16, h16) = surface_dims(width, height)?;
        let mut ctx = vello_cpu::RenderContext::new(w16, h16);

        self.draw_background(&mut ctx, &layout, seed)?;

        // Photos are decoded and drawn strictly in sequence order; band
        // position and cache state depend on the index.
        for (index, frame) in frames.iter().enumerate() {
            let photo = self.photo_paint(frame)?;
            draw_photo_band(&mut ctx, layout.photo_band(index), &photo);
        }

        // The caption goes on only after all three bands are down.
        if let Some(band) = layout.caption_band() {
            self.draw_caption(&mut ctx, band, caption, layout.caption_max_width())?;
        }

        draw_overlay(
            &mut ctx,
            noise::vignette_overlay(width, height, VIGNETTE_INTENSITY),
            width,
            height,
        )?;
        draw_overlay(
            &mut ctx,
            noise::grain_overlay(finish_seed(seed), width, height, GRAIN_FINISH_OPACITY),
            width,
            height,
        )?;

        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        encode_png(&pixmap, width, height)
    }

    fn draw_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        layout: &StripLayout,
        seed: u64,
    ) -> BoothResult<()> {
        let width = layout.width();
        let height = layout.height();

        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(color(GROUND_COLOR));
        ctx.fill_rect(&Rect::new(0.0, 0.0, width as f64, height as f64));

        draw_overlay(
            ctx,
            noise::grain_overlay(seed, width, height, GRAIN_BASE_OPACITY),
            width,
            height,
        )?;

        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(color(PANEL_COLOR));
        ctx.fill_path(&rounded_rect_path(
            0.0,
            0.0,
            width as f64,
            height as f64,
            CORNER_RADIUS,
        ));
        Ok(())
    }

    fn draw_caption(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        band: Band,
        caption: &str,
        max_width: f64,
    ) -> BoothResult<()> {
        ctx.set_transform(Affine::IDENTITY);
        ctx.set_paint(color(CAPTION_PANEL_COLOR));
        ctx.fill_path(&rounded_rect_path(
            band.x,
            band.y,
            band.width,
            band.height,
            PHOTO_RADIUS,
        ));

        ctx.set_paint(color([0, 0, 0, SEPARATOR_ALPHA]));
        ctx.fill_rect(&Rect::new(
            band.x + SEPARATOR_MARGIN,
            band.y + 3.0,
            band.x + band.width - SEPARATOR_MARGIN,
            band.y + 4.0,
        ));

        let brush = TextBrushRgba8 {
            r: CAPTION_TEXT_COLOR[0],
            g: CAPTION_TEXT_COLOR[1],
            b: CAPTION_TEXT_COLOR[2],
            a: CAPTION_TEXT_COLOR[3],
        };
        let text_layout =
            self.text_engine
                .layout_caption(caption, CAPTION_FONT_PX, brush, max_width as f32)?;

        // Center the shaped block in the band, both axes.
        let text_x = band.x + (band.width - max_width) / 2.0;
        let text_y = band.y + (band.height - text_layout.height() as f64) / 2.0;
        ctx.set_transform(Affine::translate((text_x, text_y)));

        for line in text_layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                // The layout resolved its own font (custom or fallback);
                // rewrap its bytes for the rasterizer.
                let resolved = run.run().font();
                let font = vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(resolved.data.data().to_vec()),
                    resolved.index,
                );
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id as u32,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }

    fn photo_paint(&mut self, frame: &Frame) -> BoothResult<PhotoPaint> {
        let key = frame_key(frame);
        if let Some(paint) = self.photo_cache.get(&key) {
            return Ok(paint.clone());
        }
        let mut img = crop::decode_frame(frame)?;
        filter::apply_polaroid(&mut img);
        let paint = PhotoPaint {
            paint: image_paint(&img)?,
            width: img.width(),
            height: img.height(),
        };
        self.photo_cache.put(key, paint.clone());
        Ok(paint)
    }
}

fn draw_photo_band(ctx: &mut vello_cpu::RenderContext, band: Band, photo: &PhotoPaint) {
    let clip = rounded_rect_path(band.x, band.y, band.width, band.height, PHOTO_RADIUS);
    ctx.set_transform(Affine::IDENTITY);
    ctx.push_clip_layer(&clip);

    // Cover placement: fill the band, crop the overflow.
    let fit = crop::cover_fit(
        photo.width,
        photo.height,
        band.width as u32,
        band.height as u32,
    );
    ctx.set_paint_transform(Affine::IDENTITY);
    ctx.set_paint(photo.paint.clone());
    ctx.set_transform(
        Affine::translate((band.x + fit.offset_x, band.y + fit.offset_y))
            * Affine::scale(fit.scale),
    );
    ctx.fill_rect(&Rect::new(0.0, 0.0, photo.width as f64, photo.height as f64));
    ctx.pop_layer();

    // Hairline inner stroke for depth.
    ctx.set_transform(Affine::IDENTITY);
    ctx.set_paint(color([0, 0, 0, PHOTO_STROKE_ALPHA]));
    ctx.set_stroke(Stroke::new(1.0));
    ctx.stroke_path(&rounded_rect_path(
        band.x + PHOTO_STROKE_INSET,
        band.y + PHOTO_STROKE_INSET,
        band.width - PHOTO_STROKE_INSET * 2.0,
        band.height - PHOTO_STROKE_INSET * 2.0,
        PHOTO_RADIUS - PHOTO_STROKE_INSET,
    ));
}

fn draw_overlay(
    ctx: &mut vello_cpu::RenderContext,
    premul_bytes: Vec<u8>,
    width: u32,
    height: u32,
) -> BoothResult<()> {
    let paint = premul_image_paint(&premul_bytes, width, height)?;
    ctx.set_transform(Affine::IDENTITY);
    ctx.set_paint_transform(Affine::IDENTITY);
    ctx.set_paint(paint);
    ctx.fill_rect(&Rect::new(0.0, 0.0, width as f64, height as f64));
    Ok(())
}

fn color([r, g, b, a]: [u8; 4]) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(r, g, b, a)
}

fn rounded_rect_path(x: f64, y: f64, w: f64, h: f64, radius: f64) -> BezPath {
    let rr = RoundedRect::new(x, y, x + w, y + h, radius.max(0.0));
    let mut path = BezPath::new();
    for el in rr.path_elements(0.1) {
        path.push(el);
    }
    path
}

fn surface_dims(width: u32, height: u32) -> BoothResult<(u16, u16)> {
    let w = width
        .try_into()
        .map_err(|_| BoothError::compose("strip width exceeds u16"))?;
    let h = height
        .try_into()
        .map_err(|_| BoothError::compose("strip height exceeds u16"))?;
    Ok((w, h))
}

fn image_paint(img: &RgbaImage) -> BoothResult<vello_cpu::Image> {
    let mut bytes = img.as_raw().clone();
    premultiply_rgba8_in_place(&mut bytes);
    premul_image_paint(&bytes, img.width(), img.height())
}

fn premul_image_paint(bytes: &[u8], width: u32, height: u32) -> BoothResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> BoothResult<vello_cpu::Pixmap> {
    let (w, h) = surface_dims(width, height)?;
    if bytes.len() != (width as usize) * (height as usize) * 4 {
        return Err(BoothError::compose("pixmap byte length mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 || a == 0 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

fn encode_png(pixmap: &vello_cpu::Pixmap, width: u32, height: u32) -> BoothResult<Strip> {
    let mut bytes = pixmap.data_as_u8_slice().to_vec();
    unpremultiply_rgba8_in_place(&mut bytes);
    let img = RgbaImage::from_raw(width, height, bytes)
        .ok_or_else(|| BoothError::compose("rendered surface size mismatch"))?;
    let mut png = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| BoothError::compose(format!("png encode failed: {e}")))?;
    Ok(Strip::new(png, width, height))
}

fn frame_key(frame: &Frame) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    frame.jpeg.hash(&mut hasher);
    frame.width.hash(&mut hasher);
    frame.height.hash(&mut hasher);
    hasher.finish()
}

fn finish_seed(seed: u64) -> u64 {
    seed.rotate_left(17) ^ 0x9E37_79B9_7F4A_7C15
}
