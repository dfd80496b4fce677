use eframe::egui;

use crate::capture::source::CameraFrame;

/// Aspect of the visible preview window, width : height.
const PREVIEW_ASPECT: f32 = 3.0 / 4.0;
const MAX_PREVIEW_WIDTH: f32 = 420.0;
const POLAROID_BORDER: f32 = 14.0;

/// What to paint over the live feed this frame.
pub enum PreviewOverlay {
    None,
    Requesting { error: Option<String> },
    Countdown { value: u8, photo_index: usize },
    Capturing,
}

/// The live camera pane: uploads frames as an egui texture and draws the
/// polaroid-style window with countdown and flash overlays.
pub struct PreviewPane {
    texture: Option<egui::TextureHandle>,
    container: (u32, u32),
}

impl Default for PreviewPane {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewPane {
    pub fn new() -> Self {
        Self {
            texture: None,
            container: (
                MAX_PREVIEW_WIDTH as u32,
                (MAX_PREVIEW_WIDTH / PREVIEW_ASPECT) as u32,
            ),
        }
    }

    /// Pixel size of the visible preview region. Snapshots are cropped to
    /// exactly this, so the strip shows what the user saw.
    pub fn container(&self) -> (u32, u32) {
        self.container
    }

    /// Upload the newest camera frame.
    pub fn update_texture(&mut self, ctx: &egui::Context, frame: &CameraFrame) {
        let img = egui::ColorImage::from_rgba_unmultiplied(
            [frame.width as usize, frame.height as usize],
            &frame.data,
        );
        self.texture = Some(ctx.load_texture("live_preview", img, egui::TextureOptions::default()));
    }

    pub fn clear(&mut self) {
        self.texture = None;
    }

    /// Draw the preview window and overlays.
    pub fn show(&mut self, ui: &mut egui::Ui, overlay: PreviewOverlay, flash: bool) {
        let width = ui.available_width().min(MAX_PREVIEW_WIDTH);
        let size = egui::vec2(width, width / PREVIEW_ASPECT);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());
        self.container = (rect.width() as u32, rect.height() as u32);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 8.0, egui::Color32::BLACK);

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                cover_uv(texture.size_vec2(), rect.size()),
                egui::Color32::WHITE,
            );
        }

        match overlay {
            PreviewOverlay::None => {}
            PreviewOverlay::Requesting { error } => {
                painter.rect_filled(rect, 8.0, egui::Color32::from_black_alpha(220));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Requesting camera access...",
                    egui::FontId::proportional(16.0),
                    egui::Color32::WHITE,
                );
                if let Some(error) = error {
                    painter.text(
                        rect.center() + egui::vec2(0.0, 28.0),
                        egui::Align2::CENTER_CENTER,
                        error,
                        egui::FontId::proportional(12.0),
                        egui::Color32::LIGHT_RED,
                    );
                }
            }
            PreviewOverlay::Countdown { value, photo_index } => {
                painter.rect_filled(rect, 8.0, egui::Color32::from_black_alpha(100));
                let center = rect.center();
                painter.circle_filled(center, 64.0, egui::Color32::from_black_alpha(180));
                painter.text(
                    center - egui::vec2(0.0, 8.0),
                    egui::Align2::CENTER_CENTER,
                    value.to_string(),
                    egui::FontId::proportional(56.0),
                    egui::Color32::WHITE,
                );
                painter.text(
                    center + egui::vec2(0.0, 34.0),
                    egui::Align2::CENTER_CENTER,
                    format!("Photo {} of 3", photo_index + 1),
                    egui::FontId::proportional(13.0),
                    egui::Color32::WHITE,
                );
            }
            PreviewOverlay::Capturing => {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Capturing...",
                    egui::FontId::proportional(18.0),
                    egui::Color32::WHITE,
                );
            }
        }

        if flash {
            painter.rect_filled(rect, 8.0, egui::Color32::WHITE);
        }

        // Polaroid-style white frame on top of everything.
        painter.rect_stroke(
            rect,
            8.0,
            egui::Stroke::new(POLAROID_BORDER, egui::Color32::WHITE),
            egui::StrokeKind::Inside,
        );
    }
}

/// UV rect that center-crops the texture to cover `target`, mirroring the
/// cover placement the snapshot path uses.
fn cover_uv(texture: egui::Vec2, target: egui::Vec2) -> egui::Rect {
    let tex_aspect = texture.x / texture.y;
    let target_aspect = target.x / target.y;
    if tex_aspect > target_aspect {
        // Texture is wider: crop the sides.
        let visible = target_aspect / tex_aspect;
        let margin = (1.0 - visible) / 2.0;
        egui::Rect::from_min_max(egui::pos2(margin, 0.0), egui::pos2(1.0 - margin, 1.0))
    } else {
        // Texture is taller: crop top and bottom.
        let visible = tex_aspect / target_aspect;
        let margin = (1.0 - visible) / 2.0;
        egui::Rect::from_min_max(egui::pos2(0.0, margin), egui::pos2(1.0, 1.0 - margin))
    }
}
