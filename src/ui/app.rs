use std::path::Path;
use std::time::{Duration, Instant};

use eframe::egui;

use crate::capture::source::CaptureSource;
use crate::capture::webcam::WebcamSource;
use crate::compose::strip::StripComposer;
use crate::ops::save;
use crate::types::phase::BoothPhase;
use crate::types::session::{BoothCommand, BoothSession, MAX_CAPTION_CHARS};
use crate::ui::preview::{PreviewOverlay, PreviewPane};

/// Handwriting font for captions; purely best-effort, see the compositor's
/// cursive fallback.
const CAPTION_FONT_PATH: &str = "assets/fonts/Virgil.ttf";

const STRIP_DISPLAY_HEIGHT: f32 = 520.0;

pub struct BoothApp {
    session: BoothSession,
    camera: Option<WebcamSource>,
    composer: StripComposer,
    preview: PreviewPane,
    caption_input: String,
    caption_focus_pending: bool,
    save_notice: Option<String>,
    strip_rev: u64,
}

impl Default for BoothApp {
    fn default() -> Self {
        Self::new()
    }
}

impl BoothApp {
    pub fn new() -> Self {
        let mut composer = StripComposer::new();
        composer.load_caption_font(Path::new(CAPTION_FONT_PATH));
        Self {
            session: BoothSession::new(),
            camera: None,
            composer,
            preview: PreviewPane::new(),
            caption_input: String::new(),
            caption_focus_pending: false,
            save_notice: None,
            strip_rev: 0,
        }
    }

    /// Open, poll, or release the camera to match the current phase. The
    /// pipeline is the one shared hardware resource: it only runs while the
    /// preview is on screen.
    fn drive_camera(&mut self, ctx: &egui::Context) {
        if !self.session.phase().shows_preview() {
            if self.camera.take().is_some() {
                self.preview.clear();
            }
            return;
        }

        if self.camera.is_none() {
            match WebcamSource::open() {
                Ok(cam) => self.camera = Some(cam),
                Err(e) => {
                    self.session.camera_failed(e.to_string());
                    return;
                }
            }
        }

        let Some(cam) = self.camera.as_mut() else {
            return;
        };
        if let Some(err) = cam.take_error() {
            self.session.camera_failed(err);
            self.camera = None;
            self.preview.clear();
            return;
        }
        if let Some(frame) = cam.poll_frame() {
            self.preview.update_texture(ctx, frame);
            self.session.camera_ready();
        }
    }

    /// Run one session command plus whatever it chains into.
    fn run_commands(&mut self, first: BoothCommand, now: Instant) {
        let mut next = Some(first);
        while let Some(cmd) = next.take() {
            next = self.run_command(cmd, now);
        }
    }

    fn run_command(&mut self, cmd: BoothCommand, now: Instant) -> Option<BoothCommand> {
        match cmd {
            BoothCommand::CaptureFrame => {
                let container = self.preview.container();
                let result = match self.camera.as_mut() {
                    Some(cam) => cam.snapshot(container),
                    None => Err(crate::types::error::BoothError::capture(
                        "camera is not running",
                    )),
                };
                match result {
                    Ok(frame) => self.session.capture_succeeded(frame, now),
                    Err(e) => {
                        self.session.capture_failed(e.to_string());
                        None
                    }
                }
            }
            BoothCommand::ComposeStrip { caption } => {
                match self
                    .composer
                    .compose(self.session.frames(), &caption, rand::random())
                {
                    Ok(strip) => {
                        self.session.strip_ready(strip);
                        self.bump_strip_rev();
                    }
                    Err(e) => self.session.compose_failed(e.to_string()),
                }
                None
            }
            BoothCommand::RenderPreview { caption } => {
                // An empty caption still previews: it shows the uncaptioned
                // strip the user would get.
                match self
                    .composer
                    .compose(self.session.frames(), &caption, rand::random())
                {
                    Ok(strip) => {
                        self.session.preview_ready(strip);
                        self.bump_strip_rev();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "caption preview failed");
                    }
                }
                None
            }
        }
    }

    fn bump_strip_rev(&mut self) {
        self.strip_rev = self.strip_rev.wrapping_add(1);
    }

    fn strip_image(&self, png: &[u8]) -> egui::Image<'static> {
        let uri = format!("bytes://strip-{}.png", self.strip_rev);
        egui::Image::from_bytes(uri, png.to_vec())
            .max_size(egui::vec2(f32::INFINITY, STRIP_DISPLAY_HEIGHT))
    }

    fn show_permission_denied(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading(egui::RichText::new("Camera Access Denied").color(egui::Color32::LIGHT_RED));
            ui.add_space(8.0);
            ui.label(
                self.session
                    .last_error()
                    .unwrap_or("Please allow camera access to use the photo booth.")
                    .to_string(),
            );
            ui.add_space(12.0);
            if ui.button("Try Again").clicked() {
                self.session.retry_camera();
            }
        });
    }

    fn show_capture(&mut self, ui: &mut egui::Ui, now: Instant) {
        let phase = self.session.phase();
        let overlay = match phase {
            BoothPhase::RequestingPermission => PreviewOverlay::Requesting {
                error: self.session.last_error().map(str::to_string),
            },
            BoothPhase::Countdown => PreviewOverlay::Countdown {
                value: self.session.countdown(),
                photo_index: self.session.photo_index(),
            },
            BoothPhase::TakingPhoto => PreviewOverlay::Capturing,
            _ => PreviewOverlay::None,
        };

        ui.vertical_centered(|ui| {
            self.preview
                .show(ui, overlay, self.session.flash_active(now));
            ui.add_space(12.0);

            let shutter = ui.add_enabled(
                phase == BoothPhase::Ready,
                egui::Button::new("📷  Take Photos").min_size(egui::vec2(160.0, 36.0)),
            );
            if shutter.clicked() {
                self.session.start_capture(now);
            }

            ui.add_space(6.0);
            let status = match phase {
                BoothPhase::Ready => "Press the button to take 3 photos for your strip".to_string(),
                BoothPhase::Countdown => format!(
                    "Get ready for photo {} of 3...",
                    self.session.photo_index() + 1
                ),
                BoothPhase::TakingPhoto => "Capturing...".to_string(),
                _ => String::new(),
            };
            ui.label(status);

            if phase == BoothPhase::Ready {
                if let Some(err) = self.session.last_error() {
                    ui.colored_label(egui::Color32::LIGHT_RED, err.to_string());
                }
            }
        });
    }

    fn show_processing(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.heading("Creating your photo strip...");
            ui.add_space(16.0);
            ui.add(egui::Spinner::new().size(40.0));
            ui.add_space(16.0);
            ui.label("Almost there!");
        });
    }

    fn show_complete(&mut self, ui: &mut egui::Ui) {
        let Some(strip) = self.session.strip() else {
            return;
        };
        let image = self.strip_image(&strip.png);

        ui.vertical_centered(|ui| {
            ui.heading("Your Photo Strip");
            ui.add_space(8.0);
            ui.add(image);
            ui.add_space(12.0);

            if self.session.caption().is_empty() && ui.button("✏  Add Caption").clicked() {
                self.caption_input = self.session.caption().to_string();
                self.caption_focus_pending = true;
                if let Some(cmd) = self.session.begin_caption() {
                    self.run_commands(cmd, Instant::now());
                }
            }

            if ui.button("⬇  Download Photo Strip").clicked() {
                self.save_strip();
            }

            if ui.button("📷  Take New Photos").clicked() {
                self.session.reset();
                self.save_notice = None;
            }

            if let Some(notice) = &self.save_notice {
                ui.add_space(8.0);
                ui.label(notice.clone());
            }
        });
    }

    fn save_strip(&mut self) {
        let Some(strip) = self.session.strip() else {
            return;
        };
        match save::save_with_dialog(strip) {
            Ok(Some(path)) => {
                self.save_notice = Some(format!("Saved to {}", path.display()));
            }
            Ok(None) => {}
            Err(e) => {
                // Dialog or write failed; fall back to the working directory
                // so the strip is never lost.
                match save::save_to_dir(strip, Path::new(".")) {
                    Ok(path) => {
                        self.save_notice =
                            Some(format!("Save dialog failed; saved to {}", path.display()));
                    }
                    Err(fallback) => {
                        self.save_notice = Some(format!("Save failed: {e} ({fallback})"));
                    }
                }
            }
        }
    }

    fn show_caption_editor(&mut self, ui: &mut egui::Ui) {
        let preview_png = self
            .session
            .preview_strip()
            .or(self.session.strip())
            .map(|s| s.png.clone());

        ui.vertical_centered(|ui| {
            ui.heading("Add a Caption");
            ui.add_space(8.0);
            if let Some(png) = preview_png {
                let image = self.strip_image(&png);
                ui.add(image);
            }
            ui.add_space(10.0);

            ui.label("Write a caption for your photo strip:");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.caption_input)
                    .hint_text("Your caption here...")
                    .char_limit(MAX_CAPTION_CHARS)
                    .desired_width(260.0),
            );
            if self.caption_focus_pending {
                edit.request_focus();
                self.caption_focus_pending = false;
            }
            if edit.changed() {
                match self.session.edit_caption(&self.caption_input.clone()) {
                    Some(cmd) => self.run_commands(cmd, Instant::now()),
                    None => {
                        // Rejected edit (over the limit): snap back.
                        if self.caption_input != self.session.caption() {
                            self.caption_input = self.session.caption().to_string();
                        }
                    }
                }
            }
            ui.label(format!(
                "{}/{} characters",
                self.caption_input.chars().count(),
                MAX_CAPTION_CHARS
            ));

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.add_space(ui.available_width() / 2.0 - 90.0);
                if ui.button("Cancel").clicked() {
                    self.session.cancel_caption();
                    self.caption_input = self.session.caption().to_string();
                }
                if ui.button("✔  Save Caption").clicked() {
                    if let Some(cmd) = self.session.save_caption() {
                        self.run_commands(cmd, Instant::now());
                    }
                }
            });
        });
    }
}

impl eframe::App for BoothApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        // Strip URIs are versioned; drop the previous version from egui's
        // image cache so caption previews don't pile up.
        ctx.forget_image(&format!("bytes://strip-{}.png", self.strip_rev.wrapping_sub(1)));

        self.drive_camera(ctx);
        if let Some(cmd) = self.session.tick(now) {
            self.run_commands(cmd, now);
        }

        egui::CentralPanel::default().show(ctx, |ui| match self.session.phase() {
            BoothPhase::PermissionDenied => self.show_permission_denied(ui),
            BoothPhase::RequestingPermission
            | BoothPhase::Ready
            | BoothPhase::Countdown
            | BoothPhase::TakingPhoto => self.show_capture(ui, now),
            BoothPhase::Processing => self.show_processing(ui),
            BoothPhase::Complete => self.show_complete(ui),
            BoothPhase::AddingCaption => self.show_caption_editor(ui),
        });

        // Keep the preview and timers moving without a busy loop.
        if self.session.phase().shows_preview() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else if let Some(deadline) = self.session.next_deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }
}
