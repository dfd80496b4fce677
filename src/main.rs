mod capture;
mod compose;
mod ops;
mod types;
mod ui;

use gstreamer as gst;

use crate::ui::app::BoothApp;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();
    if let Err(e) = gst::init() {
        tracing::error!(error = %e, "gstreamer init failed; camera will be unavailable");
    }

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([520.0, 780.0])
            .with_title("RetroSnaps"),
        ..Default::default()
    };
    eframe::run_native(
        "RetroSnaps",
        native_options,
        Box::new(|cc| {
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(BoothApp::new()))
        }),
    )?;
    Ok(())
}
