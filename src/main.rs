#![deny(missing_docs)]

//! Entry point for the egui-based shape sketch UI.
use eframe::egui;
use shape_sketch::config::{self, AppConfig};
use shape_sketch::egui_app::{MIN_VIEWPORT_SIZE, ShapeSketchApp};
use shape_sketch::logging;
use tracing::warn;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let config = config::load_or_default().unwrap_or_else(|err| {
        warn!("Config unavailable, using defaults: {err}");
        AppConfig::default()
    });

    let viewport = egui::ViewportBuilder::default()
        .with_min_inner_size(MIN_VIEWPORT_SIZE)
        .with_inner_size([560.0, 460.0]);
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Shape Sketch",
        native_options,
        Box::new(move |_cc| match ShapeSketchApp::new(&config) {
            Ok(app) => Ok(Box::new(app)),
            Err(err) => Ok(Box::new(LaunchError { message: err })),
        }),
    )?;
    Ok(())
}

/// Minimal fallback app to display initialization errors.
struct LaunchError {
    message: String,
}

impl eframe::App for LaunchError {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("Failed to start UI");
                ui.label(&self.message);
            });
        });
    }
}
