//! egui front-end: forwards pointer input to the sketch pad and renders status.
//!
//! All lifecycle decisions live in [`ModelLifecycleController`]; this module
//! only maps buttons and emissions onto its operations.

mod canvas;

use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{self, Button, RichText};
use tracing::debug;

use crate::artifacts::ArtifactStore;
use crate::config::AppConfig;
use crate::dataset::GeneratedShapes;
use crate::lifecycle::{
    Action, Capabilities, LifecycleOptions, LifecycleState, ModelLifecycleController, StatusReader,
};
use crate::ml::mlp::{MlpClassifier, TrainOptions};
use crate::sketch::{EmissionKind, SketchEmission, SketchPad};
use canvas::{PointerEvent, raster_preview, sketch_canvas};

/// Minimum window size that fits the canvas and controls.
pub const MIN_VIEWPORT_SIZE: [f32; 2] = [420.0, 420.0];

const BUSY_REPAINT: Duration = Duration::from_millis(50);
const PREVIEW_CELL: f32 = 3.0;

pub struct ShapeSketchApp {
    pad: SketchPad,
    controller: ModelLifecycleController,
    status: StatusReader,
    import_key: String,
}

impl ShapeSketchApp {
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        let store = ArtifactStore::from_settings(&config.model).map_err(|err| err.to_string())?;
        let capabilities = Capabilities {
            dataset: Arc::new(GeneratedShapes::new(config.dataset.clone(), &config.canvas)),
            classifier: Arc::new(MlpClassifier::new(TrainOptions::from(&config.training))),
        };
        let controller =
            ModelLifecycleController::new(capabilities, store, LifecycleOptions::from(config));
        Ok(Self {
            pad: SketchPad::from_settings(&config.canvas, &config.sketch),
            status: controller.reader(),
            controller,
            import_key: config.model.import_key.clone(),
        })
    }

    fn perform(&mut self, action: Action) {
        if let Err(err) = self.controller.perform(action) {
            debug!("Action rejected: {err}");
        }
    }

    fn forward(&mut self, emission: Option<SketchEmission>) {
        let Some(emission) = emission else {
            return;
        };
        match emission.kind {
            EmissionKind::Cleared => self.controller.clear_prediction(),
            EmissionKind::Coalesced | EmissionKind::StrokeEnded | EmissionKind::Submitted => {
                self.perform(Action::Predict(emission.tensor))
            }
        }
    }

    fn render_controls(&mut self, ui: &mut egui::Ui) {
        let status = self.status.snapshot().status;
        ui.horizontal(|ui| {
            if ui.add_enabled(!status.busy, Button::new("Train")).clicked() {
                self.perform(Action::Train);
            }
            if status.state == LifecycleState::Training && ui.button("Stop").clicked() {
                self.controller.stop_training();
            }
            ui.separator();
            ui.add(egui::TextEdit::singleline(&mut self.import_key).desired_width(160.0));
            if ui.add_enabled(!status.busy, Button::new("Import")).clicked() {
                let key = self.import_key.trim().to_string();
                self.perform(Action::ImportModel(key));
            }
            ui.separator();
            if ui.add_enabled(status.ready, Button::new("Submit")).clicked() {
                let emission = self.pad.submit();
                self.forward(Some(emission));
            }
            if ui.button("Clear").clicked() {
                let emission = self.pad.clear();
                self.forward(Some(emission));
            }
        });
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let snapshot = self.status.snapshot();
        ui.heading(if snapshot.text.is_empty() {
            "Draw a shape"
        } else {
            snapshot.text.as_str()
        });
        ui.label(RichText::new(&snapshot.subtext).weak());
        let readiness = match snapshot.status.state {
            LifecycleState::Idle if snapshot.status.ready => "Model ready".to_string(),
            LifecycleState::Idle => "No model loaded".to_string(),
            state => format!("Busy: {state}"),
        };
        ui.label(RichText::new(readiness).small());
    }
}

impl eframe::App for ShapeSketchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.perform(Action::Idle);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.render_controls(ui));
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.render_status(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal_top(|ui| {
                let events = sketch_canvas(ui, self.pad.canvas(), self.pad.grid());
                for event in events {
                    let emission = match event {
                        PointerEvent::Press(point) => self.pad.press(point),
                        PointerEvent::Drag(point) => self.pad.drag(point),
                        PointerEvent::Release => self.pad.release(),
                    };
                    self.forward(emission);
                }
                raster_preview(ui, &self.pad.bitmap(), PREVIEW_CELL);
            });
        });

        if self.status.snapshot().status.busy {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}
