use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, StrokeKind, Vec2};
use image::GrayImage;

use crate::sketch::{Canvas, GridSize, Point};

const BACKGROUND: Color32 = Color32::from_gray(18);
const GRID_LINE: Color32 = Color32::from_gray(36);
const INK: Color32 = Color32::from_gray(235);

/// Pointer input translated into canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum PointerEvent {
    Press(Point),
    Drag(Point),
    Release,
}

/// Paint the drawing surface and report this frame's pointer events.
pub(super) fn sketch_canvas(
    ui: &mut egui::Ui,
    canvas: &Canvas,
    grid: GridSize,
) -> Vec<PointerEvent> {
    let size = Vec2::new(canvas.width(), canvas.height());
    let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
    let rect = response.rect;
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let cell = Vec2::new(
        rect.width() / grid.columns.max(1) as f32,
        rect.height() / grid.rows.max(1) as f32,
    );
    let line = Stroke::new(1.0, GRID_LINE);
    for column in 1..grid.columns {
        let x = rect.left() + column as f32 * cell.x;
        painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], line);
    }
    for row in 1..grid.rows {
        let y = rect.top() + row as f32 * cell.y;
        painter.line_segment([Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)], line);
    }

    let ink = Stroke::new(cell.x.min(cell.y).max(2.0), INK);
    let to_screen = |point: &Point| rect.min + Vec2::new(point.x, point.y);
    for stroke in canvas.strokes() {
        match stroke.points() {
            [single] => {
                painter.circle_filled(to_screen(single), ink.width / 2.0, INK);
            }
            points => {
                for pair in points.windows(2) {
                    painter.line_segment([to_screen(&pair[0]), to_screen(&pair[1])], ink);
                }
            }
        }
    }

    let local = |pos: Pos2| Point::new(pos.x - rect.left(), pos.y - rect.top());
    let mut events = Vec::new();
    if response.drag_started() {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(PointerEvent::Press(local(pos)));
        }
    } else if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(PointerEvent::Drag(local(pos)));
        }
    }
    if response.drag_stopped() {
        events.push(PointerEvent::Release);
    } else if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(PointerEvent::Press(local(pos)));
            events.push(PointerEvent::Release);
        }
    }
    events
}

/// Small grayscale preview of the rasterized grid.
pub(super) fn raster_preview(ui: &mut egui::Ui, bitmap: &GrayImage, cell_size: f32) {
    let (width, height) = bitmap.dimensions();
    let size = Vec2::new(width as f32 * cell_size, height as f32 * cell_size);
    let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter();
    painter.rect_filled(rect, 0.0, BACKGROUND);
    for (x, y, pixel) in bitmap.enumerate_pixels() {
        let value = pixel.0[0];
        if value == 0 {
            continue;
        }
        let min = rect.min + Vec2::new(x as f32 * cell_size, y as f32 * cell_size);
        let cell = Rect::from_min_size(min, Vec2::splat(cell_size));
        painter.rect_filled(cell, 0.0, Color32::from_gray(value));
    }
    painter.rect_stroke(rect, 0.0, Stroke::new(1.0, GRID_LINE), StrokeKind::Outside);
}
