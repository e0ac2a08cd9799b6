use super::capture::{Canvas, Point};
use super::debounce::{SketchBuffer, SketchEmission};
use super::raster::{GridSize, Rasterizer};
use crate::config::CanvasSettings;
use crate::config::SketchSettings;
use crate::tensor::Tensor;

/// Pointer-facing drawing surface: capture, rasterize and debounce in one place.
///
/// Runs on the interactive thread; nothing here blocks on the model.
#[derive(Debug, Clone)]
pub struct SketchPad {
    canvas: Canvas,
    rasterizer: Rasterizer,
    buffer: SketchBuffer,
    grid: GridSize,
    flush_on_stroke_end: bool,
}

impl SketchPad {
    pub fn new(
        canvas: Canvas,
        rasterizer: Rasterizer,
        buffer: SketchBuffer,
        grid: GridSize,
        flush_on_stroke_end: bool,
    ) -> Self {
        Self {
            canvas,
            rasterizer,
            buffer,
            grid,
            flush_on_stroke_end,
        }
    }

    /// Build a pad whose logical canvas is `grid * pixel_size` points wide.
    pub fn from_settings(canvas: &CanvasSettings, sketch: &SketchSettings) -> Self {
        let grid = canvas.grid();
        let pixel = canvas.pixel_size as f32;
        Self::new(
            Canvas::new(grid.columns as f32 * pixel, grid.rows as f32 * pixel),
            canvas.rasterizer(),
            SketchBuffer::new(sketch.debounce_every),
            grid,
            sketch.flush_on_stroke_end,
        )
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Rasterize the current canvas without touching the debounce counter.
    pub fn snapshot(&self) -> Tensor {
        self.rasterizer.rasterize(&self.canvas, self.grid)
    }

    /// Grayscale preview of what the classifier sees.
    pub fn bitmap(&self) -> image::GrayImage {
        self.rasterizer.render_bitmap(&self.canvas, self.grid)
    }

    /// Pointer went down: start a stroke.
    pub fn press(&mut self, point: Point) -> Option<SketchEmission> {
        self.canvas.begin(point);
        self.observe()
    }

    /// Pointer moved while down.
    pub fn drag(&mut self, point: Point) -> Option<SketchEmission> {
        if !self.canvas.extend(point) {
            return None;
        }
        self.observe()
    }

    /// Pointer released: freeze the stroke and optionally flush.
    pub fn release(&mut self) -> Option<SketchEmission> {
        if !self.canvas.end() || !self.flush_on_stroke_end {
            return None;
        }
        let (canvas, rasterizer, grid) = (&self.canvas, self.rasterizer, self.grid);
        Some(self.buffer.flush(|| rasterizer.rasterize(canvas, grid)))
    }

    /// Rasterize, then clear the canvas; emits immediately.
    pub fn submit(&mut self) -> SketchEmission {
        self.canvas.end();
        let tensor = self.snapshot();
        self.canvas.clear();
        self.buffer.submit(tensor)
    }

    /// Discard all strokes; emits a blank tensor immediately.
    pub fn clear(&mut self) -> SketchEmission {
        self.canvas.clear();
        self.buffer.clear(Tensor::zeros(self.grid.tensor_shape()))
    }

    fn observe(&mut self) -> Option<SketchEmission> {
        let (canvas, rasterizer, grid) = (&self.canvas, self.rasterizer, self.grid);
        self.buffer.observe(|| rasterizer.rasterize(canvas, grid))
    }
}
