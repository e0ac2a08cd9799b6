use std::f32::consts::TAU;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::{Dataset, DatasetError, DatasetSource, LabeledExample};
use crate::config::{CanvasSettings, DatasetSettings};
use crate::sketch::{Canvas, GridSize, Point, Rasterizer};

const CIRCLE_SEGMENTS: usize = 32;

/// Shape classes drawn by [`GeneratedShapes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Circle,
    Rectangle,
    Triangle,
    Trapezoid,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::Circle,
        ShapeKind::Rectangle,
        ShapeKind::Triangle,
        ShapeKind::Trapezoid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Circle => "Circle",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Trapezoid => "Trapezoid",
        }
    }

    /// Closed outline in unit coordinates centered on the origin.
    fn outline(self, aspect: f32) -> Vec<(f32, f32)> {
        let mut points = match self {
            ShapeKind::Circle => (0..CIRCLE_SEGMENTS)
                .map(|i| {
                    let angle = TAU * i as f32 / CIRCLE_SEGMENTS as f32;
                    (0.5 * angle.cos(), 0.5 * angle.sin())
                })
                .collect(),
            ShapeKind::Rectangle => {
                let h = 0.5 * aspect;
                vec![(-0.5, -h), (0.5, -h), (0.5, h), (-0.5, h)]
            }
            ShapeKind::Triangle => vec![(0.0, -0.5), (0.5, 0.5), (-0.5, 0.5)],
            ShapeKind::Trapezoid => {
                let h = 0.5 * aspect;
                vec![(-0.25, -h), (0.25, -h), (0.5, h), (-0.5, h)]
            }
        };
        if let Some(&first) = points.first() {
            points.push(first);
        }
        points
    }
}

/// Synthetic dataset of shape outlines rasterized like user sketches.
#[derive(Debug, Clone)]
pub struct GeneratedShapes {
    settings: DatasetSettings,
    grid: GridSize,
    rasterizer: Rasterizer,
    canvas_size: (f32, f32),
}

impl GeneratedShapes {
    pub fn new(settings: DatasetSettings, canvas: &CanvasSettings) -> Self {
        let grid = canvas.grid();
        let pixel = canvas.pixel_size as f32;
        Self {
            settings,
            grid,
            rasterizer: canvas.rasterizer(),
            canvas_size: (grid.columns as f32 * pixel, grid.rows as f32 * pixel),
        }
    }

    /// Draw one shape at `scale` (fraction of the shorter canvas side).
    pub fn draw(&self, kind: ShapeKind, scale: f32, aspect: f32) -> Canvas {
        let (width, height) = self.canvas_size;
        let mut canvas = Canvas::new(width, height);
        let size = scale * width.min(height);
        let (cx, cy) = (width / 2.0, height / 2.0);
        let mut outline = kind.outline(aspect).into_iter();
        if let Some((x, y)) = outline.next() {
            canvas.begin(Point::new(cx + x * size, cy + y * size));
            for (x, y) in outline {
                canvas.extend(Point::new(cx + x * size, cy + y * size));
            }
            canvas.end();
        }
        canvas
    }

    fn sample(
        &self,
        rng: &mut StdRng,
        kind: ShapeKind,
        class_index: usize,
    ) -> Result<LabeledExample, DatasetError> {
        let scale = rng.random_range(self.settings.min_scale..=self.settings.max_scale);
        let aspect = rng.random_range(0.6f32..=1.0);
        let canvas = self.draw(kind, scale, aspect);
        let data = self.rasterizer.rasterize(&canvas, self.grid);
        Ok(LabeledExample::new(data, class_index, ShapeKind::ALL.len())?)
    }

    fn split(&self, rng: &mut StdRng, per_class: usize) -> Result<Vec<LabeledExample>, DatasetError> {
        let mut examples = Vec::with_capacity(per_class * ShapeKind::ALL.len());
        for (class_index, kind) in ShapeKind::ALL.into_iter().enumerate() {
            for _ in 0..per_class {
                examples.push(self.sample(rng, kind, class_index)?);
            }
        }
        Ok(examples)
    }
}

impl DatasetSource for GeneratedShapes {
    fn class_labels(&self) -> Vec<String> {
        ShapeKind::ALL
            .iter()
            .map(|kind| kind.label().to_string())
            .collect()
    }

    fn build(&self) -> Result<Dataset, DatasetError> {
        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        let training = self.split(&mut rng, self.settings.training_per_class)?;
        let validation = self.split(&mut rng, self.settings.validation_per_class)?;
        if training.is_empty() {
            return Err(DatasetError::Empty);
        }
        info!(
            "Generated shape dataset: {} training, {} validation",
            training.len(),
            validation.len()
        );
        Ok(Dataset {
            classes: self.class_labels(),
            training,
            validation,
        })
    }
}
