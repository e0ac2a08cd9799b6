use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use super::capture::{Canvas, Point};
use crate::tensor::{Tensor, TensorShape};

/// Step between brush stamps along a segment, in grid cells.
const STAMP_SPACING: f32 = 0.25;

/// Output resolution of the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u32,
    pub columns: u32,
}

impl GridSize {
    pub const fn new(rows: u32, columns: u32) -> Self {
        Self { rows, columns }
    }

    /// Tensor shape produced for this grid (`rows x columns x 1`).
    pub const fn tensor_shape(&self) -> TensorShape {
        TensorShape::grayscale(self.rows as usize, self.columns as usize)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(28, 28)
    }
}

/// How 8-bit intensities map to tensor values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// `v / 255`, background stays at `0.0`.
    #[default]
    Unit,
    /// `(v - 127.5) / 127.5`, range `[-1, 1]`.
    ZeroCentered,
}

impl Normalization {
    fn apply(self, value: u8) -> f32 {
        let value = value as f32;
        match self {
            Normalization::Unit => value / 255.0,
            Normalization::ZeroCentered => (value - 127.5) / 127.5,
        }
    }
}

/// Round brush used to stamp strokes onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    /// Radius in grid cells.
    pub radius: f32,
    /// Gaussian falloff instead of a hard edge.
    pub soft: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            radius: 0.5,
            soft: false,
        }
    }
}

/// Renders canvas strokes into a grayscale bitmap and a normalized tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rasterizer {
    pub brush: Brush,
    pub normalization: Normalization,
}

impl Rasterizer {
    pub fn new(brush: Brush, normalization: Normalization) -> Self {
        Self {
            brush,
            normalization,
        }
    }

    /// Rasterize `canvas` into a `target.rows x target.columns x 1` tensor.
    ///
    /// A canvas without strokes yields all zeros regardless of normalization.
    pub fn rasterize(&self, canvas: &Canvas, target: GridSize) -> Tensor {
        let shape = target.tensor_shape();
        if canvas.is_empty() || shape.is_empty() {
            return Tensor::zeros(shape);
        }
        let bitmap = self.render_bitmap(canvas, target);
        let data = bitmap
            .pixels()
            .map(|Luma([value])| self.normalization.apply(*value))
            .collect();
        Tensor::from_vec(shape, data).unwrap_or_else(|_| Tensor::zeros(shape))
    }

    /// Render strokes into an 8-bit bitmap; foreground is stroke coverage.
    pub fn render_bitmap(&self, canvas: &Canvas, target: GridSize) -> GrayImage {
        let mut bitmap = GrayImage::new(target.columns, target.rows);
        if target.rows == 0 || target.columns == 0 {
            return bitmap;
        }
        let scale_x = target.columns as f32 / canvas.width();
        let scale_y = target.rows as f32 / canvas.height();
        let to_grid = |p: &Point| (p.x * scale_x, p.y * scale_y);

        for stroke in canvas.strokes() {
            let points = stroke.points();
            match points {
                [] => {}
                [only] => {
                    let (x, y) = to_grid(only);
                    self.stamp(&mut bitmap, x, y);
                }
                _ => {
                    for pair in points.windows(2) {
                        let (x0, y0) = to_grid(&pair[0]);
                        let (x1, y1) = to_grid(&pair[1]);
                        self.stamp_segment(&mut bitmap, (x0, y0), (x1, y1));
                    }
                }
            }
        }
        bitmap
    }

    fn stamp_segment(&self, bitmap: &mut GrayImage, from: (f32, f32), to: (f32, f32)) {
        let dx = to.0 - from.0;
        let dy = to.1 - from.1;
        let length = (dx * dx + dy * dy).sqrt();
        let steps = ((length / STAMP_SPACING).ceil() as u32).max(1);
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(bitmap, from.0 + dx * t, from.1 + dy * t);
        }
    }

    fn stamp(&self, bitmap: &mut GrayImage, x: f32, y: f32) {
        let (width, height) = bitmap.dimensions();
        let radius = self.brush.radius.max(0.0);
        let sigma = (radius / 2.0).max(0.25);

        // The cell under the brush center is always covered.
        let cx = (x.floor().max(0.0) as u32).min(width - 1);
        let cy = (y.floor().max(0.0) as u32).min(height - 1);
        put_max(bitmap, cx, cy, u8::MAX);

        let reach = radius.ceil() as i64 + 1;
        for py in (cy as i64 - reach)..=(cy as i64 + reach) {
            for px in (cx as i64 - reach)..=(cx as i64 + reach) {
                if px < 0 || py < 0 || px >= width as i64 || py >= height as i64 {
                    continue;
                }
                let dist_x = px as f32 + 0.5 - x;
                let dist_y = py as f32 + 0.5 - y;
                let dist = (dist_x * dist_x + dist_y * dist_y).sqrt();
                if dist > radius {
                    continue;
                }
                let intensity = if self.brush.soft {
                    let falloff = (-(dist * dist) / (2.0 * sigma * sigma)).exp();
                    (falloff * 255.0).round() as u8
                } else {
                    u8::MAX
                };
                put_max(bitmap, px as u32, py as u32, intensity);
            }
        }
    }
}

fn put_max(bitmap: &mut GrayImage, x: u32, y: u32, value: u8) {
    let pixel = bitmap.get_pixel_mut(x, y);
    pixel.0[0] = pixel.0[0].max(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(canvas: &mut Canvas, points: &[(f32, f32)]) {
        let mut iter = points.iter();
        if let Some(&(x, y)) = iter.next() {
            canvas.begin(Point::new(x, y));
        }
        for &(x, y) in iter {
            canvas.extend(Point::new(x, y));
        }
        canvas.end();
    }

    #[test]
    fn empty_canvas_is_all_zero_even_when_zero_centered() {
        let canvas = Canvas::new(224.0, 224.0);
        let rasterizer = Rasterizer::new(Brush::default(), Normalization::ZeroCentered);
        let tensor = rasterizer.rasterize(&canvas, GridSize::default());
        assert_eq!(tensor.shape(), TensorShape::grayscale(28, 28));
        assert!(!tensor.has_signal());
    }

    #[test]
    fn horizontal_line_covers_its_row() {
        let mut canvas = Canvas::new(80.0, 80.0);
        draw(&mut canvas, &[(4.0, 44.0), (76.0, 44.0)]);
        let tensor = Rasterizer::default().rasterize(&canvas, GridSize::new(10, 10));
        for column in 0..10 {
            assert_eq!(tensor.get(5, column, 0), Some(1.0), "column {column}");
        }
        assert_eq!(tensor.get(0, 0, 0), Some(0.0));
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn single_tap_marks_the_cell_under_it() {
        let mut canvas = Canvas::new(28.0, 28.0);
        draw(&mut canvas, &[(3.0, 7.0)]);
        let tensor = Rasterizer::default().rasterize(&canvas, GridSize::default());
        assert_eq!(tensor.get(7, 3, 0), Some(1.0));
    }

    #[test]
    fn point_on_far_edge_stays_in_bounds() {
        let mut canvas = Canvas::new(28.0, 28.0);
        draw(&mut canvas, &[(28.0, 28.0)]);
        let tensor = Rasterizer::default().rasterize(&canvas, GridSize::default());
        assert_eq!(tensor.get(27, 27, 0), Some(1.0));
    }

    #[test]
    fn soft_brush_fades_away_from_center() {
        let mut canvas = Canvas::new(28.0, 28.0);
        draw(&mut canvas, &[(14.5, 14.5)]);
        let rasterizer = Rasterizer::new(
            Brush {
                radius: 2.0,
                soft: true,
            },
            Normalization::Unit,
        );
        let tensor = rasterizer.rasterize(&canvas, GridSize::default());
        let center = tensor.get(14, 14, 0).unwrap();
        let near = tensor.get(14, 15, 0).unwrap();
        let outside = tensor.get(14, 17, 0).unwrap();
        assert_eq!(center, 1.0);
        assert!(near > 0.0 && near < center);
        assert_eq!(outside, 0.0);
    }
}
