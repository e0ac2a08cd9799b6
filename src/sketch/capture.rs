use serde::{Deserialize, Serialize};

/// Position in canvas-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Points recorded during one continuous drag gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Logical drawing surface holding completed strokes and at most one active stroke.
///
/// Incoming points are clamped to `[0, width] x [0, height]`; non-finite points
/// are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    width: f32,
    height: f32,
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            strokes: Vec::new(),
            active: None,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Start a new stroke; an unfinished stroke is frozen first.
    pub fn begin(&mut self, point: Point) {
        self.end();
        if let Some(point) = self.clamp(point) {
            self.active = Some(Stroke::from_points(vec![point]));
        }
    }

    /// Append to the active stroke. Returns whether the canvas changed.
    pub fn extend(&mut self, point: Point) -> bool {
        let Some(point) = self.clamp(point) else {
            return false;
        };
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.points.last() == Some(&point) {
            return false;
        }
        active.points.push(point);
        true
    }

    /// Freeze the active stroke into the completed set.
    pub fn end(&mut self) -> bool {
        match self.active.take() {
            Some(stroke) if !stroke.is_empty() => {
                self.strokes.push(stroke);
                true
            }
            _ => false,
        }
    }

    /// Discard every stroke, including the active one.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.as_ref().is_none_or(Stroke::is_empty)
    }

    pub fn completed(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Completed strokes followed by the active one, in drawing order.
    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter().chain(self.active.iter())
    }

    fn clamp(&self, point: Point) -> Option<Point> {
        if !point.is_finite() {
            return None;
        }
        Some(Point::new(
            point.x.clamp(0.0, self.width),
            point.y.clamp(0.0, self.height),
        ))
    }
}
