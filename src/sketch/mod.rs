//! Sketch capture and conversion into classifier input.
//!
//! Pointer events become strokes on a [`Canvas`], strokes are rasterized into a
//! fixed-size grayscale [`Tensor`](crate::tensor::Tensor), and a counting
//! debounce keeps downstream prediction requests at a bounded rate.

mod capture;
mod debounce;
mod pad;
mod raster;

pub use capture::{Canvas, Point, Stroke};
pub use debounce::{DEFAULT_DEBOUNCE_EVERY, EmissionKind, SketchBuffer, SketchEmission};
pub use pad::SketchPad;
pub use raster::{Brush, GridSize, Normalization, Rasterizer};
