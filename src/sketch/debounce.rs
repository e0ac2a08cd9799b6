use crate::tensor::Tensor;

/// Default number of raw updates coalesced into one emission.
pub const DEFAULT_DEBOUNCE_EVERY: usize = 20;

/// Why a tensor left the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionKind {
    /// The Nth intermediate update since the last emission.
    Coalesced,
    /// The drawing gesture ended.
    StrokeEnded,
    /// The sketch was submitted.
    Submitted,
    /// The sketch was cleared.
    Cleared,
}

/// Tensor released by [`SketchBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub struct SketchEmission {
    pub kind: EmissionKind,
    pub tensor: Tensor,
}

/// Counting debounce between canvas mutations and downstream consumers.
///
/// Every `every`-th call to [`observe`](Self::observe) emits; flushes, submits
/// and clears emit immediately. The counter resets to zero on every emission
/// and on clear. The tensor is only produced when an emission fires, so the
/// caller passes a closure instead of a rasterized tensor.
#[derive(Debug, Clone)]
pub struct SketchBuffer {
    every: usize,
    pending: usize,
}

impl Default for SketchBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_EVERY)
    }
}

impl SketchBuffer {
    /// `every` is clamped to at least 1.
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            pending: 0,
        }
    }

    pub fn every(&self) -> usize {
        self.every
    }

    /// Raw updates seen since the last emission.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Record one intermediate update; emits on every Nth call.
    pub fn observe(&mut self, render: impl FnOnce() -> Tensor) -> Option<SketchEmission> {
        self.pending += 1;
        if self.pending < self.every {
            return None;
        }
        Some(self.emit(EmissionKind::Coalesced, render()))
    }

    /// Emit immediately because the gesture ended.
    pub fn flush(&mut self, render: impl FnOnce() -> Tensor) -> SketchEmission {
        self.emit(EmissionKind::StrokeEnded, render())
    }

    /// Emit immediately for a submitted sketch.
    pub fn submit(&mut self, tensor: Tensor) -> SketchEmission {
        self.emit(EmissionKind::Submitted, tensor)
    }

    /// Emit immediately for a cleared sketch.
    pub fn clear(&mut self, blank: Tensor) -> SketchEmission {
        self.emit(EmissionKind::Cleared, blank)
    }

    fn emit(&mut self, kind: EmissionKind, tensor: Tensor) -> SketchEmission {
        self.pending = 0;
        SketchEmission { kind, tensor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::TensorShape;

    fn blank() -> Tensor {
        Tensor::zeros(TensorShape::grayscale(2, 2))
    }

    fn count_emissions(every: usize, observed: usize) -> usize {
        let mut buffer = SketchBuffer::new(every);
        (0..observed)
            .filter_map(|_| buffer.observe(blank))
            .count()
    }

    #[test]
    fn emits_once_per_n_updates() {
        for every in [1, 20, 100] {
            assert_eq!(count_emissions(every, every), 1, "N={every}");
            assert_eq!(count_emissions(every, every * 3), 3, "N={every}");
            assert_eq!(count_emissions(every, every * 3 + every - 1), 3, "N={every}");
        }
    }

    #[test]
    fn submit_fires_once_and_resets_counter() {
        for every in [1, 20, 100] {
            let mut buffer = SketchBuffer::new(every);
            let mut emitted = 0;
            for _ in 0..every - 1 {
                emitted += buffer.observe(blank).map_or(0, |_| 1);
            }
            assert_eq!(emitted, 0);
            let submitted = buffer.submit(blank());
            assert_eq!(submitted.kind, EmissionKind::Submitted);
            assert_eq!(buffer.pending(), 0);
            for _ in 0..every - 1 {
                assert!(buffer.observe(blank).is_none());
            }
            assert!(buffer.observe(blank).is_some());
        }
    }

    #[test]
    fn clear_resets_counter() {
        let mut buffer = SketchBuffer::new(3);
        buffer.observe(blank);
        buffer.observe(blank);
        let cleared = buffer.clear(blank());
        assert_eq!(cleared.kind, EmissionKind::Cleared);
        assert!(buffer.observe(blank).is_none());
        assert!(buffer.observe(blank).is_none());
        assert_eq!(
            buffer.observe(blank).map(|emission| emission.kind),
            Some(EmissionKind::Coalesced)
        );
    }

    #[test]
    fn render_runs_only_on_emission() {
        let mut buffer = SketchBuffer::new(4);
        let mut renders = 0;
        for _ in 0..8 {
            buffer.observe(|| {
                renders += 1;
                blank()
            });
        }
        assert_eq!(renders, 2);
    }

    #[test]
    fn zero_factor_is_clamped_to_one() {
        assert_eq!(SketchBuffer::new(0).every(), 1);
        assert_eq!(count_emissions(0, 5), 5);
    }
}
