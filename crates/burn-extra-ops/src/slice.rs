//! # Tensor Slicing Helper
//!
//! Provides a `Slice` struct to facilitate tensor slicing with Python-like semantics,
//! including support for negative indices and a step (`x[start:end:step]`).

use burn::prelude::*;
use core::ops::Range;

/// A helper struct for defining a slice with optional start and end points and a step.
///
/// This struct can be converted into a `Range<usize>` for use with Burn's tensor
/// slicing methods, correctly handling negative indices relative to a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    start: Option<isize>,
    end: Option<isize>,
    step: usize,
}

impl Slice {
    /// Creates a new `Slice` with a step of one.
    pub const fn new(start: Option<isize>, end: Option<isize>) -> Self {
        Self {
            start,
            end,
            step: 1,
        }
    }

    /// The whole dimension, `x[:]`.
    pub const fn full() -> Self {
        Self::new(None, None)
    }

    /// Sets the step of the slice.
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero.
    pub const fn with_step(mut self, step: usize) -> Self {
        assert!(step > 0, "Slice step must be positive");
        self.step = step;
        self
    }

    /// Converts the `Slice` into a `Range<usize>` for a given dimension length.
    ///
    /// Negative indices are interpreted as offsets from the end of the dimension.
    /// The step is not part of the range.
    pub fn to_range(&self, len: usize) -> Range<usize> {
        let len_isize = len as isize;

        let start = match self.start {
            Some(s) if s < 0 => (len_isize + s).max(0),
            Some(s) => s.max(0).min(len_isize),
            None => 0,
        } as usize;

        let end = match self.end {
            Some(e) if e < 0 => (len_isize + e).max(0),
            Some(e) => e.max(0).min(len_isize),
            None => len_isize,
        } as usize;

        start..end.max(start)
    }

    /// Builds the index tensor selected by this slice, suitable for [`Tensor::select`].
    pub fn indices<B: Backend>(&self, len: usize, device: &B::Device) -> Tensor<B, 1, Int> {
        let range = self.to_range(len);
        Tensor::arange_step(range.start as i64..range.end as i64, self.step, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_slice() {
        let slice = Slice::new(Some(-2), Some(-1));
        let range = slice.to_range(5);
        assert_eq!(range, 3..4);
    }

    #[test]
    fn test_empty_slice_when_offset_exceeds_length() {
        let slice = Slice::new(None, Some(-2));
        assert_eq!(slice.to_range(1), 0..0);
    }

    #[test]
    fn test_slice_indices() {
        let device = Default::default();
        let indices = Slice::full().with_step(4).indices::<TestBackend>(9, &device);

        assert_eq!(
            indices.into_data().to_vec::<i64>().unwrap(),
            vec![0, 4, 8]
        );
    }

    #[test]
    #[should_panic = "Slice step must be positive"]
    fn test_zero_step_panics() {
        let _slice = Slice::full().with_step(0);
    }
}
