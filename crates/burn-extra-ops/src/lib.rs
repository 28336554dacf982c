//! Additional operations for the Burn deep learning framework
//!
//! This crate provides slicing operations that are commonly written with NumPy-style
//! indexing in Python code but have no single-call counterpart in Burn:
//!
//! - strided subsampling, `x[:, :, ::s, ::s]`
//! - offset pairs along a dimension, `(x[..., :-k], x[..., k:])`

use burn::prelude::*;

mod slice;

pub use slice::Slice;

/// Additional operations for Burn tensors
pub trait TensorExtraOps<B: Backend, const D: usize>: Sized {
    /// Keep every `stride`-th element along each of `dims`, starting at index 0.
    fn subsample(self, dims: &[usize], stride: usize) -> Self;

    /// Split `dim` into the pair `(x[..-offset], x[offset..])`.
    ///
    /// Returns `None` when the dimension holds `offset` elements or fewer, in which
    /// case both views would be empty.
    fn offset_pair(self, dim: usize, offset: usize) -> Option<(Self, Self)>;
}

impl<B: Backend, const D: usize> TensorExtraOps<B, D> for Tensor<B, D> {
    fn subsample(self, dims: &[usize], stride: usize) -> Self {
        if stride == 1 {
            return self;
        }

        let device = self.device();
        let slice = Slice::full().with_step(stride);

        dims.iter().fold(self, |tensor, &dim| {
            let len = tensor.dims()[dim];
            tensor.select(dim, slice.indices(len, &device))
        })
    }

    fn offset_pair(self, dim: usize, offset: usize) -> Option<(Self, Self)> {
        let len = self.dims()[dim];
        let offset = offset as isize;

        let head = Slice::new(None, Some(-offset)).to_range(len);
        let tail = Slice::new(Some(offset), None).to_range(len);
        if head.is_empty() {
            return None;
        }

        Some((
            self.clone().narrow(dim, head.start, head.len()),
            self.narrow(dim, tail.start, tail.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{Autodiff, NdArray},
        tensor::{ops::FloatElem, Tensor, TensorData, Tolerance},
    };

    type TestBackend = NdArray<f32>;
    type FT = FloatElem<TestBackend>;

    fn grid(size: usize) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        Tensor::<TestBackend, 1, Int>::arange(0..(size * size) as i64, &device)
            .float()
            .reshape([1, 1, size, size])
    }

    #[test]
    fn test_subsample_stride_one_is_identity() {
        let tensor = grid(3);
        let result = tensor.clone().subsample(&[2, 3], 1);

        result
            .into_data()
            .assert_approx_eq::<FT>(&tensor.into_data(), Tolerance::default());
    }

    #[test]
    fn test_subsample_spatial_dims() {
        let result = grid(7).subsample(&[2, 3], 6);

        assert_eq!(result.dims(), [1, 1, 2, 2]);
        let expected = TensorData::from([[[[0.0, 6.0], [42.0, 48.0]]]]);
        result
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn test_subsample_single_dim() {
        let result = grid(4).subsample(&[3], 2);

        assert_eq!(result.dims(), [1, 1, 4, 2]);
        let expected = TensorData::from([[[
            [0.0, 2.0],
            [4.0, 6.0],
            [8.0, 10.0],
            [12.0, 14.0],
        ]]]);
        result
            .into_data()
            .assert_approx_eq::<FT>(&expected, Tolerance::default());
    }

    #[test]
    fn test_offset_pair_rows() {
        let (head, tail) = grid(3).offset_pair(2, 2).expect("three rows allow offset 2");

        assert_eq!(head.dims(), [1, 1, 1, 3]);
        head.into_data().assert_approx_eq::<FT>(
            &TensorData::from([[[[0.0, 1.0, 2.0]]]]),
            Tolerance::default(),
        );
        tail.into_data().assert_approx_eq::<FT>(
            &TensorData::from([[[[6.0, 7.0, 8.0]]]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn test_offset_pair_columns() {
        let (head, tail) = grid(4).offset_pair(3, 2).expect("four columns allow offset 2");

        assert_eq!(head.dims(), [1, 1, 4, 2]);
        let diff = tail - head;
        diff.into_data().assert_approx_eq::<FT>(
            &TensorData::from([[[[2.0, 2.0], [2.0, 2.0], [2.0, 2.0], [2.0, 2.0]]]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn test_offset_pair_too_short_is_none() {
        assert!(grid(2).offset_pair(2, 2).is_none());
        assert!(grid(2).offset_pair(3, 2).is_none());
    }

    #[test]
    fn test_subsample_backward() {
        let device = Default::default();
        let tensor = Tensor::<Autodiff<TestBackend>, 4>::ones([1, 1, 5, 5], &device).require_grad();

        let grads = tensor.clone().subsample(&[2, 3], 2).sum().backward();
        let grad = tensor.grad(&grads).expect("gradient for subsampled tensor");

        // Rows and columns 0, 2, 4 are selected: 9 elements receive a gradient of one.
        let total = grad.sum().into_data();
        total.assert_approx_eq::<FT>(&TensorData::from([9.0]), Tolerance::default());
    }
}
