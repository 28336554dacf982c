//! Validity masks for depth targets.

use burn::tensor::{backend::Backend, Bool, Tensor};

/// Offset added before every logarithm so that zero depths stay finite.
pub const LOG_EPS: f64 = 0.001;

/// Float mask that is one where the target holds a usable depth.
///
/// A depth is usable when it is strictly positive and, if `max_depth` is set,
/// no larger than `max_depth`.
pub fn validity_mask<B: Backend, const D: usize>(
    target: &Tensor<B, D>,
    max_depth: Option<f64>,
) -> Tensor<B, D> {
    let positive = target.clone().greater_elem(0.0).float();
    match max_depth {
        Some(max_depth) => positive * target.clone().lower_equal_elem(max_depth).float(),
        None => positive,
    }
}

/// Boolean mask that is true where a float mask is zero.
pub fn invalid_positions<B: Backend, const D: usize>(mask: &Tensor<B, D>) -> Tensor<B, D, Bool> {
    mask.clone().equal_elem(0.0)
}

/// `log(pred + eps) - log(target + eps)`, elementwise.
pub fn log_difference<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
) -> Tensor<B, D> {
    predictions.add_scalar(LOG_EPS).log() - targets.add_scalar(LOG_EPS).log()
}

#[cfg(test)]
mod tests {
    use burn::tensor::{ops::FloatElem, TensorData, Tolerance};

    use super::*;
    use crate::tests::TestBackend;

    type FT = FloatElem<TestBackend>;

    #[test]
    fn validity_mask_excludes_non_positive_depths() {
        let device = Default::default();
        let target =
            Tensor::<TestBackend, 2>::from_floats([[0.0, -1.0], [0.5, 12.0]], &device);

        let mask = validity_mask(&target, None);

        mask.into_data().assert_approx_eq::<FT>(
            &TensorData::from([[0.0, 0.0], [1.0, 1.0]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn validity_mask_applies_max_depth_inclusively() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 10.0], [5.0, 12.0]], &device);

        let mask = validity_mask(&target, Some(10.0));

        mask.into_data().assert_approx_eq::<FT>(
            &TensorData::from([[0.0, 1.0], [1.0, 0.0]]),
            Tolerance::default(),
        );
    }

    #[test]
    fn invalid_positions_inverts_mask() {
        let device = Default::default();
        let mask = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0, 1.0], &device);

        let invalid = invalid_positions(&mask);

        assert_eq!(
            invalid.into_data().to_vec::<bool>().unwrap(),
            vec![false, true, false]
        );
    }

    #[test]
    fn log_difference_is_zero_for_equal_inputs() {
        let device = Default::default();
        let depth = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 80.0], &device);

        let diff = log_difference(depth.clone(), depth);

        diff.into_data()
            .assert_approx_eq::<FT>(&TensorData::from([0.0, 0.0, 0.0]), Tolerance::default());
    }
}
