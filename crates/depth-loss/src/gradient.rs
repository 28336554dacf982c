//! Multi-scale gradient consistency loss.
//!
//! Adapted from MegaDepth. Penalizes differences between the local structure of the
//! predicted and ground-truth depth maps in log space:
//!
//! ```text
//! R        = (log(pred + eps) - log(target + eps)), zero where mask == 0
//! grad_y   = |R[.., r, :] - R[.., r + 2, :]| * mask[r] * mask[r + 2]
//! grad_x   = |R[.., :, c] - R[.., :, c + 2]| * mask[c] * mask[c + 2]
//! Loss     = weight * Σ_scales (Σ grad_x + Σ grad_y) / N
//! ```
//!
//! The scales are the input and three strided subsamples with strides 2, 4 and 6.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    tensor::{backend::Backend, Tensor},
};
use burn_extra_ops::TensorExtraOps;

use crate::mask::{invalid_positions, log_difference, validity_mask};

/// Subsampling strides of the evaluated scales, `x[:, :, ::2*i, ::2*i]` for i in 1..=3.
/// Stride 1 is the input itself; the others step by 2, not a power-of-two pyramid.
pub const GRADIENT_STRIDES: [usize; 4] = [1, 2, 4, 6];

/// Row/column offset of the compared pixel pairs.
const PAIR_OFFSET: usize = 2;

/// Configuration for creating a [gradient loss](GradientLoss).
#[derive(Config, Debug)]
pub struct GradientLossConfig {
    /// Whether to ignore targets that are not strictly positive. Default: true
    #[config(default = true)]
    pub valid_mask: bool,

    /// Weight of the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,

    /// Upper bound for valid targets when masking. Default: None
    pub max_depth: Option<f64>,

    /// Name under which training logs report this loss.
    #[config(default = "String::from(\"loss_grad\")")]
    pub loss_name: String,
}

impl GradientLossConfig {
    /// Initialize [gradient loss](GradientLoss).
    pub fn init(&self) -> GradientLoss {
        self.assertions();
        tracing::debug!(
            loss_name = %self.loss_name,
            valid_mask = self.valid_mask,
            max_depth = ?self.max_depth,
            "gradient loss created"
        );
        GradientLoss {
            valid_mask: self.valid_mask,
            loss_weight: self.loss_weight,
            max_depth: self.max_depth,
            loss_name: self.loss_name.clone(),
        }
    }

    fn assertions(&self) {
        if let Some(max_depth) = self.max_depth {
            assert!(
                max_depth > 0.0,
                "max_depth for GradientLoss must be positive, got {max_depth}"
            );
        }
    }
}

/// Multi-scale gradient consistency loss on log depth.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct GradientLoss {
    /// Whether invalid targets are masked out.
    pub valid_mask: bool,
    /// Weight applied to the summed scales.
    pub loss_weight: f64,
    /// Upper bound for valid targets.
    pub max_depth: Option<f64>,
    /// Name used in training logs.
    pub loss_name: String,
}

impl Default for GradientLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for GradientLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("loss_weight", &self.loss_weight).optional()
    }
}

impl GradientLoss {
    /// Create a new gradient loss with default configuration.
    pub fn new() -> Self {
        GradientLossConfig::new().init()
    }

    /// Compute the loss.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, 1, height, width]` (depth)
    /// - targets: `[batch_size, 1, height, width]` (depth, invalid pixels `<= 0`)
    /// - output: `[1]`
    ///
    /// A scale without any valid pixel divides by zero and yields a non-finite loss.
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        self.assertions(&predictions, &targets);

        let device = predictions.device();
        let total = GRADIENT_STRIDES
            .iter()
            .map(|&stride| {
                self.scale_loss(
                    predictions.clone().subsample(&[2, 3], stride),
                    targets.clone().subsample(&[2, 3], stride),
                )
            })
            .reduce(|acc, scale| acc + scale)
            .unwrap_or_else(|| Tensor::zeros([1], &device));

        total.mul_scalar(self.loss_weight)
    }

    /// `(Σ grad_x + Σ grad_y) / N` for one scale.
    fn scale_loss<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        let mask = if self.valid_mask {
            validity_mask(&targets, self.max_depth)
        } else {
            Tensor::ones_like(&targets)
        };
        let count = mask.clone().sum();

        let mut log_diff = log_difference(predictions, targets);
        if self.valid_mask {
            // NaN at invalid pixels must not reach the sums.
            log_diff = log_diff.mask_fill(invalid_positions(&mask), 0.0);
        }

        let vertical = Self::pair_gradient(log_diff.clone(), mask.clone(), 2);
        let horizontal = Self::pair_gradient(log_diff, mask, 3);

        (horizontal + vertical) / count
    }

    /// Masked `|R[i] - R[i + 2]|` along `dim`, summed. Zero when `dim` is too short.
    fn pair_gradient<B: Backend>(
        log_diff: Tensor<B, 4>,
        mask: Tensor<B, 4>,
        dim: usize,
    ) -> Tensor<B, 1> {
        let device = log_diff.device();
        match (
            log_diff.offset_pair(dim, PAIR_OFFSET),
            mask.offset_pair(dim, PAIR_OFFSET),
        ) {
            (Some((diff_head, diff_tail)), Some((mask_head, mask_tail))) => {
                ((diff_head - diff_tail).abs() * (mask_head * mask_tail)).sum()
            }
            _ => Tensor::zeros([1], &device),
        }
    }

    fn assertions<B: Backend>(&self, predictions: &Tensor<B, 4>, targets: &Tensor<B, 4>) {
        let pred_dims = predictions.dims();
        let target_dims = targets.dims();
        assert_eq!(
            pred_dims, target_dims,
            "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
        );
    }
}
