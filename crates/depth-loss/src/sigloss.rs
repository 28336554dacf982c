//! Scale-invariant logarithmic loss.
//!
//! This follows [AdaBins](https://arxiv.org/abs/2011.14141):
//!
//! ```text
//! g    = log(pred + eps) - log(target + eps)       (valid pixels only)
//! Dg   = Var(g) + 0.15 * mean(g)²
//! Loss = weight * sqrt(Dg)
//! ```
//!
//! With warm-up enabled, the first `warm_iter` calls drop the variance term and
//! return `weight * sqrt(0.15 * mean(g)²)`.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    tensor::{backend::Backend, Tensor},
};

use crate::mask::{invalid_positions, log_difference, validity_mask};

/// Weight of the squared-mean term.
const LAMBDA: f64 = 0.15;

/// Configuration for creating a [scale-invariant log loss](SigLoss).
#[derive(Config, Debug)]
pub struct SigLossConfig {
    /// Whether to ignore targets that are not strictly positive. Default: true
    #[config(default = true)]
    pub valid_mask: bool,

    /// Weight of the loss. Default: 1.0
    #[config(default = 1.0)]
    pub loss_weight: f64,

    /// Upper bound for valid targets when masking. Default: None
    pub max_depth: Option<f64>,

    /// Use the mean-only formula for the first `warm_iter` calls. Default: false
    #[config(default = false)]
    pub warm_up: bool,

    /// Number of warm-up calls. Default: 100
    #[config(default = 100)]
    pub warm_iter: usize,

    /// Name under which training logs report this loss.
    #[config(default = "String::from(\"sigloss\")")]
    pub loss_name: String,
}

impl SigLossConfig {
    /// Initialize [scale-invariant log loss](SigLoss).
    pub fn init(&self) -> SigLoss {
        self.assertions();
        tracing::debug!(
            loss_name = %self.loss_name,
            warm_up = self.warm_up,
            warm_iter = self.warm_iter,
            "sigloss created"
        );
        SigLoss {
            valid_mask: self.valid_mask,
            loss_weight: self.loss_weight,
            max_depth: self.max_depth,
            warm_up: self.warm_up,
            warm_iter: self.warm_iter,
            warm_up_counter: 0,
            loss_name: self.loss_name.clone(),
        }
    }

    fn assertions(&self) {
        if let Some(max_depth) = self.max_depth {
            assert!(
                max_depth > 0.0,
                "max_depth for SigLoss must be positive, got {max_depth}"
            );
        }
    }
}

/// Scale-invariant logarithmic loss with an optional warm-up stage.
///
/// The warm-up counter lives on the instance and only ever grows; once it reaches
/// `warm_iter` the full formula is used for the rest of the instance's lifetime.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct SigLoss {
    /// Whether invalid targets are masked out.
    pub valid_mask: bool,
    /// Weight applied to the loss.
    pub loss_weight: f64,
    /// Upper bound for valid targets.
    pub max_depth: Option<f64>,
    /// Whether the warm-up stage is enabled.
    pub warm_up: bool,
    /// Number of warm-up calls.
    pub warm_iter: usize,
    /// Warm-up calls performed so far.
    warm_up_counter: usize,
    /// Name used in training logs.
    pub loss_name: String,
}

impl Default for SigLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for SigLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content
            .add("loss_weight", &self.loss_weight)
            .add("warm_iter", &self.warm_iter)
            .optional()
    }
}

impl SigLoss {
    /// Create a new scale-invariant log loss with default configuration.
    pub fn new() -> Self {
        SigLossConfig::new().init()
    }

    /// Number of warm-up calls performed so far.
    pub const fn warm_up_counter(&self) -> usize {
        self.warm_up_counter
    }

    /// Whether the next call uses the warm-up formula.
    pub const fn is_warming_up(&self) -> bool {
        self.warm_up && self.warm_up_counter < self.warm_iter
    }

    /// Compute the loss, advancing the warm-up counter when warm-up is active.
    ///
    /// # Shapes
    ///
    /// - predictions: `[...dims]` (depth)
    /// - targets: `[...dims]` (same shape, invalid pixels `<= 0`)
    /// - output: `[1]`
    ///
    /// With masking enabled, only valid pixels contribute. Fewer than two valid
    /// pixels leave the variance undefined and the loss non-finite.
    pub fn forward<const D: usize, B: Backend>(
        &mut self,
        predictions: Tensor<B, D>,
        targets: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        self.assertions(&predictions, &targets);

        let mask = if self.valid_mask {
            validity_mask(&targets, self.max_depth)
        } else {
            Tensor::ones_like(&targets)
        };
        let count = mask.clone().sum();

        let mut g = log_difference(predictions, targets);
        if self.valid_mask {
            // Zero-fill rather than multiply so NaN from invalid pixels cannot leak.
            g = g.mask_fill(invalid_positions(&mask), 0.0);
        }
        let mean = g.clone().sum() / count.clone();

        if self.is_warming_up() {
            self.warm_up_counter += 1;
            if self.warm_up_counter == self.warm_iter {
                tracing::info!(
                    loss_name = %self.loss_name,
                    warm_iter = self.warm_iter,
                    "sigloss warm-up finished"
                );
            }
            return mean
                .powi_scalar(2)
                .mul_scalar(LAMBDA)
                .sqrt()
                .mul_scalar(self.loss_weight);
        }

        // Unbiased variance over the valid pixels.
        let centered = (g - mean.clone().unsqueeze::<D>()) * mask;
        let variance = centered.powi_scalar(2).sum() / count.sub_scalar(1.0);

        (variance + mean.powi_scalar(2).mul_scalar(LAMBDA))
            .sqrt()
            .mul_scalar(self.loss_weight)
    }

    fn assertions<const D: usize, B: Backend>(
        &self,
        predictions: &Tensor<B, D>,
        targets: &Tensor<B, D>,
    ) {
        let pred_dims = predictions.dims();
        let target_dims = targets.dims();
        assert_eq!(
            pred_dims, target_dims,
            "Shape of predictions ({pred_dims:?}) must match targets ({target_dims:?})"
        );
    }
}
