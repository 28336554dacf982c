//! Cosine-similarity + normalized MSE loss for dense feature regression.
//!
//! Every pixel is treated as a feature vector along the channel axis:
//!
//! ```text
//! P, T     = rearrange(pred, target, "b c h w -> (b h w) c")
//! lo, hi   = min(T, dim=1), max(T, dim=1)
//! P', T'   = (P - lo) / (hi - lo + 1e-6), (T - lo) / (hi - lo + 1e-6)
//! Loss     = mean(1 - cos(P, T)) + mean((P' - T')²)
//! ```
//!
//! Both inputs are normalized with the *target's* per-pixel range.

use burn::{
    config::Config,
    module::{Content, DisplaySettings, Module, ModuleDisplay},
    nn::loss::{MseLoss, Reduction},
    tensor::{backend::Backend, Tensor},
};

/// Stabilizer added to each squared magnitude in the cosine similarity.
const COSINE_EPS: f64 = 1e-12;

/// Cosine embedding loss over row vectors.
///
/// For each row `i`:
/// - `1 - cos(x1_i, x2_i)` when `labels_i == 1`
/// - `max(0, cos(x1_i, x2_i) - margin)` when `labels_i == -1`
/// - `0` for any other label
///
/// The per-row losses are averaged.
///
/// # Shapes
///
/// - x1, x2: `[rows, features]`
/// - labels: `[rows]`
/// - output: `[1]`
pub fn cosine_embedding_loss<B: Backend>(
    x1: Tensor<B, 2>,
    x2: Tensor<B, 2>,
    labels: Tensor<B, 1>,
    margin: f64,
) -> Tensor<B, 1> {
    let dot: Tensor<B, 1> = (x1.clone() * x2.clone()).sum_dim(1).squeeze(1);
    let mag1: Tensor<B, 1> = x1.powi_scalar(2).sum_dim(1).squeeze(1);
    let mag2: Tensor<B, 1> = x2.powi_scalar(2).sum_dim(1).squeeze(1);
    let cos = dot / (mag1.add_scalar(COSINE_EPS) * mag2.add_scalar(COSINE_EPS)).sqrt();

    let similar = cos.clone().neg().add_scalar(1.0);
    let dissimilar = cos.clone().sub_scalar(margin).clamp_min(0.0);

    Tensor::zeros_like(&cos)
        .mask_where(labels.clone().equal_elem(-1.0), dissimilar)
        .mask_where(labels.equal_elem(1.0), similar)
        .mean()
}

/// Configuration for creating a [cosine + MSE loss](CosineMseLoss).
#[derive(Config, Debug)]
pub struct CosineMseLossConfig {
    /// Margin of the cosine term for dissimilar pairs. Default: 0.0
    #[config(default = 0.0)]
    pub margin: f64,

    /// Guard added to the target's per-pixel range. Default: 1e-6
    #[config(default = 1e-6)]
    pub norm_eps: f64,
}

impl CosineMseLossConfig {
    /// Initialize [cosine + MSE loss](CosineMseLoss).
    pub fn init(&self) -> CosineMseLoss {
        self.assertions();
        tracing::debug!(norm_eps = self.norm_eps, "cosine mse loss created");
        CosineMseLoss {
            margin: self.margin,
            norm_eps: self.norm_eps,
            mse: MseLoss::new(),
        }
    }

    fn assertions(&self) {
        assert!(
            self.norm_eps > 0.0,
            "norm_eps for CosineMseLoss must be positive, got {}",
            self.norm_eps
        );
    }
}

/// Cosine-similarity + min-max normalized MSE loss over per-pixel feature vectors.
#[derive(Module, Clone, Debug)]
#[module(custom_display)]
pub struct CosineMseLoss {
    /// Margin of the cosine term for dissimilar pairs.
    pub margin: f64,
    /// Guard added to the target's per-pixel range.
    pub norm_eps: f64,
    mse: MseLoss,
}

impl Default for CosineMseLoss {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleDisplay for CosineMseLoss {
    fn custom_settings(&self) -> Option<DisplaySettings> {
        DisplaySettings::new()
            .with_new_line_after_attribute(false)
            .optional()
    }

    fn custom_content(&self, content: Content) -> Option<Content> {
        content.add("norm_eps", &self.norm_eps).optional()
    }
}

impl CosineMseLoss {
    /// Create a new cosine + MSE loss with default configuration.
    pub fn new() -> Self {
        CosineMseLossConfig::new().init()
    }

    /// Compute the loss.
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    /// - output: `[1]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> Tensor<B, 1> {
        self.assertions(&predictions, &targets);

        let predictions = Self::pixels_as_rows(predictions);
        let targets = Self::pixels_as_rows(targets);
        let [rows, _] = targets.dims();

        // Every pixel pair is labelled "similar".
        let labels = Tensor::<B, 1>::ones([rows], &targets.device());

        let min = targets.clone().min_dim(1);
        let range = (targets.clone().max_dim(1) - min.clone()).add_scalar(self.norm_eps);
        let pred_normalized = (predictions.clone() - min.clone()) / range.clone();
        let target_normalized = (targets.clone() - min) / range;

        let cosine = cosine_embedding_loss(predictions, targets, labels, self.margin);
        let mse = self
            .mse
            .forward(pred_normalized, target_normalized, Reduction::Mean);

        cosine + mse
    }

    /// `b c h w -> (b h w) c`
    fn pixels_as_rows<B: Backend>(tensor: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, channels, height, width] = tensor.dims();
        tensor
            .permute([0, 2, 3, 1])
            .reshape([batch_size * height * width, channels])
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
