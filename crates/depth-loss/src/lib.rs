//! Loss functions for depth and dense-feature regression.
//!
//! This crate provides the training losses of a depth / feature regression network,
//! written against the Burn deep learning framework. Every loss is backend-agnostic and
//! differentiable, so the same code runs on CPU and GPU backends and under `Autodiff`.
//!
//! ## Depth Losses
//! - **[`GradientLoss`]**: Multi-scale gradient consistency on log depth (MegaDepth)
//! - **[`SigLoss`]**: Scale-invariant logarithmic loss with optional warm-up (AdaBins)
//!
//! ## Feature Losses
//! - **[`CosineMseLoss`]**: Per-pixel cosine similarity plus min-max normalized MSE
//!
//! ## Named Selection
//! - **[`Loss`]**: Builds one loss from its identifier and reports `{"total": loss}`
//!
//! ## Usage Example
//!
//! ```rust
//! use burn::{backend::NdArray, tensor::{Distribution, Tensor}};
//! use depth_loss::{LossConfig, TOTAL_KEY};
//!
//! let device = Default::default();
//! let loss = LossConfig::new("cosine_mse".to_owned()).init()?;
//!
//! let pred = Tensor::<NdArray, 4>::random([1, 384, 8, 8], Distribution::Default, &device);
//! let target = Tensor::<NdArray, 4>::random([1, 384, 8, 8], Distribution::Default, &device);
//!
//! let output = loss.forward(pred, target);
//! assert!(output.contains_key(TOTAL_KEY));
//! # Ok::<(), depth_loss::LossError>(())
//! ```
//!
//! Depth targets mark missing measurements with values `<= 0`; [`GradientLoss`] and
//! [`SigLoss`] ignore those pixels unless `valid_mask` is disabled.

mod cosine_mse;
mod error;
mod gradient;
mod loss;
mod mask;
mod sigloss;

pub use cosine_mse::{cosine_embedding_loss, CosineMseLoss, CosineMseLossConfig};
pub use error::{LossError, LossResult};
pub use gradient::{GradientLoss, GradientLossConfig, GRADIENT_STRIDES};
pub use loss::{Loss, LossConfig, LossOutput, LossType, TOTAL_KEY};
pub use mask::{validity_mask, LOG_EPS};
pub use sigloss::{SigLoss, SigLossConfig};
