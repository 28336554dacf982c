//! Named loss selection for the training loop.
//!
//! The training loop names its loss by string in its configuration. [`LossConfig`] turns
//! that name into a concrete loss at construction time and [`Loss::forward`] reports the
//! result under the `"total"` key.

use std::{collections::HashMap, fmt, str::FromStr};

use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};

use crate::{
    cosine_mse::{CosineMseLoss, CosineMseLossConfig},
    error::{LossError, LossResult},
};

/// Key of the summed loss in a [`LossOutput`].
pub const TOTAL_KEY: &str = "total";

/// Named loss values produced by one [`Loss::forward`] call.
pub type LossOutput<B> = HashMap<String, Tensor<B, 1>>;

/// Identifiers accepted by [`LossConfig::loss_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LossType {
    /// Cosine-similarity + normalized MSE, `"cosine_mse"`.
    CosineMse,
}

impl LossType {
    /// The identifier used in configuration files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CosineMse => "cosine_mse",
        }
    }
}

impl fmt::Display for LossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LossType {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cosine_mse" => Ok(Self::CosineMse),
            other => Err(LossError::NotImplemented {
                loss_type: other.to_owned(),
            }),
        }
    }
}

/// Configuration for the training [loss](Loss).
#[derive(Config, Debug)]
pub struct LossConfig {
    /// Loss identifier, e.g. `"cosine_mse"`.
    pub loss_type: String,

    /// Feature dimensionality of the regressed maps. Default: 384
    #[config(default = 384)]
    pub dim: usize,
}

impl LossConfig {
    /// Initialize the [loss](Loss) named by `loss_type`.
    ///
    /// # Errors
    ///
    /// Returns [`LossError::NotImplemented`] when `loss_type` names no known loss.
    pub fn init(&self) -> LossResult<Loss> {
        let loss_type = self.loss_type.parse::<LossType>().inspect_err(|err| {
            tracing::warn!(loss_type = %self.loss_type, error = %err, "rejected loss type");
        })?;

        let kind = match loss_type {
            LossType::CosineMse => LossKind::CosineMse(CosineMseLossConfig::new().init()),
        };
        tracing::debug!(%loss_type, dim = self.dim, "training loss created");

        Ok(Loss {
            loss_type,
            dim: self.dim,
            kind,
        })
    }
}

#[derive(Debug, Clone)]
enum LossKind {
    CosineMse(CosineMseLoss),
}

/// Training loss selected by name.
#[derive(Debug, Clone)]
pub struct Loss {
    loss_type: LossType,
    dim: usize,
    kind: LossKind,
}

impl Loss {
    /// The selected loss type.
    pub const fn loss_type(&self) -> LossType {
        self.loss_type
    }

    /// The configured feature dimensionality.
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Compute the selected loss and report it under [`TOTAL_KEY`].
    ///
    /// # Shapes
    ///
    /// - predictions: `[batch_size, channels, height, width]`
    /// - targets: `[batch_size, channels, height, width]`
    pub fn forward<B: Backend>(
        &self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> LossOutput<B> {
        let total = match &self.kind {
            LossKind::CosineMse(loss) => loss.forward(predictions, targets),
        };

        HashMap::from([(TOTAL_KEY.to_owned(), total)])
    }
}
