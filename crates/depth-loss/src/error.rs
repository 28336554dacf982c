use thiserror::Error;

/// Errors raised while building a loss from its configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LossError {
    /// The requested loss type has no implementation.
    #[error("Loss type {loss_type} not implemented")]
    NotImplemented {
        /// The identifier that was requested.
        loss_type: String,
    },
}

/// A specialized `Result` type for loss construction.
pub type LossResult<T> = Result<T, LossError>;
