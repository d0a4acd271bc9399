use std::error::Error as StdError;

use thiserror::Error;

use crate::optimization::EvalError;

use super::config::ConfigError;

/// Errors that can occur during a COBYLA run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("model call failed")]
    Model(#[source] Box<dyn StdError + Send + Sync>),

    #[error("problem error")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),

    /// The objective or a constraint value was NaN or infinite.
    #[error("non-finite objective or constraint at x = {x:?} (objective = {objective})")]
    NonFinite { x: Vec<f64>, objective: f64 },
}

impl<ME, PE> From<EvalError<ME, PE>> for Error
where
    ME: StdError + Send + Sync + 'static,
    PE: StdError + Send + Sync + 'static,
{
    fn from(err: EvalError<ME, PE>) -> Self {
        match err {
            EvalError::Model(e) => Self::Model(Box::new(e)),
            EvalError::Problem(e) => Self::Problem(Box::new(e)),
        }
    }
}
