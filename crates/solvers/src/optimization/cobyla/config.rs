use thiserror::Error;

/// Configuration for the COBYLA solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    rho_begin: f64,
    rho_end: f64,
    max_evals: usize,
}

/// Errors that can occur when validating a COBYLA solver config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rho_end must be finite and positive")]
    RhoEnd,

    #[error("rho_begin must be finite and greater than rho_end")]
    RhoBegin,

    #[error("problem must have at least one variable")]
    NoVariables,

    #[error("max_evals must be at least {required} to build the initial simplex")]
    MaxEvals { required: usize },
}

impl Default for Config {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(0.5, 1e-6, 1000).unwrap()
    }
}

impl Config {
    /// Creates a new config with validated trust-region radii.
    ///
    /// The evaluation budget is checked against the problem size when the
    /// solver starts, since it must cover the `N + 1` vertices of the
    /// initial simplex.
    ///
    /// # Errors
    ///
    /// Returns an error if `rho_end` is not finite and positive, or if
    /// `rho_begin` is not finite and strictly greater than `rho_end`.
    pub fn new(rho_begin: f64, rho_end: f64, max_evals: usize) -> Result<Self, ConfigError> {
        if !rho_end.is_finite() || rho_end <= 0.0 {
            return Err(ConfigError::RhoEnd);
        }
        if !rho_begin.is_finite() || rho_begin <= rho_end {
            return Err(ConfigError::RhoBegin);
        }

        Ok(Self {
            rho_begin,
            rho_end,
            max_evals,
        })
    }

    /// Returns the initial trust-region radius.
    #[must_use]
    pub fn rho_begin(&self) -> f64 {
        self.rho_begin
    }

    /// Returns the final trust-region radius, the requested accuracy in `x`.
    #[must_use]
    pub fn rho_end(&self) -> f64 {
        self.rho_end
    }

    /// Returns the maximum number of model evaluations.
    #[must_use]
    pub fn max_evals(&self) -> usize {
        self.max_evals
    }

    /// Checks that the config can drive a problem with `n` variables.
    pub(super) fn validate_for(&self, n: usize) -> Result<(), ConfigError> {
        if n == 0 {
            return Err(ConfigError::NoVariables);
        }
        if self.max_evals < n + 1 {
            return Err(ConfigError::MaxEvals { required: n + 1 });
        }
        Ok(())
    }
}
