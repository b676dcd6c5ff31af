use std::fmt::Debug;

use coevo_core::EcoError;

use crate::comparison::ComparisonState;

/// Likelihood of one comparison's data given its parameters and divergence height.
///
/// Implementations must be pure: the same state and height give the same value.
pub trait LikelihoodModel: Debug {
    /// Log likelihood of the comparison's data at `height`.
    fn log_likelihood(&self, comparison: &ComparisonState, height: f64) -> Result<f64, EcoError>;
}

/// Data-ignoring likelihood: a constant, so the chain samples from the prior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoreData;

impl LikelihoodModel for IgnoreData {
    fn log_likelihood(&self, _comparison: &ComparisonState, _height: f64) -> Result<f64, EcoError> {
        Ok(0.0)
    }
}
