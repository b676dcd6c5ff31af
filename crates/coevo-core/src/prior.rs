//! Continuous prior distributions over scalar parameters.

use rand_distr::{Beta, Distribution, Exp, Gamma};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use crate::errors::{EcoError, ErrorInfo};
use crate::rng::RngHandle;

/// Prior distribution over a scalar model parameter.
///
/// Densities are normalized; outside the support `ln_pdf` is negative
/// infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Prior {
    /// Gamma distribution with shape and scale, shifted by `offset`.
    Gamma {
        /// Shape parameter.
        shape: f64,
        /// Scale parameter (mean is `shape * scale`).
        scale: f64,
        /// Lower bound of the support.
        #[serde(default)]
        offset: f64,
    },
    /// Exponential distribution with the given rate.
    Exponential {
        /// Rate parameter (mean is `1 / rate`).
        rate: f64,
    },
    /// Beta distribution on `(0, 1)`.
    Beta {
        /// First shape parameter.
        alpha: f64,
        /// Second shape parameter.
        beta: f64,
    },
    /// Uniform distribution on `[min, max]`.
    Uniform {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// `coefficient * ln(x)` with the convention `0 * ln(0) = 0`.
fn xlogy(coefficient: f64, x: f64) -> f64 {
    if coefficient == 0.0 {
        0.0
    } else {
        coefficient * x.ln()
    }
}

impl Prior {
    /// Gamma prior without an offset.
    pub fn gamma(shape: f64, scale: f64) -> Result<Self, EcoError> {
        let prior = Prior::Gamma {
            shape,
            scale,
            offset: 0.0,
        };
        prior.validate()?;
        Ok(prior)
    }

    /// Beta prior.
    pub fn beta(alpha: f64, beta: f64) -> Result<Self, EcoError> {
        let prior = Prior::Beta { alpha, beta };
        prior.validate()?;
        Ok(prior)
    }

    /// Exponential prior.
    pub fn exponential(rate: f64) -> Result<Self, EcoError> {
        let prior = Prior::Exponential { rate };
        prior.validate()?;
        Ok(prior)
    }

    /// Uniform prior.
    pub fn uniform(min: f64, max: f64) -> Result<Self, EcoError> {
        let prior = Prior::Uniform { min, max };
        prior.validate()?;
        Ok(prior)
    }

    /// Short family name used in diagnostics.
    pub fn family(&self) -> &'static str {
        match self {
            Prior::Gamma { .. } => "gamma",
            Prior::Exponential { .. } => "exponential",
            Prior::Beta { .. } => "beta",
            Prior::Uniform { .. } => "uniform",
        }
    }

    /// Checks that the parameters describe a proper distribution.
    pub fn validate(&self) -> Result<(), EcoError> {
        let valid = match *self {
            Prior::Gamma {
                shape,
                scale,
                offset,
            } => positive(shape) && positive(scale) && offset.is_finite(),
            Prior::Exponential { rate } => positive(rate),
            Prior::Beta { alpha, beta } => positive(alpha) && positive(beta),
            Prior::Uniform { min, max } => min.is_finite() && max.is_finite() && min < max,
        };
        if valid {
            Ok(())
        } else {
            Err(EcoError::Prior(
                ErrorInfo::new("invalid-prior", "prior parameters do not define a distribution")
                    .with_context("family", self.family())
                    .with_context("parameters", format!("{self:?}")),
            ))
        }
    }

    /// Natural log of the probability density at `x`.
    pub fn ln_pdf(&self, x: f64) -> f64 {
        if x.is_nan() || x < self.min() || x > self.max() {
            return f64::NEG_INFINITY;
        }
        match *self {
            Prior::Gamma {
                shape,
                scale,
                offset,
            } => {
                let y = x - offset;
                if y == 0.0 {
                    return match shape.partial_cmp(&1.0) {
                        Some(std::cmp::Ordering::Less) => f64::INFINITY,
                        Some(std::cmp::Ordering::Equal) => -scale.ln(),
                        _ => f64::NEG_INFINITY,
                    };
                }
                xlogy(shape - 1.0, y) - y / scale - ln_gamma(shape) - shape * scale.ln()
            }
            Prior::Exponential { rate } => rate.ln() - rate * x,
            Prior::Beta { alpha, beta } => {
                let ln_beta_fn = ln_gamma(alpha) + ln_gamma(beta) - ln_gamma(alpha + beta);
                xlogy(alpha - 1.0, x) + xlogy(beta - 1.0, 1.0 - x) - ln_beta_fn
            }
            Prior::Uniform { min, max } => -(max - min).ln(),
        }
    }

    /// Analytic mean.
    pub fn mean(&self) -> f64 {
        match *self {
            Prior::Gamma {
                shape,
                scale,
                offset,
            } => offset + shape * scale,
            Prior::Exponential { rate } => 1.0 / rate,
            Prior::Beta { alpha, beta } => alpha / (alpha + beta),
            Prior::Uniform { min, max } => 0.5 * (min + max),
        }
    }

    /// Analytic variance.
    pub fn variance(&self) -> f64 {
        match *self {
            Prior::Gamma { shape, scale, .. } => shape * scale * scale,
            Prior::Exponential { rate } => 1.0 / (rate * rate),
            Prior::Beta { alpha, beta } => {
                let sum = alpha + beta;
                (alpha * beta) / (sum * sum * (sum + 1.0))
            }
            Prior::Uniform { min, max } => (max - min).powi(2) / 12.0,
        }
    }

    /// Lower bound of the support.
    pub fn min(&self) -> f64 {
        match *self {
            Prior::Gamma { offset, .. } => offset,
            Prior::Exponential { .. } | Prior::Beta { .. } => 0.0,
            Prior::Uniform { min, .. } => min,
        }
    }

    /// Upper bound of the support.
    pub fn max(&self) -> f64 {
        match *self {
            Prior::Gamma { .. } | Prior::Exponential { .. } => f64::INFINITY,
            Prior::Beta { .. } => 1.0,
            Prior::Uniform { max, .. } => max,
        }
    }

    /// Draws one value from the distribution.
    pub fn draw(&self, rng: &mut RngHandle) -> Result<f64, EcoError> {
        let invalid = |reason: String| {
            EcoError::Prior(
                ErrorInfo::new("prior-draw", reason).with_context("family", self.family()),
            )
        };
        let value = match *self {
            Prior::Gamma {
                shape,
                scale,
                offset,
            } => {
                let gamma = Gamma::new(shape, scale).map_err(|err| invalid(err.to_string()))?;
                offset + gamma.sample(rng)
            }
            Prior::Exponential { rate } => {
                let exp = Exp::new(rate).map_err(|err| invalid(err.to_string()))?;
                exp.sample(rng)
            }
            Prior::Beta { alpha, beta } => {
                let dist = Beta::new(alpha, beta).map_err(|err| invalid(err.to_string()))?;
                dist.sample(rng)
            }
            Prior::Uniform { min, max } => {
                self.validate()?;
                rng.uniform_range(min, max)
            }
        };
        Ok(value)
    }
}
