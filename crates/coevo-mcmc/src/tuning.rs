use coevo_core::errors::{EcoError, ErrorInfo};
use serde::{Deserialize, Serialize};

/// Acceptance rate the tuning rule steers toward.
pub const DEFAULT_TARGET_ACCEPTANCE: f64 = 0.44;

/// Robbins-Monro step on the log scale of a tuning coefficient.
///
/// `ln λ' = ln λ + (p − target) / (n + 1)` where `n` counts earlier updates.
/// A non-finite or non-positive result leaves `λ` unchanged.
pub fn robbins_monro_update(
    tuning: f64,
    acceptance_probability: f64,
    updates: u64,
    target: f64,
) -> f64 {
    let delta = (acceptance_probability - target) / (updates as f64 + 1.0);
    let updated = (tuning.ln() + delta).exp();
    if updated.is_finite() && updated > 0.0 {
        updated
    } else {
        tuning
    }
}

/// Schedule-wide view passed to `accept`, `reject` and `optimize`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningState {
    /// Whether adaptation is switched on.
    pub auto_optimize: bool,
    /// Iterations before adaptation starts.
    pub auto_optimize_delay: u64,
    /// Operators drawn before the current one.
    pub iteration: u64,
    /// Acceptance rate targeted by adaptation.
    pub target_acceptance: f64,
}

impl Default for TuningState {
    fn default() -> Self {
        Self {
            auto_optimize: false,
            auto_optimize_delay: 0,
            iteration: 0,
            target_acceptance: DEFAULT_TARGET_ACCEPTANCE,
        }
    }
}

impl TuningState {
    /// Whether the burn-in delay has elapsed.
    pub fn past_delay(&self) -> bool {
        self.iteration >= self.auto_optimize_delay
    }

    /// Whether tuning coefficients move on `optimize`.
    pub fn is_tuning(&self) -> bool {
        self.auto_optimize && self.past_delay()
    }
}

/// Step size of a proposal kernel plus its acceptance statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TunableParameter {
    tuning_parameter: f64,
    number_of_attempts: u64,
    number_of_accepts: u64,
    number_of_updates: u64,
}

impl TunableParameter {
    /// Creates a tuning coefficient, which must be positive and finite.
    ///
    /// Configured values are checked before they get here; schedules reject
    /// operators carrying an invalid coefficient through [`validate`](Self::validate).
    pub fn new(tuning_parameter: f64) -> Self {
        debug_assert!(
            tuning_parameter.is_finite() && tuning_parameter > 0.0,
            "tuning parameter must be positive and finite, got {tuning_parameter}"
        );
        Self {
            tuning_parameter,
            number_of_attempts: 0,
            number_of_accepts: 0,
            number_of_updates: 0,
        }
    }

    /// Fails unless the coefficient is positive and finite.
    pub fn validate(&self) -> Result<(), EcoError> {
        if self.tuning_parameter.is_finite() && self.tuning_parameter > 0.0 {
            Ok(())
        } else {
            Err(EcoError::Operator(
                ErrorInfo::new("operator-tuning", "tuning parameters must be positive and finite")
                    .with_context("value", self.tuning_parameter),
            ))
        }
    }

    /// Current coefficient.
    pub fn tuning_parameter(&self) -> f64 {
        self.tuning_parameter
    }

    /// Calls to `optimize` so far.
    pub fn number_of_attempts(&self) -> u64 {
        self.number_of_attempts
    }

    /// Accepted moves so far.
    pub fn number_of_accepts(&self) -> u64 {
        self.number_of_accepts
    }

    pub(crate) fn record_accept(&mut self) {
        self.number_of_accepts += 1;
    }

    /// Counts the attempt and, when tuning is active, applies one
    /// Robbins-Monro step driven by `min(1, exp(ln_acceptance))`.
    pub fn optimize(&mut self, state: &TuningState, ln_acceptance: f64) {
        self.number_of_attempts += 1;
        if !state.is_tuning() {
            return;
        }
        let probability = if ln_acceptance.is_nan() {
            0.0
        } else {
            ln_acceptance.min(0.0).exp()
        };
        self.tuning_parameter = robbins_monro_update(
            self.tuning_parameter,
            probability,
            self.number_of_updates,
            state.target_acceptance,
        );
        self.number_of_updates += 1;
    }
}
