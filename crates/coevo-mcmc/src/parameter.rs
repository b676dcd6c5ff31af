use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::Prior;
use serde::{Deserialize, Serialize};

/// Admissible values for a scalar model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Domain {
    /// `[0, inf)`, used for event heights.
    NonNegative,
    /// `(0, inf)`, used for population sizes, mutation rates and concentrations.
    Positive,
    /// `(0, 1)`, used for the ancestral state frequency.
    OpenUnitInterval,
}

impl Domain {
    /// Whether `value` lies in the domain.
    pub fn contains(&self, value: f64) -> bool {
        match self {
            Domain::NonNegative => value.is_finite() && value >= 0.0,
            Domain::Positive => value.is_finite() && value > 0.0,
            Domain::OpenUnitInterval => value > 0.0 && value < 1.0,
        }
    }

    /// Whether a prior's support fits inside the domain.
    pub fn admits(&self, prior: &Prior) -> bool {
        match self {
            Domain::NonNegative | Domain::Positive => prior.min() >= 0.0,
            Domain::OpenUnitInterval => prior.min() >= 0.0 && prior.max() <= 1.0,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Domain::NonNegative => "non-negative",
            Domain::Positive => "positive",
            Domain::OpenUnitInterval => "open-unit-interval",
        }
    }
}

/// A scalar model parameter that is either estimated under a prior or fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct RealParameter {
    name: &'static str,
    value: f64,
    prior: Option<Prior>,
    fixed: bool,
    domain: Domain,
}

impl RealParameter {
    /// Creates an estimated parameter.
    pub fn estimated(
        name: &'static str,
        value: f64,
        prior: Prior,
        domain: Domain,
    ) -> Result<Self, EcoError> {
        prior.validate()?;
        let parameter = Self {
            name,
            value,
            prior: Some(prior),
            fixed: false,
            domain,
        };
        parameter.check(value)?;
        Ok(parameter)
    }

    /// Creates a parameter that never moves.
    pub fn fixed(name: &'static str, value: f64, domain: Domain) -> Result<Self, EcoError> {
        let parameter = Self {
            name,
            value,
            prior: None,
            fixed: true,
            domain,
        };
        parameter.check(value)?;
        Ok(parameter)
    }

    /// Parameter name used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether the parameter is fixed.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Prior of an estimated parameter.
    pub fn prior(&self) -> Option<&Prior> {
        self.prior.as_ref()
    }

    /// Sets the value, failing on fixed parameters and on values outside the domain.
    pub fn set_value(&mut self, value: f64) -> Result<(), EcoError> {
        if self.fixed {
            return Err(EcoError::Model(
                ErrorInfo::new("fixed-parameter-update", "attempted to move a fixed parameter")
                    .with_context("parameter", self.name),
            ));
        }
        self.check(value)?;
        self.value = value;
        Ok(())
    }

    /// Multiplies the value by `multiplier` and returns the number of free
    /// dimensions moved (0 when fixed).
    pub fn scale(&mut self, multiplier: f64) -> Result<i32, EcoError> {
        if self.fixed {
            return Ok(0);
        }
        self.set_value(self.value * multiplier)?;
        Ok(1)
    }

    /// Log prior density of the current value; fixed parameters contribute 0.
    pub fn ln_prior(&self) -> f64 {
        match (&self.prior, self.fixed) {
            (Some(prior), false) => prior.ln_pdf(self.value),
            _ => 0.0,
        }
    }

    /// Rollback path: writes a previously valid value, fixed or not.
    pub(crate) fn restore_value(&mut self, value: f64) {
        self.value = value;
    }

    fn check(&self, value: f64) -> Result<(), EcoError> {
        if self.domain.contains(value) {
            Ok(())
        } else {
            Err(EcoError::Model(
                ErrorInfo::new("parameter-out-of-domain", "parameter value outside its domain")
                    .with_context("parameter", self.name)
                    .with_context("value", value)
                    .with_context("domain", self.domain.as_str()),
            ))
        }
    }
}
