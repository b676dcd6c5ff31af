//! The operator capability shared by every proposal kernel, plus the
//! Metropolis-Hastings step and kernel primitives the concrete operators
//! are built from.

use std::fmt::Debug;

use coevo_core::{EcoError, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collection::ModelCollection;
use crate::tuning::{TunableParameter, TuningState};

/// Concrete operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    /// Multiplies an event height.
    EventHeightScaler,
    /// Random walk on an event height, reflected at zero.
    EventHeightMover,
    /// Multiplies the root population size.
    RootPopulationSizeScaler,
    /// Multiplies one leaf population size.
    LeafPopulationSizeScaler,
    /// Multiplies the mutation rate.
    MutationRateScaler,
    /// Random walk on the ancestral frequency, reflected inside (0, 1).
    FreqMover,
    /// Redistributes a comparison's sizes along the simplex, keeping their sum.
    RelativePopulationSizeMixer,
    /// Multiplies every size of a comparison, keeping their proportions.
    MeanPopulationSizeScaler,
    /// Shifts size from the leaves to the root or back, keeping the sum.
    RootRelativePopulationSizeMover,
    /// Shifts size between one leaf and the other branches, keeping the sum.
    LeafRelativePopulationSizeMover,
    /// Multiplies the concentration or split weight of the event model.
    ConcentrationScaler,
    /// Height and sizes by one multiplier.
    HeightSizeScaler,
    /// Height and leaf sizes by a multiplier, root size by its inverse.
    HeightSizeMixer,
    /// Height and sizes by a multiplier, mutation rate by its inverse.
    HeightSizeRateScaler,
    /// Mixer that also moves the mutation rate by the inverse multiplier.
    HeightSizeRateMixer,
    /// Root size by a multiplier, height shifted by twice the size change.
    TimeRootSizeMixer,
    /// Auxiliary-category Gibbs update of event membership.
    DirichletProcessGibbsSampler,
    /// Split and merge moves on the event partition.
    ReversibleJumpSampler,
}

impl OperatorKind {
    /// Stable identifier used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::EventHeightScaler => "event-height-scaler",
            OperatorKind::EventHeightMover => "event-height-mover",
            OperatorKind::RootPopulationSizeScaler => "root-population-size-scaler",
            OperatorKind::LeafPopulationSizeScaler => "leaf-population-size-scaler",
            OperatorKind::MutationRateScaler => "mutation-rate-scaler",
            OperatorKind::FreqMover => "freq-mover",
            OperatorKind::RelativePopulationSizeMixer => "relative-population-size-mixer",
            OperatorKind::MeanPopulationSizeScaler => "mean-population-size-scaler",
            OperatorKind::RootRelativePopulationSizeMover => "root-relative-population-size-mover",
            OperatorKind::LeafRelativePopulationSizeMover => "leaf-relative-population-size-mover",
            OperatorKind::ConcentrationScaler => "concentration-scaler",
            OperatorKind::HeightSizeScaler => "height-size-scaler",
            OperatorKind::HeightSizeMixer => "height-size-mixer",
            OperatorKind::HeightSizeRateScaler => "height-size-rate-scaler",
            OperatorKind::HeightSizeRateMixer => "height-size-rate-mixer",
            OperatorKind::TimeRootSizeMixer => "time-root-size-mixer",
            OperatorKind::DirichletProcessGibbsSampler => "dirichlet-process-gibbs-sampler",
            OperatorKind::ReversibleJumpSampler => "reversible-jump-sampler",
        }
    }

    /// Quantity the operator targets.
    pub fn target(&self) -> &'static str {
        match self {
            OperatorKind::EventHeightScaler | OperatorKind::EventHeightMover => "height",
            OperatorKind::RootPopulationSizeScaler => "root population size",
            OperatorKind::LeafPopulationSizeScaler => "leaf population size",
            OperatorKind::MutationRateScaler => "mutation rate",
            OperatorKind::FreqMover => "freq 1",
            OperatorKind::RelativePopulationSizeMixer
            | OperatorKind::RootRelativePopulationSizeMover
            | OperatorKind::LeafRelativePopulationSizeMover => "relative population sizes",
            OperatorKind::MeanPopulationSizeScaler => "mean population size",
            OperatorKind::ConcentrationScaler => "concentration",
            OperatorKind::HeightSizeScaler | OperatorKind::HeightSizeMixer => "height and sizes",
            OperatorKind::HeightSizeRateScaler | OperatorKind::HeightSizeRateMixer => {
                "height, sizes and mutation rate"
            }
            OperatorKind::TimeRootSizeMixer => "height and root size",
            OperatorKind::DirichletProcessGibbsSampler | OperatorKind::ReversibleJumpSampler => {
                "event partition"
            }
        }
    }
}

/// Which part of the collection an operator visits per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Every event (time operators) or every comparison (tree operators).
    Global,
    /// Only the given comparison.
    Comparison(usize),
}

/// Weight, counters and tuning shared by the concrete operators.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorCore {
    weight: f64,
    accepted: u64,
    rejected: u64,
    tuning: Option<TunableParameter>,
}

impl OperatorCore {
    /// Core with a tunable step size.
    pub fn tuned(weight: f64, tuning: f64) -> Self {
        Self {
            weight,
            accepted: 0,
            rejected: 0,
            tuning: Some(TunableParameter::new(tuning)),
        }
    }

    /// Core for operators without a step size.
    pub fn untuned(weight: f64) -> Self {
        Self {
            weight,
            accepted: 0,
            rejected: 0,
            tuning: None,
        }
    }

    /// Current step size, 1 for untuned operators.
    pub fn tuning_value(&self) -> f64 {
        self.tuning
            .as_ref()
            .map_or(1.0, TunableParameter::tuning_parameter)
    }

    pub(crate) fn record_accept(&mut self) {
        self.accepted += 1;
        if let Some(tuning) = self.tuning.as_mut() {
            tuning.record_accept();
        }
    }

    pub(crate) fn record_reject(&mut self) {
        self.rejected += 1;
    }
}

/// Per-operator summary for run reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorReport {
    /// Operator name including scope.
    pub name: String,
    /// Targeted quantity.
    pub target: String,
    /// Accepted moves.
    pub accepted: u64,
    /// Rejected moves.
    pub rejected: u64,
    /// Selection weight.
    pub weight: f64,
    /// Selection probability within the schedule.
    pub weight_probability: f64,
    /// Final step size, if tunable.
    pub tuning: Option<f64>,
    /// Operators run after each move of this one. They are never drawn by
    /// the schedule, so their `weight_probability` is zero.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sweep: Vec<OperatorReport>,
}

impl OperatorReport {
    /// Fraction of moves accepted, 0 when none were attempted.
    pub fn acceptance_rate(&self) -> f64 {
        let total = self.accepted + self.rejected;
        if total == 0 {
            0.0
        } else {
            self.accepted as f64 / total as f64
        }
    }
}

/// A proposal kernel acting on a [`ModelCollection`].
///
/// `propose` mutates the collection and returns the log Hastings ratio.
/// `perform_collection_move` runs complete accept/reject steps over the
/// operator's scope, and `operate` repeats it.
pub trait Operator: Debug {
    /// Concrete kind.
    fn kind(&self) -> OperatorKind;

    /// Shared counters and tuning.
    fn core(&self) -> &OperatorCore;

    /// Mutable shared counters and tuning.
    fn core_mut(&mut self) -> &mut OperatorCore;

    /// Part of the collection visited per move.
    fn scope(&self) -> Scope {
        Scope::Global
    }

    /// Name including the scope.
    fn name(&self) -> String {
        match self.scope() {
            Scope::Global => self.kind().as_str().to_string(),
            Scope::Comparison(index) => format!("{}[{index}]", self.kind().as_str()),
        }
    }

    /// Selection weight.
    fn weight(&self) -> f64 {
        self.core().weight
    }

    /// Step size, if the operator has one.
    fn tuning(&self) -> Option<&TunableParameter> {
        self.core().tuning.as_ref()
    }

    /// Accepted moves so far.
    fn number_accepted(&self) -> u64 {
        self.core().accepted
    }

    /// Rejected moves so far.
    fn number_rejected(&self) -> u64 {
        self.core().rejected
    }

    /// Proposes new values for the target addressed by `index` (an event for
    /// global time operators, otherwise a comparison) and returns the log
    /// Hastings ratio.
    fn propose(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        index: usize,
    ) -> Result<f64, EcoError>;

    /// Records an accepted move.
    fn accept(&mut self, _state: &TuningState) {
        self.core_mut().record_accept();
    }

    /// Records a rejected move.
    fn reject(&mut self, _state: &TuningState) {
        self.core_mut().record_reject();
    }

    /// Adapts the step size from the last log acceptance ratio.
    fn optimize(&mut self, state: &TuningState, ln_acceptance: f64) {
        if let Some(tuning) = self.core_mut().tuning.as_mut() {
            tuning.optimize(state, ln_acceptance);
        }
    }

    /// One complete move over the operator's scope.
    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError>;

    /// Operators this one runs after each of its own moves.
    fn sweep_operators(&self) -> Vec<&dyn Operator> {
        Vec::new()
    }

    /// Runs `steps` collection moves (at least one).
    fn operate(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
        steps: usize,
    ) -> Result<(), EcoError> {
        for _ in 0..steps.max(1) {
            self.perform_collection_move(rng, collection, state)?;
        }
        Ok(())
    }

    /// Summary for reports given the schedule's total weight.
    fn report(&self, total_weight: f64) -> OperatorReport {
        OperatorReport {
            name: self.name(),
            target: self.kind().target().to_string(),
            accepted: self.number_accepted(),
            rejected: self.number_rejected(),
            weight: self.weight(),
            weight_probability: if total_weight > 0.0 {
                self.weight() / total_weight
            } else {
                0.0
            },
            tuning: self.tuning().map(TunableParameter::tuning_parameter),
            sweep: self
                .sweep_operators()
                .into_iter()
                .map(|operator| operator.report(0.0))
                .collect(),
        }
    }
}

/// One Metropolis-Hastings step: store, propose, evaluate, accept or restore,
/// then optimize. Returns whether the proposal was accepted.
pub fn metropolis_hastings_step<O: Operator + ?Sized>(
    operator: &mut O,
    rng: &mut RngHandle,
    collection: &mut ModelCollection,
    state: &TuningState,
    index: usize,
) -> Result<bool, EcoError> {
    collection.store_state();
    let ln_hastings = operator.propose(rng, collection, index)?;
    collection.compute_log_likelihood_and_prior()?;
    let ln_acceptance = (collection.log_likelihood() - collection.stored_log_likelihood()?)
        + (collection.log_prior_density_value() - collection.stored_log_prior_density_value()?)
        + ln_hastings;
    if ln_acceptance.is_nan() {
        warn!(
            operator = %operator.name(),
            index,
            "log acceptance ratio is NaN; rejecting"
        );
    }
    let accepted = accept_with_log_probability(rng, ln_acceptance);
    if accepted {
        operator.accept(state);
        collection.discard_stored_state();
    } else {
        operator.reject(state);
        collection.restore_state()?;
    }
    collection.make_clean();
    operator.optimize(state, ln_acceptance);
    Ok(accepted)
}

/// Accepts with probability `min(1, exp(ln_probability))`; NaN rejects.
///
/// A uniform variate is consumed on every call so the random stream does not
/// depend on the outcome.
pub fn accept_with_log_probability(rng: &mut RngHandle, ln_probability: f64) -> bool {
    let u = rng.uniform_real();
    !ln_probability.is_nan() && u < ln_probability.exp()
}

/// Multiplier `exp(λ (u − 0.5))` of a scale kernel; its log is the Hastings ratio.
pub fn scale_multiplier(rng: &mut RngHandle, tuning: f64) -> f64 {
    (tuning * (rng.uniform_real() - 0.5)).exp()
}

/// Symmetric addend `δ ~ U(−w, w)` of a window kernel.
pub fn window_addend(rng: &mut RngHandle, window: f64) -> f64 {
    rng.uniform_range(-window, window)
}

/// Reflects `value` into `[lower, upper]` by folding at both bounds.
pub fn reflect_into(value: f64, lower: f64, upper: f64) -> f64 {
    let width = upper - lower;
    let period = 2.0 * width;
    let mut offset = (value - lower).rem_euclid(period);
    if offset > width {
        offset = period - offset;
    }
    lower + offset
}

/// As [`reflect_into`], but a value folded exactly onto a bound is nudged
/// one relative epsilon inside, so the result lies in `(lower, upper)`.
pub fn reflect_into_open_interval(value: f64, lower: f64, upper: f64) -> f64 {
    let folded = reflect_into(value, lower, upper);
    let nudge = (upper - lower) * f64::EPSILON;
    if folded <= lower {
        lower + nudge
    } else if folded >= upper {
        upper - nudge
    } else {
        folded
    }
}

/// Reflects `value` at zero.
pub fn reflect_non_negative(value: f64) -> f64 {
    value.abs()
}
