use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::RngHandle;
use tracing::debug;

use crate::collection::{EventModel, ModelCollection};
use crate::config::OperatorScheduleConfig;
use crate::moves_dpp::{ConcentrationScaler, DirichletProcessGibbsSampler};
use crate::moves_jump::ReversibleJumpSampler;
use crate::moves_time::{TimeOperator, UnivariateSweep};
use crate::moves_tree::TreeOperator;
use crate::operator::{Operator, OperatorReport};
use crate::tuning::{TuningState, DEFAULT_TARGET_ACCEPTANCE};

/// Weighted set of operators with the schedule-wide tuning controls.
///
/// Each draw picks an operator with probability proportional to its weight
/// and counts as one iteration toward the auto-optimize delay.
#[derive(Debug)]
pub struct OperatorSchedule {
    operators: Vec<Box<dyn Operator>>,
    cumulative_weights: Vec<f64>,
    total_weight: f64,
    auto_optimize: bool,
    auto_optimize_delay: u64,
    iteration: u64,
    target_acceptance: f64,
}

impl Default for OperatorSchedule {
    fn default() -> Self {
        Self::new(true, 1_000)
    }
}

impl OperatorSchedule {
    /// Empty schedule.
    pub fn new(auto_optimize: bool, auto_optimize_delay: u64) -> Self {
        Self {
            operators: Vec::new(),
            cumulative_weights: Vec::new(),
            total_weight: 0.0,
            auto_optimize,
            auto_optimize_delay,
            iteration: 0,
            target_acceptance: DEFAULT_TARGET_ACCEPTANCE,
        }
    }

    /// Builds the schedule for `collection`, skipping operators with zero
    /// weight or without anything to move.
    ///
    /// Composite time operators get a sweep built from the same settings,
    /// limited to the univariate operators that are enabled and have
    /// something to move here.
    pub fn from_config(
        config: &OperatorScheduleConfig,
        collection: &ModelCollection,
    ) -> Result<Self, EcoError> {
        let mut schedule = Self::new(config.auto_optimize, config.auto_optimize_delay);
        schedule.target_acceptance = config.target_acceptance;
        let settings = &config.operators;
        let sweep = UnivariateSweep::from_settings(settings).retain_targets(collection);
        let concentration_free = collection
            .concentration_parameter()
            .is_some_and(|parameter| !parameter.is_fixed());

        let mut candidates: Vec<Box<dyn Operator>> = vec![
            Box::new(TimeOperator::height_scaler(
                settings.event_height_scaler.weight,
                settings.event_height_scaler.scale,
            )),
            Box::new(TimeOperator::height_mover(
                settings.event_height_mover.weight,
                settings.event_height_mover.window,
            )),
        ];
        let composites = [
            TimeOperator::height_size_scaler(
                settings.height_size_scaler.weight,
                settings.height_size_scaler.scale,
            ),
            TimeOperator::height_size_mixer(
                settings.height_size_mixer.weight,
                settings.height_size_mixer.scale,
            ),
            TimeOperator::height_size_rate_scaler(
                settings.height_size_rate_scaler.weight,
                settings.height_size_rate_scaler.scale,
            ),
            TimeOperator::height_size_rate_mixer(
                settings.height_size_rate_mixer.weight,
                settings.height_size_rate_mixer.scale,
            ),
            TimeOperator::time_root_size_mixer(
                settings.time_root_size_mixer.weight,
                settings.time_root_size_mixer.scale,
            ),
        ];
        for operator in composites {
            if collection
                .comparisons()
                .any(|comparison| operator.targets(comparison))
            {
                candidates.push(Box::new(operator.with_sweep(sweep.clone())));
            }
        }
        for operator in TreeOperator::from_settings(settings) {
            if collection
                .comparisons()
                .any(|comparison| operator.targets(comparison))
            {
                candidates.push(Box::new(operator));
            }
        }
        match collection.event_model() {
            EventModel::DirichletProcess => {
                candidates.push(Box::new(DirichletProcessGibbsSampler::new(
                    settings.dirichlet_process_gibbs.weight,
                    settings.dirichlet_process_gibbs.auxiliary_categories,
                )));
            }
            EventModel::SplitWeight if collection.number_of_comparisons() > 1 => {
                candidates.push(Box::new(ReversibleJumpSampler::new(
                    settings.reversible_jump.weight,
                    settings.event_height_scaler.scale,
                )));
            }
            EventModel::SplitWeight | EventModel::Fixed => {}
        }
        if concentration_free {
            candidates.push(Box::new(ConcentrationScaler::new(
                settings.concentration_scaler.weight,
                settings.concentration_scaler.scale,
            )));
        }

        for operator in candidates {
            if operator.weight() > 0.0 {
                schedule.add_operator(operator)?;
            }
        }
        if schedule.is_empty() {
            return Err(EcoError::config(
                "empty-schedule",
                "no operator has a positive weight and something to move",
            ));
        }
        Ok(schedule)
    }

    /// Registers an operator; its weight and tuning must be positive and finite.
    pub fn add_operator(&mut self, operator: Box<dyn Operator>) -> Result<(), EcoError> {
        let weight = operator.weight();
        if !(weight.is_finite() && weight > 0.0) {
            return Err(EcoError::Operator(
                ErrorInfo::new("operator-weight", "operator weights must be positive")
                    .with_context("operator", operator.name())
                    .with_context("weight", weight),
            ));
        }
        if let Some(tuning) = operator.tuning() {
            tuning.validate().map_err(|err| {
                EcoError::Operator(err.info().clone().with_context("operator", operator.name()))
            })?;
        }
        debug!(operator = %operator.name(), weight, "registered operator");
        self.total_weight += weight;
        self.cumulative_weights.push(self.total_weight);
        self.operators.push(operator);
        Ok(())
    }

    fn draw_index(&self, rng: &mut RngHandle) -> Result<usize, EcoError> {
        let Some(last) = self.operators.len().checked_sub(1) else {
            return Err(EcoError::Operator(ErrorInfo::new(
                "empty-schedule",
                "cannot draw from a schedule without operators",
            )));
        };
        let u = rng.uniform_range(0.0, self.total_weight);
        Ok(self
            .cumulative_weights
            .iter()
            .position(|&cumulative| u < cumulative)
            .unwrap_or(last))
    }

    /// Draws an operator proportional to weight and advances the iteration
    /// count. The returned state is the tuning view for this draw.
    pub fn draw_operator(
        &mut self,
        rng: &mut RngHandle,
    ) -> Result<(&mut dyn Operator, TuningState), EcoError> {
        let index = self.draw_index(rng)?;
        let state = self.tuning_state();
        self.iteration += 1;
        Ok((self.operators[index].as_mut(), state))
    }

    /// Draws an operator and runs one collection move with it.
    pub fn step(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
    ) -> Result<(), EcoError> {
        let (operator, state) = self.draw_operator(rng)?;
        operator.operate(rng, collection, &state, 1)
    }

    /// Tuning view at the current iteration.
    pub fn tuning_state(&self) -> TuningState {
        TuningState {
            auto_optimize: self.auto_optimize,
            auto_optimize_delay: self.auto_optimize_delay,
            iteration: self.iteration,
            target_acceptance: self.target_acceptance,
        }
    }

    /// Enables adaptation.
    pub fn turn_on_auto_optimize(&mut self) {
        self.auto_optimize = true;
    }

    /// Freezes every tuning parameter.
    pub fn turn_off_auto_optimize(&mut self) {
        self.auto_optimize = false;
    }

    /// Whether adaptation is enabled.
    pub fn auto_optimize(&self) -> bool {
        self.auto_optimize
    }

    /// Sets the number of iterations before adaptation starts.
    pub fn set_auto_optimize_delay(&mut self, delay: u64) {
        self.auto_optimize_delay = delay;
    }

    /// Iterations before adaptation starts.
    pub fn auto_optimize_delay(&self) -> u64 {
        self.auto_optimize_delay
    }

    /// Sets the acceptance rate targeted by adaptation.
    pub fn set_target_acceptance(&mut self, target: f64) -> Result<(), EcoError> {
        if !(target > 0.0 && target < 1.0) {
            return Err(EcoError::Operator(
                ErrorInfo::new("target-acceptance", "target acceptance must lie in (0, 1)")
                    .with_context("value", target),
            ));
        }
        self.target_acceptance = target;
        Ok(())
    }

    /// Operators drawn so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Sum of operator weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Number of operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Whether no operator is registered.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Registered operators in insertion order.
    pub fn operators(&self) -> impl Iterator<Item = &dyn Operator> {
        self.operators.iter().map(|operator| operator.as_ref())
    }

    /// Per-operator reports in insertion order.
    pub fn reports(&self) -> Vec<OperatorReport> {
        self.operators
            .iter()
            .map(|operator| operator.report(self.total_weight))
            .collect()
    }
}
