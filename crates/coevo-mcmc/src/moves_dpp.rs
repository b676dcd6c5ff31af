use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::math::normalize_log_weights;
use coevo_core::RngHandle;
use tracing::debug;

use crate::collection::{EventModel, ModelCollection};
use crate::operator::{
    metropolis_hastings_step, scale_multiplier, Operator, OperatorCore, OperatorKind,
};
use crate::tuning::TuningState;

/// Default number of auxiliary categories offered per Gibbs update.
pub const DEFAULT_AUXILIARY_CATEGORIES: usize = 4;

#[derive(Debug, Clone, Copy)]
enum Candidate {
    Existing(usize),
    Fresh(f64),
}

/// Gibbs update of event membership under a Dirichlet process prior.
///
/// Each comparison in turn is offered every other event (weight `n_k`) and
/// `m` auxiliary events (weight `α / m`) whose heights are drawn from the
/// event-time prior; a comparison alone in its event keeps that event as one
/// of the auxiliary slots. Weights are multiplied by the comparison's
/// likelihood at the candidate height. With the likelihood ignored the update
/// samples the Chinese restaurant process exactly. Always accepted.
#[derive(Debug, Clone)]
pub struct DirichletProcessGibbsSampler {
    core: OperatorCore,
    auxiliary_categories: usize,
    candidates: Vec<Candidate>,
    ln_weights: Vec<f64>,
}

impl DirichletProcessGibbsSampler {
    /// Creates the sampler; zero auxiliary categories are raised to one.
    pub fn new(weight: f64, auxiliary_categories: usize) -> Self {
        Self {
            core: OperatorCore::untuned(weight),
            auxiliary_categories: auxiliary_categories.max(1),
            candidates: Vec::new(),
            ln_weights: Vec::new(),
        }
    }

    /// Auxiliary categories per update.
    pub fn auxiliary_categories(&self) -> usize {
        self.auxiliary_categories
    }

    fn require_concentration(collection: &ModelCollection) -> Result<f64, EcoError> {
        match (collection.event_model(), collection.concentration()) {
            (EventModel::DirichletProcess, Some(alpha)) => Ok(alpha),
            _ => Err(EcoError::Operator(
                ErrorInfo::new(
                    "not-a-dirichlet-process",
                    "the Gibbs sampler needs a Dirichlet process event model",
                )
                .with_hint("use a dirichlet-process event model or drop the operator"),
            )),
        }
    }
}

impl Operator for DirichletProcessGibbsSampler {
    fn kind(&self) -> OperatorKind {
        OperatorKind::DirichletProcessGibbsSampler
    }

    fn core(&self) -> &OperatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut OperatorCore {
        &mut self.core
    }

    /// Reassigns comparison `index`. The Gibbs draw needs no correction, so
    /// the returned log Hastings ratio is positive infinity.
    fn propose(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        index: usize,
    ) -> Result<f64, EcoError> {
        let alpha = Self::require_concentration(collection)?;
        let m = self.auxiliary_categories;
        let ln_auxiliary = (alpha / m as f64).ln();
        let own_event = collection.event_index(index)?;
        let singleton = collection.event_size(own_event) == 1;

        self.candidates.clear();
        self.ln_weights.clear();
        for event in 0..collection.number_of_events() {
            let size = collection.event_size(event);
            let ln_prior_weight = match (event == own_event, singleton) {
                (true, true) => ln_auxiliary,
                (true, false) => ((size - 1) as f64).ln(),
                (false, _) => (size as f64).ln(),
            };
            let height = collection.event_height(event)?;
            self.candidates.push(Candidate::Existing(event));
            self.ln_weights
                .push(ln_prior_weight + collection.log_likelihood_at(index, height)?);
        }
        let fresh = if singleton { m - 1 } else { m };
        for _ in 0..fresh {
            let height = collection.draw_event_height(rng)?;
            self.candidates.push(Candidate::Fresh(height));
            self.ln_weights
                .push(ln_auxiliary + collection.log_likelihood_at(index, height)?);
        }

        normalize_log_weights(&mut self.ln_weights)?;
        let choice = rng.weighted_index(&self.ln_weights)?;
        match self.candidates[choice] {
            Candidate::Existing(event) => {
                if event != own_event {
                    collection.remap_comparison(index, event)?;
                }
            }
            Candidate::Fresh(height) => {
                collection.map_comparison_to_new_event(index, height)?;
            }
        }
        Ok(f64::INFINITY)
    }

    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        Self::require_concentration(collection)?;
        let events_before = collection.number_of_events();
        for index in 0..collection.number_of_comparisons() {
            self.propose(rng, collection, index)?;
        }
        collection.validate()?;
        collection.compute_log_likelihood_and_prior()?;
        collection.make_clean();
        self.accept(state);
        debug!(
            events_before,
            events_after = collection.number_of_events(),
            partition = %collection.partition_signature(),
            "gibbs sweep over event assignments"
        );
        Ok(())
    }
}

/// Scale operator on the Dirichlet process concentration.
#[derive(Debug, Clone)]
pub struct ConcentrationScaler {
    core: OperatorCore,
}

impl ConcentrationScaler {
    /// Creates the scaler.
    pub fn new(weight: f64, scale: f64) -> Self {
        Self {
            core: OperatorCore::tuned(weight, scale),
        }
    }
}

impl Operator for ConcentrationScaler {
    fn kind(&self) -> OperatorKind {
        OperatorKind::ConcentrationScaler
    }

    fn core(&self) -> &OperatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut OperatorCore {
        &mut self.core
    }

    fn propose(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        _index: usize,
    ) -> Result<f64, EcoError> {
        let Some(alpha) = collection.concentration() else {
            return Err(EcoError::Operator(ErrorInfo::new(
                "missing-concentration",
                "collection has no concentration parameter to scale",
            )));
        };
        let multiplier = scale_multiplier(rng, self.core.tuning_value());
        collection.set_concentration(alpha * multiplier)?;
        Ok(multiplier.ln())
    }

    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        let estimated = collection
            .concentration_parameter()
            .is_some_and(|parameter| !parameter.is_fixed());
        if !estimated {
            return Err(EcoError::Operator(ErrorInfo::new(
                "concentration-not-estimated",
                "the concentration scaler needs an estimated concentration",
            )));
        }
        metropolis_hastings_step(self, rng, collection, state, 0)?;
        Ok(())
    }
}
