//! The model collection: comparisons plus the event arena holding their
//! shared divergence heights.
//!
//! Each comparison refers to its event through an index into the height arena.
//! After every reassignment the indices are re-standardized (dense, in
//! first-appearance order), so two collections with the same clustering
//! report the same partition.

use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::math::{
    ln_ewens_probability, ln_split_weight_probability, log_sum_exp, partition_signature,
    standardize_partition,
};
use coevo_core::{Prior, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::comparison::{ComparisonSnapshot, ComparisonState, PopulationSizes};
use crate::config::{EventModelConfig, InitialPartition, ModelConfig};
use crate::likelihood::{IgnoreData, LikelihoodModel};
use crate::parameter::{Domain, RealParameter};

/// How the event partition is allowed to evolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventModel {
    /// The partition never changes.
    Fixed,
    /// The partition follows a Dirichlet process prior and is resampled by Gibbs moves.
    DirichletProcess,
    /// Each partition with `k` events has prior weight `w^(k - 1)`; the
    /// partition is resampled by reversible-jump split and merge moves.
    SplitWeight,
}

impl EventModel {
    /// Whether the partition is random and needs the concentration slot
    /// (the Dirichlet process concentration or the split weight).
    pub fn has_concentration(&self) -> bool {
        matches!(self, EventModel::DirichletProcess | EventModel::SplitWeight)
    }
}

/// Full rollback state of a [`ModelCollection`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSnapshot {
    comparisons: Vec<ComparisonSnapshot>,
    event_heights: Vec<f64>,
    event_of: Vec<usize>,
    concentration: Option<f64>,
    ln_likelihood: f64,
    ln_prior: f64,
}

impl CollectionSnapshot {
    /// Event heights at capture time.
    pub fn event_heights(&self) -> &[f64] {
        &self.event_heights
    }

    /// Event assignment at capture time.
    pub fn event_of(&self) -> &[usize] {
        &self.event_of
    }
}

/// Comparisons, their event partition and the cached posterior terms.
#[derive(Debug)]
pub struct ModelCollection {
    comparisons: Vec<ComparisonState>,
    event_heights: Vec<f64>,
    event_of: Vec<usize>,
    event_time_prior: Prior,
    event_model: EventModel,
    concentration: Option<RealParameter>,
    likelihood: Box<dyn LikelihoodModel>,
    ln_likelihood: f64,
    ln_prior: f64,
    stored: CollectionSnapshot,
    has_stored: bool,
}

impl ModelCollection {
    /// Builds a collection from comparisons and an initial partition.
    ///
    /// `partition` may use any labels; it is standardized first, and
    /// `heights[k]` is the height of standardized event `k`.
    pub fn new(
        comparisons: Vec<ComparisonState>,
        event_time_prior: Prior,
        partition: &[usize],
        heights: Vec<f64>,
        event_model: EventModel,
        concentration: Option<RealParameter>,
    ) -> Result<Self, EcoError> {
        event_time_prior.validate()?;
        if comparisons.is_empty() {
            return Err(EcoError::invariant(
                "empty-collection",
                "a collection needs at least one comparison",
            ));
        }
        if partition.len() != comparisons.len() {
            return Err(EcoError::Model(
                ErrorInfo::new("partition-length", "partition must assign every comparison")
                    .with_context("comparisons", comparisons.len())
                    .with_context("partition", partition.len()),
            ));
        }
        let event_of = standardize_partition(partition);
        let events = event_of.iter().max().map_or(0, |max| max + 1);
        if heights.len() != events {
            return Err(EcoError::Model(
                ErrorInfo::new("height-count", "one height is needed per event")
                    .with_context("events", events)
                    .with_context("heights", heights.len()),
            ));
        }
        if event_model.has_concentration() && concentration.is_none() {
            return Err(EcoError::invariant(
                "missing-concentration",
                "a random partition needs a concentration or split weight parameter",
            ));
        }
        let mut collection = Self {
            comparisons,
            event_heights: heights,
            event_of,
            event_time_prior,
            event_model,
            concentration,
            likelihood: Box::new(IgnoreData),
            ln_likelihood: 0.0,
            ln_prior: 0.0,
            stored: CollectionSnapshot::default(),
            has_stored: false,
        };
        collection.validate()?;
        collection.compute_log_likelihood_and_prior()?;
        Ok(collection)
    }

    /// Builds a collection from configuration, drawing unset values from their priors.
    pub fn from_config(config: &ModelConfig, rng: &mut RngHandle) -> Result<Self, EcoError> {
        config.validate()?;
        let mut comparisons = Vec::with_capacity(config.comparisons.len());
        for comparison in &config.comparisons {
            let size = &comparison.population_size;
            let sizes = if size.constrained {
                PopulationSizes::Constrained(size.parameter().build(
                    "population_size",
                    Domain::Positive,
                    rng,
                )?)
            } else {
                let root = size
                    .parameter()
                    .build("root_population_size", Domain::Positive, rng)?;
                let mut leaves = Vec::with_capacity(comparison.leaf_count);
                for _ in 0..comparison.leaf_count {
                    leaves.push(size.parameter().build(
                        "leaf_population_size",
                        Domain::Positive,
                        rng,
                    )?);
                }
                PopulationSizes::Independent { root, leaves }
            };
            let mutation_rate =
                comparison
                    .mutation_rate
                    .build("mutation_rate", Domain::Positive, rng)?;
            let freq_1 = comparison
                .freq_1
                .build("freq_1", Domain::OpenUnitInterval, rng)?;
            comparisons.push(ComparisonState::new(
                comparison.label.clone(),
                comparison.leaf_count,
                sizes,
                mutation_rate,
                freq_1,
            )?);
        }

        let n = comparisons.len();
        let (event_model, concentration, partition) = match &config.event_model {
            EventModelConfig::Independent => (EventModel::Fixed, None, (0..n).collect::<Vec<_>>()),
            EventModelConfig::Shared => (EventModel::Fixed, None, vec![0; n]),
            EventModelConfig::Fixed { partition } => (EventModel::Fixed, None, partition.clone()),
            EventModelConfig::DirichletProcess {
                concentration,
                initial_partition,
            } => {
                let alpha = concentration.resolve_value(n)?;
                let parameter = match (&concentration.prior, concentration.estimate) {
                    (Some(prior), true) => RealParameter::estimated(
                        "concentration",
                        alpha,
                        prior.clone(),
                        Domain::Positive,
                    )?,
                    _ => RealParameter::fixed("concentration", alpha, Domain::Positive)?,
                };
                let partition: Vec<usize> = match initial_partition {
                    InitialPartition::Singletons => (0..n).collect(),
                    InitialPartition::Shared => vec![0; n],
                    InitialPartition::Explicit { partition } => partition.clone(),
                    InitialPartition::FromPrior => draw_crp_partition(n, alpha, rng),
                };
                (EventModel::DirichletProcess, Some(parameter), partition)
            }
            EventModelConfig::SplitWeight {
                split_weight,
                initial_partition,
            } => {
                let weight = split_weight.value;
                let parameter = match (&split_weight.prior, split_weight.estimate) {
                    (Some(prior), true) => RealParameter::estimated(
                        "split_weight",
                        weight,
                        prior.clone(),
                        Domain::Positive,
                    )?,
                    _ => RealParameter::fixed("split_weight", weight, Domain::Positive)?,
                };
                let partition: Vec<usize> = match initial_partition {
                    InitialPartition::Singletons => (0..n).collect(),
                    InitialPartition::Shared => vec![0; n],
                    InitialPartition::Explicit { partition } => partition.clone(),
                    InitialPartition::FromPrior => draw_split_weight_partition(n, weight, rng),
                };
                (EventModel::SplitWeight, Some(parameter), partition)
            }
        };
        let events = standardize_partition(&partition)
            .iter()
            .max()
            .map_or(0, |max| max + 1);
        let mut heights = Vec::with_capacity(events);
        for _ in 0..events {
            heights.push(config.event_time_prior.draw(rng)?);
        }
        Self::new(
            comparisons,
            config.event_time_prior.clone(),
            &partition,
            heights,
            event_model,
            concentration,
        )
    }

    /// Replaces the likelihood model and refreshes the cached terms.
    pub fn with_likelihood(mut self, likelihood: Box<dyn LikelihoodModel>) -> Result<Self, EcoError> {
        self.likelihood = likelihood;
        self.make_dirty();
        self.compute_log_likelihood_and_prior()?;
        Ok(self)
    }

    /// Number of comparisons (trees).
    pub fn number_of_comparisons(&self) -> usize {
        self.comparisons.len()
    }

    /// Number of distinct events.
    pub fn number_of_events(&self) -> usize {
        self.event_heights.len()
    }

    /// Event model governing the partition.
    pub fn event_model(&self) -> EventModel {
        self.event_model
    }

    /// Prior on event heights.
    pub fn event_time_prior(&self) -> &Prior {
        &self.event_time_prior
    }

    /// Comparison `index`.
    pub fn comparison(&self, index: usize) -> Result<&ComparisonState, EcoError> {
        self.comparisons
            .get(index)
            .ok_or_else(|| comparison_out_of_range(index, self.comparisons.len()))
    }

    /// Mutable comparison `index`.
    pub fn comparison_mut(&mut self, index: usize) -> Result<&mut ComparisonState, EcoError> {
        let len = self.comparisons.len();
        self.comparisons
            .get_mut(index)
            .ok_or_else(|| comparison_out_of_range(index, len))
    }

    /// Iterator over all comparisons.
    pub fn comparisons(&self) -> impl Iterator<Item = &ComparisonState> {
        self.comparisons.iter()
    }

    /// Event index of comparison `index`.
    pub fn event_index(&self, index: usize) -> Result<usize, EcoError> {
        self.event_of
            .get(index)
            .copied()
            .ok_or_else(|| comparison_out_of_range(index, self.comparisons.len()))
    }

    /// Height of event `event`.
    pub fn event_height(&self, event: usize) -> Result<f64, EcoError> {
        self.event_heights
            .get(event)
            .copied()
            .ok_or_else(|| event_out_of_range(event, self.event_heights.len()))
    }

    /// Height of comparison `index`, read through its event.
    pub fn height_of_comparison(&self, index: usize) -> Result<f64, EcoError> {
        self.event_height(self.event_index(index)?)
    }

    /// Sets the height of event `event`; every member becomes dirty.
    pub fn set_event_height(&mut self, event: usize, height: f64) -> Result<(), EcoError> {
        if event >= self.event_heights.len() {
            return Err(event_out_of_range(event, self.event_heights.len()));
        }
        check_height(height)?;
        self.event_heights[event] = height;
        for (comparison, &assigned) in self.comparisons.iter_mut().zip(&self.event_of) {
            if assigned == event {
                comparison.make_dirty();
            }
        }
        Ok(())
    }

    /// Sets the height of the event that comparison `index` belongs to.
    pub fn set_height_of_comparison(&mut self, index: usize, height: f64) -> Result<(), EcoError> {
        let event = self.event_index(index)?;
        self.set_event_height(event, height)
    }

    /// Comparisons assigned to `event`, in index order.
    pub fn event_members(&self, event: usize) -> Vec<usize> {
        self.event_of
            .iter()
            .enumerate()
            .filter(|(_, &assigned)| assigned == event)
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of comparisons assigned to `event`.
    pub fn event_size(&self, event: usize) -> usize {
        self.event_of.iter().filter(|&&assigned| assigned == event).count()
    }

    /// Standardized event assignment, one entry per comparison.
    pub fn partition(&self) -> &[usize] {
        &self.event_of
    }

    /// Canonical partition string such as `"0,1,0"`.
    pub fn partition_signature(&self) -> String {
        partition_signature(&self.event_of)
    }

    /// Dirichlet process concentration or split weight, if the partition is random.
    pub fn concentration(&self) -> Option<f64> {
        self.concentration.as_ref().map(RealParameter::value)
    }

    /// Concentration parameter, if any.
    pub fn concentration_parameter(&self) -> Option<&RealParameter> {
        self.concentration.as_ref()
    }

    /// Sets the concentration.
    pub fn set_concentration(&mut self, value: f64) -> Result<(), EcoError> {
        match self.concentration.as_mut() {
            Some(parameter) => parameter.set_value(value),
            None => Err(EcoError::invariant(
                "missing-concentration",
                "collection has no concentration parameter",
            )),
        }
    }

    /// Moves comparison `index` into existing event `event`.
    ///
    /// Emptied events are dropped and indices re-standardized.
    pub fn remap_comparison(&mut self, index: usize, event: usize) -> Result<(), EcoError> {
        if index >= self.comparisons.len() {
            return Err(comparison_out_of_range(index, self.comparisons.len()));
        }
        if event >= self.event_heights.len() {
            return Err(event_out_of_range(event, self.event_heights.len()));
        }
        if self.event_of[index] != event {
            self.event_of[index] = event;
            self.comparisons[index].make_dirty();
            self.standardize();
        }
        Ok(())
    }

    /// Moves comparison `index` into a new event at `height`.
    pub fn map_comparison_to_new_event(&mut self, index: usize, height: f64) -> Result<(), EcoError> {
        if index >= self.comparisons.len() {
            return Err(comparison_out_of_range(index, self.comparisons.len()));
        }
        check_height(height)?;
        self.event_heights.push(height);
        self.event_of[index] = self.event_heights.len() - 1;
        self.comparisons[index].make_dirty();
        self.standardize();
        debug!(
            comparison = index,
            height,
            events = self.event_heights.len(),
            "moved comparison to a new event"
        );
        Ok(())
    }

    /// Events holding more than one comparison.
    pub fn shared_event_indices(&self) -> Vec<usize> {
        (0..self.event_heights.len())
            .filter(|&event| self.event_size(event) > 1)
            .collect()
    }

    /// Events from youngest to oldest; ties in height keep index order.
    pub fn events_by_height(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.event_heights.len()).collect();
        order.sort_by(|&a, &b| {
            self.event_heights[a]
                .total_cmp(&self.event_heights[b])
                .then(a.cmp(&b))
        });
        order
    }

    /// Every event except the oldest.
    pub fn events_sans_oldest(&self) -> Vec<usize> {
        let mut order = self.events_by_height();
        order.pop();
        order
    }

    /// Height of the event just younger than `event`, or zero for the youngest.
    pub fn nearest_smaller_height(&self, event: usize) -> Result<f64, EcoError> {
        let order = self.events_by_height();
        let position = self.position_in_order(&order, event)?;
        Ok(match position.checked_sub(1) {
            Some(previous) => self.event_heights[order[previous]],
            None => 0.0,
        })
    }

    /// The event just older than `event`, if any.
    pub fn nearest_larger_event(&self, event: usize) -> Result<Option<usize>, EcoError> {
        let order = self.events_by_height();
        let position = self.position_in_order(&order, event)?;
        Ok(order.get(position + 1).copied())
    }

    fn position_in_order(&self, order: &[usize], event: usize) -> Result<usize, EcoError> {
        order
            .iter()
            .position(|&candidate| candidate == event)
            .ok_or_else(|| event_out_of_range(event, self.event_heights.len()))
    }

    /// Moves `members` (a proper, non-empty subset of one event) into a new
    /// event at `height`. Returns the new event's index.
    pub fn split_event(&mut self, members: &[usize], height: f64) -> Result<usize, EcoError> {
        let Some(&first) = members.first() else {
            return Err(EcoError::invariant("empty-split", "a split needs at least one comparison"));
        };
        let event = self.event_index(first)?;
        for &member in members {
            if self.event_index(member)? != event {
                return Err(EcoError::Model(
                    ErrorInfo::new("split-across-events", "split members must share one event")
                        .with_context("comparison", member)
                        .with_context("event", event),
                ));
            }
        }
        if members.len() >= self.event_size(event) {
            return Err(EcoError::Model(
                ErrorInfo::new("split-empties-event", "a split must leave the event non-empty")
                    .with_context("event", event),
            ));
        }
        check_height(height)?;
        self.event_heights.push(height);
        let fresh = self.event_heights.len() - 1;
        for &member in members {
            self.event_of[member] = fresh;
            self.comparisons[member].make_dirty();
        }
        self.standardize();
        self.event_index(first)
    }

    /// Moves every comparison of event `moving` into event `target`, which
    /// keeps its height. Returns the merged event's index.
    pub fn merge_events(&mut self, moving: usize, target: usize) -> Result<usize, EcoError> {
        let events = self.event_heights.len();
        for event in [moving, target] {
            if event >= events {
                return Err(event_out_of_range(event, events));
            }
        }
        if moving == target {
            return Err(EcoError::Model(
                ErrorInfo::new("self-merge", "an event cannot be merged into itself")
                    .with_context("event", moving),
            ));
        }
        let anchor = self.event_members(target)[0];
        for index in 0..self.event_of.len() {
            if self.event_of[index] == moving {
                self.event_of[index] = target;
                self.comparisons[index].make_dirty();
            }
        }
        self.standardize();
        self.event_index(anchor)
    }

    fn standardize(&mut self) {
        let relabelled = standardize_partition(&self.event_of);
        let events = relabelled.iter().max().map_or(0, |max| max + 1);
        let mut heights = vec![0.0; events];
        for (&old, &new) in self.event_of.iter().zip(&relabelled) {
            heights[new] = self.event_heights[old];
        }
        self.event_of = relabelled;
        self.event_heights = heights;
    }

    /// Checks the arena invariants: dense indices, non-empty events, valid heights.
    pub fn validate(&self) -> Result<(), EcoError> {
        let events = self.event_heights.len();
        let mut sizes = vec![0usize; events];
        for (index, &event) in self.event_of.iter().enumerate() {
            if event >= events {
                return Err(EcoError::Model(
                    ErrorInfo::new("dangling-event", "comparison references a missing event")
                        .with_context("comparison", index)
                        .with_context("event", event),
                ));
            }
            sizes[event] += 1;
        }
        if let Some(empty) = sizes.iter().position(|&size| size == 0) {
            return Err(EcoError::Model(
                ErrorInfo::new("empty-event", "event has no member comparisons")
                    .with_context("event", empty),
            ));
        }
        for &height in &self.event_heights {
            check_height(height)?;
        }
        Ok(())
    }

    /// Marks every comparison's likelihood stale.
    pub fn make_dirty(&mut self) {
        for comparison in &mut self.comparisons {
            comparison.make_dirty();
        }
    }

    /// Clears every stale flag.
    pub fn make_clean(&mut self) {
        for comparison in &mut self.comparisons {
            comparison.make_clean();
        }
    }

    /// Recomputes stale likelihoods and the full log prior.
    pub fn compute_log_likelihood_and_prior(&mut self) -> Result<(), EcoError> {
        let mut ln_likelihood = 0.0;
        let mut ln_prior = 0.0;
        for (comparison, &event) in self.comparisons.iter_mut().zip(&self.event_of) {
            if comparison.is_dirty() {
                let value = self
                    .likelihood
                    .log_likelihood(comparison, self.event_heights[event])?;
                comparison.set_ln_likelihood(value);
            }
            ln_likelihood += comparison.ln_likelihood();
            ln_prior += comparison.ln_prior();
        }
        for &height in &self.event_heights {
            ln_prior += self.event_time_prior.ln_pdf(height);
        }
        if let Some(concentration) = &self.concentration {
            ln_prior += concentration.ln_prior();
            ln_prior += match self.event_model {
                EventModel::DirichletProcess => {
                    ln_ewens_probability(&self.event_of, concentration.value())
                }
                EventModel::SplitWeight => {
                    ln_split_weight_probability(&self.event_of, concentration.value())
                }
                EventModel::Fixed => 0.0,
            };
        }
        self.ln_likelihood = ln_likelihood;
        self.ln_prior = ln_prior;
        Ok(())
    }

    /// Log likelihood of comparison `index` if its event were at `height`.
    pub fn log_likelihood_at(&self, index: usize, height: f64) -> Result<f64, EcoError> {
        self.likelihood.log_likelihood(self.comparison(index)?, height)
    }

    /// Cached log likelihood.
    pub fn log_likelihood(&self) -> f64 {
        self.ln_likelihood
    }

    /// Cached log prior density.
    pub fn log_prior_density_value(&self) -> f64 {
        self.ln_prior
    }

    /// Log likelihood at the last [`store_state`](Self::store_state).
    pub fn stored_log_likelihood(&self) -> Result<f64, EcoError> {
        self.require_stored()?;
        Ok(self.stored.ln_likelihood)
    }

    /// Log prior at the last [`store_state`](Self::store_state).
    pub fn stored_log_prior_density_value(&self) -> Result<f64, EcoError> {
        self.require_stored()?;
        Ok(self.stored.ln_prior)
    }

    /// Captures the full state into the internal snapshot buffer.
    pub fn store_state(&mut self) {
        let concentration = self.concentration();
        let stored = &mut self.stored;
        stored
            .comparisons
            .resize_with(self.comparisons.len(), ComparisonSnapshot::default);
        for (comparison, snapshot) in self.comparisons.iter().zip(stored.comparisons.iter_mut()) {
            comparison.snapshot_into(snapshot);
        }
        stored.event_heights.clone_from(&self.event_heights);
        stored.event_of.clone_from(&self.event_of);
        stored.concentration = concentration;
        stored.ln_likelihood = self.ln_likelihood;
        stored.ln_prior = self.ln_prior;
        self.has_stored = true;
    }

    /// Swaps the stored snapshot back in.
    pub fn restore_state(&mut self) -> Result<(), EcoError> {
        self.require_stored()?;
        for (comparison, snapshot) in self.comparisons.iter_mut().zip(&self.stored.comparisons) {
            comparison.restore(snapshot)?;
        }
        self.event_heights.clone_from(&self.stored.event_heights);
        self.event_of.clone_from(&self.stored.event_of);
        if let (Some(parameter), Some(value)) = (self.concentration.as_mut(), self.stored.concentration)
        {
            parameter.restore_value(value);
        }
        self.ln_likelihood = self.stored.ln_likelihood;
        self.ln_prior = self.stored.ln_prior;
        self.has_stored = false;
        Ok(())
    }

    /// Drops the stored snapshot after an accepted move.
    pub fn discard_stored_state(&mut self) {
        self.has_stored = false;
    }

    /// Returns a copy of the full current state, for comparisons in diagnostics.
    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            comparisons: self.comparisons.iter().map(ComparisonState::snapshot).collect(),
            event_heights: self.event_heights.clone(),
            event_of: self.event_of.clone(),
            concentration: self.concentration(),
            ln_likelihood: self.ln_likelihood,
            ln_prior: self.ln_prior,
        }
    }

    /// Draws a height from the event-time prior.
    pub fn draw_event_height(&self, rng: &mut RngHandle) -> Result<f64, EcoError> {
        self.event_time_prior.draw(rng)
    }

    fn require_stored(&self) -> Result<(), EcoError> {
        if self.has_stored {
            Ok(())
        } else {
            Err(EcoError::invariant(
                "no-stored-state",
                "restore requested without a stored snapshot",
            ))
        }
    }
}

/// Sequential draw from the split-weight prior.
///
/// `ln_completions[r][j]` is the log of the summed weight of every way to
/// place `r` more elements given `j` blocks so far, each new block counting
/// `split_weight`. Element by element, a new block is opened with
/// probability proportional to its completions; otherwise an existing block
/// is picked uniformly.
fn draw_split_weight_partition(elements: usize, split_weight: f64, rng: &mut RngHandle) -> Vec<usize> {
    if elements == 0 {
        return Vec::new();
    }
    let ln_weight = split_weight.ln();
    let mut ln_completions = vec![vec![0.0; elements + 2]; elements];
    for remaining in 1..elements {
        for blocks in 1..=elements {
            ln_completions[remaining][blocks] = log_sum_exp(&[
                (blocks as f64).ln() + ln_completions[remaining - 1][blocks],
                ln_weight + ln_completions[remaining - 1][blocks + 1],
            ]);
        }
    }
    let mut partition = Vec::with_capacity(elements);
    partition.push(0);
    let mut blocks = 1;
    for placed in 1..elements {
        let remaining = elements - placed;
        let ln_new = ln_weight + ln_completions[remaining - 1][blocks + 1]
            - ln_completions[remaining][blocks];
        if rng.uniform_real() < ln_new.exp() {
            partition.push(blocks);
            blocks += 1;
        } else {
            partition.push(rng.uniform_index(blocks));
        }
    }
    partition
}

/// Sequential Chinese restaurant process draw.
fn draw_crp_partition(elements: usize, concentration: f64, rng: &mut RngHandle) -> Vec<usize> {
    let mut partition: Vec<usize> = Vec::with_capacity(elements);
    let mut sizes: Vec<usize> = Vec::new();
    for placed in 0..elements {
        let u = rng.uniform_real() * (placed as f64 + concentration);
        let mut cumulative = 0.0;
        let mut table = sizes.len();
        for (index, &size) in sizes.iter().enumerate() {
            cumulative += size as f64;
            if u < cumulative {
                table = index;
                break;
            }
        }
        if table == sizes.len() {
            sizes.push(0);
        }
        sizes[table] += 1;
        partition.push(table);
    }
    partition
}

fn check_height(height: f64) -> Result<(), EcoError> {
    if height.is_finite() && height >= 0.0 {
        Ok(())
    } else {
        Err(EcoError::Model(
            ErrorInfo::new("invalid-height", "event heights must be finite and non-negative")
                .with_context("height", height),
        ))
    }
}

fn comparison_out_of_range(index: usize, len: usize) -> EcoError {
    EcoError::Model(
        ErrorInfo::new("comparison-index", "comparison index out of range")
            .with_context("index", index)
            .with_context("comparisons", len),
    )
}

fn event_out_of_range(event: usize, len: usize) -> EcoError {
    EcoError::Model(
        ErrorInfo::new("event-index", "event index out of range")
            .with_context("event", event)
            .with_context("events", len),
    )
}
