//! Reversible-jump split and merge moves on the event partition.

use std::f64::consts::LN_2;

use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::math::{ln_number_of_ordered_splits, split_subset_size_probabilities};
use coevo_core::RngHandle;
use tracing::trace;

use crate::collection::{EventModel, ModelCollection};
use crate::moves_time::TimeOperator;
use crate::operator::{metropolis_hastings_step, Operator, OperatorCore, OperatorKind};
use crate::tuning::TuningState;

/// Split and merge moves for the split-weight event model.
///
/// A split picks a shared event, draws a new height uniformly between that
/// event and the next younger one (or zero), and moves a random proper
/// subset of its comparisons there. Every ordered split of the `n` members
/// is equally likely. A merge picks any event but the oldest and folds it
/// into the next older event, which keeps its height. Each proposal is
/// the exact reverse of the other, so the ratio is built from the counts
/// of shared events, events and splits plus the width of the height gap.
/// The partition prior itself is part of the collection's prior.
///
/// Every call runs one jump per comparison, each followed by a sweep of an
/// event height scaler.
#[derive(Debug, Clone)]
pub struct ReversibleJumpSampler {
    core: OperatorCore,
    height_scaler: TimeOperator,
}

impl ReversibleJumpSampler {
    /// Creates the sampler; `height_scale` tunes the height scaler sweep.
    pub fn new(weight: f64, height_scale: f64) -> Self {
        Self {
            core: OperatorCore::untuned(weight),
            height_scaler: TimeOperator::height_scaler(1.0, height_scale),
        }
    }

    fn require_split_weight(collection: &ModelCollection) -> Result<(), EcoError> {
        match collection.event_model() {
            EventModel::SplitWeight => Ok(()),
            _ => Err(EcoError::Operator(
                ErrorInfo::new(
                    "not-a-split-weight-model",
                    "the reversible-jump sampler needs a split-weight event model",
                )
                .with_hint("use a split-weight event model or drop the operator"),
            )),
        }
    }

    fn propose_split(
        &self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
    ) -> Result<f64, EcoError> {
        let events_before = collection.number_of_events();
        let shared = collection.shared_event_indices();
        let event = shared[rng.uniform_index(shared.len())];
        let height = collection.event_height(event)?;
        let lower = collection.nearest_smaller_height(event)?;
        let new_height = rng.uniform_range(lower, height);

        let members = collection.event_members(event);
        let sizes = split_subset_size_probabilities(members.len());
        let subset_size = rng.weighted_index(&sizes)? + 1;
        let moving: Vec<usize> = rng
            .random_subset_indices(members.len(), subset_size)
            .into_iter()
            .map(|position| members[position])
            .collect();
        collection.split_event(&moving, new_height)?;

        let mut ln_hastings = ln_number_of_ordered_splits(members.len())
            + (shared.len() as f64).ln()
            + (height - lower).ln()
            - (events_before as f64).ln();
        ln_hastings += split_choice_correction(
            events_before == 1,
            collection.number_of_events() == collection.number_of_comparisons(),
        );
        trace!(event, subset_size, new_height, ln_hastings, "proposed split");
        Ok(ln_hastings)
    }

    fn propose_merge(
        &self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
    ) -> Result<f64, EcoError> {
        let all_separate_before =
            collection.number_of_events() == collection.number_of_comparisons();
        let candidates = collection.events_sans_oldest();
        let moving = candidates[rng.uniform_index(candidates.len())];
        let Some(target) = collection.nearest_larger_event(moving)? else {
            return Err(EcoError::invariant(
                "merge-without-target",
                "only the oldest event lacks an older neighbour",
            ));
        };
        let merged = collection.merge_events(moving, target)?;

        let merged_size = collection.event_size(merged);
        let gap = collection.event_height(merged)? - collection.nearest_smaller_height(merged)?;
        let mut ln_hastings = (collection.number_of_events() as f64).ln()
            - ((collection.shared_event_indices().len() as f64).ln()
                + ln_number_of_ordered_splits(merged_size)
                + gap.ln());
        ln_hastings -= split_choice_correction(collection.number_of_events() == 1, all_separate_before);
        trace!(moving, target, merged_size, ln_hastings, "proposed merge");
        Ok(ln_hastings)
    }
}

/// Log ratio of choosing the reverse merge over choosing this split. Both
/// directions are drawn with probability one half, except that a single
/// event can only split and fully separate events can only merge.
fn split_choice_correction(one_event_before: bool, all_separate_after: bool) -> f64 {
    match (one_event_before, all_separate_after) {
        (true, false) => -LN_2,
        (false, true) => LN_2,
        _ => 0.0,
    }
}

impl Operator for ReversibleJumpSampler {
    fn kind(&self) -> OperatorKind {
        OperatorKind::ReversibleJumpSampler
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
        let events = collection.number_of_events();
        let all_separate = events == collection.number_of_comparisons();
        let split = !all_separate && (events == 1 || rng.uniform_real() < 0.5);
        if split {
            self.propose_split(rng, collection)
        } else {
            self.propose_merge(rng, collection)
        }
    }

    /// With fewer than two comparisons there is a single partition and
    /// nothing to do.
    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        Self::require_split_weight(collection)?;
        let comparisons = collection.number_of_comparisons();
        if comparisons < 2 {
            return Ok(());
        }
        for _ in 0..comparisons {
            metropolis_hastings_step(self, rng, collection, state, 0)?;
            self.height_scaler
                .perform_collection_move(rng, collection, state)?;
        }
        Ok(())
    }

    fn sweep_operators(&self) -> Vec<&dyn Operator> {
        vec![&self.height_scaler]
    }
}
