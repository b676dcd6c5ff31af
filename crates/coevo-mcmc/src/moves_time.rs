use coevo_core::{EcoError, RngHandle};

use crate::collection::ModelCollection;
use crate::comparison::ComparisonState;
use crate::config::OperatorSettings;
use crate::moves_tree::TreeOperator;
use crate::operator::{
    metropolis_hastings_step, reflect_non_negative, scale_multiplier, window_addend, Operator,
    OperatorCore, OperatorKind, Scope,
};
use crate::tuning::TuningState;

/// Height move performed by a [`TimeOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMove {
    /// Scale the height.
    HeightScale,
    /// Reflected random walk on the height.
    HeightWindow,
    /// Scale the height and every free size of the members.
    HeightSizeScale,
    /// Scale the height and leaf sizes, root size by the inverse.
    HeightSizeMix,
    /// As `HeightSizeScale`, with the mutation rate moved by the inverse.
    HeightSizeRateScale,
    /// As `HeightSizeMix`, with the mutation rate moved by the inverse.
    HeightSizeRateMix,
    /// Scale one comparison's root size and shift its height so that the
    /// height plus twice the root size stays constant.
    RootSizeMix,
}

impl TimeMove {
    fn is_composite(&self) -> bool {
        !matches!(self, TimeMove::HeightScale | TimeMove::HeightWindow)
    }
}

/// Operator on an event height, optionally dragging linked parameters along.
///
/// Global scope performs one accept/reject step per event, moving the
/// parameters of every member comparison with the height. Comparison scope
/// moves the height of that comparison's event and only that comparison's
/// linked parameters. Composite moves draw one multiplier, apply it (or its
/// inverse) to every free target and return the summed log Jacobian. The
/// root size mixer works per comparison in both scopes.
///
/// Composite operators follow their joint move with a [`UnivariateSweep`],
/// without which the ratios between a comparison's sizes could never change.
#[derive(Debug, Clone)]
pub struct TimeOperator {
    kind: TimeMove,
    scope: Scope,
    core: OperatorCore,
    sweep: UnivariateSweep,
}

impl TimeOperator {
    /// Event height scaler.
    pub fn height_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::HeightScale, weight, scale)
    }

    /// Event height mover.
    pub fn height_mover(weight: f64, window: f64) -> Self {
        Self::new(TimeMove::HeightWindow, weight, window)
    }

    /// Joint height and size scaler.
    pub fn height_size_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::HeightSizeScale, weight, scale)
    }

    /// Joint height and size mixer.
    pub fn height_size_mixer(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::HeightSizeMix, weight, scale)
    }

    /// Joint height, size and rate scaler.
    pub fn height_size_rate_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::HeightSizeRateScale, weight, scale)
    }

    /// Joint height, size and rate mixer.
    pub fn height_size_rate_mixer(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::HeightSizeRateMix, weight, scale)
    }

    /// Joint root size and height mixer.
    pub fn time_root_size_mixer(weight: f64, scale: f64) -> Self {
        Self::new(TimeMove::RootSizeMix, weight, scale)
    }

    /// Composite operators start with the sweep of the default settings.
    fn new(kind: TimeMove, weight: f64, tuning: f64) -> Self {
        let sweep = if kind.is_composite() {
            UnivariateSweep::from_settings(&OperatorSettings::default())
        } else {
            UnivariateSweep::default()
        };
        Self {
            kind,
            scope: Scope::Global,
            core: OperatorCore::tuned(weight, tuning),
            sweep,
        }
    }

    /// Restricts the operator and its sweep to one comparison.
    pub fn for_comparison(self, index: usize) -> Self {
        self.with_scope(Scope::Comparison(index))
    }

    fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self.sweep = self.sweep.with_scope(scope);
        self
    }

    /// Replaces the sweep, scoping it like this operator.
    pub fn with_sweep(mut self, sweep: UnivariateSweep) -> Self {
        self.sweep = sweep.with_scope(self.scope);
        self
    }

    /// Drops the univariate sweep that follows a composite move.
    pub fn without_sweep(self) -> Self {
        self.with_sweep(UnivariateSweep::default())
    }

    /// Operators run after each composite move.
    pub fn sweep(&self) -> Vec<&dyn Operator> {
        self.sweep.operators()
    }

    /// Move performed.
    pub fn time_move(&self) -> TimeMove {
        self.kind
    }

    /// Whether this operator can move anything in `comparison`. Every
    /// comparison has a height; the root size mixer also needs a free root.
    pub fn targets(&self, comparison: &ComparisonState) -> bool {
        match self.kind {
            TimeMove::RootSizeMix => !comparison.root_population_size_fixed(),
            _ => true,
        }
    }

    fn propose_root_size_mix(
        &self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        index: usize,
    ) -> Result<f64, EcoError> {
        let event = collection.event_index(index)?;
        let height = collection.event_height(event)?;
        let old_size = collection.comparison(index)?.root_population_size();
        let multiplier = scale_multiplier(rng, self.core.tuning_value());
        let new_size = old_size * multiplier;
        let new_height = height + 2.0 * (old_size - new_size);
        if new_height < 0.0 {
            return Ok(f64::NEG_INFINITY);
        }
        collection
            .comparison_mut(index)?
            .set_root_population_size(new_size)?;
        collection.set_event_height(event, new_height)?;
        Ok(multiplier.ln())
    }
}

impl Operator for TimeOperator {
    fn kind(&self) -> OperatorKind {
        match self.kind {
            TimeMove::HeightScale => OperatorKind::EventHeightScaler,
            TimeMove::HeightWindow => OperatorKind::EventHeightMover,
            TimeMove::HeightSizeScale => OperatorKind::HeightSizeScaler,
            TimeMove::HeightSizeMix => OperatorKind::HeightSizeMixer,
            TimeMove::HeightSizeRateScale => OperatorKind::HeightSizeRateScaler,
            TimeMove::HeightSizeRateMix => OperatorKind::HeightSizeRateMixer,
            TimeMove::RootSizeMix => OperatorKind::TimeRootSizeMixer,
        }
    }

    fn core(&self) -> &OperatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut OperatorCore {
        &mut self.core
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn propose(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        index: usize,
    ) -> Result<f64, EcoError> {
        if self.kind == TimeMove::RootSizeMix {
            return self.propose_root_size_mix(rng, collection, index);
        }
        let (event, members) = match self.scope {
            Scope::Global => (index, collection.event_members(index)),
            Scope::Comparison(_) => (collection.event_index(index)?, vec![index]),
        };
        let tuning = self.core.tuning_value();
        let height = collection.event_height(event)?;

        if self.kind == TimeMove::HeightWindow {
            // Zero is inside the height domain, so the fold never needs to reject.
            let proposed = reflect_non_negative(height + window_addend(rng, tuning));
            collection.set_event_height(event, proposed)?;
            return Ok(0.0);
        }

        let multiplier = scale_multiplier(rng, tuning);
        collection.set_event_height(event, height * multiplier)?;
        let mut dimensions = 1;
        for member in members {
            let comparison = collection.comparison_mut(member)?;
            dimensions += match self.kind {
                TimeMove::HeightSizeScale | TimeMove::HeightSizeRateScale => {
                    comparison.scale_population_sizes(multiplier)?
                }
                TimeMove::HeightSizeMix | TimeMove::HeightSizeRateMix => {
                    comparison.mix_population_sizes(multiplier)?
                }
                TimeMove::HeightScale | TimeMove::HeightWindow | TimeMove::RootSizeMix => 0,
            };
            if matches!(
                self.kind,
                TimeMove::HeightSizeRateScale | TimeMove::HeightSizeRateMix
            ) {
                dimensions -= comparison.scale_mutation_rate(1.0 / multiplier)?;
            }
        }
        Ok(f64::from(dimensions) * multiplier.ln())
    }

    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        match (self.scope, self.kind) {
            (Scope::Global, TimeMove::RootSizeMix) => {
                for index in 0..collection.number_of_comparisons() {
                    if self.targets(collection.comparison(index)?) {
                        metropolis_hastings_step(self, rng, collection, state, index)?;
                    }
                }
            }
            (Scope::Global, _) => {
                for event in 0..collection.number_of_events() {
                    metropolis_hastings_step(self, rng, collection, state, event)?;
                }
            }
            (Scope::Comparison(index), _) => {
                if self.targets(collection.comparison(index)?) {
                    metropolis_hastings_step(self, rng, collection, state, index)?;
                }
            }
        }
        self.sweep.perform(rng, collection, state)
    }

    fn sweep_operators(&self) -> Vec<&dyn Operator> {
        self.sweep.operators()
    }
}

/// Univariate operators run after every move of a composite operator.
///
/// The sweep holds its own copies of the operators, with their own counters
/// and step sizes, built from the same settings as the schedule. Kinds with
/// a zero weight are left out, so a parameter the user switched off is not
/// moved behind their back.
#[derive(Debug, Clone, Default)]
pub struct UnivariateSweep {
    heights: Vec<TimeOperator>,
    trees: Vec<TreeOperator>,
}

impl UnivariateSweep {
    /// Sweep of every enabled univariate operator in `settings`.
    pub fn from_settings(settings: &OperatorSettings) -> Self {
        let heights = [
            (settings.event_height_scaler.weight > 0.0).then(|| {
                TimeOperator::height_scaler(
                    settings.event_height_scaler.weight,
                    settings.event_height_scaler.scale,
                )
            }),
            (settings.event_height_mover.weight > 0.0).then(|| {
                TimeOperator::height_mover(
                    settings.event_height_mover.weight,
                    settings.event_height_mover.window,
                )
            }),
        ];
        let trees = TreeOperator::from_settings(settings)
            .into_iter()
            .filter(|operator| operator.weight() > 0.0)
            .collect();
        Self {
            heights: heights.into_iter().flatten().collect(),
            trees,
        }
    }

    /// Drops tree operators with nothing to move in `collection`.
    pub fn retain_targets(mut self, collection: &ModelCollection) -> Self {
        self.trees.retain(|operator| {
            collection
                .comparisons()
                .any(|comparison| operator.targets(comparison))
        });
        self
    }

    fn with_scope(mut self, scope: Scope) -> Self {
        self.heights = self
            .heights
            .into_iter()
            .map(|operator| operator.with_scope(scope))
            .collect();
        self.trees = self
            .trees
            .into_iter()
            .map(|operator| operator.with_scope(scope))
            .collect();
        self
    }

    /// Number of operators in the sweep.
    pub fn len(&self) -> usize {
        self.heights.len() + self.trees.len()
    }

    /// Whether the sweep is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Height operators first, then tree operators.
    pub fn operators(&self) -> Vec<&dyn Operator> {
        self.heights
            .iter()
            .map(|operator| operator as &dyn Operator)
            .chain(self.trees.iter().map(|operator| operator as &dyn Operator))
            .collect()
    }

    fn perform(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        for operator in self.heights.iter_mut() {
            operator.perform_collection_move(rng, collection, state)?;
        }
        for operator in self.trees.iter_mut() {
            operator.perform_collection_move(rng, collection, state)?;
        }
        Ok(())
    }
}
