use coevo_core::{ln_dirichlet_pdf, EcoError, RngHandle};

use crate::collection::ModelCollection;
use crate::comparison::ComparisonState;
use crate::config::OperatorSettings;
use crate::operator::{
    metropolis_hastings_step, reflect_into_open_interval, scale_multiplier, window_addend,
    Operator, OperatorCore, OperatorKind, Scope,
};
use crate::tuning::TuningState;

/// Per-comparison parameter moved by a [`TreeOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeMove {
    /// Scale the root population size.
    RootSizeScale,
    /// Scale one uniformly chosen leaf population size.
    LeafSizeScale,
    /// Scale the mutation rate.
    MutationRateScale,
    /// Reflected random walk on the ancestral frequency.
    FreqWindow,
    /// Dirichlet draw of new size proportions around the current ones.
    RelativeSizeMix,
    /// Scale every size of the comparison together.
    MeanSizeScale,
    /// Add to the root size, taking it evenly from the leaves.
    RootRelativeWindow,
    /// Add to one leaf size, taking it evenly from the other branches.
    LeafRelativeWindow,
}

/// Univariate operator on a parameter owned by a comparison.
///
/// In global scope every comparison whose target is free gets its own
/// accept/reject step; fixed targets are skipped.
#[derive(Debug, Clone)]
pub struct TreeOperator {
    kind: TreeMove,
    scope: Scope,
    core: OperatorCore,
}

impl TreeOperator {
    /// Root population size scaler.
    pub fn root_population_size_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TreeMove::RootSizeScale, weight, scale)
    }

    /// Leaf population size scaler.
    pub fn leaf_population_size_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TreeMove::LeafSizeScale, weight, scale)
    }

    /// Mutation rate scaler.
    pub fn mutation_rate_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TreeMove::MutationRateScale, weight, scale)
    }

    /// Ancestral frequency mover.
    pub fn freq_mover(weight: f64, window: f64) -> Self {
        Self::new(TreeMove::FreqWindow, weight, window)
    }

    /// Size proportion mixer. Larger `scale` values propose proportions
    /// further from the current ones.
    pub fn relative_population_size_mixer(weight: f64, scale: f64) -> Self {
        Self::new(TreeMove::RelativeSizeMix, weight, scale)
    }

    /// Scaler of all sizes at once.
    pub fn mean_population_size_scaler(weight: f64, scale: f64) -> Self {
        Self::new(TreeMove::MeanSizeScale, weight, scale)
    }

    /// Root-against-leaves size mover.
    pub fn root_relative_population_size_mover(weight: f64, window: f64) -> Self {
        Self::new(TreeMove::RootRelativeWindow, weight, window)
    }

    /// Leaf-against-the-rest size mover.
    pub fn leaf_relative_population_size_mover(weight: f64, window: f64) -> Self {
        Self::new(TreeMove::LeafRelativeWindow, weight, window)
    }

    /// Every tree operator with its configured weight and tuning, including
    /// disabled ones.
    pub fn from_settings(settings: &OperatorSettings) -> Vec<Self> {
        vec![
            Self::root_population_size_scaler(
                settings.root_population_size_scaler.weight,
                settings.root_population_size_scaler.scale,
            ),
            Self::leaf_population_size_scaler(
                settings.leaf_population_size_scaler.weight,
                settings.leaf_population_size_scaler.scale,
            ),
            Self::mutation_rate_scaler(
                settings.mutation_rate_scaler.weight,
                settings.mutation_rate_scaler.scale,
            ),
            Self::freq_mover(settings.freq_mover.weight, settings.freq_mover.window),
            Self::relative_population_size_mixer(
                settings.relative_population_size_mixer.weight,
                settings.relative_population_size_mixer.scale,
            ),
            Self::mean_population_size_scaler(
                settings.mean_population_size_scaler.weight,
                settings.mean_population_size_scaler.scale,
            ),
            Self::root_relative_population_size_mover(
                settings.root_relative_population_size_mover.weight,
                settings.root_relative_population_size_mover.window,
            ),
            Self::leaf_relative_population_size_mover(
                settings.leaf_relative_population_size_mover.weight,
                settings.leaf_relative_population_size_mover.window,
            ),
        ]
    }

    fn new(kind: TreeMove, weight: f64, tuning: f64) -> Self {
        Self {
            kind,
            scope: Scope::Global,
            core: OperatorCore::tuned(weight, tuning),
        }
    }

    /// Restricts the operator to one comparison.
    pub fn for_comparison(mut self, index: usize) -> Self {
        self.scope = Scope::Comparison(index);
        self
    }

    pub(crate) fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Move performed.
    pub fn tree_move(&self) -> TreeMove {
        self.kind
    }

    /// Whether the target of this operator can move in `comparison`.
    pub fn targets(&self, comparison: &ComparisonState) -> bool {
        match self.kind {
            TreeMove::RootSizeScale | TreeMove::LeafSizeScale | TreeMove::MeanSizeScale => {
                !comparison.population_sizes_fixed()
            }
            TreeMove::RelativeSizeMix
            | TreeMove::RootRelativeWindow
            | TreeMove::LeafRelativeWindow => comparison.relative_population_sizes_free(),
            TreeMove::MutationRateScale => !comparison.mutation_rate_parameter().is_fixed(),
            TreeMove::FreqWindow => !comparison.freq_1_parameter().is_fixed(),
        }
    }
}

impl Operator for TreeOperator {
    fn kind(&self) -> OperatorKind {
        match self.kind {
            TreeMove::RootSizeScale => OperatorKind::RootPopulationSizeScaler,
            TreeMove::LeafSizeScale => OperatorKind::LeafPopulationSizeScaler,
            TreeMove::MutationRateScale => OperatorKind::MutationRateScaler,
            TreeMove::FreqWindow => OperatorKind::FreqMover,
            TreeMove::RelativeSizeMix => OperatorKind::RelativePopulationSizeMixer,
            TreeMove::MeanSizeScale => OperatorKind::MeanPopulationSizeScaler,
            TreeMove::RootRelativeWindow => OperatorKind::RootRelativePopulationSizeMover,
            TreeMove::LeafRelativeWindow => OperatorKind::LeafRelativePopulationSizeMover,
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
        let tuning = self.core.tuning_value();
        let comparison = collection.comparison_mut(index)?;
        match self.kind {
            TreeMove::FreqWindow => {
                let proposed = reflect_into_open_interval(
                    comparison.freq_1() + window_addend(rng, tuning),
                    0.0,
                    1.0,
                );
                comparison.set_freq_1(proposed)?;
                Ok(0.0)
            }
            TreeMove::RootSizeScale => {
                let multiplier = scale_multiplier(rng, tuning);
                let moved = comparison.scale_root_population_size(multiplier)?;
                Ok(f64::from(moved) * multiplier.ln())
            }
            TreeMove::LeafSizeScale => {
                let leaf = rng.uniform_index(comparison.leaf_node_count());
                let multiplier = scale_multiplier(rng, tuning);
                let moved = comparison.scale_child_population_size(leaf, multiplier)?;
                Ok(f64::from(moved) * multiplier.ln())
            }
            TreeMove::MutationRateScale => {
                let multiplier = scale_multiplier(rng, tuning);
                let moved = comparison.scale_mutation_rate(multiplier)?;
                Ok(f64::from(moved) * multiplier.ln())
            }
            TreeMove::MeanSizeScale => {
                let multiplier = scale_multiplier(rng, tuning);
                let moved = comparison.scale_population_sizes(multiplier)?;
                Ok(f64::from(moved) * multiplier.ln())
            }
            TreeMove::RelativeSizeMix => propose_size_proportions(rng, comparison, tuning),
            TreeMove::RootRelativeWindow => {
                let mut sizes = comparison.population_sizes();
                let leaves = sizes.len() - 1;
                let addend = window_addend(rng, tuning);
                let share = addend / leaves as f64;
                for (branch, size) in sizes.iter_mut().enumerate() {
                    *size += if branch == leaves { addend } else { -share };
                }
                shift_population_sizes(comparison, &sizes)
            }
            TreeMove::LeafRelativeWindow => {
                let mut sizes = comparison.population_sizes();
                let leaves = sizes.len() - 1;
                let addend = window_addend(rng, tuning);
                let chosen = rng.uniform_index(leaves);
                let share = addend / leaves as f64;
                for (branch, size) in sizes.iter_mut().enumerate() {
                    *size += if branch == chosen { addend } else { -share };
                }
                shift_population_sizes(comparison, &sizes)
            }
        }
    }

    fn perform_collection_move(
        &mut self,
        rng: &mut RngHandle,
        collection: &mut ModelCollection,
        state: &TuningState,
    ) -> Result<(), EcoError> {
        let indices = match self.scope {
            Scope::Global => 0..collection.number_of_comparisons(),
            Scope::Comparison(index) => index..index + 1,
        };
        for index in indices {
            if self.targets(collection.comparison(index)?) {
                metropolis_hastings_step(self, rng, collection, state, index)?;
            }
        }
        Ok(())
    }
}

/// Draws new proportions from a Dirichlet centred on the current ones,
/// keeping the total size. The change of variables between sizes and
/// proportions has the same Jacobian both ways, so only the two Dirichlet
/// densities enter the Hastings ratio.
fn propose_size_proportions(
    rng: &mut RngHandle,
    comparison: &mut ComparisonState,
    scale: f64,
) -> Result<f64, EcoError> {
    let sizes = comparison.population_sizes();
    let total: f64 = sizes.iter().sum();
    let current: Vec<f64> = sizes.iter().map(|size| size / total).collect();
    let concentration = |proportions: &[f64]| -> Vec<f64> {
        proportions
            .iter()
            .map(|proportion| 1.0 + proportion / scale)
            .collect()
    };
    let forward = concentration(&current);
    let proposed = rng.dirichlet(&forward)?;
    if proposed.iter().any(|&proportion| proportion <= 0.0) {
        return Ok(f64::NEG_INFINITY);
    }
    let reverse = concentration(&proposed);
    let ln_hastings = ln_dirichlet_pdf(&current, &reverse) - ln_dirichlet_pdf(&proposed, &forward);
    let resized: Vec<f64> = proposed.iter().map(|proportion| proportion * total).collect();
    comparison.set_population_sizes(&resized)?;
    Ok(ln_hastings)
}

/// Writes sizes moved by a sum-preserving window; a non-positive size is an
/// impossible proposal. The move is its own inverse, so the ratio is zero.
fn shift_population_sizes(comparison: &mut ComparisonState, sizes: &[f64]) -> Result<f64, EcoError> {
    if sizes.iter().any(|&size| size <= 0.0) {
        return Ok(f64::NEG_INFINITY);
    }
    comparison.set_population_sizes(sizes)?;
    Ok(0.0)
}
