use coevo_core::errors::{EcoError, ErrorInfo};

use crate::parameter::{Domain, RealParameter};

/// Effective population sizes of one comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum PopulationSizes {
    /// Root and every leaf share one value.
    Constrained(RealParameter),
    /// Root and each leaf carry their own value.
    Independent {
        /// Ancestral (root) population size.
        root: RealParameter,
        /// Descendant population sizes, one per leaf.
        leaves: Vec<RealParameter>,
    },
}

impl PopulationSizes {
    fn values_into(&self, out: &mut Vec<f64>) {
        out.clear();
        match self {
            PopulationSizes::Constrained(size) => out.push(size.value()),
            PopulationSizes::Independent { root, leaves } => {
                out.push(root.value());
                out.extend(leaves.iter().map(RealParameter::value));
            }
        }
    }

    fn parameter_count(&self) -> usize {
        match self {
            PopulationSizes::Constrained(_) => 1,
            PopulationSizes::Independent { leaves, .. } => 1 + leaves.len(),
        }
    }
}

/// Values captured by [`ComparisonState::snapshot_into`] and written back on rollback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSnapshot {
    sizes: Vec<f64>,
    mutation_rate: f64,
    freq_1: f64,
    ln_likelihood: f64,
    dirty: bool,
}

/// One population pair (two leaves) or singleton lineage (one leaf).
///
/// The divergence height is not stored here; it lives in the collection's
/// event arena and is reached through the comparison's event index.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonState {
    label: String,
    leaf_count: usize,
    sizes: PopulationSizes,
    mutation_rate: RealParameter,
    freq_1: RealParameter,
    ln_likelihood: f64,
    dirty: bool,
}

impl ComparisonState {
    /// Assembles a comparison and checks its shape.
    pub fn new(
        label: impl Into<String>,
        leaf_count: usize,
        sizes: PopulationSizes,
        mutation_rate: RealParameter,
        freq_1: RealParameter,
    ) -> Result<Self, EcoError> {
        let label = label.into();
        if !(1..=2).contains(&leaf_count) {
            return Err(EcoError::Model(
                ErrorInfo::new("leaf-count", "comparisons have one or two leaves")
                    .with_context("comparison", &label)
                    .with_context("leaf_count", leaf_count),
            ));
        }
        if let PopulationSizes::Independent { leaves, .. } = &sizes {
            if leaves.len() != leaf_count {
                return Err(EcoError::Model(
                    ErrorInfo::new("leaf-size-count", "one population size is needed per leaf")
                        .with_context("comparison", &label)
                        .with_context("leaf_count", leaf_count)
                        .with_context("sizes", leaves.len()),
                ));
            }
        }
        Ok(Self {
            label,
            leaf_count,
            sizes,
            mutation_rate,
            freq_1,
            ln_likelihood: 0.0,
            dirty: true,
        })
    }

    /// Comparison label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of leaves (1 for a singleton, 2 for a pair).
    pub fn leaf_node_count(&self) -> usize {
        self.leaf_count
    }

    /// Whether root and leaf sizes are constrained equal.
    pub fn population_sizes_constrained(&self) -> bool {
        matches!(self.sizes, PopulationSizes::Constrained(_))
    }

    /// Whether no population size of this comparison can move.
    pub fn population_sizes_fixed(&self) -> bool {
        match &self.sizes {
            PopulationSizes::Constrained(size) => size.is_fixed(),
            PopulationSizes::Independent { root, leaves } => {
                root.is_fixed() && leaves.iter().all(RealParameter::is_fixed)
            }
        }
    }

    /// Whether the root size (the shared size when constrained) is fixed.
    pub fn root_population_size_fixed(&self) -> bool {
        match &self.sizes {
            PopulationSizes::Constrained(size) => size.is_fixed(),
            PopulationSizes::Independent { root, .. } => root.is_fixed(),
        }
    }

    /// Ancestral population size.
    pub fn root_population_size(&self) -> f64 {
        match &self.sizes {
            PopulationSizes::Constrained(size) => size.value(),
            PopulationSizes::Independent { root, .. } => root.value(),
        }
    }

    /// Sets the ancestral population size (the shared size when constrained).
    pub fn set_root_population_size(&mut self, value: f64) -> Result<(), EcoError> {
        self.root_parameter_mut().set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    /// Population size of leaf `index`.
    pub fn child_population_size(&self, index: usize) -> Result<f64, EcoError> {
        match &self.sizes {
            PopulationSizes::Constrained(size) if index < self.leaf_count => Ok(size.value()),
            PopulationSizes::Independent { leaves, .. } if index < leaves.len() => {
                Ok(leaves[index].value())
            }
            _ => Err(self.leaf_out_of_range(index)),
        }
    }

    /// Sets the population size of leaf `index` (the shared size when constrained).
    pub fn set_child_population_size(&mut self, index: usize, value: f64) -> Result<(), EcoError> {
        self.child_parameter_mut(index)?.set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    /// Scales the root size; returns the number of free dimensions moved.
    pub fn scale_root_population_size(&mut self, multiplier: f64) -> Result<i32, EcoError> {
        let moved = self.root_parameter_mut().scale(multiplier)?;
        self.dirty |= moved > 0;
        Ok(moved)
    }

    /// Scales the size of leaf `index`; returns the number of free dimensions moved.
    pub fn scale_child_population_size(
        &mut self,
        index: usize,
        multiplier: f64,
    ) -> Result<i32, EcoError> {
        let moved = self.child_parameter_mut(index)?.scale(multiplier)?;
        self.dirty |= moved > 0;
        Ok(moved)
    }

    /// Multiplies every free population size by `multiplier`.
    ///
    /// Returns the signed count of free dimensions scaled, the exponent of
    /// `multiplier` in the Jacobian.
    pub fn scale_population_sizes(&mut self, multiplier: f64) -> Result<i32, EcoError> {
        let moved = match &mut self.sizes {
            PopulationSizes::Constrained(size) => size.scale(multiplier)?,
            PopulationSizes::Independent { root, leaves } => {
                let mut moved = root.scale(multiplier)?;
                for leaf in leaves.iter_mut() {
                    moved += leaf.scale(multiplier)?;
                }
                moved
            }
        };
        self.dirty |= moved != 0;
        Ok(moved)
    }

    /// Mixes sizes against a height multiplier: leaf sizes follow `multiplier`,
    /// the root size moves by its inverse. A constrained size follows `multiplier`.
    pub fn mix_population_sizes(&mut self, multiplier: f64) -> Result<i32, EcoError> {
        let moved = match &mut self.sizes {
            PopulationSizes::Constrained(size) => size.scale(multiplier)?,
            PopulationSizes::Independent { root, leaves } => {
                let mut moved = -root.scale(1.0 / multiplier)?;
                for leaf in leaves.iter_mut() {
                    moved += leaf.scale(multiplier)?;
                }
                moved
            }
        };
        if !self.population_sizes_fixed() {
            self.dirty = true;
        }
        Ok(moved)
    }

    /// Whether sizes are independent and every one of them is free, so
    /// they can be redistributed among root and leaves.
    pub fn relative_population_sizes_free(&self) -> bool {
        match &self.sizes {
            PopulationSizes::Constrained(_) => false,
            PopulationSizes::Independent { root, leaves } => {
                !root.is_fixed() && !leaves.iter().any(RealParameter::is_fixed)
            }
        }
    }

    /// Leaf sizes followed by the root size. A constrained comparison
    /// reports its shared size once per branch.
    pub fn population_sizes(&self) -> Vec<f64> {
        match &self.sizes {
            PopulationSizes::Constrained(size) => vec![size.value(); self.leaf_count + 1],
            PopulationSizes::Independent { root, leaves } => leaves
                .iter()
                .map(RealParameter::value)
                .chain(std::iter::once(root.value()))
                .collect(),
        }
    }

    /// Writes sizes in the order of [`population_sizes`](Self::population_sizes).
    ///
    /// Only independent sizes can be set this way; every value must be
    /// valid before any is written.
    pub fn set_population_sizes(&mut self, sizes: &[f64]) -> Result<(), EcoError> {
        let PopulationSizes::Independent { root, leaves } = &mut self.sizes else {
            return Err(EcoError::Model(
                ErrorInfo::new(
                    "constrained-sizes",
                    "constrained sizes cannot be set branch by branch",
                )
                .with_context("comparison", &self.label),
            ));
        };
        if sizes.len() != leaves.len() + 1 {
            return Err(EcoError::Model(
                ErrorInfo::new("size-count", "one size is needed per branch")
                    .with_context("comparison", &self.label)
                    .with_context("branches", leaves.len() + 1)
                    .with_context("sizes", sizes.len()),
            ));
        }
        if let Some(&bad) = sizes.iter().find(|&&size| !Domain::Positive.contains(size)) {
            return Err(EcoError::Model(
                ErrorInfo::new("parameter-out-of-domain", "population sizes must be positive")
                    .with_context("comparison", &self.label)
                    .with_context("value", bad),
            ));
        }
        if root.is_fixed() || leaves.iter().any(RealParameter::is_fixed) {
            return Err(EcoError::Model(
                ErrorInfo::new("fixed-parameter-update", "attempted to move a fixed size")
                    .with_context("comparison", &self.label),
            ));
        }
        for (leaf, &value) in leaves.iter_mut().zip(sizes) {
            leaf.set_value(value)?;
        }
        root.set_value(sizes[sizes.len() - 1])?;
        self.dirty = true;
        Ok(())
    }

    /// Mean of the branch sizes.
    pub fn mean_population_size(&self) -> f64 {
        let sizes = self.population_sizes();
        sizes.iter().sum::<f64>() / sizes.len() as f64
    }

    /// Mutation rate parameter.
    pub fn mutation_rate_parameter(&self) -> &RealParameter {
        &self.mutation_rate
    }

    /// Current mutation rate.
    pub fn mutation_rate(&self) -> f64 {
        self.mutation_rate.value()
    }

    /// Sets the mutation rate.
    pub fn set_mutation_rate(&mut self, value: f64) -> Result<(), EcoError> {
        self.mutation_rate.set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    /// Scales the mutation rate; returns the number of free dimensions moved.
    pub fn scale_mutation_rate(&mut self, multiplier: f64) -> Result<i32, EcoError> {
        let moved = self.mutation_rate.scale(multiplier)?;
        self.dirty |= moved > 0;
        Ok(moved)
    }

    /// Ancestral frequency parameter.
    pub fn freq_1_parameter(&self) -> &RealParameter {
        &self.freq_1
    }

    /// Current frequency of the first allele.
    pub fn freq_1(&self) -> f64 {
        self.freq_1.value()
    }

    /// Sets the frequency of the first allele.
    pub fn set_freq_1(&mut self, value: f64) -> Result<(), EcoError> {
        self.freq_1.set_value(value)?;
        self.dirty = true;
        Ok(())
    }

    /// Number of free population size dimensions.
    pub fn free_population_size_count(&self) -> usize {
        match &self.sizes {
            PopulationSizes::Constrained(size) => usize::from(!size.is_fixed()),
            PopulationSizes::Independent { root, leaves } => {
                usize::from(!root.is_fixed()) + leaves.iter().filter(|leaf| !leaf.is_fixed()).count()
            }
        }
    }

    /// Log prior density of sizes, mutation rate and frequency.
    pub fn ln_prior(&self) -> f64 {
        let sizes = match &self.sizes {
            PopulationSizes::Constrained(size) => size.ln_prior(),
            PopulationSizes::Independent { root, leaves } => {
                root.ln_prior() + leaves.iter().map(RealParameter::ln_prior).sum::<f64>()
            }
        };
        sizes + self.mutation_rate.ln_prior() + self.freq_1.ln_prior()
    }

    /// Cached log likelihood.
    pub fn ln_likelihood(&self) -> f64 {
        self.ln_likelihood
    }

    pub(crate) fn set_ln_likelihood(&mut self, value: f64) {
        self.ln_likelihood = value;
        self.dirty = false;
    }

    /// Whether the cached likelihood is stale.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the cached likelihood as stale.
    pub fn make_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the stale flag.
    pub fn make_clean(&mut self) {
        self.dirty = false;
    }

    /// Captures rollback state, reusing the snapshot's buffers.
    pub fn snapshot_into(&self, snapshot: &mut ComparisonSnapshot) {
        self.sizes.values_into(&mut snapshot.sizes);
        snapshot.mutation_rate = self.mutation_rate.value();
        snapshot.freq_1 = self.freq_1.value();
        snapshot.ln_likelihood = self.ln_likelihood;
        snapshot.dirty = self.dirty;
    }

    /// Captures rollback state into a fresh snapshot.
    pub fn snapshot(&self) -> ComparisonSnapshot {
        let mut snapshot = ComparisonSnapshot::default();
        self.snapshot_into(&mut snapshot);
        snapshot
    }

    /// Writes a snapshot back.
    pub fn restore(&mut self, snapshot: &ComparisonSnapshot) -> Result<(), EcoError> {
        if snapshot.sizes.len() != self.sizes.parameter_count() {
            return Err(EcoError::Model(
                ErrorInfo::new("snapshot-shape", "snapshot does not match comparison")
                    .with_context("comparison", &self.label),
            ));
        }
        match &mut self.sizes {
            PopulationSizes::Constrained(size) => size.restore_value(snapshot.sizes[0]),
            PopulationSizes::Independent { root, leaves } => {
                root.restore_value(snapshot.sizes[0]);
                for (leaf, value) in leaves.iter_mut().zip(&snapshot.sizes[1..]) {
                    leaf.restore_value(*value);
                }
            }
        }
        self.mutation_rate.restore_value(snapshot.mutation_rate);
        self.freq_1.restore_value(snapshot.freq_1);
        self.ln_likelihood = snapshot.ln_likelihood;
        self.dirty = snapshot.dirty;
        Ok(())
    }

    fn root_parameter_mut(&mut self) -> &mut RealParameter {
        match &mut self.sizes {
            PopulationSizes::Constrained(size) => size,
            PopulationSizes::Independent { root, .. } => root,
        }
    }

    fn child_parameter_mut(&mut self, index: usize) -> Result<&mut RealParameter, EcoError> {
        if index >= self.leaf_count {
            return Err(self.leaf_out_of_range(index));
        }
        Ok(match &mut self.sizes {
            PopulationSizes::Constrained(size) => size,
            PopulationSizes::Independent { leaves, .. } => &mut leaves[index],
        })
    }

    fn leaf_out_of_range(&self, index: usize) -> EcoError {
        EcoError::Model(
            ErrorInfo::new("leaf-index", "leaf index out of range")
                .with_context("comparison", &self.label)
                .with_context("index", index)
                .with_context("leaf_count", self.leaf_count),
        )
    }
}
