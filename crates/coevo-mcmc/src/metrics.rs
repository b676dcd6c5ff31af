use std::collections::BTreeMap;

use coevo_core::EcoError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::collection::ModelCollection;

/// Parameter values of one comparison at a sampled iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonSample {
    /// Height of the comparison's event.
    pub height: f64,
    /// Ancestral population size.
    pub root_population_size: f64,
    /// Leaf population sizes.
    pub leaf_population_sizes: Vec<f64>,
    /// Mutation rate.
    pub mutation_rate: f64,
    /// Frequency of the first allele.
    pub freq_1: f64,
}

/// State recorded at one sampled iteration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainSample {
    /// Iteration (1-based) at which the sample was taken.
    pub iteration: u64,
    /// Log likelihood.
    pub ln_likelihood: f64,
    /// Log prior density.
    pub ln_prior: f64,
    /// Number of distinct events.
    pub number_of_events: usize,
    /// Canonical partition string.
    pub partition: String,
    /// Dirichlet process concentration or split weight, if any.
    pub concentration: Option<f64>,
    /// Per-comparison values, in comparison order.
    pub comparisons: Vec<ComparisonSample>,
}

impl ChainSample {
    /// Captures the collection's current state.
    pub fn capture(iteration: u64, collection: &ModelCollection) -> Result<Self, EcoError> {
        let mut comparisons = Vec::with_capacity(collection.number_of_comparisons());
        for (index, comparison) in collection.comparisons().enumerate() {
            let mut leaf_population_sizes = Vec::with_capacity(comparison.leaf_node_count());
            for leaf in 0..comparison.leaf_node_count() {
                leaf_population_sizes.push(comparison.child_population_size(leaf)?);
            }
            comparisons.push(ComparisonSample {
                height: collection.height_of_comparison(index)?,
                root_population_size: comparison.root_population_size(),
                leaf_population_sizes,
                mutation_rate: comparison.mutation_rate(),
                freq_1: comparison.freq_1(),
            });
        }
        Ok(Self {
            iteration,
            ln_likelihood: collection.log_likelihood(),
            ln_prior: collection.log_prior_density_value(),
            number_of_events: collection.number_of_events(),
            partition: collection.partition_signature(),
            concentration: collection.concentration(),
            comparisons,
        })
    }
}

/// Online mean and variance (Welford).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RunningMoments {
    count: u64,
    mean: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl RunningMoments {
    /// Empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_sq += delta * (value - self.mean);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sample mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance (0 with fewer than two observations).
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.sum_sq / (self.count - 1) as f64
        }
    }

    /// Smallest observation.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest observation.
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Collects samples and partition frequencies over a run.
#[derive(Debug, Default)]
pub struct SampleRecorder {
    samples: Vec<ChainSample>,
    partition_counts: IndexMap<String, u64>,
    event_count_counts: BTreeMap<usize, u64>,
}

impl SampleRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sample.
    pub fn push(&mut self, sample: ChainSample) {
        *self
            .partition_counts
            .entry(sample.partition.clone())
            .or_insert(0) += 1;
        *self
            .event_count_counts
            .entry(sample.number_of_events)
            .or_insert(0) += 1;
        self.samples.push(sample);
    }

    /// Recorded samples in order.
    pub fn samples(&self) -> &[ChainSample] {
        &self.samples
    }

    /// Sample count per partition signature, in first-seen order.
    pub fn partition_counts(&self) -> &IndexMap<String, u64> {
        &self.partition_counts
    }

    /// Sample count per number of events.
    pub fn event_count_counts(&self) -> &BTreeMap<usize, u64> {
        &self.event_count_counts
    }

    /// Moments of one per-comparison quantity across samples.
    pub fn comparison_moments<F>(&self, comparison: usize, value: F) -> RunningMoments
    where
        F: Fn(&ComparisonSample) -> f64,
    {
        let mut moments = RunningMoments::new();
        for sample in &self.samples {
            if let Some(entry) = sample.comparisons.get(comparison) {
                moments.push(value(entry));
            }
        }
        moments
    }

    /// Consumes the recorder, returning the samples.
    pub fn into_samples(self) -> Vec<ChainSample> {
        self.samples
    }
}
