use std::collections::BTreeMap;

use coevo_core::rng::{CHAIN_SUBSTREAM, INITIAL_STATE_SUBSTREAM};
use coevo_core::{EcoError, RngHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collection::ModelCollection;
use crate::config::{ChainConfig, RunConfig};
use crate::likelihood::{IgnoreData, LikelihoodModel};
use crate::metrics::{ChainSample, SampleRecorder};
use crate::operator::OperatorReport;
use crate::schedule::OperatorSchedule;

/// Summary returned to callers after a run completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// Iterations performed.
    pub iterations: u64,
    /// Samples recorded after burn-in.
    pub samples: Vec<ChainSample>,
    /// Per-operator counters and final tuning.
    pub operators: Vec<OperatorReport>,
    /// Acceptance rate per operator name; sweep operators appear as
    /// `parent/child`.
    pub acceptance_rates: BTreeMap<String, f64>,
    /// Fraction of samples per partition signature.
    pub partition_frequencies: BTreeMap<String, f64>,
    /// Fraction of samples per number of events.
    pub event_count_frequencies: BTreeMap<usize, f64>,
    /// Partition signature at the end of the run.
    pub final_partition: String,
}

/// Runs a chain from the configuration, ignoring the data.
pub fn run(config: &RunConfig, seed: u64) -> Result<RunSummary, EcoError> {
    run_with_likelihood(config, seed, Box::new(IgnoreData))
}

/// Runs a chain from the configuration under `likelihood`.
///
/// The initial state is drawn from its own substream of `seed`, so changing
/// operator settings does not change the starting point.
pub fn run_with_likelihood(
    config: &RunConfig,
    seed: u64,
    likelihood: Box<dyn LikelihoodModel>,
) -> Result<RunSummary, EcoError> {
    config.validate()?;
    let mut init_rng = RngHandle::substream(seed, INITIAL_STATE_SUBSTREAM);
    let mut collection =
        ModelCollection::from_config(&config.model, &mut init_rng)?.with_likelihood(likelihood)?;
    let mut schedule = OperatorSchedule::from_config(&config.operators, &collection)?;
    let mut rng = RngHandle::substream(seed, CHAIN_SUBSTREAM);
    run_chain(&config.chain, &mut rng, &mut collection, &mut schedule)
}

/// Drives `schedule` over `collection` for the configured number of
/// iterations, sampling every `sample_frequency` iterations after burn-in.
pub fn run_chain(
    chain: &ChainConfig,
    rng: &mut RngHandle,
    collection: &mut ModelCollection,
    schedule: &mut OperatorSchedule,
) -> Result<RunSummary, EcoError> {
    info!(
        iterations = chain.iterations,
        comparisons = collection.number_of_comparisons(),
        events = collection.number_of_events(),
        operators = schedule.len(),
        "starting chain"
    );
    collection.compute_log_likelihood_and_prior()?;
    collection.make_clean();

    let mut recorder = SampleRecorder::new();
    for iteration in 1..=chain.iterations {
        schedule.step(rng, collection)?;
        if iteration > chain.burn_in && iteration % chain.sample_frequency == 0 {
            recorder.push(ChainSample::capture(iteration, collection)?);
        }
    }

    let operators = schedule.reports();
    let mut acceptance_rates = BTreeMap::new();
    for report in &operators {
        acceptance_rates.insert(report.name.clone(), report.acceptance_rate());
        for child in &report.sweep {
            acceptance_rates.insert(
                format!("{}/{}", report.name, child.name),
                child.acceptance_rate(),
            );
        }
    }
    let total = recorder.samples().len().max(1) as f64;
    let partition_frequencies = recorder
        .partition_counts()
        .iter()
        .map(|(partition, &count)| (partition.clone(), count as f64 / total))
        .collect();
    let event_count_frequencies = recorder
        .event_count_counts()
        .iter()
        .map(|(&events, &count)| (events, count as f64 / total))
        .collect();
    for report in &operators {
        info!(
            operator = %report.name,
            accepted = report.accepted,
            rejected = report.rejected,
            acceptance_rate = report.acceptance_rate(),
            tuning = ?report.tuning,
            "operator summary"
        );
        for child in &report.sweep {
            debug!(
                parent = %report.name,
                operator = %child.name,
                accepted = child.accepted,
                rejected = child.rejected,
                acceptance_rate = child.acceptance_rate(),
                tuning = ?child.tuning,
                "sweep operator summary"
            );
        }
    }
    let final_partition = collection.partition_signature();
    info!(
        samples = recorder.samples().len(),
        final_partition = %final_partition,
        ln_likelihood = collection.log_likelihood(),
        "chain finished"
    );

    Ok(RunSummary {
        iterations: chain.iterations,
        samples: recorder.into_samples(),
        operators,
        acceptance_rates,
        partition_frequencies,
        event_count_frequencies,
        final_partition,
    })
}
