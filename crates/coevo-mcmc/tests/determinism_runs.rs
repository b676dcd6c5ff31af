use coevo_mcmc::{run, RunConfig, RunSummary};

fn config(iterations: u64) -> RunConfig {
    let yaml = format!(
        r#"
chain:
  iterations: {iterations}
  sample_frequency: 7
  burn_in: 300
model:
  event_time_prior: {{ type: gamma, shape: 2.0, scale: 0.1 }}
  event_model:
    type: dirichlet-process
    concentration: {{ value: 1.2, estimate: true, prior: {{ type: gamma, shape: 2.0, scale: 1.0 }} }}
  comparisons:
    - label: alpha
      population_size: {{ prior: {{ type: gamma, shape: 10.0, scale: 0.1 }} }}
      mutation_rate: {{ prior: {{ type: gamma, shape: 4.0, scale: 0.25 }} }}
    - label: beta
      leaf_count: 1
      population_size: {{ prior: {{ type: gamma, shape: 2.0, scale: 0.2 }}, constrained: true }}
      freq_1: {{ prior: {{ type: beta, alpha: 2.0, beta: 2.0 }} }}
    - label: gamma
      population_size: {{ value: 1.0, fixed: true }}
    - label: delta
      population_size: {{ prior: {{ type: exponential, rate: 2.0 }} }}
operators:
  auto_optimize_delay: 100
  operators:
    event_height_mover: {{ weight: 1.0, window: 0.05 }}
    height_size_rate_mixer: {{ weight: 1.0 }}
    dirichlet_process_gibbs: {{ weight: 2.0, auxiliary_categories: 2 }}
"#
    );
    RunConfig::from_yaml_str(&yaml).unwrap()
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() <= 1e-12 * a.abs().max(1.0), "{a} != {b}");
}

#[test]
fn same_seed_reproduces_the_run_exactly() {
    let config = config(5_000);
    let first = run(&config, 2024).unwrap();
    let second = run(&config, 2024).unwrap();
    assert_eq!(first, second);
}

#[test]
fn different_seeds_give_different_chains() {
    let config = config(5_000);
    let first = run(&config, 1).unwrap();
    let second = run(&config, 2).unwrap();
    assert_ne!(first.samples, second.samples);
}

#[test]
fn samples_respect_burn_in_and_frequency() {
    let config = config(5_000);
    let summary = run(&config, 99).unwrap();
    assert_eq!(summary.iterations, 5_000);
    // Multiples of 7 in (300, 5000].
    assert_eq!(summary.samples.len(), 5_000 / 7 - 300 / 7);
    assert!(summary
        .samples
        .iter()
        .all(|sample| sample.iteration > 300 && sample.iteration % 7 == 0));
    assert!(summary
        .samples
        .windows(2)
        .all(|pair| pair[1].iteration == pair[0].iteration + 7));
    let last = summary.samples.last().unwrap();
    assert_eq!(last.iteration, 4_998);
}

#[test]
fn dirichlet_summary_frequencies_are_normalized() {
    let config = config(8_000);
    let summary = run(&config, 7).unwrap();
    let partitions: f64 = summary.partition_frequencies.values().sum();
    let events: f64 = summary.event_count_frequencies.values().sum();
    assert!((partitions - 1.0).abs() < 1e-9);
    assert!((events - 1.0).abs() < 1e-9);
    assert!(summary
        .event_count_frequencies
        .keys()
        .all(|&events| (1..=4).contains(&events)));
    for sample in &summary.samples {
        let concentration = sample.concentration.unwrap();
        assert!(concentration > 0.0);
        assert_eq!(sample.comparisons.len(), 4);
        assert_eq!(sample.comparisons[1].leaf_population_sizes.len(), 1);
        assert_eq!(
            sample.comparisons[1].root_population_size,
            sample.comparisons[1].leaf_population_sizes[0]
        );
        assert_eq!(sample.comparisons[2].root_population_size, 1.0);
        assert_eq!(sample.comparisons[2].mutation_rate, 1.0);
        assert!(sample.ln_prior.is_finite());
        assert_eq!(sample.ln_likelihood, 0.0);
    }
    let gibbs = summary
        .operators
        .iter()
        .find(|report| report.name == "dirichlet-process-gibbs-sampler")
        .unwrap();
    assert_eq!(gibbs.rejected, 0);
    assert!(gibbs.accepted > 0);
    assert!(summary.acceptance_rates.contains_key("concentration-scaler"));
    assert_eq!(summary.final_partition.split(',').count(), 4);
}

#[test]
fn summary_survives_a_json_round_trip() {
    let summary = run(&config(2_000), 5).unwrap();
    let json = serde_json::to_string(&summary).unwrap();
    let restored: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.iterations, summary.iterations);
    assert_eq!(restored.final_partition, summary.final_partition);
    assert_eq!(restored.partition_frequencies.len(), summary.partition_frequencies.len());
    assert_eq!(restored.operators.len(), summary.operators.len());
    assert_eq!(restored.samples.len(), summary.samples.len());
    for (a, b) in restored.samples.iter().zip(&summary.samples) {
        assert_eq!(a.iteration, b.iteration);
        assert_eq!(a.partition, b.partition);
        for (x, y) in a.comparisons.iter().zip(&b.comparisons) {
            assert_close(x.height, y.height);
            assert_close(x.root_population_size, y.root_population_size);
            assert_close(x.freq_1, y.freq_1);
        }
    }
}
