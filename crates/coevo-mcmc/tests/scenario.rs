
use coevo_core::RngHandle;
use coevo_mcmc::{run, ModelCollection, OperatorSchedule, RunConfig, RunningMoments};

use fixtures::{assert_matches_prior, gamma};

/// Four independent pairs moved almost only by the joint height and size
/// scaler and its sweep. The univariate operators keep a token weight so
/// the sweep is built from them; every marginal must match its prior.
const SCENARIO: &str = r#"
chain:
  iterations: 40000
  sample_frequency: 4
  burn_in: 2000
seed_policy:
  master_seed: 731
model:
  event_time_prior: { type: gamma, shape: 5.0, scale: 0.1 }
  event_model: { type: independent }
  comparisons:
    - label: pop1
      population_size: { prior: { type: gamma, shape: 10.0, scale: 0.1 } }
    - label: pop2
      population_size: { prior: { type: gamma, shape: 5.0, scale: 0.2 } }
    - label: pop3
      population_size: { prior: { type: gamma, shape: 20.0, scale: 0.05 } }
    - label: pop4
      population_size: { prior: { type: gamma, shape: 8.0, scale: 0.5 } }
operators:
  auto_optimize: false
  operators:
    event_height_scaler: { weight: 0.001, scale: 0.3 }
    root_population_size_scaler: { weight: 0.001, scale: 0.4 }
    leaf_population_size_scaler: { weight: 0.001, scale: 0.6 }
    mutation_rate_scaler: { weight: 0.001 }
    freq_mover: { weight: 0.001 }
    concentration_scaler: { weight: 0.0 }
    height_size_scaler: { weight: 1.0, scale: 0.5 }
"#;

const LONG_ITERATIONS: usize = 1_000_000;

fn height_prior() -> coevo_core::Prior {
    gamma(5.0, 0.1)
}

fn size_priors() -> [coevo_core::Prior; 4] {
    [
        gamma(10.0, 0.1),
        gamma(5.0, 0.2),
        gamma(20.0, 0.05),
        gamma(8.0, 0.5),
    ]
}

/// Means within half a percent. Variances get three times that: their
/// estimator carries the fourth moment, so its error shrinks more slowly
/// with the same effective sample size.
#[test]
fn height_size_scaler_recovers_every_prior_closely() {
    let mut config = RunConfig::from_yaml_str(SCENARIO).unwrap();
    config.operators.auto_optimize = true;
    let mut rng = RngHandle::from_seed(config.seed_policy.master_seed);
    let mut collection = ModelCollection::from_config(&config.model, &mut rng).unwrap();
    let mut schedule = OperatorSchedule::from_config(&config.operators, &collection).unwrap();
    collection.compute_log_likelihood_and_prior().unwrap();
    collection.make_clean();

    let n = collection.number_of_comparisons();
    let mut heights: Vec<RunningMoments> = (0..n).map(|_| RunningMoments::new()).collect();
    let mut roots: Vec<RunningMoments> = (0..n).map(|_| RunningMoments::new()).collect();
    let mut leaves: Vec<[RunningMoments; 2]> = (0..n)
        .map(|_| [RunningMoments::new(), RunningMoments::new()])
        .collect();
    for iteration in 0..LONG_ITERATIONS {
        schedule.step(&mut rng, &mut collection).unwrap();
        if iteration < 10_000 {
            continue;
        }
        for index in 0..n {
            let comparison = collection.comparison(index).unwrap();
            heights[index].push(collection.height_of_comparison(index).unwrap());
            roots[index].push(comparison.root_population_size());
            for (leaf, moments) in leaves[index].iter_mut().enumerate() {
                moments.push(comparison.child_population_size(leaf).unwrap());
            }
        }
    }

    let (mean_tol, var_tol) = (0.005, 0.015);
    for (index, size_prior) in size_priors().iter().enumerate() {
        let label = format!("pop{}", index + 1);
        assert_matches_prior(
            &format!("{label} height"),
            &heights[index],
            &height_prior(),
            mean_tol,
            var_tol,
        );
        assert_matches_prior(&format!("{label} root"), &roots[index], size_prior, mean_tol, var_tol);
        for (leaf, moments) in leaves[index].iter().enumerate() {
            assert_matches_prior(
                &format!("{label} leaf {leaf}"),
                moments,
                size_prior,
                mean_tol,
                var_tol,
            );
        }
    }
}

#[test]
fn run_summary_reports_the_composite_sweep() {
    let config = RunConfig::from_yaml_str(SCENARIO).unwrap();
    let summary = run(&config, config.seed_policy.master_seed).unwrap();
    assert_eq!(summary.partition_frequencies.get("0,1,2,3"), Some(&1.0));

    let composite = summary
        .operators
        .iter()
        .find(|report| report.name == "height-size-scaler")
        .unwrap();
    let sweep: Vec<(&str, Option<f64>)> = composite
        .sweep
        .iter()
        .map(|report| (report.name.as_str(), report.tuning))
        .collect();
    // Rates and frequencies are fixed here, so their operators drop out.
    assert_eq!(
        sweep,
        [
            ("event-height-scaler", Some(0.3)),
            ("root-population-size-scaler", Some(0.4)),
            ("leaf-population-size-scaler", Some(0.6)),
        ]
    );
    for report in &composite.sweep {
        assert!(report.accepted > 0, "{} never accepted", report.name);
        assert!(report.rejected > 0, "{} never rejected", report.name);
        let key = format!("height-size-scaler/{}", report.name);
        assert_eq!(summary.acceptance_rates.get(&key), Some(&report.acceptance_rate()));
    }
    assert!(summary
        .operators
        .iter()
        .filter(|report| report.name != "height-size-scaler")
        .all(|report| report.sweep.is_empty()));

    let height_prior = height_prior();
    for (index, size_prior) in size_priors().iter().enumerate() {
        let mut height = RunningMoments::new();
        let mut root = RunningMoments::new();
        for sample in &summary.samples {
            let comparison = &sample.comparisons[index];
            height.push(comparison.height);
            root.push(comparison.root_population_size);
        }
        assert_matches_prior("height", &height, &height_prior, 0.05, 0.15);
        assert_matches_prior("root size", &root, size_prior, 0.05, 0.15);
    }

    let last = summary.samples.last().unwrap();
    for comparison in &last.comparisons {
        let root = comparison.root_population_size;
        let leaf1 = comparison.leaf_population_sizes[0];
        let leaf2 = comparison.leaf_population_sizes[1];
        assert_ne!(root, leaf1);
        assert_ne!(root, leaf2);
        assert_ne!(leaf1, leaf2);
        assert_eq!(comparison.mutation_rate, 1.0);
        assert_eq!(comparison.freq_1, 0.5);
    }
}
