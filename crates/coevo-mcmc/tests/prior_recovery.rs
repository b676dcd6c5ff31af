
use coevo_core::{Prior, RngHandle};
use coevo_mcmc::{ModelCollection, Operator, RunningMoments, TimeOperator, TreeOperator};

use fixtures::{beta, gamma, independent_collection, schedule_of, ComparisonSpec, Sizes};

const ITERATIONS: usize = 2_000_000;

/// Runs `operator` alone and records `read` after every iteration.
fn recover<F>(
    operator: Box<dyn Operator>,
    collection: ModelCollection,
    auto_optimize: bool,
    seed: u64,
    read: F,
) -> RunningMoments
where
    F: Fn(&ModelCollection) -> f64,
{
    let mut moments = recover_all(vec![operator], collection, auto_optimize, seed, |c| {
        vec![read(c)]
    });
    moments.remove(0)
}

/// Runs `operators` together and records every value `read` returns.
fn recover_all<F>(
    operators: Vec<Box<dyn Operator>>,
    mut collection: ModelCollection,
    auto_optimize: bool,
    seed: u64,
    read: F,
) -> Vec<RunningMoments>
where
    F: Fn(&ModelCollection) -> Vec<f64>,
{
    let mut schedule = schedule_of(operators, auto_optimize);
    let mut rng = RngHandle::from_seed(seed);
    let mut moments = Vec::new();
    for _ in 0..ITERATIONS {
        schedule.step(&mut rng, &mut collection).unwrap();
        let values = read(&collection);
        moments.resize_with(values.len(), RunningMoments::new);
        for (entry, value) in moments.iter_mut().zip(values) {
            entry.push(value);
        }
    }
    moments
}

/// Root size then leaf sizes of the first comparison.
fn sizes_of_first(collection: &ModelCollection) -> Vec<f64> {
    let comparison = collection.comparison(0).unwrap();
    let mut sizes = vec![comparison.root_population_size()];
    for leaf in 0..comparison.leaf_node_count() {
        sizes.push(comparison.child_population_size(leaf).unwrap());
    }
    sizes
}

fn check(label: &str, moments: &RunningMoments, prior: &Prior) {
    fixtures::assert_matches_prior(label, moments, prior, 0.01, 0.015);
    assert!(moments.min() >= prior.min(), "{label}: sample below support");
    assert!(moments.max() < prior.max(), "{label}: sample above support");
}

fn fixed_pair() -> ComparisonSpec {
    ComparisonSpec::pair("fixed", Sizes::Fixed(1.0))
}

#[test]
fn event_height_scaler_recovers_gamma_prior() {
    let prior = gamma(5.0, 0.1);
    for (auto_optimize, seed) in [(true, 11), (false, 12)] {
        let collection = independent_collection(&[fixed_pair()], prior.clone());
        let moments = recover(
            Box::new(TimeOperator::height_scaler(1.0, 0.5)),
            collection,
            auto_optimize,
            seed,
            |c| c.height_of_comparison(0).unwrap(),
        );
        check("height scaler", &moments, &prior);
    }
}

#[test]
fn event_height_mover_recovers_gamma_prior() {
    let prior = gamma(5.0, 0.1);
    for (auto_optimize, seed) in [(true, 21), (false, 22)] {
        let collection = independent_collection(&[fixed_pair()], prior.clone());
        let moments = recover(
            Box::new(TimeOperator::height_mover(1.0, 0.3)),
            collection,
            auto_optimize,
            seed,
            |c| c.height_of_comparison(0).unwrap(),
        );
        check("height mover", &moments, &prior);
    }
}

#[test]
fn root_population_size_scaler_recovers_gamma_prior() {
    let prior = gamma(10.0, 0.1);
    for (auto_optimize, seed) in [(true, 31), (false, 32)] {
        let spec = ComparisonSpec::pair("pair", Sizes::Independent(prior.clone()));
        let collection = independent_collection(&[spec], gamma(5.0, 0.1));
        let moments = recover(
            Box::new(TreeOperator::root_population_size_scaler(1.0, 0.5)),
            collection,
            auto_optimize,
            seed,
            |c| c.comparison(0).unwrap().root_population_size(),
        );
        check("root size scaler", &moments, &prior);
    }
}

#[test]
fn leaf_population_size_scaler_recovers_gamma_prior_for_each_leaf() {
    let prior = gamma(2.0, 0.2);
    for (auto_optimize, seed) in [(true, 41), (false, 42)] {
        for leaf in 0..2 {
            let spec = ComparisonSpec::pair("pair", Sizes::Independent(prior.clone()));
            let collection = independent_collection(&[spec], gamma(5.0, 0.1));
            let moments = recover(
                Box::new(TreeOperator::leaf_population_size_scaler(1.0, 1.0)),
                collection,
                auto_optimize,
                seed + leaf as u64 * 100,
                |c| c.comparison(0).unwrap().child_population_size(leaf).unwrap(),
            );
            check("leaf size scaler", &moments, &prior);
        }
    }
}

#[test]
fn constrained_size_scaled_through_root_recovers_prior() {
    let prior = gamma(4.0, 0.5);
    let spec = ComparisonSpec::singleton("single", Sizes::Constrained(prior.clone()));
    let collection = independent_collection(&[spec], gamma(5.0, 0.1));
    let moments = recover(
        Box::new(TreeOperator::root_population_size_scaler(1.0, 1.0)),
        collection,
        true,
        51,
        |c| {
            let comparison = c.comparison(0).unwrap();
            assert_eq!(
                comparison.root_population_size(),
                comparison.child_population_size(0).unwrap()
            );
            comparison.root_population_size()
        },
    );
    check("constrained size", &moments, &prior);
}

#[test]
fn mutation_rate_scaler_recovers_gamma_prior() {
    let prior = gamma(4.0, 0.25);
    for (auto_optimize, seed) in [(true, 61), (false, 62)] {
        let spec = fixed_pair().with_rate(prior.clone());
        let collection = independent_collection(&[spec], gamma(5.0, 0.1));
        let moments = recover(
            Box::new(TreeOperator::mutation_rate_scaler(1.0, 1.0)),
            collection,
            auto_optimize,
            seed,
            |c| c.comparison(0).unwrap().mutation_rate(),
        );
        check("mutation rate scaler", &moments, &prior);
    }
}

#[test]
fn freq_mover_recovers_beta_prior_inside_unit_interval() {
    for (prior, auto_optimize, seed) in [
        (beta(2.5, 2.0), true, 71),
        (beta(2.5, 2.0), false, 72),
        (beta(0.8, 0.8), true, 73),
    ] {
        let spec = fixed_pair().with_freq(prior.clone());
        let collection = independent_collection(&[spec], gamma(5.0, 0.1));
        let moments = recover(
            Box::new(TreeOperator::freq_mover(1.0, 0.2)),
            collection,
            auto_optimize,
            seed,
            |c| c.comparison(0).unwrap().freq_1(),
        );
        check("freq mover", &moments, &prior);
        assert!(moments.min() > 0.0 && moments.max() < 1.0);
    }
}

#[test]
fn height_scaler_on_one_comparison_leaves_others_untouched() {
    let prior = gamma(5.0, 0.1);
    let mut collection =
        independent_collection(&[fixed_pair(), fixed_pair()], prior.clone());
    let untouched = collection.height_of_comparison(1).unwrap();
    let mut schedule = schedule_of(
        vec![Box::new(TimeOperator::height_scaler(1.0, 0.5).for_comparison(0))],
        true,
    );
    let mut rng = RngHandle::from_seed(81);
    let mut moments = RunningMoments::new();
    for _ in 0..200_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
        moments.push(collection.height_of_comparison(0).unwrap());
        assert_eq!(collection.height_of_comparison(1).unwrap(), untouched);
    }
    fixtures::assert_matches_prior("scoped height scaler", &moments, &prior, 0.02, 0.06);
}

/// The relative movers keep the total size, so each is paired with the
/// mean size scaler, which only changes the total.
fn check_sum_preserving_mover(mover: TreeOperator, leaves: usize, seed: u64) {
    let prior = gamma(10.0, 0.1);
    let spec = ComparisonSpec {
        leaves,
        ..ComparisonSpec::pair("pair", Sizes::Independent(prior.clone()))
    };
    let collection = independent_collection(&[spec], gamma(5.0, 0.1));
    let moments = recover_all(
        vec![
            Box::new(mover),
            Box::new(TreeOperator::mean_population_size_scaler(1.0, 0.5)),
        ],
        collection,
        true,
        seed,
        sizes_of_first,
    );
    assert_eq!(moments.len(), leaves + 1);
    for entry in &moments {
        check("relative size", entry, &prior);
    }
}

#[test]
fn relative_population_size_mixer_recovers_every_size() {
    check_sum_preserving_mover(TreeOperator::relative_population_size_mixer(1.0, 0.05), 2, 91);
}

#[test]
fn root_relative_population_size_mover_recovers_every_size() {
    check_sum_preserving_mover(TreeOperator::root_relative_population_size_mover(1.0, 0.3), 2, 92);
}

#[test]
fn leaf_relative_population_size_mover_recovers_every_size() {
    check_sum_preserving_mover(TreeOperator::leaf_relative_population_size_mover(1.0, 0.3), 2, 93);
    check_sum_preserving_mover(TreeOperator::leaf_relative_population_size_mover(1.0, 0.3), 1, 94);
}

#[test]
fn relative_movers_keep_the_total_size() {
    let spec = ComparisonSpec::pair("pair", Sizes::Independent(gamma(10.0, 0.1)));
    for (index, mover) in [
        TreeOperator::relative_population_size_mixer(1.0, 0.05),
        TreeOperator::root_relative_population_size_mover(1.0, 0.3),
        TreeOperator::leaf_relative_population_size_mover(1.0, 0.3),
    ]
    .into_iter()
    .enumerate()
    {
        let mut collection = independent_collection(&[spec.clone()], gamma(5.0, 0.1));
        let total: f64 = sizes_of_first(&collection).iter().sum();
        let mut schedule = schedule_of(vec![Box::new(mover)], true);
        let mut rng = RngHandle::from_seed(95 + index as u64);
        for _ in 0..5_000 {
            schedule.step(&mut rng, &mut collection).unwrap();
            let sizes = sizes_of_first(&collection);
            assert!(sizes.iter().all(|&size| size > 0.0));
            let moved: f64 = sizes.iter().sum();
            assert!((moved - total).abs() < 1e-9 * total, "{moved} vs {total}");
        }
        let report = &schedule.reports()[0];
        assert!(report.accepted > 0 && report.rejected > 0, "{}", report.name);
    }
}

/// Sizes that start equal stay equal under the mean scaler, and their
/// common value follows a gamma with three times the shape and a third of
/// the scale of the per-size prior.
#[test]
fn mean_population_size_scaler_moves_sizes_together() {
    let spec = ComparisonSpec::pair("pair", Sizes::Independent(gamma(4.0, 0.3)));
    let collection = independent_collection(&[spec], gamma(5.0, 0.1));
    let moments = recover(
        Box::new(TreeOperator::mean_population_size_scaler(1.0, 0.5)),
        collection,
        true,
        97,
        |c| {
            let sizes = sizes_of_first(c);
            assert!(sizes.iter().all(|&size| size == sizes[0]));
            sizes[0]
        },
    );
    check("mean size scaler", &moments, &gamma(12.0, 0.1));
}

#[test]
fn time_root_size_mixer_with_height_scaler_recovers_both_priors() {
    let height_prior = gamma(5.0, 0.1);
    let size_prior = gamma(10.0, 0.05);
    for (auto_optimize, seed) in [(true, 98), (false, 99)] {
        let spec = ComparisonSpec::pair("pair", Sizes::Independent(size_prior.clone()));
        let collection = independent_collection(&[spec], height_prior.clone());
        let leaves = sizes_of_first(&collection)[1..].to_vec();
        let moments = recover_all(
            vec![
                Box::new(TimeOperator::time_root_size_mixer(1.0, 0.3).without_sweep()),
                Box::new(TimeOperator::height_scaler(1.0, 0.5)),
            ],
            collection,
            auto_optimize,
            seed,
            |c| {
                assert_eq!(sizes_of_first(c)[1..], leaves[..]);
                vec![
                    c.height_of_comparison(0).unwrap(),
                    c.comparison(0).unwrap().root_population_size(),
                ]
            },
        );
        check("root mixer height", &moments[0], &height_prior);
        check("root mixer root size", &moments[1], &size_prior);
    }
}

#[test]
fn time_root_size_mixer_keeps_height_plus_twice_root() {
    let spec = ComparisonSpec::pair("pair", Sizes::Independent(gamma(10.0, 0.05)));
    let mut collection = independent_collection(&[spec], gamma(5.0, 0.1));
    let invariant = |c: &ModelCollection| {
        c.height_of_comparison(0).unwrap() + 2.0 * c.comparison(0).unwrap().root_population_size()
    };
    let start = invariant(&collection);
    let mut schedule = schedule_of(
        vec![Box::new(TimeOperator::time_root_size_mixer(1.0, 0.3).without_sweep())],
        true,
    );
    let mut rng = RngHandle::from_seed(100);
    for _ in 0..5_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
        assert!((invariant(&collection) - start).abs() < 1e-9);
        assert!(collection.height_of_comparison(0).unwrap() >= 0.0);
    }
    assert!(schedule.reports()[0].accepted > 0);
}
