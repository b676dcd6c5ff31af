
use coevo_core::{EcoError, RngHandle};
use coevo_mcmc::{
    metropolis_hastings_step, ComparisonState, ConcentrationScaler, DirichletProcessGibbsSampler,
    Domain, LikelihoodModel, ModelCollection, Operator, ReversibleJumpSampler, TimeOperator,
    TreeOperator, TuningState,
};

use fixtures::{beta, dirichlet_collection, gamma, independent_collection, shared_collection};
use fixtures::{ComparisonSpec, Sizes};

fn specs() -> Vec<ComparisonSpec> {
    vec![
        ComparisonSpec::pair("pair", Sizes::Independent(gamma(10.0, 0.1)))
            .with_rate(gamma(4.0, 0.25))
            .with_freq(beta(2.0, 3.0)),
        ComparisonSpec::singleton("single", Sizes::Constrained(gamma(2.0, 0.2)))
            .with_rate(gamma(5.0, 0.2))
            .with_freq(beta(2.0, 2.0)),
        ComparisonSpec::pair("fixed", Sizes::Fixed(1.0)).with_freq(beta(1.5, 1.5)),
    ]
}

fn all_operators() -> Vec<Box<dyn Operator>> {
    vec![
        Box::new(TimeOperator::height_scaler(1.0, 1.0)),
        Box::new(TimeOperator::height_mover(1.0, 0.3)),
        Box::new(TimeOperator::height_size_scaler(1.0, 1.0)),
        Box::new(TimeOperator::height_size_mixer(1.0, 1.0)),
        Box::new(TimeOperator::height_size_rate_scaler(1.0, 1.0)),
        Box::new(TimeOperator::height_size_rate_mixer(1.0, 1.0)),
        Box::new(TreeOperator::root_population_size_scaler(1.0, 1.0)),
        Box::new(TreeOperator::leaf_population_size_scaler(1.0, 1.0)),
        Box::new(TreeOperator::mutation_rate_scaler(1.0, 1.0)),
        Box::new(TreeOperator::freq_mover(1.0, 0.2)),
    ]
}

#[test]
fn restore_after_propose_is_bit_identical_for_every_operator() {
    for shared in [false, true] {
        let mut collection = if shared {
            shared_collection(&specs(), gamma(5.0, 0.1))
        } else {
            independent_collection(&specs(), gamma(5.0, 0.1))
        };
        let mut rng = RngHandle::from_seed(601);
        for mut operator in all_operators() {
            for index in 0..collection.number_of_events() {
                let before = collection.snapshot();
                collection.store_state();
                operator.propose(&mut rng, &mut collection, index).unwrap();
                collection.compute_log_likelihood_and_prior().unwrap();
                collection.restore_state().unwrap();
                let after = collection.snapshot();
                assert_eq!(before, after, "{} left state behind", operator.name());
            }
        }
    }
}

/// Operators that only apply to comparisons with free, independent sizes;
/// the first comparison of `specs` is one.
fn relative_size_operators() -> Vec<Box<dyn Operator>> {
    vec![
        Box::new(TreeOperator::relative_population_size_mixer(1.0, 0.5)),
        Box::new(TreeOperator::mean_population_size_scaler(1.0, 1.0)),
        Box::new(TreeOperator::root_relative_population_size_mover(1.0, 2.0)),
        Box::new(TreeOperator::leaf_relative_population_size_mover(1.0, 2.0)),
        Box::new(TimeOperator::time_root_size_mixer(1.0, 1.0)),
    ]
}

#[test]
fn restore_after_relative_size_and_jump_proposals_is_bit_identical() {
    let mut collection = independent_collection(&specs(), gamma(5.0, 0.1));
    let mut rng = RngHandle::from_seed(603);
    for mut operator in relative_size_operators() {
        for _ in 0..200 {
            let before = collection.snapshot();
            collection.store_state();
            operator.propose(&mut rng, &mut collection, 0).unwrap();
            collection.compute_log_likelihood_and_prior().unwrap();
            collection.restore_state().unwrap();
            assert_eq!(before, collection.snapshot(), "{} left state behind", operator.name());
        }
    }

    let split_weight = fixtures::estimated("split_weight", gamma(2.0, 1.0), Domain::Positive);
    let mut collection = fixtures::split_weight_collection(&specs(), gamma(5.0, 0.1), split_weight);
    let mut jumps = ReversibleJumpSampler::new(1.0, 0.5);
    let mut scaler = ConcentrationScaler::new(1.0, 1.0);
    for _ in 0..500 {
        let before = collection.snapshot();
        collection.store_state();
        jumps.propose(&mut rng, &mut collection, 0).unwrap();
        scaler.propose(&mut rng, &mut collection, 0).unwrap();
        collection.compute_log_likelihood_and_prior().unwrap();
        collection.restore_state().unwrap();
        assert_eq!(before, collection.snapshot());
        collection.validate().unwrap();
        // Move on so that later proposals start from other partitions.
        jumps
            .perform_collection_move(&mut rng, &mut collection, &TuningState::default())
            .unwrap();
    }
}

#[test]
fn restore_after_gibbs_reassignment_recovers_the_partition() {
    let concentration = fixtures::estimated("concentration", gamma(2.0, 1.0), Domain::Positive);
    let mut collection = dirichlet_collection(&specs(), gamma(5.0, 0.1), concentration);
    let mut gibbs = DirichletProcessGibbsSampler::new(1.0, 4);
    let mut scaler = ConcentrationScaler::new(1.0, 1.0);
    let mut rng = RngHandle::from_seed(602);
    for round in 0..500 {
        let before = collection.snapshot();
        collection.store_state();
        gibbs.propose(&mut rng, &mut collection, round % 3).unwrap();
        scaler.propose(&mut rng, &mut collection, 0).unwrap();
        collection.compute_log_likelihood_and_prior().unwrap();
        collection.restore_state().unwrap();
        assert_eq!(before, collection.snapshot());
        collection.validate().unwrap();
    }
}

#[test]
fn restore_without_store_is_an_invariant_error() {
    let mut collection = independent_collection(&specs(), gamma(5.0, 0.1));
    let err = collection.restore_state().unwrap_err();
    assert!(matches!(err, EcoError::Model(_)));
    assert_eq!(err.info().code, "no-stored-state");
}

/// Likelihood that rules out every height except the starting one.
#[derive(Debug)]
struct PinnedHeight(f64);

impl LikelihoodModel for PinnedHeight {
    fn log_likelihood(&self, _comparison: &ComparisonState, height: f64) -> Result<f64, EcoError> {
        Ok(if height == self.0 { 0.0 } else { f64::NEG_INFINITY })
    }
}

fn pinned(collection: ModelCollection) -> ModelCollection {
    let height = collection.height_of_comparison(0).unwrap();
    collection.with_likelihood(Box::new(PinnedHeight(height))).unwrap()
}

#[test]
fn rejected_height_moves_leave_the_collection_unchanged() {
    let operators: Vec<Box<dyn Operator>> = vec![
        Box::new(TimeOperator::height_scaler(1.0, 1.0)),
        Box::new(TimeOperator::height_mover(1.0, 0.3)),
        Box::new(TimeOperator::height_size_scaler(1.0, 1.0).without_sweep()),
        Box::new(TimeOperator::height_size_mixer(1.0, 1.0).without_sweep()),
        Box::new(TimeOperator::height_size_rate_scaler(1.0, 1.0).without_sweep()),
        Box::new(TimeOperator::height_size_rate_mixer(1.0, 1.0).without_sweep()),
    ];
    let mut collection = pinned(shared_collection(&specs(), gamma(5.0, 0.1)));
    let state = TuningState::default();
    let mut rng = RngHandle::from_seed(603);
    let before = collection.snapshot();
    for mut operator in operators {
        for _ in 0..200 {
            let accepted =
                metropolis_hastings_step(operator.as_mut(), &mut rng, &mut collection, &state, 0)
                    .unwrap();
            assert!(!accepted);
            assert_eq!(collection.snapshot(), before);
        }
        assert_eq!(operator.number_accepted(), 0);
        assert_eq!(operator.number_rejected(), 200);
    }
}

#[test]
fn non_height_moves_are_unaffected_by_a_height_likelihood() {
    let mut collection = pinned(independent_collection(&specs(), gamma(5.0, 0.1)));
    let state = TuningState::default();
    let mut rng = RngHandle::from_seed(604);
    let mut scaler = TreeOperator::root_population_size_scaler(1.0, 1.0);
    for _ in 0..200 {
        scaler.perform_collection_move(&mut rng, &mut collection, &state).unwrap();
    }
    assert!(scaler.number_accepted() > 0);
    assert_eq!(collection.height_of_comparison(0).unwrap(), gamma(5.0, 0.1).mean());
    assert!(collection.log_likelihood().is_finite());
}
