
use coevo_core::RngHandle;
use coevo_mcmc::operator::{reflect_into, reflect_into_open_interval};
use coevo_mcmc::{
    robbins_monro_update, Operator, OperatorSchedule, TimeOperator, TreeOperator,
    TunableParameter, TuningState,
};
use proptest::prelude::*;

use fixtures::{beta, gamma, independent_collection, schedule_of, ComparisonSpec, Sizes};

fn single_comparison() -> Vec<ComparisonSpec> {
    vec![ComparisonSpec::pair("pair", Sizes::Independent(gamma(10.0, 0.1)))
        .with_rate(gamma(4.0, 0.25))
        .with_freq(beta(2.0, 2.0))]
}

fn tunings(schedule: &OperatorSchedule) -> Vec<f64> {
    schedule
        .operators()
        .map(|operator| operator.tuning().map_or(f64::NAN, |t| t.tuning_parameter()))
        .collect()
}

#[test]
fn total_weight_tracks_added_operators() {
    let mut schedule = OperatorSchedule::new(true, 10);
    assert!(schedule.is_empty());
    schedule
        .add_operator(Box::new(TimeOperator::height_scaler(1.5, 0.5)))
        .unwrap();
    schedule
        .add_operator(Box::new(TreeOperator::freq_mover(2.5, 0.1)))
        .unwrap();
    assert_eq!(schedule.len(), 2);
    assert_eq!(schedule.total_weight(), 4.0);

    let err = schedule
        .add_operator(Box::new(TreeOperator::mutation_rate_scaler(0.0, 0.5)))
        .unwrap_err();
    assert_eq!(err.info().code, "operator-weight");
    assert_eq!(schedule.total_weight(), 4.0);

    let reports = schedule.reports();
    assert_eq!(reports[0].name, "event-height-scaler");
    assert!((reports[0].weight_probability - 0.375).abs() < 1e-12);
    assert!((reports[1].weight_probability - 0.625).abs() < 1e-12);
}

#[test]
fn operators_are_drawn_in_proportion_to_weight() {
    let mut schedule = schedule_of(
        vec![
            Box::new(TimeOperator::height_scaler(1.0, 0.5)),
            Box::new(TreeOperator::root_population_size_scaler(2.0, 0.5)),
            Box::new(TreeOperator::freq_mover(7.0, 0.1)),
        ],
        false,
    );
    let mut rng = RngHandle::from_seed(501);
    let draws = 200_000;
    let mut counts = [0u64; 3];
    let mut longest_run = 0;
    let mut run = 0;
    let mut previous = String::new();
    for _ in 0..draws {
        let (operator, _) = schedule.draw_operator(&mut rng).unwrap();
        let name = operator.name();
        match operator.kind().as_str() {
            "event-height-scaler" => counts[0] += 1,
            "root-population-size-scaler" => counts[1] += 1,
            _ => counts[2] += 1,
        }
        run = if name == previous { run + 1 } else { 1 };
        longest_run = longest_run.max(run);
        previous = name;
    }
    assert_eq!(schedule.iteration(), draws);
    for (count, expected) in counts.iter().zip([0.1, 0.2, 0.7]) {
        let observed = *count as f64 / draws as f64;
        assert!((observed - expected).abs() < 0.005, "{observed} vs {expected}");
    }
    assert!(longest_run >= 10, "the heaviest operator repeats many times in a row");
}

#[test]
fn empty_schedule_cannot_draw() {
    let mut schedule = OperatorSchedule::default();
    let mut rng = RngHandle::from_seed(502);
    assert!(schedule.draw_operator(&mut rng).is_err());
}

#[test]
fn turning_auto_optimize_off_freezes_every_tuning_parameter() {
    let mut collection = independent_collection(&single_comparison(), gamma(5.0, 0.1));
    let mut schedule = schedule_of(
        vec![
            Box::new(TimeOperator::height_scaler(1.0, 0.3)),
            Box::new(TreeOperator::root_population_size_scaler(1.0, 0.3)),
            Box::new(TreeOperator::mutation_rate_scaler(1.0, 0.3)),
            Box::new(TreeOperator::freq_mover(1.0, 0.05)),
        ],
        true,
    );
    schedule.set_auto_optimize_delay(0);
    schedule.turn_off_auto_optimize();
    assert!(!schedule.auto_optimize());
    let initial = tunings(&schedule);
    let mut rng = RngHandle::from_seed(503);
    for _ in 0..20_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
    }
    assert_eq!(tunings(&schedule), initial);
    for operator in schedule.operators() {
        let tuning = operator.tuning().unwrap();
        assert_eq!(
            tuning.number_of_attempts(),
            operator.number_accepted() + operator.number_rejected()
        );
        assert_eq!(tuning.number_of_accepts(), operator.number_accepted());
    }

    schedule.turn_on_auto_optimize();
    for _ in 0..2_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
    }
    let adapted = tunings(&schedule);
    assert!(adapted.iter().zip(&initial).all(|(a, b)| a != b));
}

#[test]
fn tuning_waits_for_the_auto_optimize_delay() {
    let mut collection = independent_collection(&single_comparison(), gamma(5.0, 0.1));
    let mut schedule = schedule_of(vec![Box::new(TimeOperator::height_scaler(1.0, 0.3))], true);
    schedule.set_auto_optimize_delay(500);
    assert_eq!(schedule.auto_optimize_delay(), 500);
    let mut rng = RngHandle::from_seed(504);
    for _ in 0..500 {
        schedule.step(&mut rng, &mut collection).unwrap();
    }
    assert_eq!(tunings(&schedule), vec![0.3]);
    schedule.step(&mut rng, &mut collection).unwrap();
    assert_ne!(tunings(&schedule), vec![0.3]);
}

#[test]
fn adaptation_steers_acceptance_toward_the_target() {
    let mut collection = independent_collection(&single_comparison(), gamma(5.0, 0.1));
    let mut schedule = schedule_of(vec![Box::new(TimeOperator::height_scaler(1.0, 0.05))], true);
    schedule.set_auto_optimize_delay(0);
    let mut rng = RngHandle::from_seed(505);
    for _ in 0..100_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
    }
    let before = schedule.reports()[0].clone();
    for _ in 0..50_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
    }
    let after = schedule.reports()[0].clone();
    let accepted = (after.accepted - before.accepted) as f64;
    let total = (after.accepted + after.rejected - before.accepted - before.rejected) as f64;
    let rate = accepted / total;
    assert!((rate - 0.44).abs() < 0.08, "late acceptance rate {rate}");
    assert!(after.tuning.unwrap() > 0.05);
}

#[test]
fn target_acceptance_is_validated() {
    let mut schedule = OperatorSchedule::default();
    assert!(schedule.set_target_acceptance(0.0).is_err());
    assert!(schedule.set_target_acceptance(1.0).is_err());
    schedule.set_target_acceptance(0.3).unwrap();
    assert_eq!(schedule.tuning_state().target_acceptance, 0.3);
}

#[test]
fn tuning_state_reflects_delay() {
    let state = TuningState {
        auto_optimize: true,
        auto_optimize_delay: 10,
        iteration: 9,
        target_acceptance: 0.44,
    };
    assert!(!state.is_tuning());
    assert!(TuningState { iteration: 10, ..state }.is_tuning());
    assert!(!TuningState {
        iteration: 10,
        auto_optimize: false,
        ..state
    }
    .is_tuning());
}

#[test]
fn tuning_parameter_keeps_the_requested_value() {
    let tuning = TunableParameter::new(0.25);
    assert_eq!(tuning.tuning_parameter(), 0.25);
    tuning.validate().unwrap();
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "tuning parameter must be positive and finite")]
fn non_positive_tuning_parameter_is_a_programming_error() {
    let _ = TunableParameter::new(0.0);
}

#[test]
fn invalid_deserialized_tuning_is_reported_not_replaced() {
    let json = r#"{"tuning_parameter":-1.0,"number_of_attempts":0,"number_of_accepts":0,"number_of_updates":0}"#;
    let tuning: TunableParameter = serde_json::from_str(json).unwrap();
    assert_eq!(tuning.tuning_parameter(), -1.0);
    assert_eq!(tuning.validate().unwrap_err().info().code, "operator-tuning");
}

#[test]
fn exact_bound_hits_fold_into_the_open_interval() {
    for value in [-2.0, -1.0, 0.0, 1.0, 2.0, 3.0] {
        let folded = reflect_into_open_interval(value, 0.0, 1.0);
        assert!(folded > 0.0 && folded < 1.0, "{value} -> {folded}");
    }
    assert_eq!(reflect_into_open_interval(0.25, 0.0, 1.0), 0.25);
    assert_eq!(reflect_into_open_interval(1.25, 0.0, 1.0), 0.75);
}

#[test]
fn freq_mover_under_a_flat_prior_never_rejects() {
    // With a flat prior and no data every proposal inside (0, 1) has ratio one.
    let specs = vec![
        ComparisonSpec::pair("flat", Sizes::Fixed(1.0)).with_freq(beta(1.0, 1.0)),
        ComparisonSpec::singleton("flat-single", Sizes::Fixed(1.0)).with_freq(beta(1.0, 1.0)),
    ];
    let mut collection = independent_collection(&specs, gamma(5.0, 0.1));
    let mut schedule = schedule_of(vec![Box::new(TreeOperator::freq_mover(1.0, 3.0))], false);
    let mut rng = RngHandle::from_seed(506);
    for _ in 0..20_000 {
        schedule.step(&mut rng, &mut collection).unwrap();
        for comparison in collection.comparisons() {
            assert!(comparison.freq_1() > 0.0 && comparison.freq_1() < 1.0);
        }
    }
    let report = &schedule.reports()[0];
    assert_eq!(report.rejected, 0);
    assert_eq!(report.accepted, 40_000);
}

proptest! {
    #[test]
    fn robbins_monro_keeps_tuning_positive_and_finite(
        tuning in 1e-6f64..1e6,
        probability in 0.0f64..=1.0,
        updates in 0u64..1_000_000,
    ) {
        let updated = robbins_monro_update(tuning, probability, updates, 0.44);
        prop_assert!(updated.is_finite() && updated > 0.0);
        let slack = tuning * 1e-12;
        if probability > 0.44 {
            prop_assert!(updated >= tuning - slack);
        } else if probability < 0.44 {
            prop_assert!(updated <= tuning + slack);
        }
    }

    #[test]
    fn reflection_lands_inside_the_interval(value in -50.0f64..50.0) {
        let reflected = reflect_into(value, 0.0, 1.0);
        prop_assert!((0.0..=1.0).contains(&reflected));
        if (0.0..=1.0).contains(&value) {
            prop_assert_eq!(reflected, value);
        }
        let folded = reflect_into_open_interval(value, 0.0, 1.0);
        prop_assert!(folded > 0.0 && folded < 1.0);
    }
}
