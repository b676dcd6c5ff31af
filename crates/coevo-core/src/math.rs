//! Numerical helpers: log-space weights, the Dirichlet density and
//! partition math for the Dirichlet-process and split-weight priors.

use std::collections::{BTreeMap, BTreeSet};

use statrs::function::gamma::ln_gamma;

use crate::errors::{EcoError, ErrorInfo};

/// `ln(sum(exp(values)))` evaluated without overflow.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

/// Converts log weights into normalized probabilities in place.
///
/// Fails when no weight is finite, since no category could be drawn.
pub fn normalize_log_weights(weights: &mut [f64]) -> Result<(), EcoError> {
    let total = log_sum_exp(weights);
    if !total.is_finite() {
        return Err(EcoError::Rng(
            ErrorInfo::new("degenerate-weights", "no finite log weight to normalize")
                .with_context("categories", weights.len()),
        ));
    }
    for weight in weights.iter_mut() {
        *weight = (*weight - total).exp();
    }
    Ok(())
}

/// Log density of the Dirichlet distribution with parameters `alphas` at `values`.
///
/// Points off the simplex support (a zero or negative coordinate, or a
/// length mismatch) have density zero.
pub fn ln_dirichlet_pdf(values: &[f64], alphas: &[f64]) -> f64 {
    if values.len() != alphas.len() || values.iter().any(|&value| value <= 0.0) {
        return f64::NEG_INFINITY;
    }
    let ln_norm = ln_gamma(alphas.iter().sum()) - alphas.iter().map(|&a| ln_gamma(a)).sum::<f64>();
    ln_norm
        + values
            .iter()
            .zip(alphas)
            .map(|(&value, &alpha)| (alpha - 1.0) * value.ln())
            .sum::<f64>()
}

/// Log of the Stirling number of the second kind `S(n, k)`, the number of
/// ways to split `n` labelled elements into `k` non-empty blocks.
pub fn ln_stirling2(n: usize, k: usize) -> f64 {
    if k > n || (k == 0 && n > 0) {
        return f64::NEG_INFINITY;
    }
    if n == 0 {
        return 0.0;
    }
    // row[j] holds ln S(i, j) for the current i.
    let mut row = vec![f64::NEG_INFINITY; k + 1];
    row[0] = 0.0;
    for i in 1..=n {
        for j in (1..=k.min(i)).rev() {
            row[j] = log_sum_exp(&[(j as f64).ln() + row[j], row[j - 1]]);
        }
        row[0] = f64::NEG_INFINITY;
    }
    row[k]
}

/// Log prior probability of a set partition when every partition with `k`
/// blocks has weight `split_weight^(k - 1)`.
///
/// A split weight of one makes all partitions equally likely.
pub fn ln_split_weight_probability(partition: &[usize], split_weight: f64) -> f64 {
    let n = partition.len();
    if n == 0 {
        return 0.0;
    }
    let blocks = partition.iter().collect::<BTreeSet<_>>().len();
    let ln_weight = split_weight.ln();
    let terms: Vec<f64> = (1..=n)
        .map(|k| ln_stirling2(n, k) + (k - 1) as f64 * ln_weight)
        .collect();
    (blocks - 1) as f64 * ln_weight - log_sum_exp(&terms)
}

/// Probabilities of moving `k` of `n` elements out of a block, for `k` in
/// `1..n`, when every ordered split into two non-empty blocks is equally
/// likely: `C(n, k) / (2^n - 2)`. Empty for fewer than two elements.
pub fn split_subset_size_probabilities(n: usize) -> Vec<f64> {
    if n < 2 {
        return Vec::new();
    }
    let ln_splits = ln_number_of_ordered_splits(n);
    let ln_factorial = |m: usize| ln_gamma(m as f64 + 1.0);
    (1..n)
        .map(|k| (ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k) - ln_splits).exp())
        .collect()
}

/// `ln(2^n - 2)`, the log number of ways to split `n` elements into an
/// ordered pair of non-empty blocks.
pub fn ln_number_of_ordered_splits(n: usize) -> f64 {
    ln_stirling2(n, 2) + std::f64::consts::LN_2
}

/// Expected number of events among `elements` draws from a Dirichlet
/// process with the given concentration.
pub fn dpp_expected_number_of_events(concentration: f64, elements: usize) -> f64 {
    (0..elements)
        .map(|i| concentration / (concentration + i as f64))
        .sum()
}

/// Solves for the concentration whose expected number of events equals
/// `expected`. Requires `1 < expected < elements`.
pub fn dpp_concentration_for_expected_events(
    expected: f64,
    elements: usize,
) -> Result<f64, EcoError> {
    let upper_bound = elements as f64;
    if !(expected > 1.0 && expected < upper_bound) {
        return Err(EcoError::Config(
            ErrorInfo::new(
                "expected-events-out-of-range",
                "expected number of events must lie strictly between 1 and the number of comparisons",
            )
            .with_context("expected", expected)
            .with_context("elements", elements),
        ));
    }
    let mut low = 1e-12_f64;
    let mut high = 1.0_f64;
    while dpp_expected_number_of_events(high, elements) < expected {
        high *= 2.0;
        if !high.is_finite() {
            return Err(EcoError::Config(ErrorInfo::new(
                "concentration-unbounded",
                "failed to bracket the concentration parameter",
            )));
        }
    }
    for _ in 0..200 {
        let mid = 0.5 * (low + high);
        if dpp_expected_number_of_events(mid, elements) < expected {
            low = mid;
        } else {
            high = mid;
        }
        if (high - low) <= 1e-14 * high {
            break;
        }
    }
    Ok(0.5 * (low + high))
}

/// Relabels a partition so that labels appear in first-seen order starting at 0.
pub fn standardize_partition(partition: &[usize]) -> Vec<usize> {
    let mut relabel: BTreeMap<usize, usize> = BTreeMap::new();
    partition
        .iter()
        .map(|label| {
            let next = relabel.len();
            *relabel.entry(*label).or_insert(next)
        })
        .collect()
}

/// Canonical string for a partition, e.g. `"0,0,1"`.
pub fn partition_signature(partition: &[usize]) -> String {
    standardize_partition(partition)
        .iter()
        .map(|label| label.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Log probability of a set partition under the Ewens sampling formula
/// (Chinese restaurant process) with the given concentration.
pub fn ln_ewens_probability(partition: &[usize], concentration: f64) -> f64 {
    if partition.is_empty() {
        return 0.0;
    }
    let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
    for label in partition {
        *sizes.entry(*label).or_insert(0) += 1;
    }
    let blocks = sizes.len() as f64;
    let n = partition.len() as f64;
    let ln_block_sizes: f64 = sizes.values().map(|&size| ln_gamma(size as f64)).sum();
    blocks * concentration.ln() + ln_block_sizes + ln_gamma(concentration)
        - ln_gamma(concentration + n)
}
