#![deny(missing_docs)]
#![doc = "Shared building blocks for the coevo divergence-time sampler: the error taxonomy, seeded randomness, continuous priors and partition math for the Dirichlet-process and split-weight event models."]

pub mod errors;
pub mod math;
pub mod prior;
pub mod rng;

pub use errors::{EcoError, ErrorInfo};
pub use math::{
    dpp_concentration_for_expected_events, dpp_expected_number_of_events, ln_dirichlet_pdf,
    ln_ewens_probability, ln_number_of_ordered_splits, ln_split_weight_probability, ln_stirling2,
    log_sum_exp, normalize_log_weights, partition_signature, split_subset_size_probabilities,
    standardize_partition,
};
pub use prior::Prior;
pub use rng::{derive_substream_seed, RngHandle};
