#![deny(missing_docs)]

//! MCMC operators, adaptive schedule and Dirichlet process event sampling for
//! comparisons of divergence times across population pairs.

/// Event arena, partition bookkeeping and collection-level likelihood/prior.
pub mod collection;
/// Per-comparison parameters and snapshots.
pub mod comparison;
/// YAML configuration schema and defaults.
pub mod config;
/// Chain driver and public `run` entry points.
pub mod kernel;
/// Likelihood seam between the sampler and the data model.
pub mod likelihood;
/// Sample recording and summary statistics.
pub mod metrics;
/// Dirichlet process Gibbs sampler and concentration scaler.
pub mod moves_dpp;
/// Reversible-jump split and merge sampler for the split-weight model.
pub mod moves_jump;
/// Event height and composite height/size/rate operators.
pub mod moves_time;
/// Univariate operators on comparison parameters.
pub mod moves_tree;
/// Operator trait, shared counters and Metropolis-Hastings step.
pub mod operator;
/// Real-valued parameters with priors and domains.
pub mod parameter;
/// Weighted operator schedule with auto-optimization.
pub mod schedule;
/// Robbins-Monro tuning of operator step sizes.
pub mod tuning;

pub use collection::{CollectionSnapshot, EventModel, ModelCollection};
pub use comparison::{ComparisonSnapshot, ComparisonState, PopulationSizes};
pub use config::{
    ChainConfig, ComparisonConfig, ConcentrationConfig, EventModelConfig, InitialPartition,
    ModelConfig, OperatorScheduleConfig, OperatorSettings, ParameterConfig, PopulationSizeConfig,
    ReversibleJumpSettings, RunConfig, SeedPolicy, SplitWeightConfig,
};
pub use kernel::{run, run_chain, run_with_likelihood, RunSummary};
pub use likelihood::{IgnoreData, LikelihoodModel};
pub use metrics::{ChainSample, ComparisonSample, RunningMoments, SampleRecorder};
pub use moves_dpp::{ConcentrationScaler, DirichletProcessGibbsSampler};
pub use moves_jump::ReversibleJumpSampler;
pub use moves_time::{TimeMove, TimeOperator, UnivariateSweep};
pub use moves_tree::{TreeMove, TreeOperator};
pub use operator::{metropolis_hastings_step, Operator, OperatorKind, OperatorReport, Scope};
pub use parameter::{Domain, RealParameter};
pub use schedule::OperatorSchedule;
pub use tuning::{robbins_monro_update, TunableParameter, TuningState};
