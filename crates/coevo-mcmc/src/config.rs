use std::collections::BTreeSet;
use std::path::Path;

use coevo_core::errors::{EcoError, ErrorInfo};
use coevo_core::math::dpp_concentration_for_expected_events;
use coevo_core::{Prior, RngHandle};
use serde::{Deserialize, Serialize};

use crate::moves_dpp::DEFAULT_AUXILIARY_CATEGORIES;
use crate::parameter::{Domain, RealParameter};
use crate::tuning::DEFAULT_TARGET_ACCEPTANCE;

/// YAML-configurable description of a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Chain length and sampling.
    #[serde(default)]
    pub chain: ChainConfig,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Comparisons, priors and event model.
    pub model: ModelConfig,
    /// Operator weights, tuning and auto-optimization.
    #[serde(default)]
    pub operators: OperatorScheduleConfig,
}

impl RunConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self, EcoError> {
        serde_yaml::from_str(source).map_err(|err| {
            EcoError::Serde(ErrorInfo::new("config-parse", err.to_string()))
        })
    }

    /// Reads and parses a YAML file.
    pub fn from_yaml_path(path: &Path) -> Result<Self, EcoError> {
        let source = std::fs::read_to_string(path).map_err(|err| {
            EcoError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        Self::from_yaml_str(&source)
    }

    /// Serializes to YAML.
    pub fn to_yaml_string(&self) -> Result<String, EcoError> {
        serde_yaml::to_string(self)
            .map_err(|err| EcoError::Serde(ErrorInfo::new("config-write", err.to_string())))
    }

    /// Checks the whole configuration for inconsistencies.
    pub fn validate(&self) -> Result<(), EcoError> {
        self.chain.validate()?;
        self.model.validate()?;
        self.operators.validate()
    }
}

/// Chain length and sampling frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of iterations (one operator draw each).
    #[serde(default = "default_iterations")]
    pub iterations: u64,
    /// Record a sample every this many iterations.
    #[serde(default = "default_sample_frequency")]
    pub sample_frequency: u64,
    /// Iterations discarded before sampling starts.
    #[serde(default)]
    pub burn_in: u64,
}

fn default_iterations() -> u64 {
    10_000
}

fn default_sample_frequency() -> u64 {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            sample_frequency: default_sample_frequency(),
            burn_in: 0,
        }
    }
}

impl ChainConfig {
    fn validate(&self) -> Result<(), EcoError> {
        if self.iterations == 0 || self.sample_frequency == 0 {
            return Err(EcoError::Config(
                ErrorInfo::new("chain-length", "iterations and sample frequency must be positive")
                    .with_context("iterations", self.iterations)
                    .with_context("sample_frequency", self.sample_frequency),
            ));
        }
        Ok(())
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded with the run.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x0EC0_E501_17D1_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Comparisons, priors and the event model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Prior on every event height.
    pub event_time_prior: Prior,
    /// How comparisons are grouped into events.
    #[serde(default)]
    pub event_model: EventModelConfig,
    /// Comparisons in order.
    pub comparisons: Vec<ComparisonConfig>,
}

impl ModelConfig {
    /// Checks priors, domains and partition shapes.
    pub fn validate(&self) -> Result<(), EcoError> {
        if self.comparisons.is_empty() {
            return Err(EcoError::config(
                "no-comparisons",
                "the model needs at least one comparison",
            ));
        }
        self.event_time_prior.validate()?;
        if !Domain::NonNegative.admits(&self.event_time_prior) {
            return Err(EcoError::Config(
                ErrorInfo::new("event-time-prior-support", "event heights must be non-negative")
                    .with_context("family", self.event_time_prior.family()),
            ));
        }
        let mut labels = BTreeSet::new();
        for comparison in &self.comparisons {
            if !labels.insert(comparison.label.as_str()) {
                return Err(EcoError::Config(
                    ErrorInfo::new("duplicate-label", "comparison labels must be unique")
                        .with_context("comparison", &comparison.label),
                ));
            }
            comparison.validate()?;
        }
        let n = self.comparisons.len();
        match &self.event_model {
            EventModelConfig::Independent | EventModelConfig::Shared => Ok(()),
            EventModelConfig::Fixed { partition } => check_partition_length(partition, n),
            EventModelConfig::DirichletProcess {
                concentration,
                initial_partition,
            } => {
                concentration.resolve_value(n)?;
                if concentration.estimate {
                    match &concentration.prior {
                        Some(prior) if Domain::Positive.admits(prior) => prior.validate()?,
                        Some(prior) => {
                            return Err(EcoError::Config(
                                ErrorInfo::new(
                                    "concentration-prior-support",
                                    "concentration prior must be on positive values",
                                )
                                .with_context("family", prior.family()),
                            ))
                        }
                        None => {
                            return Err(EcoError::config(
                                "concentration-prior-missing",
                                "an estimated concentration needs a prior",
                            ))
                        }
                    }
                }
                check_initial_partition(initial_partition, n)
            }
            EventModelConfig::SplitWeight {
                split_weight,
                initial_partition,
            } => {
                split_weight.validate()?;
                check_initial_partition(initial_partition, n)
            }
        }
    }
}

fn check_initial_partition(initial: &InitialPartition, comparisons: usize) -> Result<(), EcoError> {
    match initial {
        InitialPartition::Explicit { partition } => check_partition_length(partition, comparisons),
        _ => Ok(()),
    }
}

fn check_partition_length(partition: &[usize], comparisons: usize) -> Result<(), EcoError> {
    if partition.len() == comparisons {
        Ok(())
    } else {
        Err(EcoError::Config(
            ErrorInfo::new("partition-length", "partition must list one event per comparison")
                .with_context("comparisons", comparisons)
                .with_context("partition", partition.len()),
        ))
    }
}

/// Grouping of comparisons into events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventModelConfig {
    /// One event per comparison, never merged.
    #[default]
    Independent,
    /// All comparisons share a single event.
    Shared,
    /// An explicit fixed mapping from comparison index to event label.
    Fixed {
        /// Event label per comparison.
        partition: Vec<usize>,
    },
    /// Partition drawn from a Dirichlet process and resampled during the run.
    DirichletProcess {
        /// Concentration parameter settings.
        concentration: ConcentrationConfig,
        /// Starting partition.
        #[serde(default)]
        initial_partition: InitialPartition,
    },
    /// Partition with prior weight `split_weight^(events - 1)`, resampled
    /// by reversible-jump split and merge moves.
    SplitWeight {
        /// Split weight settings.
        #[serde(default)]
        split_weight: SplitWeightConfig,
        /// Starting partition.
        #[serde(default)]
        initial_partition: InitialPartition,
    },
}

/// Starting partition for a Dirichlet process model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InitialPartition {
    /// Every comparison in its own event.
    #[default]
    Singletons,
    /// Every comparison in one event.
    Shared,
    /// An explicit assignment.
    Explicit {
        /// Event label per comparison.
        partition: Vec<usize>,
    },
    /// A draw from the event model's prior.
    FromPrior,
}

/// Dirichlet process concentration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcentrationConfig {
    /// Concentration value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Alternative to `value`: the prior expected number of events.
    #[serde(default)]
    pub expected_number_of_events: Option<f64>,
    /// Whether the concentration is estimated.
    #[serde(default)]
    pub estimate: bool,
    /// Prior used when estimated.
    #[serde(default)]
    pub prior: Option<Prior>,
}

impl ConcentrationConfig {
    /// Concentration implied by these settings for `comparisons` elements.
    pub fn resolve_value(&self, comparisons: usize) -> Result<f64, EcoError> {
        let value = match (self.value, self.expected_number_of_events) {
            (Some(value), None) => value,
            (None, Some(expected)) => dpp_concentration_for_expected_events(expected, comparisons)?,
            (Some(_), Some(_)) => {
                return Err(EcoError::config(
                    "concentration-overspecified",
                    "give either a concentration value or an expected number of events",
                ))
            }
            (None, None) => {
                return Err(EcoError::config(
                    "concentration-missing",
                    "a Dirichlet process needs a concentration value or an expected number of events",
                ))
            }
        };
        if Domain::Positive.contains(value) {
            Ok(value)
        } else {
            Err(EcoError::Config(
                ErrorInfo::new("concentration-value", "concentration must be positive")
                    .with_context("value", value),
            ))
        }
    }
}

/// Split weight settings. A weight of one makes every partition equally likely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitWeightConfig {
    /// Initial (or fixed) split weight.
    #[serde(default = "default_split_weight")]
    pub value: f64,
    /// Whether the split weight is estimated.
    #[serde(default)]
    pub estimate: bool,
    /// Prior used when estimated.
    #[serde(default)]
    pub prior: Option<Prior>,
}

fn default_split_weight() -> f64 {
    1.0
}

impl Default for SplitWeightConfig {
    fn default() -> Self {
        Self {
            value: default_split_weight(),
            estimate: false,
            prior: None,
        }
    }
}

impl SplitWeightConfig {
    fn validate(&self) -> Result<(), EcoError> {
        if !Domain::Positive.contains(self.value) {
            return Err(EcoError::Config(
                ErrorInfo::new("split-weight-value", "split weight must be positive")
                    .with_context("value", self.value),
            ));
        }
        if self.estimate {
            match &self.prior {
                Some(prior) if Domain::Positive.admits(prior) => prior.validate()?,
                Some(prior) => {
                    return Err(EcoError::Config(
                        ErrorInfo::new(
                            "split-weight-prior-support",
                            "split weight prior must be on positive values",
                        )
                        .with_context("family", prior.family()),
                    ))
                }
                None => {
                    return Err(EcoError::config(
                        "split-weight-prior-missing",
                        "an estimated split weight needs a prior",
                    ))
                }
            }
        }
        Ok(())
    }
}

/// One comparison (population pair or singleton).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonConfig {
    /// Unique label.
    pub label: String,
    /// 2 for a pair, 1 for a singleton.
    #[serde(default = "default_leaf_count")]
    pub leaf_count: usize,
    /// Population size settings shared by root and leaves.
    pub population_size: PopulationSizeConfig,
    /// Mutation rate settings.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: ParameterConfig,
    /// Frequency of the first allele.
    #[serde(default = "default_freq_1")]
    pub freq_1: ParameterConfig,
}

fn default_leaf_count() -> usize {
    2
}

fn default_mutation_rate() -> ParameterConfig {
    ParameterConfig::fixed(1.0)
}

fn default_freq_1() -> ParameterConfig {
    ParameterConfig::fixed(0.5)
}

impl ComparisonConfig {
    fn validate(&self) -> Result<(), EcoError> {
        if !(1..=2).contains(&self.leaf_count) {
            return Err(EcoError::Config(
                ErrorInfo::new("leaf-count", "comparisons have one or two leaves")
                    .with_context("comparison", &self.label)
                    .with_context("leaf_count", self.leaf_count),
            ));
        }
        let in_comparison = |err: EcoError| match err {
            EcoError::Config(info) => EcoError::Config(info.with_context("comparison", &self.label)),
            other => other,
        };
        self.population_size
            .parameter()
            .validate("population_size", Domain::Positive)
            .map_err(in_comparison)?;
        self.mutation_rate
            .validate("mutation_rate", Domain::Positive)
            .map_err(in_comparison)?;
        self.freq_1
            .validate("freq_1", Domain::OpenUnitInterval)
            .map_err(in_comparison)
    }
}

/// Population size settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationSizeConfig {
    /// Initial value; drawn from the prior when absent.
    #[serde(default)]
    pub value: Option<f64>,
    /// Prior on each size.
    #[serde(default)]
    pub prior: Option<Prior>,
    /// Whether the sizes are fixed.
    #[serde(default)]
    pub fixed: bool,
    /// Whether root and leaf sizes are constrained equal.
    #[serde(default)]
    pub constrained: bool,
}

impl PopulationSizeConfig {
    /// Per-size parameter settings.
    pub fn parameter(&self) -> ParameterConfig {
        ParameterConfig {
            value: self.value,
            prior: self.prior.clone(),
            fixed: self.fixed,
        }
    }
}

/// Settings of a scalar parameter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Initial value; drawn from the prior when absent.
    #[serde(default)]
    pub value: Option<f64>,
    /// Prior of an estimated parameter.
    #[serde(default)]
    pub prior: Option<Prior>,
    /// Whether the parameter is fixed.
    #[serde(default)]
    pub fixed: bool,
}

impl ParameterConfig {
    /// Fixed parameter at `value`.
    pub fn fixed(value: f64) -> Self {
        Self {
            value: Some(value),
            prior: None,
            fixed: true,
        }
    }

    /// Estimated parameter under `prior`.
    pub fn estimated(prior: Prior) -> Self {
        Self {
            value: None,
            prior: Some(prior),
            fixed: false,
        }
    }

    fn validate(&self, name: &str, domain: Domain) -> Result<(), EcoError> {
        if self.fixed && self.value.is_none() {
            return Err(EcoError::Config(
                ErrorInfo::new("fixed-without-value", "a fixed parameter needs a value")
                    .with_context("parameter", name),
            ));
        }
        if !self.fixed {
            let Some(prior) = &self.prior else {
                return Err(EcoError::Config(
                    ErrorInfo::new("estimated-without-prior", "an estimated parameter needs a prior")
                        .with_context("parameter", name),
                ));
            };
            prior.validate()?;
            if !domain.admits(prior) {
                return Err(EcoError::Config(
                    ErrorInfo::new("prior-support", "prior support does not match the parameter")
                        .with_context("parameter", name)
                        .with_context("family", prior.family()),
                ));
            }
        }
        if let Some(value) = self.value {
            if !domain.contains(value) {
                return Err(EcoError::Config(
                    ErrorInfo::new("value-out-of-domain", "initial value outside the parameter domain")
                        .with_context("parameter", name)
                        .with_context("value", value),
                ));
            }
        }
        Ok(())
    }

    /// Builds the parameter, drawing an unset initial value from the prior.
    pub fn build(
        &self,
        name: &'static str,
        domain: Domain,
        rng: &mut RngHandle,
    ) -> Result<RealParameter, EcoError> {
        self.validate(name, domain)?;
        match (&self.prior, self.fixed, self.value) {
            (_, true, Some(value)) => RealParameter::fixed(name, value, domain),
            (Some(prior), false, Some(value)) => {
                RealParameter::estimated(name, value, prior.clone(), domain)
            }
            (Some(prior), false, None) => {
                let value = prior.draw(rng)?;
                RealParameter::estimated(name, value, prior.clone(), domain)
            }
            _ => Err(EcoError::Config(
                ErrorInfo::new("parameter-settings", "incomplete parameter settings")
                    .with_context("parameter", name),
            )),
        }
    }
}

/// Operator schedule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorScheduleConfig {
    /// Whether tuning parameters adapt during the run.
    #[serde(default = "default_auto_optimize")]
    pub auto_optimize: bool,
    /// Iterations before adaptation starts.
    #[serde(default = "default_auto_optimize_delay")]
    pub auto_optimize_delay: u64,
    /// Acceptance rate targeted by adaptation.
    #[serde(default = "default_target_acceptance")]
    pub target_acceptance: f64,
    /// Per-operator settings.
    #[serde(default)]
    pub operators: OperatorSettings,
}

fn default_auto_optimize() -> bool {
    true
}

fn default_auto_optimize_delay() -> u64 {
    1_000
}

fn default_target_acceptance() -> f64 {
    DEFAULT_TARGET_ACCEPTANCE
}

impl Default for OperatorScheduleConfig {
    fn default() -> Self {
        Self {
            auto_optimize: default_auto_optimize(),
            auto_optimize_delay: default_auto_optimize_delay(),
            target_acceptance: default_target_acceptance(),
            operators: OperatorSettings::default(),
        }
    }
}

impl OperatorScheduleConfig {
    fn validate(&self) -> Result<(), EcoError> {
        if !(self.target_acceptance > 0.0 && self.target_acceptance < 1.0) {
            return Err(EcoError::Config(
                ErrorInfo::new("target-acceptance", "target acceptance must lie in (0, 1)")
                    .with_context("value", self.target_acceptance),
            ));
        }
        self.operators.validate()
    }
}

/// Weight and tuning of every operator. A weight of zero disables it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSettings {
    /// Event height scaler.
    #[serde(default = "enabled_scaler")]
    pub event_height_scaler: ScaleSettings,
    /// Event height random walk.
    #[serde(default = "disabled_mover")]
    pub event_height_mover: WindowSettings,
    /// Root population size scaler.
    #[serde(default = "enabled_scaler")]
    pub root_population_size_scaler: ScaleSettings,
    /// Leaf population size scaler.
    #[serde(default = "enabled_scaler")]
    pub leaf_population_size_scaler: ScaleSettings,
    /// Mutation rate scaler.
    #[serde(default = "enabled_scaler")]
    pub mutation_rate_scaler: ScaleSettings,
    /// Frequency random walk.
    #[serde(default = "enabled_freq_mover")]
    pub freq_mover: WindowSettings,
    /// Dirichlet mixer of a comparison's size proportions.
    #[serde(default = "disabled_scaler")]
    pub relative_population_size_mixer: ScaleSettings,
    /// Scaler of all sizes of a comparison at once.
    #[serde(default = "disabled_scaler")]
    pub mean_population_size_scaler: ScaleSettings,
    /// Sum-preserving mover between root and leaf sizes.
    #[serde(default = "disabled_mover")]
    pub root_relative_population_size_mover: WindowSettings,
    /// Sum-preserving mover between one leaf and the other sizes.
    #[serde(default = "disabled_mover")]
    pub leaf_relative_population_size_mover: WindowSettings,
    /// Concentration or split weight scaler (only when that parameter is estimated).
    #[serde(default = "enabled_scaler")]
    pub concentration_scaler: ScaleSettings,
    /// Joint height and size scaler.
    #[serde(default = "disabled_scaler")]
    pub height_size_scaler: ScaleSettings,
    /// Joint height and size mixer.
    #[serde(default = "disabled_scaler")]
    pub height_size_mixer: ScaleSettings,
    /// Joint height, size and rate scaler. With independent sizes the mean
    /// size scaler of other tools is the same move, hence the alias.
    #[serde(default = "disabled_scaler", alias = "time_mean_size_rate_scaler")]
    pub height_size_rate_scaler: ScaleSettings,
    /// Joint height, size and rate mixer.
    #[serde(default = "disabled_scaler")]
    pub height_size_rate_mixer: ScaleSettings,
    /// Joint root size and height mixer.
    #[serde(default = "disabled_scaler")]
    pub time_root_size_mixer: ScaleSettings,
    /// Dirichlet process Gibbs sampler (only with a Dirichlet process event model).
    #[serde(default)]
    pub dirichlet_process_gibbs: GibbsSettings,
    /// Split and merge sampler (only with a split-weight event model).
    #[serde(default)]
    pub reversible_jump: ReversibleJumpSettings,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            event_height_scaler: enabled_scaler(),
            event_height_mover: disabled_mover(),
            root_population_size_scaler: enabled_scaler(),
            leaf_population_size_scaler: enabled_scaler(),
            mutation_rate_scaler: enabled_scaler(),
            freq_mover: enabled_freq_mover(),
            relative_population_size_mixer: disabled_scaler(),
            mean_population_size_scaler: disabled_scaler(),
            root_relative_population_size_mover: disabled_mover(),
            leaf_relative_population_size_mover: disabled_mover(),
            concentration_scaler: enabled_scaler(),
            height_size_scaler: disabled_scaler(),
            height_size_mixer: disabled_scaler(),
            height_size_rate_scaler: disabled_scaler(),
            height_size_rate_mixer: disabled_scaler(),
            time_root_size_mixer: disabled_scaler(),
            dirichlet_process_gibbs: GibbsSettings::default(),
            reversible_jump: ReversibleJumpSettings::default(),
        }
    }
}

impl OperatorSettings {
    fn validate(&self) -> Result<(), EcoError> {
        let scalers = [
            ("event_height_scaler", &self.event_height_scaler),
            ("root_population_size_scaler", &self.root_population_size_scaler),
            ("leaf_population_size_scaler", &self.leaf_population_size_scaler),
            ("mutation_rate_scaler", &self.mutation_rate_scaler),
            ("relative_population_size_mixer", &self.relative_population_size_mixer),
            ("mean_population_size_scaler", &self.mean_population_size_scaler),
            ("concentration_scaler", &self.concentration_scaler),
            ("height_size_scaler", &self.height_size_scaler),
            ("height_size_mixer", &self.height_size_mixer),
            ("height_size_rate_scaler", &self.height_size_rate_scaler),
            ("height_size_rate_mixer", &self.height_size_rate_mixer),
            ("time_root_size_mixer", &self.time_root_size_mixer),
        ];
        for (name, settings) in scalers {
            check_operator(name, settings.weight, settings.scale)?;
        }
        for (name, settings) in [
            ("event_height_mover", &self.event_height_mover),
            ("freq_mover", &self.freq_mover),
            (
                "root_relative_population_size_mover",
                &self.root_relative_population_size_mover,
            ),
            (
                "leaf_relative_population_size_mover",
                &self.leaf_relative_population_size_mover,
            ),
        ] {
            check_operator(name, settings.weight, settings.window)?;
        }
        check_operator("dirichlet_process_gibbs", self.dirichlet_process_gibbs.weight, 1.0)?;
        check_operator("reversible_jump", self.reversible_jump.weight, 1.0)?;
        if self.dirichlet_process_gibbs.auxiliary_categories == 0 {
            return Err(EcoError::config(
                "auxiliary-categories",
                "the Gibbs sampler needs at least one auxiliary category",
            ));
        }
        Ok(())
    }
}

fn check_operator(name: &str, weight: f64, tuning: f64) -> Result<(), EcoError> {
    if !(weight.is_finite() && weight >= 0.0 && tuning.is_finite() && tuning > 0.0) {
        return Err(EcoError::Config(
            ErrorInfo::new("operator-settings", "weights must be non-negative and tuning positive")
                .with_context("operator", name)
                .with_context("weight", weight)
                .with_context("tuning", tuning),
        ));
    }
    Ok(())
}

/// Scale operator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleSettings {
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Initial tuning of the multiplier.
    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// Random-walk operator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Initial half-width of the window.
    #[serde(default = "default_window")]
    pub window: f64,
}

/// Gibbs sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GibbsSettings {
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Auxiliary categories offered for new events per update.
    #[serde(default = "default_auxiliary_categories")]
    pub auxiliary_categories: usize,
}

impl Default for GibbsSettings {
    fn default() -> Self {
        Self {
            weight: default_weight(),
            auxiliary_categories: default_auxiliary_categories(),
        }
    }
}

/// Reversible-jump sampler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReversibleJumpSettings {
    /// Relative selection weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Default for ReversibleJumpSettings {
    fn default() -> Self {
        Self {
            weight: default_weight(),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

fn default_window() -> f64 {
    0.1
}

fn default_auxiliary_categories() -> usize {
    DEFAULT_AUXILIARY_CATEGORIES
}

fn enabled_scaler() -> ScaleSettings {
    ScaleSettings {
        weight: default_weight(),
        scale: default_scale(),
    }
}

fn disabled_scaler() -> ScaleSettings {
    ScaleSettings {
        weight: 0.0,
        scale: default_scale(),
    }
}

fn enabled_freq_mover() -> WindowSettings {
    WindowSettings {
        weight: default_weight(),
        window: default_window(),
    }
}

fn disabled_mover() -> WindowSettings {
    WindowSettings {
        weight: 0.0,
        window: default_window(),
    }
}
