//! Tunable parameters of the seeding pipeline
use std::time::Duration;

use derive_builder::Builder;
use serde::{de, Deserialize, Deserializer};

use crate::configuration::Configuration;
use crate::population::essentiality::{ScoreError, ScoreMetric};

/// Metabolites never considered for a composition, matched exactly against metabolite ids
pub const DEFAULT_EXCLUDED_METABOLITES: [&str; 12] = [
    "atp", "h2o", "adp", "pi", "h", "ppi", "atp_c", "h2o_c", "adp_c", "pi_c", "h_c", "ppi_c",
];

/// Options for [`make_initial_population`](crate::population::make_initial_population)
///
/// Build with [`SeedingOptionsBuilder`], unset fields take their default:
/// ```rust
/// use std::time::Duration;
/// use bofpop_core::population::essentiality::ScoreMetric;
/// use bofpop_core::population::options::SeedingOptionsBuilder;
/// let options = SeedingOptionsBuilder::default()
///     .timeout(Duration::from_secs(5))
///     .seed(42)
///     .build()
///     .unwrap();
/// assert_eq!(options.score_metric, ScoreMetric::MatthewsCorrelation);
/// assert_eq!(options.population_divisor, 20);
/// ```
/// or deserialize from JSON, with the timeout given in seconds.
#[derive(Builder, Clone, Debug, PartialEq, Deserialize)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct SeedingOptions {
    /// Wall clock limit of a single production test
    #[serde(rename = "timeout_secs", deserialize_with = "seconds")]
    pub timeout: Duration,
    /// Wall clock limit of scoring one metabolite, which runs one knockout per gene
    ///
    /// Unlimited when unset.
    #[serde(rename = "scoring_timeout_secs", deserialize_with = "optional_seconds")]
    #[builder(setter(strip_option))]
    pub scoring_timeout: Option<Duration>,
    /// Optimum a trial objective must exceed to count as producible
    pub solvability_threshold: f64,
    /// Growth above which a knockout is predicted (or measured) as non-essential
    pub growth_threshold: f64,
    /// Magnitude of the coefficient given to metabolites added to the base biomass
    pub new_metabolite_coefficient: f64,
    /// Each population holds at least `ceil(index size / population_divisor)` individuals
    pub population_divisor: usize,
    pub score_metric: ScoreMetric,
    #[builder(setter(into))]
    pub excluded_metabolites: Vec<String>,
    /// Seed for composition sampling, drawn from entropy when unset
    #[builder(setter(strip_option))]
    pub seed: Option<u64>,
    /// Sampling rounds allowed per population before giving up, unlimited when unset
    #[builder(setter(strip_option))]
    pub max_rounds: Option<usize>,
    /// Number of evaluations running at once
    pub workers: usize,
}

impl Default for SeedingOptions {
    fn default() -> Self {
        SeedingOptions {
            timeout: Duration::from_secs(40),
            scoring_timeout: None,
            solvability_threshold: 1e-9,
            growth_threshold: 1e-3,
            new_metabolite_coefficient: 0.1,
            population_divisor: 20,
            score_metric: ScoreMetric::MatthewsCorrelation,
            excluded_metabolites: DEFAULT_EXCLUDED_METABOLITES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            seed: None,
            max_rounds: None,
            workers: Configuration::current().processes,
        }
    }
}

impl SeedingOptions {
    /// Check every parameter, returning a description of the first invalid one
    pub fn validate(&self) -> Result<(), String> {
        check_timeout(self.timeout)?;
        if let Some(timeout) = self.scoring_timeout {
            check_timeout(timeout)?;
        }
        check_threshold("solvability_threshold", self.solvability_threshold)?;
        check_threshold("growth_threshold", self.growth_threshold)?;
        check_coefficient(self.new_metabolite_coefficient)?;
        check_positive("population_divisor", self.population_divisor)?;
        check_positive("workers", self.workers)?;
        if let Some(rounds) = self.max_rounds {
            check_positive("max_rounds", rounds)?;
        }
        Ok(())
    }
}

impl SeedingOptionsBuilder {
    /// Set the score metric from its name, e.g. `"mcc"` or `"hamming"`
    pub fn score_metric_name(&mut self, name: &str) -> Result<&mut Self, ScoreError> {
        self.score_metric = Some(name.parse()?);
        Ok(self)
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(timeout) = self.timeout {
            check_timeout(timeout)?;
        }
        if let Some(Some(timeout)) = self.scoring_timeout {
            check_timeout(timeout)?;
        }
        if let Some(threshold) = self.solvability_threshold {
            check_threshold("solvability_threshold", threshold)?;
        }
        if let Some(threshold) = self.growth_threshold {
            check_threshold("growth_threshold", threshold)?;
        }
        if let Some(coefficient) = self.new_metabolite_coefficient {
            check_coefficient(coefficient)?;
        }
        if let Some(divisor) = self.population_divisor {
            check_positive("population_divisor", divisor)?;
        }
        if let Some(workers) = self.workers {
            check_positive("workers", workers)?;
        }
        if let Some(Some(rounds)) = self.max_rounds {
            check_positive("max_rounds", rounds)?;
        }
        Ok(())
    }
}

fn check_timeout(timeout: Duration) -> Result<(), String> {
    if timeout.is_zero() {
        return Err("timeout must be longer than zero".to_string());
    }
    Ok(())
}

fn check_threshold(name: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0. {
        return Err(format!("{name} must be a finite non-negative number, got {value}"));
    }
    Ok(())
}

fn check_coefficient(value: f64) -> Result<(), String> {
    if !value.is_finite() || value == 0. {
        return Err(format!(
            "new_metabolite_coefficient must be finite and non-zero, got {value}"
        ));
    }
    Ok(())
}

fn check_positive(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{name} must be at least 1"));
    }
    Ok(())
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
}

fn optional_seconds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Option::<f64>::deserialize(deserializer)?
        .map(|secs| Duration::try_from_secs_f64(secs).map_err(de::Error::custom))
        .transpose()
}
