//! Seed populations of biomass compositions
//!
//! [`make_initial_population`] first narrows the metabolites of a model down to a metabolite
//! index:
//! 1. hub metabolites are removed ([`branching`]),
//! 2. base biomass metabolites and the fixed exclusion set are removed,
//! 3. metabolites the network cannot produce are removed ([`solvability`]),
//! 4. the rest are scored against experimental gene essentiality, and only the best scoring are
//!    kept ([`essentiality`]).
//!
//! It then samples random compositions over that index until each population is large enough
//! ([`synthesis`]), and writes every population to its own CSV file.
pub mod branching;
pub mod essentiality;
pub mod matrix;
pub mod options;
pub mod solvability;
pub mod stats;
pub mod synthesis;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::io::tables::{write_population, TableError};
use crate::metabolic_model::biomass::BaseBiomass;
use crate::optimize::{MetabolicNetwork, Optimizer};
use crate::population::essentiality::{binarise, score_metabolites, select_by_score, ScoreError};
use crate::population::matrix::PopulationError;
use crate::population::options::SeedingOptions;
use crate::runner::TaskRunner;

/// Errors aborting the seeding pipeline
#[derive(Debug, Error)]
pub enum SeedingError {
    #[error("No metabolite survived the selection filters")]
    EmptyMetaboliteIndex,
    #[error("Malformed base biomass: {0}")]
    MalformedBaseBiomass(String),
    #[error("At least one population must be requested")]
    NoPopulationsRequested,
    #[error("Unsupported score metric")]
    UnsupportedScoreMetric(#[from] ScoreError),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error(
        "Population {population} holds {accepted} of {target} individuals after {rounds} rounds"
    )]
    PopulationQuotaNotReached {
        population: usize,
        accepted: usize,
        target: usize,
        rounds: usize,
    },
    #[error("Invalid population")]
    Population(#[from] PopulationError),
    #[error("Unable to write population")]
    Table(#[from] TableError),
}

/// Select the metabolites compositions are sampled from, best scoring first
///
/// Production tests use `runner`. Scoring shares its worker pool, with the scoring timeout of
/// `options` in place of the runner's own.
pub fn generate_metabolite_index<M>(
    runner: &TaskRunner,
    model: &M,
    base_biomass: &BaseBiomass,
    experimental_essentiality: &IndexMap<String, f64>,
    options: &SeedingOptions,
) -> Result<Vec<String>, SeedingError>
where
    M: MetabolicNetwork + Optimizer + Clone + Send + 'static,
{
    let metabolites = model.metabolite_ids();
    info!("Building the metabolite index from {} metabolites", metabolites.len());
    let candidates = branching::remove_hubs(model, metabolites);

    let excluded: IndexSet<&str> = options
        .excluded_metabolites
        .iter()
        .map(String::as_str)
        .collect();
    let candidates: Vec<String> = candidates
        .into_iter()
        .filter(|id| !base_biomass.contains(id) && !excluded.contains(id.as_str()))
        .collect();
    info!(
        "{} candidates remain outside the base biomass and exclusion set",
        candidates.len()
    );

    let candidates =
        solvability::filter_solvable(runner, model, candidates, options.solvability_threshold);

    let observed = binarise(experimental_essentiality, options.growth_threshold);
    let scoring_runner = runner.with_timeout(options.scoring_timeout);
    let scores = score_metabolites(
        &scoring_runner,
        model,
        candidates,
        &observed,
        options.score_metric,
        options.growth_threshold,
    );
    let index = select_by_score(scores, options.score_metric);
    if index.is_empty() {
        return Err(SeedingError::EmptyMetaboliteIndex);
    }
    info!("Metabolite index holds {} metabolites", index.len());
    Ok(index)
}

/// Generate `number_of_populations` seed populations for the biomass search
///
/// Population `n` is written to `{population_name}_{n}.csv`, and the paths of the written files
/// are returned in order.
pub fn make_initial_population<M, P>(
    population_name: P,
    model: &M,
    base_biomass: &BaseBiomass,
    experimental_essentiality: &IndexMap<String, f64>,
    number_of_populations: usize,
    options: &SeedingOptions,
) -> Result<Vec<PathBuf>, SeedingError>
where
    M: MetabolicNetwork + Optimizer + Clone + Send + 'static,
    P: AsRef<Path>,
{
    options.validate().map_err(SeedingError::InvalidOptions)?;
    if number_of_populations == 0 {
        return Err(SeedingError::NoPopulationsRequested);
    }
    if let Some((missing, _)) = base_biomass.iter().find(|(id, _)| !model.has_metabolite(id)) {
        return Err(SeedingError::MalformedBaseBiomass(format!(
            "metabolite {missing} is not in the model"
        )));
    }

    let runner = TaskRunner::new(options.workers, options.timeout);
    let index =
        generate_metabolite_index(&runner, model, base_biomass, experimental_essentiality, options)?;

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut written = Vec::with_capacity(number_of_populations);
    for n in 0..number_of_populations {
        let population = synthesis::synthesize_population(
            &runner,
            model,
            &index,
            base_biomass,
            options,
            n,
            &mut rng,
        )?;
        let path = population_path(population_name.as_ref(), n);
        write_population(&path, &population)?;
        info!("Wrote population {n} to {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn population_path(population_name: &Path, n: usize) -> PathBuf {
    let mut name = OsString::from(population_name.as_os_str());
    name.push(format!("_{n}.csv"));
    PathBuf::from(name)
}
