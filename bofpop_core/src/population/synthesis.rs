//! Rejection sampling of random biomass compositions
//!
//! Each round draws one candidate per worker: the metabolite index is shuffled, a random number
//! of metabolites `k` in `[1, index size]` is drawn, and the first `k` shuffled metabolites are
//! added to the base biomass. Candidates whose composition the network can produce are
//! accepted, the others are dropped. Rounds continue until the population holds at least its
//! target number of individuals, and every feasible candidate of the final round is kept.
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::metabolic_model::biomass::{BaseBiomass, BiomassObjective};
use crate::optimize::Optimizer;
use crate::population::matrix::{Composition, Population};
use crate::population::options::SeedingOptions;
use crate::population::solvability::objective_is_feasible;
use crate::population::SeedingError;
use crate::runner::{CancellationToken, TaskOutcome, TaskRunner};

/// Minimum number of individuals in a population over an index of `index_len` metabolites
pub fn target_size(index_len: usize, divisor: usize) -> usize {
    index_len.div_ceil(divisor.max(1)).max(1)
}

/// Draw a random non-empty composition over an index of `len` metabolites
pub fn draw_composition<R: Rng>(len: usize, rng: &mut R) -> Composition {
    if len == 0 {
        return Composition::from_positions(0, &[]);
    }
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    let k = rng.gen_range(1..=len);
    Composition::from_positions(len, &order[..k])
}

/// Sample one population over `index`
///
/// All random draws happen on the calling thread and candidates are accepted in worker order, so
/// the population depends only on the state of `rng`. `population_id` is only used in logs
/// and errors.
pub fn synthesize_population<M>(
    runner: &TaskRunner,
    model: &M,
    index: &[String],
    base: &BaseBiomass,
    options: &SeedingOptions,
    population_id: usize,
    rng: &mut StdRng,
) -> Result<Population, SeedingError>
where
    M: Optimizer + Clone + Send + 'static,
{
    if index.is_empty() {
        return Err(SeedingError::EmptyMetaboliteIndex);
    }
    let target = target_size(index.len(), options.population_divisor);
    let threshold = options.solvability_threshold;
    let mut population = Population::new(index.to_vec());
    let mut round = 0;
    info!("Sampling population {population_id}, aiming for {target} individuals");

    while population.len() < target {
        round += 1;
        if options.max_rounds.is_some_and(|max| round > max) {
            return Err(SeedingError::PopulationQuotaNotReached {
                population: population_id,
                accepted: population.len(),
                target,
                rounds: round - 1,
            });
        }

        let mut candidates = Vec::with_capacity(runner.workers());
        let mut objectives = Vec::with_capacity(runner.workers());
        for core in 0..runner.workers() {
            let composition = draw_composition(index.len(), rng);
            let objective = BiomassObjective::from_composition(
                base,
                composition.included(index),
                options.new_metabolite_coefficient,
            )
            .map_err(|err| SeedingError::MalformedBaseBiomass(err.to_string()))?;
            candidates.push(Some((format!("biomass{round}_{core}"), composition)));
            objectives.push(objective);
        }

        let reports = runner.run(
            model,
            objectives,
            move |mut model: M, objective: BiomassObjective, _cancel: &CancellationToken| {
                objective_is_feasible(&mut model, &objective, threshold)
            },
        );
        let mut feasible: Vec<usize> = reports
            .into_iter()
            .filter(|r| r.outcome == TaskOutcome::Completed(true))
            .map(|r| r.task_id)
            .collect();
        feasible.sort_unstable();
        for core in feasible {
            if let Some((name, composition)) = candidates.get_mut(core).and_then(Option::take) {
                population.insert(name, composition)?;
            }
        }
        debug!(
            "Round {round} of population {population_id}: {} of {target} individuals",
            population.len()
        );
    }
    info!(
        "Population {population_id} holds {} individuals after {round} rounds",
        population.len()
    );
    Ok(population)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use indexmap::IndexMap;
    use rand::SeedableRng;

    use super::*;
    use crate::metabolic_model::model::Model;
    use crate::metabolic_model::reaction::ReactionBuilder;
    use crate::population::options::SeedingOptionsBuilder;

    /// `base` and `m1`..`m5` are taken up from the medium, `dead` is never produced
    fn model() -> Model {
        let mut model = Model::new_empty();
        for met in ["base", "m1", "m2", "m3", "m4", "m5"] {
            model.add_reaction(
                ReactionBuilder::default()
                    .id(format!("EX_{met}"))
                    .metabolites([(met.to_string(), 1.)].into_iter().collect())
                    .lower_bound(0.)
                    .upper_bound(10.)
                    .build()
                    .unwrap(),
            );
        }
        model.add_reaction(
            ReactionBuilder::default()
                .id("SINK_dead".to_string())
                .metabolites([("dead".to_string(), -1.)].into_iter().collect())
                .lower_bound(0.)
                .upper_bound(10.)
                .build()
                .unwrap(),
        );
        model
    }

    fn base() -> BaseBiomass {
        let mut coefficients = IndexMap::new();
        coefficients.insert("base".to_string(), 1.);
        BaseBiomass::new(coefficients).unwrap()
    }

    fn index(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn target_rounds_up() {
        assert_eq!(target_size(1, 20), 1);
        assert_eq!(target_size(20, 20), 1);
        assert_eq!(target_size(21, 20), 2);
        assert_eq!(target_size(100, 20), 5);
        assert_eq!(target_size(0, 20), 1);
    }

    #[test]
    fn compositions_are_never_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let comp = draw_composition(6, &mut rng);
            assert_eq!(comp.len(), 6);
            assert!((1..=6).contains(&comp.count()));
        }
    }

    #[test]
    fn overshoot_is_kept() {
        let _ = env_logger::builder().is_test(true).try_init();
        let runner = TaskRunner::new(8, Duration::from_secs(10));
        let options = SeedingOptionsBuilder::default()
            .population_divisor(1)
            .build()
            .unwrap();
        let index = index(&["m1", "m2", "m3", "m4", "m5"]);
        let mut rng = StdRng::seed_from_u64(11);
        let population =
            synthesize_population(&runner, &model(), &index, &base(), &options, 0, &mut rng)
                .unwrap();
        // Target is 5, the first round yields 8 feasible candidates
        assert_eq!(population.len(), 8);
        let names: Vec<&str> = population.individuals().map(|(name, _)| name).collect();
        assert_eq!(names[0], "biomass1_0");
        assert_eq!(names[7], "biomass1_7");
        for (_, comp) in population.individuals() {
            assert_eq!(comp.len(), index.len());
        }
    }

    #[test]
    fn infeasible_metabolites_are_never_accepted() {
        let runner = TaskRunner::new(4, Duration::from_secs(10));
        let options = SeedingOptionsBuilder::default()
            .population_divisor(1)
            .build()
            .unwrap();
        let index = index(&["m1", "dead", "m2"]);
        let mut rng = StdRng::seed_from_u64(5);
        let population =
            synthesize_population(&runner, &model(), &index, &base(), &options, 0, &mut rng)
                .unwrap();
        assert!(population.len() >= 3);
        for (_, comp) in population.individuals() {
            assert_eq!(comp.as_slice()[1], 0);
        }
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let runner = TaskRunner::new(3, Duration::from_secs(10));
        let options = SeedingOptionsBuilder::default()
            .population_divisor(2)
            .build()
            .unwrap();
        let index = index(&["m1", "m2", "dead", "m3", "m4", "m5"]);
        let sample = || {
            let mut rng = StdRng::seed_from_u64(42);
            synthesize_population(&runner, &model(), &index, &base(), &options, 0, &mut rng)
                .unwrap()
        };
        assert_eq!(sample(), sample());
    }

    #[test]
    fn round_budget() {
        let runner = TaskRunner::new(2, Duration::from_secs(10));
        let options = SeedingOptionsBuilder::default()
            .max_rounds(2)
            .build()
            .unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let result = synthesize_population(
            &runner,
            &model(),
            &index(&["dead"]),
            &base(),
            &options,
            4,
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(SeedingError::PopulationQuotaNotReached {
                population: 4,
                accepted: 0,
                target: 1,
                rounds: 2
            })
        ));
    }
}
